//! Visit every type slot of a package.
//!
//! A slot is a place a declaration stores a [`TypeDescriptor`]: supertypes,
//! bounds, parameter and return types, receivers, property types and alias
//! targets. Type arguments and abbreviations are inside the slot and are
//! not visited separately.

use cinterop_klib::{
    ClassDescriptor, FunctionDescriptor, PackageDescriptor, PropertyDescriptor,
    TypeAliasDescriptor, TypeDescriptor, TypeParameterDescriptor, ValueParameterDescriptor,
};

macro_rules! define_walkers {
    ($package:ident, $class:ident, $function:ident, $property:ident, $alias:ident,
     $bounds:ident, $params:ident $(, $m:tt)?) => {
        pub(crate) fn $package<E>(
            package: & $($m)? PackageDescriptor,
            f: &mut impl FnMut(& $($m)? TypeDescriptor) -> Result<(), E>,
        ) -> Result<(), E> {
            for class in & $($m)? package.classes {
                $class(class, f)?;
            }
            for function in & $($m)? package.functions {
                $function(function, f)?;
            }
            for property in & $($m)? package.properties {
                $property(property, f)?;
            }
            for alias in & $($m)? package.type_aliases {
                $alias(alias, f)?;
            }
            Ok(())
        }

        fn $class<E>(
            class: & $($m)? ClassDescriptor,
            f: &mut impl FnMut(& $($m)? TypeDescriptor) -> Result<(), E>,
        ) -> Result<(), E> {
            $bounds(& $($m)? class.type_parameters, f)?;
            for supertype in & $($m)? class.supertypes {
                f(supertype)?;
            }
            for constructor in & $($m)? class.constructors {
                $params(& $($m)? constructor.value_parameters, f)?;
            }
            for function in & $($m)? class.functions {
                $function(function, f)?;
            }
            for property in & $($m)? class.properties {
                $property(property, f)?;
            }
            Ok(())
        }

        fn $function<E>(
            function: & $($m)? FunctionDescriptor,
            f: &mut impl FnMut(& $($m)? TypeDescriptor) -> Result<(), E>,
        ) -> Result<(), E> {
            $bounds(& $($m)? function.type_parameters, f)?;
            if let Some(receiver) = & $($m)? function.receiver {
                f(receiver)?;
            }
            $params(& $($m)? function.value_parameters, f)?;
            f(& $($m)? function.return_type)
        }

        fn $property<E>(
            property: & $($m)? PropertyDescriptor,
            f: &mut impl FnMut(& $($m)? TypeDescriptor) -> Result<(), E>,
        ) -> Result<(), E> {
            if let Some(receiver) = & $($m)? property.receiver {
                f(receiver)?;
            }
            f(& $($m)? property.ty)
        }

        fn $alias<E>(
            alias: & $($m)? TypeAliasDescriptor,
            f: &mut impl FnMut(& $($m)? TypeDescriptor) -> Result<(), E>,
        ) -> Result<(), E> {
            f(& $($m)? alias.underlying)?;
            f(& $($m)? alias.expanded)
        }

        fn $bounds<E>(
            params: & $($m)? [TypeParameterDescriptor],
            f: &mut impl FnMut(& $($m)? TypeDescriptor) -> Result<(), E>,
        ) -> Result<(), E> {
            for param in params {
                for bound in & $($m)? param.upper_bounds {
                    f(bound)?;
                }
            }
            Ok(())
        }

        fn $params<E>(
            params: & $($m)? [ValueParameterDescriptor],
            f: &mut impl FnMut(& $($m)? TypeDescriptor) -> Result<(), E>,
        ) -> Result<(), E> {
            for param in params {
                f(& $($m)? param.ty)?;
                if let Some(element) = & $($m)? param.vararg_element_type {
                    f(element)?;
                }
            }
            Ok(())
        }
    };
}

define_walkers!(
    package_types,
    class_types,
    function_types,
    property_types,
    alias_types,
    bound_types,
    parameter_types
);

define_walkers!(
    package_types_mut,
    class_types_mut,
    function_types_mut,
    property_types_mut,
    alias_types_mut,
    bound_types_mut,
    parameter_types_mut,
    mut
);

#[cfg(test)]
mod tests {
    use super::*;
    use cinterop_klib::{DeclFlags, TypeKind};
    use cinterop_ir::UniqId;
    use std::convert::Infallible;

    fn function(ret: &str, param: &str) -> FunctionDescriptor {
        FunctionDescriptor {
            name: "f".to_owned(),
            flags: DeclFlags::PUBLIC,
            uniq_id: UniqId::public(1),
            type_parameters: Vec::new(),
            receiver: None,
            value_parameters: vec![ValueParameterDescriptor {
                name: "p".to_owned(),
                ty: TypeDescriptor::class(param, None),
                vararg_element_type: None,
                annotations: Vec::new(),
            }],
            return_type: TypeDescriptor::class(ret, None),
            annotations: Vec::new(),
        }
    }

    #[test]
    fn visits_parameters_before_return_type() {
        let mut package = PackageDescriptor::new("p");
        package.functions.push(function("lang/Unit", "lang/Int"));

        let mut seen = Vec::new();
        package_types(&package, &mut |t| {
            seen.push(t.class_name().map(str::to_owned));
            Ok::<(), Infallible>(())
        })
        .ok();
        assert_eq!(
            seen,
            vec![Some("lang/Int".to_owned()), Some("lang/Unit".to_owned())]
        );
    }

    #[test]
    fn mutable_walk_rewrites_in_place() {
        let mut package = PackageDescriptor::new("p");
        package.functions.push(function("lang/Unit", "lang/Int"));

        package_types_mut(&mut package, &mut |t| {
            t.nullable = true;
            Ok::<(), Infallible>(())
        })
        .ok();
        let f = &package.functions[0];
        assert!(f.return_type.nullable);
        assert!(f.value_parameters[0].ty.nullable);
        assert!(matches!(f.return_type.kind, TypeKind::Class { .. }));
    }
}
