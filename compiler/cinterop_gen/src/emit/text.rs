//! Host-language source rendering.
//!
//! ```text
//! package sqlite
//!
//! @cinterop.internal.CCall(id = "knibridge_kfun$CL$HSsqlite3_close...")
//! external fun sqlite3_close(db: cinterop.CPointer<sqlite.sqlite3>?): lang.Int
//! ```
//!
//! Declarations are written depth-first in tree order, separated by blank
//! lines at the top level. Every type is fully qualified and every
//! annotation is kept, so the output compiles without imports.

use cinterop_ir::{
    AccessorKind, AnnotationStub, AnnotationValue, ClassKind, ClassStub, ConstantStub,
    ConstructorStub, FunctionParameterStub, FunctionStub, PropertyAccessor, PropertyKind,
    PropertyStub, StubContainer, StubFlags, StubIrVisitor, TypeAliasStub,
    TypeParameterStub, UnsupportedStub,
};

use super::EmitError;
use crate::writer::SourceWriter;

/// Renders a stub tree as host source text.
#[derive(Debug, Default)]
pub struct TextEmitter {
    w: SourceWriter,
    /// Nesting depth of class bodies.
    class_depth: usize,
}

impl TextEmitter {
    pub fn new() -> Self {
        TextEmitter {
            w: SourceWriter::new(),
            class_depth: 0,
        }
    }

    /// Render `root` as one source file of package `root.name`.
    #[tracing::instrument(level = "debug", skip_all, fields(package = %root.name))]
    pub fn emit(root: &StubContainer) -> Result<String, EmitError> {
        let mut emitter = TextEmitter::new();
        emitter.w.writeln(&format!("package {}", root.name));
        emitter.children(root)?;
        Ok(emitter.w.take_output())
    }

    fn children(&mut self, container: &StubContainer) -> Result<(), EmitError> {
        for child in &container.children {
            if !self.w.at_blank_line() {
                self.w.newline();
            }
            child.accept(self)?;
        }
        Ok(())
    }

    fn annotations(&mut self, annotations: &[AnnotationStub]) {
        for a in annotations {
            self.w.writeln(&annotation(a));
        }
    }

    fn parameters(parameters: &[FunctionParameterStub]) -> String {
        parameters
            .iter()
            .map(|p| {
                let mut out = String::new();
                for a in &p.annotations {
                    out.push_str(&annotation(a));
                    out.push(' ');
                }
                if p.is_vararg {
                    out.push_str("vararg ");
                }
                out.push_str(&format!("{}: {}", p.name, p.ty));
                out
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn accessor_line(&mut self, accessor: &PropertyAccessor) {
        let mut line = String::new();
        for a in &accessor.annotations {
            line.push_str(&annotation(a));
            line.push(' ');
        }
        if accessor.flags.is_external() {
            line.push_str("external ");
        }
        line.push_str(match accessor.kind {
            AccessorKind::Getter => "get",
            AccessorKind::Setter { .. } => "set",
        });
        self.w.writeln(&line);
    }
}

impl StubIrVisitor for TextEmitter {
    type Output = ();
    type Error = EmitError;

    fn visit_class(&mut self, class: &ClassStub) -> Result<(), EmitError> {
        self.annotations(&class.annotations);
        let name = class.classifier.simple_name();
        let header = if self.class_depth > 0 && name == "Companion" {
            "companion object".to_owned()
        } else {
            let modifier = if class.kind == ClassKind::ObjCProtocol
                || class.flags.contains(StubFlags::FINAL)
            {
                ""
            } else {
                "open "
            };
            format!(
                "{modifier}{} {name}{}",
                class.kind.keyword(),
                type_parameters(&class.type_parameters)
            )
        };
        let supertypes = if class.supertypes.is_empty() {
            String::new()
        } else {
            let list: Vec<String> = class.supertypes.iter().map(ToString::to_string).collect();
            format!(" : {}", list.join(", "))
        };

        if class.members.is_empty() {
            self.w.writeln(&format!("{header}{supertypes}"));
            return Ok(());
        }
        self.w.writeln(&format!("{header}{supertypes} {{"));
        self.w.indent();
        self.class_depth += 1;
        let result = class.members.iter().try_for_each(|m| m.accept(self));
        self.class_depth -= 1;
        self.w.dedent();
        result?;
        self.w.writeln("}");
        Ok(())
    }

    fn visit_type_alias(&mut self, alias: &TypeAliasStub) -> Result<(), EmitError> {
        self.annotations(&alias.annotations);
        self.w.writeln(&format!(
            "typealias {} = {}",
            alias.alias.simple_name(),
            alias.aliasee
        ));
        Ok(())
    }

    fn visit_function(&mut self, function: &FunctionStub) -> Result<(), EmitError> {
        self.annotations(&function.annotations);
        let external = if function.flags.is_external() {
            "external "
        } else {
            ""
        };
        let type_params = type_parameters(&function.type_parameters);
        let type_params = if type_params.is_empty() {
            type_params
        } else {
            format!("{type_params} ")
        };
        let receiver = function
            .receiver
            .as_ref()
            .map(|r| format!("{r}."))
            .unwrap_or_default();
        self.w.writeln(&format!(
            "{external}fun {type_params}{receiver}{}({}): {}",
            function.name,
            Self::parameters(&function.parameters),
            function.return_type
        ));
        Ok(())
    }

    fn visit_property(&mut self, property: &PropertyStub) -> Result<(), EmitError> {
        self.annotations(&property.annotations);
        let receiver = property
            .receiver
            .as_ref()
            .map(|r| format!("{r}."))
            .unwrap_or_default();
        let declared = format!("{receiver}{}: {}", property.name, property.ty);
        match &property.kind {
            PropertyKind::Constant { value } => {
                self.w
                    .writeln(&format!("const val {declared} = {}", constant(value)));
            }
            PropertyKind::LateinitVar => self.w.writeln(&format!("lateinit var {declared}")),
            PropertyKind::Val { getter } => {
                self.w.writeln(&format!("val {declared}"));
                self.w.indent();
                self.accessor_line(getter);
                self.w.dedent();
            }
            PropertyKind::Var { getter, setter } => {
                self.w.writeln(&format!("var {declared}"));
                self.w.indent();
                self.accessor_line(getter);
                self.accessor_line(setter);
                self.w.dedent();
            }
        }
        Ok(())
    }

    fn visit_constructor(&mut self, constructor: &ConstructorStub) -> Result<(), EmitError> {
        if self.class_depth == 0 {
            return Err(UnsupportedStub::new("constructor", "<init>").into());
        }
        self.annotations(&constructor.annotations);
        self.w.writeln(&format!(
            "constructor({})",
            Self::parameters(&constructor.parameters)
        ));
        Ok(())
    }

    fn visit_property_accessor(&mut self, accessor: &PropertyAccessor) -> Result<(), EmitError> {
        // Accessors are rendered with their property.
        Err(UnsupportedStub::new("property accessor", accessor.kind.name()).into())
    }

    fn visit_container(&mut self, container: &StubContainer) -> Result<(), EmitError> {
        self.w.writeln(&format!("// {}", container.name));
        self.children(container)
    }
}

fn type_parameters(params: &[TypeParameterStub]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let list: Vec<String> = params
        .iter()
        .map(|p| match &p.upper_bound {
            Some(bound) => format!("{} : {bound}", p.name()),
            None => p.name().to_owned(),
        })
        .collect();
    format!("<{}>", list.join(", "))
}

/// `@pkg.Name` or `@pkg.Name(key = value, ...)`.
fn annotation(a: &AnnotationStub) -> String {
    let arguments = a.arguments();
    if arguments.is_empty() {
        return format!("@{}", a.classifier());
    }
    let list: Vec<String> = arguments
        .iter()
        .map(|(key, value)| format!("{key} = {}", literal(value)))
        .collect();
    format!("@{}({})", a.classifier(), list.join(", "))
}

fn literal(value: &AnnotationValue) -> String {
    match value {
        AnnotationValue::String(s) => quote(s),
        AnnotationValue::Long(v) => format!("{v}L"),
        AnnotationValue::Int(v) => v.to_string(),
        AnnotationValue::Boolean(v) => v.to_string(),
    }
}

fn constant(value: &ConstantStub) -> String {
    match value {
        ConstantStub::Integer(v) => v.to_string(),
        ConstantStub::Double(bits) => {
            let v = f64::from_bits(*bits);
            if v.is_nan() {
                "lang.Double.NaN".to_owned()
            } else if v.is_infinite() {
                if v > 0.0 {
                    "lang.Double.POSITIVE_INFINITY".to_owned()
                } else {
                    "lang.Double.NEGATIVE_INFINITY".to_owned()
                }
            } else {
                format!("{v:?}")
            }
        }
        ConstantStub::String(s) => quote(s),
    }
}

/// Double-quoted string literal; `$` is escaped so it never starts a template.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
