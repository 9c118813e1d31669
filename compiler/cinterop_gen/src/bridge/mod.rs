//! C glue between the host calling convention and the foreign one.
//!
//! The host calls every external function through a glue function with a
//! plain C signature. The two sides are compiled separately and agree only
//! on the glue name: it is the `CCall` id on the stub, which is in turn the
//! escaped mangled name (see [`crate::mangle::bridge_symbol`]).
//!
//! # Marshaling
//!
//! | Foreign shape | Glue shape |
//! |---------------|------------|
//! | `struct S` parameter | `void *pN`, dereferenced as `*(struct S *)pN` |
//! | `struct S` return | trailing `void *ret`, written through |
//! | variadic `f(...)` | `void *sym(void)` returning `&f` |
//! | global `g` | getter `sym(void)`, setter `sym(T value)` |
//! | global struct or array | `void *sym(void)` returning its address |
//! | ObjC method | message send, `id self` first for instance methods |
//!
//! # Glue file
//!
//! ```text
//! #include <stdint.h>
//! #include <string.h>
//! #include <user.h>            user includes, in order
//! ...                          additional preamble lines
//! void objc_terminate();       Objective-C only
//!
//! // NOTE THIS FILE IS AUTO-GENERATED
//!
//! <bridge>                     each followed by a blank line
//!
//! extern int Konan_main(...);  entry-point shim, last, only when requested
//! ```

use std::fmt;

use cinterop_ir::{CType, Language, Stub, StubContainer};
use rustc_hash::FxHashMap;

use crate::builder::{resolve, BridgeRequest, BridgeTarget, MessageReceiver, StubIrBuilderResult};
use crate::context::StubIrContext;
use crate::cspell::{CSpeller, Unspellable};
use crate::writer::SourceWriter;

/// Host runtime entry the entry-point shim forwards to.
pub const HOST_ENTRY_SYMBOL: &str = "Konan_main";

/// Banner marking the glue file as generated.
pub const GENERATED_BANNER: &str = "// NOTE THIS FILE IS AUTO-GENERATED";

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("glue symbol `{symbol}` is generated for both `{first}` and `{second}`")]
    DuplicateSymbol {
        symbol: String,
        first: String,
        second: String,
    },
    #[error("`{declaration}` calls `{symbol}`, but no glue was generated for it")]
    MissingBridge { symbol: String, declaration: String },
    #[error("cannot write glue for `{declaration}`")]
    Unspellable {
        declaration: String,
        #[source]
        source: Unspellable,
    },
    #[error("selector `{selector}` takes {expected} arguments, but the method has {found}")]
    SelectorArity {
        selector: String,
        expected: usize,
        found: usize,
    },
}

// ── Bridges ────────────────────────────────────────────────────────

/// One generated glue function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeBridge {
    pub symbol: String,
    /// Declaration the glue was generated for.
    pub declaration: String,
    /// Complete C definition, newline-terminated.
    pub source: String,
}

/// Glue functions in generation order, unique by symbol.
#[derive(Clone, Debug, Default)]
pub struct NativeBridges {
    bridges: Vec<NativeBridge>,
    by_symbol: FxHashMap<String, usize>,
}

impl NativeBridges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bridge: NativeBridge) -> Result<(), BridgeError> {
        if let Some(&existing) = self.by_symbol.get(&bridge.symbol) {
            return Err(BridgeError::DuplicateSymbol {
                symbol: bridge.symbol,
                first: self.bridges[existing].declaration.clone(),
                second: bridge.declaration,
            });
        }
        self.by_symbol
            .insert(bridge.symbol.clone(), self.bridges.len());
        self.bridges.push(bridge);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&NativeBridge> {
        self.by_symbol.get(symbol).map(|&i| &self.bridges[i])
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NativeBridge> {
        self.bridges.iter()
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}

impl<'b> IntoIterator for &'b NativeBridges {
    type Item = &'b NativeBridge;
    type IntoIter = std::slice::Iter<'b, NativeBridge>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug)]
pub struct BridgeBuilderResult {
    pub bridges: NativeBridges,
}

/// The native library the glue is compiled against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeLibrary {
    pub language: Language,
    /// Headers to include. `<x>` and `"x"` are kept as written; a bare
    /// name is included with angle brackets.
    pub includes: Vec<String>,
    pub additional_preamble_lines: Vec<String>,
}

impl NativeLibrary {
    pub fn new(language: Language) -> Self {
        NativeLibrary {
            language,
            ..Self::default()
        }
    }

    /// Everything above the banner of the glue file.
    pub fn preamble_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = ["stdint.h", "string.h"]
            .into_iter()
            .chain(self.includes.iter().map(String::as_str))
            .map(include_line)
            .collect();
        lines.extend(self.additional_preamble_lines.iter().cloned());
        if self.language == Language::ObjC {
            lines.push("void objc_terminate();".to_owned());
        }
        lines
    }
}

fn include_line(header: &str) -> String {
    if header.starts_with('<') || header.starts_with('"') {
        format!("#include {header}")
    } else {
        format!("#include <{header}>")
    }
}

// ── Builder ────────────────────────────────────────────────────────

pub struct BridgeBuilder<'a> {
    ctx: StubIrContext<'a>,
    stubs: &'a StubIrBuilderResult,
    speller: CSpeller<'a>,
}

impl<'a> BridgeBuilder<'a> {
    pub fn new(ctx: &StubIrContext<'a>, stubs: &'a StubIrBuilderResult) -> Self {
        BridgeBuilder {
            ctx: *ctx,
            stubs,
            speller: CSpeller::new(ctx.index),
        }
    }

    /// Render one glue function per bridge request, then check that every
    /// `CCall` in the stub tree has one.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn build(self) -> Result<BridgeBuilderResult, BridgeError> {
        let mut bridges = NativeBridges::new();
        for request in &self.stubs.bridge_requests {
            let source = self.render(request)?;
            tracing::debug!(symbol = %request.symbol, declaration = %request.declaration, "generated glue");
            bridges.insert(NativeBridge {
                symbol: request.symbol.clone(),
                declaration: request.declaration.clone(),
                source,
            })?;
        }
        check_calls(&self.stubs.root, &bridges)?;
        Ok(BridgeBuilderResult { bridges })
    }

    fn render(&self, request: &BridgeRequest) -> Result<String, BridgeError> {
        let unspellable = |source| BridgeError::Unspellable {
            declaration: request.declaration.clone(),
            source,
        };
        let symbol = &request.symbol;
        let mut w = SourceWriter::new();
        match &request.target {
            BridgeTarget::Call {
                function,
                return_type,
                parameters,
            } => {
                self.call_glue(&mut w, symbol, Vec::new(), return_type, parameters, |args| {
                    format!("{function}({})", args.join(", "))
                })
                .map_err(unspellable)?;
            }
            BridgeTarget::VariadicAddress { function } => {
                body(&mut w, &format!("void *{symbol}(void)"), &format!("return (void *)&{function};"));
            }
            BridgeTarget::GlobalGet { name, ty } | BridgeTarget::MacroGet { name, ty } => {
                let signature = self
                    .speller
                    .declare(ty, &format!("{symbol}(void)"))
                    .map_err(unspellable)?;
                body(&mut w, &signature, &format!("return {name};"));
            }
            BridgeTarget::GlobalSet { name, ty } => {
                let value = self
                    .speller
                    .declare(ty.unqualified(), "value")
                    .map_err(unspellable)?;
                body(&mut w, &format!("void {symbol}({value})"), &format!("{name} = value;"));
            }
            BridgeTarget::GlobalAddress { name, decays } => {
                let address = if *decays {
                    format!("(void *){name}")
                } else {
                    format!("(void *)&{name}")
                };
                body(&mut w, &format!("void *{symbol}(void)"), &format!("return {address};"));
            }
            BridgeTarget::MessageSend {
                receiver,
                selector,
                return_type,
                parameters,
            } => {
                let parts = selector_parts(selector, parameters.len())?;
                let (leading, target) = match receiver {
                    MessageReceiver::Instance => (vec!["id self".to_owned()], "self".to_owned()),
                    MessageReceiver::Class(class) => (Vec::new(), class.clone()),
                };
                self.call_glue(&mut w, symbol, leading, return_type, parameters, |args| {
                    if args.is_empty() {
                        format!("[{target} {selector}]")
                    } else {
                        let message: Vec<String> = parts
                            .iter()
                            .zip(args)
                            .map(|(part, arg)| format!("{part}:{arg}"))
                            .collect();
                        format!("[{target} {}]", message.join(" "))
                    }
                })
                .map_err(unspellable)?;
            }
        }
        Ok(w.take_output())
    }

    /// Glue that forwards its parameters to `call` and returns the result,
    /// moving struct values through pointers.
    fn call_glue(
        &self,
        w: &mut SourceWriter,
        symbol: &str,
        mut params: Vec<String>,
        return_type: &CType,
        parameters: &[CType],
        call: impl FnOnce(&[String]) -> String,
    ) -> Result<(), Unspellable> {
        let index = self.ctx.index;
        let mut args = Vec::with_capacity(parameters.len());
        for (i, ty) in parameters.iter().enumerate() {
            let name = format!("p{i}");
            if matches!(resolve(index, ty), CType::Record(_)) {
                args.push(format!("*({} *){name}", self.speller.spell(ty.unqualified())?));
                params.push(format!("void *{name}"));
            } else {
                args.push(name.clone());
                params.push(self.speller.declare(ty, &name)?);
            }
        }
        let call = call(&args);

        let void = CType::Void;
        let returned = resolve(index, return_type);
        let (signature_type, statement) = if matches!(returned, CType::Record(_)) {
            params.push("void *ret".to_owned());
            let spelled = self.speller.spell(return_type.unqualified())?;
            (&void, format!("*({spelled} *)ret = {call};"))
        } else if matches!(returned, CType::Void) {
            (return_type, format!("{call};"))
        } else {
            (return_type, format!("return {call};"))
        };

        let params = if params.is_empty() {
            "void".to_owned()
        } else {
            params.join(", ")
        };
        let signature = self
            .speller
            .declare(signature_type, &format!("{symbol}({params})"))?;
        body(w, &signature, &statement);
        Ok(())
    }
}

fn body(w: &mut SourceWriter, signature: &str, statement: &str) {
    w.writeln(&format!("{signature} {{"));
    w.indent();
    w.writeln(statement);
    w.dedent();
    w.writeln("}");
}

/// Keyword parts of a selector: `initWithX:y:` → `["initWithX", "y"]`.
fn selector_parts(selector: &str, arity: usize) -> Result<Vec<&str>, BridgeError> {
    let parts: Vec<&str> = if selector.contains(':') {
        selector.split_terminator(':').collect()
    } else {
        Vec::new()
    };
    if parts.len() == arity {
        Ok(parts)
    } else {
        Err(BridgeError::SelectorArity {
            selector: selector.to_owned(),
            expected: parts.len(),
            found: arity,
        })
    }
}

/// Every `CCall` id on a function or accessor must name generated glue.
fn check_calls(root: &StubContainer, bridges: &NativeBridges) -> Result<(), BridgeError> {
    let mut missing = None;
    for child in &root.children {
        child.walk(&mut |stub| {
            if missing.is_some() {
                return;
            }
            let (declaration, ids): (&str, Vec<&str>) = match stub {
                Stub::Function(f) => (f.name.as_str(), f.ccall_id().into_iter().collect()),
                Stub::Property(p) => (
                    p.name.as_str(),
                    p.accessors().filter_map(|a| a.ccall_id()).collect(),
                ),
                _ => return,
            };
            if let Some(id) = ids.into_iter().find(|id| !bridges.contains(id)) {
                missing = Some(BridgeError::MissingBridge {
                    symbol: id.to_owned(),
                    declaration: declaration.to_owned(),
                });
            }
        });
    }
    missing.map_or(Ok(()), Err)
}

// ── Glue file ──────────────────────────────────────────────────────

/// Render the complete glue source file.
pub fn emit_c_file(
    library: &NativeLibrary,
    bridges: &NativeBridges,
    entry_point: Option<&str>,
) -> String {
    let mut w = SourceWriter::new();
    for line in library.preamble_lines() {
        w.writeln(&line);
    }
    w.newline();
    w.writeln(GENERATED_BANNER);
    w.newline();

    for bridge in bridges {
        for line in bridge.source.lines() {
            w.writeln(line);
        }
        w.newline();
    }

    if let Some(entry) = entry_point {
        w.writeln(&format!("extern int {HOST_ENTRY_SYMBOL}(int argc, char** argv);"));
        w.newline();
        w.writeln("__attribute__((__used__))");
        w.writeln(&format!("int {entry}(int argc, char** argv)  {{"));
        w.indent();
        w.writeln(&format!("return {HOST_ENTRY_SYMBOL}(argc, argv);"));
        w.dedent();
        w.writeln("}");
    }
    w.take_output()
}

impl fmt::Display for NativeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
