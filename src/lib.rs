//! # Static styled-components extraction
//!
//! Rewrites `styled.tag\`...\`` declarations whose CSS is fully known at
//! build time into plain rendering functions, and collects their rules.
//!
//! ## Soundness Invariants
//!
//! 1. **No guessing**: an expression is only reduced to a literal when every
//!    binding it reaches is immutable. Anything else yields `EvalError`.
//!
//! 2. **Per-declaration fallback**: an unresolvable declaration keeps its
//!    source form and marks the file as needing the runtime
//!    (`should_use_client`). It never fails the compile.
//!
//! 3. **Faults are typed**: only parse failures and malformed `.attrs(...)`
//!    arguments produce a [`CompilerError`].
//!
//! 4. **No globals**: the theme and the style sink are supplied by the caller
//!    for each compile unit.
//!
//! 5. **Stable class names**: a class name is the styled-components hash of
//!    the file path, the declaration's line and its normalized CSS.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod compile;
mod css;
mod error;
mod hash;
mod imports;
mod scope;
mod sink;
mod static_eval;
mod styled;
mod tags;
mod theme;
mod transform;
mod value;


pub use compile::{compile, compile_with_sink, CompileOptions, CompileResult};
pub use css::compile_rule;
pub use error::{CompilerError, ERR_ATTRS_ARGUMENT, ERR_PARSE};
pub use hash::class_name_hash;
pub use sink::{StyleSheet, StyleSink};
pub use theme::{load_theme, parse_theme};
pub use value::{EvalError, Theme, Value};

#[cfg(feature = "napi")]
#[napi]
pub fn compile_native(
    code: String,
    file_path: String,
    options: Option<serde_json::Value>,
) -> napi::Result<CompileResult> {
    let options: CompileOptions = match options {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| napi::Error::from_reason(format!("Invalid options: {}", e)))?,
        None => CompileOptions::default(),
    };
    compile(&code, &file_path, &options).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi")]
#[napi]
pub fn load_theme_native(path: String) -> Option<serde_json::Value> {
    load_theme(&path).and_then(|theme| serde_json::to_value(theme).ok())
}

#[cfg(feature = "napi")]
#[napi]
pub fn class_name_hash_native(input: String) -> String {
    class_name_hash(&input)
}
