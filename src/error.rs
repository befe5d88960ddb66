#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "SS-ERR-PARSE-001";
pub const ERR_ATTRS_ARGUMENT: &str = "SS-ERR-ATTRS-001";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_PARSE => "Only syntactically valid modules are rewritten.",
        ERR_ATTRS_ARGUMENT => {
            "Attribute injection receives an object literal or a function returning props."
        }
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// A fault that aborts one compile unit. Declarations that merely cannot be
/// resolved never produce one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: "COMPILER_INVARIANT_VIOLATION".to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }

    /// Builds the error for an `.attrs(...)` argument of the wrong shape.
    /// `file` is filled in by the compile entry.
    pub fn attrs_argument(line: u32, column: u32, snippet: &str) -> Self {
        Self::with_details(
            ERR_ATTRS_ARGUMENT,
            "attrs only accepts an arrow function or an object literal",
            "",
            line,
            column,
            Some(snippet.to_string()),
            vec![
                "Pass `.attrs({ ... })` or `.attrs((props) => ({ ... }))`.".to_string(),
            ],
        )
    }

    pub fn in_file(mut self, file: &str) -> Self {
        self.file = file.to_string();
        self
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}:{}:{})",
            self.code, self.message, self.file, self.line, self.column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location() {
        let err = CompilerError::new(ERR_PARSE, "Unexpected token", "src/App.tsx", 3, 7);
        assert_eq!(
            err.to_string(),
            "[SS-ERR-PARSE-001] Unexpected token (src/App.tsx:3:7)"
        );
        assert_eq!(err.guarantee, "Only syntactically valid modules are rewritten.");
    }

    #[test]
    fn test_attrs_error_carries_snippet() {
        let err = CompilerError::attrs_argument(2, 30, "getAttrs").in_file("Button.tsx");
        assert_eq!(err.code, ERR_ATTRS_ARGUMENT);
        assert_eq!(err.file, "Button.tsx");
        assert_eq!(err.context.as_deref(), Some("getAttrs"));
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn test_serializes_camel_case() {
        let err = CompilerError::new(ERR_PARSE, "bad", "a.ts", 1, 1);
        let json = serde_json::to_value(&err).expect("serializable");
        assert_eq!(json["errorType"], "COMPILER_INVARIANT_VIOLATION");
    }
}
