//! Parsing of generator output into execution and undo sections.

/// Separates the execution section from the undo section in generator output.
pub const UNDO_DELIMITER: &str = "---UNDO---";

/// Undo code used when the generator did not provide one.
pub const UNDO_UNAVAILABLE: &str = r#"print("[Chaos] Undo not available for this command")"#;

/// Substituted for both sections when generation fails.
pub const GENERATION_FAILED: &str = r#"print("AI Generation Failed")"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub execution_code: String,
    pub undo_code: String,
}

impl GeneratedScript {
    /// Split at the first delimiter. Without one, the whole text is the
    /// execution section and undo falls back to [`UNDO_UNAVAILABLE`].
    pub fn parse(raw: &str) -> Self {
        let cleaned = strip_code_fences(raw);

        match cleaned.split_once(UNDO_DELIMITER) {
            Some((execution, undo)) => {
                let undo = undo.trim();
                Self {
                    execution_code: execution.trim().to_string(),
                    undo_code: if undo.is_empty() {
                        UNDO_UNAVAILABLE.to_string()
                    } else {
                        undo.to_string()
                    },
                }
            }
            None => Self {
                execution_code: cleaned,
                undo_code: UNDO_UNAVAILABLE.to_string(),
            },
        }
    }

    pub fn failed() -> Self {
        Self {
            execution_code: GENERATION_FAILED.to_string(),
            undo_code: GENERATION_FAILED.to_string(),
        }
    }

    pub fn has_undo(&self) -> bool {
        self.undo_code != UNDO_UNAVAILABLE && self.undo_code != GENERATION_FAILED
    }
}

/// Remove markdown code fences the model sometimes wraps around Lua.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```lua", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_delimiter() {
        let script = GeneratedScript::parse("<code>---UNDO---<undo>");
        assert_eq!(script.execution_code, "<code>");
        assert_eq!(script.undo_code, "<undo>");
        assert!(script.has_undo());
    }

    #[test]
    fn test_only_first_delimiter_splits() {
        let script = GeneratedScript::parse("a\n---UNDO---\nb\n---UNDO---\nc");
        assert_eq!(script.execution_code, "a");
        assert_eq!(script.undo_code, "b\n---UNDO---\nc");
    }

    #[test]
    fn test_missing_delimiter_uses_placeholder() {
        let script = GeneratedScript::parse("print('hi')");
        assert_eq!(script.execution_code, "print('hi')");
        assert_eq!(script.undo_code, UNDO_UNAVAILABLE);
        assert!(!script.has_undo());
    }

    #[test]
    fn test_empty_undo_section_uses_placeholder() {
        let script = GeneratedScript::parse("print('hi')\n---UNDO---\n   ");
        assert_eq!(script.undo_code, UNDO_UNAVAILABLE);
    }

    #[test]
    fn test_fences_removed() {
        let raw = "```lua\nprint(1)\n---UNDO---\nprint(2)\n```";
        let script = GeneratedScript::parse(raw);
        assert_eq!(script.execution_code, "print(1)");
        assert_eq!(script.undo_code, "print(2)");
    }

    #[test]
    fn test_failed_placeholder() {
        let script = GeneratedScript::failed();
        assert_eq!(script.execution_code, GENERATION_FAILED);
        assert_eq!(script.undo_code, GENERATION_FAILED);
        assert!(!script.has_undo());
    }
}
