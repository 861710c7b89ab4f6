use regex::Regex;

/// Immutable definition of the language variant being run.
///
/// Built once at startup and passed by reference to the loader, the program
/// builder, the engine and the renderer. Token characters are not part of it:
/// they are fixed by the scanner (see [`crate::lexer`]).
#[derive(Debug, Clone)]
pub struct Language {
    /// Required source file extension, without the leading dot.
    pub file_extension: String,
    /// Name of the instruction stack.
    pub instr_stack: String,
    /// Name of the data stack.
    pub data_stack: String,
    /// Instruction names matching this pattern are dumped after a run.
    /// `None` selects names starting with [`LOGGABLE_MARKER`].
    pub loggable: Option<Regex>,
}

pub const DEFAULT_FILE_EXTENSION: &str = "(m)m";
pub const LOGGABLE_MARKER: char = '_';
/// Pattern equivalent to the default marker rule, for the command line.
pub const DEFAULT_LOGGABLE: &str = "^_";

impl Default for Language {
    fn default() -> Self {
        Language {
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            instr_stack: "IS".to_string(),
            data_stack: "DS".to_string(),
            loggable: None,
        }
    }
}

impl Language {
    /// Same language with a different loggable-name pattern.
    pub fn with_loggable(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.loggable = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        name == self.instr_stack || name == self.data_stack
    }

    /// `IS`/`DS` are always shown; other names only when they match the pattern.
    pub fn is_loggable(&self, name: &str) -> bool {
        self.is_reserved(name)
            || match &self.loggable {
                Some(pattern) => pattern.is_match(name),
                None => name.starts_with(LOGGABLE_MARKER),
            }
    }
}
