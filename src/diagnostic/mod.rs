pub mod ansi;
pub mod json;
pub mod registry;

use std::rc::Rc;

use crate::interpreter::RuntimeError;
use crate::lexer::SourceError;
use crate::parser::ParseError;
use crate::source::Location;

#[derive(Debug, Clone)]
pub struct Label {
    pub location: Location,
    pub message: String,
}

/// A user-facing error report, rendered by [`ansi`] or [`json`].
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<&'static str>,
    pub message: String,
    /// The first label is the primary one and gets a source snippet.
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    /// Text of the file the primary label points into.
    pub source: Option<Rc<str>>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_location(mut self, location: &Location, label: impl Into<String>) -> Self {
        self.labels.push(Label { location: location.clone(), message: label.into() });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: Rc<str>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn primary(&self) -> Option<&Label> {
        self.labels.first()
    }
}

impl From<&SourceError> for Diagnostic {
    fn from(e: &SourceError) -> Self {
        let d = match e {
            SourceError::Lex { location, snippet, suggestion } => {
                Diagnostic::error(format!("unexpected input '{snippet}'"))
                    .with_location(location, "here")
                    .with_suggestion(suggestion.clone())
            }
            SourceError::UnresolvedImport { location, import, reason } => {
                Diagnostic::error(format!("cannot resolve import <{import}>"))
                    .with_location(location, "imported here")
                    .with_note(reason.clone())
            }
            SourceError::UnbalancedBrackets { location, reason } => {
                Diagnostic::error("unbalanced brackets")
                    .with_location(location, *reason)
                    .with_note("a stack must open and close in the same file")
            }
            SourceError::MissingExtension { expected, .. } | SourceError::WrongExtension { expected, .. } => {
                Diagnostic::error(e.to_string()).with_suggestion(format!("rename the file to end in .{expected}"))
            }
            SourceError::Read { .. } => Diagnostic::error(e.to_string()),
        };
        d.with_code(e.code())
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(e: &ParseError) -> Self {
        let d = Diagnostic::error(&e.message).with_code(e.code);
        match &e.location {
            Some(location) => d.with_location(location, "here"),
            None => d,
        }
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(e: &RuntimeError) -> Self {
        Diagnostic::error(e.to_string())
            .with_code(e.code())
            .with_note("the final state below includes every change made before the failure")
    }
}
