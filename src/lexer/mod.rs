use logos::Logos;

pub mod import;
pub use import::{Lexeme, Loader, SourceError};

pub const STACK_OPEN: char = '[';
pub const STACK_CLOSE: char = ']';
pub const INDIRECTION: char = '.';
pub const COMMENT: &str = "--";

#[derive(Logos, Debug, PartialEq, Eq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"--[^\n]*", allow_greedy = true))]
pub enum Token {
    #[token("[")]
    StackOpen,
    #[token("]")]
    StackClose,

    /// A run of dots; the payload is its length.
    #[regex(r"\.+", |lex| lex.slice().len())]
    Indirection(usize),

    /// `<path>` on a single line, replaced by that file's tokens.
    #[regex(r"<[^>\n]*>", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Import(String),

    #[regex(r"[A-Za-z0-9_]+", |lex| lex.slice().to_string())]
    Instr(String),
}

/// Lex source code into tokens with byte ranges. Whitespace and comments are
/// dropped here, so the result is already trivia-free.
pub fn lex(source: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                let snippet = source[span.clone()].to_string();
                return Err(LexError {
                    position: span.start,
                    suggestion: suggest_fix(&snippet),
                    snippet,
                });
            }
        }
    }

    Ok(tokens)
}

fn suggest_fix(bad: &str) -> String {
    if bad.starts_with('<') {
        "Imports must be closed with '>' on the same line: <./other.(m)m>".to_string()
    } else if bad.starts_with('-') {
        format!("Comments start with '{COMMENT}'")
    } else {
        format!(
            "Unexpected character(s): '{}'. Instruction names use letters, digits and '_'.",
            bad
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at position {position}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub position: usize,
    pub snippet: String,
    pub suggestion: String,
}
