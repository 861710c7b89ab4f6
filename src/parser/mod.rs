use tracing::debug;

use crate::config::Language;
use crate::lexer::{Lexeme, Token};
use crate::registry::{Builtin, InstrId, Registry, RegistryError};
use crate::source::Location;
use crate::value::{SharedStack, Stack, StackElem};

/// Deepest stack literal nesting accepted.
pub const MAX_NESTING: usize = 512;

/// Builds the program tree and instruction registry from a token stream.
pub struct Parser<'a> {
    lexemes: &'a [Lexeme],
    pos: usize,
    depth: usize,
    registry: Registry,
}

#[derive(Debug, thiserror::Error)]
#[error("Parse error{}: {message}", at(.location))]
pub struct ParseError {
    pub code: &'static str,
    pub location: Option<Location>,
    pub message: String,
}

fn at(location: &Option<Location>) -> String {
    location.as_ref().map(|l| format!(" at {l}")).unwrap_or_default()
}

impl From<RegistryError> for ParseError {
    fn from(e: RegistryError) -> Self {
        ParseError { code: "MM-P005", location: None, message: e.to_string() }
    }
}

type Result<T> = std::result::Result<T, ParseError>;

impl<'a> Parser<'a> {
    pub fn new(lexemes: &'a [Lexeme]) -> Self {
        Parser { lexemes, pos: 0, depth: 0, registry: Registry::new() }
    }

    fn peek(&self) -> Option<&'a Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Lexeme> {
        let lexeme = self.lexemes.get(self.pos);
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn error(&self, code: &'static str, location: Option<&Location>, message: String) -> ParseError {
        ParseError { code, location: location.cloned(), message }
    }

    /// Optional indirection marker after an element.
    fn indirection(&mut self) -> usize {
        match self.peek() {
            Some(Lexeme { token: Token::Indirection(level), .. }) => {
                self.pos += 1;
                *level
            }
            _ => 0,
        }
    }

    /// Registers `IS`, `DS`, then every distinct name in order of first
    /// appearance.
    fn register_names(&mut self, lang: &Language) -> Result<()> {
        self.registry.register(&lang.instr_stack)?;
        self.registry.register(&lang.data_stack)?;
        for lexeme in self.lexemes {
            if let Token::Instr(name) = &lexeme.token {
                if !self.registry.contains(name) {
                    self.registry.register(name)?;
                }
            }
        }
        Ok(())
    }

    /// Parses elements until `]` (when `opener` is set) or end of input.
    /// The returned stack has the first source element on top.
    fn parse_stack(&mut self, opener: Option<&'a Lexeme>) -> Result<Stack> {
        let mut elems = Vec::new();
        loop {
            let Some(lexeme) = self.advance() else {
                if let Some(open) = opener {
                    return Err(self.error(
                        "MM-P002",
                        Some(&open.location),
                        format!("unclosed '{}'", crate::lexer::STACK_OPEN),
                    ));
                }
                break;
            };
            match &lexeme.token {
                Token::StackOpen => {
                    if self.depth >= MAX_NESTING {
                        return Err(self.error(
                            "MM-P006",
                            Some(&lexeme.location),
                            format!("stacks nested more than {MAX_NESTING} deep"),
                        ));
                    }
                    self.depth += 1;
                    let inner = self.parse_stack(Some(lexeme))?;
                    self.depth -= 1;
                    let indirection = self.indirection();
                    elems.push(StackElem::substack(SharedStack::new(inner), indirection));
                }
                Token::StackClose if opener.is_some() => break,
                Token::StackClose => {
                    return Err(self.error(
                        "MM-P001",
                        Some(&lexeme.location),
                        format!("unexpected '{}' with no open stack", crate::lexer::STACK_CLOSE),
                    ));
                }
                Token::Instr(name) => {
                    let id = self.instr_id(name, &lexeme.location)?;
                    let indirection = self.indirection();
                    elems.push(StackElem::instr(id, indirection));
                }
                Token::Indirection(_) => {
                    return Err(self.error(
                        "MM-P003",
                        Some(&lexeme.location),
                        "indirection must follow an instruction or a stack".to_string(),
                    ));
                }
                Token::Import(path) => {
                    return Err(self.error(
                        "MM-P004",
                        Some(&lexeme.location),
                        format!("unexpanded import <{path}>"),
                    ));
                }
            }
        }
        let mut stack = Stack::from_elems(elems);
        stack.reverse();
        Ok(stack)
    }

    fn instr_id(&self, name: &str, location: &Location) -> Result<InstrId> {
        self.registry
            .lookup_id(name)
            .ok_or_else(|| self.error("MM-P005", Some(location), format!("unregistered instruction '{name}'")))
    }

    pub fn parse_program(mut self, lang: &Language) -> Result<Registry> {
        self.register_names(lang)?;

        for builtin in Builtin::ALL {
            if self.registry.install_builtin(builtin) {
                debug!("Built-in {builtin} referenced by name");
            }
        }

        let program = self.parse_stack(None)?;
        debug!("Program has {} top-level elements, {} instruction types", program.len(), self.registry.len());

        let mut instr_stack = Stack::new();
        instr_stack.push(StackElem::substack(SharedStack::new(program), 0));

        let is = self.registry.lookup_id(&lang.instr_stack);
        let ds = self.registry.lookup_id(&lang.data_stack);
        if let (Some(is), Some(ds)) = (is, ds) {
            self.registry.set_value(is, SharedStack::new(instr_stack));
            self.registry.set_value(ds, SharedStack::empty());
        }
        Ok(self.registry)
    }
}

/// Parse a full token stream. Nothing is built when this fails.
pub fn parse(lexemes: &[Lexeme], lang: &Language) -> Result<Registry> {
    Parser::new(lexemes).parse_program(lang)
}
