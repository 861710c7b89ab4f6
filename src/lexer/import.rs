use std::collections::{HashMap, HashSet};
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use super::{Token, lex};
use crate::config::Language;
use crate::source::{Location, SourceMap};

/// A token together with where it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub location: Location,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot load \"{}\": it has no file extension (expected .{expected})", path.display())]
    MissingExtension { path: PathBuf, expected: String },

    #[error("cannot load \"{}\": extension is \".{found}\", expected \".{expected}\"", path.display())]
    WrongExtension { path: PathBuf, found: String, expected: String },

    #[error("cannot read \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid input '{snippet}' at {location}")]
    Lex { location: Location, snippet: String, suggestion: String },

    #[error("unbalanced brackets at {location}: {reason}")]
    UnbalancedBrackets { location: Location, reason: &'static str },

    #[error("cannot resolve import \"{import}\" at {location}: {reason}")]
    UnresolvedImport { location: Location, import: String, reason: String },
}

impl SourceError {
    pub fn code(&self) -> &'static str {
        match self {
            SourceError::Lex { snippet, .. } if snippet.starts_with('<') => "MM-S002",
            SourceError::Lex { .. } => "MM-S001",
            SourceError::MissingExtension { .. } => "MM-S003",
            SourceError::WrongExtension { .. } => "MM-S004",
            SourceError::Read { .. } => "MM-S005",
            SourceError::UnresolvedImport { .. } => "MM-S006",
            SourceError::UnbalancedBrackets { .. } => "MM-S007",
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            SourceError::Lex { location, .. }
            | SourceError::UnresolvedImport { location, .. }
            | SourceError::UnbalancedBrackets { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// Reads a program and everything it imports into one token stream.
///
/// Each file is tokenized at most once per loader, keyed by canonical path;
/// later imports of the same file contribute nothing.
pub struct Loader<'l> {
    lang: &'l Language,
    visited: HashSet<PathBuf>,
    sources: HashMap<PathBuf, Rc<str>>,
}

impl<'l> Loader<'l> {
    pub fn new(lang: &'l Language) -> Self {
        Loader { lang, visited: HashSet::new(), sources: HashMap::new() }
    }

    /// Text of a file this loader has read, for diagnostics.
    pub fn source(&self, path: &Path) -> Option<Rc<str>> {
        self.sources.get(path).cloned()
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.visited.iter().map(PathBuf::as_path)
    }

    pub fn load(&mut self, path: &Path) -> Result<Vec<Lexeme>, SourceError> {
        info!("Lexing \"{}\"", path.display());
        self.tokenize_file(path)
    }

    fn tokenize_file(&mut self, path: &Path) -> Result<Vec<Lexeme>, SourceError> {
        self.check_extension(path)?;

        let canonical = path
            .canonicalize()
            .map_err(|source| SourceError::Read { path: path.to_path_buf(), source })?;
        self.visited.insert(canonical.clone());

        let text: Rc<str> = std::fs::read_to_string(&canonical)
            .map_err(|source| SourceError::Read { path: path.to_path_buf(), source })?
            .into();
        self.sources.insert(canonical.clone(), Rc::clone(&text));

        let file: Rc<Path> = Rc::from(canonical.as_path());
        let map = SourceMap::new(&text);
        let raw = lex(&text).map_err(|e| SourceError::Lex {
            location: map.locate(&file, (e.position..e.position + e.snippet.len().max(1)).into()),
            snippet: e.snippet,
            suggestion: e.suggestion,
        })?;
        debug!("{} tokens in \"{}\"", raw.len(), canonical.display());
        check_brackets(&raw).map_err(|(range, reason)| SourceError::UnbalancedBrackets {
            location: map.locate(&file, range.into()),
            reason,
        })?;

        let mut lexemes = Vec::with_capacity(raw.len());
        for (token, range) in raw {
            let location = map.locate(&file, range.into());
            match token {
                Token::Import(import) => lexemes.extend(self.expand_import(&canonical, import, location)?),
                token => lexemes.push(Lexeme { token, location }),
            }
        }
        Ok(lexemes)
    }

    fn expand_import(
        &mut self,
        importer: &Path,
        import: String,
        location: Location,
    ) -> Result<Vec<Lexeme>, SourceError> {
        let target = resolve_import(importer, &import).ok_or_else(|| SourceError::UnresolvedImport {
            location: location.clone(),
            import: import.clone(),
            reason: format!("\"{}\" has too few parent directories", importer.display()),
        })?;

        let canonical = match target.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                return Err(SourceError::UnresolvedImport {
                    location,
                    reason: format!("\"{}\": {e}", target.display()),
                    import,
                });
            }
        };
        if self.visited.contains(&canonical) {
            debug!("Skipping \"{}\": already imported", canonical.display());
            return Ok(Vec::new());
        }
        self.tokenize_file(&target)
    }

    fn check_extension(&self, path: &Path) -> Result<(), SourceError> {
        let expected = &self.lang.file_extension;
        match path.extension() {
            None => Err(SourceError::MissingExtension {
                path: path.to_path_buf(),
                expected: expected.clone(),
            }),
            Some(ext) if ext.to_string_lossy() == expected.as_str() => Ok(()),
            Some(ext) => Err(SourceError::WrongExtension {
                path: path.to_path_buf(),
                found: ext.to_string_lossy().into_owned(),
                expected: expected.clone(),
            }),
        }
    }
}

/// Every file must close the stacks it opens, whatever it imports.
fn check_brackets(raw: &[(Token, Range<usize>)]) -> Result<(), (Range<usize>, &'static str)> {
    let mut open = Vec::new();
    for (token, range) in raw {
        match token {
            Token::StackOpen => open.push(range.clone()),
            Token::StackClose if open.pop().is_none() => {
                return Err((range.clone(), "']' has no matching '['"));
            }
            _ => {}
        }
    }
    match open.pop() {
        Some(range) => Err((range, "'[' is never closed in this file")),
        None => Ok(()),
    }
}

/// Resolves an import relative to the importing file.
///
/// A leading run of `n` dots climbs `n` levels starting at the importer
/// itself, so one dot means "the importer's directory". Anything else is used
/// as written.
fn resolve_import(importer: &Path, import: &str) -> Option<PathBuf> {
    let parents = import.chars().take_while(|&c| c == '.').count();
    if parents == 0 {
        return Some(PathBuf::from(import));
    }
    let rest = import[parents..].trim_start_matches(['/', '\\']);
    let mut base = importer;
    for _ in 0..parents {
        base = base.parent()?;
    }
    Some(base.join(rest))
}
