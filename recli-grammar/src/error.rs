//! Error kinds (spec.md §7). Hand-written enums with manual `Display` impls
//! and `From` conversions between them, mirroring the teacher's own
//! `YaccParserError`/`GrammarValidationError`/`FromYaccParserError` split
//! rather than reaching for a derive-macro error crate the teacher never
//! uses (see DESIGN.md).

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SemanticErrorKind {
    VarargsInOptional,
    VarargsInPlus,
    VarargsInAlternate,
    VarargsNotLast,
    VarargsSoleElement,
    DoublePlus,
    MacroNameNotUppercase,
    MixedCaseKeyword,
    KeywordStartsWithNonLetter,
    KeywordInvalidByte,
    UnknownModifierSuffix(String),
    EmptyAlternation,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticErrorKind::VarargsInOptional => write!(f, "'...' cannot appear inside '[...]'"),
            SemanticErrorKind::VarargsInPlus => write!(f, "'...' cannot appear inside a '+'/'*' repetition"),
            SemanticErrorKind::VarargsInAlternate => write!(f, "'...' cannot appear inside an alternation"),
            SemanticErrorKind::VarargsNotLast => write!(f, "'...' must be the last element"),
            SemanticErrorKind::VarargsSoleElement => write!(f, "'...' cannot be the sole element of a grammar line"),
            SemanticErrorKind::DoublePlus => write!(f, "a '+'/'*' repetition cannot itself be repeated"),
            SemanticErrorKind::MacroNameNotUppercase => write!(f, "macro names must be all-uppercase"),
            SemanticErrorKind::MixedCaseKeyword => write!(f, "keywords must be all-lowercase (all-uppercase names are reserved for macros and data-types)"),
            SemanticErrorKind::KeywordStartsWithNonLetter => write!(f, "a keyword must start with a letter"),
            SemanticErrorKind::KeywordInvalidByte => write!(f, "a keyword may only contain printable bytes"),
            SemanticErrorKind::UnknownModifierSuffix(s) => write!(f, "unknown modifier suffix '/{}'", s),
            SemanticErrorKind::EmptyAlternation => write!(f, "an alternation cannot have an empty alternative written as '||'"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexError {
    pub byte_offset: usize,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructureError {
    pub byte_offset: usize,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SemanticError {
    pub byte_offset: Option<usize>,
    pub kind: SemanticErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationError {
    pub name: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchError {
    pub argv_index: usize,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    Lex(LexError),
    Structure(StructureError),
    Semantic(SemanticError),
    Registration(RegistrationError),
    Match(MatchError),
    Io(String),
}

impl From<LexError> for EngineError {
    fn from(e: LexError) -> Self {
        EngineError::Lex(e)
    }
}
impl From<StructureError> for EngineError {
    fn from(e: StructureError) -> Self {
        EngineError::Structure(e)
    }
}
impl From<SemanticError> for EngineError {
    fn from(e: SemanticError) -> Self {
        EngineError::Semantic(e)
    }
}
impl From<RegistrationError> for EngineError {
    fn from(e: RegistrationError) -> Self {
        EngineError::Registration(e)
    }
}
impl From<MatchError> for EngineError {
    fn from(e: MatchError) -> Self {
        EngineError::Match(e)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Lex(e) => write!(f, "{}", e.message),
            EngineError::Structure(e) => write!(f, "{}", e.message),
            EngineError::Semantic(e) => write!(f, "{}", e.kind),
            EngineError::Registration(e) => write!(f, "'{}': {}", e.name, e.message),
            EngineError::Match(e) => write!(f, "{}", e.message),
            EngineError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl EngineError {
    /// Byte offset into the offending grammar source line, when there is one.
    pub fn byte_offset(&self) -> Option<usize> {
        match self {
            EngineError::Lex(e) => Some(e.byte_offset),
            EngineError::Structure(e) => Some(e.byte_offset),
            EngineError::Semantic(e) => e.byte_offset,
            _ => None,
        }
    }

    pub fn argv_index(&self) -> Option<usize> {
        match self {
            EngineError::Match(e) => Some(e.argv_index),
            _ => None,
        }
    }
}

/// The two-line "offending source line, then a caret" rendering spec.md §7
/// mandates for grammar-file errors.
pub fn render_source_error(line: &str, err: &EngineError) -> String {
    match err.byte_offset() {
        Some(col) => {
            let caret_line: String = line
                .bytes()
                .take(col)
                .map(|b| if b == b'\t' { '\t' } else { ' ' })
                .collect();
            format!("{}\n{}^\n{}", line, caret_line, err)
        }
        None => format!("{}\n{}", line, err),
    }
}

/// The caret-under-the-offending-token rendering spec.md §7 mandates for CLI
/// input validation errors. `argv` is the full typed token list; the caret
/// is placed under the byte column of `argv[err.argv_index()]` within
/// `full_line` (the original, unsplit input).
pub fn render_argv_error(full_line: &str, argv: &[String], err: &EngineError) -> String {
    let idx = match err.argv_index() {
        Some(i) => i,
        None => return format!("{}\n{}", full_line, err),
    };
    let col = argv_column(full_line, argv, idx);
    let caret_line: String = full_line
        .bytes()
        .take(col)
        .map(|b| if b == b'\t' { '\t' } else { ' ' })
        .collect();
    format!("{}\n{}^\n{}", full_line, caret_line, err)
}

fn argv_column(full_line: &str, argv: &[String], idx: usize) -> usize {
    let mut search_from = 0;
    let mut col = 0;
    for (i, tok) in argv.iter().enumerate() {
        match full_line[search_from..].find(tok.as_str()) {
            Some(rel) => {
                let pos = search_from + rel;
                if i == idx {
                    col = pos;
                    break;
                }
                search_from = pos + tok.len();
            }
            None => break,
        }
    }
    col
}
