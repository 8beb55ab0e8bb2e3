use derive_more::{Display, Error};

use super::{lexer::LexError, tree::SyntaxError, types::Position};

/// An error that occurred somewhere within the broadly defined parsing process.
/// Neither variant comes with a partial tree, the whole document is rejected.
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum ParseError {
    /// A malformed token
    #[display("{_0}")]
    Lex(LexError),
    /// A structurally invalid document
    #[display("{_0}")]
    Syntax(SyntaxError),
    /// The load was cancelled while parsing
    #[display("parsing cancelled")]
    Cancelled,
}

impl ParseError {
    /// Where in the text the error happened, if it happened somewhere.
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::Lex(err) => Some(err.position()),
            ParseError::Syntax(err) => Some(err.position),
            ParseError::Cancelled => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(value: LexError) -> Self {
        match value {
            LexError::Cancelled { .. } => ParseError::Cancelled,
            other => ParseError::Lex(other),
        }
    }
}

impl From<SyntaxError> for ParseError {
    fn from(value: SyntaxError) -> Self {
        ParseError::Syntax(value)
    }
}
