use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use derive_more::Display;
use serde::Serialize;

/// A type alias for a game object id.
/// Stellaris ids are unsigned and fit in 32 bits, but some sections use the
/// full 64 bit range for packed ids, so we keep the wider type.
pub type GameId = u64;

/// The id the engine writes when a reference points at nothing.
pub const NULL_ID: GameId = u32::MAX as GameId;

/// A type alias for a game string.
/// Roughly meant to represent a raw string from a save file, reference counted so that it exists once in memory.
/// Actually an [Arc] around a [str], so that a finished model can be shared
/// between threads.
pub type GameString = Arc<str>;

/// A position inside the decoded save file text.
/// Both the line and the column are 1-based, the column counts characters, not bytes.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[display("line {line}, column {column}")]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Returns a short excerpt of the line this position points at, used in
    /// error messages.
    pub fn excerpt(&self, text: &str) -> Option<String> {
        const EXCERPT_LEN: usize = 48;
        let line = text.lines().nth(self.line.checked_sub(1)?)?;
        let start = self.column.saturating_sub(EXCERPT_LEN / 2 + 1);
        let excerpt: String = line.chars().skip(start).take(EXCERPT_LEN).collect();
        let excerpt = excerpt.trim();
        if excerpt.is_empty() {
            None
        } else {
            Some(excerpt.to_owned())
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// A shared flag used to abort a load that is in progress.
/// Clones share the flag, so one clone can be handed to a worker while the
/// host keeps another to cancel with.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Work already finished is not undone.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Wrapper that displays an optional excerpt, or nothing.
pub(crate) struct Excerpt<'a>(pub &'a Option<String>);

impl fmt::Display for Excerpt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(excerpt) => write!(f, " near `{}`", excerpt),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt() {
        let text = "a=1\nfleet={ name=\"Home Guard\" }\n";
        let pos = Position::new(2, 7);
        assert_eq!(
            pos.excerpt(text).as_deref(),
            Some("fleet={ name=\"Home Guard\" }")
        );
        assert_eq!(Position::new(5, 1).excerpt(text), None);
        assert_eq!(Position::new(0, 1).excerpt(text), None);
    }

    #[test]
    fn test_cancellation_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_display() {
        assert_eq!(Position::new(3, 14).to_string(), "line 3, column 14");
    }
}
