use std::fmt;

use derive_more::{Display, Error};
use jomini::text::{Operator, ReaderError, ReaderErrorKind, Token as TextToken, TokenReader};

use super::{
    game_object::{Scalar, ScalarKind},
    types::{CancellationToken, GameString, Position},
};

/// How many tokens are emitted between two checks of the cancellation flag.
const CANCEL_POLL_INTERVAL: usize = 4096;

/// The byte order mark some editors put in front of UTF-8 files
const BOM: char = '\u{feff}';

/// A malformed token.
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum LexError {
    /// A quoted string that is never closed. The position is that of the
    /// opening quote.
    #[display("unterminated string starting at {position}")]
    UnterminatedString { position: Position },
    /// An escape sequence we don't know
    #[display("invalid escape sequence `\\{escape}` at {position}")]
    InvalidEscape { position: Position, escape: char },
    /// The text ends in the middle of a token, like a lone `<`
    #[display("unexpected end of input at {position}")]
    UnexpectedEnd { position: Position },
    /// The tokenizer noticed that the load was cancelled.
    #[display("cancelled at {position}")]
    Cancelled { position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedString { position }
            | LexError::InvalidEscape { position, .. }
            | LexError::UnexpectedEnd { position }
            | LexError::Cancelled { position } => *position,
        }
    }
}

/// The kind of a token, along with its value for atoms.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Open,
    Close,
    Equals,
    /// Any operator other than `=`, like `<` or `?=`. Save files don't use
    /// them, the parser rejects them.
    Operator(Operator),
    /// A quoted string or an unquoted atom
    Scalar(Scalar),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Open => f.write_str("`{`"),
            TokenKind::Close => f.write_str("`}`"),
            TokenKind::Equals => f.write_str("`=`"),
            TokenKind::Operator(op) => write!(f, "`{}`", op.symbol()),
            TokenKind::Scalar(s) => match s.kind() {
                ScalarKind::String => write!(f, "string \"{}\"", s),
                ScalarKind::Identifier => write!(f, "`{}`", s),
                kind => write!(f, "{} {}", kind, s),
            },
        }
    }
}

/// A single token, and where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

/// A token copied out of the reader's buffer
enum Lexeme {
    Open,
    Close,
    Operator(Operator),
    /// The contents of a quoted string, escapes not yet resolved
    Quoted(String),
    Unquoted(Scalar),
}

impl From<TextToken<'_>> for Lexeme {
    fn from(value: TextToken<'_>) -> Self {
        match value {
            TextToken::Open => Lexeme::Open,
            TextToken::Close => Lexeme::Close,
            TextToken::Operator(op) => Lexeme::Operator(op),
            TextToken::Quoted(s) => {
                Lexeme::Quoted(String::from_utf8_lossy(s.as_bytes()).into_owned())
            }
            TextToken::Unquoted(s) => {
                Lexeme::Unquoted(Scalar::unquoted(&String::from_utf8_lossy(s.as_bytes())))
            }
        }
    }
}

/// Resolves the escapes of a quoted string. `offset` is where the contents
/// start in the text, for error positions.
fn unescape(contents: &str, offset: usize, lines: &mut LineIndex) -> Result<GameString, LexError> {
    if !contents.contains('\\') {
        return Ok(GameString::from(contents));
    }
    let mut value = String::with_capacity(contents.len());
    let mut chars = contents.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some((_, '"')) => value.push('"'),
            Some((_, '\\')) => value.push('\\'),
            Some((_, 'n')) => value.push('\n'),
            Some((_, 't')) => value.push('\t'),
            Some((_, 'r')) => value.push('\r'),
            Some((_, escape)) => {
                return Err(LexError::InvalidEscape {
                    position: lines.locate(offset + idx),
                    escape,
                })
            }
            None => {
                return Err(LexError::UnterminatedString {
                    position: lines.locate(offset.saturating_sub(1)),
                })
            }
        }
    }
    Ok(GameString::from(value))
}

/// Skips whitespace and comments the same way the reader does, returning
/// the offset of the next meaningful byte.
fn skip_trivia(bytes: &[u8], mut offset: usize) -> usize {
    while let Some(&b) = bytes.get(offset) {
        match b {
            b' ' | b'\t' | b'\n' | b'\r' | b';' => offset += 1,
            b'#' => {
                while bytes.get(offset).is_some_and(|&b| b != b'\n') {
                    offset += 1;
                }
            }
            _ => break,
        }
    }
    offset
}

/// Turns byte offsets into line and column positions. Tokens come in
/// order, so it walks forward from the last offset it was asked about.
struct LineIndex<'a> {
    bytes: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> LineIndex<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn locate(&mut self, offset: usize) -> Position {
        let offset = offset.min(self.bytes.len());
        if offset < self.offset {
            *self = Self::new(self.bytes);
        }
        for &b in &self.bytes[self.offset..offset] {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else if b & 0xC0 != 0x80 {
                // continuation bytes don't start a new character
                self.column += 1;
            }
        }
        self.offset = offset;
        Position::new(self.line, self.column)
    }
}

/// A lazy tokenizer over decoded save file text, reading with jomini's
/// [TokenReader]. Whitespace and `#` comments are skipped. After the first
/// error the tokenizer is exhausted.
pub struct Tokenizer<'a> {
    text: &'a str,
    reader: TokenReader<&'a [u8]>,
    lines: LineIndex<'a>,
    /// Offset right after the last token
    consumed: usize,
    emitted: usize,
    cancel: Option<CancellationToken>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        let text = text.strip_prefix(BOM).unwrap_or(text);
        Self {
            text,
            reader: TokenReader::from_slice(text.as_bytes()),
            lines: LineIndex::new(text.as_bytes()),
            consumed: 0,
            emitted: 0,
            cancel: None,
            done: false,
        }
    }

    /// Makes the tokenizer check the token every so often, and fail with
    /// [LexError::Cancelled] once it is set.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The text being tokenized, without the BOM
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// The position right after the last token
    pub fn current_position(&mut self) -> Position {
        self.lines.locate(self.consumed)
    }

    /// Works out where a token read by jomini starts, given the offset
    /// right after it.
    fn token_start(&self, lexeme: &Lexeme, end: usize) -> usize {
        let bytes = self.text.as_bytes();
        let last = end.checked_sub(1).and_then(|i| bytes.get(i)).copied();
        match lexeme {
            Lexeme::Open | Lexeme::Close => end.saturating_sub(1),
            Lexeme::Operator(op) if op.symbol().len() == 2 && last == Some(b'=') => {
                end.saturating_sub(2)
            }
            Lexeme::Operator(_) => end.saturating_sub(1),
            Lexeme::Quoted(contents) => end.saturating_sub(contents.len() + 2),
            // the reader steps over a single space after an unquoted atom
            Lexeme::Unquoted(s) if last == Some(b' ') => end.saturating_sub(s.text().len() + 1),
            Lexeme::Unquoted(s) => end.saturating_sub(s.text().len()),
        }
    }

    /// Reads the next token, mapping jomini's tokens to ours.
    fn read(&mut self) -> Result<Option<Token>, LexError> {
        let next = self.reader.next().map(|token| token.map(Lexeme::from));
        let lexeme = match next {
            Ok(Some(lexeme)) => lexeme,
            Ok(None) => return Ok(None),
            Err(err) => return self.early_end(&err),
        };
        let end = self.reader.position();
        let start = self.token_start(&lexeme, end);
        let kind = match lexeme {
            Lexeme::Open => TokenKind::Open,
            Lexeme::Close => TokenKind::Close,
            Lexeme::Operator(Operator::Equal) => TokenKind::Equals,
            Lexeme::Operator(op) => TokenKind::Operator(op),
            Lexeme::Quoted(contents) => {
                let text = unescape(&contents, start + 1, &mut self.lines)?;
                TokenKind::Scalar(Scalar::quoted(text))
            }
            Lexeme::Unquoted(scalar) => TokenKind::Scalar(scalar),
        };
        self.consumed = end;
        Ok(Some(Token {
            kind,
            position: self.lines.locate(start),
        }))
    }

    /// The reader stops short of the end of the text when a token is cut
    /// off. Looks at what is left to tell the caller why.
    fn early_end(&mut self, err: &ReaderError) -> Result<Option<Token>, LexError> {
        let offset = match err.kind() {
            ReaderErrorKind::Eof => skip_trivia(self.text.as_bytes(), self.consumed),
            _ => err.position(),
        };
        let rest = self.text.get(offset..).unwrap_or_default().trim_end();
        let position = self.lines.locate(offset);
        if rest.starts_with('"') {
            Err(LexError::UnterminatedString { position })
        } else if rest == "=" {
            // a dangling `=`, the parser reports the missing value
            self.done = true;
            self.consumed = offset + 1;
            Ok(Some(Token {
                kind: TokenKind::Equals,
                position,
            }))
        } else {
            Err(LexError::UnexpectedEnd { position })
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = match self.read() {
            Ok(token) => token?,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        if self.emitted % CANCEL_POLL_INTERVAL == 0 {
            if let Some(cancel) = &self.cancel {
                if cancel.is_cancelled() {
                    self.done = true;
                    return Some(Err(LexError::Cancelled {
                        position: token.position,
                    }));
                }
            }
        }
        self.emitted += 1;
        Some(Ok(token))
    }
}
