use std::{any::type_name, fmt, slice};

use derive_more::{Display, Error, From};
use jomini::{
    common::{Date, PdsDate},
    Scalar as TextScalar, ScalarError,
};
use tracing::warn;

use super::types::{GameId, GameString, NULL_ID};

/// An error that can occur when converting a value from a save file.
#[derive(Debug, From, Display, Error)]
pub enum ConversionError {
    /// The value is not of the expected type.
    #[display("failed converting {} to {}", _0, _1)]
    InvalidType(#[error(not(source))] NodeKind, &'static str),
    /// The text of the value is not a number or boolean we can read
    #[display("{}", _0)]
    ScalarError(ScalarError),
    /// A negative number where an id was expected
    #[display("{} is not a valid id", _0)]
    InvalidId(#[error(not(source))] i64),
    #[display("{} is not a valid date", _0)]
    DateError(#[error(not(source))] GameString),
}

/// The scalar the engine writes in place of a deleted record.
const NONE_MARKER: &str = "none";

/// Parses a date in the `Y.M.D` format the engine uses.
pub(crate) fn parse_date(value: &str) -> Option<Date> {
    let mut parts = value.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day), None) => {
            Date::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        }
        _ => None,
    }
}

/// Formats a date the way the engine writes it in the save header,
/// with the month and day padded to two digits.
pub fn format_date(date: Date) -> String {
    format!("{}.{:02}.{:02}", date.year(), date.month(), date.day())
}

/// What an atom looked like when it was read.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// A quoted string, never converted to anything else on its own
    #[display("string")]
    String,
    #[display("identifier")]
    Identifier,
    #[display("integer")]
    Integer,
    #[display("real")]
    Real,
    /// `yes` or `no`
    #[display("boolean")]
    Boolean,
    #[display("date")]
    Date,
}

impl ScalarKind {
    /// Decides what an unquoted atom is. Anything that looks like a number
    /// but doesn't parse as one stays an identifier.
    fn of(atom: &str) -> Self {
        let raw = TextScalar::new(atom.as_bytes());
        if raw.to_bool().is_ok() {
            return ScalarKind::Boolean;
        }
        // jomini reads a lone sign as zero
        let digits = atom.strip_prefix('-').unwrap_or(atom);
        if !digits.starts_with(|c: char| c.is_ascii_digit()) {
            ScalarKind::Identifier
        } else if raw.to_i64().is_ok() {
            ScalarKind::Integer
        } else if raw.to_f64().is_ok() {
            ScalarKind::Real
        } else if parse_date(atom).is_some() {
            ScalarKind::Date
        } else {
            ScalarKind::Identifier
        }
    }
}

/// A leaf value that comes from a save file.
/// The text is kept exactly as it was written, so `007` stays `007`. The
/// kind only records what the text looked like, the numeric value is read
/// out of the text when it is asked for.
#[derive(PartialEq, Clone, Debug)]
pub struct Scalar {
    text: GameString,
    kind: ScalarKind,
}

impl Scalar {
    /// A quoted string, with its escapes already resolved
    pub fn quoted(text: impl Into<GameString>) -> Self {
        Self {
            text: text.into(),
            kind: ScalarKind::String,
        }
    }

    /// An unquoted atom, classified by its text
    pub fn unquoted(atom: &str) -> Self {
        Self {
            kind: ScalarKind::of(atom),
            text: GameString::from(atom),
        }
    }

    pub fn text(&self) -> &GameString {
        &self.text
    }

    pub fn into_text(self) -> GameString {
        self.text
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    fn raw(&self) -> TextScalar<'_> {
        TextScalar::new(self.text.trim().as_bytes())
    }

    fn invalid<T>(&self) -> ConversionError {
        ConversionError::InvalidType(self.kind.into(), type_name::<T>())
    }

    /// Reads the text as an integer. Real numbers are truncated.
    pub fn to_integer(&self) -> Result<i64, ConversionError> {
        match self.kind {
            ScalarKind::Boolean | ScalarKind::Date => Err(self.invalid::<i64>()),
            ScalarKind::Real => Ok(self.to_real()? as i64),
            _ => Ok(self.raw().to_i64()?),
        }
    }

    /// Reads the text as a real number. Integers too large to be exact are
    /// rounded.
    pub fn to_real(&self) -> Result<f64, ConversionError> {
        match self.kind {
            ScalarKind::Boolean | ScalarKind::Date => Err(self.invalid::<f64>()),
            _ => match self.raw().to_f64() {
                Ok(real) | Err(ScalarError::PrecisionLoss(real)) => Ok(real),
                Err(err) => Err(err.into()),
            },
        }
    }

    /// Reads the text as an unsigned id, ids can use the full 64 bits.
    pub fn to_unsigned(&self) -> Result<u64, ConversionError> {
        match self.kind {
            ScalarKind::Integer | ScalarKind::String | ScalarKind::Identifier => {
                Ok(self.raw().to_u64()?)
            }
            _ => Err(self.invalid::<u64>()),
        }
    }

    pub fn to_boolean(&self) -> Result<bool, ConversionError> {
        match self.kind {
            ScalarKind::Boolean | ScalarKind::String | ScalarKind::Identifier => {
                Ok(self.raw().to_bool()?)
            }
            _ => Err(self.invalid::<bool>()),
        }
    }

    /// Reads the text as a date. Quoted dates are parsed on demand.
    pub fn to_date(&self) -> Result<Date, ConversionError> {
        match self.kind {
            ScalarKind::Date | ScalarKind::String | ScalarKind::Identifier => {
                parse_date(self.text.trim())
                    .ok_or_else(|| ConversionError::DateError(self.text.clone()))
            }
            _ => Err(self.invalid::<Date>()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::unquoted(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The shape of a [Node], used in error messages so that we don't have to
/// copy entire subtrees into errors.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    #[display("string")]
    String,
    #[display("integer")]
    Integer,
    #[display("real")]
    Real,
    #[display("boolean")]
    Boolean,
    #[display("date")]
    Date,
    #[display("list")]
    List,
    #[display("map")]
    Map,
}

impl From<ScalarKind> for NodeKind {
    fn from(value: ScalarKind) -> Self {
        match value {
            ScalarKind::String | ScalarKind::Identifier => NodeKind::String,
            ScalarKind::Integer => NodeKind::Integer,
            ScalarKind::Real => NodeKind::Real,
            ScalarKind::Boolean => NodeKind::Boolean,
            ScalarKind::Date => NodeKind::Date,
        }
    }
}

/// A game object that stores values as an array.
pub type GameObjectArray = Vec<Node>;

/// A value that comes from a save file.
/// Blocks are either a [Node::List] of values or a [Node::Map] of key value
/// pairs, decided by what the parser saw inside of them.
/// It's better to use the conversion methods like [Node::as_string] than to
/// match, since the engine is not consistent about the types it writes.
#[derive(PartialEq, Clone, Debug, From)]
pub enum Node {
    Scalar(Scalar),
    List(GameObjectArray),
    Map(GameObjectMap),
}

static EMPTY_MAP: GameObjectMap = GameObjectMap {
    entries: Vec::new(),
};

impl Node {
    /// Returns the shape of this node
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Scalar(s) => s.kind().into(),
            Node::List(_) => NodeKind::List,
            Node::Map(_) => NodeKind::Map,
        }
    }

    fn invalid<T>(&self) -> ConversionError {
        ConversionError::InvalidType(self.kind(), type_name::<T>())
    }

    /// Get the value as a scalar
    pub fn as_scalar(&self) -> Result<&Scalar, ConversionError> {
        match self {
            Node::Scalar(s) => Ok(s),
            _ => Err(self.invalid::<Scalar>()),
        }
    }

    // this API allows for easy error collection using the ? operator.
    /// Get the value as a string. Any scalar can be represented as a string,
    /// it is the text exactly as the file has it.
    pub fn as_string(&self) -> Result<GameString, ConversionError> {
        Ok(self.as_scalar()?.text().clone())
    }

    /// Get the value as an integer. If the value is a real number, it will be
    /// truncated.
    pub fn as_integer(&self) -> Result<i64, ConversionError> {
        self.as_scalar()?.to_integer()
    }

    /// Get the value as a real number. If the value is an integer, it will be
    /// converted to a real number.
    pub fn as_real(&self) -> Result<f64, ConversionError> {
        self.as_scalar()?.to_real()
    }

    /// Get the value as a [GameId]
    pub fn as_id(&self) -> Result<GameId, ConversionError> {
        let scalar = self.as_scalar()?;
        if let Ok(id) = scalar.to_unsigned() {
            return Ok(id);
        }
        let int = scalar.to_integer()?;
        GameId::try_from(int).map_err(|_| ConversionError::InvalidId(int))
    }

    /// Get the value as an id reference. The engine writes [NULL_ID] for
    /// references to nothing, those become [None].
    pub fn as_reference(&self) -> Result<Option<GameId>, ConversionError> {
        let id = self.as_id()?;
        Ok(if id == NULL_ID { None } else { Some(id) })
    }

    /// Get the value as a boolean
    pub fn as_boolean(&self) -> Result<bool, ConversionError> {
        self.as_scalar()?.to_boolean()
    }

    /// Get the value as a date.
    pub fn as_date(&self) -> Result<Date, ConversionError> {
        self.as_scalar()?.to_date()
    }

    /// Get the value as a map. An empty block is a valid empty map even if
    /// it was stored as a list.
    pub fn as_map(&self) -> Result<&GameObjectMap, ConversionError> {
        match self {
            Node::Map(m) => Ok(m),
            Node::List(l) if l.is_empty() => Ok(&EMPTY_MAP),
            _ => Err(self.invalid::<GameObjectMap>()),
        }
    }

    /// Get the value as a list. An empty block is a valid empty list even if
    /// it was stored as a map.
    pub fn as_list(&self) -> Result<&[Node], ConversionError> {
        match self {
            Node::List(l) => Ok(l.as_slice()),
            Node::Map(m) if m.is_empty() => Ok(&[]),
            _ => Err(self.invalid::<GameObjectArray>()),
        }
    }

    /// Whether this is the `none` marker of a deleted record.
    pub fn is_none_marker(&self) -> bool {
        matches!(self, Node::Scalar(s)
            if matches!(s.kind(), ScalarKind::String | ScalarKind::Identifier)
                && s.text().as_ref() == NONE_MARKER)
    }
}

/// A game object that stores values as an ordered list of key value pairs.
/// Keys may repeat, and the order in which they were written is kept, since
/// both are meaningful in save files.
#[derive(PartialEq, Clone, Debug, Default)]
pub struct GameObjectMap {
    entries: Vec<(GameString, Node)>,
}

impl GameObjectMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair, keeping any previous values stored at the same key.
    pub(crate) fn push(&mut self, key: GameString, value: Node) {
        self.entries.push((key, value));
    }

    /// Returns the first value stored at the key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    /// Returns every value stored at the key, in file order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> GameObjectMapIter<'_> {
        GameObjectMapIter {
            inner: self.entries.iter(),
        }
    }
}

impl FromIterator<(GameString, Node)> for GameObjectMap {
    fn from_iter<I: IntoIterator<Item = (GameString, Node)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Iterator over the pairs of a [GameObjectMap]
pub struct GameObjectMapIter<'a> {
    inner: slice::Iter<'a, (GameString, Node)>,
}

impl<'a> Iterator for GameObjectMapIter<'a> {
    type Item = (&'a GameString, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a GameObjectMap {
    type Item = (&'a GameString, &'a Node);
    type IntoIter = GameObjectMapIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An error about a required field of a record
#[derive(Debug, From, Display, Error)]
pub enum SaveObjectError {
    KeyError(KeyError),
    #[display("field {}: {}", _0, _1)]
    InvalidField(String, #[error(source)] ConversionError),
}

/// A key that had to be there, and wasn't.
#[derive(Debug, Display, Error)]
pub enum KeyError {
    #[display("key {} missing", _0)]
    MissingKey(#[error(not(source))] String),
}

/// Accessors over [GameObjectMap].
/// The `get_*` flavor is for mandatory fields and fails with a
/// [SaveObjectError] naming the key, the `optional_*` flavor is for
/// everything else and yields [None] when the key is absent. A value of the
/// wrong shape at an optional key is logged and treated as absent.
pub trait GameObjectMapping {
    /// Get the value of a key, or return an error if the key is missing.
    /// The error is lazily initialized, so performance if the key is present is
    /// not affected.
    fn get_err(&self, key: &str) -> Result<&Node, KeyError>;
    /// Get the value of a key as a string.
    fn get_string(&self, key: &str) -> Result<GameString, SaveObjectError>;
    /// Get the value of a key as a map.
    fn get_map(&self, key: &str) -> Result<&GameObjectMap, SaveObjectError>;
    /// Get the value of a key as an integer.
    fn get_integer(&self, key: &str) -> Result<i64, SaveObjectError>;
    /// Get the value of a key as a real number.
    fn get_real(&self, key: &str) -> Result<f64, SaveObjectError>;
    /// Get the value of a key as a GameId.
    fn get_game_id(&self, key: &str) -> Result<GameId, SaveObjectError>;
    /// Get the value of a key as a reference, the null id being [None].
    fn get_reference(&self, key: &str) -> Result<Option<GameId>, SaveObjectError>;

    /// Applies the conversion to the value at the key, if there is one.
    fn optional<'a, T, F>(&'a self, key: &str, convert: F) -> Option<T>
    where
        F: FnOnce(&'a Node) -> Result<T, ConversionError>;

    fn optional_string(&self, key: &str) -> Option<GameString> {
        self.optional(key, Node::as_string)
    }

    fn optional_real(&self, key: &str) -> Option<f64> {
        self.optional(key, Node::as_real)
    }

    fn optional_integer(&self, key: &str) -> Option<i64> {
        self.optional(key, Node::as_integer)
    }

    fn optional_boolean(&self, key: &str) -> Option<bool> {
        self.optional(key, Node::as_boolean)
    }

    fn optional_date(&self, key: &str) -> Option<Date> {
        self.optional(key, Node::as_date)
    }

    fn optional_map(&self, key: &str) -> Option<&GameObjectMap> {
        self.optional(key, Node::as_map)
    }

    fn optional_list(&self, key: &str) -> Option<&[Node]> {
        self.optional(key, Node::as_list)
    }

    /// An optional reference, absent and null ids both being [None].
    fn optional_reference(&self, key: &str) -> Option<GameId> {
        self.optional(key, Node::as_reference).flatten()
    }

    /// A real number that defaults to zero.
    fn real_or_default(&self, key: &str) -> f64 {
        self.optional_real(key).unwrap_or_default()
    }
}

impl GameObjectMapping for GameObjectMap {
    fn get_err(&self, key: &str) -> Result<&Node, KeyError> {
        self.get(key) // lazy error initialization, else we copy key every time
            .ok_or_else(|| KeyError::MissingKey(key.to_owned()))
    }

    fn get_string(&self, key: &str) -> Result<GameString, SaveObjectError> {
        self.get_err(key)?
            .as_string()
            .map_err(|e| SaveObjectError::InvalidField(key.to_owned(), e))
    }

    fn get_map(&self, key: &str) -> Result<&GameObjectMap, SaveObjectError> {
        self.get_err(key)?
            .as_map()
            .map_err(|e| SaveObjectError::InvalidField(key.to_owned(), e))
    }

    fn get_integer(&self, key: &str) -> Result<i64, SaveObjectError> {
        self.get_err(key)?
            .as_integer()
            .map_err(|e| SaveObjectError::InvalidField(key.to_owned(), e))
    }

    fn get_real(&self, key: &str) -> Result<f64, SaveObjectError> {
        self.get_err(key)?
            .as_real()
            .map_err(|e| SaveObjectError::InvalidField(key.to_owned(), e))
    }

    fn get_game_id(&self, key: &str) -> Result<GameId, SaveObjectError> {
        self.get_err(key)?
            .as_id()
            .map_err(|e| SaveObjectError::InvalidField(key.to_owned(), e))
    }

    fn get_reference(&self, key: &str) -> Result<Option<GameId>, SaveObjectError> {
        self.get_err(key)?
            .as_reference()
            .map_err(|e| SaveObjectError::InvalidField(key.to_owned(), e))
    }

    fn optional<'a, T, F>(&'a self, key: &str, convert: F) -> Option<T>
    where
        F: FnOnce(&'a Node) -> Result<T, ConversionError>,
    {
        match convert(self.get(key)?) {
            Ok(val) => Some(val),
            Err(err) => {
                warn!(key, %err, "ignoring malformed field");
                None
            }
        }
    }
}
