use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use jomini::common::Date;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use super::parser::{
    types::{GameId, GameString},
    format_date, GameObjectMap, GameObjectMapping, Node, SaveObjectError,
};

/// A submodule that provides the [Country] object.
mod country;
pub use country::Country;

/// A submodule that provides the [Ledger] of a country.
mod ledger;
pub use ledger::{Ledger, Resource, ResourceEntry};

/// A submodule that provides the [Fleet] object.
mod fleet;
pub use fleet::Fleet;

/// A submodule that provides the [Ship] object.
mod ship;
pub use ship::Ship;

/// A submodule that provides the [ShipDesign] object, and the [ShipClass]
/// classification of hulls.
mod ship_design;
pub use ship_design::{ShipClass, ShipDesign, ANONYMOUS_DESIGN};

/// A submodule that provides the [System] object.
mod system;
pub use system::{Coordinates, System};

mod starbase;
pub use starbase::Starbase;

/// A submodule that provides the [Player] object.
mod player;
pub use player::Player;

/// A typed reference to a record of a [Galaxy](crate::save_file::Galaxy).
/// It is just the id, the record itself lives in the galaxy. Serializes as
/// the bare id.
pub struct GameRef<T> {
    id: GameId,
    kind: PhantomData<fn() -> T>,
}

impl<T> GameRef<T> {
    pub fn new(id: GameId) -> Self {
        Self {
            id,
            kind: PhantomData,
        }
    }

    pub fn get_id(&self) -> GameId {
        self.id
    }

    /// Looks the record up in the arena.
    pub fn get<'a, A: Arena<T>>(&self, arena: &'a A) -> Option<&'a T> {
        arena.records().get(&self.id)
    }
}

impl<T> Clone for GameRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GameRef<T> {}

impl<T> PartialEq for GameRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for GameRef<T> {}

impl<T> PartialOrd for GameRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for GameRef<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for GameRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for GameRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameRef({})", self.id)
    }
}

impl<T> Serialize for GameRef<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.id)
    }
}

/// Something that owns records of type `T`, keyed by their ids.
pub trait Arena<T> {
    fn records(&self) -> &BTreeMap<GameId, T>;
}

impl<T> Arena<T> for BTreeMap<GameId, T> {
    fn records(&self) -> &BTreeMap<GameId, T> {
        self
    }
}

/// Drops the reference if the arena has no record with its id.
pub(crate) fn keep_known<T: GameObjectDerived, A: Arena<T>>(
    reference: &mut Option<GameRef<T>>,
    arena: &A,
) {
    if let Some(r) = reference {
        if !arena.records().contains_key(&r.get_id()) {
            debug!(kind = T::KIND, id = r.get_id(), "dangling reference");
            *reference = None;
        }
    }
}

/// A trait for objects that come from a save file.
pub trait GameObjectDerived: Sized {
    /// What the records are called, used in messages
    const KIND: &'static str;

    /// Get the name of the object.
    /// Objects without a name get a fallback, so this is never empty.
    fn get_name(&self) -> GameString;
}

/// For [GameObjectDerived] structs that are derived from a single [GameObjectMap].
pub trait FromGameObject: GameObjectDerived {
    /// Creates a new instance of the struct from the record with the given id.
    /// References are taken at face value, they are checked later by
    /// [Resolve].
    fn from_game_object(id: GameId, base: &GameObjectMap) -> Result<Self, SaveObjectError>;
}

/// Needs to be resolved before being used.
///
/// Records can reference records that are parsed after them, or that don't
/// exist at all. Once every record is in the galaxy, [Resolve::resolve] is
/// called on each of them, and references to records that don't exist are
/// dropped.
pub trait Resolve<G> {
    fn resolve(&mut self, galaxy: &G);
}

/// Reads the `name` of a record. Names are either plain strings, or a
/// localization block like `name={ key="NAME_Sol" }`, in which case we use
/// the key. Empty names count as absent.
pub(crate) fn optional_name(base: &GameObjectMap) -> Option<GameString> {
    let name = match base.get("name")? {
        Node::Map(map) => map.optional_string("key"),
        node => match node.as_string() {
            Ok(name) => Some(name),
            Err(err) => {
                warn!(%err, "ignoring malformed name");
                None
            }
        },
    };
    name.filter(|n| !n.trim().is_empty())
}

/// Reads a set of ids that can be either a `key={ 1 2 3 }` list, or the
/// key repeated with a single id each time. Null ids are skipped.
pub(crate) fn id_list(base: &GameObjectMap, key: &str) -> Vec<GameId> {
    let mut ids = Vec::new();
    for node in base.get_all(key) {
        match node {
            Node::Scalar(_) => ids.extend(base_id(node)),
            Node::List(list) => ids.extend(list.iter().filter_map(base_id)),
            Node::Map(map) if map.is_empty() => {}
            Node::Map(_) => warn!(key, "expected a list of ids, found a block"),
        }
    }
    ids
}

fn base_id(node: &Node) -> Option<GameId> {
    match node.as_reference() {
        Ok(id) => id,
        Err(err) => {
            warn!(%err, "ignoring malformed id");
            None
        }
    }
}

/// Turns a possibly absent id into a reference.
pub(crate) fn reference<T>(id: Option<GameId>) -> Option<GameRef<T>> {
    id.map(GameRef::new)
}

/// Serializes an optional date the way the game writes dates.
pub(crate) fn serialize_date<S: Serializer>(
    date: &Option<Date>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serializer.serialize_str(&format_date(*date)),
        None => serializer.serialize_none(),
    }
}
