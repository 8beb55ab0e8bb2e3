use std::collections::BTreeSet;

use serde::Serialize;

use super::{
    super::parser::{
        types::{GameId, GameString},
        GameObjectMap, GameObjectMapping, SaveObjectError,
    },
    id_list, keep_known, optional_name, reference, Arena, Country, Fleet, FromGameObject,
    GameObjectDerived, GameRef, Resolve, Starbase,
};

/// The `type` of galactic objects that are star systems
const STAR_TYPE: &str = "star";

/// Position of a system on the galaxy map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

/// A star system, read from the `galactic_object` section.
#[derive(Debug, Clone, Serialize)]
pub struct System {
    id: GameId,
    name: Option<GameString>,
    star_class: Option<GameString>,
    coordinates: Option<Coordinates>,
    planets: Vec<GameId>,
    starbases: Vec<GameRef<Starbase>>,
    fleets: BTreeSet<GameRef<Fleet>>,
    owner: Option<GameRef<Country>>,
}

impl System {
    /// Whether the galactic object is a star system. Objects without a
    /// `type` are assumed to be stars.
    pub(crate) fn is_star(base: &GameObjectMap) -> bool {
        base.optional_string("type")
            .map_or(true, |kind| kind.as_ref() == STAR_TYPE)
    }
}

impl FromGameObject for System {
    fn from_game_object(id: GameId, base: &GameObjectMap) -> Result<Self, SaveObjectError> {
        let coordinates = base.optional_map("coordinate").map(|c| Coordinates {
            x: c.real_or_default("x"),
            y: c.real_or_default("y"),
        });
        let mut starbases = id_list(base, "starbases");
        starbases.extend(id_list(base, "starbase"));
        starbases.dedup();
        Ok(Self {
            id,
            name: optional_name(base),
            star_class: base.optional_string("star_class"),
            coordinates,
            planets: id_list(base, "planet"),
            starbases: starbases.into_iter().map(GameRef::new).collect(),
            fleets: id_list(base, "fleet_presence")
                .into_iter()
                .map(GameRef::new)
                .collect(),
            owner: reference(base.optional_reference("owner")),
        })
    }
}

impl<G: Arena<Country> + Arena<Fleet> + Arena<Starbase>> Resolve<G> for System {
    fn resolve(&mut self, galaxy: &G) {
        keep_known(&mut self.owner, galaxy);
        let starbases = Arena::<Starbase>::records(galaxy);
        self.starbases.retain(|s| starbases.contains_key(&s.get_id()));
        let fleets = Arena::<Fleet>::records(galaxy);
        self.fleets.retain(|f| fleets.contains_key(&f.get_id()));
    }
}

impl GameObjectDerived for System {
    const KIND: &'static str = "system";

    fn get_name(&self) -> GameString {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("System #{}", self.id).into(),
        }
    }
}

impl System {
    pub fn get_id(&self) -> GameId {
        self.id
    }

    /// The star class, like `sc_g`
    pub fn get_star_class(&self) -> Option<&GameString> {
        self.star_class.as_ref()
    }

    pub fn get_coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Ids of the planets in the system. Planets aren't modeled beyond that.
    pub fn get_planets(&self) -> &[GameId] {
        &self.planets
    }

    pub fn get_starbases(&self) -> &[GameRef<Starbase>] {
        &self.starbases
    }

    /// Fleets present in the system
    pub fn get_fleets(&self) -> &BTreeSet<GameRef<Fleet>> {
        &self.fleets
    }

    /// The owner of the system. This is the explicit owner, or else the
    /// owner of the first starbase that has one.
    pub fn get_owner(&self) -> Option<GameRef<Country>> {
        self.owner
    }

    /// Derives the owner from the starbases, unless the system already has one.
    pub(crate) fn settle_owner<A: Arena<Starbase>>(&mut self, starbases: &A) {
        if self.owner.is_none() {
            self.owner = self
                .starbases
                .iter()
                .filter_map(|s| s.get(starbases))
                .find_map(Starbase::get_owner);
        }
    }
}
