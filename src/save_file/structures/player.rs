use serde::Serialize;

use super::{
    super::parser::{types::GameString, GameObjectMap, GameObjectMapping, SaveObjectError},
    keep_known, reference, Arena, Country, GameObjectDerived, GameRef, Resolve,
};

/// A human player, from the `player` list at the top of the save.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    name: GameString,
    country: Option<GameRef<Country>>,
}

impl Player {
    /// Reads a single entry of the `player` list.
    pub(crate) fn from_entry(base: &GameObjectMap) -> Result<Self, SaveObjectError> {
        Ok(Self {
            name: base.get_string("name")?,
            country: reference(base.optional_reference("country")),
        })
    }

    /// The country the player plays as
    pub fn get_country(&self) -> Option<GameRef<Country>> {
        self.country
    }
}

impl<G: Arena<Country>> Resolve<G> for Player {
    fn resolve(&mut self, galaxy: &G) {
        keep_known(&mut self.country, galaxy);
    }
}

impl GameObjectDerived for Player {
    const KIND: &'static str = "player";

    fn get_name(&self) -> GameString {
        self.name.clone()
    }
}
