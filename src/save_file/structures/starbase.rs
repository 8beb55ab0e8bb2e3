use serde::Serialize;

use super::{
    super::parser::{
        types::{GameId, GameString},
        GameObjectMap, GameObjectMapping, SaveObjectError,
    },
    keep_known, reference, Arena, Country, FromGameObject, GameObjectDerived, GameRef, Resolve,
    Ship,
};

/// A starbase, read from `starbase_mgr.starbases`. The station itself is a
/// [Ship].
#[derive(Debug, Clone, Serialize)]
pub struct Starbase {
    id: GameId,
    owner: Option<GameRef<Country>>,
    station: Option<GameRef<Ship>>,
    level: Option<GameString>,
}

impl FromGameObject for Starbase {
    fn from_game_object(id: GameId, base: &GameObjectMap) -> Result<Self, SaveObjectError> {
        Ok(Self {
            id,
            owner: reference(base.optional_reference("owner")),
            station: reference(base.optional_reference("station")),
            level: base.optional_string("level"),
        })
    }
}

impl<G: Arena<Country> + Arena<Ship>> Resolve<G> for Starbase {
    fn resolve(&mut self, galaxy: &G) {
        keep_known(&mut self.owner, galaxy);
        keep_known(&mut self.station, galaxy);
    }
}

impl GameObjectDerived for Starbase {
    const KIND: &'static str = "starbase";

    fn get_name(&self) -> GameString {
        format!("Starbase #{}", self.id).into()
    }
}

impl Starbase {
    pub fn get_id(&self) -> GameId {
        self.id
    }

    pub fn get_owner(&self) -> Option<GameRef<Country>> {
        self.owner
    }

    /// The ship that is the station
    pub fn get_station(&self) -> Option<GameRef<Ship>> {
        self.station
    }

    /// The upgrade level, like `starbase_level_citadel`
    pub fn get_level(&self) -> Option<&GameString> {
        self.level.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{super::super::parser::parse, *};

    struct Lookup {
        countries: BTreeMap<GameId, Country>,
        ships: BTreeMap<GameId, Ship>,
    }

    impl Arena<Country> for Lookup {
        fn records(&self) -> &BTreeMap<GameId, Country> {
            &self.countries
        }
    }

    impl Arena<Ship> for Lookup {
        fn records(&self) -> &BTreeMap<GameId, Ship> {
            &self.ships
        }
    }

    #[test]
    fn test_starbase() {
        let lookup = Lookup {
            countries: BTreeMap::from([(
                0,
                Country::from_game_object(0, &parse("name=\"Tzynn\"").unwrap()).unwrap(),
            )]),
            ships: BTreeMap::new(),
        };
        let base = parse("level=\"starbase_level_starport\" owner=0 station=12 modules={ 1=shipyard }")
            .unwrap();
        let mut starbase = Starbase::from_game_object(8, &base).unwrap();
        starbase.resolve(&lookup);
        assert_eq!(starbase.get_owner(), Some(GameRef::new(0)));
        assert_eq!(starbase.get_station(), None);
        assert_eq!(
            starbase.get_level().map(|l| l.as_ref()),
            Some("starbase_level_starport")
        );
        assert_eq!(starbase.get_name().as_ref(), "Starbase #8");
    }
}
