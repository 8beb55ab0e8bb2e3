use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use super::{
    super::parser::{
        types::{GameId, GameString},
        GameObjectMap, GameObjectMapping, SaveObjectError,
    },
    id_list, keep_known, optional_name, reference, Arena, Country, FromGameObject,
    GameObjectDerived, GameRef, Resolve, Ship, ShipClass,
};

/// A fleet. Starbases and defense platforms are fleets too, with the
/// `station` flag set.
#[derive(Debug, Clone, Serialize)]
pub struct Fleet {
    id: GameId,
    name: Option<GameString>,
    owner: Option<GameRef<Country>>,
    station: bool,
    /// The power the game computed, kept for reference
    recorded_power: Option<f64>,
    #[serde(skip)]
    listed: Vec<GameId>,
    members: BTreeSet<GameRef<Ship>>,
    composition: BTreeMap<ShipClass, usize>,
    power: f64,
}

impl FromGameObject for Fleet {
    fn from_game_object(id: GameId, base: &GameObjectMap) -> Result<Self, SaveObjectError> {
        Ok(Self {
            id,
            name: optional_name(base),
            owner: reference(base.optional_reference("owner")),
            station: base.optional_boolean("station").unwrap_or(false),
            recorded_power: base.optional_real("military_power"),
            listed: id_list(base, "ships"),
            members: BTreeSet::new(),
            composition: BTreeMap::new(),
            power: 0.0,
        })
    }
}

impl<G: Arena<Country> + Arena<Ship>> Resolve<G> for Fleet {
    fn resolve(&mut self, galaxy: &G) {
        keep_known(&mut self.owner, galaxy);
        for id in std::mem::take(&mut self.listed) {
            match Arena::<Ship>::records(galaxy).get(&id) {
                // the ship's own fleet reference wins over the listing
                Some(ship) if ship.get_fleet().is_some_and(|f| f.get_id() != self.id) => {
                    debug!(fleet = self.id, ship = id, "fleet lists a ship of another fleet")
                }
                Some(ship) => self.add_member(ship),
                None => debug!(fleet = self.id, ship = id, "fleet lists unknown ship"),
            }
        }
    }
}

impl GameObjectDerived for Fleet {
    const KIND: &'static str = "fleet";

    fn get_name(&self) -> GameString {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Fleet #{}", self.id).into(),
        }
    }
}

impl Fleet {
    pub fn get_id(&self) -> GameId {
        self.id
    }

    pub fn get_owner(&self) -> Option<GameRef<Country>> {
        self.owner
    }

    /// Whether the fleet is a station, a starbase or a defense platform
    pub fn is_station(&self) -> bool {
        self.station
    }

    /// The military power the game recorded for the fleet
    pub fn get_recorded_power(&self) -> Option<f64> {
        self.recorded_power
    }

    pub fn get_members(&self) -> &BTreeSet<GameRef<Ship>> {
        &self.members
    }

    /// How many member ships there are of each class
    pub fn get_composition(&self) -> &BTreeMap<ShipClass, usize> {
        &self.composition
    }

    /// Number of member ships of the given class
    pub fn count(&self, class: ShipClass) -> usize {
        self.composition.get(&class).copied().unwrap_or(0)
    }

    /// The summed power of the member ships
    pub fn get_power(&self) -> f64 {
        self.power
    }

    /// Adds a ship to the fleet. Ships already in the fleet are not counted
    /// twice.
    pub(crate) fn add_member(&mut self, ship: &Ship) {
        if self.members.insert(GameRef::new(ship.get_id())) {
            *self.composition.entry(ship.get_class()).or_default() += 1;
            self.power += ship.get_power();
        }
    }
}

#[cfg(test)]
mod tests {
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

    fn fleet(text: &str) -> Fleet {
        Fleet::from_game_object(2, &parse(text).unwrap()).unwrap()
    }

    fn lookup() -> Lookup {
        let country = parse("name=\"Blorg\"").unwrap();
        let ship = |text: &str, id| Ship::from_game_object(id, &parse(text).unwrap()).unwrap();
        Lookup {
            countries: BTreeMap::from([(0, Country::from_game_object(0, &country).unwrap())]),
            ships: BTreeMap::from([
                (10, ship("fleet=2 military_power=40", 10)),
                (11, ship("fleet=2 military_power=60", 11)),
                (12, ship("fleet=3 military_power=500", 12)),
            ]),
        }
    }

    #[test]
    fn test_resolve() {
        let lookup = lookup();
        let mut fleet = fleet("name=\"Strike Group\" owner=0 ships={ 10 11 10 99 } military_power=1.5");
        fleet.resolve(&lookup);
        assert_eq!(fleet.get_name().as_ref(), "Strike Group");
        assert_eq!(fleet.get_owner(), Some(GameRef::new(0)));
        assert_eq!(fleet.get_members().len(), 2);
        assert_eq!(fleet.count(ShipClass::Other), 2);
        assert_eq!(fleet.count(ShipClass::Corvette), 0);
        assert_eq!(fleet.get_power(), 100.0);
        assert_eq!(fleet.get_recorded_power(), Some(1.5));
        assert!(!fleet.is_station());
    }

    #[test]
    fn test_listed_ship_of_another_fleet() {
        let lookup = lookup();
        let mut fleet = fleet("ships={ 10 12 }");
        fleet.resolve(&lookup);
        assert_eq!(fleet.get_members().len(), 1);
        assert!(!fleet.get_members().contains(&GameRef::new(12)));
        assert_eq!(fleet.get_power(), 40.0);
    }

    #[test]
    fn test_unknown_owner() {
        let lookup = lookup();
        let mut fleet = fleet("owner=7 station=yes");
        fleet.resolve(&lookup);
        assert_eq!(fleet.get_owner(), None);
        assert!(fleet.is_station());
        assert_eq!(fleet.get_name().as_ref(), "Fleet #2");
        assert!(fleet.get_members().is_empty());
    }
}
