use std::collections::BTreeMap;

use jomini::common::Date;
use serde::Serialize;
use tracing::info;

use super::{
    parser::{
        types::{GameId, GameString},
        GameObjectMap,
    },
    process_section::{process_section, ModelError},
    structures::{
        serialize_date, Arena, Country, Fleet, GameRef, Player, Resolve, Ship, ShipDesign,
        Starbase, System,
    },
};

/// The galaxy of a save file, every record we read keyed by its id.
/// Built once per load by the [GalaxyBuilder], read only after that.
#[derive(Debug, Default, Serialize)]
pub struct Galaxy {
    pub(crate) version: Option<GameString>,
    pub(crate) name: Option<GameString>,
    #[serde(serialize_with = "serialize_date")]
    pub(crate) date: Option<Date>,
    pub(crate) players: Vec<Player>,
    pub(crate) countries: BTreeMap<GameId, Country>,
    pub(crate) fleets: BTreeMap<GameId, Fleet>,
    pub(crate) ships: BTreeMap<GameId, Ship>,
    pub(crate) designs: BTreeMap<GameId, ShipDesign>,
    pub(crate) systems: BTreeMap<GameId, System>,
    pub(crate) starbases: BTreeMap<GameId, Starbase>,
}

macro_rules! arena {
    ($t:ty, $field:ident) => {
        impl Arena<$t> for Galaxy {
            fn records(&self) -> &BTreeMap<GameId, $t> {
                &self.$field
            }
        }
    };
}

arena!(Country, countries);
arena!(Fleet, fleets);
arena!(Ship, ships);
arena!(ShipDesign, designs);
arena!(System, systems);
arena!(Starbase, starbases);

impl Galaxy {
    /// Builds the galaxy from the root of a parsed save in one go.
    pub fn from_tree(root: &GameObjectMap) -> Result<Self, ModelError> {
        Ok(GalaxyBuilder::from_tree(root)?.finish())
    }

    /// The game version that wrote the save
    pub fn get_version(&self) -> Option<&GameString> {
        self.version.as_ref()
    }

    /// The name of the save
    pub fn get_name(&self) -> Option<&GameString> {
        self.name.as_ref()
    }

    /// The in game date of the save
    pub fn get_date(&self) -> Option<Date> {
        self.date
    }

    pub fn get_players(&self) -> &[Player] {
        &self.players
    }

    pub fn countries(&self) -> &BTreeMap<GameId, Country> {
        &self.countries
    }

    pub fn fleets(&self) -> &BTreeMap<GameId, Fleet> {
        &self.fleets
    }

    pub fn ships(&self) -> &BTreeMap<GameId, Ship> {
        &self.ships
    }

    pub fn designs(&self) -> &BTreeMap<GameId, ShipDesign> {
        &self.designs
    }

    pub fn systems(&self) -> &BTreeMap<GameId, System> {
        &self.systems
    }

    pub fn starbases(&self) -> &BTreeMap<GameId, Starbase> {
        &self.starbases
    }

    /// Looks up whatever a reference points to
    pub fn get<T>(&self, reference: GameRef<T>) -> Option<&T>
    where
        Self: Arena<T>,
    {
        reference.get(self)
    }
}

/// Resolves the records of one collection against the rest of the galaxy.
/// The collection is taken out while its records are resolved, so the
/// records never see their own collection.
fn resolve_records<T: Resolve<Galaxy>>(
    galaxy: &mut Galaxy,
    field: fn(&mut Galaxy) -> &mut BTreeMap<GameId, T>,
) {
    let mut records = std::mem::take(field(galaxy));
    for record in records.values_mut() {
        record.resolve(galaxy);
    }
    *field(galaxy) = records;
}

/// A [Galaxy] with its references resolved, but with none of the derived
/// aggregates computed yet.
pub struct GalaxyBuilder {
    galaxy: Galaxy,
}

impl GalaxyBuilder {
    /// Reads every known section of the tree, then resolves the references
    /// between the records. The tree is left untouched.
    pub fn from_tree(root: &GameObjectMap) -> Result<Self, ModelError> {
        let mut galaxy = Galaxy::default();
        for (key, value) in root {
            process_section(key, value, &mut galaxy)?;
        }
        // ships first, fleets count resolved ships
        resolve_records(&mut galaxy, |g| &mut g.ships);
        resolve_records(&mut galaxy, |g| &mut g.fleets);
        resolve_records(&mut galaxy, |g| &mut g.starbases);
        resolve_records(&mut galaxy, |g| &mut g.systems);
        let mut players = std::mem::take(&mut galaxy.players);
        for player in players.iter_mut() {
            player.resolve(&galaxy);
        }
        galaxy.players = players;
        info!(
            countries = galaxy.countries.len(),
            fleets = galaxy.fleets.len(),
            ships = galaxy.ships.len(),
            designs = galaxy.designs.len(),
            systems = galaxy.systems.len(),
            starbases = galaxy.starbases.len(),
            "read the galaxy"
        );
        Ok(Self { galaxy })
    }

    /// Computes the derived aggregates, fleet membership and power, system
    /// owners and what each country owns.
    pub fn finish(self) -> Galaxy {
        let mut galaxy = self.galaxy;
        for ship in galaxy.ships.values() {
            if let Some(fleet) = ship.get_fleet() {
                if let Some(fleet) = galaxy.fleets.get_mut(&fleet.get_id()) {
                    fleet.add_member(ship);
                }
            }
        }
        for system in galaxy.systems.values_mut() {
            system.settle_owner(&galaxy.starbases);
        }
        for system in galaxy.systems.values() {
            if let Some(country) = system
                .get_owner()
                .and_then(|o| galaxy.countries.get_mut(&o.get_id()))
            {
                country.add_system(GameRef::new(system.get_id()));
            }
        }
        for fleet in galaxy.fleets.values() {
            if let Some(country) = fleet
                .get_owner()
                .and_then(|o| galaxy.countries.get_mut(&o.get_id()))
            {
                let power = (!fleet.is_station()).then(|| fleet.get_power());
                country.add_fleet(GameRef::new(fleet.get_id()), power);
            }
        }
        info!("finished the galaxy");
        galaxy
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use jomini::common::PdsDate;

    use super::{
        super::{
            parser::parse,
            structures::{GameObjectDerived, Resource, ShipClass},
        },
        *,
    };

    fn galaxy(text: &str) -> Result<Galaxy, Box<dyn Error>> {
        Ok(Galaxy::from_tree(&parse(text)?)?)
    }

    #[test]
    fn test_partial_tolerance() -> Result<(), Box<dyn Error>> {
        let galaxy = galaxy(
            "country={
                1={
                    name=\"Partial\"
                    budget={ last_month={ income={ base={ energy=10 } } } }
                }
            }",
        )?;
        let country = &galaxy.countries()[&1];
        assert_eq!(country.get_ledger().net(Resource::Energy), 10.0);
        assert_eq!(country.get_ledger().net(Resource::Minerals), 0.0);
        assert_eq!(country.get_economy_power(), 0.0);
        Ok(())
    }

    #[test]
    fn test_reference_integrity() -> Result<(), Box<dyn Error>> {
        let galaxy = galaxy(
            "fleet={ 1={ } }
            ship_design={ 10={ name=\"Picket\" ship_size=corvette } }
            ships={
                100={ fleet=1 ship_design=10 }
                101={ fleet=1 ship_design=11 }
            }",
        )?;
        let design = galaxy.ships()[&100]
            .get_design()
            .and_then(|d| galaxy.get(d))
            .ok_or("design should resolve")?;
        assert!(std::ptr::eq(design, &galaxy.designs()[&10]));
        assert_eq!(galaxy.ships()[&101].get_design(), None);
        Ok(())
    }

    #[test]
    fn test_two_fleets() -> Result<(), Box<dyn Error>> {
        let galaxy = galaxy(
            "country={ 0={ name=\"Empire\" } }
            ship_design={
                1={ name=\"Picket\" ship_size=corvette }
                2={ name=\"Warden\" ship_size=destroyer }
                3={ name=\"Lance\" ship_size=cruiser }
                4={ name=\"Hammer\" ship_size=battleship }
            }
            fleet={
                10={ name=\"First\" owner=0 ships={ 100 101 102 } }
                11={ name=\"Second\" owner=0 ships={ 103 } }
            }
            ships={
                100={ fleet=10 ship_design=1 }
                101={ fleet=10 ship_design=1 }
                102={ fleet=10 ship_design=2 }
                103={ fleet=11 ship_design=4 }
                104={ fleet=11 ship_design=3 }
            }",
        )?;
        let first = &galaxy.fleets()[&10];
        assert_eq!(first.count(ShipClass::Corvette), 2);
        assert_eq!(first.count(ShipClass::Destroyer), 1);
        assert_eq!(first.get_power(), 450.0);
        // ship 104 names the fleet without being listed by it
        let second = &galaxy.fleets()[&11];
        assert_eq!(second.get_members().len(), 2);
        assert_eq!(second.count(ShipClass::Battleship), 1);
        assert_eq!(second.count(ShipClass::Cruiser), 1);
        assert_eq!(second.get_power(), 1500.0);
        let country = &galaxy.countries()[&0];
        assert_eq!(country.get_fleets().len(), 2);
        assert_eq!(country.get_fleet_power(), 1950.0);
        Ok(())
    }

    #[test]
    fn test_ship_listed_by_another_fleet() -> Result<(), Box<dyn Error>> {
        let galaxy = galaxy(
            "country={ 0={ name=\"Empire\" } }
            ship_design={ 4={ name=\"Hammer\" ship_size=battleship } }
            fleet={
                10={ name=\"Stale\" owner=0 ships={ 100 } }
                11={ name=\"Current\" owner=0 ships={ } }
            }
            ships={ 100={ fleet=11 ship_design=4 } }",
        )?;
        assert!(galaxy.fleets()[&10].get_members().is_empty());
        assert_eq!(galaxy.fleets()[&11].count(ShipClass::Battleship), 1);
        let country = &galaxy.countries()[&0];
        assert_eq!(country.get_fleet_power(), 1000.0);
        let battleships: usize = galaxy
            .fleets()
            .values()
            .map(|f| f.count(ShipClass::Battleship))
            .sum();
        assert_eq!(battleships, 1);
        Ok(())
    }

    #[test]
    fn test_starbase_ownership() -> Result<(), Box<dyn Error>> {
        let galaxy = galaxy(
            "country={ 0={ name=\"Empire\" } }
            fleet={ 20={ owner=0 station=yes } }
            ship_design={ 5={ ship_size=starbase_outpost } }
            ships={ 30={ fleet=20 ship_design=5 military_power=500 } }
            starbase_mgr={ starbases={ 7={ owner=0 station=30 } } }
            galactic_object={
                1={ name=\"Sol\" starbases={ 7 } }
                2={ name=\"Alpha Centauri\" }
            }",
        )?;
        assert_eq!(galaxy.systems()[&1].get_owner(), Some(GameRef::new(0)));
        assert_eq!(galaxy.systems()[&2].get_owner(), None);
        let country = &galaxy.countries()[&0];
        assert_eq!(country.get_systems().len(), 1);
        assert_eq!(country.get_fleets().len(), 1);
        // stations don't count towards the military
        assert_eq!(country.get_fleet_power(), 0.0);
        let station = galaxy.starbases()[&7]
            .get_station()
            .and_then(|s| galaxy.get(s))
            .ok_or("station should resolve")?;
        assert_eq!(station.get_class(), ShipClass::Starbase);
        Ok(())
    }

    #[test]
    fn test_metadata() -> Result<(), Box<dyn Error>> {
        let galaxy = galaxy(
            "version=\"Andromeda v3.13.0\"
            name=\"Save\"
            date=\"2310.04.15\"
            player={ { name=\"Admiral\" country=0 } { name=\"Guest\" country=5 } }
            country={ 0={ } }",
        )?;
        assert_eq!(galaxy.get_version().map(|v| v.as_ref()), Some("Andromeda v3.13.0"));
        let date = galaxy.get_date().ok_or("date should be read")?;
        assert_eq!((date.year(), date.month(), date.day()), (2310, 4, 15));
        assert_eq!(galaxy.get_players()[0].get_country(), Some(GameRef::new(0)));
        assert_eq!(galaxy.get_players()[1].get_country(), None);
        assert_eq!(galaxy.get_players()[1].get_name().as_ref(), "Guest");
        Ok(())
    }

    #[test]
    fn test_serialize() -> Result<(), Box<dyn Error>> {
        let galaxy = galaxy("date=\"2200.01.01\" country={ 3={ name=\"X\" } }")?;
        let json = serde_json::to_value(&galaxy)?;
        assert_eq!(json["date"], "2200.01.01");
        assert_eq!(json["countries"]["3"]["name"], "X");
        Ok(())
    }
}
