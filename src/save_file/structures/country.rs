use std::collections::BTreeSet;

use serde::Serialize;

use super::{
    super::parser::{
        types::{GameId, GameString},
        GameObjectMap, GameObjectMapping, Node, SaveObjectError,
    },
    id_list, optional_name, Fleet, FromGameObject, GameObjectDerived, GameRef, Ledger, System,
};

/// A country, or empire. Also covers the non playable countries the game
/// uses for monsters, pirates and the like.
#[derive(Debug, Clone, Serialize)]
pub struct Country {
    id: GameId,
    name: Option<GameString>,
    ledger: Ledger,
    /// The power ratings the game itself computed
    military_power: f64,
    economy_power: f64,
    tech_power: f64,
    /// Researched technologies
    technologies: Vec<GameString>,
    controlled_planets: usize,
    // the fields below are filled in once the galaxy is complete
    systems: BTreeSet<GameRef<System>>,
    fleets: BTreeSet<GameRef<Fleet>>,
    fleet_power: f64,
}

/// Reads the `technology=` entries of `tech_status`. The block repeats the
/// key once per researched technology.
fn technologies(base: &GameObjectMap) -> Vec<GameString> {
    let Some(status) = base.optional_map("tech_status") else {
        return Vec::new();
    };
    status
        .get_all("technology")
        .filter_map(|node| match node {
            Node::Scalar(_) => node.as_string().ok(),
            _ => None,
        })
        .collect()
}

impl FromGameObject for Country {
    fn from_game_object(id: GameId, base: &GameObjectMap) -> Result<Self, SaveObjectError> {
        Ok(Self {
            id,
            name: optional_name(base),
            ledger: Ledger::from_country(base),
            military_power: base.real_or_default("military_power"),
            economy_power: base.real_or_default("economy_power"),
            tech_power: base.real_or_default("tech_power"),
            technologies: technologies(base),
            controlled_planets: id_list(base, "controlled_planets").len(),
            systems: BTreeSet::new(),
            fleets: BTreeSet::new(),
            fleet_power: 0.0,
        })
    }
}

impl GameObjectDerived for Country {
    const KIND: &'static str = "country";

    fn get_name(&self) -> GameString {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Country #{}", self.id).into(),
        }
    }
}

impl Country {
    pub fn get_id(&self) -> GameId {
        self.id
    }

    pub fn get_ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Military power as reported by the game
    pub fn get_military_power(&self) -> f64 {
        self.military_power
    }

    /// Economy power as reported by the game
    pub fn get_economy_power(&self) -> f64 {
        self.economy_power
    }

    /// Tech power as reported by the game
    pub fn get_tech_power(&self) -> f64 {
        self.tech_power
    }

    pub fn get_technologies(&self) -> &[GameString] {
        &self.technologies
    }

    /// Number of researched technologies
    pub fn get_tech_count(&self) -> usize {
        self.technologies.len()
    }

    pub fn get_controlled_planets(&self) -> usize {
        self.controlled_planets
    }

    /// Systems owned by the country
    pub fn get_systems(&self) -> &BTreeSet<GameRef<System>> {
        &self.systems
    }

    /// Fleets owned by the country, stations included
    pub fn get_fleets(&self) -> &BTreeSet<GameRef<Fleet>> {
        &self.fleets
    }

    /// Summed power of the country's mobile fleets, computed from the ships
    pub fn get_fleet_power(&self) -> f64 {
        self.fleet_power
    }

    pub(crate) fn add_system(&mut self, system: GameRef<System>) {
        self.systems.insert(system);
    }

    pub(crate) fn add_fleet(&mut self, fleet: GameRef<Fleet>, power: Option<f64>) {
        self.fleets.insert(fleet);
        if let Some(power) = power {
            self.fleet_power += power;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{super::super::parser::parse, *};

    fn country(text: &str) -> Country {
        Country::from_game_object(3, &parse(text).unwrap()).unwrap()
    }

    #[test]
    fn test_full() {
        let country = country(
            "name={ key=\"Commonwealth of Man\" }
            tech_status={
                technology=\"tech_lasers_1\" level=1
                technology=\"tech_mining_1\" level=1
                potential={ tech_x=\"weight\" }
            }
            military_power=1500.5
            economy_power=300
            tech_power=42.25
            controlled_planets={ 1 2 3 }",
        );
        assert_eq!(country.get_name().as_ref(), "Commonwealth of Man");
        assert_eq!(country.get_tech_count(), 2);
        assert_eq!(country.get_military_power(), 1500.5);
        assert_eq!(country.get_economy_power(), 300.0);
        assert_eq!(country.get_tech_power(), 42.25);
        assert_eq!(country.get_controlled_planets(), 3);
    }

    #[test]
    fn test_defaults() {
        let country = country("flag={ }");
        assert_eq!(country.get_name().as_ref(), "Country #3");
        assert_eq!(country.get_tech_count(), 0);
        assert_eq!(country.get_economy_power(), 0.0);
        assert!(country.get_fleets().is_empty());
    }
}
