use derive_more::Display;
use serde::Serialize;

use super::{
    super::parser::{
        types::{GameId, GameString},
        GameObjectMap, GameObjectMapping, Node, SaveObjectError,
    },
    optional_name, FromGameObject, GameObjectDerived,
};

/// The label of designs without a name
pub const ANONYMOUS_DESIGN: &str = "<anonymous design>";

/// Power added by every component of a design
const COMPONENT_POWER: f64 = 10.0;

/// The hull class of a ship design, from its `ship_size`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipClass {
    Corvette,
    Destroyer,
    Cruiser,
    Battleship,
    Titan,
    Colossus,
    Juggernaut,
    #[display("Small Fallen Empire Ship")]
    FallenEmpireSmall,
    #[display("Fallen Empire Ship")]
    FallenEmpire,
    #[display("Large Fallen Empire Ship")]
    FallenEmpireLarge,
    Starbase,
    #[display("Defense Platform")]
    DefensePlatform,
    #[display("Ion Cannon")]
    IonCannon,
    /// Mining, research and observation stations
    #[display("Civilian Station")]
    CivilianStation,
    Transport,
    Constructor,
    Science,
    Colonizer,
    Other,
}

impl ShipClass {
    /// Maps a `ship_size` to its class. Sizes we don't know become
    /// [ShipClass::Other].
    pub fn from_size(size: &str) -> ShipClass {
        match size {
            "corvette" => ShipClass::Corvette,
            "destroyer" => ShipClass::Destroyer,
            "cruiser" => ShipClass::Cruiser,
            "battleship" => ShipClass::Battleship,
            "titan" => ShipClass::Titan,
            "colossus" => ShipClass::Colossus,
            "juggernaut" => ShipClass::Juggernaut,
            "small_ship_fallen_empire" => ShipClass::FallenEmpireSmall,
            "large_ship_fallen_empire" => ShipClass::FallenEmpireLarge,
            "ion_cannon" => ShipClass::IonCannon,
            "mining_station" | "research_station" | "observation_station" => {
                ShipClass::CivilianStation
            }
            "transport" => ShipClass::Transport,
            "constructor" => ShipClass::Constructor,
            "science" => ShipClass::Science,
            "colonizer" | "sponsored_colonizer" => ShipClass::Colonizer,
            s if s.starts_with("starbase_") => ShipClass::Starbase,
            s if s.starts_with("military_station_") => ShipClass::DefensePlatform,
            s if s.ends_with("_fallen_empire") => ShipClass::FallenEmpire,
            _ => ShipClass::Other,
        }
    }

    /// The power of the bare hull
    pub fn base_power(&self) -> f64 {
        match self {
            ShipClass::Corvette => 100.0,
            ShipClass::Destroyer => 250.0,
            ShipClass::Cruiser => 500.0,
            ShipClass::Battleship => 1000.0,
            ShipClass::Titan => 4000.0,
            ShipClass::Colossus => 6000.0,
            ShipClass::Juggernaut => 8000.0,
            ShipClass::FallenEmpireSmall => 1000.0,
            ShipClass::FallenEmpire => 2000.0,
            ShipClass::FallenEmpireLarge => 3000.0,
            _ => 0.0,
        }
    }

    /// Whether the class is one of the fallen empire hulls
    pub fn is_fallen_empire(&self) -> bool {
        matches!(
            self,
            ShipClass::FallenEmpireSmall | ShipClass::FallenEmpire | ShipClass::FallenEmpireLarge
        )
    }
}

/// A ship blueprint, shared by every ship built from it.
#[derive(Debug, Clone, Serialize)]
pub struct ShipDesign {
    id: GameId,
    name: Option<GameString>,
    size: Option<GameString>,
    class: ShipClass,
    auto_generated: bool,
    components: usize,
}

/// Counts the components of a design. They live in the `section` blocks,
/// plus the `required_component` entries of the design itself.
fn count_components(base: &GameObjectMap) -> usize {
    let in_sections: usize = base
        .get_all("section")
        .filter_map(|section| match section {
            Node::Map(section) => Some(section.get_all("component").count()),
            _ => None,
        })
        .sum();
    in_sections + base.get_all("required_component").count()
}

impl FromGameObject for ShipDesign {
    fn from_game_object(id: GameId, base: &GameObjectMap) -> Result<Self, SaveObjectError> {
        let size = base.optional_string("ship_size");
        Ok(Self {
            id,
            name: optional_name(base),
            class: size
                .as_deref()
                .map_or(ShipClass::Other, ShipClass::from_size),
            size,
            auto_generated: base.optional_boolean("auto_gen_design").unwrap_or(false),
            components: count_components(base),
        })
    }
}

impl GameObjectDerived for ShipDesign {
    const KIND: &'static str = "ship design";

    fn get_name(&self) -> GameString {
        match &self.name {
            Some(name) => name.clone(),
            None => ANONYMOUS_DESIGN.into(),
        }
    }
}

impl ShipDesign {
    pub fn get_id(&self) -> GameId {
        self.id
    }

    /// Whether the design was given a name
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    /// The raw `ship_size`
    pub fn get_size(&self) -> Option<&GameString> {
        self.size.as_ref()
    }

    pub fn get_class(&self) -> ShipClass {
        self.class
    }

    /// Whether the game made the design on its own
    pub fn is_auto_generated(&self) -> bool {
        self.auto_generated
    }

    pub fn get_component_count(&self) -> usize {
        self.components
    }

    /// Hull power plus a flat amount per component.
    pub fn get_power(&self) -> f64 {
        self.class.base_power() + COMPONENT_POWER * self.components as f64
    }
}
