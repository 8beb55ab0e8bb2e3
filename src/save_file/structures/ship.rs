use serde::Serialize;

use super::{
    super::parser::{
        types::{GameId, GameString},
        GameObjectMap, GameObjectMapping, SaveObjectError,
    },
    keep_known, optional_name, reference, Arena, Fleet, FromGameObject, GameObjectDerived,
    GameRef, Resolve, ShipClass, ShipDesign,
};

/// A single ship, starbases and other stations included.
#[derive(Debug, Clone, Serialize)]
pub struct Ship {
    id: GameId,
    name: Option<GameString>,
    fleet: Option<GameRef<Fleet>>,
    design: Option<GameRef<ShipDesign>>,
    /// Power recorded on the ship itself, if any
    recorded_power: Option<f64>,
    // known once the design is resolved
    class: ShipClass,
    power: f64,
}

impl FromGameObject for Ship {
    fn from_game_object(id: GameId, base: &GameObjectMap) -> Result<Self, SaveObjectError> {
        let recorded_power = base.optional_real("military_power");
        Ok(Self {
            id,
            name: optional_name(base),
            fleet: reference(base.get_reference("fleet")?),
            design: reference(base.optional_reference("ship_design")),
            recorded_power,
            class: ShipClass::Other,
            power: recorded_power.unwrap_or(0.0),
        })
    }
}

impl<G: Arena<Fleet> + Arena<ShipDesign>> Resolve<G> for Ship {
    fn resolve(&mut self, galaxy: &G) {
        keep_known(&mut self.fleet, galaxy);
        keep_known(&mut self.design, galaxy);
        let design = self.design.and_then(|d| d.get(galaxy));
        self.class = design.map_or(ShipClass::Other, ShipDesign::get_class);
        self.power = self
            .recorded_power
            .or_else(|| design.map(ShipDesign::get_power))
            .unwrap_or(0.0);
    }
}

impl GameObjectDerived for Ship {
    const KIND: &'static str = "ship";

    fn get_name(&self) -> GameString {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Ship #{}", self.id).into(),
        }
    }
}

impl Ship {
    pub fn get_id(&self) -> GameId {
        self.id
    }

    pub fn get_fleet(&self) -> Option<GameRef<Fleet>> {
        self.fleet
    }

    pub fn get_design(&self) -> Option<GameRef<ShipDesign>> {
        self.design
    }

    /// The class of the ship's design, [ShipClass::Other] without one
    pub fn get_class(&self) -> ShipClass {
        self.class
    }

    /// The power recorded on the ship, or else the power of its design
    pub fn get_power(&self) -> f64 {
        self.power
    }
}
