use serde::Serialize;

use super::save_file::{
    parser::types::{GameId, GameString},
    structures::{Country, GameObjectDerived, Resource, ShipClass, ShipDesign},
    Galaxy,
};

/// The net monthly flow of every resource of a country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomyRow {
    #[serde(rename = "Id")]
    pub id: GameId,
    #[serde(rename = "Name")]
    pub name: GameString,
    #[serde(rename = "Energy")]
    pub energy: f64,
    #[serde(rename = "Minerals")]
    pub minerals: f64,
    #[serde(rename = "Food")]
    pub food: f64,
    #[serde(rename = "Influence")]
    pub influence: f64,
    #[serde(rename = "Unity")]
    pub unity: f64,
    #[serde(rename = "Alloys")]
    pub alloys: f64,
    #[serde(rename = "Consumer Goods")]
    pub consumer_goods: f64,
}

/// A single fleet, its power and what it is made of.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetRow {
    #[serde(rename = "Id")]
    pub id: GameId,
    #[serde(rename = "Name")]
    pub name: GameString,
    #[serde(rename = "Total Fleet Power")]
    pub total_power: f64,
    #[serde(rename = "# Corvettes")]
    pub corvettes: usize,
    #[serde(rename = "# Destroyers")]
    pub destroyers: usize,
    #[serde(rename = "# Cruisers")]
    pub cruisers: usize,
    #[serde(rename = "# Battleships")]
    pub battleships: usize,
}

/// The headline numbers of a country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewRow {
    #[serde(rename = "Id")]
    pub id: GameId,
    #[serde(rename = "Name")]
    pub name: GameString,
    /// Power of the country's fleets, stations excluded
    #[serde(rename = "Military")]
    pub military: f64,
    /// Economy power as the game reports it
    #[serde(rename = "Economy")]
    pub economy: f64,
    /// Tech power as reported by the game
    #[serde(rename = "Technology")]
    pub technology: f64,
    #[serde(rename = "# Technologies")]
    pub technologies: usize,
    #[serde(rename = "Systems owned")]
    pub systems_owned: usize,
}

/// The whole military of a country, summed over its fleets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilitaryRow {
    #[serde(rename = "Id")]
    pub id: GameId,
    #[serde(rename = "Name")]
    pub name: GameString,
    #[serde(rename = "Total Fleet Power")]
    pub power: f64,
    #[serde(rename = "# Corvettes")]
    pub corvettes: usize,
    #[serde(rename = "# Destroyers")]
    pub destroyers: usize,
    #[serde(rename = "# Cruisers")]
    pub cruisers: usize,
    #[serde(rename = "# Battleships")]
    pub battleships: usize,
    #[serde(rename = "# Titans")]
    pub titans: usize,
    #[serde(rename = "# Colossi")]
    pub colossi: usize,
    #[serde(rename = "# FE ships")]
    pub fallen_empire: usize,
}

/// The net monthly flow of the strategic resources of a country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategicResourcesRow {
    #[serde(rename = "Id")]
    pub id: GameId,
    #[serde(rename = "Name")]
    pub name: GameString,
    #[serde(rename = "Volatile Motes")]
    pub volatile_motes: f64,
    #[serde(rename = "Rare Crystals")]
    pub rare_crystals: f64,
    #[serde(rename = "Exotic Gases")]
    pub exotic_gases: f64,
    #[serde(rename = "Zro")]
    pub zro: f64,
    #[serde(rename = "Dark Matter")]
    pub dark_matter: f64,
    #[serde(rename = "Living Metal")]
    pub living_metal: f64,
    #[serde(rename = "Nanites")]
    pub nanites: f64,
}

/// The monthly research output of a country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchRow {
    #[serde(rename = "Id")]
    pub id: GameId,
    #[serde(rename = "Name")]
    pub name: GameString,
    #[serde(rename = "Physics")]
    pub physics: f64,
    #[serde(rename = "Society")]
    pub society: f64,
    #[serde(rename = "Engineering")]
    pub engineering: f64,
}

/// A technology a country has researched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnologyRow {
    #[serde(rename = "Id")]
    pub id: GameId,
    #[serde(rename = "Name")]
    pub name: GameString,
    #[serde(rename = "Technology")]
    pub technology: GameString,
}

/// One row per country, with the net flow of each resource.
pub fn economy_rows(galaxy: &Galaxy) -> Vec<EconomyRow> {
    galaxy
        .countries()
        .values()
        .map(|country| {
            let ledger = country.get_ledger();
            EconomyRow {
                id: country.get_id(),
                name: country.get_name(),
                energy: ledger.net(Resource::Energy),
                minerals: ledger.net(Resource::Minerals),
                food: ledger.net(Resource::Food),
                influence: ledger.net(Resource::Influence),
                unity: ledger.net(Resource::Unity),
                alloys: ledger.net(Resource::Alloys),
                consumer_goods: ledger.net(Resource::ConsumerGoods),
            }
        })
        .collect()
}

/// One row per fleet.
pub fn fleets_rows(galaxy: &Galaxy) -> Vec<FleetRow> {
    galaxy
        .fleets()
        .values()
        .map(|fleet| FleetRow {
            id: fleet.get_id(),
            name: fleet.get_name(),
            total_power: fleet.get_power(),
            corvettes: fleet.count(ShipClass::Corvette),
            destroyers: fleet.count(ShipClass::Destroyer),
            cruisers: fleet.count(ShipClass::Cruiser),
            battleships: fleet.count(ShipClass::Battleship),
        })
        .collect()
}

/// One row per country.
pub fn overview_rows(galaxy: &Galaxy) -> Vec<OverviewRow> {
    galaxy
        .countries()
        .values()
        .map(|country| OverviewRow {
            id: country.get_id(),
            name: country.get_name(),
            military: country.get_fleet_power(),
            economy: country.get_economy_power(),
            technology: country.get_tech_power(),
            technologies: country.get_tech_count(),
            systems_owned: country.get_systems().len(),
        })
        .collect()
}

/// One row per country, with the net flow of each strategic resource.
pub fn strategic_resources_rows(galaxy: &Galaxy) -> Vec<StrategicResourcesRow> {
    galaxy
        .countries()
        .values()
        .map(|country| {
            let ledger = country.get_ledger();
            StrategicResourcesRow {
                id: country.get_id(),
                name: country.get_name(),
                volatile_motes: ledger.net_of("volatile_motes"),
                rare_crystals: ledger.net_of("rare_crystals"),
                exotic_gases: ledger.net_of("exotic_gases"),
                zro: ledger.net_of("sr_zro"),
                dark_matter: ledger.net_of("sr_dark_matter"),
                living_metal: ledger.net_of("sr_living_metal"),
                nanites: ledger.net_of("nanites"),
            }
        })
        .collect()
}

/// One row per country, with its net research output per field.
pub fn research_rows(galaxy: &Galaxy) -> Vec<ResearchRow> {
    galaxy
        .countries()
        .values()
        .map(|country| {
            let ledger = country.get_ledger();
            ResearchRow {
                id: country.get_id(),
                name: country.get_name(),
                physics: ledger.net_of("physics_research"),
                society: ledger.net_of("society_research"),
                engineering: ledger.net_of("engineering_research"),
            }
        })
        .collect()
}

/// One row per researched technology, grouped by country in id order and
/// in the order the save lists them.
pub fn technologies_rows(galaxy: &Galaxy) -> Vec<TechnologyRow> {
    galaxy
        .countries()
        .values()
        .flat_map(|country| {
            let name = country.get_name();
            country
                .get_technologies()
                .iter()
                .map(move |tech| TechnologyRow {
                    id: country.get_id(),
                    name: name.clone(),
                    technology: tech.clone(),
                })
        })
        .collect()
}

fn military_row(galaxy: &Galaxy, country: &Country, include_stations: bool) -> MilitaryRow {
    let mut row = MilitaryRow {
        id: country.get_id(),
        name: country.get_name(),
        power: 0.0,
        corvettes: 0,
        destroyers: 0,
        cruisers: 0,
        battleships: 0,
        titans: 0,
        colossi: 0,
        fallen_empire: 0,
    };
    for fleet in country.get_fleets().iter().filter_map(|f| galaxy.get(*f)) {
        if include_stations || !fleet.is_station() {
            row.power += fleet.get_power();
        }
        for (class, count) in fleet.get_composition() {
            match class {
                ShipClass::Corvette => row.corvettes += count,
                ShipClass::Destroyer => row.destroyers += count,
                ShipClass::Cruiser => row.cruisers += count,
                ShipClass::Battleship => row.battleships += count,
                ShipClass::Titan => row.titans += count,
                ShipClass::Colossus => row.colossi += count,
                class if class.is_fallen_empire() => row.fallen_empire += count,
                _ => {}
            }
        }
    }
    row
}

/// One row per country, summing up all of its fleets.
/// Stations only count towards the power if `include_stations` is set.
pub fn military_rows(galaxy: &Galaxy, include_stations: bool) -> Vec<MilitaryRow> {
    galaxy
        .countries()
        .values()
        .map(|country| military_row(galaxy, country, include_stations))
        .collect()
}

/// The label of a design, never empty.
pub fn design_label(design: &ShipDesign) -> GameString {
    design.get_name()
}
