use std::collections::BTreeMap;

use derive_more::{Display, Error};
use tracing::{debug, warn};

use super::{
    parser::{
        types::{GameId, GameString},
        GameObjectMap, Node,
    },
    structures::{Country, Fleet, FromGameObject, Player, Ship, ShipDesign, Starbase, System},
    Galaxy,
};

/// A mandatory part of the save is missing or malformed, so no [Galaxy]
/// can be built.
#[derive(Debug, Display, Error, Clone, PartialEq)]
#[display("while building {context}: {detail}")]
pub struct ModelError {
    /// What was being built, like `fleet 42` or `the country section`
    pub context: String,
    pub detail: String,
}

impl ModelError {
    fn new(context: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            context: context.into(),
            detail: detail.to_string(),
        }
    }
}

/// Reads a section of ids mapped to records into the given collection.
/// Records for which `keep` returns false are skipped.
fn add_records<T: FromGameObject>(
    section: &Node,
    records: &mut BTreeMap<GameId, T>,
    keep: impl Fn(&GameObjectMap) -> bool,
) -> Result<(), ModelError> {
    let context = || format!("the {} section", T::KIND);
    let section = section.as_map().map_err(|err| ModelError::new(context(), err))?;
    for (key, value) in section {
        let id: GameId = key.parse().map_err(|_| {
            ModelError::new(context(), format!("record key `{}` is not an id", key))
        })?;
        match value {
            Node::Map(record) => {
                if !keep(record) {
                    debug!(kind = T::KIND, id, "skipping record");
                    continue;
                }
                let record = T::from_game_object(id, record)
                    .map_err(|err| ModelError::new(format!("{} {}", T::KIND, id), err))?;
                if records.insert(id, record).is_some() {
                    warn!(kind = T::KIND, id, "duplicate id, the later record wins");
                }
            }
            // apparently this isn't a bug, deleted objects stay behind as `id=none`
            value if value.is_none_marker() => {
                debug!(kind = T::KIND, id, "skipping deleted record");
            }
            value => {
                return Err(ModelError::new(
                    format!("{} {}", T::KIND, id),
                    format!("expected a record block, found {}", value.kind()),
                ));
            }
        }
    }
    Ok(())
}

/// A function that processes a top level section of the save file.
/// Based on the key of the section, it updates the [Galaxy] being built.
/// Sections we don't know are ignored, sections repeated in the save are
/// merged into what was already read.
pub(crate) fn process_section(
    key: &str,
    value: &Node,
    galaxy: &mut Galaxy,
) -> Result<(), ModelError> {
    match key {
        "version" => galaxy.version = scalar_text(key, value),
        "name" => galaxy.name = scalar_text(key, value),
        "date" => match value.as_date() {
            Ok(date) => galaxy.date = Some(date),
            Err(err) => warn!(%err, "ignoring malformed save date"),
        },
        "player" => {
            let list = value
                .as_list()
                .map_err(|err| ModelError::new("the player list", err))?;
            for entry in list {
                let player = match entry.as_map() {
                    Ok(entry) => Player::from_entry(entry),
                    Err(err) => {
                        warn!(%err, "ignoring malformed player entry");
                        continue;
                    }
                };
                match player {
                    Ok(player) => galaxy.players.push(player),
                    Err(err) => warn!(%err, "ignoring malformed player entry"),
                }
            }
        }
        "country" => add_records::<Country>(value, &mut galaxy.countries, |_| true)?,
        "fleet" => add_records::<Fleet>(value, &mut galaxy.fleets, |_| true)?,
        "ships" => add_records::<Ship>(value, &mut galaxy.ships, |_| true)?,
        "ship_design" => add_records::<ShipDesign>(value, &mut galaxy.designs, |_| true)?,
        "galactic_object" => add_records::<System>(value, &mut galaxy.systems, System::is_star)?,
        "starbase_mgr" => {
            let manager = value
                .as_map()
                .map_err(|err| ModelError::new("the starbase manager", err))?;
            if let Some(starbases) = manager.get("starbases") {
                add_records::<Starbase>(starbases, &mut galaxy.starbases, |_| true)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn scalar_text(key: &str, value: &Node) -> Option<GameString> {
    match value.as_string() {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(key, %err, "ignoring malformed metadata");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{super::parser::parse, super::structures::GameObjectDerived, *};

    fn galaxy(text: &str) -> Result<Galaxy, ModelError> {
        let mut galaxy = Galaxy::default();
        for (key, value) in &parse(text).unwrap() {
            process_section(key, value, &mut galaxy)?;
        }
        Ok(galaxy)
    }

    #[test]
    fn test_sections() {
        let galaxy = galaxy(
            "version=\"Pyxis v3.12.4\"
            name=\"United Nations of Earth\"
            date=\"2230.01.01\"
            player={ { name=\"Admiral\" country=0 } { country=1 } }
            country={ 0={ name=\"UNE\" } 1=none }
            fleet={ 5={ owner=0 } }
            fleet={ 6={ owner=0 } }
            ships={ 9={ fleet=5 } }
            ship_design={ 3={ ship_size=corvette } }
            galactic_object={ 1={ type=star } 2={ type=nebula } }
            starbase_mgr={ starbases={ 4={ owner=0 } } }
            unknown_section={ 1 2 3 }",
        )
        .unwrap();
        assert_eq!(galaxy.version.as_deref(), Some("Pyxis v3.12.4"));
        assert_eq!(galaxy.name.as_deref(), Some("United Nations of Earth"));
        assert!(galaxy.date.is_some());
        assert_eq!(galaxy.players.len(), 1);
        assert_eq!(galaxy.countries.len(), 1);
        assert_eq!(galaxy.fleets.len(), 2);
        assert_eq!(galaxy.ships.len(), 1);
        assert_eq!(galaxy.designs.len(), 1);
        assert_eq!(galaxy.systems.len(), 1);
        assert_eq!(galaxy.starbases.len(), 1);
    }

    #[test]
    fn test_duplicate_id() {
        let galaxy = galaxy("country={ 1={ name=\"First\" } 1={ name=\"Second\" } }").unwrap();
        assert_eq!(galaxy.countries.len(), 1);
        assert_eq!(galaxy.countries[&1].get_name().as_ref(), "Second");
    }

    #[test]
    fn test_missing_fleet() {
        let err = galaxy("ships={ 42={ name=\"Lost\" } }").unwrap_err();
        assert_eq!(err.context, "ship 42");
        assert_eq!(err.to_string(), "while building ship 42: key fleet missing");
    }

    #[test]
    fn test_bad_key() {
        let err = galaxy("country={ capital={ } }").unwrap_err();
        assert_eq!(err.context, "the country section");
    }

    #[test]
    fn test_scalar_record() {
        let err = galaxy("fleet={ 42=yes }").unwrap_err();
        assert_eq!(err.context, "fleet 42");
    }

    #[test]
    fn test_scalar_section() {
        assert!(galaxy("country=7").is_err());
        assert!(galaxy("country={ }").unwrap().countries.is_empty());
    }
}
