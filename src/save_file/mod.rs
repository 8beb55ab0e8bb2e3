/// A submodule that handles the parsing of the game state text.
/// The text is tokenized and parsed into a tree of [parser::Node] values,
/// without any knowledge of what the values mean.
pub mod parser;

/// A submodule that provides the [GameObjectDerived](structures::GameObjectDerived)
/// objects the [Galaxy] is made of.
/// You can think of them like typed views into the parsed save file.
pub mod structures;

/// A submodule that provides the [SaveFile] object, which holds the raw
/// game state, extracted from the archive if the save is compressed.
mod save_file;
pub use save_file::{LoadOptions, SaveFile, SaveFileError, TextEncoding, MEMORY_SOURCE};

/// A submodule that dispatches the top level sections of the save file.
mod process_section;
pub use process_section::ModelError;

/// A submodule that provides the [Galaxy] object, which is used as a sort of a dictionary.
/// Stellaris save files have a myriad of different objects that reference
/// each other, and in order to allow for centralized storage and easy access,
/// every record is stored in the [Galaxy] keyed by its id.
mod galaxy;
pub use galaxy::{Galaxy, GalaxyBuilder};
