use clap::{ArgAction, Parser, ValueEnum};
use derive_more::{Display, Error};

use std::path::PathBuf;

use stellaris_stat_viewer::save_file::TextEncoding;

#[derive(Debug, Display, Error, PartialEq)]
pub enum InvalidPath {
    #[display("invalid path (does not exist)")]
    InvalidPath,
    #[display("not a file")]
    NotAFile,
    #[display("not a directory")]
    NotADir,
}

/// A function to parse the save file argument.
fn parse_file_arg(input: &str) -> Result<PathBuf, InvalidPath> {
    let p = PathBuf::from(input);
    if !p.exists() {
        Err(InvalidPath::InvalidPath)
    } else if p.is_file() {
        Ok(p)
    } else {
        Err(InvalidPath::NotAFile)
    }
}

/// A function to parse the directory arguments.
fn parse_dir_arg(input: &str) -> Result<PathBuf, InvalidPath> {
    let p = PathBuf::from(input);
    if !p.exists() {
        Err(InvalidPath::InvalidPath)
    } else if p.is_dir() {
        Ok(p)
    } else {
        Err(InvalidPath::NotADir)
    }
}

/// The encoding of the save file, as it is spelled on the command line.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    #[display("utf8")]
    Utf8,
    #[display("windows1252")]
    Windows1252,
}

impl From<Encoding> for TextEncoding {
    fn from(value: Encoding) -> Self {
        match value {
            Encoding::Utf8 => TextEncoding::Utf8,
            Encoding::Windows1252 => TextEncoding::Windows1252,
        }
    }
}

/// The tables the program can print.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    #[display("overview")]
    Overview,
    #[display("economy")]
    Economy,
    #[display("strategic-resources")]
    StrategicResources,
    #[display("research")]
    Research,
    #[display("technologies")]
    Technologies,
    #[display("fleets")]
    Fleets,
    #[display("military")]
    Military,
    /// Every table, one after another
    #[display("all")]
    All,
}

impl View {
    /// Whether the table `other` is part of this selection
    pub fn shows(&self, other: View) -> bool {
        *self == View::All || *self == other
    }
}

/// The arguments to the program.
#[derive(Parser, Debug)]
#[command(version, about = "Reads a Stellaris save file and prints statistics about its empires")]
pub struct Args {
    #[arg(value_parser = parse_file_arg)]
    /// The path to the save file.
    pub filename: PathBuf,
    #[arg(short, long, value_enum, default_value_t = Encoding::Utf8)]
    /// The encoding of the save file text.
    pub encoding: Encoding,
    #[arg(long, value_enum, default_value_t = View::All)]
    /// The table to print.
    pub view: View,
    #[arg(long, default_value_t = false)]
    /// A flag that tells the program to count starbase stations towards military power.
    pub include_stations: bool,
    #[arg(long, default_value = None, value_parser = parse_dir_arg)]
    /// A directory to export the tables to, as CSV files.
    pub csv: Option<PathBuf>,
    #[arg(long, default_value = None)]
    /// A path to a file to dump the galaxy to, as JSON.
    pub dump: Option<PathBuf>,
    #[arg(short, long, action = ArgAction::Count)]
    /// Increases the logging verbosity, can be repeated.
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let save = tempfile::NamedTempFile::new()?;
        let path = save.path().to_string_lossy().into_owned();
        let args = Args::try_parse_from(["stellaris_stat_viewer", path.as_str()])?;
        assert_eq!(args.filename, save.path());
        assert_eq!(TextEncoding::from(args.encoding), TextEncoding::Utf8);
        assert_eq!(args.view, View::All);
        assert!(!args.include_stations);
        assert!(args.csv.is_none());
        assert_eq!(args.verbose, 0);
        Ok(())
    }

    #[test]
    fn test_options() -> Result<(), Box<dyn Error>> {
        let save = tempfile::NamedTempFile::new()?;
        let dir = tempfile::tempdir()?;
        let save = save.path().to_string_lossy().into_owned();
        let csv = dir.path().to_string_lossy().into_owned();
        let args = Args::try_parse_from([
            "stellaris_stat_viewer",
            save.as_str(),
            "--encoding",
            "windows1252",
            "--view",
            "strategic-resources",
            "--include-stations",
            "--csv",
            csv.as_str(),
            "-vv",
        ])?;
        assert_eq!(TextEncoding::from(args.encoding), TextEncoding::Windows1252);
        assert_eq!(args.view, View::StrategicResources);
        assert!(args.include_stations);
        assert_eq!(args.csv.as_deref(), Some(dir.path()));
        assert_eq!(args.verbose, 2);
        Ok(())
    }

    #[test]
    fn test_invalid_paths() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let dir = dir.path().to_string_lossy().into_owned();
        assert!(Args::try_parse_from(["stellaris_stat_viewer", "/no/such/save.sav"]).is_err());
        // a directory is not a save file
        assert!(Args::try_parse_from(["stellaris_stat_viewer", dir.as_str()]).is_err());
        assert_eq!(parse_dir_arg("/no/such/dir"), Err(InvalidPath::InvalidPath));
        Ok(())
    }

    #[test]
    fn test_view_selection() {
        assert!(View::All.shows(View::Fleets));
        assert!(View::Fleets.shows(View::Fleets));
        assert!(!View::Economy.shows(View::Fleets));
        assert!(View::All.shows(View::Technologies));
    }

    #[test]
    fn test_unknown_encoding() {
        let save = tempfile::NamedTempFile::new().unwrap();
        let save = save.path().to_string_lossy().into_owned();
        let parsed =
            Args::try_parse_from(["stellaris_stat_viewer", save.as_str(), "--encoding", "latin1"]);
        assert!(parsed.is_err());
    }
}
