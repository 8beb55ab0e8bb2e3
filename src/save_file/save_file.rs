use derive_more::{Display, Error, From};
use jomini::{Encoding, Windows1252Encoding};
use serde::Serialize;
use std::{
    borrow::Cow,
    fmt::Debug,
    fs::File,
    io::{self, Cursor, Read},
    path::Path,
    str::{self, Utf8Error},
};
use zip::{read::ZipArchive, result::ZipError};

/// The header of an archive within a save file.
const ARCHIVE_HEADER: &[u8; 4] = b"PK\x03\x04";

/// The name of the archive entry holding the game state. The other entry,
/// `meta`, only duplicates a few fields of it.
const GAMESTATE_ENTRY: &str = "gamestate";

/// The name used for save files that didn't come from a path
pub const MEMORY_SOURCE: &str = "<memory>";

/// An error that can occur when opening a save file.
/// Generally things that are the fault of the user, however unintentional those may be
#[derive(Debug, From, Display, Error)]
pub enum SaveFileError {
    /// Something went wrong with stdlib IO.
    IoError(io::Error),
    /// We found a problem
    #[display("{}", _0)]
    ParseError(#[error(not(source))] &'static str),
    /// Something went wrong with decompressing the save file.
    DecompressionError(ZipError),
    /// Decoding bytes failed
    DecodingError(Utf8Error),
}

/// The encoding of the save file text.
/// The engine writes 8 bit text, and which code page that is has to be
/// declared, not guessed.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TextEncoding {
    /// Current versions of the game write UTF-8
    #[default]
    #[display("utf8")]
    Utf8,
    /// Legacy code page
    #[display("windows1252")]
    Windows1252,
}

/// Decodes Windows-1252 text, using the code page table from [jomini].
/// Bytes are mapped one by one so that nothing but the code page is applied
/// to the text, escapes are left to the tokenizer.
fn decode_windows1252(bytes: &[u8]) -> String {
    let encoding = Windows1252Encoding::new();
    let high: Vec<char> = (0x80..=0xFFu8)
        .map(|b| {
            encoding
                .decode(&[b])
                .chars()
                .next()
                .unwrap_or(char::from(b))
        })
        .collect();
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                char::from(b)
            } else {
                high[usize::from(b - 0x80)]
            }
        })
        .collect()
}

impl TextEncoding {
    /// Decodes the bytes into text.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, SaveFileError> {
        match self {
            TextEncoding::Utf8 => Ok(Cow::Borrowed(str::from_utf8(bytes)?)),
            TextEncoding::Windows1252 => Ok(Cow::Owned(decode_windows1252(bytes))),
        }
    }
}

/// Library side configuration of a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// How the save file text is encoded
    pub encoding: TextEncoding,
}

/// A struct that represents a Stellaris save file.
/// It is just a wrapper around the contents of the save file.
/// This is so that we can abstract away the compression, encoding and just
/// return an abstract object that can be used to read from the save file.
pub struct SaveFile {
    /// The contents of the game state, already extracted from the archive
    contents: Vec<u8>,
    /// Where the contents came from, used in error messages
    source_name: String,
}

impl SaveFile {
    /// Open a save file.
    /// Internally uses [File::open] to open the file and then [SaveFile::read] to read the contents.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<SaveFile, SaveFileError> {
        let mut file = File::open(filename.as_ref())?;
        let metadata = file.metadata()?;
        let mut save = SaveFile::read(&mut file, Some(metadata.len() as usize))?;
        save.source_name = filename.as_ref().display().to_string();
        Ok(save)
    }

    /// Create a new SaveFile instance.
    ///
    /// # Compression
    ///
    /// The save file can be compressed using the zip format, as `.sav` files
    /// are. Function will automatically detect if the save file is compressed
    /// and extract the game state from it.
    pub fn read<F: Read>(
        file: &mut F,
        contents_size: Option<usize>,
    ) -> Result<SaveFile, SaveFileError> {
        let mut contents = if let Some(size) = contents_size {
            Vec::with_capacity(size)
        } else {
            Vec::new()
        };
        file.read_to_end(&mut contents)?;
        SaveFile::from_bytes(contents)
    }

    /// Create a new SaveFile from bytes that are already in memory.
    pub fn from_bytes(contents: Vec<u8>) -> Result<SaveFile, SaveFileError> {
        if contents.is_empty() {
            return Err(SaveFileError::ParseError("Save file is empty"));
        }
        let contents = if contents.starts_with(ARCHIVE_HEADER) {
            let mut archive = ZipArchive::new(Cursor::new(contents))?;
            let mut gamestate = match archive.by_name(GAMESTATE_ENTRY) {
                Ok(entry) => entry,
                Err(ZipError::FileNotFound) => {
                    return Err(SaveFileError::ParseError(
                        "Archive has no gamestate entry",
                    ))
                }
                Err(err) => return Err(err.into()),
            };
            if gamestate.is_dir() {
                return Err(SaveFileError::ParseError("Save file is a directory"));
            }
            let gamestate_size = gamestate.size() as usize;
            let mut contents = Vec::with_capacity(gamestate_size);
            if gamestate.read_to_end(&mut contents)? != gamestate_size {
                return Err(SaveFileError::ParseError("Failed to read the entire file"));
            }
            contents
        } else {
            contents
        };
        Ok(SaveFile {
            contents,
            source_name: MEMORY_SOURCE.to_owned(),
        })
    }

    /// The raw game state bytes
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// The path the save was opened from, or [MEMORY_SOURCE]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Decodes the game state using the given encoding.
    pub fn text(&self, encoding: TextEncoding) -> Result<Cow<'_, str>, SaveFileError> {
        encoding.decode(&self.contents)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use io::{Seek, SeekFrom};
    use zip::write::{SimpleFileOptions, ZipWriter};

    use super::*;

    fn create_zipped_test_file(entries: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let file = Vec::new();
        let cur = Cursor::new(file);
        let mut zip = ZipWriter::new(cur);
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        let mut cur = zip.finish().unwrap();
        cur.seek(SeekFrom::Start(0)).unwrap();
        return cur;
    }

    #[test]
    fn test_open() {
        let mut file = Cursor::new(b"test=1");
        let save = SaveFile::read(&mut file, None).unwrap();
        assert_eq!(save.contents(), b"test=1");
        assert_eq!(save.source_name(), MEMORY_SOURCE);
    }

    #[test]
    fn test_empty() {
        let mut file = Cursor::new(b"");
        assert!(matches!(
            SaveFile::read(&mut file, None),
            Err(SaveFileError::ParseError(_))
        ));
    }

    #[test]
    fn test_compressed_open() {
        let mut file =
            create_zipped_test_file(&[("meta", "version=\"v3\""), ("gamestate", "date=1")]);
        let save = SaveFile::read(&mut file, None).unwrap();
        assert_eq!(save.contents(), b"date=1");
    }

    #[test]
    fn test_archive_without_gamestate() {
        let mut file = create_zipped_test_file(&[("meta", "version=\"v3\"")]);
        assert!(matches!(
            SaveFile::read(&mut file, None),
            Err(SaveFileError::ParseError(_))
        ));
    }

    #[test]
    fn test_open_path() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"version=\"v3.14\"")?;
        let save = SaveFile::open(file.path())?;
        assert_eq!(save.source_name(), file.path().display().to_string());
        assert_eq!(save.text(TextEncoding::Utf8)?, "version=\"v3.14\"");
        Ok(())
    }

    #[test]
    fn test_missing_path() {
        assert!(matches!(
            SaveFile::open("/definitely/not/here.sav"),
            Err(SaveFileError::IoError(_))
        ));
    }

    #[test]
    fn test_encodings() -> Result<(), Box<dyn std::error::Error>> {
        // "Café €" in Windows-1252
        let bytes = b"name=\"Caf\xe9 \x80\"";
        assert!(TextEncoding::Utf8.decode(bytes).is_err());
        assert_eq!(
            TextEncoding::Windows1252.decode(bytes)?,
            "name=\"Café €\""
        );
        let utf8 = "name=\"Café €\"";
        assert_eq!(TextEncoding::Utf8.decode(utf8.as_bytes())?, utf8);
        Ok(())
    }
}
