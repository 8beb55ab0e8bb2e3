use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex, PoisonError, RwLock},
    thread::{self, JoinHandle},
};

use derive_more::{Display, Error, From};
use tracing::{debug, info};

use super::save_file::{
    parser::{parse_cancellable, types::CancellationToken, ParseError},
    Galaxy, GalaxyBuilder, LoadOptions, ModelError, SaveFile, SaveFileError,
};

/// The stages of a load, reported in order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadStage {
    /// Reading, decoding and parsing the save file
    #[display("(1/3) Loading…")]
    Loading,
    /// Reading the records of the parsed tree
    #[display("(2/3) Building Galaxy…")]
    BuildingGalaxy,
    /// Computing the derived aggregates
    #[display("(3/3) Finishing work…")]
    Finishing,
}

/// Something that wants to know how a load is progressing.
pub trait LoadObserver {
    /// Called once a stage starts
    fn stage(&mut self, stage: LoadStage);
}

impl<F: FnMut(LoadStage)> LoadObserver for F {
    fn stage(&mut self, stage: LoadStage) {
        self(stage)
    }
}

impl LoadObserver for mpsc::Sender<LoadStage> {
    fn stage(&mut self, stage: LoadStage) {
        // nobody listening is fine
        let _ = self.send(stage);
    }
}

/// Where the save file of a load comes from.
#[derive(Debug, Clone, From)]
pub enum LoadSource {
    /// A save file on disk
    Path(PathBuf),
    /// A save file already in memory
    Bytes(Vec<u8>),
}

impl From<&Path> for LoadSource {
    fn from(value: &Path) -> Self {
        LoadSource::Path(value.to_path_buf())
    }
}

impl From<&str> for LoadSource {
    fn from(value: &str) -> Self {
        LoadSource::Path(PathBuf::from(value))
    }
}

/// Why a load failed. No [Galaxy] is produced in any of these cases.
#[derive(Debug, Display, Error)]
pub enum LoadError {
    /// The save file couldn't be read or decoded
    #[display("{_0}")]
    File(SaveFileError),
    /// The save file text is malformed
    #[display("{source_name}: {error}")]
    Parse {
        /// The path of the save file, or [MEMORY_SOURCE](crate::save_file::MEMORY_SOURCE)
        source_name: String,
        #[error(source)]
        error: ParseError,
    },
    /// A mandatory part of the save is missing
    #[display("{_0}")]
    GalaxyCreation(ModelError),
    #[display("the load was cancelled")]
    Cancelled,
}

impl LoadError {
    /// A short title for the error, fit for a dialog or a heading
    pub fn title(&self) -> &'static str {
        match self {
            LoadError::File(_) => "File Error",
            LoadError::Parse { .. } => "Parse Error",
            LoadError::GalaxyCreation(_) => "Galaxy Creation Error",
            LoadError::Cancelled => "Load Cancelled",
        }
    }
}

/// Gives up if the token was cancelled
fn check(token: &CancellationToken) -> Result<(), LoadError> {
    if token.is_cancelled() {
        debug!("load cancelled");
        Err(LoadError::Cancelled)
    } else {
        Ok(())
    }
}

/// Runs the three stages of a load: reading and parsing the save, building
/// the [Galaxy] and finishing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Loader {
    options: LoadOptions,
}

impl Loader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Loads a galaxy, synchronously.
    /// The observer is told about every stage as it starts, and the token
    /// is checked after every notification and while parsing.
    pub fn load<O: LoadObserver + ?Sized>(
        &self,
        source: impl Into<LoadSource>,
        observer: &mut O,
        token: &CancellationToken,
    ) -> Result<Galaxy, LoadError> {
        observer.stage(LoadStage::Loading);
        check(token)?;
        let save = match source.into() {
            LoadSource::Path(path) => SaveFile::open(path),
            LoadSource::Bytes(bytes) => SaveFile::from_bytes(bytes),
        }
        .map_err(LoadError::File)?;
        check(token)?;
        let text = save.text(self.options.encoding).map_err(LoadError::File)?;
        let root = parse_cancellable(&text, token).map_err(|error| match error {
            ParseError::Cancelled => LoadError::Cancelled,
            error => LoadError::Parse {
                source_name: save.source_name().to_owned(),
                error,
            },
        })?;
        info!(source = save.source_name(), sections = root.len(), "parsed the save");

        observer.stage(LoadStage::BuildingGalaxy);
        check(token)?;
        let builder = GalaxyBuilder::from_tree(&root).map_err(LoadError::GalaxyCreation)?;
        drop(root);

        observer.stage(LoadStage::Finishing);
        check(token)?;
        Ok(builder.finish())
    }
}

/// The single place a host reads the current [Galaxy] from.
/// Loads are serialized, and the galaxy is only replaced once a load
/// completes, so readers see either the old galaxy or the new one.
#[derive(Debug, Default)]
pub struct GalaxySlot {
    galaxy: RwLock<Option<Arc<Galaxy>>>,
    loading: Mutex<()>,
}

impl GalaxySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The galaxy of the last successful load
    pub fn get(&self) -> Option<Arc<Galaxy>> {
        self.galaxy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs a load and publishes its galaxy. A failed load leaves the slot
    /// as it was. Waits for any other load of this slot to finish first.
    pub fn load<O: LoadObserver + ?Sized>(
        &self,
        loader: &Loader,
        source: impl Into<LoadSource>,
        observer: &mut O,
        token: &CancellationToken,
    ) -> Result<Arc<Galaxy>, LoadError> {
        let _guard = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        let galaxy = Arc::new(loader.load(source, observer, token)?);
        *self
            .galaxy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(galaxy.clone());
        info!("published a new galaxy");
        Ok(galaxy)
    }

    /// Runs [GalaxySlot::load] on a worker thread. The stages are sent over
    /// the returned channel, which closes once the load is over.
    pub fn spawn_load(
        self: &Arc<Self>,
        loader: Loader,
        source: LoadSource,
        token: CancellationToken,
    ) -> (
        mpsc::Receiver<LoadStage>,
        JoinHandle<Result<Arc<Galaxy>, LoadError>>,
    ) {
        let (mut sender, receiver) = mpsc::channel();
        let slot = Arc::clone(self);
        let handle = thread::spawn(move || slot.load(&loader, source, &mut sender, &token));
        (receiver, handle)
    }
}
