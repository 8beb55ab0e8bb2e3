/// Core save file reader. Wrapper over the lower level [save_file::parser]
/// module and [save_file::structures].
///
/// ## Getting Started
///
/// The facade for the entire module is the [loader::Loader], which reads a
/// [save_file::SaveFile], parses it and builds the [save_file::Galaxy] in
/// three stages, reporting each of them to a [loader::LoadObserver].
/// Once the galaxy is built, the [views] turn it into rows.
///
/// ## Example
///
/// ```rust,no_run
/// use stellaris_stat_viewer::{
///     loader::{LoadStage, Loader},
///     save_file::{parser::types::CancellationToken, LoadOptions},
///     views::economy_rows,
/// };
///
/// let loader = Loader::new(LoadOptions::default());
/// let mut observer = |stage: LoadStage| println!("{}", stage);
/// let token = CancellationToken::new();
/// if let Ok(galaxy) = loader.load("/path/to/save.sav", &mut observer, &token) {
///     for row in economy_rows(&galaxy) {
///         println!("{}: {}", row.name, row.energy);
///     }
/// }
/// ```
pub mod save_file;

/// The three stage load pipeline, with progress, cancellation and a slot the
/// finished galaxy is published to.
pub mod loader;

/// Tabular views over a finished [save_file::Galaxy].
pub mod views;
