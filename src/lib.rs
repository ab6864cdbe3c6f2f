/// Tribute viewer core
///
/// - Per-realm photo collections with dedications, persisted in SQLite (state)
/// - Cover-fit pan/zoom math (viewport) driven by touch and mouse (gesture)
/// - Black/white overlay colors from image brightness (color)
/// - Fullscreen carousel with per-image drafts (fullscreen)
/// - Read-only share and snapshot links (share)

pub mod app_state;
pub mod color;
pub mod config;
pub mod error;
pub mod fullscreen;
pub mod gesture;
pub mod raster;
pub mod share;
pub mod state;
pub mod viewport;

pub use app_state::AppState;
pub use error::{Result, ViewerError};
