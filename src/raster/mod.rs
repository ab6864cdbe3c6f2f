/// Raster helpers
///
/// This module handles:
/// - Decoding stored images off the UI thread
/// - Loading photos from disk, one file or a whole folder
/// - Black-and-white conversion on import
/// - Rendering JPEG snapshots for shot links

pub mod decode;
pub mod grayscale;
pub mod import;
pub mod snapshot;
