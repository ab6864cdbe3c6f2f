use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::decode::load_file;
use crate::state::data::ImageRef;

/// Photo extensions picked up by a folder import
pub const PHOTO_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff"];

/// Result of a folder import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Decodable photos, in file-name order
    pub images: Vec<ImageRef>,
    /// Files that looked like photos but could not be read or decoded
    pub skipped_count: usize,
}

fn is_photo(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.as_str()))
}

/// Load up to `limit` photos from a folder (recursively)
///
/// Files that fail to decode are skipped and the batch continues.
/// Runs off the UI thread; decoding happens on the blocking pool.
pub async fn import_folder_async(folder_path: PathBuf, limit: usize) -> ImportResult {
    let mut result = ImportResult::default();

    log::info!("🔍 Scanning folder: {}", folder_path.display());

    let mut paths: Vec<PathBuf> = WalkDir::new(&folder_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && is_photo(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    for path in paths {
        if result.images.len() >= limit {
            break;
        }
        match load_file(path.clone()).await {
            Ok(image) => result.images.push(image),
            Err(e) => {
                result.skipped_count += 1;
                log::warn!("⚠️  Skipping {}: {}", path.display(), e);
            }
        }
    }

    log::info!(
        "✅ Import complete: {} loaded, {} skipped",
        result.images.len(),
        result.skipped_count
    );
    result
}
