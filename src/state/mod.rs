/// State management module
///
/// This module owns everything the viewer remembers:
/// - Key/value store on SQLite (library.rs)
/// - Shared data structures (data.rs)
/// - Per-realm image collections (media.rs)
/// - Record schema and lenient loading (persisted.rs)
/// - Dedication form edits and annotation patches (edit.rs)
/// - Fullscreen engagement counters (engagement.rs)
/// - Motto and fullscreen note texts (notes.rs)

pub mod data;
pub mod edit;
pub mod engagement;
pub mod library;
pub mod media;
pub mod notes;
pub mod persisted;
