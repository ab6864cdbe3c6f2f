/// Editable free-text notes: the header motto and the fullscreen footer
///
/// A blank save falls back to the configured default, and that final text
/// is what gets persisted. Records written as plain text (not JSON) are
/// still read.

use super::library::{StoreHandle, StoreKey};
use crate::config::ViewerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    /// Title above the realm navigation
    Motto,
    /// Line at the bottom of the fullscreen view
    FullscreenNote,
}

impl NoteKind {
    fn key(self) -> StoreKey {
        match self {
            NoteKind::Motto => StoreKey::MottoText,
            NoteKind::FullscreenNote => StoreKey::FullscreenNote,
        }
    }

    pub fn default_text(self, config: &ViewerConfig) -> &str {
        match self {
            NoteKind::Motto => &config.default_motto,
            NoteKind::FullscreenNote => &config.default_fullscreen_note,
        }
    }
}

#[derive(Debug, Default)]
pub struct Notes {
    motto: Option<String>,
    fullscreen_note: Option<String>,
    store: Option<StoreHandle>,
}

impl Notes {
    /// Load both notes; blank or unreadable records count as unset
    pub fn open(store: StoreHandle) -> Self {
        let read = |kind: NoteKind| {
            let raw = match store.get_raw(kind.key()) {
                Ok(raw) => raw?,
                Err(e) => {
                    log::error!("❌ Ignoring unreadable {}: {}", kind.key().as_str(), e);
                    return None;
                }
            };
            let text = serde_json::from_str::<String>(&raw).unwrap_or(raw);
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        };

        Self {
            motto: read(NoteKind::Motto),
            fullscreen_note: read(NoteKind::FullscreenNote),
            store: Some(store),
        }
    }

    /// Notes that are never persisted
    pub fn ephemeral() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: NoteKind) -> &mut Option<String> {
        match kind {
            NoteKind::Motto => &mut self.motto,
            NoteKind::FullscreenNote => &mut self.fullscreen_note,
        }
    }

    /// Text to show: the saved note or the default
    pub fn text(&self, kind: NoteKind, config: &ViewerConfig) -> String {
        let saved = match kind {
            NoteKind::Motto => &self.motto,
            NoteKind::FullscreenNote => &self.fullscreen_note,
        };
        saved.clone().unwrap_or_else(|| kind.default_text(config).to_string())
    }

    /// Save a note and return what will be shown
    pub fn save(&mut self, kind: NoteKind, text: &str, config: &ViewerConfig) -> String {
        let trimmed = text.trim();
        let final_text = if trimmed.is_empty() {
            kind.default_text(config).to_string()
        } else {
            trimmed.to_string()
        };

        *self.slot(kind) = Some(final_text.clone());
        if let Some(store) = &self.store {
            store.save(kind.key(), &final_text);
        }
        final_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::library::Library;

    fn handle() -> StoreHandle {
        StoreHandle::new(Library::open_in_memory().unwrap())
    }

    #[test]
    fn test_unset_notes_show_defaults() {
        let config = ViewerConfig::default();
        let notes = Notes::ephemeral();
        assert_eq!(notes.text(NoteKind::Motto, &config), config.default_motto);
        assert_eq!(notes.text(NoteKind::FullscreenNote, &config), config.default_fullscreen_note);
    }

    #[test]
    fn test_save_trims_and_blank_restores_default() {
        let config = ViewerConfig::default();
        let mut notes = Notes::ephemeral();
        assert_eq!(notes.save(NoteKind::Motto, "  still here  ", &config), "still here");
        assert_eq!(notes.text(NoteKind::Motto, &config), "still here");

        assert_eq!(notes.save(NoteKind::Motto, "   ", &config), config.default_motto);
        assert_eq!(notes.text(NoteKind::FullscreenNote, &config), config.default_fullscreen_note);
    }

    #[test]
    fn test_notes_survive_reopen() {
        let config = ViewerConfig::default();
        let store = handle();
        let mut notes = Notes::open(store.clone());
        notes.save(NoteKind::FullscreenNote, "a life was here", &config);

        let reopened = Notes::open(store);
        assert_eq!(reopened.text(NoteKind::FullscreenNote, &config), "a life was here");
        assert_eq!(reopened.text(NoteKind::Motto, &config), config.default_motto);
    }

    #[test]
    fn test_plain_text_and_blank_records() {
        let config = ViewerConfig::default();
        let library = Library::open_in_memory().unwrap();
        library.put_raw(StoreKey::MottoText, " written by hand ").unwrap();
        library.put_raw(StoreKey::FullscreenNote, "\"  \"").unwrap();

        let notes = Notes::open(StoreHandle::new(library));
        assert_eq!(notes.text(NoteKind::Motto, &config), "written by hand");
        assert_eq!(notes.text(NoteKind::FullscreenNote, &config), config.default_fullscreen_note);
    }
}
