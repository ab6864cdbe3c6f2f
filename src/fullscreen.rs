/// Fullscreen viewing session
///
/// Opening fullscreen snapshots the main view's `(realm, index)`. From then
/// on the session has its own position: the carousel and manual selection
/// move it without touching the store's current index.
///
/// Dedication edits made here land in per-image drafts. Drafts outlive a
/// close/reopen but are never written back to the store.

use std::collections::HashMap;

use crate::color::HexColor;
use crate::config::ViewerConfig;
use crate::state::data::{clamp_dedication, ImageRef, Realm, MAX_IMAGES_PER_REALM};
use crate::state::edit::DedicationEdit;
use crate::state::media::MediaStore;

/// Closed, or open on one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open {
        realm: Realm,
        index: usize,
        /// Carousel paused by the user
        locked: bool,
    },
}

/// Fullscreen-only overrides for one image.
///
/// A `None` field falls through to the saved annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullscreenDraft {
    pub thought: Option<String>,
    pub birth_death: Option<String>,
    /// `Some(None)` means the user picked automatic
    pub text_color: Option<Option<HexColor>>,
}

/// Everything needed to draw the fullscreen view
#[derive(Debug, Clone, PartialEq)]
pub struct FullscreenFrame {
    pub realm: Realm,
    pub index: usize,
    pub image: ImageRef,
    pub dedication: String,
    pub lifespan: String,
    /// Explicit text color; `None` means sample the image
    pub text_color: Option<HexColor>,
    pub locked: bool,
}

/// Next carousel position after `from`.
///
/// Only the first seven slots take part; empty slots are skipped. With one
/// usable slot or fewer the position does not change.
pub fn next_available_index(images: &[ImageRef], from: usize) -> usize {
    let n = images.len().min(MAX_IMAGES_PER_REALM);
    if n <= 1 {
        return from;
    }
    (1..=n)
        .map(|step| (from + step) % n)
        .find(|&index| !images[index].is_empty())
        .unwrap_or(from)
}

/// Number of slots the carousel can show
pub fn available_count(images: &[ImageRef]) -> usize {
    images
        .iter()
        .take(MAX_IMAGES_PER_REALM)
        .filter(|image| !image.is_empty())
        .count()
}

/// Text that is shown when nothing was saved
pub(crate) fn saved_or_default(saved: String, default: &str) -> String {
    if saved.is_empty() {
        default.to_string()
    } else {
        saved
    }
}

#[derive(Debug, Clone)]
pub struct FullscreenSession {
    state: SessionState,
    drafts: HashMap<(Realm, usize), FullscreenDraft>,
    read_only: bool,
}

impl Default for FullscreenSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FullscreenSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Closed,
            drafts: HashMap::new(),
            read_only: false,
        }
    }

    /// A session for a shared link: no carousel, no editing
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::new()
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    /// The session's own `(realm, index)` while open
    pub fn position(&self) -> Option<(Realm, usize)> {
        match self.state {
            SessionState::Open { realm, index, .. } => Some((realm, index)),
            SessionState::Closed => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, SessionState::Open { locked: true, .. })
    }

    /// Open on `(realm, index)`; the lock starts released
    pub fn open(&mut self, realm: Realm, index: usize) {
        log::info!("🔍 Fullscreen opened on {}[{}]", realm, index);
        self.state = SessionState::Open {
            realm,
            index,
            locked: false,
        };
    }

    /// Close; drafts are kept
    pub fn close(&mut self) {
        if self.is_open() {
            log::debug!("Fullscreen closed ({} drafts kept)", self.drafts.len());
        }
        self.state = SessionState::Closed;
    }

    /// Flip the carousel lock. Returns the new lock state.
    pub fn toggle_lock(&mut self) -> Option<bool> {
        match &mut self.state {
            SessionState::Open { locked, .. } => {
                *locked = !*locked;
                log::debug!("Carousel {}", if *locked { "locked" } else { "unlocked" });
                Some(*locked)
            }
            SessionState::Closed => None,
        }
    }

    /// Whether the carousel timer should be running
    pub fn carousel_running(&self, store: &MediaStore) -> bool {
        match self.state {
            SessionState::Open { realm, locked, .. } => {
                !locked && !self.read_only && available_count(store.images(realm)) > 1
            }
            SessionState::Closed => false,
        }
    }

    /// Advance the carousel by one slot. Returns the new index if it moved.
    pub fn tick(&mut self, store: &MediaStore) -> Option<usize> {
        if !self.carousel_running(store) {
            return None;
        }
        let SessionState::Open { realm, index, .. } = &mut self.state else {
            return None;
        };
        let next = next_available_index(store.images(*realm), *index);
        if next == *index {
            return None;
        }
        log::debug!("🎠 Carousel {}[{}] -> [{}]", realm, index, next);
        *index = next;
        Some(next)
    }

    /// Jump to an image of the session's realm
    pub fn select(&mut self, store: &MediaStore, new_index: usize) -> bool {
        match &mut self.state {
            SessionState::Open { realm, index, .. } if store.image(*realm, new_index).is_some() => {
                *index = new_index;
                true
            }
            _ => false,
        }
    }

    pub fn draft(&self, realm: Realm, index: usize) -> Option<&FullscreenDraft> {
        self.drafts.get(&(realm, index))
    }

    /// Save the dedication form into the draft of the image on screen.
    ///
    /// Texts are trimmed and the dedication clamped like a saved caption;
    /// the color is only replaced if the picker was touched.
    pub fn save_draft(&mut self, edit: &DedicationEdit) -> bool {
        if self.read_only {
            return false;
        }
        let Some(key) = self.position() else {
            return false;
        };
        let draft = self.drafts.entry(key).or_default();
        draft.thought = Some(clamp_dedication(edit.dedication.trim()));
        draft.birth_death = Some(edit.lifespan.trim().to_string());
        if let Some(color) = edit.color {
            draft.text_color = Some(color);
        }
        true
    }

    /// Form contents when the editor opens on the image on screen
    pub fn prefill(&self, store: &MediaStore, config: &ViewerConfig) -> Option<DedicationEdit> {
        let (realm, index) = self.position()?;
        let saved = store.annotation(realm, index);
        let draft = self.draft(realm, index);

        let thought = draft.and_then(|d| d.thought.clone()).unwrap_or(saved.caption);
        let birth_death = draft.and_then(|d| d.birth_death.clone()).unwrap_or(saved.lifespan);
        Some(DedicationEdit::prefilled(
            saved_or_default(thought, &config.default_dedication),
            saved_or_default(birth_death, &config.default_lifespan),
        ))
    }

    /// Resolve what to draw: draft first, then the saved annotation, then
    /// the configured defaults.
    pub fn frame(&self, store: &MediaStore, config: &ViewerConfig) -> Option<FullscreenFrame> {
        let SessionState::Open { realm, index, locked } = self.state else {
            return None;
        };
        let image = store.image(realm, index)?.clone();
        let saved = store.annotation(realm, index);
        let draft = self.draft(realm, index);

        let dedication = match draft.and_then(|d| d.thought.clone()) {
            Some(thought) => thought,
            None => saved_or_default(saved.caption, &config.default_dedication),
        };
        let lifespan = match draft.and_then(|d| d.birth_death.clone()) {
            Some(birth_death) => birth_death,
            None => saved_or_default(saved.lifespan, &config.default_lifespan),
        };
        let text_color = draft
            .and_then(|d| d.text_color)
            .flatten()
            .or(saved.text_color);

        Some(FullscreenFrame {
            realm,
            index,
            image,
            dedication,
            lifespan,
            text_color,
            locked,
        })
    }
}
