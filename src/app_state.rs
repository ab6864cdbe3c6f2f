/// Application state shared by every view
///
/// `AppState` is the single owner of the media store, the engagement
/// ledger, the gesture controller and the fullscreen session. The UI loop
/// calls into it one message at a time, so every operation runs to
/// completion before the next one starts.
///
/// Nothing here panics or returns an error for recoverable failures:
/// persistence errors are logged, sampling falls back to white and
/// user-facing problems end up in `notice`.

use image::RgbaImage;
use std::collections::HashMap;

use crate::color::{self, HexColor, SampleProfile, GLYPH_THRESHOLD, TEXT_THRESHOLD};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::fullscreen::{saved_or_default, FullscreenFrame, FullscreenSession};
use crate::gesture::{ContactEvent, GestureController, GestureOutcome, GestureTarget, Surface};
use crate::raster::decode::DecodedImage;
use crate::raster::grayscale::to_grayscale;
use crate::raster::snapshot::{render_snapshot_jpeg, LONG_LINK_WARNING};
use crate::share::{build_share_link, build_shot_link, ShareLink, SharePayload};
use crate::state::data::{ImageRef, Realm, MAX_IMAGES_PER_REALM};
use crate::state::edit::{AnnotationPatch, DedicationEdit};
use crate::state::engagement::{Engagement, EngagementLedger};
use crate::state::library::{Library, StoreHandle};
use crate::state::media::MediaStore;
use crate::state::notes::{NoteKind, Notes};
use crate::viewport::{Rect, Size, ViewportTransform};

/// Which copy of the dedication an edit goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    /// The saved annotation of the main view's current image
    Main,
    /// The fullscreen draft of the image on screen
    Fullscreen,
}

/// What is drawn over an image
#[derive(Debug, Clone, PartialEq)]
pub struct SlotOverlay {
    pub realm: Realm,
    pub index: usize,
    pub image: ImageRef,
    pub dedication: String,
    pub lifespan: String,
    /// Explicit color; `None` means sample the image
    pub text_color: Option<HexColor>,
}

impl From<FullscreenFrame> for SlotOverlay {
    fn from(frame: FullscreenFrame) -> Self {
        Self {
            realm: frame.realm,
            index: frame.index,
            image: frame.image,
            dedication: frame.dedication,
            lifespan: frame.lifespan,
            text_color: frame.text_color,
        }
    }
}

/// Where dedication text sits inside a surface
pub fn dedication_anchor(container: Size) -> Rect {
    Rect::new(
        container.width * 0.15,
        container.height * 0.78,
        container.width * 0.7,
        container.height * 0.14,
    )
}

/// Where the small note sits: top-left of the main slot, along the bottom
/// edge in fullscreen
pub fn note_anchor(surface: Surface, container: Size) -> Rect {
    match surface {
        Surface::MainSlot => Rect::new(
            container.width * 0.05,
            container.height * 0.04,
            container.width * 0.5,
            container.height * 0.06,
        ),
        Surface::Fullscreen => Rect::new(
            container.width * 0.08,
            container.height * 0.93,
            container.width * 0.84,
            container.height * 0.05,
        ),
    }
}

/// Where the overlay icons (lock, forward) sit inside a surface
pub fn glyph_anchor(container: Size) -> Rect {
    let side = (container.width.min(container.height) * 0.12).max(24.0);
    Rect::new(container.width - side * 1.5, side * 0.5, side, side)
}

fn references(store: &MediaStore, shot: Option<&ImageRef>, image: &ImageRef) -> bool {
    shot == Some(image) || Realm::ALL.iter().any(|&realm| store.images(realm).contains(image))
}

#[derive(Debug)]
pub struct AppState {
    pub config: ViewerConfig,
    store: MediaStore,
    ledger: EngagementLedger,
    notes: Notes,
    selected: Realm,
    gestures: GestureController,
    session: FullscreenSession,
    editor: Option<(EditTarget, DedicationEdit)>,
    decoded: HashMap<ImageRef, DecodedImage>,
    surfaces: HashMap<Surface, Size>,
    /// Snapshot shown by a shot link
    shot: Option<ImageRef>,
    /// Last user-facing message
    notice: Option<String>,
}

impl AppState {
    /// Build state around an existing store
    pub fn new(config: ViewerConfig, store: MediaStore, ledger: EngagementLedger) -> Self {
        Self {
            config,
            store,
            ledger,
            notes: Notes::ephemeral(),
            selected: Realm::Heaven,
            gestures: GestureController::new(),
            session: FullscreenSession::new(),
            editor: None,
            decoded: HashMap::new(),
            surfaces: HashMap::new(),
            shot: None,
            notice: None,
        }
    }

    /// Open the on-disk store; falls back to memory if it is unavailable
    pub fn open(config: ViewerConfig) -> Self {
        let library = match &config.database_path {
            Some(path) => Library::open(path),
            None => Library::new(),
        };

        match library {
            Ok(library) => {
                let handle = StoreHandle::new(library);
                let store = MediaStore::open(handle.clone());
                let ledger = EngagementLedger::open(handle.clone());
                let mut state = Self::new(config, store, ledger);
                state.notes = Notes::open(handle);
                state
            }
            Err(e) => {
                log::error!("❌ Storage unavailable, changes will not be kept: {}", e);
                let mut state = Self::new(config, MediaStore::ephemeral(), EngagementLedger::ephemeral());
                state.notice = Some("Storage unavailable: changes will not be kept".to_string());
                state
            }
        }
    }

    /// Read-only viewer for a share or shot link. Nothing is persisted.
    pub fn shared(config: ViewerConfig, link: ShareLink) -> Self {
        let mut state = Self::new(config, MediaStore::ephemeral(), EngagementLedger::ephemeral());
        state.session = FullscreenSession::read_only();

        match link {
            ShareLink::Payload(payload) => {
                let realm = Realm::Heaven;
                match state.store.add_image(realm, payload.img.clone()) {
                    Ok(index) => {
                        state.store.set_annotation(
                            realm,
                            index,
                            &AnnotationPatch {
                                caption: Some(payload.thought.clone()),
                                lifespan: Some(payload.birth_death.clone()),
                                text_color: Some(payload.color()),
                            },
                        );
                        state.session.open(realm, index);
                    }
                    Err(e) => log::error!("❌ Could not show shared image: {}", e),
                }
            }
            ShareLink::Shot(jpeg) => {
                state.shot = Some(ImageRef::from_bytes_with_mime(&jpeg, "image/jpeg"));
            }
        }
        log::info!("🔗 Opened shared view");
        state
    }

    // ========== Read access ==========

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    pub fn session(&self) -> &FullscreenSession {
        &self.session
    }

    pub fn selected_realm(&self) -> Realm {
        self.selected
    }

    pub fn is_read_only(&self) -> bool {
        self.session.is_read_only()
    }

    pub fn shot(&self) -> Option<&ImageRef> {
        self.shot.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn editor(&self) -> Option<&(EditTarget, DedicationEdit)> {
        self.editor.as_ref()
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gestures.is_active()
    }

    /// Engagement counters of the image on the fullscreen surface
    pub fn engagement(&self) -> Option<Engagement> {
        let (realm, index) = self.session.position()?;
        Some(self.ledger.counts(realm, index))
    }

    /// Space left in the selected realm
    pub fn remaining_capacity(&self) -> usize {
        MAX_IMAGES_PER_REALM.saturating_sub(self.store.len(self.selected))
    }

    // ========== Decoded pixels and surfaces ==========

    /// Keep decoded pixels for an image the store (or the shot) still
    /// references. Returns `false` if the image is gone.
    pub fn insert_decoded(&mut self, decoded: DecodedImage) -> bool {
        if !self.is_referenced(&decoded.source) {
            log::debug!("Dropping pixels of an image that was removed while decoding");
            return false;
        }
        self.decoded.insert(decoded.source.clone(), decoded);
        true
    }

    fn is_referenced(&self, image: &ImageRef) -> bool {
        references(&self.store, self.shot.as_ref(), image)
    }

    /// Evict decoded pixels no image slot refers to anymore
    fn prune_decoded(&mut self) {
        let before = self.decoded.len();
        let (store, shot) = (&self.store, self.shot.as_ref());
        self.decoded.retain(|image, _| references(store, shot, image));
        if self.decoded.len() < before {
            log::debug!("Evicted {} decoded images", before - self.decoded.len());
        }
    }

    pub fn decoded(&self, image: &ImageRef) -> Option<&DecodedImage> {
        self.decoded.get(image)
    }

    /// Images referenced by the store that still need decoding
    pub fn undecoded_images(&self) -> Vec<ImageRef> {
        let mut pending: Vec<ImageRef> = Realm::ALL
            .iter()
            .flat_map(|&realm| self.store.images(realm).iter())
            .chain(self.shot.iter())
            .filter(|image| !image.is_empty() && !self.decoded.contains_key(*image))
            .cloned()
            .collect();
        pending.dedup();
        pending
    }

    /// A surface reported its size
    pub fn surface_resized(&mut self, surface: Surface, size: Size) {
        if self.surfaces.get(&surface) == Some(&size) {
            return;
        }
        self.surfaces.insert(surface, size);
        if self.gestures.target().map(|t| t.surface) == Some(surface) {
            self.gestures.detach();
        }
    }

    /// The image a surface currently shows
    pub fn target_for(&self, surface: Surface) -> Option<GestureTarget> {
        let (realm, index) = match surface {
            Surface::MainSlot => (self.selected, self.store.current_index(self.selected)),
            Surface::Fullscreen => self.session.position()?,
        };
        self.store.image(realm, index)?;
        Some(GestureTarget { surface, realm, index })
    }

    /// Transform to draw a surface with: the live gesture transform if one
    /// is attached, otherwise the saved one re-clamped to the current size.
    pub fn live_view(&self, surface: Surface) -> Option<ViewportTransform> {
        let target = self.target_for(surface)?;
        if self.gestures.target() == Some(target) {
            if let Some(view) = self.gestures.view() {
                return Some(*view);
            }
        }

        let container = *self.surfaces.get(&surface)?;
        let image = self.store.image(target.realm, target.index)?;
        let natural = self.decoded.get(image)?.natural_size();
        ViewportTransform::restore(container, natural, self.store.view_transform(target.realm, target.index))
    }

    /// Texts and color override drawn over a surface
    pub fn overlay(&self, surface: Surface) -> Option<SlotOverlay> {
        match surface {
            Surface::Fullscreen => self.session.frame(&self.store, &self.config).map(SlotOverlay::from),
            Surface::MainSlot => {
                let target = self.target_for(surface)?;
                let image = self.store.image(target.realm, target.index)?.clone();
                let saved = self.store.annotation(target.realm, target.index);
                Some(SlotOverlay {
                    realm: target.realm,
                    index: target.index,
                    image,
                    dedication: saved_or_default(saved.caption, &self.config.default_dedication),
                    lifespan: saved_or_default(saved.lifespan, &self.config.default_lifespan),
                    text_color: saved.text_color,
                })
            }
        }
    }

    fn sample(&self, surface: Surface, anchor: impl Fn(Size) -> Rect, profile: SampleProfile) -> Result<f64> {
        let view = self.live_view(surface).ok_or(ViewerError::SamplingFailure)?;
        let overlay = self.overlay(surface).ok_or(ViewerError::SamplingFailure)?;
        let decoded = self.decoded.get(&overlay.image).ok_or(ViewerError::SamplingFailure)?;
        color::sample_region(&decoded.pixels, anchor(view.container), view.image_rect(), profile)
            .ok_or(ViewerError::SamplingFailure)
    }

    /// Color of the dedication text: the explicit choice, else black or
    /// white depending on what is underneath
    pub fn dedication_color(&self, surface: Surface) -> HexColor {
        if let Some(custom) = self.overlay(surface).and_then(|o| o.text_color) {
            return custom;
        }
        match self.sample(surface, dedication_anchor, SampleProfile::TEXT) {
            Ok(luminance) => color::contrast_color(luminance, TEXT_THRESHOLD),
            Err(e) => {
                log::debug!("{}; using white text", e);
                HexColor::WHITE
            }
        }
    }

    /// Color of the small note over a surface (black over bright pixels)
    pub fn note_color(&self, surface: Surface) -> HexColor {
        match self.sample(surface, |container| note_anchor(surface, container), SampleProfile::TEXT) {
            Ok(luminance) => color::contrast_color(luminance, GLYPH_THRESHOLD),
            Err(_) => HexColor::WHITE,
        }
    }

    /// Color of the overlay icons
    pub fn glyph_color(&self, surface: Surface) -> HexColor {
        let (Some(view), Some(overlay)) = (self.live_view(surface), self.overlay(surface)) else {
            return HexColor::WHITE;
        };
        match self.decoded.get(&overlay.image) {
            Some(decoded) => color::glyph_color(&decoded.pixels, glyph_anchor(view.container), view.image_rect()),
            None => HexColor::WHITE,
        }
    }

    // ========== Main view ==========

    pub fn select_realm(&mut self, realm: Realm) {
        if self.selected != realm {
            log::debug!("Realm {} selected", realm);
            self.selected = realm;
            self.detach_surface(Surface::MainSlot);
        }
    }

    /// Thumbnail click: moves the fullscreen session if it is open,
    /// otherwise the realm's current image
    pub fn select_thumbnail(&mut self, index: usize) -> bool {
        let changed = if self.session.is_open() {
            self.session.select(&self.store, index)
        } else {
            self.store.select(self.selected, index)
        };
        if changed {
            let surface = if self.session.is_open() { Surface::Fullscreen } else { Surface::MainSlot };
            self.detach_surface(surface);
        }
        changed
    }

    /// Add a photo to the selected realm
    pub fn add_image(&mut self, image: ImageRef) -> Result<usize> {
        if self.is_read_only() {
            return Err(ViewerError::ReadOnly);
        }
        let image = if self.config.grayscale_on_import {
            to_grayscale(&image)
        } else {
            image
        };

        match self.store.add_image(self.selected, image) {
            Ok(index) => {
                self.detach_surface(Surface::MainSlot);
                self.prune_decoded();
                Ok(index)
            }
            Err(e) => {
                self.notice = Some(format!("Cannot add photo: {}", e));
                Err(e)
            }
        }
    }

    /// Add several photos; stops at the first capacity error
    pub fn add_images(&mut self, images: Vec<ImageRef>) -> usize {
        let mut added = 0;
        for image in images {
            if self.add_image(image).is_err() {
                break;
            }
            added += 1;
        }
        added
    }

    /// Delete the selected realm's current image
    pub fn remove_current(&mut self) {
        if self.is_read_only() {
            return;
        }
        let index = self.store.current_index(self.selected);
        self.store.remove_image(self.selected, index);
        self.detach_surface(Surface::MainSlot);
        self.prune_decoded();
        if self.session.position().is_some_and(|(realm, _)| realm == self.selected) {
            self.close_fullscreen();
        }
    }

    // ========== Fullscreen ==========

    /// Open fullscreen on the main view's current image
    pub fn open_fullscreen(&mut self) -> bool {
        let Some(target) = self.target_for(Surface::MainSlot) else {
            return false;
        };
        self.session.open(target.realm, target.index);
        if !self.is_read_only() {
            self.ledger.record_seen(target.realm, target.index);
        }
        self.detach_surface(Surface::Fullscreen);
        true
    }

    pub fn close_fullscreen(&mut self) {
        if self.is_read_only() {
            return;
        }
        self.session.close();
        self.detach_surface(Surface::Fullscreen);
        if matches!(self.editor, Some((EditTarget::Fullscreen, _))) {
            self.editor = None;
        }
    }

    pub fn toggle_lock(&mut self) -> Option<bool> {
        if self.is_read_only() {
            return None;
        }
        self.session.toggle_lock()
    }

    pub fn carousel_running(&self) -> bool {
        self.session.carousel_running(&self.store)
    }

    /// Advance the carousel, unless a gesture is in progress
    pub fn carousel_tick(&mut self) -> Option<usize> {
        if self.gestures.is_active() {
            log::debug!("Carousel tick skipped during gesture");
            return None;
        }
        let moved = self.session.tick(&self.store);
        if moved.is_some() {
            self.detach_surface(Surface::Fullscreen);
        }
        moved
    }

    // ========== Gestures ==========

    /// Feed a pointer event from a surface.
    ///
    /// The transform is saved to the store when the gesture ends.
    pub fn gesture_event(&mut self, surface: Surface, event: ContactEvent) -> GestureOutcome {
        if self.is_read_only() {
            return GestureOutcome::Ignored;
        }

        if !self.gestures.is_active() {
            match (self.target_for(surface), self.live_view(surface)) {
                (Some(target), Some(view)) => {
                    self.gestures.attach(target, view);
                }
                _ => return GestureOutcome::Ignored,
            }
        } else if self.gestures.target().map(|t| t.surface) != Some(surface) {
            return GestureOutcome::Ignored;
        }

        let outcome = self.gestures.handle(event);
        if let GestureOutcome::Committed { target, transform } = outcome {
            log::debug!(
                "Saving transform {}[{}] scale {:.2}",
                target.realm,
                target.index,
                transform.scale
            );
            self.store.set_view_transform(target.realm, target.index, transform);
        }
        outcome
    }

    fn detach_surface(&mut self, surface: Surface) {
        if self.gestures.target().map(|t| t.surface) == Some(surface) {
            self.gestures.detach();
        }
    }

    // ========== Dedication editing ==========

    /// Open the dedication editor pre-filled for `target`
    pub fn begin_edit(&mut self, target: EditTarget) -> bool {
        if self.is_read_only() {
            return false;
        }
        let edit = match target {
            EditTarget::Fullscreen => self.session.prefill(&self.store, &self.config),
            EditTarget::Main => self.target_for(Surface::MainSlot).map(|t| {
                let saved = self.store.annotation(t.realm, t.index);
                DedicationEdit::prefilled(
                    saved_or_default(saved.caption, &self.config.default_dedication),
                    saved_or_default(saved.lifespan, &self.config.default_lifespan),
                )
            }),
        };
        match edit {
            Some(edit) => {
                self.editor = Some((target, edit));
                true
            }
            None => false,
        }
    }

    /// Mutable access to the open editor's fields
    pub fn editor_mut(&mut self) -> Option<&mut DedicationEdit> {
        self.editor.as_mut().map(|(_, edit)| edit)
    }

    pub fn cancel_edit(&mut self) {
        self.editor = None;
    }

    /// Save and close the open editor
    pub fn commit_edit(&mut self) -> bool {
        match self.editor.take() {
            Some((target, edit)) => self.save_dedication(target, &edit),
            None => false,
        }
    }

    /// Apply a dedication edit.
    ///
    /// Main: writes caption, life span and (if touched) color to the store;
    /// blank text clears all three. Fullscreen: writes only the draft.
    pub fn save_dedication(&mut self, target: EditTarget, edit: &DedicationEdit) -> bool {
        if self.is_read_only() {
            return false;
        }
        match target {
            EditTarget::Fullscreen => self.session.save_draft(edit),
            EditTarget::Main => {
                let Some(t) = self.target_for(Surface::MainSlot) else {
                    return false;
                };
                self.store.set_annotation(t.realm, t.index, &edit.to_main_patch());
                true
            }
        }
    }

    // ========== Notes ==========

    pub fn note_text(&self, kind: NoteKind) -> String {
        self.notes.text(kind, &self.config)
    }

    /// Note drawn over a surface: the fixed slot note on the main view, the
    /// editable footer in fullscreen
    pub fn surface_note(&self, surface: Surface) -> String {
        match surface {
            Surface::MainSlot => self.config.slot_note.clone(),
            Surface::Fullscreen => self.note_text(NoteKind::FullscreenNote),
        }
    }

    /// Save the motto or the fullscreen note; blank text restores the default
    pub fn save_note(&mut self, kind: NoteKind, text: &str) -> Option<String> {
        if self.is_read_only() {
            return None;
        }
        let saved = self.notes.save(kind, text, &self.config);
        log::debug!("Saved {:?}", kind);
        Some(saved)
    }

    // ========== Sharing ==========

    /// Forward the fullscreen image: bump its counter and build a shot link
    /// from what is on screen.
    pub fn forward_shot_link(&mut self) -> Result<String> {
        let target = self
            .target_for(Surface::Fullscreen)
            .ok_or(ViewerError::NothingOnScreen)?;
        if !self.is_read_only() {
            self.ledger.record_forward(target.realm, target.index);
        }

        let pixels = self.fullscreen_pixels()?;
        let view = match self.live_view(Surface::Fullscreen) {
            Some(view) => view,
            None => {
                let natural = Size::new(pixels.width() as f64, pixels.height() as f64);
                ViewportTransform::identity(natural, natural)
                    .ok_or_else(|| ViewerError::DecodeFailure("image has no pixels".to_string()))?
            }
        };

        let jpeg = render_snapshot_jpeg(&pixels, &view)?;
        let link = build_shot_link(&self.config.share_base_url, &jpeg)?;
        if link.len() > LONG_LINK_WARNING {
            self.notice = Some("The link is very long; some chat apps may not send it".to_string());
        }
        log::info!("🔗 Built shot link ({} chars)", link.len());
        Ok(link)
    }

    fn fullscreen_pixels(&self) -> Result<std::sync::Arc<RgbaImage>> {
        let frame = self
            .session
            .frame(&self.store, &self.config)
            .ok_or(ViewerError::NothingOnScreen)?;
        self.decoded
            .get(&frame.image)
            .map(|decoded| decoded.pixels.clone())
            .ok_or_else(|| ViewerError::DecodeFailure("image not decoded yet".to_string()))
    }

    /// Payload link (image plus texts) for the fullscreen image
    pub fn share_payload_link(&self) -> Result<String> {
        let frame = self
            .session
            .frame(&self.store, &self.config)
            .ok_or(ViewerError::NothingOnScreen)?;
        let payload = SharePayload {
            img: frame.image,
            thought: frame.dedication,
            birth_death: frame.lifespan,
            text_color: frame.text_color.map(|c| c.to_string()).unwrap_or_default(),
        };
        build_share_link(&self.config.share_base_url, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Point;
    use crate::raster::decode::decode_blocking;
    use crate::raster::decode::tests::png_ref;
    use crate::share::parse_share_link;
    use crate::state::data::MAX_DEDICATION_CHARS;
    use cgmath::Vector2;

    fn state() -> AppState {
        AppState::new(ViewerConfig::default(), MediaStore::ephemeral(), EngagementLedger::ephemeral())
    }

    /// State with `count` decoded white 600x600 photos in heaven
    fn state_with_photos(count: usize) -> AppState {
        let mut state = state();
        for i in 0..count {
            let image = png_ref(600, 600, [255, 255, 255, (255 - i) as u8]);
            state.add_image(image.clone()).unwrap();
            assert!(state.insert_decoded(decode_blocking(&image).unwrap()));
        }
        state.surface_resized(Surface::MainSlot, Size::new(300.0, 600.0));
        state.surface_resized(Surface::Fullscreen, Size::new(300.0, 600.0));
        state
    }

    fn p(x: f64, y: f64) -> Point {
        Vector2::new(x, y)
    }

    #[test]
    fn test_fullscreen_edit_does_not_touch_store() {
        let mut state = state_with_photos(1);
        assert!(state.open_fullscreen());

        let edit = DedicationEdit::prefilled("only here", "1900-2000");
        assert!(state.save_dedication(EditTarget::Fullscreen, &edit));

        assert_eq!(state.store().annotation(Realm::Heaven, 0).caption, "");
        assert_eq!(state.overlay(Surface::Fullscreen).unwrap().dedication, "only here");
        assert_eq!(
            state.overlay(Surface::MainSlot).unwrap().dedication,
            state.config.default_dedication
        );
    }

    #[test]
    fn test_main_edit_writes_store() {
        let mut state = state_with_photos(1);
        let mut edit = DedicationEdit::prefilled("miss you", "1931-2019");
        edit.pick_color(HexColor::parse("#222222"));
        assert!(state.save_dedication(EditTarget::Main, &edit));

        let saved = state.store().annotation(Realm::Heaven, 0);
        assert_eq!(saved.caption, "miss you");
        assert_eq!(saved.lifespan, "1931-2019");
        assert_eq!(saved.text_color, HexColor::parse("#222222"));
        assert_eq!(state.dedication_color(Surface::MainSlot), HexColor::parse("#222222").unwrap());

        // Blank text clears everything
        state.save_dedication(EditTarget::Main, &DedicationEdit::prefilled("", "ignored"));
        assert_eq!(state.store().annotation(Realm::Heaven, 0), Default::default());
    }

    #[test]
    fn test_editor_round_trip() {
        let mut state = state_with_photos(1);
        assert!(state.begin_edit(EditTarget::Main));
        assert_eq!(state.editor().unwrap().1.dedication, state.config.default_dedication);

        state.editor_mut().unwrap().dedication = "typed".to_string();
        assert!(state.commit_edit());
        assert!(state.editor().is_none());
        assert_eq!(state.store().annotation(Realm::Heaven, 0).caption, "typed");
    }

    #[test]
    fn test_open_fullscreen_counts_seen() {
        let mut state = state_with_photos(2);
        state.select_thumbnail(0);
        assert!(state.open_fullscreen());
        state.close_fullscreen();
        state.open_fullscreen();
        assert_eq!(state.engagement().unwrap(), Engagement { seen: 2, forward: 0 });
    }

    #[test]
    fn test_open_fullscreen_needs_an_image() {
        let mut state = state();
        assert!(!state.open_fullscreen());
        assert!(!state.session().is_open());
    }

    #[test]
    fn test_capacity_sets_notice() {
        let mut state = state();
        for i in 0..MAX_IMAGES_PER_REALM {
            state.add_image(png_ref(1, 1, [i as u8, 0, 0, 255])).unwrap();
        }
        assert_eq!(state.remaining_capacity(), 0);
        assert!(state.add_image(png_ref(1, 1, [9, 9, 9, 255])).is_err());
        assert!(state.notice().unwrap().contains("already holds 7 images"));
    }

    #[test]
    fn test_grayscale_on_import() {
        let mut state = state();
        state.config.grayscale_on_import = true;
        state.add_image(png_ref(2, 2, [0, 255, 0, 255])).unwrap();

        let stored = state.store().image(Realm::Heaven, 0).unwrap();
        let decoded = decode_blocking(stored).unwrap();
        let p = decoded.pixels.get_pixel(0, 0);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn test_carousel_waits_for_gesture() {
        let mut state = state_with_photos(3);
        state.select_thumbnail(0);
        state.open_fullscreen();
        assert!(state.carousel_running());

        state.gesture_event(Surface::Fullscreen, ContactEvent::Pressed { id: 1, point: p(10.0, 10.0) });
        assert!(state.is_gesture_active());
        assert_eq!(state.carousel_tick(), None);

        state.gesture_event(Surface::Fullscreen, ContactEvent::Lifted { id: 1 });
        assert_eq!(state.carousel_tick(), Some(1));
        // The main view's pointer did not move
        assert_eq!(state.store().current_index(Realm::Heaven), 0);
    }

    #[test]
    fn test_gesture_commit_saves_transform() {
        let mut state = state_with_photos(1);
        state.gesture_event(Surface::MainSlot, ContactEvent::Pressed { id: 1, point: p(100.0, 300.0) });
        state.gesture_event(Surface::MainSlot, ContactEvent::Pressed { id: 2, point: p(200.0, 300.0) });
        state.gesture_event(Surface::MainSlot, ContactEvent::Moved { id: 2, point: p(300.0, 300.0) });
        // Nothing saved mid-gesture
        assert!(state.store().view_transform(Realm::Heaven, 0).is_identity());

        state.gesture_event(Surface::MainSlot, ContactEvent::Lifted { id: 2 });
        let outcome = state.gesture_event(Surface::MainSlot, ContactEvent::Lifted { id: 1 });
        assert!(matches!(outcome, GestureOutcome::Committed { .. }));

        let saved = state.store().view_transform(Realm::Heaven, 0);
        assert!((saved.scale - 2.0).abs() < 1e-9);
        let view = state.live_view(Surface::MainSlot).unwrap();
        assert!(view.image_rect().contains_rect(&view.container_rect(), 1e-6));
    }

    #[test]
    fn test_gestures_ignored_without_decoded_image() {
        let mut state = state();
        state.add_image(png_ref(4, 4, [0, 0, 0, 255])).unwrap();
        state.surface_resized(Surface::MainSlot, Size::new(100.0, 100.0));
        let outcome = state.gesture_event(Surface::MainSlot, ContactEvent::Pressed { id: 1, point: p(1.0, 1.0) });
        assert_eq!(outcome, GestureOutcome::Ignored);
        assert_eq!(state.undecoded_images().len(), 1);
    }

    #[test]
    fn test_text_color_follows_brightness() {
        let state = state_with_photos(1);
        // White photo: black text
        assert_eq!(state.dedication_color(Surface::MainSlot), HexColor::BLACK);
        assert_eq!(state.glyph_color(Surface::MainSlot), HexColor::BLACK);
        // Nothing on the fullscreen surface: white fallback
        assert_eq!(state.dedication_color(Surface::Fullscreen), HexColor::WHITE);
    }

    #[test]
    fn test_remove_current_scenario() {
        let mut state = state_with_photos(2);
        state.select_thumbnail(1);
        state.save_dedication(EditTarget::Main, &DedicationEdit::prefilled("miss you", ""));
        state.select_thumbnail(0);
        state.remove_current();

        assert_eq!(state.store().len(Realm::Heaven), 1);
        assert_eq!(state.store().annotation(Realm::Heaven, 0).caption, "miss you");
        assert_eq!(state.store().current_index(Realm::Heaven), 0);
    }

    #[test]
    fn test_forward_builds_shot_link() {
        let mut state = state_with_photos(1);
        state.open_fullscreen();
        let link = state.forward_shot_link().unwrap();
        assert!(link.starts_with(&state.config.share_base_url));
        assert_eq!(state.engagement().unwrap().forward, 1);

        match parse_share_link(&link).unwrap() {
            Some(ShareLink::Shot(jpeg)) => {
                let decoded = image::load_from_memory(&jpeg).unwrap();
                assert_eq!((decoded.width(), decoded.height()), (300, 600));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shared_payload_is_read_only() {
        let payload = SharePayload {
            img: png_ref(8, 8, [0, 0, 0, 255]),
            thought: "for you".to_string(),
            birth_death: "1940-2010".to_string(),
            text_color: "#abcdef".to_string(),
        };
        let mut state = AppState::shared(ViewerConfig::default(), ShareLink::Payload(payload));
        assert!(state.is_read_only());
        assert!(state.session().is_open());
        assert!(!state.carousel_running());

        let overlay = state.overlay(Surface::Fullscreen).unwrap();
        assert_eq!(overlay.dedication, "for you");
        assert_eq!(overlay.text_color, HexColor::parse("#abcdef"));

        assert!(!state.save_dedication(EditTarget::Fullscreen, &DedicationEdit::prefilled("x", "y")));
        assert!(state.add_image(png_ref(1, 1, [0, 0, 0, 255])).is_err());
        state.close_fullscreen();
        assert!(state.session().is_open());
        assert!(!state.store().is_persistent());
    }

    #[test]
    fn test_shared_shot_shows_snapshot() {
        let state = AppState::shared(ViewerConfig::default(), ShareLink::Shot(vec![0xff, 0xd8, 0xff]));
        assert!(state.shot().unwrap().as_str().starts_with("data:image/jpeg;base64,"));
        assert!(!state.session().is_open());
        assert_eq!(state.undecoded_images().len(), 1);
    }

    #[test]
    fn test_payload_link_round_trips_frame() {
        let mut state = state_with_photos(1);
        state.open_fullscreen();
        state.save_dedication(EditTarget::Fullscreen, &DedicationEdit::prefilled("draft words", ""));
        let link = state.share_payload_link().unwrap();
        match parse_share_link(&link).unwrap() {
            Some(ShareLink::Payload(payload)) => assert_eq!(payload.thought, "draft words"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_long_fullscreen_draft_is_clamped() {
        let mut state = state_with_photos(1);
        state.open_fullscreen();
        let long = "x".repeat(35);
        assert!(state.save_dedication(EditTarget::Fullscreen, &DedicationEdit::prefilled(long, "")));

        let overlay = state.overlay(Surface::Fullscreen).unwrap();
        assert_eq!(overlay.dedication.chars().count(), MAX_DEDICATION_CHARS);
        match parse_share_link(&state.share_payload_link().unwrap()).unwrap() {
            Some(ShareLink::Payload(payload)) => {
                assert_eq!(payload.thought.chars().count(), MAX_DEDICATION_CHARS)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_removed_images_release_pixels() {
        let mut state = state_with_photos(3);
        for _ in 0..3 {
            state.remove_current();
        }
        assert_eq!(state.store().len(Realm::Heaven), 0);
        assert!(state.decoded.is_empty());

        // A decode that finishes after its image was removed is not kept
        let gone = png_ref(4, 4, [1, 2, 3, 255]);
        assert!(!state.insert_decoded(decode_blocking(&gone).unwrap()));
        assert!(state.decoded(&gone).is_none());
    }

    #[test]
    fn test_remove_evicts_only_removed_pixels() {
        let mut state = state_with_photos(1);
        let color = png_ref(600, 600, [0, 255, 0, 255]);
        state.add_image(color.clone()).unwrap();
        state.insert_decoded(decode_blocking(&color).unwrap());
        assert!(state.decoded(&color).is_some());

        // The color photo is current; removing it leaves the white one cached
        state.remove_current();
        assert!(state.decoded(&color).is_none());
        assert_eq!(state.decoded.len(), 1);
    }

    #[test]
    fn test_note_color_and_text() {
        let mut state = state_with_photos(1);
        assert_eq!(state.surface_note(Surface::MainSlot), state.config.slot_note);
        // White photo: black note
        assert_eq!(state.note_color(Surface::MainSlot), HexColor::BLACK);

        state.open_fullscreen();
        assert_eq!(state.surface_note(Surface::Fullscreen), state.config.default_fullscreen_note);
        assert_eq!(state.note_color(Surface::Fullscreen), HexColor::BLACK);

        assert_eq!(state.save_note(NoteKind::FullscreenNote, "  a life was here ").as_deref(), Some("a life was here"));
        assert_eq!(state.surface_note(Surface::Fullscreen), "a life was here");
        assert_eq!(state.save_note(NoteKind::Motto, "").unwrap(), state.config.default_motto);
    }

    #[test]
    fn test_note_color_without_image_is_white() {
        let state = state();
        assert_eq!(state.note_color(Surface::MainSlot), HexColor::WHITE);
    }

    #[test]
    fn test_shared_view_cannot_edit_notes() {
        let mut state = AppState::shared(ViewerConfig::default(), ShareLink::Shot(vec![0xff, 0xd8, 0xff]));
        assert_eq!(state.save_note(NoteKind::Motto, "changed"), None);
        assert_eq!(state.note_text(NoteKind::Motto), state.config.default_motto);
    }

    #[test]
    fn test_size_recorded_with_first_contact_enables_pinch() {
        let mut state = state();
        let image = png_ref(600, 600, [255, 255, 255, 255]);
        state.add_image(image.clone()).unwrap();
        state.insert_decoded(decode_blocking(&image).unwrap());
        assert!(state.open_fullscreen());

        // Fullscreen has never reported a size: the surface cannot attach yet
        assert!(state.live_view(Surface::Fullscreen).is_none());

        // The size arrives together with the first finger
        state.surface_resized(Surface::Fullscreen, Size::new(300.0, 600.0));
        let first = state.gesture_event(Surface::Fullscreen, ContactEvent::Pressed { id: 1, point: p(100.0, 300.0) });
        assert_ne!(first, GestureOutcome::Ignored);
        state.gesture_event(Surface::Fullscreen, ContactEvent::Pressed { id: 2, point: p(200.0, 300.0) });
        let moved = state.gesture_event(Surface::Fullscreen, ContactEvent::Moved { id: 2, point: p(300.0, 300.0) });
        match moved {
            GestureOutcome::Updated(view) => assert!(view.scale > 1.0),
            other => panic!("unexpected {:?}", other),
        }
    }
}
