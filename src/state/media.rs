/// Per-realm image collections and their annotations
///
/// `MediaStore` is the single source of truth for what the viewer shows.
/// Each realm holds five parallel sequences sharing one index space:
/// images, captions, life spans, text colors and view transforms.
///
/// Every mutation takes `&mut self`, touches all affected sequences plus
/// `current_index` before returning, and then persists synchronously.

use super::data::{
    clamp_dedication, Annotation, ImageRef, PerRealm, Realm, SavedTransform, MAX_IMAGES_PER_REALM,
};
use super::edit::AnnotationPatch;
use super::library::{StoreHandle, StoreKey};
use super::persisted;
use crate::color::HexColor;
use crate::error::{Result, ViewerError};

/// The parallel sequences of one realm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealmMedia {
    pub images: Vec<ImageRef>,
    pub captions: Vec<String>,
    pub lifespans: Vec<String>,
    pub text_colors: Vec<Option<HexColor>>,
    pub transforms: Vec<Option<SavedTransform>>,
    /// Active image; always `< max(1, images.len())`
    pub current_index: usize,
}

impl RealmMedia {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Check that every sequence has one entry per image
    pub fn is_aligned(&self) -> bool {
        let n = self.images.len();
        self.captions.len() == n
            && self.lifespans.len() == n
            && self.text_colors.len() == n
            && self.transforms.len() == n
    }

    /// Pad or truncate every sequence to the image count and clamp the index
    pub(crate) fn realign(&mut self) {
        let n = self.images.len();
        self.captions.resize(n, String::new());
        self.lifespans.resize(n, String::new());
        self.text_colors.resize(n, None);
        self.transforms.resize(n, None);
        self.clamp_index();
    }

    fn clamp_index(&mut self) {
        if self.images.is_empty() {
            self.current_index = 0;
        } else {
            self.current_index = self.current_index.min(self.images.len() - 1);
        }
    }
}

/// Owns every realm's collections and writes them through to the store
#[derive(Debug)]
pub struct MediaStore {
    media: PerRealm<RealmMedia>,
    store: Option<StoreHandle>,
}

impl MediaStore {
    /// Load from the key/value store and keep writing to it
    pub fn open(store: StoreHandle) -> Self {
        let media = persisted::load_media(&store);
        Self {
            media,
            store: Some(store),
        }
    }

    /// A store that never persists (share viewer, tests)
    pub fn ephemeral() -> Self {
        Self {
            media: PerRealm::default(),
            store: None,
        }
    }

    /// Whether writes reach a backing store
    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    fn persist(&self, keys: &[StoreKey]) {
        if let Some(store) = &self.store {
            for &key in keys {
                persisted::save_media(store, &self.media, key);
            }
        }
    }

    /// All sequences of a realm
    pub fn realm(&self, realm: Realm) -> &RealmMedia {
        &self.media[realm]
    }

    pub fn images(&self, realm: Realm) -> &[ImageRef] {
        &self.media[realm].images
    }

    pub fn image(&self, realm: Realm, index: usize) -> Option<&ImageRef> {
        self.media[realm].images.get(index).filter(|image| !image.is_empty())
    }

    pub fn len(&self, realm: Realm) -> usize {
        self.media[realm].len()
    }

    pub fn current_index(&self, realm: Realm) -> usize {
        self.media[realm].current_index
    }

    /// Append an image; the new image becomes the realm's current one.
    pub fn add_image(&mut self, realm: Realm, image: ImageRef) -> Result<usize> {
        let media = &mut self.media[realm];
        if media.images.len() >= MAX_IMAGES_PER_REALM {
            log::warn!("⚠️  Realm {} is full ({} images)", realm, MAX_IMAGES_PER_REALM);
            return Err(ViewerError::CapacityExceeded {
                realm,
                capacity: MAX_IMAGES_PER_REALM,
            });
        }

        media.images.push(image);
        media.captions.push(String::new());
        media.lifespans.push(String::new());
        media.text_colors.push(None);
        media.transforms.push(None);
        let index = media.images.len() - 1;
        media.current_index = index;

        log::info!("🖼️  Added image {} to realm {}", index + 1, realm);
        self.persist(&[
            StoreKey::Images,
            StoreKey::Captions,
            StoreKey::Lifespans,
            StoreKey::TextColors,
            StoreKey::Transforms,
            StoreKey::CurrentIndex,
        ]);
        Ok(index)
    }

    /// Remove an image and everything attached to it. Out of range is a no-op.
    pub fn remove_image(&mut self, realm: Realm, index: usize) {
        let media = &mut self.media[realm];
        if index >= media.images.len() {
            return;
        }

        media.images.remove(index);
        media.captions.remove(index);
        media.lifespans.remove(index);
        media.text_colors.remove(index);
        media.transforms.remove(index);
        media.current_index = if media.images.is_empty() {
            0
        } else {
            index.min(media.images.len() - 1)
        };

        log::info!("🗑️  Removed image {} from realm {}", index + 1, realm);
        self.persist(&[
            StoreKey::Images,
            StoreKey::Captions,
            StoreKey::Lifespans,
            StoreKey::TextColors,
            StoreKey::Transforms,
            StoreKey::CurrentIndex,
        ]);
    }

    /// Make `index` the realm's current image if it holds one
    pub fn select(&mut self, realm: Realm, index: usize) -> bool {
        if self.image(realm, index).is_none() {
            return false;
        }
        self.media[realm].current_index = index;
        self.persist(&[StoreKey::CurrentIndex]);
        true
    }

    /// Annotations of one image (empty defaults when out of range)
    pub fn annotation(&self, realm: Realm, index: usize) -> Annotation {
        let media = &self.media[realm];
        Annotation {
            caption: media.captions.get(index).cloned().unwrap_or_default(),
            lifespan: media.lifespans.get(index).cloned().unwrap_or_default(),
            text_color: media.text_colors.get(index).copied().flatten(),
        }
    }

    /// Partial update of an image's annotations; absent fields are unchanged
    pub fn set_annotation(&mut self, realm: Realm, index: usize, patch: &AnnotationPatch) {
        let media = &mut self.media[realm];
        if index >= media.images.len() || patch.is_empty() {
            return;
        }

        let mut touched = Vec::with_capacity(3);
        if let Some(caption) = &patch.caption {
            media.captions[index] = clamp_dedication(caption);
            touched.push(StoreKey::Captions);
        }
        if let Some(lifespan) = &patch.lifespan {
            media.lifespans[index] = lifespan.clone();
            touched.push(StoreKey::Lifespans);
        }
        if let Some(color) = patch.text_color {
            media.text_colors[index] = color;
            touched.push(StoreKey::TextColors);
        }
        self.persist(&touched);
    }

    /// Saved view transform, identity when none was saved
    pub fn view_transform(&self, realm: Realm, index: usize) -> SavedTransform {
        self.media[realm]
            .transforms
            .get(index)
            .copied()
            .flatten()
            .unwrap_or(SavedTransform::IDENTITY)
    }

    /// Save a view transform; invalid scales or translates are dropped
    pub fn set_view_transform(&mut self, realm: Realm, index: usize, transform: SavedTransform) {
        if !transform.is_valid() {
            log::debug!("Dropping invalid transform {:?} for {}[{}]", transform, realm, index);
            return;
        }
        let media = &mut self.media[realm];
        if index >= media.images.len() {
            return;
        }
        media.transforms[index] = Some(transform);
        self.persist(&[StoreKey::Transforms]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::library::Library;

    fn image(tag: &str) -> ImageRef {
        ImageRef::new(format!("data:image/png;base64,{}", tag))
    }

    fn caption(text: &str) -> AnnotationPatch {
        AnnotationPatch {
            caption: Some(text.to_string()),
            ..AnnotationPatch::default()
        }
    }

    #[test]
    fn test_add_appends_defaults_and_selects() {
        let mut store = MediaStore::ephemeral();
        assert_eq!(store.add_image(Realm::Heaven, image("A")).unwrap(), 0);
        assert_eq!(store.add_image(Realm::Heaven, image("B")).unwrap(), 1);

        let heaven = store.realm(Realm::Heaven);
        assert!(heaven.is_aligned());
        assert_eq!(heaven.current_index, 1);
        assert_eq!(store.annotation(Realm::Heaven, 1), Annotation::default());
        assert!(store.view_transform(Realm::Heaven, 1).is_identity());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut store = MediaStore::ephemeral();
        for i in 0..MAX_IMAGES_PER_REALM {
            store.add_image(Realm::Ancestors, image(&i.to_string())).unwrap();
        }
        let err = store.add_image(Realm::Ancestors, image("8th")).unwrap_err();
        assert!(matches!(err, ViewerError::CapacityExceeded { capacity: 7, .. }));
        assert_eq!(store.len(Realm::Ancestors), 7);
        assert_eq!(store.current_index(Realm::Ancestors), 6);
    }

    #[test]
    fn test_delete_scenario() {
        let mut store = MediaStore::ephemeral();
        store.add_image(Realm::Eternal, image("A")).unwrap();
        store.add_image(Realm::Eternal, image("B")).unwrap();
        store.set_annotation(Realm::Eternal, 1, &caption("miss you"));

        store.remove_image(Realm::Eternal, 0);

        let eternal = store.realm(Realm::Eternal);
        assert_eq!(eternal.images, vec![image("B")]);
        assert_eq!(eternal.captions, vec!["miss you".to_string()]);
        assert_eq!(eternal.current_index, 0);
        assert!(eternal.is_aligned());
    }

    #[test]
    fn test_remove_last_clamps_index() {
        let mut store = MediaStore::ephemeral();
        for tag in ["A", "B", "C"] {
            store.add_image(Realm::Paradise, image(tag)).unwrap();
        }
        store.remove_image(Realm::Paradise, 2);
        assert_eq!(store.current_index(Realm::Paradise), 1);
        store.remove_image(Realm::Paradise, 7);
        assert_eq!(store.len(Realm::Paradise), 2);
        store.remove_image(Realm::Paradise, 0);
        store.remove_image(Realm::Paradise, 0);
        assert_eq!(store.current_index(Realm::Paradise), 0);
        assert!(store.realm(Realm::Paradise).is_empty());
    }

    #[test]
    fn test_alignment_after_mixed_operations() {
        let mut store = MediaStore::ephemeral();
        let ops: [(Realm, Option<usize>); 12] = [
            (Realm::Heaven, None),
            (Realm::Heaven, None),
            (Realm::Eternal, None),
            (Realm::Heaven, Some(0)),
            (Realm::Heaven, None),
            (Realm::Eternal, Some(3)),
            (Realm::Eternal, Some(0)),
            (Realm::Heaven, None),
            (Realm::Heaven, Some(2)),
            (Realm::Ancestors, Some(0)),
            (Realm::Ancestors, None),
            (Realm::Heaven, Some(1)),
        ];
        for (step, (realm, remove)) in ops.into_iter().enumerate() {
            match remove {
                Some(index) => store.remove_image(realm, index),
                None => {
                    let index = store.add_image(realm, image(&step.to_string())).unwrap();
                    store.set_annotation(realm, index, &caption("x"));
                    store.set_view_transform(realm, index, SavedTransform { scale: 2.0, tx: 0.0, ty: 0.0 });
                }
            }
            for realm in Realm::ALL {
                let media = store.realm(realm);
                assert!(media.is_aligned(), "step {} realm {}", step, realm);
                assert!(media.current_index < media.len().max(1));
            }
        }
    }

    #[test]
    fn test_partial_annotation_update() {
        let mut store = MediaStore::ephemeral();
        store.add_image(Realm::Heaven, image("A")).unwrap();
        store.set_annotation(
            Realm::Heaven,
            0,
            &AnnotationPatch {
                caption: Some("a very long dedication that goes on".to_string()),
                lifespan: Some("1930-2020".to_string()),
                text_color: Some(HexColor::parse("#123456")),
            },
        );
        store.set_annotation(
            Realm::Heaven,
            0,
            &AnnotationPatch {
                lifespan: Some("1931-2020".to_string()),
                ..AnnotationPatch::default()
            },
        );

        let annotation = store.annotation(Realm::Heaven, 0);
        assert_eq!(annotation.caption, "a very long dedicati");
        assert_eq!(annotation.lifespan, "1931-2020");
        assert_eq!(annotation.text_color, HexColor::parse("#123456"));

        // Explicitly clearing the color
        store.set_annotation(
            Realm::Heaven,
            0,
            &AnnotationPatch {
                text_color: Some(None),
                ..AnnotationPatch::default()
            },
        );
        assert_eq!(store.annotation(Realm::Heaven, 0).text_color, None);
    }

    #[test]
    fn test_invalid_transforms_are_dropped() {
        let mut store = MediaStore::ephemeral();
        store.add_image(Realm::Heaven, image("A")).unwrap();
        let good = SavedTransform { scale: 3.0, tx: -20.0, ty: -4.0 };
        store.set_view_transform(Realm::Heaven, 0, good);
        store.set_view_transform(Realm::Heaven, 0, SavedTransform { scale: 5.0, tx: 0.0, ty: 0.0 });
        store.set_view_transform(Realm::Heaven, 0, SavedTransform { scale: f64::NAN, tx: 0.0, ty: 0.0 });
        store.set_view_transform(Realm::Heaven, 3, good);
        assert_eq!(store.view_transform(Realm::Heaven, 0), good);
        assert!(store.view_transform(Realm::Heaven, 3).is_identity());
    }

    #[test]
    fn test_select_requires_an_image() {
        let mut store = MediaStore::ephemeral();
        store.add_image(Realm::Heaven, image("A")).unwrap();
        store.add_image(Realm::Heaven, image("B")).unwrap();
        assert!(store.select(Realm::Heaven, 0));
        assert_eq!(store.current_index(Realm::Heaven), 0);
        assert!(!store.select(Realm::Heaven, 5));
        assert_eq!(store.current_index(Realm::Heaven), 0);
    }

    #[test]
    fn test_state_survives_reopen() {
        let handle = StoreHandle::new(Library::open_in_memory().unwrap());
        {
            let mut store = MediaStore::open(handle.clone());
            assert!(store.is_persistent());
            store.add_image(Realm::Eternal, image("A")).unwrap();
            store.add_image(Realm::Eternal, image("B")).unwrap();
            store.set_annotation(Realm::Eternal, 0, &caption("forever"));
            store.set_view_transform(Realm::Eternal, 1, SavedTransform { scale: 1.5, tx: -3.0, ty: 0.0 });
            store.select(Realm::Eternal, 0);
        }

        let store = MediaStore::open(handle);
        let eternal = store.realm(Realm::Eternal);
        assert_eq!(eternal.images, vec![image("A"), image("B")]);
        assert_eq!(eternal.captions[0], "forever");
        assert_eq!(eternal.current_index, 0);
        assert_eq!(store.view_transform(Realm::Eternal, 1).scale, 1.5);
    }
}
