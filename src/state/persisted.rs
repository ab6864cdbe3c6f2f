/// Typed schema for the persisted records
///
/// This is the single load/save boundary between the in-memory realm
/// collections and the key/value store. Loading is lenient:
/// - a record that is missing or unreadable yields empty collections
/// - older records stored a single string per realm instead of an array
/// - arrays may contain holes (`null`) or values of the wrong type
///
/// After loading, every realm's sequences are re-aligned to its images.

use serde_json::Value;

use super::data::{clamp_dedication, ImageRef, PerRealm, Realm, SavedTransform, MAX_IMAGES_PER_REALM};
use super::library::{StoreHandle, StoreKey};
use super::media::RealmMedia;
use crate::color::HexColor;

/// Read a record as loose JSON, logging (and ignoring) failures
fn load_record(store: &StoreHandle, key: StoreKey) -> Option<Value> {
    match store.get_json::<Value>(key) {
        Ok(value) => value,
        Err(e) => {
            log::error!("❌ Ignoring unreadable record {}: {}", key.as_str(), e);
            None
        }
    }
}

/// The realm's entry as a list, accepting the old single-string form
fn realm_items(record: Option<&Value>, realm: Realm) -> Vec<Value> {
    match record.and_then(|r| r.get(realm.as_str())) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => vec![Value::String(s.clone())],
        _ => Vec::new(),
    }
}

fn string_or_empty(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

fn transform_or_none(value: &Value) -> Option<SavedTransform> {
    serde_json::from_value::<SavedTransform>(value.clone())
        .ok()
        .filter(|t| t.scale.is_finite() && t.tx.is_finite() && t.ty.is_finite())
}

/// Load every realm's collections from the store
pub fn load_media(store: &StoreHandle) -> PerRealm<RealmMedia> {
    let images = load_record(store, StoreKey::Images);
    let index = load_record(store, StoreKey::CurrentIndex);
    let captions = load_record(store, StoreKey::Captions);
    let lifespans = load_record(store, StoreKey::Lifespans);
    let colors = load_record(store, StoreKey::TextColors);
    let transforms = load_record(store, StoreKey::Transforms);

    let media = PerRealm::from_fn(|realm| {
        let mut images: Vec<ImageRef> = realm_items(images.as_ref(), realm)
            .iter()
            .map(|v| ImageRef::new(string_or_empty(v)))
            .collect();
        images.truncate(MAX_IMAGES_PER_REALM);

        let current_index = index
            .as_ref()
            .and_then(|r| r.get(realm.as_str()))
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        let mut media = RealmMedia {
            images,
            captions: realm_items(captions.as_ref(), realm)
                .iter()
                .map(|v| clamp_dedication(&string_or_empty(v)))
                .collect(),
            lifespans: realm_items(lifespans.as_ref(), realm).iter().map(string_or_empty).collect(),
            text_colors: realm_items(colors.as_ref(), realm)
                .iter()
                .map(|v| v.as_str().and_then(HexColor::parse))
                .collect(),
            transforms: realm_items(transforms.as_ref(), realm).iter().map(transform_or_none).collect(),
            current_index,
        };
        media.realign();
        media
    });

    let total: usize = Realm::ALL.iter().map(|&realm| media[realm].images.len()).sum();
    log::info!("✅ Loaded {} images across {} realms", total, Realm::ALL.len());
    media
}

/// Write the record for `key` from the in-memory collections
pub fn save_media(store: &StoreHandle, media: &PerRealm<RealmMedia>, key: StoreKey) {
    match key {
        StoreKey::Images => store.save(key, &media.map(|_, m| m.images.clone())),
        StoreKey::CurrentIndex => store.save(key, &media.map(|_, m| m.current_index)),
        StoreKey::Captions => store.save(key, &media.map(|_, m| m.captions.clone())),
        StoreKey::Lifespans => store.save(key, &media.map(|_, m| m.lifespans.clone())),
        StoreKey::TextColors => store.save(
            key,
            &media.map(|_, m| {
                m.text_colors
                    .iter()
                    .map(|c| c.map(|c| c.to_string()).unwrap_or_default())
                    .collect::<Vec<_>>()
            }),
        ),
        StoreKey::Transforms => store.save(key, &media.map(|_, m| m.transforms.clone())),
        StoreKey::EngagementStats | StoreKey::MottoText | StoreKey::FullscreenNote => {
            log::warn!("⚠️  {} is not part of the media records", key.as_str());
        }
    }
}
