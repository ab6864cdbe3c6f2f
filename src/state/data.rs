/// Shared data structures for the application state
///
/// These types represent the data model that flows between the
/// persistence layer, the engine and the UI layer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::color::HexColor;
use crate::error::{Result, ViewerError};

/// Maximum number of images a single realm can hold
pub const MAX_IMAGES_PER_REALM: usize = 7;

/// Maximum length of a dedication, in characters
pub const MAX_DEDICATION_CHARS: usize = 20;

/// One of the four thematic categories a photo is filed under
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    Heaven,
    Paradise,
    Ancestors,
    Eternal,
}

impl Realm {
    /// All realms in display order
    pub const ALL: [Realm; 4] = [Realm::Heaven, Realm::Paradise, Realm::Ancestors, Realm::Eternal];

    /// Storage / display identifier
    pub fn as_str(self) -> &'static str {
        match self {
            Realm::Heaven => "heaven",
            Realm::Paradise => "paradise",
            Realm::Ancestors => "ancestors",
            Realm::Eternal => "eternal",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Realm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Realm::ALL
            .into_iter()
            .find(|realm| realm.as_str() == s)
            .ok_or_else(|| format!("unknown realm `{}`", s))
    }
}

/// One value per realm.
///
/// Serializes as `{ "heaven": …, "paradise": …, "ancestors": …, "eternal": … }`,
/// which is the shape of every per-realm record in the store.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PerRealm<T> {
    pub heaven: T,
    pub paradise: T,
    pub ancestors: T,
    pub eternal: T,
}

impl<T> PerRealm<T> {
    /// Build a record by calling `f` once per realm
    pub fn from_fn(mut f: impl FnMut(Realm) -> T) -> Self {
        Self {
            heaven: f(Realm::Heaven),
            paradise: f(Realm::Paradise),
            ancestors: f(Realm::Ancestors),
            eternal: f(Realm::Eternal),
        }
    }

    /// Transform every value, keeping the realm association
    pub fn map<U>(&self, mut f: impl FnMut(Realm, &T) -> U) -> PerRealm<U> {
        PerRealm::from_fn(|realm| f(realm, &self[realm]))
    }
}

impl<T> Index<Realm> for PerRealm<T> {
    type Output = T;

    fn index(&self, realm: Realm) -> &T {
        match realm {
            Realm::Heaven => &self.heaven,
            Realm::Paradise => &self.paradise,
            Realm::Ancestors => &self.ancestors,
            Realm::Eternal => &self.eternal,
        }
    }
}

impl<T> IndexMut<Realm> for PerRealm<T> {
    fn index_mut(&mut self, realm: Realm) -> &mut T {
        match realm {
            Realm::Heaven => &mut self.heaven,
            Realm::Paradise => &mut self.paradise,
            Realm::Ancestors => &mut self.ancestors,
            Realm::Eternal => &mut self.eternal,
        }
    }
}

/// An encoded raster, stored as a `data:` URL.
///
/// The engine treats it as opaque; only the raster helpers look inside.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wrap an existing data URL
    pub fn new(data_url: impl Into<String>) -> Self {
        Self(data_url.into())
    }

    /// Encode raw file bytes as a data URL, sniffing the MIME type
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mime = image::guess_format(bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");
        Self::from_bytes_with_mime(bytes, mime)
    }

    /// Encode raw bytes as a data URL with an explicit MIME type
    pub fn from_bytes_with_mime(bytes: &[u8], mime: &str) -> Self {
        Self(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    /// The data URL itself
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty references mark unusable slots
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Decode the base64 body back into file bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = match self.0.split_once(',') {
            Some((header, body)) if header.starts_with("data:") && header.ends_with(";base64") => body,
            _ => return Err(ViewerError::DecodeFailure("not a base64 data URL".to_string())),
        };
        STANDARD
            .decode(body.trim())
            .map_err(|e| ViewerError::DecodeFailure(e.to_string()))
    }
}

/// Saved pan/zoom state for one image.
///
/// `scale` multiplies the cover-fit size; `tx`/`ty` are pixel offsets of the
/// image's top-left corner from its cover-fit position.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SavedTransform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl SavedTransform {
    /// Cover-fit, centred, no pan
    pub const IDENTITY: SavedTransform = SavedTransform { scale: 1.0, tx: 0.0, ty: 0.0 };

    /// Smallest allowed zoom (cover fit)
    pub const MIN_SCALE: f64 = 1.0;

    /// Largest allowed zoom
    pub const MAX_SCALE: f64 = 4.0;

    /// Finite values and a scale inside [1, 4]
    pub fn is_valid(&self) -> bool {
        self.scale.is_finite()
            && self.tx.is_finite()
            && self.ty.is_finite()
            && (Self::MIN_SCALE..=Self::MAX_SCALE).contains(&self.scale)
    }

    /// Check if this is the identity transform
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for SavedTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The annotations attached to one image, as stored in the main view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    /// Dedication text (may be empty)
    pub caption: String,
    /// Free-form "birth–death" text (may be empty)
    pub lifespan: String,
    /// Explicit text color; `None` means derive from brightness
    pub text_color: Option<HexColor>,
}

/// Truncate a dedication to the allowed number of characters
pub fn clamp_dedication(text: &str) -> String {
    text.chars().take(MAX_DEDICATION_CHARS).collect()
}
