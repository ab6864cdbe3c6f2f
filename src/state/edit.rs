/// Pending edits to an image's dedication
///
/// The form fields the user types into are collected in a `DedicationEdit`
/// and only applied when saved. Where they land depends on the view:
/// - main view: written straight into the `MediaStore` as an `AnnotationPatch`
/// - fullscreen: kept as a per-image draft that never reaches the store

use crate::color::HexColor;

/// Partial update of one image's annotations
///
/// `None` leaves a field untouched. For `text_color`, `Some(None)` clears
/// the color back to automatic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub caption: Option<String>,
    pub lifespan: Option<String>,
    pub text_color: Option<Option<HexColor>>,
}

impl AnnotationPatch {
    /// Check if applying this patch would change nothing
    pub fn is_empty(&self) -> bool {
        self.caption.is_none() && self.lifespan.is_none() && self.text_color.is_none()
    }

    /// Patch that clears caption, life span and color
    pub fn clear() -> Self {
        Self {
            caption: Some(String::new()),
            lifespan: Some(String::new()),
            text_color: Some(None),
        }
    }
}

/// What the dedication form currently holds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedicationEdit {
    /// Dedication text as typed
    pub dedication: String,

    /// Birth–death text as typed
    pub lifespan: String,

    /// Color picked by the user
    /// - `None` = the picker was never touched
    /// - `Some(None)` = explicitly reset to automatic
    pub color: Option<Option<HexColor>>,
}

impl DedicationEdit {
    /// Pre-fill the form from saved texts; the color starts untouched
    pub fn prefilled(dedication: impl Into<String>, lifespan: impl Into<String>) -> Self {
        Self {
            dedication: dedication.into(),
            lifespan: lifespan.into(),
            color: None,
        }
    }

    /// Record a color choice from the picker (`None` = automatic)
    pub fn pick_color(&mut self, color: Option<HexColor>) {
        self.color = Some(color);
    }

    /// The main-view save: non-empty text replaces caption and life span
    /// (and the color if it was touched); blank text clears everything.
    /// Both texts are trimmed.
    pub fn to_main_patch(&self) -> AnnotationPatch {
        let dedication = self.dedication.trim();
        if dedication.is_empty() {
            return AnnotationPatch::clear();
        }
        AnnotationPatch {
            caption: Some(dedication.to_string()),
            lifespan: Some(self.lifespan.trim().to_string()),
            text_color: self.color,
        }
    }
}
