/// Viewport math for images inside a fixed-aspect frame
///
/// Pure functions, no side effects. Used identically by the main slot,
/// the fullscreen view and programmatic restores of saved transforms.
///
/// Coordinates are container-local pixels. The transform origin is the
/// image's top-left corner: with base placement `(left, top, width, height)`
/// and transform `(scale, tx, ty)` the image is drawn at
/// `(left + tx, top + ty, width * scale, height * scale)`.
///
/// The governing invariant: the drawn image always fully covers the
/// container. It may be shifted or zoomed but never reveals an edge.

use cgmath::Vector2;

use crate::state::data::SavedTransform;

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Strictly positive and finite in both directions
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width * 0.5, self.top + self.height * 0.5)
    }

    /// Check if `other` lies entirely inside this rectangle (within `eps`)
    pub fn contains_rect(&self, other: &Rect, eps: f64) -> bool {
        self.left <= other.left + eps
            && self.top <= other.top + eps
            && self.right() + eps >= other.right()
            && self.bottom() + eps >= other.bottom()
    }
}

/// Cover-fit placement of an image inside a container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverBase {
    /// Natural-pixel to container-pixel ratio
    pub scale: f64,
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

/// Scale an image so it fully covers the container, centred.
///
/// `scale = max(cw / nw, ch / nh)`, so the image is at least as wide and as
/// tall as the container and overflow is split evenly on both sides.
/// Returns `None` when a dimension is zero, negative or not finite
/// (for example an image that has not been decoded yet).
pub fn compute_cover_base(container: Size, natural: Size) -> Option<CoverBase> {
    if !container.is_drawable() || !natural.is_drawable() {
        return None;
    }

    let scale = (container.width / natural.width).max(container.height / natural.height);
    let width = natural.width * scale;
    let height = natural.height * scale;

    Some(CoverBase {
        scale,
        width,
        height,
        left: (container.width - width) / 2.0,
        top: (container.height - height) / 2.0,
    })
}

/// Clamp `value` into `[min, max]`; an empty window snaps to `max`.
fn clamp_window(value: f64, min: f64, max: f64) -> f64 {
    if min > max {
        max
    } else {
        value.max(min).min(max)
    }
}

/// Clamp a translate so the zoomed image still covers the container.
///
/// The scaled image's top-left must stay in
/// `[container.width - scaledW, 0] x [container.height - scaledH, 0]`.
/// Returns the translate that puts `base.left + tx` / `base.top + ty`
/// inside that window. This is the single clamp law for every caller.
pub fn clamp_translate(base: &CoverBase, container: Size, zoom: f64, tx: f64, ty: f64) -> Vector2<f64> {
    let scaled_w = base.width * zoom;
    let scaled_h = base.height * zoom;

    let left = clamp_window(base.left + tx, container.width - scaled_w, 0.0);
    let top = clamp_window(base.top + ty, container.height - scaled_h, 0.0);

    Vector2::new(left - base.left, top - base.top)
}

/// Translate that keeps an image point under the gesture's focal point.
///
/// The start focal point is mapped into pre-scale image-local coordinates
/// using the start transform, then the translate is solved so that same
/// image point lands under `focal` at `new_scale`. Not clamped.
pub fn focal_zoom_translate(
    base: &CoverBase,
    start_scale: f64,
    start_translate: Vector2<f64>,
    start_focal: Vector2<f64>,
    focal: Vector2<f64>,
    new_scale: f64,
) -> Vector2<f64> {
    let origin = Vector2::new(base.left, base.top);
    let image_point = (start_focal - origin - start_translate) / start_scale;
    focal - origin - image_point * new_scale
}

/// Live pan/zoom state of one rendered image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub base: CoverBase,
    pub container: Size,
    pub scale: f64,
    pub translate: Vector2<f64>,
}

impl ViewportTransform {
    /// Cover-fit, centred, no pan
    pub fn identity(container: Size, natural: Size) -> Option<Self> {
        let base = compute_cover_base(container, natural)?;
        Some(Self {
            base,
            container,
            scale: SavedTransform::MIN_SCALE,
            translate: Vector2::new(0.0, 0.0),
        })
    }

    /// Rebuild from a saved transform, re-clamping against the current geometry.
    ///
    /// Base geometry is always recomputed, so a transform saved at another
    /// container size still covers the frame. Non-finite state falls back
    /// to identity.
    pub fn restore(container: Size, natural: Size, saved: SavedTransform) -> Option<Self> {
        let mut view = Self::identity(container, natural)?;
        if saved.scale.is_finite() && saved.scale > 0.0 && saved.tx.is_finite() && saved.ty.is_finite() {
            view.scale = saved.scale;
            view.translate = clamp_translate(&view.base, container, saved.scale, saved.tx, saved.ty);
        }
        Some(view)
    }

    /// Set scale (clamped to [1, 4]) and translate (clamped to cover)
    pub fn set(&mut self, scale: f64, translate: Vector2<f64>) {
        let scale = if scale.is_finite() {
            scale.clamp(SavedTransform::MIN_SCALE, SavedTransform::MAX_SCALE)
        } else {
            SavedTransform::MIN_SCALE
        };
        self.scale = scale;
        self.translate = clamp_translate(&self.base, self.container, scale, translate.x, translate.y);
    }

    /// Where the image is drawn, in container-local pixels
    pub fn image_rect(&self) -> Rect {
        Rect::new(
            self.base.left + self.translate.x,
            self.base.top + self.translate.y,
            self.base.width * self.scale,
            self.base.height * self.scale,
        )
    }

    /// The container rectangle in the same coordinate space
    pub fn container_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.container.width, self.container.height)
    }

    /// The part that gets persisted
    pub fn saved(&self) -> SavedTransform {
        SavedTransform {
            scale: self.scale,
            tx: self.translate.x,
            ty: self.translate.y,
        }
    }

    /// Visible part of the image in natural-pixel coordinates
    pub fn visible_source_rect(&self) -> Rect {
        let drawn = self.image_rect();
        let ratio = self.base.scale * self.scale;
        Rect::new(
            -drawn.left / ratio,
            -drawn.top / ratio,
            self.container.width / ratio,
            self.container.height / ratio,
        )
    }
}
