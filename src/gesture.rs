/// Pan and pinch gestures on the main slot and the fullscreen image
///
/// Raw contact points (touch fingers, or the mouse as a single contact) are
/// classified into a gesture and applied to a live `ViewportTransform`:
/// - one contact pans
/// - two contacts pinch, zooming around their midpoint
///
/// Nothing is persisted while fingers are down. When the last contact lifts
/// the controller hands back the final transform for the caller to save.

use cgmath::{InnerSpace, Vector2};
use std::collections::BTreeMap;

use crate::state::data::{Realm, SavedTransform};
use crate::viewport::{focal_zoom_translate, ViewportTransform};

/// A point in container-local pixels
pub type Point = Vector2<f64>;

/// Stable identifier of one contact for the duration of a gesture
pub type ContactId = u64;

/// Contact id used for the mouse pointer
pub const MOUSE_CONTACT: ContactId = u64::MAX;

/// Zoom factor applied per wheel line
const WHEEL_ZOOM_STEP: f64 = 1.1;

/// Which image surface a gesture drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    MainSlot,
    Fullscreen,
}

/// The image a gesture is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTarget {
    pub surface: Surface,
    pub realm: Realm,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Panning {
        start_point: Point,
        start_translate: Vector2<f64>,
    },
    Pinching {
        start_distance: f64,
        start_scale: f64,
        start_translate: Vector2<f64>,
        start_focal: Point,
    },
}

/// A raw pointer event in container-local pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactEvent {
    Pressed { id: ContactId, point: Point },
    Moved { id: ContactId, point: Point },
    Lifted { id: ContactId },
    Wheel { point: Point, lines: f64 },
}

/// What a contact event did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    /// No surface attached, or an event for an unknown contact
    Ignored,
    /// The live transform changed (or the gesture changed phase)
    Updated(ViewportTransform),
    /// The gesture ended; `transform` should be saved for `target`
    Committed {
        target: GestureTarget,
        transform: SavedTransform,
    },
}

/// Idle / Panning / Pinching state machine
#[derive(Debug, Clone)]
pub struct GestureController {
    target: Option<GestureTarget>,
    view: Option<ViewportTransform>,
    contacts: BTreeMap<ContactId, Point>,
    phase: Phase,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureController {
    pub fn new() -> Self {
        Self {
            target: None,
            view: None,
            contacts: BTreeMap::new(),
            phase: Phase::Idle,
        }
    }

    /// Attach to a surface showing `view`.
    ///
    /// Ignored while a gesture is in progress so a re-render cannot yank
    /// the transform out from under the user's fingers.
    pub fn attach(&mut self, target: GestureTarget, view: ViewportTransform) -> bool {
        if self.is_active() {
            return false;
        }
        self.target = Some(target);
        self.view = Some(view);
        true
    }

    /// Drop the attached surface without committing
    pub fn detach(&mut self) {
        self.target = None;
        self.view = None;
        self.contacts.clear();
        self.phase = Phase::Idle;
    }

    pub fn target(&self) -> Option<GestureTarget> {
        self.target
    }

    /// Live transform of the attached surface
    pub fn view(&self) -> Option<&ViewportTransform> {
        self.view.as_ref()
    }

    /// Whether any contact is down
    pub fn is_active(&self) -> bool {
        !self.contacts.is_empty()
    }

    pub fn is_pinching(&self) -> bool {
        matches!(self.phase, Phase::Pinching { .. })
    }

    /// Dispatch a raw event
    pub fn handle(&mut self, event: ContactEvent) -> GestureOutcome {
        match event {
            ContactEvent::Pressed { id, point } => self.press(id, point),
            ContactEvent::Moved { id, point } => self.moved(id, point),
            ContactEvent::Lifted { id } => self.lift(id),
            ContactEvent::Wheel { point, lines } => self.wheel_zoom(point, lines),
        }
    }

    /// A contact touched down
    pub fn press(&mut self, id: ContactId, point: Point) -> GestureOutcome {
        if self.view.is_none() {
            return GestureOutcome::Ignored;
        }
        self.contacts.insert(id, point);
        self.reclassify();
        self.updated()
    }

    /// A contact moved
    pub fn moved(&mut self, id: ContactId, point: Point) -> GestureOutcome {
        let Some(view) = self.view.as_mut() else {
            return GestureOutcome::Ignored;
        };
        match self.contacts.get_mut(&id) {
            Some(contact) => *contact = point,
            None => return GestureOutcome::Ignored,
        }

        match self.phase {
            Phase::Idle => {}
            Phase::Panning {
                start_point,
                start_translate,
            } => {
                let translate = start_translate + (point - start_point);
                view.set(view.scale, translate);
            }
            Phase::Pinching {
                start_distance,
                start_scale,
                start_translate,
                start_focal,
            } => {
                let Some((a, b)) = first_two(&self.contacts) else {
                    return GestureOutcome::Ignored;
                };
                // Both fingers started on the same pixel
                if start_distance <= 0.0 {
                    return GestureOutcome::Ignored;
                }
                let distance = (b - a).magnitude();
                let scale = (start_scale * distance / start_distance)
                    .clamp(SavedTransform::MIN_SCALE, SavedTransform::MAX_SCALE);
                let focal = (a + b) * 0.5;
                let translate = focal_zoom_translate(&view.base, start_scale, start_translate, start_focal, focal, scale);
                view.set(scale, translate);
            }
        }
        self.updated()
    }

    /// A contact lifted (or was lost)
    pub fn lift(&mut self, id: ContactId) -> GestureOutcome {
        if self.contacts.remove(&id).is_none() {
            return GestureOutcome::Ignored;
        }

        if self.contacts.is_empty() {
            self.phase = Phase::Idle;
            return self.commit();
        }

        // Two fingers down to one: keep going as a pan from where we are
        self.reclassify();
        self.updated()
    }

    /// Zoom around `point` in one step (mouse wheel) and commit.
    ///
    /// Positive `lines` zoom in. Ignored during a touch gesture.
    pub fn wheel_zoom(&mut self, point: Point, lines: f64) -> GestureOutcome {
        if self.is_active() || !lines.is_finite() {
            return GestureOutcome::Ignored;
        }
        let Some(view) = self.view.as_mut() else {
            return GestureOutcome::Ignored;
        };

        let scale = (view.scale * WHEEL_ZOOM_STEP.powf(lines))
            .clamp(SavedTransform::MIN_SCALE, SavedTransform::MAX_SCALE);
        let translate = focal_zoom_translate(&view.base, view.scale, view.translate, point, point, scale);
        view.set(scale, translate);
        self.commit()
    }

    /// Re-derive the phase from the contacts currently down
    fn reclassify(&mut self) {
        let Some(view) = self.view.as_ref() else {
            self.phase = Phase::Idle;
            return;
        };

        self.phase = match (first_two(&self.contacts), self.contacts.values().next()) {
            (Some((a, b)), _) => {
                log::debug!("🤏 Pinch started at scale {:.2}", view.scale);
                Phase::Pinching {
                    start_distance: (b - a).magnitude(),
                    start_scale: view.scale,
                    start_translate: view.translate,
                    start_focal: (a + b) * 0.5,
                }
            }
            (None, Some(&point)) => Phase::Panning {
                start_point: point,
                start_translate: view.translate,
            },
            (None, None) => Phase::Idle,
        };
    }

    fn updated(&self) -> GestureOutcome {
        match self.view {
            Some(view) => GestureOutcome::Updated(view),
            None => GestureOutcome::Ignored,
        }
    }

    fn commit(&mut self) -> GestureOutcome {
        match (self.target, self.view) {
            (Some(target), Some(view)) => GestureOutcome::Committed {
                target,
                transform: view.saved(),
            },
            _ => GestureOutcome::Ignored,
        }
    }
}

/// The two lowest-id contacts, if at least two are down
fn first_two(contacts: &BTreeMap<ContactId, Point>) -> Option<(Point, Point)> {
    let mut points = contacts.values();
    let a = *points.next()?;
    let b = *points.next()?;
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::Size;

    const EPS: f64 = 1e-9;

    fn target() -> GestureTarget {
        GestureTarget {
            surface: Surface::MainSlot,
            realm: Realm::Heaven,
            index: 0,
        }
    }

    fn attached() -> GestureController {
        let view = ViewportTransform::identity(Size::new(300.0, 600.0), Size::new(600.0, 600.0)).unwrap();
        let mut gestures = GestureController::new();
        assert!(gestures.attach(target(), view));
        gestures
    }

    fn p(x: f64, y: f64) -> Point {
        Vector2::new(x, y)
    }

    #[test]
    fn test_ignored_without_surface() {
        let mut gestures = GestureController::new();
        assert_eq!(gestures.press(1, p(10.0, 10.0)), GestureOutcome::Ignored);
        assert!(!gestures.is_active());
    }

    #[test]
    fn test_pan_is_clamped() {
        let mut gestures = attached();
        gestures.press(1, p(100.0, 100.0));
        gestures.moved(1, p(600.0, 100.0));
        // The left edge may move right by at most 150
        assert_eq!(gestures.view().unwrap().translate, Vector2::new(150.0, 0.0));

        gestures.moved(1, p(40.0, 100.0));
        assert_eq!(gestures.view().unwrap().translate, Vector2::new(-60.0, 0.0));
    }

    #[test]
    fn test_pinch_keeps_focal_point_fixed() {
        let mut gestures = attached();
        gestures.press(1, p(100.0, 300.0));
        gestures.press(2, p(200.0, 300.0));
        assert!(gestures.is_pinching());

        gestures.moved(1, p(50.0, 300.0));
        gestures.moved(2, p(250.0, 300.0));

        let view = *gestures.view().unwrap();
        assert!((view.scale - 2.0).abs() < EPS);
        assert_eq!(view.translate, Vector2::new(-300.0, -300.0));

        // Image point under the focal point is the same before and after
        let focal = p(150.0, 300.0);
        let origin = Vector2::new(view.base.left, view.base.top);
        let before = focal - origin;
        let after = (focal - origin - view.translate) / view.scale;
        assert!((before - after).magnitude() < EPS);
        assert!(view.image_rect().contains_rect(&view.container_rect(), 1e-6));
    }

    #[test]
    fn test_pinch_scale_is_clamped() {
        let mut gestures = attached();
        gestures.press(1, p(140.0, 300.0));
        gestures.press(2, p(160.0, 300.0));
        gestures.moved(2, p(360.0, 300.0));
        assert_eq!(gestures.view().unwrap().scale, SavedTransform::MAX_SCALE);

        gestures.moved(2, p(141.0, 300.0));
        assert_eq!(gestures.view().unwrap().scale, SavedTransform::MIN_SCALE);
    }

    #[test]
    fn test_coincident_fingers_do_not_zoom() {
        let mut gestures = attached();
        gestures.press(1, p(150.0, 300.0));
        gestures.press(2, p(150.0, 300.0));
        assert_eq!(gestures.moved(2, p(250.0, 300.0)), GestureOutcome::Ignored);
        assert_eq!(gestures.view().unwrap().scale, 1.0);
    }

    #[test]
    fn test_commit_only_when_last_contact_lifts() {
        let mut gestures = attached();
        gestures.press(1, p(100.0, 300.0));
        gestures.press(2, p(200.0, 300.0));
        gestures.moved(2, p(300.0, 300.0));

        // Back to a single finger: pan continues without a jump
        let outcome = gestures.lift(2);
        assert!(matches!(outcome, GestureOutcome::Updated(_)));
        assert!(gestures.is_active());
        assert!(!gestures.is_pinching());
        let before = gestures.view().unwrap().translate;
        gestures.moved(1, p(100.0, 300.0));
        assert!((gestures.view().unwrap().translate - before).magnitude() < EPS);

        match gestures.lift(1) {
            GestureOutcome::Committed { target: t, transform } => {
                assert_eq!(t, target());
                assert!(transform.is_valid());
                assert!(transform.scale > 1.0);
            }
            other => panic!("expected a commit, got {:?}", other),
        }
        assert!(!gestures.is_active());
        assert_eq!(gestures.lift(1), GestureOutcome::Ignored);
    }

    #[test]
    fn test_attach_refused_mid_gesture() {
        let mut gestures = attached();
        gestures.press(MOUSE_CONTACT, p(10.0, 10.0));
        let other = ViewportTransform::identity(Size::new(100.0, 100.0), Size::new(100.0, 100.0)).unwrap();
        assert!(!gestures.attach(target(), other));
        gestures.detach();
        assert!(gestures.attach(target(), other));
    }

    #[test]
    fn test_wheel_zoom_commits_around_pointer() {
        let mut gestures = attached();
        match gestures.wheel_zoom(p(150.0, 300.0), 3.0) {
            GestureOutcome::Committed { transform, .. } => {
                assert!((transform.scale - 1.1f64.powi(3)).abs() < EPS);
            }
            other => panic!("expected a commit, got {:?}", other),
        }
        let view = gestures.view().unwrap();
        assert!(view.image_rect().contains_rect(&view.container_rect(), 1e-6));

        for _ in 0..40 {
            gestures.wheel_zoom(p(0.0, 0.0), -1.0);
        }
        assert_eq!(gestures.view().unwrap().scale, 1.0);
    }
}
