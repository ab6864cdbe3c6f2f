use iced::alignment;
use iced::mouse::{self, Cursor};
use iced::touch;
use iced::widget::canvas::{self, Program};
use iced::widget::image::Handle;
use iced::{Color, Pixels, Point, Rectangle, Renderer, Theme};
use std::collections::HashSet;

use tribute_viewer::app_state::{dedication_anchor, glyph_anchor, note_anchor, SlotOverlay};
use tribute_viewer::color::HexColor;
use tribute_viewer::gesture::{ContactEvent, Surface, MOUSE_CONTACT};
use tribute_viewer::state::data::SavedTransform;
use tribute_viewer::viewport::{Size, ViewportTransform};

use crate::Message;

/// Pixels of wheel travel that count as one line
const PIXELS_PER_LINE: f32 = 50.0;

/// An image surface (main slot or fullscreen) with its text overlay.
/// Draws through `ViewportTransform` and turns pointer input into
/// container-local contact events.
pub struct ImageSlot<'a> {
    pub surface: Surface,
    pub handle: Option<&'a Handle>,
    /// Natural size of the decoded image
    pub natural: Option<Size>,
    /// Live transform, if the app has one for this surface
    pub live: Option<ViewportTransform>,
    /// Saved transform, used until the app knows the surface size
    pub saved: SavedTransform,
    pub overlay: Option<SlotOverlay>,
    pub text_color: HexColor,
    /// Small note text and its color
    pub note: Option<(String, HexColor)>,
    /// Carousel lock indicator: (locked, color)
    pub lock_glyph: Option<(bool, HexColor)>,
}

impl<'a> ImageSlot<'a> {
    /// Transform for the current bounds
    fn view_for(&self, bounds: Rectangle) -> Option<ViewportTransform> {
        let container = Size::new(bounds.width as f64, bounds.height as f64);
        match self.live {
            Some(view) if view.container == container => Some(view),
            _ => ViewportTransform::restore(container, self.natural?, self.saved),
        }
    }
}

fn to_color(color: HexColor) -> Color {
    let [r, g, b] = color.to_rgb_f32();
    Color::from_rgb(r, g, b)
}

fn local(position: Point, bounds: Rectangle) -> cgmath::Vector2<f64> {
    cgmath::Vector2::new((position.x - bounds.x) as f64, (position.y - bounds.y) as f64)
}

/// Translate a pointer event into a container-local contact, tracking which
/// fingers and buttons went down inside the slot
fn contact_event(state: &mut SlotState, event: canvas::Event, bounds: Rectangle, cursor: Cursor) -> Option<ContactEvent> {
    match event {
        canvas::Event::Touch(touch::Event::FingerPressed { id, position }) if bounds.contains(position) => {
            state.fingers.insert(id.0);
            Some(ContactEvent::Pressed {
                id: id.0,
                point: local(position, bounds),
            })
        }
        canvas::Event::Touch(touch::Event::FingerMoved { id, position }) if state.fingers.contains(&id.0) => {
            Some(ContactEvent::Moved {
                id: id.0,
                point: local(position, bounds),
            })
        }
        canvas::Event::Touch(touch::Event::FingerLifted { id, .. })
        | canvas::Event::Touch(touch::Event::FingerLost { id, .. }) => {
            state.fingers.remove(&id.0).then_some(ContactEvent::Lifted { id: id.0 })
        }

        // Mouse acts as a single contact
        canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
            let position = cursor.position_over(bounds)?;
            state.is_dragging = true;
            Some(ContactEvent::Pressed {
                id: MOUSE_CONTACT,
                point: local(position, bounds),
            })
        }
        canvas::Event::Mouse(mouse::Event::CursorMoved { position }) if state.is_dragging => {
            Some(ContactEvent::Moved {
                id: MOUSE_CONTACT,
                point: local(position, bounds),
            })
        }
        canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) if state.is_dragging => {
            state.is_dragging = false;
            Some(ContactEvent::Lifted { id: MOUSE_CONTACT })
        }
        canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
            let position = cursor.position_over(bounds)?;
            let lines = match delta {
                mouse::ScrollDelta::Lines { y, .. } => y,
                mouse::ScrollDelta::Pixels { y, .. } => y / PIXELS_PER_LINE,
            };
            Some(ContactEvent::Wheel {
                point: local(position, bounds),
                lines: lines as f64,
            })
        }
        _ => None,
    }
}

impl<'a> Program<Message> for ImageSlot<'a> {
    type State = SlotState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb(0.08, 0.08, 0.08));

        let (Some(handle), Some(view)) = (self.handle, self.view_for(bounds)) else {
            return vec![frame.into_geometry()];
        };

        let drawn = view.image_rect();
        let image_bounds = Rectangle::new(
            Point::new(drawn.left as f32, drawn.top as f32),
            iced::Size::new(drawn.width as f32, drawn.height as f32),
        );
        frame.with_clip(Rectangle::with_size(bounds.size()), |frame| {
            frame.draw_image(image_bounds, canvas::Image::new(handle.clone()));
        });

        if let Some(overlay) = &self.overlay {
            let anchor = dedication_anchor(view.container);
            let color = to_color(self.text_color);
            let size = (bounds.width * 0.075).clamp(14.0, 40.0);
            let (cx, _) = anchor.center();

            frame.fill_text(canvas::Text {
                content: overlay.dedication.clone(),
                position: Point::new(cx as f32, anchor.top as f32),
                color,
                size: Pixels(size),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Top,
                ..canvas::Text::default()
            });
            frame.fill_text(canvas::Text {
                content: overlay.lifespan.clone(),
                position: Point::new(cx as f32, anchor.top as f32 + size * 1.4),
                color,
                size: Pixels(size * 0.6),
                horizontal_alignment: alignment::Horizontal::Center,
                vertical_alignment: alignment::Vertical::Top,
                ..canvas::Text::default()
            });
        }

        if let Some((note, color)) = &self.note {
            let anchor = note_anchor(self.surface, view.container);
            let (cx, _) = anchor.center();
            let (x, horizontal_alignment) = match self.surface {
                Surface::MainSlot => (anchor.left, alignment::Horizontal::Left),
                Surface::Fullscreen => (cx, alignment::Horizontal::Center),
            };
            frame.fill_text(canvas::Text {
                content: note.clone(),
                position: Point::new(x as f32, anchor.top as f32),
                color: to_color(*color),
                size: Pixels((anchor.height as f32 * 0.6).clamp(11.0, 18.0)),
                horizontal_alignment,
                vertical_alignment: alignment::Vertical::Top,
                ..canvas::Text::default()
            });
        }

        if let Some((locked, color)) = self.lock_glyph {
            let anchor = glyph_anchor(view.container);
            let (cx, cy) = anchor.center();
            let circle = canvas::Path::circle(Point::new(cx as f32, cy as f32), anchor.width as f32 / 2.0);
            if locked {
                frame.fill(&circle, to_color(color));
            } else {
                frame.stroke(
                    &circle,
                    canvas::Stroke::default().with_color(to_color(color)).with_width(2.0),
                );
            }
        }

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        // Contacts carry the size with them so the first one is never lost
        let size = Size::new(bounds.width as f64, bounds.height as f64);
        if let Some(contact) = contact_event(state, event, bounds, cursor) {
            state.reported = Some(size);
            return (
                canvas::event::Status::Captured,
                Some(Message::Contact(self.surface, size, contact)),
            );
        }

        if state.reported != Some(size) {
            state.reported = Some(size);
            return (canvas::event::Status::Ignored, Some(Message::SurfaceResized(self.surface, size)));
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(&self, state: &Self::State, bounds: Rectangle, cursor: Cursor) -> mouse::Interaction {
        if state.is_dragging {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) && self.handle.is_some() {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}

/// Pointer state for one slot
#[derive(Debug, Clone, Default)]
pub struct SlotState {
    pub is_dragging: bool,
    pub fingers: HashSet<u64>,
    /// Last size sent to the app
    pub reported: Option<Size>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> ImageSlot<'static> {
        ImageSlot {
            surface: Surface::Fullscreen,
            handle: None,
            natural: None,
            live: None,
            saved: SavedTransform::IDENTITY,
            overlay: None,
            text_color: HexColor::WHITE,
            note: None,
            lock_glyph: None,
        }
    }

    fn bounds() -> Rectangle {
        Rectangle::new(Point::new(10.0, 20.0), iced::Size::new(300.0, 600.0))
    }

    fn press(id: u64, x: f32, y: f32) -> canvas::Event {
        canvas::Event::Touch(touch::Event::FingerPressed {
            id: touch::Finger(id),
            position: Point::new(x, y),
        })
    }

    #[test]
    fn test_first_press_on_fresh_surface_is_delivered() {
        let slot = slot();
        let mut state = SlotState::default();

        let (status, message) = slot.update(&mut state, press(1, 60.0, 120.0), bounds(), Cursor::Unavailable);

        assert_eq!(status, canvas::event::Status::Captured);
        match message {
            Some(Message::Contact(Surface::Fullscreen, size, ContactEvent::Pressed { id: 1, point })) => {
                assert_eq!(size, Size::new(300.0, 600.0));
                assert_eq!(point, cgmath::Vector2::new(50.0, 100.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(state.fingers.contains(&1));
        assert_eq!(state.reported, Some(Size::new(300.0, 600.0)));
    }

    #[test]
    fn test_two_fingers_on_fresh_surface_both_tracked() {
        let slot = slot();
        let mut state = SlotState::default();
        slot.update(&mut state, press(1, 60.0, 120.0), bounds(), Cursor::Unavailable);
        slot.update(&mut state, press(2, 200.0, 300.0), bounds(), Cursor::Unavailable);
        assert_eq!(state.fingers.len(), 2);

        let moved = canvas::Event::Touch(touch::Event::FingerMoved {
            id: touch::Finger(1),
            position: Point::new(40.0, 100.0),
        });
        let (_, message) = slot.update(&mut state, moved, bounds(), Cursor::Unavailable);
        assert!(matches!(
            message,
            Some(Message::Contact(_, _, ContactEvent::Moved { id: 1, .. }))
        ));
    }

    #[test]
    fn test_other_events_report_size_once() {
        let slot = slot();
        let mut state = SlotState::default();
        let idle = canvas::Event::Mouse(mouse::Event::CursorEntered);

        let (_, first) = slot.update(&mut state, idle.clone(), bounds(), Cursor::Unavailable);
        assert!(matches!(first, Some(Message::SurfaceResized(Surface::Fullscreen, _))));

        let (_, second) = slot.update(&mut state, idle, bounds(), Cursor::Unavailable);
        assert!(second.is_none());
    }

    #[test]
    fn test_press_outside_is_ignored() {
        let slot = slot();
        let mut state = SlotState::default();
        slot.update(&mut state, press(7, 0.0, 0.0), bounds(), Cursor::Unavailable);
        assert!(state.fingers.is_empty());
    }
}
