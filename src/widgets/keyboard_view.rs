//! egui host for the chromatic keyboard.
//!
//! Allocates space for a [`ChromaKeyboard`], turns this frame's egui input
//! into [`InputEvent`]s, runs the periodic state poll and paints through an
//! egui [`Painter`].

use std::time::Duration;

use eframe::egui::{
    Align2, Color32, Event, EventFilter, FontId, Id, Key, MouseWheelUnit, Painter, Pos2,
    PointerButton, Rect, Response, Sense, Shape, Stroke, TouchPhase, Ui, Vec2,
};

use crate::keyboard::{
    paint_keyboard, ChromaKeyboard, InputEvent, Keycode, PointerId, RenderTarget, TextAnchor,
    POLL_HZ,
};

/// Host wheel units per egui point of scrolling.
const WHEEL_UNITS_PER_POINT: f32 = 1.0 / 400.0;
/// Host wheel units per wheel notch.
const WHEEL_UNITS_PER_LINE: f32 = 1.0 / 8.0;

/// Per-widget pointer state kept in egui memory between frames.
#[derive(Clone, Copy, Debug, Default)]
struct ViewState {
    mouse_inside: bool,
    mouse_pressed: bool,
    last_poll: f64,
}

/// [`RenderTarget`] drawing into an egui painter, offset to the widget.
pub struct EguiPainterTarget<'a> {
    painter: &'a Painter,
    origin: Vec2,
}

impl<'a> EguiPainterTarget<'a> {
    pub fn new(painter: &'a Painter, origin: Pos2) -> Self {
        Self {
            painter,
            origin: origin.to_vec2(),
        }
    }
}

impl RenderTarget for EguiPainterTarget<'_> {
    fn fill_rect(&mut self, rect: Rect, colour: Color32) {
        self.painter.rect_filled(rect.translate(self.origin), 0.0, colour);
    }

    fn draw_text(
        &mut self,
        rect: Rect,
        text: &str,
        anchor: TextAnchor,
        font_height: f32,
        colour: Color32,
    ) {
        let rect = rect.translate(self.origin);
        let (pos, align) = match anchor {
            TextAnchor::TopLeft => (rect.left_top(), Align2::LEFT_TOP),
            TextAnchor::TopRight => (rect.right_top(), Align2::RIGHT_TOP),
            TextAnchor::BottomLeft => (rect.left_bottom(), Align2::LEFT_BOTTOM),
        };
        self.painter
            .text(pos, align, text, FontId::proportional(font_height), colour);
    }

    fn fill_path(&mut self, points: &[Pos2], colour: Color32) {
        let points = points.iter().map(|p| *p + self.origin).collect();
        self.painter
            .add(Shape::convex_polygon(points, colour, Stroke::NONE));
    }
}

/// Map an egui key to the keyboard's keycode.
pub fn keycode_for(key: Key) -> Keycode {
    match key {
        Key::Escape => Keycode::Escape,
        Key::ArrowUp => Keycode::Up,
        Key::ArrowDown => Keycode::Down,
        Key::PageUp => Keycode::PageUp,
        Key::PageDown => Keycode::PageDown,

        // Bottom row
        Key::Z => Keycode::Char('z'),
        Key::X => Keycode::Char('x'),
        Key::C => Keycode::Char('c'),
        Key::V => Keycode::Char('v'),
        Key::B => Keycode::Char('b'),
        Key::N => Keycode::Char('n'),
        Key::M => Keycode::Char('m'),
        Key::Comma => Keycode::Char(','),
        Key::Period => Keycode::Char('.'),
        Key::Slash => Keycode::Char('/'),

        // Home row
        Key::A => Keycode::Char('a'),
        Key::S => Keycode::Char('s'),
        Key::D => Keycode::Char('d'),
        Key::F => Keycode::Char('f'),
        Key::G => Keycode::Char('g'),
        Key::H => Keycode::Char('h'),
        Key::J => Keycode::Char('j'),
        Key::K => Keycode::Char('k'),
        Key::L => Keycode::Char('l'),
        Key::Semicolon => Keycode::Char(';'),

        // Top row
        Key::Q => Keycode::Char('q'),
        Key::W => Keycode::Char('w'),
        Key::E => Keycode::Char('e'),
        Key::R => Keycode::Char('r'),
        Key::T => Keycode::Char('t'),
        Key::Y => Keycode::Char('y'),
        Key::U => Keycode::Char('u'),
        Key::I => Keycode::Char('i'),
        Key::O => Keycode::Char('o'),
        Key::P => Keycode::Char('p'),

        // Number row
        Key::Num1 => Keycode::Char('1'),
        Key::Num2 => Keycode::Char('2'),
        Key::Num3 => Keycode::Char('3'),
        Key::Num4 => Keycode::Char('4'),
        Key::Num5 => Keycode::Char('5'),
        Key::Num6 => Keycode::Char('6'),
        Key::Num7 => Keycode::Char('7'),
        Key::Num8 => Keycode::Char('8'),
        Key::Num9 => Keycode::Char('9'),
        Key::Num0 => Keycode::Char('0'),

        other => Keycode::Other(other as u32),
    }
}

/// Convert an egui wheel delta to host wheel units.
fn wheel_units(unit: MouseWheelUnit, delta: Vec2) -> Vec2 {
    match unit {
        MouseWheelUnit::Point => delta * WHEEL_UNITS_PER_POINT,
        MouseWheelUnit::Line => delta * WHEEL_UNITS_PER_LINE,
        MouseWheelUnit::Page => delta,
    }
}

/// Translate one egui event. Positions become local to `rect`.
fn translate_event(
    event: &Event,
    rect: Rect,
    state: &mut ViewState,
    has_focus: bool,
    hovered: bool,
) -> Option<InputEvent> {
    let local = |pos: Pos2| (pos - rect.min).to_pos2();
    match event {
        Event::PointerMoved(pos) => {
            let inside = rect.contains(*pos);
            let was_inside = std::mem::replace(&mut state.mouse_inside, inside);
            let id = PointerId::Mouse;
            let pos = local(*pos);
            // A pressed mouse keeps gliding even outside the widget.
            if state.mouse_pressed || (was_inside && inside) {
                Some(InputEvent::PointerMove { id, pos })
            } else if inside {
                Some(InputEvent::PointerEnter { id, pos })
            } else if was_inside {
                Some(InputEvent::PointerExit { id })
            } else {
                None
            }
        }
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed,
            ..
        } => {
            let id = PointerId::Mouse;
            if *pressed && rect.contains(*pos) {
                state.mouse_pressed = true;
                Some(InputEvent::PointerDown { id, pos: local(*pos) })
            } else if !*pressed && state.mouse_pressed {
                state.mouse_pressed = false;
                Some(InputEvent::PointerUp { id, pos: local(*pos) })
            } else {
                None
            }
        }
        Event::PointerGone => {
            state.mouse_pressed = false;
            std::mem::take(&mut state.mouse_inside).then_some(InputEvent::PointerExit {
                id: PointerId::Mouse,
            })
        }
        Event::Touch { id, phase, pos, .. } => {
            let id = PointerId::Touch(id.0);
            let inside = rect.contains(*pos);
            let pos = local(*pos);
            match phase {
                TouchPhase::Start if inside => Some(InputEvent::PointerDown { id, pos }),
                TouchPhase::Start => None,
                TouchPhase::Move => Some(InputEvent::PointerMove { id, pos }),
                TouchPhase::End => Some(InputEvent::PointerUp { id, pos }),
                TouchPhase::Cancel => Some(InputEvent::PointerExit { id }),
            }
        }
        Event::MouseWheel { unit, delta, .. } if hovered => Some(InputEvent::Wheel {
            delta: wheel_units(*unit, *delta),
        }),
        Event::Key { key, pressed, .. } if has_focus => {
            let keycode = keycode_for(*key);
            Some(if *pressed {
                InputEvent::KeyDown(keycode)
            } else {
                InputEvent::KeyUp(keycode)
            })
        }
        _ => None,
    }
}

/// Show a chromatic keyboard filling `size`.
///
/// # Example
/// ```ignore
/// let state = Arc::new(KeyboardState::new());
/// let mut keyboard = ChromaKeyboard::new(state, Orientation::Horizontal);
/// chroma_keyboard(ui, &mut keyboard, Vec2::new(ui.available_width(), 120.0));
/// ```
pub fn chroma_keyboard(ui: &mut Ui, keyboard: &mut ChromaKeyboard, size: Vec2) -> Response {
    let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
    let id: Id = response.id;
    keyboard.set_size(rect.size());

    if response.is_pointer_button_down_on() && !response.has_focus() {
        response.request_focus();
    }
    if response.has_focus() {
        // Arrow keys and Escape belong to the keyboard while it has focus.
        ui.memory_mut(|m| {
            m.set_focus_lock_filter(
                id,
                EventFilter {
                    tab: false,
                    horizontal_arrows: true,
                    vertical_arrows: true,
                    escape: true,
                },
            )
        });
    }
    if response.gained_focus() {
        keyboard.handle_event(InputEvent::FocusGained);
    }
    if response.lost_focus() {
        keyboard.handle_event(InputEvent::FocusLost);
    }

    let mut state: ViewState = ui.data(|d| d.get_temp(id)).unwrap_or_default();
    let has_focus = response.has_focus();
    let hovered = response.hovered();
    let (events, now) = ui.input(|i| (i.events.clone(), i.time));
    for event in &events {
        if let Some(input) = translate_event(event, rect, &mut state, has_focus, hovered) {
            keyboard.handle_event(input);
        }
    }

    let poll_interval = 1.0 / POLL_HZ as f64;
    if now - state.last_poll >= poll_interval {
        state.last_poll = now;
        let changed = keyboard.poll();
        if !changed.is_empty() {
            log::trace!("{} notes changed state", changed.len());
        }
    }
    ui.data_mut(|d| d.insert_temp(id, state));

    if !keyboard.take_repaint().is_empty() {
        ui.ctx().request_repaint();
    }
    ui.ctx()
        .request_repaint_after(Duration::from_secs_f64(poll_interval));

    if ui.is_rect_visible(rect) {
        let painter = ui.painter_at(rect);
        let mut target = EguiPainterTarget::new(&painter, rect.min);
        paint_keyboard(keyboard, &mut target);
        if response.has_focus() {
            painter.rect_stroke(rect, 0.0, ui.visuals().selection.stroke);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::layout::KEY_GRID;

    fn rect() -> Rect {
        Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(400.0, 80.0))
    }

    #[test]
    fn test_keycode_for_grid_keys() {
        let keys = [
            Key::Z, Key::X, Key::C, Key::V, Key::B, Key::N, Key::M, Key::Comma, Key::Period,
            Key::Slash, Key::A, Key::S, Key::D, Key::F, Key::G, Key::H, Key::J, Key::K, Key::L,
            Key::Semicolon, Key::Q, Key::W, Key::E, Key::R, Key::T, Key::Y, Key::U, Key::I,
            Key::O, Key::P, Key::Num1, Key::Num2, Key::Num3, Key::Num4, Key::Num5, Key::Num6,
            Key::Num7, Key::Num8, Key::Num9, Key::Num0,
        ];
        for (key, c) in keys.into_iter().zip(KEY_GRID.chars()) {
            assert_eq!(keycode_for(key), Keycode::Char(c));
        }
    }

    #[test]
    fn test_keycode_for_commands() {
        assert_eq!(keycode_for(Key::Escape), Keycode::Escape);
        assert_eq!(keycode_for(Key::ArrowUp), Keycode::Up);
        assert_eq!(keycode_for(Key::PageDown), Keycode::PageDown);
        assert!(matches!(keycode_for(Key::Enter), Keycode::Other(_)));
    }

    #[test]
    fn test_wheel_units() {
        let notch = wheel_units(MouseWheelUnit::Line, Vec2::new(0.0, 1.0));
        assert_eq!(notch, Vec2::new(0.0, 0.125));
        let points = wheel_units(MouseWheelUnit::Point, Vec2::new(0.0, 400.0));
        assert_eq!(points, Vec2::new(0.0, 1.0));
    }

    fn pointer_moved(state: &mut ViewState, x: f32, y: f32) -> Option<InputEvent> {
        translate_event(
            &Event::PointerMoved(Pos2::new(x, y)),
            rect(),
            state,
            false,
            false,
        )
    }

    #[test]
    fn test_pointer_enter_move_exit() {
        let mut state = ViewState::default();
        let enter = pointer_moved(&mut state, 110.0, 60.0);
        assert_eq!(
            enter,
            Some(InputEvent::PointerEnter {
                id: PointerId::Mouse,
                pos: Pos2::new(10.0, 10.0)
            })
        );
        let moved = pointer_moved(&mut state, 120.0, 60.0);
        assert!(matches!(moved, Some(InputEvent::PointerMove { .. })));
        let exit = pointer_moved(&mut state, 0.0, 0.0);
        assert_eq!(exit, Some(InputEvent::PointerExit { id: PointerId::Mouse }));
        let outside = pointer_moved(&mut state, 1.0, 0.0);
        assert_eq!(outside, None);
    }

    #[test]
    fn test_drag_outside_keeps_moving() {
        let mut state = ViewState::default();
        let down = Event::PointerButton {
            pos: Pos2::new(110.0, 60.0),
            button: PointerButton::Primary,
            pressed: true,
            modifiers: Default::default(),
        };
        assert!(matches!(
            translate_event(&down, rect(), &mut state, false, false),
            Some(InputEvent::PointerDown { .. })
        ));
        let dragged = pointer_moved(&mut state, 0.0, 0.0);
        assert!(matches!(dragged, Some(InputEvent::PointerMove { .. })));

        let up = Event::PointerButton {
            pos: Pos2::new(0.0, 0.0),
            button: PointerButton::Primary,
            pressed: false,
            modifiers: Default::default(),
        };
        assert!(matches!(
            translate_event(&up, rect(), &mut state, false, false),
            Some(InputEvent::PointerUp { .. })
        ));
    }

    #[test]
    fn test_keys_need_focus() {
        let mut state = ViewState::default();
        let key = Event::Key {
            key: Key::Z,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: Default::default(),
        };
        assert_eq!(translate_event(&key, rect(), &mut state, false, false), None);
        assert_eq!(
            translate_event(&key, rect(), &mut state, true, false),
            Some(InputEvent::KeyDown(Keycode::Char('z')))
        );
    }
}
