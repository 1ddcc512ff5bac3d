//! Painting.
//!
//! The keyboard describes itself as rectangles, text and filled paths on a
//! [`RenderTarget`]. Hosts implement the target over whatever drawing API
//! they have.

use std::f32::consts::TAU;

use egui::{Color32, Pos2, Rect, Vec2};

use super::component::ChromaKeyboard;
use super::geometry::{Orientation, ScrollDirection};

/// Corner of a rectangle a label is pinned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
}

/// Drawing primitives the keyboard paints with, in local coordinates.
pub trait RenderTarget {
    fn fill_rect(&mut self, rect: Rect, colour: Color32);

    fn draw_text(
        &mut self,
        rect: Rect,
        text: &str,
        anchor: TextAnchor,
        font_height: f32,
        colour: Color32,
    );

    /// Fill a closed convex polygon.
    fn fill_path(&mut self, points: &[Pos2], colour: Color32);
}

/// Largest label font, in pixels.
const MAX_FONT_HEIGHT: f32 = 12.0;

/// Paint the whole keyboard.
pub fn paint_keyboard(keyboard: &ChromaKeyboard, target: &mut dyn RenderTarget) {
    let geometry = keyboard.geometry();
    let style = keyboard.style();
    let orientation = geometry.orientation();
    let octave_size = geometry.octave_size();
    let bounds = Rect::from_min_size(Pos2::ZERO, geometry.size());
    let range = geometry.range();
    let font_height = MAX_FONT_HEIGHT.min(geometry.key_width() * 0.9);

    for note in range.notes() {
        let rect = geometry.rect_for_note(note);
        if !rect.intersects(bounds) {
            continue;
        }

        let fill = style.fill_for(
            note,
            octave_size,
            keyboard.is_note_hovered(note),
            keyboard.is_note_on(note),
        );
        target.fill_rect(rect, fill);

        if let Some(text) = (style.note_label)(note, octave_size) {
            let (area, anchor) = match orientation {
                Orientation::Horizontal => (
                    Rect::from_min_max(
                        rect.min + Vec2::new(1.0, 0.0),
                        rect.max - Vec2::new(0.0, 2.0),
                    ),
                    TextAnchor::TopLeft,
                ),
                Orientation::VerticalFacingLeft => (rect.shrink(2.0), TextAnchor::TopRight),
                Orientation::VerticalFacingRight => (rect.shrink(2.0), TextAnchor::BottomLeft),
            };
            target.draw_text(area, &text, anchor, font_height, style.text_colour);
        }

        // Separator at the low edge of every note, closing line past the last.
        let (leading, closing) = match orientation {
            Orientation::Horizontal => (
                Rect::from_min_max(rect.min, Pos2::new(rect.min.x + 1.0, rect.max.y)),
                Rect::from_min_max(
                    Pos2::new(rect.max.x, rect.min.y),
                    rect.max + Vec2::new(1.0, 0.0),
                ),
            ),
            Orientation::VerticalFacingLeft => (
                Rect::from_min_max(rect.min, Pos2::new(rect.max.x, rect.min.y + 1.0)),
                Rect::from_min_max(
                    Pos2::new(rect.min.x, rect.max.y),
                    rect.max + Vec2::new(0.0, 1.0),
                ),
            ),
            Orientation::VerticalFacingRight => (
                Rect::from_min_max(Pos2::new(rect.min.x, rect.max.y - 1.0), rect.max),
                Rect::from_min_max(
                    rect.min - Vec2::new(0.0, 1.0),
                    Pos2::new(rect.max.x, rect.min.y),
                ),
            ),
        };
        target.fill_rect(leading, style.line_colour);
        if note == range.end {
            target.fill_rect(closing, style.line_colour);
        }
    }

    // Line along the key tips, as far as the keys reach.
    let start = geometry.visible_interval(range.start).start.max(0.0);
    let end = geometry.visible_interval(range.end).end.min(geometry.axis_length());
    if end > start {
        let size = geometry.size();
        let base_line = match orientation {
            Orientation::Horizontal => {
                Rect::from_min_max(Pos2::new(start, size.y - 1.0), Pos2::new(end, size.y))
            }
            Orientation::VerticalFacingLeft => {
                Rect::from_min_max(Pos2::new(0.0, start), Pos2::new(1.0, end))
            }
            Orientation::VerticalFacingRight => Rect::from_min_max(
                Pos2::new(size.x - 1.0, size.y - end),
                Pos2::new(size.x, size.y - start),
            ),
        };
        target.fill_rect(base_line, style.line_colour);
    }

    let buttons = geometry.scroll_buttons();
    for (direction, rect) in [
        (ScrollDirection::Down, buttons.down),
        (ScrollDirection::Up, buttons.up),
    ] {
        let Some(rect) = rect else {
            continue;
        };
        let (is_over, is_down) = keyboard.scroll_button_state(direction);
        target.fill_rect(rect, style.scroll_button_background);

        let alpha = if is_down {
            1.0
        } else if is_over {
            0.6
        } else {
            0.4
        };
        let arrow = scroll_arrow(rect, arrow_turns(orientation, direction));
        target.fill_path(&arrow, style.scroll_button_arrow.gamma_multiply(alpha));
    }
}

/// Rotation of a right-pointing arrow, in whole turns, for a button.
fn arrow_turns(orientation: Orientation, direction: ScrollDirection) -> f32 {
    let up = direction == ScrollDirection::Up;
    match orientation {
        Orientation::Horizontal => {
            if up {
                0.0
            } else {
                0.5
            }
        }
        Orientation::VerticalFacingLeft => {
            if up {
                0.25
            } else {
                0.75
            }
        }
        Orientation::VerticalFacingRight => {
            if up {
                0.75
            } else {
                0.25
            }
        }
    }
}

/// Triangle filling the largest square inside `rect` less a 1px margin.
fn scroll_arrow(rect: Rect, turns: f32) -> [Pos2; 3] {
    let (sin, cos) = (TAU * turns).sin_cos();
    let centre = Pos2::new(0.5, 0.5);
    let side = (rect.width() - 2.0).min(rect.height() - 2.0).max(0.0);
    let origin = rect.center() - Vec2::splat(side / 2.0);

    [Pos2::new(0.0, 0.0), Pos2::new(0.0, 1.0), Pos2::new(1.0, 0.5)].map(|p| {
        let d = p - centre;
        let rotated = centre + Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos);
        origin + rotated.to_vec2() * side
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::RecordingSink;
    use crate::engine::NoteStateSink;
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum Draw {
        Rect(Rect, Color32),
        Text(Rect, String, TextAnchor),
        Path(Vec<Pos2>, Color32),
    }

    #[derive(Default)]
    struct RecordingTarget {
        draws: Vec<Draw>,
    }

    impl RenderTarget for RecordingTarget {
        fn fill_rect(&mut self, rect: Rect, colour: Color32) {
            self.draws.push(Draw::Rect(rect, colour));
        }

        fn draw_text(
            &mut self,
            rect: Rect,
            text: &str,
            anchor: TextAnchor,
            _font_height: f32,
            _colour: Color32,
        ) {
            self.draws.push(Draw::Text(rect, text.to_string(), anchor));
        }

        fn fill_path(&mut self, points: &[Pos2], colour: Color32) {
            self.draws.push(Draw::Path(points.to_vec(), colour));
        }
    }

    fn painted(keyboard: &ChromaKeyboard) -> Vec<Draw> {
        let mut target = RecordingTarget::default();
        paint_keyboard(keyboard, &mut target);
        target.draws
    }

    fn keyboard(orientation: Orientation, size: Vec2) -> (ChromaKeyboard, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let mut keyboard = ChromaKeyboard::new(sink.clone(), orientation);
        keyboard.set_size(size);
        (keyboard, sink)
    }

    #[test]
    fn test_sounding_note_is_darker() {
        let (keyboard, sink) = keyboard(Orientation::Horizontal, Vec2::new(800.0, 100.0));
        let rect = keyboard.geometry().rect_for_note(50);
        let fill_of = |draws: &[Draw]| {
            draws.iter().find_map(|d| match d {
                Draw::Rect(r, c) if *r == rect => Some(*c),
                _ => None,
            })
        };

        let idle = fill_of(&painted(&keyboard)).unwrap();
        sink.note_on(1, 50, 1.0);
        let down = fill_of(&painted(&keyboard)).unwrap();
        assert_eq!(down, keyboard.style().fill_for(50, 12, false, true));
        assert_ne!(idle, down);
    }

    #[test]
    fn test_labels_on_octave_starts() {
        let (keyboard, _) = keyboard(Orientation::Horizontal, Vec2::new(800.0, 100.0));
        let labels: Vec<String> = painted(&keyboard)
            .into_iter()
            .filter_map(|d| match d {
                Draw::Text(_, text, TextAnchor::TopLeft) => Some(text),
                _ => None,
            })
            .collect();
        // Notes 48..=97 are visible: octaves 4 to 8 start on screen.
        assert_eq!(labels, vec!["4", "5", "6", "7", "8"]);
    }

    #[test]
    fn test_label_anchor_follows_orientation() {
        for (orientation, anchor) in [
            (Orientation::VerticalFacingLeft, TextAnchor::TopRight),
            (Orientation::VerticalFacingRight, TextAnchor::BottomLeft),
        ] {
            let (keyboard, _) = keyboard(orientation, Vec2::new(100.0, 800.0));
            assert!(painted(&keyboard)
                .iter()
                .any(|d| matches!(d, Draw::Text(_, _, a) if *a == anchor)));
        }
    }

    #[test]
    fn test_offscreen_notes_are_skipped() {
        let (keyboard, _) = keyboard(Orientation::Horizontal, Vec2::new(800.0, 100.0));
        let below = keyboard.geometry().rect_for_note(10);
        assert!(!painted(&keyboard)
            .iter()
            .any(|d| matches!(d, Draw::Rect(r, _) if *r == below)));
    }

    #[test]
    fn test_closing_line_after_last_note() {
        let (mut keyboard, _) = keyboard(Orientation::Horizontal, Vec2::new(800.0, 100.0));
        keyboard.set_range(60, 71);
        let last = keyboard.geometry().rect_for_note(71);
        let closing = Rect::from_min_max(
            Pos2::new(last.max.x, 0.0),
            Pos2::new(last.max.x + 1.0, 100.0),
        );
        let draws = painted(&keyboard);
        assert!(draws.iter().any(|d| matches!(d, Draw::Rect(r, _) if *r == closing)));

        let base_line = Rect::from_min_max(Pos2::new(0.0, 99.0), Pos2::new(12.0 * 16.0, 100.0));
        assert!(draws.iter().any(|d| matches!(d, Draw::Rect(r, _) if *r == base_line)));
    }

    #[test]
    fn test_scroll_buttons_paint_arrows() {
        let (mut keyboard, _) = keyboard(Orientation::Horizontal, Vec2::new(400.0, 80.0));
        keyboard.set_lowest_visible_note(60);
        let paths: Vec<Vec<Pos2>> = painted(&keyboard)
            .into_iter()
            .filter_map(|d| match d {
                Draw::Path(points, _) => Some(points),
                _ => None,
            })
            .collect();
        assert_eq!(paths.len(), 2);

        // Down arrow points left, up arrow points right.
        let tip_x = |points: &[Pos2]| points[2].x;
        let base_x = |points: &[Pos2]| points[0].x;
        assert!(tip_x(&paths[0]) < base_x(&paths[0]));
        assert!(tip_x(&paths[1]) > base_x(&paths[1]));
    }

    #[test]
    fn test_no_buttons_when_scrolling_disabled() {
        let (mut keyboard, _) = keyboard(Orientation::Horizontal, Vec2::new(400.0, 80.0));
        keyboard.set_scroll_buttons_visible(false);
        assert!(!painted(&keyboard)
            .iter()
            .any(|d| matches!(d, Draw::Path(..))));
    }

    #[test]
    fn test_arrow_rotation() {
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(12.0, 12.0));
        let right = scroll_arrow(rect, 0.0);
        assert_eq!(right[2], Pos2::new(11.0, 6.0));
        let down = scroll_arrow(rect, 0.25);
        assert!((down[2].x - 6.0).abs() < 1e-4);
        assert!((down[2].y - 11.0).abs() < 1e-4);
    }
}
