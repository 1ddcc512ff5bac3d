//! Note colouring and labelling.
//!
//! The look of each note strip is chosen by small strategy closures held in
//! [`KeyboardStyle`]. The defaults paint every octave as a hue wheel and
//! label the first note of each octave with its octave number.

use egui::Color32;

use super::Note;

/// Picks the fill colour of a note, given the octave size.
pub type NoteColourFn = Box<dyn Fn(Note, u32) -> Color32>;
/// Picks the label of a note, given the octave size.
pub type NoteLabelFn = Box<dyn Fn(Note, u32) -> Option<String>>;

/// Hue wheel stops. The last stop repeats the first so the wheel closes.
const HUE_STOPS: [Color32; 13] = [
    Color32::from_rgb(0xF0, 0x00, 0x00),
    Color32::from_rgb(0xFF, 0xAE, 0x00),
    Color32::from_rgb(0xFF, 0xE7, 0x00),
    Color32::from_rgb(0xBA, 0xFF, 0x00),
    Color32::from_rgb(0x00, 0xF0, 0x00),
    Color32::from_rgb(0x00, 0xDD, 0xB8),
    Color32::from_rgb(0x00, 0xDE, 0xFF),
    Color32::from_rgb(0x00, 0x9F, 0xFF),
    Color32::from_rgb(0x56, 0x00, 0xE9),
    Color32::from_rgb(0x9B, 0x00, 0xFF),
    Color32::from_rgb(0xE1, 0x00, 0xEB),
    Color32::from_rgb(0xFF, 0x00, 0xAD),
    Color32::from_rgb(0xF0, 0x00, 0x00),
];

/// Linear blend between two opaque colours.
pub fn lerp_colour(from: Color32, to: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color32::from_rgb(mix(from.r(), to.r()), mix(from.g(), to.g()), mix(from.b(), to.b()))
}

/// Paint a translucent colour over an opaque one.
pub fn overlay(base: Color32, over: Color32) -> Color32 {
    let [r, g, b, a] = over.to_srgba_unmultiplied();
    lerp_colour(base, Color32::from_rgb(r, g, b), a as f32 / 255.0)
}

/// Hue wheel colour: each octave sweeps the twelve hue bands once.
pub fn hue_wheel_colour(note: Note, octave_size: u32) -> Color32 {
    let octave_size = octave_size.max(1);
    let position = (note as u32 % octave_size) as f32 / octave_size as f32 * 12.0;
    let band = (position.floor() as usize).min(HUE_STOPS.len() - 2);
    lerp_colour(HUE_STOPS[band], HUE_STOPS[band + 1], position - band as f32)
}

/// Octave number on the first note of each octave.
pub fn octave_number_label(note: Note, octave_size: u32) -> Option<String> {
    let octave_size = octave_size.max(1);
    let note = note as u32;
    (note % octave_size == 0).then(|| (note / octave_size).to_string())
}

/// Colours and strategies used when painting the keyboard.
pub struct KeyboardStyle {
    pub note_colour: NoteColourFn,
    pub note_label: NoteLabelFn,
    /// Separator lines between notes.
    pub line_colour: Color32,
    pub text_colour: Color32,
    /// Painted over a hovered note.
    pub hover_overlay: Color32,
    /// Painted over a sounding note.
    pub down_overlay: Color32,
    pub scroll_button_background: Color32,
    pub scroll_button_arrow: Color32,
}

impl Default for KeyboardStyle {
    fn default() -> Self {
        Self {
            note_colour: Box::new(hue_wheel_colour),
            note_label: Box::new(octave_number_label),
            line_colour: Color32::from_rgba_unmultiplied(0, 0, 0, 0x55),
            text_colour: Color32::WHITE,
            hover_overlay: Color32::from_rgba_unmultiplied(0, 0, 0, 0x55),
            down_overlay: Color32::from_rgba_unmultiplied(0, 0, 0, 0x77),
            scroll_button_background: Color32::from_rgb(0xD3, 0xD3, 0xD3),
            scroll_button_arrow: Color32::from_rgb(0x27, 0x27, 0x27),
        }
    }
}

impl KeyboardStyle {
    /// Replace the colouring strategy.
    pub fn with_note_colour(mut self, colour: impl Fn(Note, u32) -> Color32 + 'static) -> Self {
        self.note_colour = Box::new(colour);
        self
    }

    /// Replace the labelling strategy.
    pub fn with_note_label(
        mut self,
        label: impl Fn(Note, u32) -> Option<String> + 'static,
    ) -> Self {
        self.note_label = Box::new(label);
        self
    }

    /// Fill colour of a note in its current state.
    pub fn fill_for(&self, note: Note, octave_size: u32, is_over: bool, is_down: bool) -> Color32 {
        let mut colour = (self.note_colour)(note, octave_size);
        if is_over {
            colour = overlay(colour, self.hover_overlay);
        }
        if is_down {
            colour = overlay(colour, self.down_overlay);
        }
        colour
    }
}

impl std::fmt::Debug for KeyboardStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardStyle")
            .field("line_colour", &self.line_colour)
            .field("text_colour", &self.text_colour)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hue_wheel_starts_each_octave_red() {
        for octave_size in [5, 12, 19] {
            assert_eq!(hue_wheel_colour(0, octave_size), HUE_STOPS[0]);
            assert_eq!(hue_wheel_colour(octave_size as Note, octave_size), HUE_STOPS[0]);
        }
    }

    #[test]
    fn test_hue_wheel_hits_stops_in_twelve_tone() {
        for note in 0..12u8 {
            assert_eq!(hue_wheel_colour(60 + note, 12), HUE_STOPS[note as usize]);
        }
    }

    #[test]
    fn test_hue_wheel_interpolates_between_stops() {
        // 24-tone: odd notes sit halfway between two stops.
        let mid = hue_wheel_colour(1, 24);
        assert_eq!(mid, lerp_colour(HUE_STOPS[0], HUE_STOPS[1], 0.5));
        assert_ne!(mid, HUE_STOPS[0]);
        assert_ne!(mid, HUE_STOPS[1]);
    }

    #[test]
    fn test_octave_labels() {
        assert_eq!(octave_number_label(0, 12).as_deref(), Some("0"));
        assert_eq!(octave_number_label(60, 12).as_deref(), Some("5"));
        assert_eq!(octave_number_label(61, 12), None);
        assert_eq!(octave_number_label(38, 19).as_deref(), Some("2"));
    }

    #[test]
    fn test_overlay_darkens() {
        let white = Color32::WHITE;
        let over = overlay(white, Color32::from_rgba_unmultiplied(0, 0, 0, 0x77));
        assert!(over.r() < 255);
        assert_eq!(over.r(), over.g());
        assert_eq!(overlay(white, Color32::TRANSPARENT), white);
    }

    #[test]
    fn test_fill_for_states() {
        let style = KeyboardStyle::default();
        let idle = style.fill_for(60, 12, false, false);
        let over = style.fill_for(60, 12, true, false);
        let down = style.fill_for(60, 12, false, true);
        let both = style.fill_for(60, 12, true, true);
        assert_eq!(idle, hue_wheel_colour(60, 12));
        assert!(over.r() < idle.r());
        assert!(down.r() < over.r());
        assert!(both.r() < down.r());
    }

    #[test]
    fn test_custom_strategies() {
        let style = KeyboardStyle::default()
            .with_note_colour(|_, _| Color32::BLUE)
            .with_note_label(|note, _| Some(format!("n{note}")));
        assert_eq!((style.note_colour)(3, 12), Color32::BLUE);
        assert_eq!((style.note_label)(3, 12).as_deref(), Some("n3"));
    }
}
