//! Normalized gesture keys for whitelist lookup.
//!
//! A [`NormalizedGesture`] identifies a keyboard or mouse gesture
//! independently of the transient distinctions the whitelist must ignore
//! (position, timestamps, click counts).  Modifier sensitivity is *not*
//! baked into the key: a caller chooses at registration time whether the
//! entry matches with exact modifiers or regardless of them
//! ([`MatchMode`]).

use super::event::{Modifiers, MouseButton, RawKeyboardRecord, RawMouseRecord};

/// Direction of a wheel gesture, derived from the sign of the raw delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// The input half of a gesture key: which key, button, or wheel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureInput {
    /// A keyboard key, by virtual key code.
    Key(u8),
    /// A mouse button.
    Button(MouseButton),
    /// A wheel scroll in one direction.
    Wheel(ScrollDirection),
}

/// How a whitelist entry compares against incoming gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// The gesture matches only with exactly the registered modifiers.
    Exact,
    /// The gesture matches regardless of held modifiers (e.g. "any
    /// wheel-up, Ctrl/Shift or not").
    IgnoreModifiers,
}

/// A hashable key representing one keyboard or mouse gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizedGesture {
    pub input: GestureInput,
    pub modifiers: Modifiers,
}

impl NormalizedGesture {
    pub fn key(vk_code: u8, modifiers: Modifiers) -> Self {
        Self {
            input: GestureInput::Key(vk_code),
            modifiers,
        }
    }

    pub fn button(button: MouseButton, modifiers: Modifiers) -> Self {
        Self {
            input: GestureInput::Button(button),
            modifiers,
        }
    }

    pub fn wheel(direction: ScrollDirection, modifiers: Modifiers) -> Self {
        Self {
            input: GestureInput::Wheel(direction),
            modifiers,
        }
    }

    /// Normalizes a raw keyboard record.
    pub fn from_keyboard(record: &RawKeyboardRecord) -> Self {
        Self::key(record.vk_code, record.modifiers)
    }

    /// Normalizes a raw mouse record.  Returns `None` for pure move
    /// records, which are never whitelist candidates.
    pub fn from_mouse(record: &RawMouseRecord) -> Option<Self> {
        if let Some(button) = record.button {
            return Some(Self::button(button, record.modifiers));
        }
        if record.wheel_delta != 0 {
            let direction = if record.wheel_delta > 0 {
                ScrollDirection::Up
            } else {
                ScrollDirection::Down
            };
            return Some(Self::wheel(direction, record.modifiers));
        }
        None
    }

    /// The modifier-insensitive form of this gesture.
    pub fn strip_modifiers(&self) -> Self {
        Self {
            input: self.input,
            modifiers: Modifiers::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::Point;

    fn mouse_record(
        button: Option<MouseButton>,
        wheel_delta: i16,
        modifiers: Modifiers,
    ) -> RawMouseRecord {
        RawMouseRecord {
            button,
            click_count: 0,
            wheel_delta,
            position: Point::new(0, 0),
            modifiers,
            is_up: false,
            time_ms: 0,
            is_injected: false,
        }
    }

    #[test]
    fn test_from_mouse_prefers_button_over_wheel() {
        let record = mouse_record(Some(MouseButton::Left), 120, Modifiers::NONE);
        let gesture = NormalizedGesture::from_mouse(&record).expect("gesture");
        assert_eq!(gesture.input, GestureInput::Button(MouseButton::Left));
    }

    #[test]
    fn test_from_mouse_wheel_direction_follows_delta_sign() {
        let up = mouse_record(None, 120, Modifiers::NONE);
        let down = mouse_record(None, -120, Modifiers::NONE);
        assert_eq!(
            NormalizedGesture::from_mouse(&up).unwrap().input,
            GestureInput::Wheel(ScrollDirection::Up)
        );
        assert_eq!(
            NormalizedGesture::from_mouse(&down).unwrap().input,
            GestureInput::Wheel(ScrollDirection::Down)
        );
    }

    #[test]
    fn test_from_mouse_pure_move_is_not_a_gesture() {
        let record = mouse_record(None, 0, Modifiers::NONE);
        assert!(NormalizedGesture::from_mouse(&record).is_none());
    }

    #[test]
    fn test_strip_modifiers_keeps_input() {
        let gesture = NormalizedGesture::key(0x43, Modifiers(Modifiers::CTRL));
        let stripped = gesture.strip_modifiers();
        assert_eq!(stripped.input, GestureInput::Key(0x43));
        assert!(stripped.modifiers.is_empty());
        assert_ne!(gesture, stripped);
    }
}
