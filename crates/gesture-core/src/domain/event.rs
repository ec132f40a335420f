//! Raw callback records and semantic gesture events.
//!
//! A *raw record* is an immutable snapshot of one OS hook callback
//! invocation.  A *gesture event* is what the classifiers derive from raw
//! records and hand to subscribers.  Gesture events carry a mutable
//! `handled` flag: any subscriber may set it, which instructs the hook
//! chain to stop propagating the underlying OS event to the rest of the
//! system.

/// A position in absolute screen coordinates (multi-monitor aware, may be
/// negative on secondary monitors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Modifier key flags active at the time a record was captured.
///
/// Left/right variants are collapsed: the whitelist and the classifiers
/// only care *whether* Ctrl is held, not which Ctrl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CTRL: u8 = 0b0000_0001;
    pub const SHIFT: u8 = 0b0000_0010;
    pub const ALT: u8 = 0b0000_0100;
    pub const META: u8 = 0b0000_1000;

    /// Returns `true` if no modifier key is held.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every flag in `mask` is set.
    pub fn contains(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    /// Returns a copy with the flags in `mask` added.
    pub fn with(self, mask: u8) -> Modifiers {
        Modifiers(self.0 | mask)
    }
}

/// Mouse button identifier carried by raw records and gesture events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    /// Bit position of this button inside a [`MouseButtons`] set.
    pub fn bit(self) -> u8 {
        match self {
            MouseButton::Left => 0b0000_0001,
            MouseButton::Right => 0b0000_0010,
            MouseButton::Middle => 0b0000_0100,
            MouseButton::X1 => 0b0000_1000,
            MouseButton::X2 => 0b0001_0000,
        }
    }
}

/// A set of mouse buttons, used to report *all* currently-held buttons on
/// an enriched Move event (e.g. "moved while left+right held").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MouseButtons(pub u8);

impl MouseButtons {
    pub const NONE: MouseButtons = MouseButtons(0);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, button: MouseButton) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn insert(&mut self, button: MouseButton) {
        self.0 |= button.bit();
    }

    pub fn remove(&mut self, button: MouseButton) {
        self.0 &= !button.bit();
    }

    /// Bitwise union of two sets.
    pub fn union(self, other: MouseButtons) -> MouseButtons {
        MouseButtons(self.0 | other.0)
    }

    /// Singleton set containing only `button`.
    pub fn only(button: MouseButton) -> MouseButtons {
        MouseButtons(button.bit())
    }
}

/// One keyboard hook callback invocation, as captured from the OS.
#[derive(Debug, Clone, Copy)]
pub struct RawKeyboardRecord {
    /// Platform virtual key code.
    pub vk_code: u8,
    /// Hardware scan code.
    pub scan_code: u16,
    /// Modifier keys held when the record was captured.
    pub modifiers: Modifiers,
    /// `true` for a key-release record, `false` for a key-press record.
    pub is_up: bool,
    /// Milliseconds since system start (from the hook struct).
    pub time_ms: u32,
    /// `true` if the event was injected by software rather than hardware.
    ///
    /// The classifiers treat injected records identically to hardware
    /// records; telling self-generated input apart is the suppression
    /// registry's job, not theirs.
    pub is_injected: bool,
}

/// One mouse hook callback invocation, as captured from the OS.
#[derive(Debug, Clone, Copy)]
pub struct RawMouseRecord {
    /// The button this record is about, if any (`None` for pure
    /// move/wheel records).
    pub button: Option<MouseButton>,
    /// OS-reported click count for a button-down record (1 = single,
    /// ≥ 2 = double).  0 on up/move/wheel records.
    pub click_count: u8,
    /// Signed wheel delta; 0 when this is not a wheel record.
    pub wheel_delta: i16,
    /// Cursor position in absolute screen coordinates.
    pub position: Point,
    /// Modifier keys held when the record was captured.
    pub modifiers: Modifiers,
    /// `true` for a button-release record.
    pub is_up: bool,
    /// Milliseconds since system start.
    pub time_ms: u32,
    /// `true` if the event was injected by software rather than hardware.
    pub is_injected: bool,
}

/// Phase of a semantic keyboard gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    Down,
    /// A resolved printable character.  Only Press events carry one.
    Press,
    Up,
}

/// Phase of a semantic mouse gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MousePhase {
    Down,
    Up,
    Click,
    DoubleClick,
    Move,
    Wheel,
    DragStart,
    DragFinish,
}

/// A semantic keyboard event delivered to subscribers.
#[derive(Debug, Clone)]
pub struct KeyGestureEvent {
    pub vk_code: u8,
    pub modifiers: Modifiers,
    pub phase: KeyPhase,
    /// Resolved character; present on [`KeyPhase::Press`] events only.
    pub character: Option<char>,
    /// Set by a subscriber to stop the OS from propagating the underlying
    /// event.  Read back by the classifier after each emission.
    pub handled: bool,
}

impl KeyGestureEvent {
    pub fn down(vk_code: u8, modifiers: Modifiers) -> Self {
        Self {
            vk_code,
            modifiers,
            phase: KeyPhase::Down,
            character: None,
            handled: false,
        }
    }

    pub fn press(vk_code: u8, modifiers: Modifiers, character: char) -> Self {
        Self {
            vk_code,
            modifiers,
            phase: KeyPhase::Press,
            character: Some(character),
            handled: false,
        }
    }

    pub fn up(vk_code: u8, modifiers: Modifiers) -> Self {
        Self {
            vk_code,
            modifiers,
            phase: KeyPhase::Up,
            character: None,
            handled: false,
        }
    }
}

/// A semantic mouse event delivered to subscribers.
#[derive(Debug, Clone)]
pub struct MouseGestureEvent {
    /// The button that triggered the event, if any.
    pub button: Option<MouseButton>,
    /// All buttons held at emission time.  On Move events this is the
    /// union of every currently-down button, not just `button`.
    pub buttons: MouseButtons,
    pub modifiers: Modifiers,
    pub phase: MousePhase,
    pub position: Point,
    /// Signed wheel delta; 0 except on Wheel events.
    pub wheel_delta: i16,
    /// Click count from the originating down record; 0 where not
    /// meaningful.
    pub click_count: u8,
    /// Set by a subscriber to stop OS propagation and skip the remaining
    /// classification stages for this record.
    pub handled: bool,
}

impl MouseGestureEvent {
    /// Builds an event for `phase` out of the fields of `record`.
    pub fn from_record(phase: MousePhase, record: &RawMouseRecord) -> Self {
        Self {
            button: record.button,
            buttons: record.button.map(MouseButtons::only).unwrap_or_default(),
            modifiers: record.modifiers,
            phase,
            position: record.position,
            wheel_delta: record.wheel_delta,
            click_count: record.click_count,
            handled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_contains_and_with() {
        let mods = Modifiers::NONE.with(Modifiers::CTRL).with(Modifiers::SHIFT);
        assert!(mods.contains(Modifiers::CTRL));
        assert!(mods.contains(Modifiers::CTRL | Modifiers::SHIFT));
        assert!(!mods.contains(Modifiers::ALT));
        assert!(!mods.is_empty());
        assert!(Modifiers::NONE.is_empty());
    }

    #[test]
    fn test_mouse_buttons_insert_remove_union() {
        // Arrange
        let mut set = MouseButtons::NONE;

        // Act
        set.insert(MouseButton::Left);
        set.insert(MouseButton::Right);
        set.remove(MouseButton::Left);

        // Assert
        assert!(!set.contains(MouseButton::Left));
        assert!(set.contains(MouseButton::Right));
        let union = set.union(MouseButtons::only(MouseButton::Middle));
        assert!(union.contains(MouseButton::Right));
        assert!(union.contains(MouseButton::Middle));
    }

    #[test]
    fn test_mouse_button_bits_are_disjoint() {
        let all = [
            MouseButton::Left,
            MouseButton::Right,
            MouseButton::Middle,
            MouseButton::X1,
            MouseButton::X2,
        ];
        let mut seen = 0u8;
        for b in all {
            assert_eq!(seen & b.bit(), 0, "bit for {b:?} overlaps another button");
            seen |= b.bit();
        }
    }
}
