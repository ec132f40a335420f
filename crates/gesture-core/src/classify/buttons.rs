//! Per-button click state machine.
//!
//! Each button is in exactly one of three states:
//!
//! ```text
//! Up          --down, clicks=1-->  SingleDown
//! Up          --down, clicks>=2--> DoubleDown
//! SingleDown  --up-->              Up    (a Click)
//! DoubleDown  --up-->              Up    (a DoubleClick, never a Click)
//! ```
//!
//! Transitions are driven strictly by the OS-reported click count on the
//! down record.  This layer never infers double-clicks from timing; the
//! hook layer upstream owns that (it is the OS's double-click window).

use crate::domain::event::{MouseButton, MouseButtons};

/// What a button release amounts to, given the state it left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// The button was not tracked as down; nothing to emit.
    None,
    /// Release out of the single-click-down state.
    Click,
    /// Release out of the double-click-down state.
    DoubleClick,
}

/// Tracks which buttons are currently down, and in which click state.
///
/// Invariant: a button is a member of at most one of the two sets at any
/// time (or of neither, when up).
#[derive(Debug, Default)]
pub struct ButtonTracker {
    single_down: MouseButtons,
    double_down: MouseButtons,
}

impl ButtonTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a button-down record.  Click counts above 2 get
    /// double-click semantics.
    pub fn press(&mut self, button: MouseButton, click_count: u8) {
        if click_count >= 2 {
            self.single_down.remove(button);
            self.double_down.insert(button);
        } else {
            self.double_down.remove(button);
            self.single_down.insert(button);
        }
    }

    /// Registers a button-up record and reports which kind of click the
    /// release completes.
    pub fn release(&mut self, button: MouseButton) -> ReleaseKind {
        if self.single_down.contains(button) {
            self.single_down.remove(button);
            ReleaseKind::Click
        } else if self.double_down.contains(button) {
            self.double_down.remove(button);
            ReleaseKind::DoubleClick
        } else {
            ReleaseKind::None
        }
    }

    /// `true` if `button` is down in the single-click state.
    pub fn is_single_down(&self, button: MouseButton) -> bool {
        self.single_down.contains(button)
    }

    /// Union of every currently-down button, regardless of click state.
    pub fn down_buttons(&self) -> MouseButtons {
        self.single_down.union(self.double_down)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_press_release_is_click() {
        // Arrange
        let mut tracker = ButtonTracker::new();

        // Act
        tracker.press(MouseButton::Left, 1);
        let kind = tracker.release(MouseButton::Left);

        // Assert
        assert_eq!(kind, ReleaseKind::Click);
        assert!(tracker.down_buttons().is_empty());
    }

    #[test]
    fn test_double_press_release_is_double_click_not_click() {
        let mut tracker = ButtonTracker::new();
        tracker.press(MouseButton::Left, 2);
        assert_eq!(tracker.release(MouseButton::Left), ReleaseKind::DoubleClick);
    }

    #[test]
    fn test_click_counts_above_two_are_double_clicks() {
        let mut tracker = ButtonTracker::new();
        tracker.press(MouseButton::Left, 3);
        assert_eq!(tracker.release(MouseButton::Left), ReleaseKind::DoubleClick);
    }

    #[test]
    fn test_release_without_press_is_none() {
        let mut tracker = ButtonTracker::new();
        assert_eq!(tracker.release(MouseButton::Right), ReleaseKind::None);
    }

    #[test]
    fn test_promotion_moves_button_between_sets() {
        // A second down with clicks=2 promotes the button out of the
        // single-down set; the button must never be in both.
        let mut tracker = ButtonTracker::new();
        tracker.press(MouseButton::Left, 1);
        assert!(tracker.is_single_down(MouseButton::Left));

        tracker.press(MouseButton::Left, 2);
        assert!(!tracker.is_single_down(MouseButton::Left));
        assert!(tracker.down_buttons().contains(MouseButton::Left));
    }

    #[test]
    fn test_down_buttons_reports_union_across_states() {
        let mut tracker = ButtonTracker::new();
        tracker.press(MouseButton::Left, 1);
        tracker.press(MouseButton::Right, 2);

        let down = tracker.down_buttons();
        assert!(down.contains(MouseButton::Left));
        assert!(down.contains(MouseButton::Right));
        assert!(!down.contains(MouseButton::Middle));
    }

    #[test]
    fn test_independent_buttons_do_not_interfere() {
        let mut tracker = ButtonTracker::new();
        tracker.press(MouseButton::Left, 1);
        tracker.press(MouseButton::Right, 1);

        assert_eq!(tracker.release(MouseButton::Right), ReleaseKind::Click);
        assert!(tracker.is_single_down(MouseButton::Left));
    }
}
