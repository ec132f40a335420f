//! Mouse gesture classifier.
//!
//! Turns raw button/position records into Down, Up, Click, DoubleClick,
//! Move, Wheel, DragStart and DragFinish gestures.  Double-click
//! semantics come from the OS-reported click count on the down record;
//! drags are derived from positional deltas against the OS drag
//! thresholds.
//!
//! # Stage order
//!
//! Every record runs through a fixed pipeline — Down, Up, Wheel, Move,
//! Drag — and later stages read state mutated by earlier ones, so the
//! order is load-bearing.  Each stage re-checks `handled` before it runs:
//! once a subscriber sets the flag, OS propagation stops and the
//! remaining stages are skipped for this record.  State already mutated
//! by earlier stages is not rolled back.

use crate::classify::buttons::{ButtonTracker, ReleaseKind};
use crate::classify::{MouseEventSink, Propagation};
use crate::domain::event::{
    MouseButton, MouseGestureEvent, MousePhase, Point, RawMouseRecord,
};

/// OS-defined minimum pixel displacement before a button-held movement
/// counts as a drag.  Read once from the platform at startup and treated
/// as constant for the classifier's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragThresholds {
    pub horizontal: i32,
    pub vertical: i32,
}

impl Default for DragThresholds {
    /// The Windows default (SM_CXDRAG / SM_CYDRAG) on a standard DPI.
    fn default() -> Self {
        Self {
            horizontal: 4,
            vertical: 4,
        }
    }
}

/// Drag candidacy keyed on the left button.
///
/// `start` is set exactly while the left button sits in the
/// single-click-down state; `dragging` flips once displacement from
/// `start` exceeds a threshold and resets the instant the left button
/// leaves that state.
#[derive(Debug, Default)]
struct DragState {
    start: Option<Point>,
    dragging: bool,
}

/// Classifies raw mouse records into semantic gestures.
///
/// Exclusively owned by the OS callback thread of one hook; the OS
/// serializes callbacks per hook chain, so no locking here.
pub struct MouseEventClassifier {
    tracker: ButtonTracker,
    drag: DragState,
    previous_position: Option<Point>,
    thresholds: DragThresholds,
}

impl MouseEventClassifier {
    pub fn new(thresholds: DragThresholds) -> Self {
        Self {
            tracker: ButtonTracker::new(),
            drag: DragState::default(),
            previous_position: None,
            thresholds,
        }
    }

    /// Classifies one record, emitting through `sink`.
    ///
    /// A malformed record (no button, no wheel delta, no movement)
    /// classifies as a no-op and forwards.
    pub fn process(
        &mut self,
        record: &RawMouseRecord,
        sink: &mut dyn MouseEventSink,
    ) -> Propagation {
        let mut handled = false;

        self.process_down(record, sink, &mut handled);
        self.process_up(record, sink, &mut handled);
        self.process_wheel(record, sink, &mut handled);
        self.process_move(record, sink, &mut handled);
        self.process_drag(record, sink, &mut handled);

        Propagation::from_handled(handled)
    }

    fn emit(
        &self,
        phase: MousePhase,
        record: &RawMouseRecord,
        sink: &mut dyn MouseEventSink,
        handled: &mut bool,
    ) {
        let mut event = MouseGestureEvent::from_record(phase, record);
        if phase == MousePhase::Move {
            // Enriched: report every held button, not just the record's.
            event.buttons = self.tracker.down_buttons();
        }
        sink.emit_mouse(&mut event);
        *handled |= event.handled;
    }

    fn process_down(
        &mut self,
        record: &RawMouseRecord,
        sink: &mut dyn MouseEventSink,
        handled: &mut bool,
    ) {
        if *handled || record.is_up {
            return;
        }
        let Some(button) = record.button else {
            return;
        };
        self.tracker.press(button, record.click_count);
        self.emit(MousePhase::Down, record, sink, handled);
    }

    fn process_up(
        &mut self,
        record: &RawMouseRecord,
        sink: &mut dyn MouseEventSink,
        handled: &mut bool,
    ) {
        if *handled || !record.is_up {
            return;
        }
        let Some(button) = record.button else {
            return;
        };
        let kind = self.tracker.release(button);
        self.emit(MousePhase::Up, record, sink, handled);
        if *handled {
            return;
        }
        match kind {
            ReleaseKind::Click => self.emit(MousePhase::Click, record, sink, handled),
            ReleaseKind::DoubleClick => {
                self.emit(MousePhase::DoubleClick, record, sink, handled)
            }
            ReleaseKind::None => {}
        }
    }

    fn process_wheel(
        &mut self,
        record: &RawMouseRecord,
        sink: &mut dyn MouseEventSink,
        handled: &mut bool,
    ) {
        if *handled || record.wheel_delta == 0 {
            return;
        }
        self.emit(MousePhase::Wheel, record, sink, handled);
    }

    fn process_move(
        &mut self,
        record: &RawMouseRecord,
        sink: &mut dyn MouseEventSink,
        handled: &mut bool,
    ) {
        if *handled {
            return;
        }
        // High-frequency hooks re-report unchanged positions; dedup them.
        if self.previous_position == Some(record.position) {
            return;
        }
        self.previous_position = Some(record.position);
        self.emit(MousePhase::Move, record, sink, handled);
    }

    fn process_drag(
        &mut self,
        record: &RawMouseRecord,
        sink: &mut dyn MouseEventSink,
        handled: &mut bool,
    ) {
        if *handled {
            return;
        }
        if self.tracker.is_single_down(MouseButton::Left) {
            match self.drag.start {
                // Never overwrite an in-progress drag start.
                None => self.drag.start = Some(record.position),
                Some(start) => {
                    if !self.drag.dragging
                        && ((record.position.x - start.x).abs() > self.thresholds.horizontal
                            || (record.position.y - start.y).abs() > self.thresholds.vertical)
                    {
                        self.drag.dragging = true;
                        self.emit(MousePhase::DragStart, record, sink, handled);
                    }
                }
            }
        } else {
            // Left went up or was promoted to double-down; either ends
            // the drag candidacy.
            self.drag.start = None;
            if self.drag.dragging {
                self.drag.dragging = false;
                self.emit(MousePhase::DragFinish, record, sink, handled);
            }
        }
    }
}
