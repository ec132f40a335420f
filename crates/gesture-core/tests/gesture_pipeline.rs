//! Integration tests for the classification pipeline.
//!
//! These exercise the public surface of gesture-core end-to-end: raw
//! records in, semantic gestures out, whitelist consulted in between —
//! the same composition the capture layer performs inside a hook
//! callback.

use std::time::Duration;

use gesture_core::{
    AsciiCharResolver, DragThresholds, KeyEventClassifier, KeyEventSink, KeyGestureEvent,
    KeyPhase, MatchMode, Modifiers, MouseButton, MouseEventClassifier, MouseEventSink,
    MouseGestureEvent, MousePhase, NormalizedGesture, Point, Propagation, RawKeyboardRecord,
    RawMouseRecord, SuppressionConfig, SuppressionRegistry,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Collector {
    key_phases: Vec<KeyPhase>,
    mouse_phases: Vec<MousePhase>,
}

impl KeyEventSink for Collector {
    fn emit_key(&mut self, event: &mut KeyGestureEvent) {
        self.key_phases.push(event.phase);
    }
}

impl MouseEventSink for Collector {
    fn emit_mouse(&mut self, event: &mut MouseGestureEvent) {
        self.mouse_phases.push(event.phase);
    }
}

fn key_down(vk: u8, modifiers: Modifiers) -> RawKeyboardRecord {
    RawKeyboardRecord {
        vk_code: vk,
        scan_code: 0,
        modifiers,
        is_up: false,
        time_ms: 0,
        is_injected: false,
    }
}

fn key_up(vk: u8, modifiers: Modifiers) -> RawKeyboardRecord {
    RawKeyboardRecord {
        is_up: true,
        ..key_down(vk, modifiers)
    }
}

fn mouse(button: Option<MouseButton>, clicks: u8, is_up: bool, x: i32, y: i32) -> RawMouseRecord {
    RawMouseRecord {
        button,
        click_count: clicks,
        wheel_delta: 0,
        position: Point::new(x, y),
        modifiers: Modifiers::NONE,
        is_up,
        time_ms: 0,
        is_injected: false,
    }
}

/// The composition the capture layer runs per record: whitelist first,
/// classification only if the gesture passes.
fn run_filtered(
    registry: &SuppressionRegistry,
    classifier: &mut MouseEventClassifier,
    record: &RawMouseRecord,
    sink: &mut Collector,
) -> Propagation {
    if let Some(gesture) = NormalizedGesture::from_mouse(record) {
        if !registry.should_process(&gesture, false) {
            return Propagation::Forward;
        }
    }
    classifier.process(record, sink)
}

// ── Keyboard pipeline ─────────────────────────────────────────────────────────

#[test]
fn test_full_key_stroke_emits_down_press_up() {
    let mut classifier = KeyEventClassifier::new(AsciiCharResolver);
    let mut sink = Collector::default();

    classifier.process(&key_down(b'A', Modifiers::NONE), &mut sink);
    classifier.process(&key_up(b'A', Modifiers::NONE), &mut sink);

    assert_eq!(
        sink.key_phases,
        vec![KeyPhase::Down, KeyPhase::Press, KeyPhase::Up]
    );
}

// ── Mouse pipeline ────────────────────────────────────────────────────────────

#[test]
fn test_double_click_scenario() {
    // down(Left, clicks=2) -> up(Left) => [Down, DoubleClick], no Click.
    let mut classifier = MouseEventClassifier::new(DragThresholds::default());
    let mut sink = Collector::default();

    classifier.process(&mouse(Some(MouseButton::Left), 2, false, 10, 10), &mut sink);
    classifier.process(&mouse(Some(MouseButton::Left), 0, true, 10, 10), &mut sink);

    assert!(sink.mouse_phases.contains(&MousePhase::Down));
    assert!(sink.mouse_phases.contains(&MousePhase::DoubleClick));
    assert!(!sink.mouse_phases.contains(&MousePhase::Click));
}

#[test]
fn test_drag_start_fires_once_and_pairs_with_finish() {
    let mut classifier = MouseEventClassifier::new(DragThresholds {
        horizontal: 10,
        vertical: 10,
    });
    let mut sink = Collector::default();

    classifier.process(&mouse(Some(MouseButton::Left), 1, false, 100, 100), &mut sink);
    classifier.process(&mouse(None, 0, false, 100, 100), &mut sink); // unchanged
    classifier.process(&mouse(None, 0, false, 112, 100), &mut sink); // crosses
    classifier.process(&mouse(None, 0, false, 120, 100), &mut sink); // no dup
    classifier.process(&mouse(Some(MouseButton::Left), 0, true, 120, 100), &mut sink);

    let starts = sink
        .mouse_phases
        .iter()
        .filter(|p| **p == MousePhase::DragStart)
        .count();
    let finishes = sink
        .mouse_phases
        .iter()
        .filter(|p| **p == MousePhase::DragFinish)
        .count();
    assert_eq!(starts, 1);
    assert_eq!(finishes, 1);

    let start_idx = sink
        .mouse_phases
        .iter()
        .position(|p| *p == MousePhase::DragStart)
        .unwrap();
    let finish_idx = sink
        .mouse_phases
        .iter()
        .position(|p| *p == MousePhase::DragFinish)
        .unwrap();
    assert!(start_idx < finish_idx, "DragFinish must follow DragStart");
}

// ── Whitelist ahead of classification ─────────────────────────────────────────

#[test]
fn test_whitelisted_button_gesture_is_not_classified() {
    let registry = SuppressionRegistry::default();
    let mut classifier = MouseEventClassifier::new(DragThresholds::default());
    let mut sink = Collector::default();

    let gesture = NormalizedGesture::button(MouseButton::Left, Modifiers::NONE);
    let _token = registry.add_to_whitelist(gesture, MatchMode::Exact);

    let propagation = run_filtered(
        &registry,
        &mut classifier,
        &mouse(Some(MouseButton::Left), 1, false, 0, 0),
        &mut sink,
    );

    // Suppressed in-process, but the OS still delivers it downstream.
    assert!(sink.mouse_phases.is_empty());
    assert!(propagation.forward_to_os());
}

#[test]
fn test_suppression_lifts_after_release_and_grace() {
    let registry = SuppressionRegistry::new(SuppressionConfig {
        grace_period: Duration::from_millis(20),
    });
    let mut classifier = MouseEventClassifier::new(DragThresholds::default());
    let mut sink = Collector::default();

    let gesture = NormalizedGesture::button(MouseButton::Left, Modifiers::NONE);
    registry
        .add_to_whitelist(gesture, MatchMode::Exact)
        .release();

    // Inside the grace window the hardware echo is still dropped.
    run_filtered(
        &registry,
        &mut classifier,
        &mouse(Some(MouseButton::Left), 1, false, 0, 0),
        &mut sink,
    );
    assert!(sink.mouse_phases.is_empty());

    std::thread::sleep(Duration::from_millis(60));

    run_filtered(
        &registry,
        &mut classifier,
        &mouse(Some(MouseButton::Left), 1, false, 0, 0),
        &mut sink,
    );
    assert!(sink.mouse_phases.contains(&MousePhase::Down));
}

#[test]
fn test_pure_moves_bypass_the_whitelist() {
    // A pure move is never a whitelist candidate; classification runs.
    let registry = SuppressionRegistry::default();
    let mut classifier = MouseEventClassifier::new(DragThresholds::default());
    let mut sink = Collector::default();

    run_filtered(
        &registry,
        &mut classifier,
        &mouse(None, 0, false, 42, 42),
        &mut sink,
    );

    assert_eq!(sink.mouse_phases, vec![MousePhase::Move]);
}
