//! The public gesture event surface.
//!
//! [`InputEvents`] composes a keyboard and a mouse classifier behind one
//! subscription API.  Hooks are installed *lazily*: the keyboard hook
//! goes in on the first keyboard subscription, the mouse hook on the
//! first mouse subscription, and each is torn down again when the last
//! subscriber of that device leaves — an explicit subscriber count, not
//! language magic.  A process that only ever wants mouse gestures never
//! pays the cost (or raises the privilege requirements) of a keyboard
//! hook.
//!
//! # Per-record flow inside the hook callback
//!
//! raw pre-filter observers → suppression lookup → classifier stages →
//! per-phase subscriber dispatch.  Subscriber lists are snapshotted out
//! of their lock before invocation; no lock is held across a call into
//! consumer code, because the callback runs on the OS hook thread and a
//! stalled hook freezes system input.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use gesture_core::{
    AsciiCharResolver, CharResolver, DragThresholds, KeyEventClassifier, KeyEventSink,
    KeyGestureEvent, KeyPhase, MouseEventClassifier, MouseEventSink, MouseGestureEvent,
    MousePhase, NormalizedGesture, RawKeyboardRecord, RawMouseRecord, SuppressionConfig,
    SuppressionRegistry,
};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::hook::{HookError, HookHandle, HookSource, RawKeyboardCallback, RawMouseCallback};

type KeyCallback = Arc<dyn Fn(&mut KeyGestureEvent) + Send + Sync>;
type MouseCallback = Arc<dyn Fn(&mut MouseGestureEvent) + Send + Sync>;
type RawKeyObserver = Arc<dyn Fn(&RawKeyboardRecord) + Send + Sync>;
type RawMouseObserver = Arc<dyn Fn(&RawMouseRecord) + Send + Sync>;

/// Which subscriber list a subscription lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    KeyRaw,
    Key(KeyPhase),
    MouseRaw,
    Mouse(MousePhase),
}

/// Opaque handle identifying one subscription; pass it back to
/// [`InputEvents::unsubscribe`].
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionId {
    id: Uuid,
    slot: Slot,
}

#[derive(Default)]
struct KeySubscribers {
    raw: HashMap<Uuid, RawKeyObserver>,
    down: HashMap<Uuid, KeyCallback>,
    press: HashMap<Uuid, KeyCallback>,
    up: HashMap<Uuid, KeyCallback>,
}

impl KeySubscribers {
    fn len(&self) -> usize {
        self.raw.len() + self.down.len() + self.press.len() + self.up.len()
    }

    fn phase_map(&mut self, phase: KeyPhase) -> &mut HashMap<Uuid, KeyCallback> {
        match phase {
            KeyPhase::Down => &mut self.down,
            KeyPhase::Press => &mut self.press,
            KeyPhase::Up => &mut self.up,
        }
    }

    fn phase_snapshot(&self, phase: KeyPhase) -> Vec<KeyCallback> {
        let map = match phase {
            KeyPhase::Down => &self.down,
            KeyPhase::Press => &self.press,
            KeyPhase::Up => &self.up,
        };
        map.values().cloned().collect()
    }

    fn raw_snapshot(&self) -> Vec<RawKeyObserver> {
        self.raw.values().cloned().collect()
    }

    fn remove(&mut self, slot: Slot, id: &Uuid) -> bool {
        match slot {
            Slot::KeyRaw => self.raw.remove(id).is_some(),
            Slot::Key(phase) => self.phase_map(phase).remove(id).is_some(),
            _ => false,
        }
    }
}

#[derive(Default)]
struct MouseSubscribers {
    raw: HashMap<Uuid, RawMouseObserver>,
    by_phase: HashMap<MousePhase, HashMap<Uuid, MouseCallback>>,
}

impl MouseSubscribers {
    fn len(&self) -> usize {
        self.raw.len() + self.by_phase.values().map(HashMap::len).sum::<usize>()
    }

    fn phase_snapshot(&self, phase: MousePhase) -> Vec<MouseCallback> {
        self.by_phase
            .get(&phase)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    fn raw_snapshot(&self) -> Vec<RawMouseObserver> {
        self.raw.values().cloned().collect()
    }

    fn remove(&mut self, slot: Slot, id: &Uuid) -> bool {
        match slot {
            Slot::MouseRaw => self.raw.remove(id).is_some(),
            Slot::Mouse(phase) => self
                .by_phase
                .get_mut(&phase)
                .map(|m| m.remove(id).is_some())
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// One device's hook lifecycle: the handle (present while installed)
/// plus the shared subscriber table the callback dispatches through.
struct Channel<S> {
    handle: Option<HookHandle>,
    subscribers: Arc<RwLock<S>>,
}

impl<S: Default> Default for Channel<S> {
    fn default() -> Self {
        Self {
            handle: None,
            subscribers: Arc::new(RwLock::new(S::default())),
        }
    }
}

/// Construction-time knobs for [`InputEvents`].
#[derive(Clone)]
pub struct FacadeOptions {
    /// Suppression registry tunables (grace period).
    pub suppression: SuppressionConfig,
    /// Drag threshold override; `None` means "ask the platform"
    /// (Windows) or fall back to [`DragThresholds::default`].
    pub thresholds: Option<DragThresholds>,
    /// Resolver for key-press characters.
    pub resolver: Arc<dyn CharResolver + Send + Sync>,
}

impl Default for FacadeOptions {
    fn default() -> Self {
        Self {
            suppression: SuppressionConfig::default(),
            thresholds: None,
            resolver: Arc::new(AsciiCharResolver),
        }
    }
}

/// Lazily-installing gesture event facade.
///
/// Construct with [`InputEvents::global`] (system-wide hooks),
/// [`InputEvents::application`] (current process/thread only), or
/// [`InputEvents::with_source`] (any [`HookSource`], used by tests).
pub struct InputEvents {
    source: Arc<dyn HookSource>,
    suppression: SuppressionRegistry,
    resolver: Arc<dyn CharResolver + Send + Sync>,
    thresholds: DragThresholds,
    keyboard: Mutex<Channel<KeySubscribers>>,
    mouse: Mutex<Channel<MouseSubscribers>>,
}

impl InputEvents {
    /// System-wide variant: gestures fire regardless of which
    /// application has focus.
    ///
    /// # Errors
    ///
    /// [`HookError::UnsupportedPlatform`] on non-Windows hosts.  Hook
    /// installation itself happens lazily and reports failure from the
    /// first subscription call.
    pub fn global() -> Result<Self, HookError> {
        Self::global_with(FacadeOptions::default())
    }

    /// System-wide variant with explicit options.
    pub fn global_with(options: FacadeOptions) -> Result<Self, HookError> {
        #[cfg(target_os = "windows")]
        {
            let thresholds = options
                .thresholds
                .unwrap_or_else(crate::hook::windows::platform_drag_thresholds);
            Ok(Self::build(
                Arc::new(crate::hook::windows::GlobalHookSource::new()),
                options,
                thresholds,
            ))
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = options;
            Err(HookError::UnsupportedPlatform(
                "global input hooks require Windows",
            ))
        }
    }

    /// Process-local variant: gestures fire only for the hooking
    /// thread's message queue.
    pub fn application() -> Result<Self, HookError> {
        Self::application_with(FacadeOptions::default())
    }

    /// Process-local variant with explicit options.
    pub fn application_with(options: FacadeOptions) -> Result<Self, HookError> {
        #[cfg(target_os = "windows")]
        {
            let thresholds = options
                .thresholds
                .unwrap_or_else(crate::hook::windows::platform_drag_thresholds);
            Ok(Self::build(
                Arc::new(crate::hook::windows::ThreadHookSource::new()),
                options,
                thresholds,
            ))
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = options;
            Err(HookError::UnsupportedPlatform(
                "thread input hooks require Windows",
            ))
        }
    }

    /// Builds a facade over an injected source.
    pub fn with_source(source: Arc<dyn HookSource>, options: FacadeOptions) -> Self {
        let thresholds = options.thresholds.unwrap_or_default();
        Self::build(source, options, thresholds)
    }

    fn build(
        source: Arc<dyn HookSource>,
        options: FacadeOptions,
        thresholds: DragThresholds,
    ) -> Self {
        Self {
            source,
            suppression: SuppressionRegistry::new(options.suppression),
            resolver: options.resolver,
            thresholds,
            keyboard: Mutex::new(Channel::default()),
            mouse: Mutex::new(Channel::default()),
        }
    }

    /// The whitelist consulted ahead of classification.  Application
    /// code registers self-generated gestures here before emulating
    /// them.
    pub fn suppression(&self) -> &SuppressionRegistry {
        &self.suppression
    }

    // ── Keyboard subscriptions ────────────────────────────────────────────────

    /// Diagnostics pre-filter: sees every raw keyboard record ahead of
    /// suppression and classification.
    pub fn on_raw_keyboard(
        &self,
        observer: impl Fn(&RawKeyboardRecord) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        let observer: RawKeyObserver = Arc::new(observer);
        self.subscribe_key(Slot::KeyRaw, move |subs, id| {
            subs.raw.insert(id, observer);
        })
    }

    pub fn on_key_down(
        &self,
        callback: impl Fn(&mut KeyGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_key_phase(KeyPhase::Down, callback)
    }

    pub fn on_key_press(
        &self,
        callback: impl Fn(&mut KeyGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_key_phase(KeyPhase::Press, callback)
    }

    pub fn on_key_up(
        &self,
        callback: impl Fn(&mut KeyGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_key_phase(KeyPhase::Up, callback)
    }

    // ── Mouse subscriptions ───────────────────────────────────────────────────

    /// Diagnostics pre-filter: sees every raw mouse record ahead of
    /// suppression and classification.
    pub fn on_raw_mouse(
        &self,
        observer: impl Fn(&RawMouseRecord) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        let observer: RawMouseObserver = Arc::new(observer);
        self.subscribe_mouse(Slot::MouseRaw, move |subs, id| {
            subs.raw.insert(id, observer);
        })
    }

    pub fn on_mouse_move(
        &self,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_mouse_phase(MousePhase::Move, callback)
    }

    pub fn on_mouse_down(
        &self,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_mouse_phase(MousePhase::Down, callback)
    }

    pub fn on_mouse_up(
        &self,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_mouse_phase(MousePhase::Up, callback)
    }

    pub fn on_mouse_click(
        &self,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_mouse_phase(MousePhase::Click, callback)
    }

    pub fn on_mouse_double_click(
        &self,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_mouse_phase(MousePhase::DoubleClick, callback)
    }

    pub fn on_mouse_wheel(
        &self,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_mouse_phase(MousePhase::Wheel, callback)
    }

    pub fn on_drag_start(
        &self,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_mouse_phase(MousePhase::DragStart, callback)
    }

    pub fn on_drag_finish(
        &self,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        self.subscribe_mouse_phase(MousePhase::DragFinish, callback)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Removes one subscription.  When the last subscriber of a device
    /// leaves, that device's hook is torn down.
    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        match subscription.slot {
            Slot::KeyRaw | Slot::Key(_) => {
                let mut channel = self.keyboard.lock().expect("keyboard channel poisoned");
                let emptied = {
                    let mut subs = channel
                        .subscribers
                        .write()
                        .expect("keyboard subscribers poisoned");
                    if !subs.remove(subscription.slot, &subscription.id) {
                        warn!(?subscription, "unsubscribe for unknown subscription");
                    }
                    subs.len() == 0
                };
                if emptied {
                    if let Some(handle) = channel.handle.take() {
                        handle.dispose();
                        debug!("keyboard hook removed after last subscriber left");
                    }
                }
            }
            Slot::MouseRaw | Slot::Mouse(_) => {
                let mut channel = self.mouse.lock().expect("mouse channel poisoned");
                let emptied = {
                    let mut subs = channel
                        .subscribers
                        .write()
                        .expect("mouse subscribers poisoned");
                    if !subs.remove(subscription.slot, &subscription.id) {
                        warn!(?subscription, "unsubscribe for unknown subscription");
                    }
                    subs.len() == 0
                };
                if emptied {
                    if let Some(handle) = channel.handle.take() {
                        handle.dispose();
                        debug!("mouse hook removed after last subscriber left");
                    }
                }
            }
        }
    }

    /// Tears down whichever hooks were actually created and drops all
    /// subscribers.  Idempotent.
    pub fn dispose(&self) {
        {
            let mut channel = self.keyboard.lock().expect("keyboard channel poisoned");
            if let Some(handle) = channel.handle.take() {
                handle.dispose();
            }
            *channel
                .subscribers
                .write()
                .expect("keyboard subscribers poisoned") = KeySubscribers::default();
        }
        {
            let mut channel = self.mouse.lock().expect("mouse channel poisoned");
            if let Some(handle) = channel.handle.take() {
                handle.dispose();
            }
            *channel
                .subscribers
                .write()
                .expect("mouse subscribers poisoned") = MouseSubscribers::default();
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn subscribe_key_phase(
        &self,
        phase: KeyPhase,
        callback: impl Fn(&mut KeyGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        let callback: KeyCallback = Arc::new(callback);
        self.subscribe_key(Slot::Key(phase), move |subs, id| {
            subs.phase_map(phase).insert(id, callback);
        })
    }

    fn subscribe_key(
        &self,
        slot: Slot,
        insert: impl FnOnce(&mut KeySubscribers, Uuid),
    ) -> Result<SubscriptionId, HookError> {
        let mut channel = self.keyboard.lock().expect("keyboard channel poisoned");
        if channel.handle.is_none() {
            let callback = self.build_keyboard_callback(Arc::clone(&channel.subscribers));
            channel.handle = Some(self.source.subscribe_keyboard(callback)?);
            debug!("keyboard hook installed on first subscription");
        }
        let id = Uuid::new_v4();
        insert(
            &mut channel
                .subscribers
                .write()
                .expect("keyboard subscribers poisoned"),
            id,
        );
        Ok(SubscriptionId { id, slot })
    }

    fn subscribe_mouse_phase(
        &self,
        phase: MousePhase,
        callback: impl Fn(&mut MouseGestureEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, HookError> {
        let callback: MouseCallback = Arc::new(callback);
        self.subscribe_mouse(Slot::Mouse(phase), move |subs, id| {
            subs.by_phase.entry(phase).or_default().insert(id, callback);
        })
    }

    fn subscribe_mouse(
        &self,
        slot: Slot,
        insert: impl FnOnce(&mut MouseSubscribers, Uuid),
    ) -> Result<SubscriptionId, HookError> {
        let mut channel = self.mouse.lock().expect("mouse channel poisoned");
        if channel.handle.is_none() {
            let callback = self.build_mouse_callback(Arc::clone(&channel.subscribers));
            channel.handle = Some(self.source.subscribe_mouse(callback)?);
            debug!("mouse hook installed on first subscription");
        }
        let id = Uuid::new_v4();
        insert(
            &mut channel
                .subscribers
                .write()
                .expect("mouse subscribers poisoned"),
            id,
        );
        Ok(SubscriptionId { id, slot })
    }

    fn build_keyboard_callback(
        &self,
        subscribers: Arc<RwLock<KeySubscribers>>,
    ) -> RawKeyboardCallback {
        let registry = self.suppression.clone();
        let mut classifier = KeyEventClassifier::new(Arc::clone(&self.resolver));
        Box::new(move |record: &RawKeyboardRecord| -> bool {
            let observers = subscribers
                .read()
                .expect("keyboard subscribers poisoned")
                .raw_snapshot();
            for observer in observers {
                observer(record);
            }

            let gesture = NormalizedGesture::from_keyboard(record);
            // Down records go on to emit Press events, whose characters
            // already encode the modifier state.
            if !registry.should_process(&gesture, !record.is_up) {
                trace!(?gesture, "whitelisted keyboard gesture dropped");
                // Dropped in-process; the OS still delivers it downstream.
                return true;
            }

            let mut sink = KeyDispatchSink {
                subscribers: &subscribers,
            };
            classifier.process(record, &mut sink).forward_to_os()
        })
    }

    fn build_mouse_callback(&self, subscribers: Arc<RwLock<MouseSubscribers>>) -> RawMouseCallback {
        let registry = self.suppression.clone();
        let mut classifier = MouseEventClassifier::new(self.thresholds);
        Box::new(move |record: &RawMouseRecord| -> bool {
            let observers = subscribers
                .read()
                .expect("mouse subscribers poisoned")
                .raw_snapshot();
            for observer in observers {
                observer(record);
            }

            if let Some(gesture) = NormalizedGesture::from_mouse(record) {
                if !registry.should_process(&gesture, false) {
                    trace!(?gesture, "whitelisted mouse gesture dropped");
                    return true;
                }
            }

            let mut sink = MouseDispatchSink {
                subscribers: &subscribers,
            };
            classifier.process(record, &mut sink).forward_to_os()
        })
    }
}

impl Drop for InputEvents {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Dispatches classifier emissions to the phase's subscribers.  The
/// snapshot is taken before invocation so the subscriber lock is never
/// held across consumer code.
struct KeyDispatchSink<'a> {
    subscribers: &'a RwLock<KeySubscribers>,
}

impl KeyEventSink for KeyDispatchSink<'_> {
    fn emit_key(&mut self, event: &mut KeyGestureEvent) {
        let targets = self
            .subscribers
            .read()
            .expect("keyboard subscribers poisoned")
            .phase_snapshot(event.phase);
        for callback in targets {
            callback(event);
        }
    }
}

struct MouseDispatchSink<'a> {
    subscribers: &'a RwLock<MouseSubscribers>,
}

impl MouseEventSink for MouseDispatchSink<'_> {
    fn emit_mouse(&mut self, event: &mut MouseGestureEvent) {
        let targets = self
            .subscribers
            .read()
            .expect("mouse subscribers poisoned")
            .phase_snapshot(event.phase);
        for callback in targets {
            callback(event);
        }
    }
}
