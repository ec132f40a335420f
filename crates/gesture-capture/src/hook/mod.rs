//! OS hook primitives.
//!
//! A [`HookSource`] is the opaque "subscribe" operation this subsystem
//! builds on: hand it a callback, get back a raw record stream and a
//! disposable [`HookHandle`].  The callback's boolean return is consumed
//! directly by the OS hook chain — `true` continues propagation, `false`
//! swallows the event system-wide.
//!
//! On Windows the production sources install WH_KEYBOARD_LL / WH_MOUSE_LL
//! (global) or WH_KEYBOARD / WH_MOUSE (current thread only) hooks; see
//! [`windows`].  Tests use [`mock::MockHookSource`], which drives the
//! callbacks synchronously.
//!
//! Hook installation failure is fatal to the caller — no retry loop, no
//! silent fallback.  A global hook the OS refuses to install usually
//! means a systemic permission problem, and a missing hook must be
//! visible immediately rather than discovered later as "events never
//! fire".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use gesture_core::{RawKeyboardRecord, RawMouseRecord};
use tracing::debug;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Raw keyboard callback invoked once per OS record; returns the
/// "continue propagation" signal.
pub type RawKeyboardCallback = Box<dyn FnMut(&RawKeyboardRecord) -> bool + Send>;

/// Raw mouse callback invoked once per OS record.
pub type RawMouseCallback = Box<dyn FnMut(&RawMouseRecord) -> bool + Send>;

/// Error type for hook operations.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("failed to install keyboard hook: {0}")]
    KeyboardHookInstallFailed(String),
    #[error("failed to install mouse hook: {0}")]
    MouseHookInstallFailed(String),
    #[error("input hooks are not supported on this platform: {0}")]
    UnsupportedPlatform(&'static str),
}

/// One hook kind's callback storage.
///
/// The boxed callback is taken *out* of the slot for the duration of
/// each dispatch, so the slot lock is never held across consumer code.
/// A callback that clears its own slot mid-dispatch — a subscriber
/// unsubscribing itself, a consumer disposing the facade from inside a
/// handler — therefore cannot self-wait on the slot mutex and hang the
/// hook thread.
pub(crate) struct CallbackSlot<T> {
    callback: Mutex<Option<T>>,
    installed: AtomicBool,
}

impl<T> CallbackSlot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            callback: Mutex::new(None),
            installed: AtomicBool::new(false),
        }
    }

    /// Claims the slot and stores `callback`; fails if occupied.
    pub(crate) fn install(&self, callback: T) -> Result<(), String> {
        if self.installed.swap(true, Ordering::SeqCst) {
            return Err("hook already installed for this slot".to_string());
        }
        *self.callback.lock().expect("hook slot lock poisoned") = Some(callback);
        Ok(())
    }

    /// Releases the slot.  Safe to call from inside a dispatch: the
    /// in-flight callback is out of the slot then, and the dispatcher
    /// drops it on return instead of re-installing it.
    pub(crate) fn clear(&self) {
        self.installed.store(false, Ordering::SeqCst);
        drop(self.callback.lock().expect("hook slot lock poisoned").take());
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Invokes the stored callback, returning `fallback` when none is
    /// present.  The slot lock is released before `invoke` runs and the
    /// callback is only re-installed if the slot was not cleared or
    /// re-claimed in the meantime.
    pub(crate) fn dispatch<R>(&self, invoke: impl FnOnce(&mut T) -> R, fallback: R) -> R {
        let taken = self.callback.lock().expect("hook slot lock poisoned").take();
        let Some(mut callback) = taken else {
            return fallback;
        };
        let result = invoke(&mut callback);
        let mut guard = self.callback.lock().expect("hook slot lock poisoned");
        if self.is_installed() && guard.is_none() {
            *guard = Some(callback);
        }
        result
    }
}

impl<T> Default for CallbackSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait abstracting the OS hook subscription primitive.
///
/// Production implementations install real OS hooks; tests inject
/// [`mock::MockHookSource`].
pub trait HookSource: Send + Sync {
    /// Installs a keyboard hook delivering one callback per raw record.
    fn subscribe_keyboard(&self, callback: RawKeyboardCallback) -> Result<HookHandle, HookError>;

    /// Installs a mouse hook delivering one callback per raw record.
    fn subscribe_mouse(&self, callback: RawMouseCallback) -> Result<HookHandle, HookError>;
}

/// Exclusive owner of one OS hook subscription.
///
/// `dispose` is idempotent and safe from any thread: exactly one caller
/// runs the teardown closure, every other call is a no-op.  After
/// `dispose` returns, no further callback invocations occur (best-effort:
/// one already in flight on the hook thread may still complete).
/// Dropping the handle disposes it.
pub struct HookHandle {
    disposed: AtomicBool,
    disposer: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl HookHandle {
    pub fn new(disposer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            disposed: AtomicBool::new(false),
            disposer: Mutex::new(Some(Box::new(disposer))),
        }
    }

    /// Stops the OS subscription.  Safe to call repeatedly.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let teardown = self
            .disposer
            .lock()
            .expect("hook disposer lock poisoned")
            .take();
        if let Some(teardown) = teardown {
            debug!("disposing hook subscription");
            teardown();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Drop for HookHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[test]
    fn test_dispose_runs_teardown_once() {
        // Arrange
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let handle = HookHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Act
        handle.dispose();
        handle.dispose();
        handle.dispose();

        // Assert
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_disposed());
    }

    #[test]
    fn test_drop_disposes() {
        let count = Arc::new(AtomicU32::new(0));
        {
            let counter = Arc::clone(&count);
            let _handle = HookHandle::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_slot_reinstalls_callback_after_dispatch() {
        let slot: CallbackSlot<Box<dyn FnMut() -> bool + Send>> = CallbackSlot::new();
        slot.install(Box::new(|| false)).expect("install");

        assert!(!slot.dispatch(|callback| callback(), true));

        // The callback went back into the slot; a second dispatch
        // reaches it again.
        assert!(slot.is_installed());
        assert!(!slot.dispatch(|callback| callback(), true));
    }

    #[test]
    fn test_callback_slot_allows_clear_from_inside_dispatch() {
        // A callback clearing its own slot must not self-wait on the
        // slot mutex, and must not be re-installed afterwards.
        let slot: Arc<CallbackSlot<Box<dyn FnMut() -> bool + Send>>> =
            Arc::new(CallbackSlot::new());
        let inner = Arc::clone(&slot);
        slot.install(Box::new(move || {
            inner.clear();
            true
        }))
        .expect("install");

        assert!(slot.dispatch(|callback| callback(), false));
        assert!(!slot.is_installed());
        assert!(slot.dispatch(|callback| callback(), true));
    }

    #[test]
    fn test_callback_slot_rejects_double_install() {
        let slot: CallbackSlot<Box<dyn FnMut() -> bool + Send>> = CallbackSlot::new();
        slot.install(Box::new(|| true)).expect("install");
        assert!(slot.install(Box::new(|| true)).is_err());

        slot.clear();
        assert!(slot.install(Box::new(|| true)).is_ok());
    }

    #[test]
    fn test_concurrent_dispose_runs_teardown_once() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let handle = Arc::new(HookHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut workers = Vec::new();
        for _ in 0..8 {
            let h = Arc::clone(&handle);
            workers.push(std::thread::spawn(move || h.dispose()));
        }
        for w in workers {
            w.join().expect("worker panicked");
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
