//! Mock hook source for unit and integration testing.
//!
//! Lets tests drive the raw callbacks synchronously — exactly the way an
//! OS hook thread would — and observe the propagation booleans handed
//! back to the hook chain, without installing real hooks.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use gesture_core::{RawKeyboardRecord, RawMouseRecord};

use super::{
    CallbackSlot, HookError, HookHandle, HookSource, RawKeyboardCallback, RawMouseCallback,
};

#[derive(Default)]
struct MockInner {
    keyboard: CallbackSlot<RawKeyboardCallback>,
    mouse: CallbackSlot<RawMouseCallback>,
    keyboard_installs: AtomicU32,
    mouse_installs: AtomicU32,
    fail_keyboard: AtomicBool,
    fail_mouse: AtomicBool,
}

/// A mock implementation of [`HookSource`].
///
/// Cheap to clone; clones share state, so a test can keep one copy to
/// drive records while the facade owns another.
#[derive(Clone, Default)]
pub struct MockHookSource {
    inner: Arc<MockInner>,
}

impl MockHookSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next keyboard subscription fail, simulating the OS
    /// denying the hook.
    pub fn fail_keyboard_install(&self) {
        self.inner.fail_keyboard.store(true, Ordering::SeqCst);
    }

    /// Makes the next mouse subscription fail.
    pub fn fail_mouse_install(&self) {
        self.inner.fail_mouse.store(true, Ordering::SeqCst);
    }

    /// Delivers a keyboard record to the subscribed callback, returning
    /// the propagation boolean the OS hook chain would see.  The slot
    /// lock is not held across the callback, so the callback may
    /// unsubscribe itself.
    ///
    /// Panics if no keyboard hook is installed.
    pub fn drive_keyboard(&self, record: &RawKeyboardRecord) -> bool {
        assert!(
            self.inner.keyboard.is_installed(),
            "no keyboard hook installed; subscribe first"
        );
        self.inner.keyboard.dispatch(|callback| callback(record), true)
    }

    /// Delivers a mouse record to the subscribed callback.
    ///
    /// Panics if no mouse hook is installed.
    pub fn drive_mouse(&self, record: &RawMouseRecord) -> bool {
        assert!(
            self.inner.mouse.is_installed(),
            "no mouse hook installed; subscribe first"
        );
        self.inner.mouse.dispatch(|callback| callback(record), true)
    }

    /// `true` while a keyboard callback is subscribed and not disposed.
    pub fn keyboard_installed(&self) -> bool {
        self.inner.keyboard.is_installed()
    }

    pub fn mouse_installed(&self) -> bool {
        self.inner.mouse.is_installed()
    }

    /// Total keyboard installations over the source's lifetime.
    pub fn keyboard_install_count(&self) -> u32 {
        self.inner.keyboard_installs.load(Ordering::SeqCst)
    }

    pub fn mouse_install_count(&self) -> u32 {
        self.inner.mouse_installs.load(Ordering::SeqCst)
    }
}

impl HookSource for MockHookSource {
    fn subscribe_keyboard(&self, callback: RawKeyboardCallback) -> Result<HookHandle, HookError> {
        if self.inner.fail_keyboard.swap(false, Ordering::SeqCst) {
            return Err(HookError::KeyboardHookInstallFailed(
                "mock install failure".to_string(),
            ));
        }
        self.inner
            .keyboard
            .install(callback)
            .map_err(HookError::KeyboardHookInstallFailed)?;
        self.inner.keyboard_installs.fetch_add(1, Ordering::SeqCst);

        let inner = Arc::clone(&self.inner);
        Ok(HookHandle::new(move || inner.keyboard.clear()))
    }

    fn subscribe_mouse(&self, callback: RawMouseCallback) -> Result<HookHandle, HookError> {
        if self.inner.fail_mouse.swap(false, Ordering::SeqCst) {
            return Err(HookError::MouseHookInstallFailed(
                "mock install failure".to_string(),
            ));
        }
        self.inner
            .mouse
            .install(callback)
            .map_err(HookError::MouseHookInstallFailed)?;
        self.inner.mouse_installs.fetch_add(1, Ordering::SeqCst);

        let inner = Arc::clone(&self.inner);
        Ok(HookHandle::new(move || inner.mouse.clear()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_core::{Modifiers, Point};

    fn key_record() -> RawKeyboardRecord {
        RawKeyboardRecord {
            vk_code: 0x41,
            scan_code: 0x1E,
            modifiers: Modifiers::NONE,
            is_up: false,
            time_ms: 0,
            is_injected: false,
        }
    }

    #[test]
    fn test_drive_keyboard_reaches_callback_and_returns_bool() {
        // Arrange
        let source = MockHookSource::new();
        let _handle = source
            .subscribe_keyboard(Box::new(|record| record.vk_code != 0x41))
            .expect("subscribe should succeed");

        // Act / Assert
        assert!(!source.drive_keyboard(&key_record()));
        assert!(source.keyboard_installed());
        assert_eq!(source.keyboard_install_count(), 1);
    }

    #[test]
    fn test_dispose_uninstalls_callback() {
        let source = MockHookSource::new();
        let handle = source
            .subscribe_keyboard(Box::new(|_| true))
            .expect("subscribe should succeed");

        handle.dispose();

        assert!(!source.keyboard_installed());
    }

    #[test]
    fn test_forced_install_failure_is_one_shot() {
        let source = MockHookSource::new();
        source.fail_mouse_install();

        let first = source.subscribe_mouse(Box::new(|_| true));
        assert!(matches!(
            first,
            Err(HookError::MouseHookInstallFailed(_))
        ));

        let second = source.subscribe_mouse(Box::new(|_| true));
        assert!(second.is_ok());
    }

    #[test]
    fn test_mouse_record_round_trips_position() {
        let source = MockHookSource::new();
        let _handle = source
            .subscribe_mouse(Box::new(|record| record.position == Point::new(7, 9)))
            .expect("subscribe should succeed");

        let record = RawMouseRecord {
            button: None,
            click_count: 0,
            wheel_delta: 0,
            position: Point::new(7, 9),
            modifiers: Modifiers::NONE,
            is_up: false,
            time_ms: 0,
            is_injected: false,
        };
        assert!(source.drive_mouse(&record));
    }
}
