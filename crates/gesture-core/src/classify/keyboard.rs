//! Keyboard gesture classifier.
//!
//! A key-down record classifies to a Down event followed by zero or more
//! Press events (one per printable character the platform resolves for
//! the key-press — normally one; dead keys and IMEs may resolve to zero).
//! The matching key-up record, delivered later by the OS, classifies to
//! an Up event.
//!
//! The `handled` flag is read back after every emission.  Once set, OS
//! propagation stops — but in-process emission of the remaining phases
//! still completes, so subscribers always observe a consistent
//! Down → Press → Up gesture.

use std::sync::Arc;

use crate::classify::{KeyEventSink, Propagation};
use crate::domain::event::{KeyGestureEvent, Modifiers, RawKeyboardRecord};

/// Resolves the printable characters a key-press produces.
///
/// This is a pure collaborator: keyboard-layout awareness lives in the
/// platform layer, not here.  Tests inject a mock; the capture crate
/// injects a platform resolver.
#[cfg_attr(test, mockall::automock)]
pub trait CharResolver: Send {
    /// Returns the characters resolved for this key-press, possibly none.
    fn resolve(&self, vk_code: u8, scan_code: u16, modifiers: Modifiers) -> Vec<char>;
}

impl<R: CharResolver + ?Sized + Sync> CharResolver for Arc<R> {
    fn resolve(&self, vk_code: u8, scan_code: u16, modifiers: Modifiers) -> Vec<char> {
        (**self).resolve(vk_code, scan_code, modifiers)
    }
}

/// Layout-naive resolver covering the US-ASCII printable range.
///
/// Good enough for the diagnostic binary and for tests; real
/// installations supply a platform resolver instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiCharResolver;

impl CharResolver for AsciiCharResolver {
    fn resolve(&self, vk_code: u8, _scan_code: u16, modifiers: Modifiers) -> Vec<char> {
        if modifiers.contains(Modifiers::CTRL) || modifiers.contains(Modifiers::ALT) {
            return Vec::new();
        }
        let shifted = modifiers.contains(Modifiers::SHIFT);
        let ch = match vk_code {
            b'A'..=b'Z' => {
                let c = vk_code as char;
                if shifted {
                    c
                } else {
                    c.to_ascii_lowercase()
                }
            }
            b'0'..=b'9' if !shifted => vk_code as char,
            0x20 => ' ',
            _ => return Vec::new(),
        };
        vec![ch]
    }
}

/// Classifies raw keyboard records into Down/Press/Up gestures.
///
/// Stateless beyond the injected resolver: down/up is given per record by
/// the platform, never tracked here.
pub struct KeyEventClassifier<R: CharResolver> {
    resolver: R,
}

impl<R: CharResolver> KeyEventClassifier<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Classifies one record, emitting through `sink`.
    ///
    /// Returns [`Propagation::Swallow`] if any subscriber set `handled`
    /// on any emitted phase.
    pub fn process(
        &mut self,
        record: &RawKeyboardRecord,
        sink: &mut dyn KeyEventSink,
    ) -> Propagation {
        let mut handled = false;

        if record.is_up {
            let mut up = KeyGestureEvent::up(record.vk_code, record.modifiers);
            sink.emit_key(&mut up);
            handled |= up.handled;
        } else {
            let mut down = KeyGestureEvent::down(record.vk_code, record.modifiers);
            sink.emit_key(&mut down);
            handled |= down.handled;

            // Press emission completes even when Down was handled, so
            // in-process subscribers see the whole gesture.
            for ch in self
                .resolver
                .resolve(record.vk_code, record.scan_code, record.modifiers)
            {
                let mut press = KeyGestureEvent::press(record.vk_code, record.modifiers, ch);
                sink.emit_key(&mut press);
                handled |= press.handled;
            }
        }

        Propagation::from_handled(handled)
    }
}
