//! Windows hook source implementations.
//!
//! [`GlobalHookSource`] installs WH_KEYBOARD_LL / WH_MOUSE_LL hooks, each
//! on its own dedicated Win32 message-loop thread, so they fire
//! regardless of which application has focus.  [`ThreadHookSource`]
//! installs WH_KEYBOARD / WH_MOUSE bound to the calling thread, which
//! must pump messages itself.
//!
//! Low-level hooks carry no click counts, so this module synthesizes them
//! from the system double-click time and rectangle before records leave
//! the hook layer; downstream the classifier trusts the reported count.
//!
//! # Safety
//!
//! `unsafe` is used exclusively for Windows API FFI calls.  All `unsafe`
//! blocks are annotated with `// SAFETY:` comments.  The hook callbacks
//! run on the hook's message-loop thread and must return quickly; the
//! OS silently unhooks a callback that stalls.

#![cfg(target_os = "windows")]

use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread;

use gesture_core::{
    DragThresholds, Modifiers, MouseButton, Point, RawKeyboardRecord, RawMouseRecord,
};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetDoubleClickTime, GetKeyState, VK_CONTROL, VK_LWIN, VK_MENU, VK_RWIN, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageTime, GetMessageW, GetSystemMetrics,
    PostThreadMessageW, SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK, HOOKPROC,
    KBDLLHOOKSTRUCT, KBDLLHOOKSTRUCT_FLAGS, LLKHF_INJECTED, LLMHF_INJECTED, MOUSEHOOKSTRUCTEX,
    MSG, MSLLHOOKSTRUCT, SM_CXDOUBLECLK, SM_CXDRAG, SM_CYDOUBLECLK, SM_CYDRAG, WH_KEYBOARD,
    WH_KEYBOARD_LL, WH_MOUSE, WH_MOUSE_LL, WINDOWS_HOOK_ID, WM_KEYUP, WM_LBUTTONDBLCLK,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDBLCLK, WM_MBUTTONDOWN, WM_MBUTTONUP,
    WM_MOUSEHWHEEL, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDBLCLK, WM_RBUTTONDOWN,
    WM_RBUTTONUP, WM_SYSKEYUP, WM_XBUTTONDBLCLK, WM_XBUTTONDOWN, WM_XBUTTONUP, XBUTTON1,
};

use super::{
    CallbackSlot, HookError, HookHandle, HookSource, RawKeyboardCallback, RawMouseCallback,
};

// One callback slot per hook kind.  A slot holds the boxed callback for
// the lifetime of its subscription; the hook procs dispatch through it
// without holding the slot lock across the callback, so a callback that
// tears its own hook down cannot hang the hook thread.
static GLOBAL_KEYBOARD_SINK: CallbackSlot<RawKeyboardCallback> = CallbackSlot::new();
static GLOBAL_MOUSE_SINK: CallbackSlot<RawMouseCallback> = CallbackSlot::new();
static THREAD_KEYBOARD_SINK: CallbackSlot<RawKeyboardCallback> = CallbackSlot::new();
static THREAD_MOUSE_SINK: CallbackSlot<RawMouseCallback> = CallbackSlot::new();

/// Click-count synthesis state for the global mouse hook (LL hooks do
/// not report click counts).  Touched only from the mouse hook thread.
static CLICK_TRACKER: Mutex<ClickTracker> = Mutex::new(ClickTracker::new());

/// System-wide hook source (fires regardless of the focused application).
#[derive(Debug, Default)]
pub struct GlobalHookSource;

impl GlobalHookSource {
    pub fn new() -> Self {
        Self
    }
}

impl HookSource for GlobalHookSource {
    fn subscribe_keyboard(&self, callback: RawKeyboardCallback) -> Result<HookHandle, HookError> {
        GLOBAL_KEYBOARD_SINK
            .install(callback)
            .map_err(HookError::KeyboardHookInstallFailed)?;
        spawn_hook_loop(
            "gesture-kbd-hook",
            WH_KEYBOARD_LL,
            Some(global_keyboard_proc),
            &GLOBAL_KEYBOARD_SINK,
        )
        .map_err(HookError::KeyboardHookInstallFailed)
    }

    fn subscribe_mouse(&self, callback: RawMouseCallback) -> Result<HookHandle, HookError> {
        GLOBAL_MOUSE_SINK
            .install(callback)
            .map_err(HookError::MouseHookInstallFailed)?;
        spawn_hook_loop(
            "gesture-mouse-hook",
            WH_MOUSE_LL,
            Some(global_mouse_proc),
            &GLOBAL_MOUSE_SINK,
        )
        .map_err(HookError::MouseHookInstallFailed)
    }
}

/// Process-local hook source: hooks fire only for the calling thread's
/// message queue, which that thread must keep pumping.
#[derive(Debug, Default)]
pub struct ThreadHookSource;

impl ThreadHookSource {
    pub fn new() -> Self {
        Self
    }
}

impl HookSource for ThreadHookSource {
    fn subscribe_keyboard(&self, callback: RawKeyboardCallback) -> Result<HookHandle, HookError> {
        THREAD_KEYBOARD_SINK
            .install(callback)
            .map_err(HookError::KeyboardHookInstallFailed)?;
        install_thread_hook(WH_KEYBOARD, Some(thread_keyboard_proc), &THREAD_KEYBOARD_SINK)
            .map_err(HookError::KeyboardHookInstallFailed)
    }

    fn subscribe_mouse(&self, callback: RawMouseCallback) -> Result<HookHandle, HookError> {
        THREAD_MOUSE_SINK
            .install(callback)
            .map_err(HookError::MouseHookInstallFailed)?;
        install_thread_hook(WH_MOUSE, Some(thread_mouse_proc), &THREAD_MOUSE_SINK)
            .map_err(HookError::MouseHookInstallFailed)
    }
}

/// Reads the OS drag thresholds (SM_CXDRAG / SM_CYDRAG).  Called once at
/// facade construction; the values are constants for a session.
pub fn platform_drag_thresholds() -> DragThresholds {
    // SAFETY: GetSystemMetrics has no preconditions.
    let (horizontal, vertical) =
        unsafe { (GetSystemMetrics(SM_CXDRAG), GetSystemMetrics(SM_CYDRAG)) };
    DragThresholds {
        horizontal: horizontal.max(1),
        vertical: vertical.max(1),
    }
}

// ── Loop plumbing ─────────────────────────────────────────────────────────────

/// Spawns the dedicated message-loop thread for one global hook and
/// blocks until it reports whether installation succeeded.
fn spawn_hook_loop<T>(
    thread_name: &str,
    hook_id: WINDOWS_HOOK_ID,
    hook_proc: HOOKPROC,
    slot: &'static CallbackSlot<T>,
) -> Result<HookHandle, String> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();

    let spawned = thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || run_hook_message_loop(hook_id, hook_proc, ready_tx));
    if let Err(e) = spawned {
        slot.clear();
        return Err(e.to_string());
    }

    match ready_rx.recv() {
        Ok(Ok(thread_id)) => Ok(HookHandle::new(move || {
            slot.clear();
            // SAFETY: posting WM_QUIT to the loop thread; a stale thread
            // id after loop exit makes this a harmless no-op.
            unsafe {
                let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
        })),
        Ok(Err(message)) => {
            slot.clear();
            Err(message)
        }
        Err(_) => {
            slot.clear();
            Err("hook thread exited before reporting readiness".to_string())
        }
    }
}

/// Entry point for a dedicated Win32 hook message-loop thread.
fn run_hook_message_loop(
    hook_id: WINDOWS_HOOK_ID,
    hook_proc: HOOKPROC,
    ready: Sender<Result<u32, String>>,
) {
    // SAFETY: GetCurrentThreadId has no preconditions.
    let thread_id = unsafe { GetCurrentThreadId() };

    // SAFETY: installing a low-level hook for this thread's message loop.
    let hook: HHOOK = match unsafe { SetWindowsHookExW(hook_id, hook_proc, None, 0) } {
        Ok(hook) => hook,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };
    let _ = ready.send(Ok(thread_id));

    // Standard Win32 message loop; blocks until WM_QUIT is posted.
    let mut msg = MSG::default();
    // SAFETY: standard GetMessage/DispatchMessage loop pattern.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            DispatchMessageW(&msg);
        }
        let _ = UnhookWindowsHookEx(hook);
    }
}

/// Installs a thread-scoped hook on the calling thread.
fn install_thread_hook<T>(
    hook_id: WINDOWS_HOOK_ID,
    hook_proc: HOOKPROC,
    slot: &'static CallbackSlot<T>,
) -> Result<HookHandle, String> {
    // SAFETY: hooking the calling thread's own message queue.
    let hook = unsafe {
        let thread_id = GetCurrentThreadId();
        SetWindowsHookExW(hook_id, hook_proc, None, thread_id)
    };
    let hook = match hook {
        Ok(hook) => hook,
        Err(e) => {
            slot.clear();
            return Err(e.to_string());
        }
    };

    let raw_hook = hook.0 as isize;
    Ok(HookHandle::new(move || {
        slot.clear();
        // SAFETY: the handle originates from SetWindowsHookExW above and
        // is unhooked at most once (HookHandle guarantees single run).
        unsafe {
            let _ = UnhookWindowsHookEx(HHOOK(raw_hook as *mut core::ffi::c_void));
        }
    }))
}

fn dispatch_keyboard(slot: &CallbackSlot<RawKeyboardCallback>, record: &RawKeyboardRecord) -> bool {
    slot.dispatch(|callback| callback(record), true)
}

fn dispatch_mouse(slot: &CallbackSlot<RawMouseCallback>, record: &RawMouseRecord) -> bool {
    slot.dispatch(|callback| callback(record), true)
}

// ── Record construction helpers ───────────────────────────────────────────────

fn read_modifiers() -> Modifiers {
    // SAFETY: GetKeyState has no preconditions.
    unsafe {
        let mut flags = Modifiers::NONE;
        if GetKeyState(VK_CONTROL.0 as i32) as u16 & 0x8000 != 0 {
            flags = flags.with(Modifiers::CTRL);
        }
        if GetKeyState(VK_SHIFT.0 as i32) as u16 & 0x8000 != 0 {
            flags = flags.with(Modifiers::SHIFT);
        }
        if GetKeyState(VK_MENU.0 as i32) as u16 & 0x8000 != 0 {
            flags = flags.with(Modifiers::ALT);
        }
        if GetKeyState(VK_LWIN.0 as i32) as u16 & 0x8000 != 0
            || GetKeyState(VK_RWIN.0 as i32) as u16 & 0x8000 != 0
        {
            flags = flags.with(Modifiers::META);
        }
        flags
    }
}

fn button_for_message(message: u32, mouse_data: u32) -> Option<(MouseButton, bool, bool)> {
    // (button, is_up, is_double_click_message)
    let x_button = || {
        if (mouse_data >> 16) as u16 == XBUTTON1 {
            MouseButton::X1
        } else {
            MouseButton::X2
        }
    };
    match message {
        WM_LBUTTONDOWN => Some((MouseButton::Left, false, false)),
        WM_LBUTTONUP => Some((MouseButton::Left, true, false)),
        WM_LBUTTONDBLCLK => Some((MouseButton::Left, false, true)),
        WM_RBUTTONDOWN => Some((MouseButton::Right, false, false)),
        WM_RBUTTONUP => Some((MouseButton::Right, true, false)),
        WM_RBUTTONDBLCLK => Some((MouseButton::Right, false, true)),
        WM_MBUTTONDOWN => Some((MouseButton::Middle, false, false)),
        WM_MBUTTONUP => Some((MouseButton::Middle, true, false)),
        WM_MBUTTONDBLCLK => Some((MouseButton::Middle, false, true)),
        WM_XBUTTONDOWN => Some((x_button(), false, false)),
        WM_XBUTTONUP => Some((x_button(), true, false)),
        WM_XBUTTONDBLCLK => Some((x_button(), false, true)),
        _ => None,
    }
}

/// Synthesizes click counts for low-level hooks out of the system
/// double-click time and rectangle.
struct ClickTracker {
    last_button: Option<MouseButton>,
    last_time_ms: u32,
    last_pos: Point,
}

impl ClickTracker {
    const fn new() -> Self {
        Self {
            last_button: None,
            last_time_ms: 0,
            last_pos: Point { x: 0, y: 0 },
        }
    }

    fn click_count(&mut self, button: MouseButton, time_ms: u32, pos: Point) -> u8 {
        // SAFETY: metric queries have no preconditions.
        let (window_ms, rect_x, rect_y) = unsafe {
            (
                GetDoubleClickTime(),
                GetSystemMetrics(SM_CXDOUBLECLK),
                GetSystemMetrics(SM_CYDOUBLECLK),
            )
        };
        let is_double = self.last_button == Some(button)
            && time_ms.wrapping_sub(self.last_time_ms) <= window_ms
            && (pos.x - self.last_pos.x).abs() <= rect_x / 2
            && (pos.y - self.last_pos.y).abs() <= rect_y / 2;

        if is_double {
            // Reset so a triple tap starts a fresh pair, like the OS does.
            self.last_button = None;
            2
        } else {
            self.last_button = Some(button);
            self.last_time_ms = time_ms;
            self.last_pos = pos;
            1
        }
    }
}

// ── Global (low-level) hook procedures ────────────────────────────────────────

/// Low-level keyboard hook callback.  Must return quickly; a stalled
/// callback gets the hook silently removed by the OS.
unsafe extern "system" fn global_keyboard_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code != HC_ACTION as i32 {
        // SAFETY: must call CallNextHookEx when n_code < 0.
        return CallNextHookEx(None, n_code, w_param, l_param);
    }

    // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
    let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);

    let record = RawKeyboardRecord {
        vk_code: kbs.vkCode as u8,
        scan_code: kbs.scanCode as u16,
        modifiers: read_modifiers(),
        is_up: matches!(w_param.0 as u32, WM_KEYUP | WM_SYSKEYUP),
        time_ms: kbs.time,
        is_injected: (kbs.flags & LLKHF_INJECTED) != KBDLLHOOKSTRUCT_FLAGS(0),
    };

    if !dispatch_keyboard(&GLOBAL_KEYBOARD_SINK, &record) {
        // Swallow: the rest of the hook chain never sees the event.
        return LRESULT(1);
    }
    // SAFETY: forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
unsafe extern "system" fn global_mouse_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code != HC_ACTION as i32 {
        // SAFETY: must call CallNextHookEx when n_code < 0.
        return CallNextHookEx(None, n_code, w_param, l_param);
    }

    // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
    let mhs = &*(l_param.0 as *const MSLLHOOKSTRUCT);
    let position = Point::new(mhs.pt.x, mhs.pt.y);
    let message = w_param.0 as u32;

    let mut record = RawMouseRecord {
        button: None,
        click_count: 0,
        wheel_delta: 0,
        position,
        modifiers: read_modifiers(),
        is_up: false,
        time_ms: mhs.time,
        is_injected: mhs.flags & LLMHF_INJECTED != 0,
    };

    match message {
        WM_MOUSEMOVE => {}
        WM_MOUSEWHEEL | WM_MOUSEHWHEEL => {
            record.wheel_delta = (mhs.mouseData >> 16) as i16;
        }
        other => match button_for_message(other, mhs.mouseData) {
            Some((button, is_up, _)) => {
                record.button = Some(button);
                record.is_up = is_up;
                if !is_up {
                    let mut tracker = CLICK_TRACKER.lock().expect("click tracker lock poisoned");
                    record.click_count = tracker.click_count(button, mhs.time, position);
                }
            }
            None => {
                // Unknown message: classify as a no-op, keep propagating.
                return CallNextHookEx(None, n_code, w_param, l_param);
            }
        },
    }

    if !dispatch_mouse(&GLOBAL_MOUSE_SINK, &record) {
        return LRESULT(1);
    }
    // SAFETY: forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

// ── Thread-scoped hook procedures ─────────────────────────────────────────────

/// WH_KEYBOARD callback: w_param is the virtual key, l_param packs the
/// repeat/scan/transition bits.
unsafe extern "system" fn thread_keyboard_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code != HC_ACTION as i32 {
        // SAFETY: must call CallNextHookEx when n_code < 0.
        return CallNextHookEx(None, n_code, w_param, l_param);
    }

    let key_flags = l_param.0 as u32;
    let record = RawKeyboardRecord {
        vk_code: w_param.0 as u8,
        scan_code: ((key_flags >> 16) & 0xFF) as u16,
        modifiers: read_modifiers(),
        // Bit 31: transition state, 1 = key is being released.
        is_up: key_flags & 0x8000_0000 != 0,
        // SAFETY: GetMessageTime has no preconditions.
        time_ms: GetMessageTime() as u32,
        is_injected: false,
    };

    if !dispatch_keyboard(&THREAD_KEYBOARD_SINK, &record) {
        return LRESULT(1);
    }
    // SAFETY: forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// WH_MOUSE callback: w_param is the message, l_param points to a
/// MOUSEHOOKSTRUCTEX.  Double-clicks arrive as *DBLCLK messages here, so
/// no click synthesis is needed.
unsafe extern "system" fn thread_mouse_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code != HC_ACTION as i32 {
        // SAFETY: must call CallNextHookEx when n_code < 0.
        return CallNextHookEx(None, n_code, w_param, l_param);
    }

    // SAFETY: l_param points to a MOUSEHOOKSTRUCTEX for mouse hooks.
    let mhs = &*(l_param.0 as *const MOUSEHOOKSTRUCTEX);
    let position = Point::new(mhs.Base.pt.x, mhs.Base.pt.y);
    let message = w_param.0 as u32;

    let mut record = RawMouseRecord {
        button: None,
        click_count: 0,
        wheel_delta: 0,
        position,
        modifiers: read_modifiers(),
        is_up: false,
        // SAFETY: GetMessageTime has no preconditions.
        time_ms: GetMessageTime() as u32,
        is_injected: false,
    };

    match message {
        WM_MOUSEMOVE => {}
        WM_MOUSEWHEEL | WM_MOUSEHWHEEL => {
            record.wheel_delta = (mhs.mouseData >> 16) as i16;
        }
        other => match button_for_message(other, mhs.mouseData) {
            Some((button, is_up, is_double)) => {
                record.button = Some(button);
                record.is_up = is_up;
                if !is_up {
                    record.click_count = if is_double { 2 } else { 1 };
                }
            }
            None => {
                return CallNextHookEx(None, n_code, w_param, l_param);
            }
        },
    }

    if !dispatch_mouse(&THREAD_MOUSE_SINK, &record) {
        return LRESULT(1);
    }
    // SAFETY: forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}
