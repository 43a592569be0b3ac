//! Global hotkey interception.
//!
//! A single system-wide keyboard tap (via rdev's grab) observes every
//! key-down before the foreground application sees it. The per-event work is
//! deliberately tiny — modifier bookkeeping, a linear scan of the binding
//! table, and at most one synchronous modal-confirm call — because the OS
//! enforces a time budget on interception callbacks and silently disables a
//! tap that exceeds it. Everything slow (the capability probe, per-display
//! pre-capture, handler invocation) happens on a spawned worker thread after
//! the callback has already consumed the keystroke.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rdev::{Event, EventType, Key};
use thiserror::Error;

use crate::capture::{CaptureEngine, CaptureMode};
use crate::geometry::Point;
use crate::permissions::{self, InterceptProbe};

/// Modifier keys active alongside a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub command: bool,
    pub shift: bool,
    pub option: bool,
    pub control: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.command || self.shift || self.option || self.control)
    }
}

/// One parsed shortcut bound to a capture mode. Built once from a textual
/// spec; immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct HotkeyBinding {
    pub key: Key,
    pub modifiers: Modifiers,
    pub mode: CaptureMode,
}

/// Errors rejected at binding construction time, never at match time.
#[derive(Debug, Error, PartialEq)]
pub enum ShortcutParseError {
    #[error("Empty shortcut spec")]
    Empty,

    #[error("Unknown token '{0}' in shortcut spec")]
    UnknownToken(String),

    #[error("Shortcut spec has no key, only modifiers")]
    MissingKey,

    #[error("Shortcut spec has more than one key")]
    MultipleKeys,

    #[error("Shortcut spec has no modifiers; a bare key cannot be a global shortcut")]
    MissingModifiers,
}

/// Parse a `"cmd+shift+1"`-style spec into a binding for `mode`.
pub fn parse_shortcut(
    spec: &str,
    mode: CaptureMode,
) -> Result<HotkeyBinding, ShortcutParseError> {
    if spec.trim().is_empty() {
        return Err(ShortcutParseError::Empty);
    }
    let mut modifiers = Modifiers::default();
    let mut key: Option<Key> = None;
    for token in spec.split('+') {
        let token = token.trim().to_ascii_lowercase();
        match token.as_str() {
            "cmd" | "command" | "super" | "meta" => modifiers.command = true,
            "shift" => modifiers.shift = true,
            "alt" | "option" | "opt" => modifiers.option = true,
            "ctrl" | "control" => modifiers.control = true,
            other => {
                let parsed =
                    key_from_token(other).ok_or_else(|| {
                        ShortcutParseError::UnknownToken(other.to_string())
                    })?;
                if key.replace(parsed).is_some() {
                    return Err(ShortcutParseError::MultipleKeys);
                }
            }
        }
    }
    let key = key.ok_or(ShortcutParseError::MissingKey)?;
    if modifiers.is_empty() {
        return Err(ShortcutParseError::MissingModifiers);
    }
    Ok(HotkeyBinding {
        key,
        modifiers,
        mode,
    })
}

fn key_from_token(token: &str) -> Option<Key> {
    let key = match token {
        "a" => Key::KeyA,
        "b" => Key::KeyB,
        "c" => Key::KeyC,
        "d" => Key::KeyD,
        "e" => Key::KeyE,
        "f" => Key::KeyF,
        "g" => Key::KeyG,
        "h" => Key::KeyH,
        "i" => Key::KeyI,
        "j" => Key::KeyJ,
        "k" => Key::KeyK,
        "l" => Key::KeyL,
        "m" => Key::KeyM,
        "n" => Key::KeyN,
        "o" => Key::KeyO,
        "p" => Key::KeyP,
        "q" => Key::KeyQ,
        "r" => Key::KeyR,
        "s" => Key::KeyS,
        "t" => Key::KeyT,
        "u" => Key::KeyU,
        "v" => Key::KeyV,
        "w" => Key::KeyW,
        "x" => Key::KeyX,
        "y" => Key::KeyY,
        "z" => Key::KeyZ,
        "0" => Key::Num0,
        "1" => Key::Num1,
        "2" => Key::Num2,
        "3" => Key::Num3,
        "4" => Key::Num4,
        "5" => Key::Num5,
        "6" => Key::Num6,
        "7" => Key::Num7,
        "8" => Key::Num8,
        "9" => Key::Num9,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "space" => Key::Space,
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        _ => return None,
    };
    Some(key)
}

/// Tracks held modifier keys across tap events. Interception events carry no
/// modifier state of their own, so the tap reconstructs it from the press
/// and release stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModifierTracker {
    state: Modifiers,
}

impl ModifierTracker {
    pub fn update(&mut self, key: Key, pressed: bool) {
        match key {
            Key::MetaLeft | Key::MetaRight => self.state.command = pressed,
            Key::ShiftLeft | Key::ShiftRight => self.state.shift = pressed,
            Key::Alt | Key::AltGr => self.state.option = pressed,
            Key::ControlLeft | Key::ControlRight => self.state.control = pressed,
            _ => {}
        }
    }

    pub fn current(&self) -> Modifiers {
        self.state
    }
}

/// What the tap does with one key-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDispatch {
    /// No binding matched; forward the event to the foreground app.
    PassThrough,
    /// The matched binding's mode equals the active modal session's mode:
    /// confirm that session instead of starting a new one.
    ConfirmModal,
    /// Consume the keystroke and kick off a pre-capture + handler for this
    /// mode.
    Trigger(CaptureMode),
}

/// Pure binding-match decision for one key-down. Linear scan, exact
/// `(key, modifiers)` equality.
pub fn dispatch_key(
    bindings: &[HotkeyBinding],
    key: Key,
    modifiers: Modifiers,
    modal_mode: Option<CaptureMode>,
) -> KeyDispatch {
    for binding in bindings {
        if binding.key == key && binding.modifiers == modifiers {
            return if modal_mode == Some(binding.mode) {
                KeyDispatch::ConfirmModal
            } else {
                KeyDispatch::Trigger(binding.mode)
            };
        }
    }
    KeyDispatch::PassThrough
}

#[derive(Debug, Error)]
pub enum TapError {
    #[error("Hotkey tap already running")]
    AlreadyRunning,

    #[error("Failed to construct keyboard tap: {0}")]
    ConstructionFailed(String),
}

type Handler = Arc<dyn Fn() + Send + Sync>;

struct TapState {
    bindings: Vec<HotkeyBinding>,
    handlers: HashMap<CaptureMode, Handler>,
    /// Active modal selection session, if any: its mode plus the confirm
    /// callback its own shortcut re-press should invoke.
    modal: Option<(CaptureMode, Handler)>,
    tracker: ModifierTracker,
}

/// Whether a real tap is alive in this process. The interception resource is
/// a single system-wide handle, so a running tap doubles as proof that
/// construction works and the listen-only probe can be skipped.
static TAP_ALIVE: AtomicBool = AtomicBool::new(false);

/// Owns the live interception resource, the binding table, and the per-mode
/// handler table.
pub struct HotkeyInterceptor {
    engine: Arc<CaptureEngine>,
    state: Arc<Mutex<TapState>>,
    pointer: Arc<Mutex<Option<Point>>>,
    stop: Arc<AtomicBool>,
    tap_thread: Option<JoinHandle<()>>,
}

impl HotkeyInterceptor {
    pub fn new(engine: Arc<CaptureEngine>) -> Self {
        let pointer = engine.pointer_hint();
        Self {
            engine,
            state: Arc::new(Mutex::new(TapState {
                bindings: Vec::new(),
                handlers: HashMap::new(),
                modal: None,
                tracker: ModifierTracker::default(),
            })),
            pointer,
            stop: Arc::new(AtomicBool::new(false)),
            tap_thread: None,
        }
    }

    /// Replace the binding table.
    pub fn register_bindings(&self, bindings: Vec<HotkeyBinding>) {
        self.lock_state().bindings = bindings;
    }

    /// Register the handler invoked (off the tap thread, after pre-capture)
    /// when `mode`'s shortcut fires.
    pub fn set_handler(&self, mode: CaptureMode, handler: impl Fn() + Send + Sync + 'static) {
        self.lock_state().handlers.insert(mode, Arc::new(handler));
    }

    /// Mark a modal selection session as active: while set, a re-press of
    /// `mode`'s own shortcut confirms the session (synchronously, inside the
    /// tap callback) instead of restarting it.
    pub fn set_modal_confirm(
        &self,
        mode: CaptureMode,
        confirm: impl Fn() + Send + Sync + 'static,
    ) {
        self.lock_state().modal = Some((mode, Arc::new(confirm)));
    }

    pub fn clear_modal_confirm(&self) {
        self.lock_state().modal = None;
    }

    /// Start the tap thread. Only one tap may be alive per process.
    pub fn start(&mut self) -> Result<(), TapError> {
        if self.tap_thread.is_some() {
            return Err(TapError::AlreadyRunning);
        }

        let state = self.state.clone();
        let engine = self.engine.clone();
        let pointer = self.pointer.clone();
        let stop = self.stop.clone();
        stop.store(false, Ordering::SeqCst);
        let (startup_tx, startup_rx) = mpsc::channel::<String>();

        let handle = thread::spawn(move || {
            let callback = move |event: Event| -> Option<Event> {
                if stop.load(Ordering::SeqCst) {
                    return Some(event);
                }
                handle_tap_event(event, &state, &engine, &pointer)
            };
            // grab() blocks for the life of the tap; it only returns on a
            // construction or runtime error.
            if let Err(e) = rdev::grab(callback) {
                let _ = startup_tx.send(format!("{:?}", e));
            }
            TAP_ALIVE.store(false, Ordering::SeqCst);
        });

        // grab() reports permission problems by returning promptly; give it
        // a beat to fail before declaring the tap live.
        match startup_rx.recv_timeout(Duration::from_millis(300)) {
            Ok(err) => {
                let _ = handle.join();
                Err(TapError::ConstructionFailed(err))
            }
            Err(_) => {
                TAP_ALIVE.store(true, Ordering::SeqCst);
                self.tap_thread = Some(handle);
                log::info!("Hotkey tap running");
                Ok(())
            }
        }
    }

    /// Stop dispatching. rdev's grab has no clean shutdown, so the tap
    /// thread keeps running until the process exits; the stop flag makes it
    /// pass every event through untouched.
    pub fn teardown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        TAP_ALIVE.store(false, Ordering::SeqCst);
        self.tap_thread = None;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TapState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for HotkeyInterceptor {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Per-event tap work. Returning `None` consumes the event.
fn handle_tap_event(
    event: Event,
    state: &Arc<Mutex<TapState>>,
    engine: &Arc<CaptureEngine>,
    pointer: &Arc<Mutex<Option<Point>>>,
) -> Option<Event> {
    match event.event_type {
        EventType::MouseMove { x, y } => {
            *pointer.lock().unwrap_or_else(|e| e.into_inner()) = Some(Point::new(x, y));
            Some(event)
        }
        EventType::KeyRelease(key) => {
            state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .tracker
                .update(key, false);
            Some(event)
        }
        EventType::KeyPress(key) => {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
            guard.tracker.update(key, true);
            let modifiers = guard.tracker.current();
            let modal_mode = guard.modal.as_ref().map(|(mode, _)| *mode);
            match dispatch_key(&guard.bindings, key, modifiers, modal_mode) {
                KeyDispatch::PassThrough => Some(event),
                KeyDispatch::ConfirmModal => {
                    // Synchronous by contract: the session must be confirmed
                    // before any further event is processed.
                    let confirm = guard.modal.as_ref().map(|(_, f)| f.clone());
                    drop(guard);
                    if let Some(confirm) = confirm {
                        confirm();
                    }
                    None
                }
                KeyDispatch::Trigger(mode) => {
                    let handler = guard.handlers.get(&mode).cloned();
                    drop(guard);
                    spawn_precapture(engine.clone(), mode, handler);
                    None
                }
            }
        }
        _ => Some(event),
    }
}

/// Off-thread pre-capture orchestration: probe capture viability, snapshot
/// every display into the pending-capture cache, then hand control to the
/// mode handler. The tap callback has already returned by the time any of
/// this runs.
fn spawn_precapture(engine: Arc<CaptureEngine>, mode: CaptureMode, handler: Option<Handler>) {
    thread::spawn(move || {
        if engine.probe_capture() {
            if let Err(e) = engine.precapture_all() {
                log::warn!("Pre-capture failed: {}", e);
            }
        } else {
            log::warn!("Capture permission absent; skipping pre-capture");
        }
        match handler {
            Some(handler) => handler(),
            None => log::warn!("No handler registered for {} mode", mode.label()),
        }
    });
}

/// Real [`InterceptProbe`]: declarative stage via the OS query, authoritative
/// stage by constructing a listen-only tap.
pub struct RdevProbe;

impl RdevProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RdevProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of the one listen-only construction attempt. rdev's listen thread
/// cannot be torn down once started, so the probe runs at most once per
/// process and the answer is cached.
static LISTEN_PROBE: OnceLock<bool> = OnceLock::new();

impl InterceptProbe for RdevProbe {
    fn declarative_check(&self) -> bool {
        permissions::declarative_intercept_check()
    }

    fn construct_listen_probe(&self) -> bool {
        // A live tap is the interception resource; its existence already
        // proves construction works, and a second resource must not be
        // created alongside it.
        if TAP_ALIVE.load(Ordering::SeqCst) {
            return true;
        }
        *LISTEN_PROBE.get_or_init(|| {
            let (tx, rx) = mpsc::channel::<()>();
            thread::spawn(move || {
                // Listen-only and inert: the callback drops every event.
                if rdev::listen(|_| {}).is_err() {
                    let _ = tx.send(());
                }
            });
            // A prompt error means construction failed despite whatever the
            // declarative stage claimed.
            rx.recv_timeout(Duration::from_millis(300)).is_err()
        })
    }
}
