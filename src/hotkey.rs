//! Capture trigger and global hotkey handling
//!
//! A hotkey press requests exactly one frame. Requests go through a
//! single-slot channel: while one is pending further presses are dropped.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long the listener waits for an event before checking for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Parse a combination like "F9", "Ctrl+Shift+P" or "Alt+F1"
pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    let mut modifiers = Modifiers::empty();
    let mut key_code: Option<Code> = None;

    for part in hotkey_str.split('+').map(str::trim) {
        let upper = part.to_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => modifiers |= Modifiers::CONTROL,
            "SHIFT" => modifiers |= Modifiers::SHIFT,
            "ALT" => modifiers |= Modifiers::ALT,
            "WIN" | "SUPER" | "META" => modifiers |= Modifiers::SUPER,
            _ if key_code.is_some() => {
                return Err(anyhow!("More than one key in hotkey '{}'", hotkey_str));
            }
            _ => key_code = Some(parse_key_code(&upper)?),
        }
    }

    let code = key_code.ok_or_else(|| anyhow!("No key code found in hotkey string"))?;
    Ok(HotKey::new(Some(modifiers), code))
}

/// Parse a key code string into a Code enum
fn parse_key_code(key: &str) -> Result<Code> {
    let code = match key {
        // Function keys
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,

        // Letters
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,

        // Numbers
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,

        // Special keys
        "SPACE" => Code::Space,
        "ENTER" | "RETURN" => Code::Enter,
        "TAB" => Code::Tab,
        "ESCAPE" | "ESC" => Code::Escape,
        "BACKSPACE" => Code::Backspace,
        "DELETE" | "DEL" => Code::Delete,
        "INSERT" | "INS" => Code::Insert,
        "HOME" => Code::Home,
        "END" => Code::End,
        "PAGEUP" | "PGUP" => Code::PageUp,
        "PAGEDOWN" | "PGDN" => Code::PageDown,
        "UP" => Code::ArrowUp,
        "DOWN" => Code::ArrowDown,
        "LEFT" => Code::ArrowLeft,
        "RIGHT" => Code::ArrowRight,

        // Numpad
        "NUMPAD0" | "NUM0" => Code::Numpad0,
        "NUMPAD1" | "NUM1" => Code::Numpad1,
        "NUMPAD2" | "NUM2" => Code::Numpad2,
        "NUMPAD3" | "NUM3" => Code::Numpad3,
        "NUMPAD4" | "NUM4" => Code::Numpad4,
        "NUMPAD5" | "NUM5" => Code::Numpad5,
        "NUMPAD6" | "NUM6" => Code::Numpad6,
        "NUMPAD7" | "NUM7" => Code::Numpad7,
        "NUMPAD8" | "NUM8" => Code::Numpad8,
        "NUMPAD9" | "NUM9" => Code::Numpad9,

        _ => return Err(anyhow!("Unknown key code: {}", key)),
    };

    Ok(code)
}

/// Create a connected trigger pair holding at most one pending request
pub fn capture_trigger() -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = bounded(1);
    (
        TriggerSender { tx },
        TriggerReceiver {
            rx,
            every_frame: false,
        },
    )
}

/// Producer side, owned by the hotkey listener
#[derive(Debug, Clone)]
pub struct TriggerSender {
    tx: Sender<()>,
}

impl TriggerSender {
    /// Request a capture. Returns false if one is already pending.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Disconnected(())) => {
                debug!("Capture trigger receiver is gone");
                false
            }
        }
    }
}

/// Consumer side, polled by the capture callback
#[derive(Debug)]
pub struct TriggerReceiver {
    rx: Receiver<()>,
    every_frame: bool,
}

impl TriggerReceiver {
    /// Receiver that hands every frame to the pipeline
    pub fn every_frame() -> Self {
        let (_, rx) = bounded(1);
        Self {
            rx,
            every_frame: true,
        }
    }

    /// Consume the pending request, if any
    pub fn take(&self) -> bool {
        self.every_frame || self.rx.try_recv().is_ok()
    }
}

/// Background thread that turns hotkey presses into capture requests
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HotkeyListener {
    /// Register `hotkey_str` and start listening.
    ///
    /// The hotkey is registered on the listener thread (the platform binds it
    /// to that thread's message queue); registration errors are returned here.
    pub fn spawn(hotkey_str: &str, trigger: TriggerSender) -> Result<Self> {
        let hotkey = parse_hotkey(hotkey_str)
            .with_context(|| format!("Invalid trigger hotkey '{}'", hotkey_str))?;
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name("hotkey".to_string())
            .spawn(move || {
                let manager = match register(hotkey) {
                    Ok(manager) => {
                        let _ = ready_tx.send(Ok(()));
                        manager
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                listen(hotkey.id(), &trigger, &thread_stop);
                let _ = manager.unregister(hotkey);
            })
            .context("Failed to start hotkey thread")?;

        let mut listener = Self {
            stop,
            handle: Some(handle),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Registered capture hotkey: {}", hotkey_str);
                Ok(listener)
            }
            Ok(Err(e)) => {
                listener.shutdown();
                Err(e)
            }
            Err(_) => {
                listener.shutdown();
                Err(anyhow!("Hotkey thread exited during registration"))
            }
        }
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Hotkey thread panicked");
            }
        }
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn register(hotkey: HotKey) -> Result<GlobalHotKeyManager> {
    let manager = GlobalHotKeyManager::new()
        .map_err(|e| anyhow!("Failed to create hotkey manager: {:?}", e))?;
    manager
        .register(hotkey)
        .map_err(|e| anyhow!("Failed to register hotkey: {:?}", e))?;
    Ok(manager)
}

fn listen(id: u32, trigger: &TriggerSender, stop: &AtomicBool) {
    let events = GlobalHotKeyEvent::receiver();
    while !stop.load(Ordering::Relaxed) {
        pump_messages();
        let Ok(event) = events.recv_timeout(POLL_INTERVAL) else {
            continue;
        };
        if event.id != id || event.state != HotKeyState::Pressed {
            continue;
        }
        if trigger.request() {
            info!("Capture requested");
        } else {
            warn!("Capture already pending, hotkey press ignored");
        }
    }
}

/// Hotkey events on Windows are delivered through the thread message queue
#[cfg(windows)]
fn pump_messages() {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    };

    let mut msg = MSG::default();
    // SAFETY: msg is a valid out pointer for the duration of each call
    unsafe {
        while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            let _ = DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(windows))]
fn pump_messages() {}
