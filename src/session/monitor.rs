// src/session/monitor.rs

use serde::{Deserialize, Serialize};

use crate::config::POINTER_LEAVE_LIMIT;
use crate::session::ledger::ViolationKind;

/// Host-environment signals the proctoring layer subscribes to while a
/// session is active. The hosting shell (browser, kiosk, native wrapper)
/// translates its raw events into these before they reach the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "signal", content = "detail")]
pub enum EnvSignal {
    /// The page/application lost visibility (e.g. hidden tab).
    VisibilityLost,
    VisibilityRestored,
    /// The window lost input focus.
    FocusLost,
    FocusRestored,
    /// Fullscreen mode was exited.
    FullscreenExited,
    /// A disallowed keyboard shortcut was intercepted, e.g. "Ctrl+C".
    BlockedShortcut(String),
    ContextMenuBlocked,
    CopyBlocked,
    PasteBlocked,
    /// The pointer left the assessment area.
    PointerLeft,
    MultiTouch,
    OrientationChanged,
}

/// A classified integrity event, ready for the ledger.
#[derive(Debug, Clone)]
pub struct Violation {
    pub kind: ViolationKind,
    pub description: String,
}

/// Translates host signals into violations.
///
/// Purely a classifier: it never touches scores, timers, or persistence.
/// Signals that do not map to a known violation (restored visibility/focus,
/// pointer-leaves under the tolerance) produce nothing.
#[derive(Debug, Default)]
pub struct EnvironmentMonitor {
    pointer_leaves: u32,
}

impl EnvironmentMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a signal to at most one violation. `prior_tab_switches` is the
    /// number of tab-switch violations already on the ledger, used to number
    /// the warning message.
    pub fn classify(&mut self, signal: &EnvSignal, prior_tab_switches: u32) -> Option<Violation> {
        match signal {
            EnvSignal::VisibilityLost | EnvSignal::FocusLost => Some(Violation {
                kind: ViolationKind::TabSwitch,
                description: format!("Tab switch detected (#{})", prior_tab_switches + 1),
            }),
            EnvSignal::FullscreenExited => Some(Violation {
                kind: ViolationKind::TabSwitch,
                description: "Exited fullscreen mode".to_string(),
            }),
            EnvSignal::BlockedShortcut(combination) => Some(Violation {
                kind: ViolationKind::Standard,
                description: format!("Blocked keyboard shortcut: {}", combination),
            }),
            EnvSignal::ContextMenuBlocked => Some(Violation {
                kind: ViolationKind::Standard,
                description: "Right-click menu blocked".to_string(),
            }),
            EnvSignal::CopyBlocked => Some(Violation {
                kind: ViolationKind::Standard,
                description: "Copy operation blocked".to_string(),
            }),
            EnvSignal::PasteBlocked => Some(Violation {
                kind: ViolationKind::Standard,
                description: "Paste operation blocked".to_string(),
            }),
            EnvSignal::PointerLeft => {
                self.pointer_leaves += 1;
                if self.pointer_leaves > POINTER_LEAVE_LIMIT {
                    Some(Violation {
                        kind: ViolationKind::Standard,
                        description: "Excessive mouse movement outside test area".to_string(),
                    })
                } else {
                    None
                }
            }
            EnvSignal::MultiTouch => Some(Violation {
                kind: ViolationKind::Standard,
                description: "Multi-touch gesture blocked".to_string(),
            }),
            EnvSignal::OrientationChanged => Some(Violation {
                kind: ViolationKind::Standard,
                description: "Screen orientation changed".to_string(),
            }),
            EnvSignal::VisibilityRestored | EnvSignal::FocusRestored => None,
        }
    }

    pub fn pointer_leaves(&self) -> u32 {
        self.pointer_leaves
    }
}
