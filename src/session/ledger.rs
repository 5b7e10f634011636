// src/session/ledger.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{MAX_TAB_SWITCHES, MAX_VIOLATIONS};

/// Classification of a recorded violation.
///
/// Tab-switch violations (visibility loss, focus loss, fullscreen loss) feed
/// a second, stricter counter on top of the overall one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    TabSwitch,
    Standard,
}

/// A single integrity event, as it will be persisted with the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEntry {
    pub at: DateTime<Utc>,
    pub description: String,
    pub kind: ViolationKind,
}

/// Why an active session stopped accepting input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    ExcessiveTabSwitching,
    ExcessiveViolations,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::ExcessiveTabSwitching => write!(f, "excessive tab switching"),
            TerminationReason::ExcessiveViolations => write!(f, "excessive violations"),
        }
    }
}

/// One row of the termination policy.
struct TerminationRule {
    counter: fn(&ViolationLedger) -> u32,
    threshold: u32,
    reason: TerminationReason,
}

/// The whole policy lives in this table. Rules are evaluated in order after
/// every append; the first counter at or past its threshold wins.
const TERMINATION_RULES: &[TerminationRule] = &[
    TerminationRule {
        counter: ViolationLedger::tab_switches,
        threshold: MAX_TAB_SWITCHES,
        reason: TerminationReason::ExcessiveTabSwitching,
    },
    TerminationRule {
        counter: ViolationLedger::total_violations,
        threshold: MAX_VIOLATIONS,
        reason: TerminationReason::ExcessiveViolations,
    },
];

/// Append-only record of integrity events for one session.
///
/// Counters are derived from the entries rather than stored, so the numbers
/// that drive termination are the same ones that get displayed and persisted.
#[derive(Debug, Default, Clone)]
pub struct ViolationLedger {
    entries: Vec<ViolationEntry>,
}

impl ViolationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and re-evaluates the termination policy.
    pub fn record(&mut self, kind: ViolationKind, description: String) -> Option<TerminationReason> {
        self.entries.push(ViolationEntry {
            at: Utc::now(),
            description,
            kind,
        });
        self.breached()
    }

    pub fn entries(&self) -> &[ViolationEntry] {
        &self.entries
    }

    pub fn total_violations(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn tab_switches(&self) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.kind == ViolationKind::TabSwitch)
            .count() as u32
    }

    fn breached(&self) -> Option<TerminationReason> {
        TERMINATION_RULES
            .iter()
            .find(|rule| (rule.counter)(self) >= rule.threshold)
            .map(|rule| rule.reason)
    }
}
