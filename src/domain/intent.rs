//! Order intents and the emitter that produces them.
//!
//! An [`Intent`] is what the engine wants done; it is not an order and carries no execution
//! detail. The execution collaborator answers each intent with a [`Fill`], which the ledger
//! treats as authoritative.

use chrono::NaiveDateTime;
use std::fmt;

use super::position::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemId {
    System1,
    System2,
}

impl SystemId {
    /// Evaluation order within one bar.
    pub const ALL: [SystemId; 2] = [SystemId::System1, SystemId::System2];

    pub fn index(self) -> usize {
        match self {
            SystemId::System1 => 0,
            SystemId::System2 => 1,
        }
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemId::System1 => write!(f, "system1"),
            SystemId::System2 => write!(f, "system2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Open,
    Add,
    Exit,
    StopOut,
}

impl Action {
    /// Open and Add grow the position; Exit and StopOut close all of it.
    pub fn is_entry(self) -> bool {
        matches!(self, Action::Open | Action::Add)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Open => write!(f, "open"),
            Action::Add => write!(f, "add"),
            Action::Exit => write!(f, "exit"),
            Action::StopOut => write!(f, "stop_out"),
        }
    }
}

/// An unsized decision from a system engine or the risk manager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub action: Action,
    pub side: Side,
    pub reference_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub timestamp: NaiveDateTime,
    pub system: SystemId,
    pub action: Action,
    pub side: Side,
    /// Always positive; direction lives in `side` and `action`.
    pub size: f64,
    pub reference_price: f64,
}

/// Execution report for an intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub size: f64,
}

impl Fill {
    /// A fill at exactly the intent's reference price and size.
    pub fn at_reference(intent: &Intent) -> Self {
        Fill {
            price: intent.reference_price,
            size: intent.size,
        }
    }
}

/// One-intent-in-flight guard for a system.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PendingIntent {
    #[default]
    Clear,
    Awaiting(Intent),
}

impl PendingIntent {
    pub fn is_clear(&self) -> bool {
        matches!(self, PendingIntent::Clear)
    }

    /// Take the awaited intent, leaving the guard clear.
    pub fn take(&mut self) -> Option<Intent> {
        match std::mem::take(self) {
            PendingIntent::Clear => None,
            PendingIntent::Awaiting(intent) => Some(intent),
        }
    }
}

/// Turns sized signals into intents and keeps the emission log.
#[derive(Debug, Clone, Default)]
pub struct IntentEmitter {
    emitted: Vec<Intent>,
}

impl IntentEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when `size` is not a positive finite number; no zero-size intent is
    /// ever handed to execution.
    pub fn emit(
        &mut self,
        system: SystemId,
        signal: Signal,
        size: f64,
        timestamp: NaiveDateTime,
    ) -> Option<Intent> {
        if !(size.is_finite() && size > 0.0) {
            tracing::debug!(%system, action = %signal.action, size, "dropping non-positive intent size");
            return None;
        }
        let intent = Intent {
            timestamp,
            system,
            action: signal.action,
            side: signal.side,
            size,
            reference_price: signal.reference_price,
        };
        tracing::info!(
            %timestamp,
            %system,
            action = %intent.action,
            side = %intent.side,
            size,
            price = intent.reference_price,
            "intent"
        );
        self.emitted.push(intent.clone());
        Some(intent)
    }

    pub fn emitted(&self) -> &[Intent] {
        &self.emitted
    }
}
