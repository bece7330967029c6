//! Change notification state machine.
//!
//! ```text
//! Idle --debounced edit--> Debouncing --deadline--> Evaluating --> Idle
//!   \                          |                        ^
//!    \--immediate edit---------+------------------------/
//! ```
//!
//! Evaluation compares the serialized expression with the last emitted one;
//! only a difference is reported.

use std::future::Future;
use std::time::Duration;

use anitools_core::{FilterExpression, Result};
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::debounce::Debouncer;
use crate::widget::Commit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierState {
    Idle,
    Debouncing,
    Evaluating,
}

/// Outcome of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// Same as the last emitted expression.
    Unchanged,
    /// New serialized expression; already recorded as last emitted.
    Changed(String),
}

#[derive(Debug)]
pub struct ChangeNotifier {
    state: NotifierState,
    debouncer: Debouncer,
    last_emitted: Option<String>,
}

impl ChangeNotifier {
    pub fn new(window: Duration) -> Self {
        Self {
            state: NotifierState::Idle,
            debouncer: Debouncer::new(window),
            last_emitted: None,
        }
    }

    pub fn state(&self) -> NotifierState {
        self.state
    }

    pub fn last_emitted(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }

    pub fn window(&self) -> Duration {
        self.debouncer.window()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Resolves at the debounce deadline; pending forever while idle.
    pub fn wait(&self) -> impl Future<Output = ()> {
        self.debouncer.wait()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_armed()
    }

    /// Record a widget change. Returns true when the caller must evaluate
    /// now.
    pub fn on_change(&mut self, commit: Commit) -> bool {
        match commit {
            Commit::Debounced => {
                self.debouncer.arm();
                self.state = NotifierState::Debouncing;
                false
            }
            Commit::Immediate => {
                self.debouncer.cancel();
                self.state = NotifierState::Evaluating;
                true
            }
        }
    }

    /// The debounce deadline passed. Returns true when an evaluation is due.
    pub fn on_deadline(&mut self) -> bool {
        self.debouncer.cancel();
        if self.state != NotifierState::Debouncing {
            return false;
        }
        self.state = NotifierState::Evaluating;
        true
    }

    /// Settle a pending debounce now. Returns true when an evaluation is due.
    pub fn flush(&mut self) -> bool {
        self.on_deadline()
    }

    /// Compare `expr` to the last emitted expression and return to idle.
    pub fn evaluate(&mut self, expr: &FilterExpression) -> Result<Settled> {
        self.debouncer.cancel();
        self.state = NotifierState::Idle;
        let json = expr.to_json()?;
        if self.last_emitted.as_deref() == Some(json.as_str()) {
            trace!("Expression unchanged, suppressing notification");
            return Ok(Settled::Unchanged);
        }
        self.last_emitted = Some(json.clone());
        Ok(Settled::Changed(json))
    }

    /// Adopt `expr` as already emitted and drop any pending debounce.
    pub fn baseline(&mut self, expr: &FilterExpression) -> Result<()> {
        self.debouncer.cancel();
        self.state = NotifierState::Idle;
        self.last_emitted = Some(expr.to_json()?);
        Ok(())
    }

    /// Back to idle with nothing emitted.
    pub fn reset(&mut self) {
        self.debouncer.cancel();
        self.state = NotifierState::Idle;
        self.last_emitted = None;
    }
}
