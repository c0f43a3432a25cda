// Per-id arm/fire state machine
// Tracks which timer token is live for each id so stale fires can be recognised

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::platform::TimerPrecision;
use super::{NotificationError, NotificationId, NotificationResult, TimerToken};

/// Where one scheduled id currently is in the weekly cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleState {
    /// Not scheduled, or cancelled; fires are ignored
    Idle,
    /// Exactly one host timer is registered for the id
    Armed {
        fire_at: DateTime<Utc>,
        precision: TimerPrecision,
        token: TimerToken,
    },
    /// The timer fired and the successor is not registered yet
    Fired { at: DateTime<Utc> },
}

impl ScheduleState {
    /// Valid state transitions
    pub fn can_transition_to(&self, target: &ScheduleState) -> bool {
        use ScheduleState::*;

        match (self, target) {
            (Idle, Armed { .. }) => true,

            // Rescheduling replaces the pending timer
            (Armed { .. }, Armed { .. }) => true,
            (Armed { .. }, Fired { .. }) => true,
            (Armed { .. }, Idle) => true,

            (Fired { .. }, Armed { .. }) => true,
            (Fired { .. }, Idle) => true,

            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, ScheduleState::Armed { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ScheduleState::Idle)
    }

    /// Token of the live timer, if any
    pub fn token(&self) -> Option<TimerToken> {
        match self {
            ScheduleState::Armed { token, .. } => Some(*token),
            _ => None,
        }
    }

    pub fn fire_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ScheduleState::Armed { fire_at, .. } => Some(*fire_at),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ScheduleState::Idle => "idle",
            ScheduleState::Armed { .. } => "armed",
            ScheduleState::Fired { .. } => "fired",
        }
    }
}

/// Why a transition happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionReason {
    /// First arm from `schedule_weekly`
    Scheduled,
    /// `schedule_weekly` replaced an armed timer
    Rescheduled,
    Fired,
    /// Successor armed after a fire
    Rearmed,
    /// Armed by the boot collaborator
    Recovered,
    Cancelled,
    /// A fire arrived for an id this process was not tracking
    Adopted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ScheduleState,
    pub to: ScheduleState,
    pub at: DateTime<Utc>,
    pub reason: TransitionReason,
}

/// State plus bounded transition history for one id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleLifecycle {
    pub id: NotificationId,
    pub state: ScheduleState,
    pub history: Vec<StateTransition>,
    history_limit: usize,
}

impl ScheduleLifecycle {
    pub fn new(id: NotificationId, history_limit: usize) -> Self {
        Self {
            id,
            state: ScheduleState::Idle,
            history: Vec::new(),
            history_limit,
        }
    }

    /// Lifecycle for a timer armed by an earlier process
    ///
    /// The token of the incoming fire is taken as the live one.
    pub fn adopted(
        id: NotificationId,
        token: TimerToken,
        fire_at: DateTime<Utc>,
        at: DateTime<Utc>,
        history_limit: usize,
    ) -> Self {
        let mut lifecycle = Self::new(id, history_limit);
        let state = ScheduleState::Armed {
            fire_at,
            precision: TimerPrecision::Inexact,
            token,
        };
        lifecycle.record(state, at, TransitionReason::Adopted);
        lifecycle
    }

    /// Transition to a new state, rejecting moves the state machine does not allow
    pub fn transition_to(
        &mut self,
        new_state: ScheduleState,
        at: DateTime<Utc>,
        reason: TransitionReason,
    ) -> NotificationResult<()> {
        if !self.state.can_transition_to(&new_state) {
            return Err(NotificationError::malformed(
                format!("lifecycle[{}]", self.id),
                format!(
                    "invalid transition from {} to {} ({:?})",
                    self.state.label(),
                    new_state.label(),
                    reason
                ),
            ));
        }
        self.record(new_state, at, reason);
        Ok(())
    }

    fn record(&mut self, new_state: ScheduleState, at: DateTime<Utc>, reason: TransitionReason) {
        tracing::debug!(
            id = %self.id,
            from = self.state.label(),
            to = new_state.label(),
            reason = ?reason,
            "Lifecycle transition"
        );
        let from = std::mem::replace(&mut self.state, new_state);
        self.history.push(StateTransition {
            from,
            to: self.state.clone(),
            at,
            reason,
        });
        if self.history.len() > self.history_limit {
            let excess = self.history.len() - self.history_limit;
            self.history.drain(..excess);
        }
    }

    /// Whether `token` identifies the currently armed timer
    pub fn is_live(&self, token: TimerToken) -> bool {
        self.state.token() == Some(token)
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.history.last()
    }
}

/// Lifecycles for every id the engine has touched
#[derive(Debug, Clone)]
pub struct LifecycleTable {
    entries: HashMap<NotificationId, ScheduleLifecycle>,
    history_limit: usize,
}

impl LifecycleTable {
    pub fn new(history_limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            history_limit,
        }
    }

    pub fn get(&self, id: NotificationId) -> Option<&ScheduleLifecycle> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: NotificationId) -> Option<&mut ScheduleLifecycle> {
        self.entries.get_mut(&id)
    }

    pub fn entry(&mut self, id: NotificationId) -> &mut ScheduleLifecycle {
        let limit = self.history_limit;
        self.entries
            .entry(id)
            .or_insert_with(|| ScheduleLifecycle::new(id, limit))
    }

    pub fn insert(&mut self, lifecycle: ScheduleLifecycle) {
        self.entries.insert(lifecycle.id, lifecycle);
    }

    pub fn state(&self, id: NotificationId) -> ScheduleState {
        self.entries
            .get(&id)
            .map(|l| l.state.clone())
            .unwrap_or(ScheduleState::Idle)
    }

    /// Move `id` to `Idle` if it is not already there
    pub fn disarm(&mut self, id: NotificationId, at: DateTime<Utc>) -> NotificationResult<()> {
        match self.entries.get_mut(&id) {
            Some(lifecycle) if !lifecycle.state.is_idle() => {
                lifecycle.transition_to(ScheduleState::Idle, at, TransitionReason::Cancelled)
            },
            _ => Ok(()),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = NotificationId> + '_ {
        self.entries.keys().copied()
    }

    /// Ids currently holding a host timer
    pub fn armed_ids(&self) -> Vec<NotificationId> {
        let mut ids: Vec<_> = self
            .entries
            .values()
            .filter(|l| l.state.is_armed())
            .map(|l| l.id)
            .collect();
        ids.sort();
        ids
    }
}
