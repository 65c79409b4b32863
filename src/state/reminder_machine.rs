use thiserror::Error;

use crate::dao::models::{ReminderEntity, ReminderStatus};

/// Status and attempt counter of one `(game, offset)` reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderState {
    /// Current dispatch status.
    pub status: ReminderStatus,
    /// Dispatch attempts already made.
    pub attempts: u32,
}

impl From<&ReminderEntity> for ReminderState {
    fn from(record: &ReminderEntity) -> Self {
        Self {
            status: record.status,
            attempts: record.attempts,
        }
    }
}

/// Aggregate outcome of a single dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderEvent {
    /// Every reachable recipient confirmed delivery.
    Delivered,
    /// At least one recipient is still owed the reminder and may be retried.
    TransientFailure,
    /// Nobody could be reached and no retry can help.
    PermanentFailure,
}

/// Error returned when an event is applied to a terminal reminder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The state the reminder was in when the event was received.
    pub from: ReminderState,
    /// The event that cannot be applied from this state.
    pub event: ReminderEvent,
}

/// Compute the state following `event`.
///
/// Every event counts as one attempt. A transient failure keeps the reminder
/// pending until `max_attempts` is reached, after which it becomes
/// [`ReminderStatus::FailedPermanent`].
pub fn transition(
    from: ReminderState,
    event: ReminderEvent,
    max_attempts: u32,
) -> Result<ReminderState, InvalidTransition> {
    if from.status.is_terminal() {
        return Err(InvalidTransition { from, event });
    }

    let attempts = from.attempts.saturating_add(1);
    let status = match event {
        ReminderEvent::Delivered => ReminderStatus::Sent,
        ReminderEvent::TransientFailure if attempts < max_attempts => ReminderStatus::Pending,
        ReminderEvent::TransientFailure | ReminderEvent::PermanentFailure => {
            ReminderStatus::FailedPermanent
        }
    };

    Ok(ReminderState { status, attempts })
}
