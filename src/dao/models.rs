use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of participant slots every game exposes.
pub const SLOTS_PER_GAME: usize = 4;

/// Identity of a participant on the messaging platform (a chat user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub i64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Scheduled start of the game.
    pub starts_at: SystemTime,
    /// Planned length of the game in minutes.
    pub duration_minutes: u32,
    /// Venue description.
    pub location: String,
    /// Court number at the venue, when known.
    pub court: Option<u32>,
    /// Slot assignments, always [`SLOTS_PER_GAME`] entries long.
    pub slots: Vec<Option<ParticipantId>>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Participant who created the game and may delete it.
    pub owner: ParticipantId,
}

impl GameEntity {
    /// Build a game with every slot empty.
    pub fn new(
        starts_at: SystemTime,
        duration_minutes: u32,
        location: String,
        court: Option<u32>,
        owner: ParticipantId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            starts_at,
            duration_minutes,
            location,
            court,
            slots: vec![None; SLOTS_PER_GAME],
            created_at: SystemTime::now(),
            owner,
        }
    }

    /// Whether the game has started at `now`.
    pub fn has_started(&self, now: SystemTime) -> bool {
        self.starts_at <= now
    }

    /// Index of the slot held by `participant`, if any.
    pub fn slot_of(&self, participant: ParticipantId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| *slot == Some(participant))
    }

    /// Lowest-index empty slot.
    pub fn first_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Participants in slot order, skipping empty slots.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.participants().count()
    }

    /// Number of empty slots.
    pub fn free_slots(&self) -> usize {
        self.slots.len() - self.occupied()
    }
}

/// Dispatch status of a reminder record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Not yet delivered; eligible for (re)dispatch.
    Pending,
    /// Delivered to every reachable participant. Terminal.
    Sent,
    /// Gave up after exhausting attempts or on a non-retryable failure. Terminal.
    FailedPermanent,
}

impl ReminderStatus {
    /// Whether no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReminderStatus::Pending)
    }
}

/// Reminder bookkeeping for one `(game, offset)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderEntity {
    /// Game the reminder belongs to.
    pub game_id: Uuid,
    /// Identifier of the configured offset (e.g. `"3h"`).
    pub offset_id: String,
    /// Current dispatch status.
    pub status: ReminderStatus,
    /// Dispatch attempts made so far.
    pub attempts: u32,
    /// When the last dispatch attempt finished.
    pub last_attempt_at: Option<SystemTime>,
    /// Token of the scheduler run currently owning the record.
    pub claim_token: Option<Uuid>,
    /// Claim lease expiry; after it passes the record can be claimed again.
    pub claimed_until: Option<SystemTime>,
    /// Participants who confirmed delivery.
    pub delivered_to: Vec<ParticipantId>,
    /// Participants the sink reported as permanently unreachable.
    pub undeliverable: Vec<ParticipantId>,
}

impl ReminderEntity {
    /// Fresh pending record claimed by `token` until `claimed_until`.
    pub fn claimed(
        game_id: Uuid,
        offset_id: impl Into<String>,
        token: Uuid,
        claimed_until: SystemTime,
    ) -> Self {
        Self {
            game_id,
            offset_id: offset_id.into(),
            status: ReminderStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            claim_token: Some(token),
            claimed_until: Some(claimed_until),
            delivered_to: Vec::new(),
            undeliverable: Vec::new(),
        }
    }

    /// Whether a claim lease is active at `now`.
    pub fn is_claimed(&self, now: SystemTime) -> bool {
        self.claimed_until.is_some_and(|until| until > now)
    }

    /// Whether `participant` was already handled by an earlier attempt.
    pub fn has_handled(&self, participant: ParticipantId) -> bool {
        self.delivered_to.contains(&participant) || self.undeliverable.contains(&participant)
    }
}

/// Outcome of a dispatch attempt written back by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderUpdate {
    /// Game of the record to update.
    pub game_id: Uuid,
    /// Offset of the record to update.
    pub offset_id: String,
    /// Claim token the write is conditioned on.
    pub claim_token: Uuid,
    /// Status after this attempt.
    pub status: ReminderStatus,
    /// Attempt counter after this attempt.
    pub attempts: u32,
    /// Unchanged when the claim is released without an attempt.
    pub last_attempt_at: Option<SystemTime>,
    /// Every participant delivered so far, including earlier attempts.
    pub delivered_to: Vec<ParticipantId>,
    /// Every participant found unreachable so far.
    pub undeliverable: Vec<ParticipantId>,
}

/// Half-open interval `(from, until]` of game start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Exclusive lower bound.
    pub from: SystemTime,
    /// Inclusive upper bound; unbounded when `None`.
    pub until: Option<SystemTime>,
}

impl TimeWindow {
    /// Every game starting after `from`.
    pub fn after(from: SystemTime) -> Self {
        Self { from, until: None }
    }

    /// Games starting after `from` and no later than `until`.
    pub fn between(from: SystemTime, until: SystemTime) -> Self {
        Self {
            from,
            until: Some(until),
        }
    }

    /// Whether `instant` lies inside the window.
    pub fn contains(&self, instant: SystemTime) -> bool {
        instant > self.from && self.until.is_none_or(|until| instant <= until)
    }
}

/// Filters and paging of a game listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameQuery {
    /// Start times to include.
    pub window: TimeWindow,
    /// Keep only games with at least one empty slot.
    pub free_only: bool,
    /// Leave out games this participant already plays in.
    pub exclude_participant: Option<ParticipantId>,
    /// Matching games skipped before the page starts.
    pub offset: usize,
    /// Maximum number of games returned.
    pub limit: usize,
}

impl GameQuery {
    /// Whether `game` passes every filter; paging is not considered.
    pub fn matches(&self, game: &GameEntity) -> bool {
        self.window.contains(game.starts_at)
            && (!self.free_only || game.free_slots() > 0)
            && self
                .exclude_participant
                .is_none_or(|participant| game.slot_of(participant).is_none())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn game() -> GameEntity {
        GameEntity::new(
            SystemTime::now() + Duration::from_secs(3600),
            120,
            "Padel Club".into(),
            Some(2),
            ParticipantId(1),
        )
    }

    #[test]
    fn new_game_has_all_slots_empty() {
        let game = game();
        assert_eq!(game.slots.len(), SLOTS_PER_GAME);
        assert_eq!(game.first_free_slot(), Some(0));
        assert_eq!(game.free_slots(), SLOTS_PER_GAME);
    }

    #[test]
    fn slot_helpers_skip_empty_slots() {
        let mut game = game();
        game.slots[1] = Some(ParticipantId(7));
        game.slots[3] = Some(ParticipantId(9));

        assert_eq!(game.slot_of(ParticipantId(9)), Some(3));
        assert_eq!(game.slot_of(ParticipantId(8)), None);
        assert_eq!(game.first_free_slot(), Some(0));
        assert_eq!(
            game.participants().collect::<Vec<_>>(),
            vec![ParticipantId(7), ParticipantId(9)]
        );
        assert_eq!(game.free_slots(), 2);
    }

    #[test]
    fn window_bounds_are_half_open() {
        let from = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let window = TimeWindow::between(from, from + Duration::from_secs(10));
        assert!(!window.contains(from));
        assert!(window.contains(from + Duration::from_secs(10)));
        assert!(!window.contains(from + Duration::from_secs(11)));
        assert!(TimeWindow::after(from).contains(from + Duration::from_secs(1_000_000)));
    }
}
