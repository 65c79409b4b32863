use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::GameEntity,
    dto::{
        format_system_time,
        validation::{validate_future_timestamp, validate_not_blank},
    },
    services::registry::SlotStatus,
};

const DEFAULT_DURATION_MINUTES: u32 = 120;

/// Payload used to announce a new game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Start time as an RFC 3339 timestamp; must be in the future.
    #[validate(custom(function = "validate_future_timestamp"))]
    #[schema(example = "2025-06-01T18:00:00+03:00")]
    pub starts_at: String,
    /// Planned length in minutes (defaults to 120).
    #[serde(default = "default_duration")]
    #[validate(range(min = 30, max = 360))]
    pub duration_minutes: u32,
    /// Venue name or address.
    #[validate(length(min = 1, max = 200), custom(function = "validate_not_blank"))]
    pub location: String,
    /// Court number at the venue.
    #[validate(range(min = 1, max = 99))]
    pub court: Option<u32>,
    /// Participant creating the game; only they can delete it.
    pub owner_id: i64,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

/// Paging and filter parameters for game listings.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page size; the configured default applies when omitted.
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
    /// Number of games to skip.
    #[serde(default)]
    pub offset: usize,
    /// Only list games that still have a free slot.
    #[serde(default)]
    pub free_only: bool,
    /// Hide games this participant is already registered for.
    pub exclude_participant: Option<i64>,
}

/// Public projection of a game and its slot occupancy.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameView {
    pub id: Uuid,
    /// RFC 3339 start time.
    pub starts_at: String,
    pub duration_minutes: u32,
    pub location: String,
    pub court: Option<u32>,
    /// Participant who created the game.
    pub owner_id: i64,
    /// Participant id per slot, `null` when the slot is free.
    pub slots: Vec<Option<i64>>,
    pub free_slots: usize,
    pub full: bool,
    pub started: bool,
    pub created_at: String,
}

impl GameView {
    /// Project `game` as seen at `now`.
    pub fn at(game: GameEntity, now: SystemTime) -> Self {
        let status = SlotStatus::of(&game, now);
        Self {
            id: game.id,
            starts_at: format_system_time(game.starts_at),
            duration_minutes: game.duration_minutes,
            location: game.location,
            court: game.court,
            owner_id: game.owner.0,
            slots: status
                .slots
                .iter()
                .map(|slot| slot.map(|participant| participant.0))
                .collect(),
            free_slots: status.free,
            full: status.is_full(),
            started: status.started,
            created_at: format_system_time(game.created_at),
        }
    }
}
