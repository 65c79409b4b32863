//! Slot allocation for games.
//!
//! The registry never holds game state between calls: each decision re-reads
//! the game and commits through [`GameStore::conditional_set_slot`], which is
//! the only serialization point between concurrent registrants.

use std::{sync::Arc, time::SystemTime};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, ParticipantId, SLOTS_PER_GAME},
    storage::StorageError,
};

/// Conditional write rounds attempted before a contended registration gives up.
const MAX_CLAIM_ROUNDS: usize = SLOTS_PER_GAME * 2;

/// Which slot a registration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRequest {
    /// Lowest-index empty slot.
    Any,
    /// One specific slot.
    Index(usize),
}

impl From<Option<usize>> for SlotRequest {
    fn from(value: Option<usize>) -> Self {
        value.map_or(SlotRequest::Any, SlotRequest::Index)
    }
}

/// Why a registration or release was refused.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// No game with this id.
    #[error("game `{0}` not found")]
    GameNotFound(Uuid),
    /// The game start time has passed.
    #[error("game has already started")]
    GameAlreadyStarted,
    /// No empty slot is left.
    #[error("game is full")]
    GameFull,
    /// The requested slot is occupied, or every claim round lost its race.
    #[error("slot {slot} is already taken")]
    SlotAlreadyTaken { slot: usize },
    /// The participant already holds a slot in this game.
    #[error("participant already holds slot {slot}")]
    AlreadyRegistered { slot: usize },
    /// The participant holds no slot in this game.
    #[error("participant is not registered for this game")]
    NotRegistered,
    /// The requested index is past the last slot.
    #[error("slot {slot} does not exist (games have {SLOTS_PER_GAME} slots)")]
    InvalidSlot { slot: usize },
    /// The store could not be reached.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Read-only projection of a game's slots for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStatus {
    /// Occupant per slot.
    pub slots: Vec<Option<ParticipantId>>,
    /// Number of empty slots.
    pub free: usize,
    /// Whether the game had started when the status was taken.
    pub started: bool,
}

impl SlotStatus {
    /// Status of `game` at `now`.
    pub fn of(game: &GameEntity, now: SystemTime) -> Self {
        Self {
            slots: game.slots.clone(),
            free: game.free_slots(),
            started: game.has_started(now),
        }
    }

    /// Whether every slot is taken.
    pub fn is_full(&self) -> bool {
        self.free == 0
    }
}

/// Registers and releases participants through conditional slot writes.
#[derive(Clone)]
pub struct SlotRegistry {
    store: Arc<dyn GameStore>,
}

impl SlotRegistry {
    /// Registry committing through `store`.
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }

    /// Register `participant` on `game_id` and return the assigned slot.
    pub async fn register(
        &self,
        game_id: Uuid,
        participant: ParticipantId,
        requested: SlotRequest,
    ) -> Result<usize, RegistrationError> {
        self.register_at(game_id, participant, requested, SystemTime::now())
            .await
    }

    /// [`SlotRegistry::register`] evaluated against an explicit clock.
    pub async fn register_at(
        &self,
        game_id: Uuid,
        participant: ParticipantId,
        requested: SlotRequest,
        now: SystemTime,
    ) -> Result<usize, RegistrationError> {
        if let SlotRequest::Index(slot) = requested {
            if slot >= SLOTS_PER_GAME {
                return Err(RegistrationError::InvalidSlot { slot });
            }
        }

        let mut last_tried = 0;
        for round in 0..MAX_CLAIM_ROUNDS {
            let game = self.load_open_game(game_id, now).await?;
            if let Some(slot) = game.slot_of(participant) {
                return Err(RegistrationError::AlreadyRegistered { slot });
            }

            let slot = match requested {
                SlotRequest::Index(slot) if game.slots[slot].is_some() => {
                    return Err(RegistrationError::SlotAlreadyTaken { slot });
                }
                SlotRequest::Index(slot) => slot,
                SlotRequest::Any => game.first_free_slot().ok_or(RegistrationError::GameFull)?,
            };
            last_tried = slot;

            if self
                .store
                .conditional_set_slot(game_id, slot, None, Some(participant))
                .await?
            {
                info!(%game_id, %participant, slot, "participant registered");
                return Ok(slot);
            }

            debug!(%game_id, %participant, slot, round, "slot claim lost a race");
            if let SlotRequest::Index(slot) = requested {
                // Classify the lost write: the slot was taken, or the same
                // participant won a concurrent registration elsewhere.
                let game = self.load_open_game(game_id, now).await?;
                return Err(match game.slot_of(participant) {
                    Some(held) => RegistrationError::AlreadyRegistered { slot: held },
                    None => RegistrationError::SlotAlreadyTaken { slot },
                });
            }
        }

        Err(RegistrationError::SlotAlreadyTaken { slot: last_tried })
    }

    /// Release the slot currently held by `participant`.
    pub async fn unregister(
        &self,
        game_id: Uuid,
        participant: ParticipantId,
    ) -> Result<usize, RegistrationError> {
        for _ in 0..MAX_CLAIM_ROUNDS {
            let game = self.load_game(game_id).await?;
            let slot = game
                .slot_of(participant)
                .ok_or(RegistrationError::NotRegistered)?;

            if self
                .store
                .conditional_set_slot(game_id, slot, Some(participant), None)
                .await?
            {
                info!(%game_id, %participant, slot, "participant unregistered");
                return Ok(slot);
            }
        }

        Err(RegistrationError::NotRegistered)
    }

    /// Current slot occupancy of `game_id`.
    pub async fn slot_status(&self, game_id: Uuid) -> Result<SlotStatus, RegistrationError> {
        let game = self.load_game(game_id).await?;
        Ok(SlotStatus::of(&game, SystemTime::now()))
    }

    async fn load_game(&self, game_id: Uuid) -> Result<GameEntity, RegistrationError> {
        self.store
            .find_game(game_id)
            .await?
            .ok_or(RegistrationError::GameNotFound(game_id))
    }

    async fn load_open_game(
        &self,
        game_id: Uuid,
        now: SystemTime,
    ) -> Result<GameEntity, RegistrationError> {
        let game = self.load_game(game_id).await?;
        if game.has_started(now) {
            return Err(RegistrationError::GameAlreadyStarted);
        }
        Ok(game)
    }
}
