pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::{Duration, SystemTime};

use crate::dao::models::{
    GameEntity, GameQuery, ParticipantId, ReminderEntity, ReminderUpdate, TimeWindow,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for games and reminder records.
///
/// Every mutating operation is a single conditional write: implementations
/// must evaluate the condition and apply the change atomically, as they are
/// the only serialization point between concurrent registrations and
/// overlapping scheduler ticks.
pub trait GameStore: Send + Sync {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Delete a game owned by `owner` together with its reminder records.
    fn delete_game(&self, id: Uuid, owner: ParticipantId) -> BoxFuture<'static, StorageResult<bool>>;
    /// Games whose start time falls inside `window`, ordered by start time.
    fn list_upcoming_games(
        &self,
        window: TimeWindow,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// One page of the games matching `query`, ordered by start time.
    fn list_games(&self, query: GameQuery) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Games starting after `from` in which `participant` holds a slot.
    fn list_participant_games(
        &self,
        participant: ParticipantId,
        from: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Set slot `slot` to `new` only if it currently holds `expected`.
    ///
    /// When `new` is a participant, the write additionally requires that
    /// participant to be absent from every slot of the game. Returns `false`
    /// when the game is missing, the slot index is out of range, or either
    /// condition does not hold.
    fn conditional_set_slot(
        &self,
        game_id: Uuid,
        slot: usize,
        expected: Option<ParticipantId>,
        new: Option<ParticipantId>,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Claim the `(game, offset)` reminder for `lease`.
    ///
    /// Inserts a pending record when none exists, or takes over a pending
    /// record whose previous lease expired. Returns `None` when the record is
    /// terminal or currently claimed by someone else.
    fn claim_reminder(
        &self,
        game_id: Uuid,
        offset_id: String,
        now: SystemTime,
        lease: Duration,
    ) -> BoxFuture<'static, StorageResult<Option<ReminderEntity>>>;
    /// Record a dispatch outcome and release the claim.
    ///
    /// Applied only while the record is pending and still held by
    /// `update.claim_token`; returns whether it was applied.
    fn set_reminder_status(&self, update: ReminderUpdate)
    -> BoxFuture<'static, StorageResult<bool>>;
    fn list_reminders(&self, game_id: Uuid)
    -> BoxFuture<'static, StorageResult<Vec<ReminderEntity>>>;
    /// Drop every reminder record of `game_id`.
    fn delete_reminders(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
