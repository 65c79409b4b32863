//! Process-local [`GameStore`] used for development runs and tests.
//!
//! Each conditional operation runs while holding the map shard lock of the
//! record it inspects, which makes check-and-write a single atomic step.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{
        GameEntity, GameQuery, ParticipantId, ReminderEntity, ReminderStatus, ReminderUpdate,
        TimeWindow,
    },
    storage::StorageResult,
};

type ReminderKey = (Uuid, String);

/// [`GameStore`] keeping games and reminder records in concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<Uuid, GameEntity>,
    reminders: DashMap<ReminderKey, ReminderEntity>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn set_slot(
        &self,
        game_id: Uuid,
        slot: usize,
        expected: Option<ParticipantId>,
        new: Option<ParticipantId>,
    ) -> bool {
        let Some(mut game) = self.inner.games.get_mut(&game_id) else {
            return false;
        };

        if game.slots.get(slot) != Some(&expected) {
            return false;
        }
        if let Some(participant) = new {
            if game.slot_of(participant).is_some() {
                return false;
            }
        }

        game.slots[slot] = new;
        true
    }

    fn claim(
        &self,
        game_id: Uuid,
        offset_id: String,
        now: SystemTime,
        lease: Duration,
    ) -> Option<ReminderEntity> {
        let token = Uuid::new_v4();
        let until = now + lease;

        match self.inner.reminders.entry((game_id, offset_id)) {
            Entry::Vacant(vacant) => {
                let record = ReminderEntity::claimed(game_id, vacant.key().1.clone(), token, until);
                vacant.insert(record.clone());
                Some(record)
            }
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if record.status.is_terminal() || record.is_claimed(now) {
                    return None;
                }
                record.claim_token = Some(token);
                record.claimed_until = Some(until);
                Some(record.clone())
            }
        }
    }

    fn apply_update(&self, update: ReminderUpdate) -> bool {
        let key = (update.game_id, update.offset_id);
        let Some(mut record) = self.inner.reminders.get_mut(&key) else {
            return false;
        };

        if record.status != ReminderStatus::Pending
            || record.claim_token != Some(update.claim_token)
        {
            return false;
        }

        record.status = update.status;
        record.attempts = update.attempts;
        record.last_attempt_at = update.last_attempt_at;
        record.delivered_to = update.delivered_to;
        record.undeliverable = update.undeliverable;
        record.claim_token = None;
        record.claimed_until = None;
        true
    }

    fn drop_reminders(&self, game_id: Uuid) {
        self.inner.reminders.retain(|(id, _), _| *id != game_id);
    }

    fn games_matching(&self, predicate: impl Fn(&GameEntity) -> bool) -> Vec<GameEntity> {
        let mut games: Vec<GameEntity> = self
            .inner
            .games
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        games.sort_by_key(|game| game.starts_at);
        games
    }
}

impl GameStore for MemoryGameStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.games.get(&id).map(|game| game.value().clone())) })
    }

    fn delete_game(&self, id: Uuid, owner: ParticipantId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let removed = store
                .inner
                .games
                .remove_if(&id, |_, game| game.owner == owner)
                .is_some();
            if removed {
                store.drop_reminders(id);
            }
            Ok(removed)
        })
    }

    fn list_upcoming_games(
        &self,
        window: TimeWindow,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.games_matching(|game| window.contains(game.starts_at))) })
    }

    fn list_games(&self, query: GameQuery) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .games_matching(|game| query.matches(game))
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .collect())
        })
    }

    fn list_participant_games(
        &self,
        participant: ParticipantId,
        from: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store.games_matching(|game| {
                game.starts_at > from && game.slot_of(participant).is_some()
            }))
        })
    }

    fn conditional_set_slot(
        &self,
        game_id: Uuid,
        slot: usize,
        expected: Option<ParticipantId>,
        new: Option<ParticipantId>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.set_slot(game_id, slot, expected, new)) })
    }

    fn claim_reminder(
        &self,
        game_id: Uuid,
        offset_id: String,
        now: SystemTime,
        lease: Duration,
    ) -> BoxFuture<'static, StorageResult<Option<ReminderEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.claim(game_id, offset_id, now, lease)) })
    }

    fn set_reminder_status(
        &self,
        update: ReminderUpdate,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.apply_update(update)) })
    }

    fn list_reminders(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ReminderEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut records: Vec<ReminderEntity> = store
                .inner
                .reminders
                .iter()
                .filter(|entry| entry.key().0 == game_id)
                .map(|entry| entry.value().clone())
                .collect();
            records.sort_by(|a, b| a.offset_id.cmp(&b.offset_id));
            Ok(records)
        })
    }

    fn delete_reminders(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.drop_reminders(game_id);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(60);

    async fn store_with_game() -> (MemoryGameStore, Uuid) {
        let store = MemoryGameStore::new();
        let game = GameEntity::new(
            SystemTime::now() + Duration::from_secs(7200),
            90,
            "Center court".into(),
            None,
            ParticipantId(100),
        );
        let id = game.id;
        store.insert_game(game).await.unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn conditional_set_slot_requires_expected_occupant() {
        let (store, id) = store_with_game().await;

        assert!(store.conditional_set_slot(id, 0, None, Some(ParticipantId(1))).await.unwrap());
        assert!(!store.conditional_set_slot(id, 0, None, Some(ParticipantId(2))).await.unwrap());
        assert!(
            !store
                .conditional_set_slot(id, 0, Some(ParticipantId(2)), None)
                .await
                .unwrap()
        );
        assert!(
            store
                .conditional_set_slot(id, 0, Some(ParticipantId(1)), None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn conditional_set_slot_rejects_duplicate_participant_and_bad_index() {
        let (store, id) = store_with_game().await;

        assert!(store.conditional_set_slot(id, 0, None, Some(ParticipantId(1))).await.unwrap());
        assert!(!store.conditional_set_slot(id, 1, None, Some(ParticipantId(1))).await.unwrap());
        assert!(!store.conditional_set_slot(id, 9, None, Some(ParticipantId(3))).await.unwrap());
        assert!(
            !store
                .conditional_set_slot(Uuid::new_v4(), 0, None, Some(ParticipantId(3)))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn claim_is_exclusive_until_lease_expires() {
        let (store, id) = store_with_game().await;
        let now = SystemTime::now();

        let first = store.claim_reminder(id, "3h".into(), now, LEASE).await.unwrap();
        assert!(first.is_some());
        assert!(store.claim_reminder(id, "3h".into(), now, LEASE).await.unwrap().is_none());

        let later = now + LEASE + Duration::from_secs(1);
        let second = store.claim_reminder(id, "3h".into(), later, LEASE).await.unwrap();
        assert_ne!(first.unwrap().claim_token, second.unwrap().claim_token);
    }

    #[tokio::test]
    async fn terminal_record_is_never_claimed_again() {
        let (store, id) = store_with_game().await;
        let now = SystemTime::now();
        let claimed = store
            .claim_reminder(id, "3h".into(), now, LEASE)
            .await
            .unwrap()
            .unwrap();

        let applied = store
            .set_reminder_status(ReminderUpdate {
                game_id: id,
                offset_id: "3h".into(),
                claim_token: claimed.claim_token.unwrap(),
                status: ReminderStatus::Sent,
                attempts: 1,
                last_attempt_at: Some(now),
                delivered_to: vec![ParticipantId(1)],
                undeliverable: Vec::new(),
            })
            .await
            .unwrap();
        assert!(applied);

        let much_later = now + Duration::from_secs(86_400);
        assert!(
            store
                .claim_reminder(id, "3h".into(), much_later, LEASE)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn stale_claim_token_cannot_write() {
        let (store, id) = store_with_game().await;
        let now = SystemTime::now();
        let stale = store
            .claim_reminder(id, "3h".into(), now, LEASE)
            .await
            .unwrap()
            .unwrap();
        store
            .claim_reminder(id, "3h".into(), now + LEASE * 2, LEASE)
            .await
            .unwrap()
            .unwrap();

        let applied = store
            .set_reminder_status(ReminderUpdate {
                game_id: id,
                offset_id: "3h".into(),
                claim_token: stale.claim_token.unwrap(),
                status: ReminderStatus::Sent,
                attempts: 1,
                last_attempt_at: Some(now),
                delivered_to: Vec::new(),
                undeliverable: Vec::new(),
            })
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn listing_filters_full_and_joined_games_before_paging() {
        let store = MemoryGameStore::new();
        let now = SystemTime::now();
        let mut ids = Vec::new();
        for hours in 1..=4 {
            let mut game = GameEntity::new(
                now + Duration::from_secs(hours * 3600),
                90,
                "Center court".into(),
                None,
                ParticipantId(100),
            );
            if hours == 1 {
                game.slots = (1..=4).map(|player| Some(ParticipantId(player))).collect();
            }
            if hours == 2 {
                game.slots[0] = Some(ParticipantId(7));
            }
            ids.push(game.id);
            store.insert_game(game).await.unwrap();
        }

        let query = GameQuery {
            window: TimeWindow::after(now),
            free_only: true,
            exclude_participant: Some(ParticipantId(7)),
            offset: 0,
            limit: 10,
        };
        let open: Vec<Uuid> = store
            .list_games(query)
            .await
            .unwrap()
            .into_iter()
            .map(|game| game.id)
            .collect();
        assert_eq!(open, vec![ids[2], ids[3]]);

        let second_page = store
            .list_games(GameQuery {
                offset: 1,
                limit: 1,
                ..query
            })
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].id, ids[3]);

        let everything = store
            .list_games(GameQuery {
                free_only: false,
                exclude_participant: None,
                ..query
            })
            .await
            .unwrap();
        assert_eq!(everything.len(), 4);
    }

    #[tokio::test]
    async fn delete_game_checks_owner_and_drops_reminders() {
        let (store, id) = store_with_game().await;
        store
            .claim_reminder(id, "3h".into(), SystemTime::now(), LEASE)
            .await
            .unwrap();

        assert!(!store.delete_game(id, ParticipantId(5)).await.unwrap());
        assert!(store.delete_game(id, ParticipantId(100)).await.unwrap());
        assert!(store.find_game(id).await.unwrap().is_none());
        assert!(store.list_reminders(id).await.unwrap().is_empty());
    }
}
