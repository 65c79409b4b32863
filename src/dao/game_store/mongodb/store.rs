use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        MongoGameDocument, MongoReminderDocument, doc_id, participant_bson, participants_bson,
        reminder_doc_id, status_key,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{
        GameEntity, GameQuery, ParticipantId, ReminderEntity, ReminderStatus, ReminderUpdate,
        SLOTS_PER_GAME, TimeWindow,
    },
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const REMINDER_COLLECTION_NAME: &str = "reminders";

/// MongoDB-backed [`GameStore`] relying on filtered single-document updates
/// for every conditional write.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let games = database.collection::<Document>(GAME_COLLECTION_NAME);
        for (keys, name, label) in [
            (doc! {"starts_at": 1}, "game_starts_at_idx", "starts_at"),
            (doc! {"slots": 1}, "game_slots_idx", "slots"),
        ] {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();
            games
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: GAME_COLLECTION_NAME,
                    index: label,
                    source,
                })?;
        }

        let reminders = database.collection::<Document>(REMINDER_COLLECTION_NAME);
        let index = IndexModel::builder()
            .keys(doc! {"game_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("reminder_game_idx".to_owned()))
                    .build(),
            )
            .build();
        reminders
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: REMINDER_COLLECTION_NAME,
                index: "game_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn reminder_collection(&self) -> Collection<MongoReminderDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoReminderDocument>(REMINDER_COLLECTION_NAME)
    }

    async fn insert_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;

        document.map(GameEntity::try_from).transpose()
    }

    async fn delete_game(&self, id: Uuid, owner: ParticipantId) -> MongoResult<bool> {
        let mut filter = doc_id(id);
        filter.insert("owner", owner.0);

        let result = self
            .collection()
            .await
            .delete_one(filter)
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        if result.deleted_count == 0 {
            return Ok(false);
        }

        self.delete_reminders(id).await?;
        Ok(true)
    }

    async fn delete_reminders(&self, game_id: Uuid) -> MongoResult<()> {
        self.reminder_collection()
            .await
            .delete_many(doc! {"game_id": game_id.to_string()})
            .await
            .map_err(|source| MongoDaoError::DeleteReminders { game_id, source })?;
        Ok(())
    }

    async fn find_games(&self, filter: Document) -> MongoResult<Vec<GameEntity>> {
        self.find_games_page(filter, 0, None).await
    }

    async fn find_games_page(
        &self,
        filter: Document,
        skip: u64,
        limit: Option<i64>,
    ) -> MongoResult<Vec<GameEntity>> {
        let collection = self.collection().await;
        let mut find = collection
            .find(filter)
            .sort(doc! {"starts_at": 1})
            .skip(skip);
        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        let documents: Vec<MongoGameDocument> = find
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        documents.into_iter().map(GameEntity::try_from).collect()
    }

    async fn list_upcoming_games(&self, window: TimeWindow) -> MongoResult<Vec<GameEntity>> {
        self.find_games(doc! {"starts_at": starts_at_range(window)}).await
    }

    async fn list_games(&self, query: GameQuery) -> MongoResult<Vec<GameEntity>> {
        let mut filter = doc! {"starts_at": starts_at_range(query.window)};
        let mut slots = Document::new();
        if query.free_only {
            // An empty slot is stored as `null` inside the array.
            slots.insert("$in", vec![Bson::Null]);
        }
        if let Some(participant) = query.exclude_participant {
            slots.insert("$ne", participant.0);
        }
        if !slots.is_empty() {
            filter.insert("slots", slots);
        }

        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        self.find_games_page(filter, query.offset as u64, Some(limit))
            .await
    }

    async fn list_participant_games(
        &self,
        participant: ParticipantId,
        from: SystemTime,
    ) -> MongoResult<Vec<GameEntity>> {
        self.find_games(doc! {
            "starts_at": {"$gt": DateTime::from_system_time(from)},
            "slots": participant.0,
        })
        .await
    }

    async fn conditional_set_slot(
        &self,
        game_id: Uuid,
        slot: usize,
        expected: Option<ParticipantId>,
        new: Option<ParticipantId>,
    ) -> MongoResult<bool> {
        if slot >= SLOTS_PER_GAME {
            return Ok(false);
        }

        let path = format!("slots.{slot}");
        let mut filter = doc_id(game_id);
        filter.insert(
            path.clone(),
            doc! {"$exists": true, "$eq": participant_bson(expected)},
        );
        if let Some(participant) = new {
            filter.insert("slots", doc! {"$ne": participant.0});
        }

        let mut assignment = Document::new();
        assignment.insert(path, participant_bson(new));

        let result = self
            .collection()
            .await
            .update_one(filter, doc! {"$set": assignment})
            .await
            .map_err(|source| MongoDaoError::UpdateSlot {
                id: game_id,
                slot,
                source,
            })?;

        Ok(result.matched_count == 1)
    }

    async fn claim_reminder(
        &self,
        game_id: Uuid,
        offset_id: String,
        now: SystemTime,
        lease: Duration,
    ) -> MongoResult<Option<ReminderEntity>> {
        let now_bson = DateTime::from_system_time(now);
        let filter = doc! {
            "_id": reminder_doc_id(game_id, &offset_id),
            "status": status_key(ReminderStatus::Pending),
            "$or": [
                {"claimed_until": Bson::Null},
                {"claimed_until": {"$lte": now_bson}},
            ],
        };
        let update = doc! {
            "$set": {
                "claim_token": Uuid::new_v4().to_string(),
                "claimed_until": DateTime::from_system_time(now + lease),
            },
            "$setOnInsert": {
                "game_id": game_id.to_string(),
                "offset_id": offset_id.clone(),
                "attempts": 0_i64,
                "last_attempt_at": Bson::Null,
                "delivered_to": [],
                "undeliverable": [],
            },
        };

        let claimed = self
            .reminder_collection()
            .await
            .find_one_and_update(filter, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;

        match claimed {
            Ok(document) => document.map(ReminderEntity::try_from).transpose(),
            // The upsert collided with an existing record that is terminal or
            // still leased.
            Err(err) if is_duplicate_key(&err) => {
                debug!(%game_id, offset = %offset_id, "reminder not claimable");
                Ok(None)
            }
            Err(source) => Err(MongoDaoError::ClaimReminder {
                game_id,
                offset_id,
                source,
            }),
        }
    }

    async fn set_reminder_status(&self, update: ReminderUpdate) -> MongoResult<bool> {
        let filter = doc! {
            "_id": reminder_doc_id(update.game_id, &update.offset_id),
            "status": status_key(ReminderStatus::Pending),
            "claim_token": update.claim_token.to_string(),
        };
        let changes = doc! {
            "$set": {
                "status": status_key(update.status),
                "attempts": i64::from(update.attempts),
                "last_attempt_at": update.last_attempt_at.map(DateTime::from_system_time),
                "delivered_to": participants_bson(&update.delivered_to),
                "undeliverable": participants_bson(&update.undeliverable),
                "claim_token": Bson::Null,
                "claimed_until": Bson::Null,
            },
        };

        let result = self
            .reminder_collection()
            .await
            .update_one(filter, changes)
            .await
            .map_err(|source| MongoDaoError::UpdateReminder {
                game_id: update.game_id,
                offset_id: update.offset_id.clone(),
                source,
            })?;

        Ok(result.matched_count == 1)
    }

    async fn list_reminders(&self, game_id: Uuid) -> MongoResult<Vec<ReminderEntity>> {
        let documents: Vec<MongoReminderDocument> = self
            .reminder_collection()
            .await
            .find(doc! {"game_id": game_id.to_string()})
            .sort(doc! {"offset_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListReminders { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListReminders { game_id, source })?;

        documents.into_iter().map(ReminderEntity::try_from).collect()
    }
}

fn starts_at_range(window: TimeWindow) -> Document {
    let mut range = doc! {"$gt": DateTime::from_system_time(window.from)};
    if let Some(until) = window.until {
        range.insert("$lte", DateTime::from_system_time(until));
    }
    range
}

impl GameStore for MongoGameStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn delete_game(&self, id: Uuid, owner: ParticipantId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id, owner).await.map_err(Into::into) })
    }

    fn list_upcoming_games(
        &self,
        window: TimeWindow,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_upcoming_games(window).await.map_err(Into::into) })
    }

    fn list_games(&self, query: GameQuery) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games(query).await.map_err(Into::into) })
    }

    fn list_participant_games(
        &self,
        participant: ParticipantId,
        from: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_participant_games(participant, from)
                .await
                .map_err(Into::into)
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
        Box::pin(async move {
            store
                .conditional_set_slot(game_id, slot, expected, new)
                .await
                .map_err(Into::into)
        })
    }

    fn claim_reminder(
        &self,
        game_id: Uuid,
        offset_id: String,
        now: SystemTime,
        lease: Duration,
    ) -> BoxFuture<'static, StorageResult<Option<ReminderEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .claim_reminder(game_id, offset_id, now, lease)
                .await
                .map_err(Into::into)
        })
    }

    fn set_reminder_status(
        &self,
        update: ReminderUpdate,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.set_reminder_status(update).await.map_err(Into::into) })
    }

    fn list_reminders(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ReminderEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_reminders(game_id).await.map_err(Into::into) })
    }

    fn delete_reminders(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_reminders(game_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
