use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

/// Result of a MongoDB store operation.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save game `{id}`")]
    SaveGame {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load game `{id}`")]
    LoadGame {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete game `{id}`")]
    DeleteGame {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list games")]
    ListGames {
        #[source]
        source: MongoError,
    },
    #[error("failed to update slot {slot} of game `{id}`")]
    UpdateSlot {
        id: Uuid,
        slot: usize,
        #[source]
        source: MongoError,
    },
    #[error("failed to claim reminder `{offset_id}` of game `{game_id}`")]
    ClaimReminder {
        game_id: Uuid,
        offset_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to update reminder `{offset_id}` of game `{game_id}`")]
    UpdateReminder {
        game_id: Uuid,
        offset_id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list reminders of game `{game_id}`")]
    ListReminders {
        game_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete reminders of game `{game_id}`")]
    DeleteReminders {
        game_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("invalid document `{key}`: {reason}")]
    InvalidDocument { key: String, reason: String },
}

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Whether `error` reports a unique-index violation.
pub fn is_duplicate_key(error: &MongoError) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY_CODE,
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
