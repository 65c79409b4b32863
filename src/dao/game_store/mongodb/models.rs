use mongodb::bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{
    GameEntity, ParticipantId, ReminderEntity, ReminderStatus, SLOTS_PER_GAME,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    starts_at: DateTime,
    duration_minutes: u32,
    location: String,
    court: Option<u32>,
    slots: Vec<Option<i64>>,
    created_at: DateTime,
    owner: i64,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            starts_at: DateTime::from_system_time(value.starts_at),
            duration_minutes: value.duration_minutes,
            location: value.location,
            court: value.court,
            slots: value
                .slots
                .into_iter()
                .map(|slot| slot.map(|participant| participant.0))
                .collect(),
            created_at: DateTime::from_system_time(value.created_at),
            owner: value.owner.0,
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGameDocument) -> Result<Self, Self::Error> {
        let id = parse_uuid(&value.id)?;
        if value.slots.len() != SLOTS_PER_GAME {
            return Err(MongoDaoError::InvalidDocument {
                key: value.id,
                reason: format!(
                    "expected {SLOTS_PER_GAME} slots, found {}",
                    value.slots.len()
                ),
            });
        }

        Ok(Self {
            id,
            starts_at: value.starts_at.to_system_time(),
            duration_minutes: value.duration_minutes,
            location: value.location,
            court: value.court,
            slots: value
                .slots
                .into_iter()
                .map(|slot| slot.map(ParticipantId))
                .collect(),
            created_at: value.created_at.to_system_time(),
            owner: ParticipantId(value.owner),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoReminderDocument {
    #[serde(rename = "_id")]
    id: String,
    game_id: String,
    offset_id: String,
    status: ReminderStatus,
    attempts: u32,
    last_attempt_at: Option<DateTime>,
    claim_token: Option<String>,
    claimed_until: Option<DateTime>,
    #[serde(default)]
    delivered_to: Vec<i64>,
    #[serde(default)]
    undeliverable: Vec<i64>,
}

impl TryFrom<MongoReminderDocument> for ReminderEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoReminderDocument) -> Result<Self, Self::Error> {
        let claim_token = value
            .claim_token
            .as_deref()
            .map(parse_uuid)
            .transpose()?;

        Ok(Self {
            game_id: parse_uuid(&value.game_id)?,
            offset_id: value.offset_id,
            status: value.status,
            attempts: value.attempts,
            last_attempt_at: value.last_attempt_at.map(DateTime::to_system_time),
            claim_token,
            claimed_until: value.claimed_until.map(DateTime::to_system_time),
            delivered_to: value.delivered_to.into_iter().map(ParticipantId).collect(),
            undeliverable: value.undeliverable.into_iter().map(ParticipantId).collect(),
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::InvalidDocument {
        key: raw.to_owned(),
        reason: err.to_string(),
    })
}

/// Stable primary key of a reminder record.
pub fn reminder_doc_id(game_id: Uuid, offset_id: &str) -> String {
    format!("{game_id}:{offset_id}")
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

pub fn status_key(status: ReminderStatus) -> &'static str {
    match status {
        ReminderStatus::Pending => "pending",
        ReminderStatus::Sent => "sent",
        ReminderStatus::FailedPermanent => "failed_permanent",
    }
}

pub fn participant_bson(participant: Option<ParticipantId>) -> Bson {
    participant.map_or(Bson::Null, |participant| Bson::Int64(participant.0))
}

pub fn participants_bson(participants: &[ParticipantId]) -> Bson {
    Bson::Array(
        participants
            .iter()
            .map(|participant| Bson::Int64(participant.0))
            .collect(),
    )
}
