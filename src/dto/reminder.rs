use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::{ReminderEntity, ReminderStatus},
    dto::format_system_time,
};

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatusDto {
    Pending,
    Sent,
    FailedPermanent,
}

impl From<ReminderStatus> for ReminderStatusDto {
    fn from(value: ReminderStatus) -> Self {
        match value {
            ReminderStatus::Pending => ReminderStatusDto::Pending,
            ReminderStatus::Sent => ReminderStatusDto::Sent,
            ReminderStatus::FailedPermanent => ReminderStatusDto::FailedPermanent,
        }
    }
}

/// Dispatch bookkeeping of one reminder offset of a game.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReminderView {
    pub offset_id: String,
    pub status: ReminderStatusDto,
    pub attempts: u32,
    pub last_attempt_at: Option<String>,
    pub delivered_to: Vec<i64>,
    pub undeliverable: Vec<i64>,
}

impl From<ReminderEntity> for ReminderView {
    fn from(record: ReminderEntity) -> Self {
        Self {
            offset_id: record.offset_id,
            status: record.status.into(),
            attempts: record.attempts,
            last_attempt_at: record.last_attempt_at.map(format_system_time),
            delivered_to: record.delivered_to.into_iter().map(|p| p.0).collect(),
            undeliverable: record.undeliverable.into_iter().map(|p| p.0).collect(),
        }
    }
}
