use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Request to take a slot in a game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub participant_id: i64,
    /// Specific slot (0-based); the lowest free slot is assigned when omitted.
    #[serde(default)]
    pub slot: Option<usize>,
}

/// Slot held (or released) by a participant.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationView {
    pub game_id: Uuid,
    pub participant_id: i64,
    pub slot: usize,
}
