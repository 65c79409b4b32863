use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Storage is installed and answering.
    Ok,
    /// Storage is missing or failing its health check.
    Degraded,
}

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Whether the reminder scheduler can currently reach storage.
    pub reminders_active: bool,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
            reminders_active: true,
        }
    }

    pub fn degraded() -> Self {
        Self {
            status: HealthStatus::Degraded,
            reminders_active: false,
        }
    }
}
