/// OpenAPI documentation generation.
pub mod documentation;
/// Game management on top of the slot registry.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Reminder delivery sinks.
pub mod notification;
/// Concurrency-safe slot allocation.
pub mod registry;
/// Reminder message rendering.
pub mod reminder_text;
/// Periodic reminder dispatch.
pub mod scheduler;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
