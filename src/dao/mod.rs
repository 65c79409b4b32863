/// Game and reminder persistence gateway.
pub mod game_store;
/// Persisted record definitions.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
