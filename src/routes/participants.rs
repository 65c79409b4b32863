use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{dto::game::GameView, error::AppError, services::game_service, state::SharedState};

/// Participant-centric views.
pub fn router() -> Router<SharedState> {
    Router::new().route("/participants/{id}/games", get(participant_games))
}

/// Upcoming games the participant holds a slot in.
#[utoipa::path(
    get,
    path = "/participants/{id}/games",
    tag = "registrations",
    params(("id" = i64, Path, description = "Participant identifier")),
    responses((status = 200, description = "Games the participant is registered for", body = [GameView]))
)]
pub async fn participant_games(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<GameView>>, AppError> {
    Ok(Json(game_service::participant_games(&state, id).await?))
}
