use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::{CreateGameRequest, GameView, ListQuery},
        registration::{RegisterRequest, RegistrationView},
        reminder::ReminderView,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Header identifying the participant acting on a game.
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

/// Game lifecycle, registration and reminder inspection endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game).delete(delete_game))
        .route("/games/{id}/registrations", post(register))
        .route(
            "/games/{id}/registrations/{participant_id}",
            delete(unregister),
        )
        .route("/games/{id}/reminders", get(list_reminders))
}

/// Announce a new game with every slot free.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = GameView),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<GameView>), AppError> {
    let game = game_service::create_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// List games that have not started yet.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    params(ListQuery),
    responses((status = 200, description = "Upcoming games", body = [GameView]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<ListQuery>>,
) -> Result<Json<Vec<GameView>>, AppError> {
    Ok(Json(game_service::list_games(&state, query).await?))
}

/// Fetch a game and its slot occupancy.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game found", body = GameView),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(game_service::get_game(&state, id).await?))
}

/// Delete a game; only its owner may do so.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "games",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-participant-id" = i64, Header, description = "Participant issuing the request")
    ),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 401, description = "Missing participant header"),
        (status = 403, description = "Requester is not the owner"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let requester = participant_from_headers(&headers)?;
    game_service::delete_game(&state, id, requester).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Take a slot, either a requested one or the lowest free one.
#[utoipa::path(
    post,
    path = "/games/{id}/registrations",
    tag = "registrations",
    params(("id" = Uuid, Path, description = "Game identifier")),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Slot assigned", body = RegistrationView),
        (status = 400, description = "Slot index out of range"),
        (status = 404, description = "Unknown game"),
        (status = 409, description = "Game full, slot taken, already registered or game started")
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegistrationView>), AppError> {
    let registration = game_service::register(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Release the slot held by a participant.
#[utoipa::path(
    delete,
    path = "/games/{id}/registrations/{participant_id}",
    tag = "registrations",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("participant_id" = i64, Path, description = "Participant releasing the slot")
    ),
    responses(
        (status = 200, description = "Slot released", body = RegistrationView),
        (status = 404, description = "Unknown game"),
        (status = 409, description = "Participant not registered")
    )
)]
pub async fn unregister(
    State(state): State<SharedState>,
    Path((id, participant_id)): Path<(Uuid, i64)>,
) -> Result<Json<RegistrationView>, AppError> {
    Ok(Json(
        game_service::unregister(&state, id, participant_id).await?,
    ))
}

/// Reminder dispatch records of a game.
#[utoipa::path(
    get,
    path = "/games/{id}/reminders",
    tag = "reminders",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Reminder records", body = [ReminderView]),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn list_reminders(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReminderView>>, AppError> {
    Ok(Json(game_service::list_reminders(&state, id).await?))
}

fn participant_from_headers(headers: &HeaderMap) -> Result<i64, AppError> {
    let value = headers
        .get(PARTICIPANT_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("missing `{PARTICIPANT_HEADER}` header")))?;
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::BadRequest(format!("invalid `{PARTICIPANT_HEADER}` header")))
}
