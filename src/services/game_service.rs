use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, GameQuery, ParticipantId, TimeWindow},
    dto::{
        game::{CreateGameRequest, GameView, ListQuery},
        registration::{RegisterRequest, RegistrationView},
        reminder::ReminderView,
        validation::parse_rfc3339,
    },
    error::ServiceError,
    services::registry::{SlotRegistry, SlotRequest},
    state::SharedState,
};

/// Persist a new game; the creator takes the first slot when configured to.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameView, ServiceError> {
    let store = state.require_game_store().await?;

    let starts_at = parse_rfc3339(&request.starts_at)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let now = SystemTime::now();
    if starts_at <= now {
        return Err(ServiceError::InvalidInput(
            "start time must be in the future".into(),
        ));
    }

    let mut game = GameEntity::new(
        starts_at,
        request.duration_minutes,
        request.location.trim().to_owned(),
        request.court,
        ParticipantId(request.owner_id),
    );
    // Nobody can see the game before it is inserted, so seating the creator
    // needs no conditional write.
    let creator_registered = state.config().games().auto_register_creator;
    if creator_registered {
        game.slots[0] = Some(game.owner);
    }
    store.insert_game(game.clone()).await?;
    info!(game_id = %game.id, owner = %game.owner, creator_registered, "game created");

    Ok(GameView::at(game, now))
}

/// Fetch one game with its slot occupancy.
pub async fn get_game(state: &SharedState, id: Uuid) -> Result<GameView, ServiceError> {
    let game = find_game(state, id).await?;
    Ok(GameView::at(game, SystemTime::now()))
}

/// Games that have not started yet, ordered by start time and filtered by `query`.
pub async fn list_games(
    state: &SharedState,
    query: ListQuery,
) -> Result<Vec<GameView>, ServiceError> {
    let store = state.require_game_store().await?;
    let limit = query
        .limit
        .unwrap_or_else(|| state.config().listing().page_size);

    let now = SystemTime::now();
    let games = store
        .list_games(GameQuery {
            window: TimeWindow::after(now),
            free_only: query.free_only,
            exclude_participant: query.exclude_participant.map(ParticipantId),
            offset: query.offset,
            limit,
        })
        .await?;
    Ok(games
        .into_iter()
        .map(|game| GameView::at(game, now))
        .collect())
}

/// Upcoming games in which `participant` holds a slot.
pub async fn participant_games(
    state: &SharedState,
    participant: i64,
) -> Result<Vec<GameView>, ServiceError> {
    let store = state.require_game_store().await?;
    let now = SystemTime::now();
    let games = store
        .list_participant_games(ParticipantId(participant), now)
        .await?;
    Ok(games
        .into_iter()
        .map(|game| GameView::at(game, now))
        .collect())
}

/// Delete a game on behalf of its owner.
pub async fn delete_game(
    state: &SharedState,
    id: Uuid,
    requester: i64,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    let game = find_game(state, id).await?;
    let requester = ParticipantId(requester);
    if game.owner != requester {
        return Err(ServiceError::Forbidden(
            "only the game owner can delete it".into(),
        ));
    }

    if !store.delete_game(id, requester).await? {
        return Err(not_found(id));
    }
    info!(game_id = %id, owner = %requester, "game deleted");
    Ok(())
}

/// Take a slot in a game.
pub async fn register(
    state: &SharedState,
    id: Uuid,
    request: RegisterRequest,
) -> Result<RegistrationView, ServiceError> {
    let registry = SlotRegistry::new(state.require_game_store().await?);
    let slot = registry
        .register(
            id,
            ParticipantId(request.participant_id),
            SlotRequest::from(request.slot),
        )
        .await?;

    Ok(RegistrationView {
        game_id: id,
        participant_id: request.participant_id,
        slot,
    })
}

/// Release the slot held by `participant`.
pub async fn unregister(
    state: &SharedState,
    id: Uuid,
    participant: i64,
) -> Result<RegistrationView, ServiceError> {
    let registry = SlotRegistry::new(state.require_game_store().await?);
    let slot = registry.unregister(id, ParticipantId(participant)).await?;

    Ok(RegistrationView {
        game_id: id,
        participant_id: participant,
        slot,
    })
}

/// Reminder records of a game, for operational visibility.
pub async fn list_reminders(
    state: &SharedState,
    id: Uuid,
) -> Result<Vec<ReminderView>, ServiceError> {
    let store = state.require_game_store().await?;
    find_game(state, id).await?;
    let records = store.list_reminders(id).await?;
    Ok(records.into_iter().map(Into::into).collect())
}

async fn find_game(state: &SharedState, id: Uuid) -> Result<GameEntity, ServiceError> {
    let store = state.require_game_store().await?;
    store.find_game(id).await?.ok_or_else(|| not_found(id))
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("game `{id}` not found"))
}
