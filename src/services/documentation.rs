use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Padel Slots Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::games::create_game,
        crate::routes::games::list_games,
        crate::routes::games::get_game,
        crate::routes::games::delete_game,
        crate::routes::games::register,
        crate::routes::games::unregister,
        crate::routes::games::list_reminders,
        crate::routes::participants::participant_games,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::GameView,
            crate::dto::registration::RegisterRequest,
            crate::dto::registration::RegistrationView,
            crate::dto::reminder::ReminderView,
            crate::dto::reminder::ReminderStatusDto,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game creation, listing and deletion"),
        (name = "registrations", description = "Slot registration"),
        (name = "reminders", description = "Reminder dispatch records"),
    )
)]
pub struct ApiDoc;
