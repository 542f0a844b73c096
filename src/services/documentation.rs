use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Gomoku Arena.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::game_ws_handler,
        crate::routes::websocket::matchmaking_ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::InboundMessage,
            crate::dto::ws::OutboundEvent,
            crate::dto::ws::RejectReason,
            crate::dto::ws::EndReason,
            crate::rules::Stone,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "realtime", description = "WebSocket channels for games and matchmaking"),
    )
)]
/// OpenAPI document of the service.
pub struct ApiDoc;
