mod sweep;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ripple_api::auth::{self, AppState, AppStateInner};
use ripple_api::middleware::require_auth;
use ripple_api::{chats, messages, reactions, users};
use ripple_db::Database;
use ripple_gateway::connection;
use ripple_gateway::dispatcher::Dispatcher;
use ripple_store::{ConversationStore, DbSocialGraph};

#[derive(Clone)]
struct GatewayState {
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripple=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("RIPPLE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("RIPPLE_DB_PATH").unwrap_or_else(|_| "ripple.db".into());
    let host = std::env::var("RIPPLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RIPPLE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let sweep_interval_secs: u64 = std::env::var("RIPPLE_SWEEP_INTERVAL_SECS")
        .unwrap_or_else(|_| "300".into())
        .parse()?;

    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);

    let dispatcher = Dispatcher::new();
    let graph = Arc::new(DbSocialGraph::new(db.clone()));
    let store = ConversationStore::new(db.clone(), Arc::new(dispatcher.clone()), graph.clone());

    // Background expiry sweep for disappearing messages.
    tokio::spawn(sweep::run_sweep_loop(store.clone(), sweep_interval_secs));

    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        store,
        graph,
        jwt_secret: jwt_secret.clone(),
    });

    let gateway_state = GatewayState {
        dispatcher,
        db,
        jwt_secret,
    };

    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/chats", get(chats::list_chats).post(chats::create_chat))
        .route("/chats/folder-counts", get(chats::folder_counts))
        .route("/chats/unread-count", get(chats::unread_count))
        .route("/chats/{id}", get(chats::get_chat))
        .route("/chats/{id}/settings", patch(chats::update_settings))
        .route("/chats/{id}/inbox", patch(chats::update_inbox))
        .route(
            "/messages",
            post(messages::send_message),
        )
        .route("/messages/bulk", delete(messages::bulk_delete))
        .route(
            "/messages/{id}",
            get(messages::list_messages).patch(messages::edit_message),
        )
        .route("/messages/{id}/read", patch(messages::mark_read))
        .route(
            "/messages/{id}/reactions",
            post(reactions::toggle_reaction).delete(reactions::toggle_reaction),
        )
        .route("/users/{id}/block-status", get(users::block_status))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(gateway_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Ripple server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.db, state.jwt_secret)
    })
}
