use crate::{
    auth::{
        router as auth_router,
        user::{AuthSession, Backend},
    },
    club::{
        billing::FeeSchedule,
        notify::{LogNotifier, SharedNotifier, WebhookNotifier},
    },
    config::Config,
    routes::{self, dashboard::dashboard, me::me, render},
    util::asset_loader::AssetLoader,
};
use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Redirect},
    routing::{get, get_service},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        Expiry, SessionManagerLayer, SessionStore,
        cookie::{SameSite, time},
    },
};
use minijinja::Environment;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::{signal, task::AbortHandle};
use tower_http::{services::ServeDir, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub templates: Arc<Environment<'static>>,
    pub fees: FeeSchedule,
    pub due_day: u32,
    pub notifier: SharedNotifier,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        let notifier: SharedNotifier = match &config.notify_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
            None => Arc::new(LogNotifier),
        };
        Self {
            db,
            templates: Arc::new(setup_templates()),
            fees: config.fees,
            due_day: config.cuota_due_day,
            notifier,
        }
    }
}

pub fn create_router<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let backend = Backend::new(state.db.clone());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/me", get(me))
        .route("/", get(index))
        .nest("/api", routes::api())
        .merge(auth_router::router())
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http())
}

pub fn setup_templates() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader("templates"));
    AssetLoader::default().register(&mut env);
    env
}

async fn index(State(state): State<AppState>, auth_session: AuthSession) -> impl IntoResponse {
    if auth_session.user.is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        render(&state, "index.html", minijinja::context! {})
    }
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
}
