//! survey-web library - questionnaire web service
//!
//! Users sign in, fill JSON-defined questionnaires and have their answers
//! appended to per-questionnaire CSV logs; administrators create, import,
//! delete questionnaires and read or download the results.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use survey_common::store::QuestionnaireStore;
use tera::Tera;
use tokio::sync::Mutex;

pub mod api;
pub mod error;
pub mod render;
pub mod session;

use session::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// User database
    pub db: SqlitePool,
    /// Questionnaire definitions and result logs
    pub store: QuestionnaireStore,
    pub sessions: SessionStore,
    pub templates: Arc<Tera>,
    /// Serializes appends to result logs
    pub append_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Create new application state (compiles the page templates)
    pub fn new(db: SqlitePool, store: QuestionnaireStore) -> Result<Self, tera::Error> {
        Ok(Self {
            db,
            store,
            sessions: SessionStore::new(),
            templates: Arc::new(render::load_templates()?),
            append_lock: Arc::new(Mutex::new(())),
        })
    }
}

/// Build application router
///
/// `/login`, `/sign-up` and `/health` are public; every other page requires
/// a session and `/admin/*` additionally the admin flag.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    let protected = Router::new()
        .route("/", get(api::home))
        .route("/logout", get(api::logout))
        .route("/quiz", get(api::list_questionnaires))
        .route(
            "/q/:qid",
            get(api::show_questionnaire).post(api::submit_questionnaire),
        )
        .route("/admin/questionnaires", get(api::admin_questionnaires))
        .route(
            "/admin/questionnaires/create",
            get(api::create_form).post(api::create_questionnaire),
        )
        .route(
            "/admin/questionnaires/upload",
            get(api::upload_form).post(api::upload_questionnaire),
        )
        .route(
            "/admin/questionnaires/:qid/delete",
            post(api::delete_questionnaire),
        )
        .route(
            "/admin/questionnaires/:qid/results",
            get(api::questionnaire_results),
        )
        .route(
            "/admin/questionnaires/:qid/results/download",
            get(api::download_results),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_login,
        ));

    let public = Router::new()
        .route("/login", get(api::login_form).post(api::login))
        .route("/sign-up", get(api::sign_up_form).post(api::sign_up))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
