//! HTTP handlers for survey-web

pub mod admin;
pub mod auth;
pub mod health;
pub mod quiz;

pub use admin::{
    admin_questionnaires, create_form, create_questionnaire, delete_questionnaire,
    download_results, questionnaire_results, upload_form, upload_questionnaire,
};
pub use auth::{
    login, login_form, logout, require_admin, require_login, sign_up, sign_up_form, AuthSession,
};
pub use health::health_routes;
pub use quiz::{home, list_questionnaires, show_questionnaire, submit_questionnaire};

use axum::response::{IntoResponse, Redirect, Response};
use tera::Context;

use crate::render::base_context;
use crate::session::FlashLevel;
use crate::AppState;

/// Page context for a logged-in user, consuming the session's flashes
pub(crate) async fn page_context(state: &AppState, auth: &AuthSession) -> Context {
    let flashes = state.sessions.take_flashes(&auth.token).await;
    base_context(Some(&auth.user), &flashes)
}

/// Queue a flash message and redirect (post/redirect/get)
pub(crate) async fn flash_redirect(
    state: &AppState,
    auth: &AuthSession,
    level: FlashLevel,
    message: impl Into<String>,
    to: &str,
) -> Response {
    state.sessions.flash(&auth.token, level, message).await;
    Redirect::to(to).into_response()
}
