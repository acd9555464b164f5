//! Login, sign-up and session middleware

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use survey_common::db::{
    authenticate, check_sign_up, count_users, create_user, find_user_by_email, find_user_by_id,
    NewUser, SignUpError, User,
};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::render::{base_context, render};
use crate::session::{expired_session_cookie, session_cookie, session_token, Flash, FlashLevel};
use crate::AppState;

/// The logged-in user, attached to requests by [`require_login`]
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Session middleware
///
/// Requests without a valid session are redirected to `/login`.
pub async fn require_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(request.headers()) else {
        return Redirect::to("/login").into_response();
    };
    let Some(user_id) = state.sessions.user_id(&token).await else {
        return Redirect::to("/login").into_response();
    };

    match find_user_by_id(&state.db, user_id).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(AuthSession { token, user });
            next.run(request).await
        }
        Ok(None) => {
            warn!("Session refers to missing user {}", user_id);
            state.sessions.remove(&token).await;
            Redirect::to("/login").into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Reject non-administrators with 403
pub fn require_admin(auth: &AuthSession) -> ApiResult<()> {
    if auth.user.is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "user {} is not an administrator",
            auth.user.id
        )))
    }
}

/// GET /login
pub async fn login_form(State(state): State<AppState>) -> ApiResult<Html<String>> {
    render(&state.templates, "login.html", &base_context(None, &[]))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let email = form.email.trim();

    if let Some(user) = authenticate(&state.db, email, &form.password).await? {
        info!("User {} logged in", user.id);
        let token = state.sessions.create(user.id).await;
        state
            .sessions
            .flash(&token, FlashLevel::Success, "Connexion réussie !")
            .await;
        return Ok(signed_in(&token));
    }

    let message = if find_user_by_email(&state.db, email).await?.is_some() {
        "Mot de passe incorrect, réessayez."
    } else {
        "Cette adresse e-mail n'existe pas."
    };
    let flashes = [Flash::new(FlashLevel::Error, message)];
    Ok(render(&state.templates, "login.html", &base_context(None, &flashes))?.into_response())
}

/// GET /sign-up
pub async fn sign_up_form(State(state): State<AppState>) -> ApiResult<Html<String>> {
    render(&state.templates, "sign_up.html", &base_context(None, &[]))
}

/// POST /sign-up
///
/// The first account ever created is an administrator.
pub async fn sign_up(
    State(state): State<AppState>,
    Form(form): Form<SignUpForm>,
) -> ApiResult<Response> {
    let checked = check_sign_up(&form.email, &form.first_name, &form.password1, &form.password2);
    if let Err(problem) = checked {
        return sign_up_again(&state, &form, problem);
    }
    if find_user_by_email(&state.db, form.email.trim()).await?.is_some() {
        return sign_up_again(&state, &form, SignUpError::EmailTaken);
    }

    let new_user = NewUser {
        email: form.email.clone(),
        first_name: form.first_name.clone(),
        password: form.password1.clone(),
        is_admin: count_users(&state.db).await? == 0,
    };
    let user = match create_user(&state.db, &new_user).await {
        Ok(user) => user,
        Err(survey_common::Error::Conflict(_)) => {
            return sign_up_again(&state, &form, SignUpError::EmailTaken)
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.sessions.create(user.id).await;
    state
        .sessions
        .flash(&token, FlashLevel::Success, "Compte créé !")
        .await;
    Ok(signed_in(&token))
}

/// GET /logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> Response {
    state.sessions.remove(&auth.token).await;
    info!("User {} logged out", auth.user.id);
    (
        AppendHeaders([(header::SET_COOKIE, expired_session_cookie())]),
        Redirect::to("/login"),
    )
        .into_response()
}

fn signed_in(token: &str) -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, session_cookie(token))]),
        Redirect::to("/"),
    )
        .into_response()
}

fn sign_up_again(state: &AppState, form: &SignUpForm, problem: SignUpError) -> ApiResult<Response> {
    let flashes = [Flash::new(FlashLevel::Error, problem.to_string())];
    let mut context = base_context(None, &flashes);
    context.insert("email", &form.email);
    context.insert("first_name", &form.first_name);
    Ok(render(&state.templates, "sign_up.html", &context)?.into_response())
}
