//! Questionnaire pages for respondents

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
    Extension, Form,
};
use serde::Serialize;
use survey_common::questions::{validate, FormSubmission, Question, QuestionType};
use survey_common::results::Submitter;
use survey_common::store::LoadedQuestionnaire;
use tracing::{debug, info};

use super::{flash_redirect, page_context, AuthSession};
use crate::error::ApiResult;
use crate::render::render;
use crate::session::FlashLevel;
use crate::AppState;

/// A question as rendered in the form, with the values to pre-fill
#[derive(Debug, Serialize)]
struct QuestionField<'a> {
    #[serde(flatten)]
    question: &'a Question,
    values: Vec<String>,
}

fn fields<'a>(questions: &'a [Question], submitted: &FormSubmission) -> Vec<QuestionField<'a>> {
    questions
        .iter()
        .map(|question| {
            let values = match question.kind {
                QuestionType::Multi => submitted.values(&question.key).to_vec(),
                _ => submitted
                    .value(&question.key)
                    .map(|v| vec![v.to_string()])
                    .unwrap_or_default(),
            };
            QuestionField { question, values }
        })
        .collect()
}

/// GET /
pub async fn home(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Html<String>> {
    let context = page_context(&state, &auth).await;
    render(&state.templates, "home.html", &context)
}

/// GET /quiz
pub async fn list_questionnaires(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Response> {
    let questionnaires = state.store.list()?;
    if questionnaires.is_empty() {
        return Ok(flash_redirect(
            &state,
            &auth,
            FlashLevel::Info,
            "Aucun questionnaire disponible pour le moment.",
            "/",
        )
        .await);
    }

    let mut context = page_context(&state, &auth).await;
    context.insert("questionnaires", &questionnaires);
    Ok(render(&state.templates, "quiz_list.html", &context)?.into_response())
}

/// GET /q/:qid
pub async fn show_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Path(qid): Path<String>,
) -> ApiResult<Response> {
    let questions = match load_or_redirect(&state, &auth, &qid).await? {
        Ok(questions) => questions,
        Err(redirect) => return Ok(redirect),
    };

    let mut context = page_context(&state, &auth).await;
    context.insert("qid", &qid);
    context.insert("fields", &fields(&questions, &FormSubmission::new()));
    Ok(render(&state.templates, "quiz.html", &context)?.into_response())
}

/// POST /q/:qid
///
/// Invalid submissions re-render the form with one flash per problem; valid
/// ones are appended to the questionnaire's result log.
pub async fn submit_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Path(qid): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let questions = match load_or_redirect(&state, &auth, &qid).await? {
        Ok(questions) => questions,
        Err(redirect) => return Ok(redirect),
    };

    let submission = FormSubmission::from_pairs(pairs);
    let answers = match validate(&questions, &submission).into_result() {
        Ok(answers) => answers,
        Err(errors) => {
            debug!("Rejected submission for '{}': {} problems", qid, errors.len());
            for error in &errors {
                state
                    .sessions
                    .flash(&auth.token, FlashLevel::Error, error.to_string())
                    .await;
            }
            let mut context = page_context(&state, &auth).await;
            context.insert("qid", &qid);
            context.insert("fields", &fields(&questions, &submission));
            return Ok(render(&state.templates, "quiz.html", &context)?.into_response());
        }
    };

    let submitter = Submitter {
        id: auth.user.id,
        name: auth.user.first_name.clone(),
        email: auth.user.email.clone(),
    };
    {
        let _guard = state.append_lock.lock().await;
        state.store.append_result(
            &qid,
            &questions,
            &answers,
            &submitter,
            chrono::Local::now().date_naive(),
        )?;
    }
    info!("Recorded answers of user {} for '{}'", auth.user.id, qid);

    Ok(flash_redirect(
        &state,
        &auth,
        FlashLevel::Success,
        "Merci ! Vos réponses ont été enregistrées.",
        "/quiz",
    )
    .await)
}

/// Questions of `qid`, or a redirect to `/quiz` with the reason flashed
async fn load_or_redirect(
    state: &AppState,
    auth: &AuthSession,
    qid: &str,
) -> ApiResult<Result<Vec<Question>, Response>> {
    let message = match state.store.load(qid)? {
        LoadedQuestionnaire::Questions(questions) => return Ok(Ok(questions)),
        LoadedQuestionnaire::NotFound => format!("Questionnaire '{}' introuvable.", qid),
        LoadedQuestionnaire::Unusable => {
            "Le fichier JSON est vide ou n'a pas un format lisible.".to_string()
        }
    };
    Ok(Err(
        flash_redirect(state, auth, FlashLevel::Error, message, "/quiz").await,
    ))
}
