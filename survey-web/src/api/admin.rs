//! Administration pages: questionnaire management and results

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Extension, Form,
};
use survey_common::questions::{slugify, QuestionType};
use survey_common::store::{is_valid_id, CreateError, ImportError, QuestionDraft};
use tracing::{info, warn};

use super::{flash_redirect, page_context, require_admin, AuthSession};
use crate::error::{ApiError, ApiResult};
use crate::render::render;
use crate::session::FlashLevel;
use crate::AppState;

const LIST_PAGE: &str = "/admin/questionnaires";
const CREATE_PAGE: &str = "/admin/questionnaires/create";
const UPLOAD_PAGE: &str = "/admin/questionnaires/upload";

/// Question blocks offered by the creation form
const CREATE_FORM_QUESTIONS: usize = 10;
/// Option inputs per question block
const CREATE_FORM_OPTIONS: usize = 6;

/// GET /admin/questionnaires
pub async fn admin_questionnaires(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Html<String>> {
    require_admin(&auth)?;

    let questionnaires = state.store.list()?;
    let mut context = page_context(&state, &auth).await;
    context.insert("questionnaires", &questionnaires);
    render(&state.templates, "admin_questionnaires.html", &context)
}

/// POST /admin/questionnaires/:qid/delete
///
/// Removes the definition and its result log.
pub async fn delete_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Path(qid): Path<String>,
) -> ApiResult<Response> {
    require_admin(&auth)?;

    let (level, message) = if state.store.delete(&qid)? {
        (FlashLevel::Success, format!("Questionnaire '{}' supprimé avec succès.", qid))
    } else {
        (FlashLevel::Error, format!("Questionnaire '{}' introuvable.", qid))
    };
    Ok(flash_redirect(&state, &auth, level, message, LIST_PAGE).await)
}

/// GET /admin/questionnaires/create
pub async fn create_form(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Html<String>> {
    require_admin(&auth)?;

    let mut context = page_context(&state, &auth).await;
    context.insert("slots", &(1..=CREATE_FORM_QUESTIONS).collect::<Vec<_>>());
    context.insert("option_slots", &(1..=CREATE_FORM_OPTIONS).collect::<Vec<_>>());
    render(&state.templates, "admin_create.html", &context)
}

/// POST /admin/questionnaires/create
pub async fn create_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Form(form): Form<HashMap<String, String>>,
) -> ApiResult<Response> {
    require_admin(&auth)?;

    let raw_id = form.get("qid").map(String::as_str).unwrap_or_default();
    let drafts = collect_drafts(&form);

    match state.store.create(raw_id, &drafts) {
        Ok(qid) => {
            info!("User {} created questionnaire '{}'", auth.user.id, qid);
            let message = format!("Questionnaire '{}' créé.", qid);
            Ok(flash_redirect(&state, &auth, FlashLevel::Success, message, LIST_PAGE).await)
        }
        Err(CreateError::Storage(e)) => Err(e.into()),
        Err(problem) => {
            let message = problem.to_string();
            Ok(flash_redirect(&state, &auth, FlashLevel::Error, message, CREATE_PAGE).await)
        }
    }
}

/// Read the indexed question blocks of the creation form
///
/// Blocks are numbered from 1; reading stops at the first block after the
/// first one whose label, key and description are all blank. Blocks without
/// a label are skipped.
pub fn collect_drafts(form: &HashMap<String, String>) -> Vec<QuestionDraft> {
    let field = |name: String| form.get(&name).map(|v| v.trim()).unwrap_or_default();

    let mut drafts = Vec::new();
    for idx in 1.. {
        let label = field(format!("label_{}", idx));
        let key = field(format!("key_{}", idx));
        let description = field(format!("desc_{}", idx));

        if label.is_empty() && key.is_empty() && description.is_empty() && idx > 1 {
            break;
        }
        if label.is_empty() {
            continue;
        }

        let kind = QuestionType::parse(field(format!("type_{}", idx)));
        let key = if key.is_empty() { slugify(label) } else { slugify(key) };
        let options = kind.has_options().then(|| {
            (1..)
                .map_while(|opt| form.get(&format!("option_{}_{}", idx, opt)))
                .map(|opt| opt.trim())
                .filter(|opt| !opt.is_empty())
                .map(str::to_string)
                .collect()
        });

        drafts.push(QuestionDraft {
            key,
            label: label.to_string(),
            description: description.to_string(),
            kind,
            required: !field(format!("required_{}", idx)).is_empty(),
            options,
        });
    }
    drafts
}

/// GET /admin/questionnaires/:qid/results
pub async fn questionnaire_results(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Path(qid): Path<String>,
) -> ApiResult<Html<String>> {
    require_admin(&auth)?;

    let table = state.store.results(&qid)?;
    if table.is_none() {
        state
            .sessions
            .flash(
                &auth.token,
                FlashLevel::Info,
                "Aucun résultat trouvé pour ce questionnaire.",
            )
            .await;
    }

    let table = table.unwrap_or_default();
    let mut context = page_context(&state, &auth).await;
    context.insert("qid", &qid);
    context.insert("fieldnames", &table.fieldnames);
    context.insert("rows", &table.rows);
    render(&state.templates, "admin_results.html", &context)
}

/// GET /admin/questionnaires/:qid/results/download
pub async fn download_results(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    Path(qid): Path<String>,
) -> ApiResult<Response> {
    require_admin(&auth)?;

    let Some(path) = state.store.results_file(&qid) else {
        // Only well-formed identifiers are echoed back into the Location header
        let results_page = if is_valid_id(&qid) {
            format!("{}/{}/results", LIST_PAGE, qid)
        } else {
            LIST_PAGE.to_string()
        };
        return Ok(flash_redirect(
            &state,
            &auth,
            FlashLevel::Info,
            "Aucun fichier de résultats à télécharger pour ce questionnaire.",
            &results_page,
        )
        .await);
    };

    let content = tokio::fs::read(&path).await?;
    let disposition = format!("attachment; filename=\"{}_results.csv\"", qid);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

/// GET /admin/questionnaires/upload
pub async fn upload_form(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Html<String>> {
    require_admin(&auth)?;

    let context = page_context(&state, &auth).await;
    render(&state.templates, "admin_upload.html", &context)
}

/// POST /admin/questionnaires/upload
///
/// Saves the `file` part; an existing definition with the same name is
/// replaced.
pub async fn upload_questionnaire(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthSession>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    require_admin(&auth)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((filename, content));
        break;
    }

    let (filename, content) = upload.unwrap_or_default();
    let outcome = match state.store.import(&filename, &content) {
        Ok(outcome) => outcome,
        Err(ImportError::Storage(e)) => return Err(e.into()),
        Err(problem) => {
            return Ok(
                flash_redirect(&state, &auth, FlashLevel::Error, problem.to_string(), UPLOAD_PAGE)
                    .await,
            )
        }
    };

    if !outcome.recognized {
        warn!("Uploaded questionnaire '{}' holds no usable question", outcome.filename);
        state
            .sessions
            .flash(
                &auth.token,
                FlashLevel::Error,
                "Import OK, mais le JSON n'est pas reconnu (format inattendu ou vide).",
            )
            .await;
    }
    let message = format!("Questionnaire '{}' importé.", outcome.filename);
    Ok(flash_redirect(&state, &auth, FlashLevel::Success, message, LIST_PAGE).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_collect_drafts_reads_blocks() {
        let drafts = collect_drafts(&form(&[
            ("label_1", "Âge ?"),
            ("type_1", "number"),
            ("required_1", "1"),
            ("label_2", "Couleur"),
            ("key_2", "Fav Color"),
            ("type_2", "choice"),
            ("option_2_1", " Rouge "),
            ("option_2_2", ""),
            ("option_2_3", "Bleu"),
        ]));

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].key, "ge");
        assert_eq!(drafts[0].kind, QuestionType::Number);
        assert!(drafts[0].required);
        assert_eq!(drafts[0].options, None);

        assert_eq!(drafts[1].key, "fav_color");
        assert!(!drafts[1].required);
        assert_eq!(
            drafts[1].options,
            Some(vec!["Rouge".to_string(), "Bleu".to_string()])
        );
    }

    #[test]
    fn test_collect_drafts_stops_at_first_blank_block() {
        let drafts = collect_drafts(&form(&[
            ("label_1", "Nom"),
            ("label_3", "Jamais lu"),
        ]));

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].key, "nom");
        assert_eq!(drafts[0].kind, QuestionType::Text);
    }

    #[test]
    fn test_collect_drafts_skips_unlabelled_blocks() {
        let drafts = collect_drafts(&form(&[
            ("key_1", "orphan"),
            ("desc_2", "sans libellé"),
            ("label_3", "Ville"),
        ]));

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].key, "ville");
    }

    #[test]
    fn test_collect_drafts_empty_form() {
        assert!(collect_drafts(&HashMap::new()).is_empty());
    }
}
