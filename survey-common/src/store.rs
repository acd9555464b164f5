//! Questionnaire definition storage
//!
//! Layout under the root folder:
//! - `questionnaire/<id>.json` : raw definitions (normalized on every load)
//! - `results/<id>.csv` : result logs, see [`crate::results`]

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::questions::{normalize, slugify, Answers, Question, QuestionType};
use crate::results::{self, ResultTable, Submitter};
use crate::{Error, Result};

pub const QUESTIONNAIRE_DIR: &str = "questionnaire";
pub const RESULTS_DIR: &str = "results";

const DEFINITION_EXTENSION: &str = "json";
const RESULTS_EXTENSION: &str = "csv";

/// Entry of the questionnaire listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionnaireSummary {
    pub id: String,
    pub filename: String,
    pub has_results: bool,
}

/// Outcome of loading a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedQuestionnaire {
    /// No definition file for this identifier
    NotFound,
    /// The file exists but is not JSON or holds no usable question
    Unusable,
    Questions(Vec<Question>),
}

/// A question entered in the admin creation form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionDraft {
    pub key: String,
    pub label: String,
    pub description: String,
    pub kind: QuestionType,
    pub required: bool,
    /// Only collected for choice/multi questions
    pub options: Option<Vec<String>>,
}

impl QuestionDraft {
    fn to_json(&self) -> Value {
        let mut value = json!({
            "key": self.key,
            "label": self.label,
            "description": self.description,
            "type": self.kind,
            "required": self.required,
        });
        if let Some(options) = &self.options {
            value["options"] = json!(options);
        }
        value
    }
}

/// Errors of the admin creation form
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("Identifiant invalide.")]
    InvalidId,

    #[error("Un questionnaire avec cet identifiant existe déjà.")]
    AlreadyExists,

    #[error("Ajoute au moins une question.")]
    NoQuestions,

    #[error("Impossible de créer le questionnaire (questions invalides).")]
    InvalidQuestions,

    #[error(transparent)]
    Storage(#[from] Error),
}

/// Errors of the JSON upload form
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Aucun fichier sélectionné.")]
    NoFile,

    #[error("Seuls les fichiers .json sont autorisés.")]
    NotJson,

    #[error(transparent)]
    Storage(#[from] Error),
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub id: String,
    pub filename: String,
    /// Whether the definition normalized to at least one question
    pub recognized: bool,
}

/// Filesystem-backed questionnaire store
#[derive(Debug, Clone)]
pub struct QuestionnaireStore {
    questionnaire_dir: PathBuf,
    results_dir: PathBuf,
}

impl QuestionnaireStore {
    /// Store rooted at `root` (`root/questionnaire`, `root/results`)
    pub fn new(root: &Path) -> Self {
        Self {
            questionnaire_dir: root.join(QUESTIONNAIRE_DIR),
            results_dir: root.join(RESULTS_DIR),
        }
    }

    pub fn questionnaire_dir(&self) -> &Path {
        &self.questionnaire_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Create both directories if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.questionnaire_dir)?;
        fs::create_dir_all(&self.results_dir)?;
        Ok(())
    }

    /// All definitions, sorted by identifier
    pub fn list(&self) -> Result<Vec<QuestionnaireSummary>> {
        if !self.questionnaire_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut questionnaires = Vec::new();
        for entry in fs::read_dir(&self.questionnaire_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DEFINITION_EXTENSION) {
                continue;
            }
            let (Some(id), Some(filename)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.file_name().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            if !is_valid_id(id) {
                continue;
            }
            questionnaires.push(QuestionnaireSummary {
                id: id.to_string(),
                filename: filename.to_string(),
                has_results: self.results_file(id).is_some(),
            });
        }

        questionnaires.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(questionnaires)
    }

    /// Load and normalize a definition
    pub fn load(&self, id: &str) -> Result<LoadedQuestionnaire> {
        let Some(path) = self.definition_path(id) else {
            return Ok(LoadedQuestionnaire::NotFound);
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadedQuestionnaire::NotFound)
            }
            Err(e) => return Err(e.into()),
        };

        let raw: Value = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Questionnaire '{}' is not valid JSON: {}", id, e);
                return Ok(LoadedQuestionnaire::Unusable);
            }
        };

        let questions = normalize(&raw);
        if questions.is_empty() {
            Ok(LoadedQuestionnaire::Unusable)
        } else {
            Ok(LoadedQuestionnaire::Questions(questions))
        }
    }

    /// Create a definition from the admin form
    ///
    /// The identifier is slugified; the stored definition is the normalized
    /// question list wrapped in `{"questions": [...]}`.
    pub fn create(
        &self,
        raw_id: &str,
        drafts: &[QuestionDraft],
    ) -> std::result::Result<String, CreateError> {
        if raw_id.trim().is_empty() {
            return Err(CreateError::InvalidId);
        }
        let id = slugify(raw_id);

        fs::create_dir_all(&self.questionnaire_dir).map_err(Error::from)?;
        let path = self.definition_path(&id).ok_or(CreateError::InvalidId)?;
        if path.exists() {
            return Err(CreateError::AlreadyExists);
        }

        if drafts.is_empty() {
            return Err(CreateError::NoQuestions);
        }

        let entries: Vec<Value> = drafts.iter().map(QuestionDraft::to_json).collect();
        let raw = json!({ "questions": entries });
        let normalized = normalize(&raw);
        if normalized.is_empty() {
            return Err(CreateError::InvalidQuestions);
        }

        let payload = serde_json::to_string_pretty(&json!({ "questions": normalized }))
            .map_err(Error::from)?;
        fs::write(&path, payload).map_err(Error::from)?;

        info!("Created questionnaire '{}' with {} questions", id, normalized.len());
        Ok(id)
    }

    /// Save an uploaded JSON definition (overwrites an existing file)
    pub fn import(
        &self,
        filename: &str,
        content: &[u8],
    ) -> std::result::Result<ImportOutcome, ImportError> {
        if filename.trim().is_empty() {
            return Err(ImportError::NoFile);
        }
        if !has_json_extension(filename) {
            return Err(ImportError::NotJson);
        }

        // Stored as `<id>.json` whatever the case of the uploaded extension
        let id = secure_filename(filename)
            .rsplit_once('.')
            .filter(|(_, ext)| ext.eq_ignore_ascii_case(DEFINITION_EXTENSION))
            .map(|(stem, _)| stem.to_string())
            .ok_or(ImportError::NotJson)?;
        if !is_valid_id(&id) {
            return Err(ImportError::NotJson);
        }
        let filename = format!("{}.{}", id, DEFINITION_EXTENSION);

        fs::create_dir_all(&self.questionnaire_dir).map_err(Error::from)?;
        fs::write(self.questionnaire_dir.join(&filename), content).map_err(Error::from)?;

        let recognized = matches!(self.load(&id)?, LoadedQuestionnaire::Questions(_));
        info!("Imported questionnaire '{}' (recognized: {})", filename, recognized);

        Ok(ImportOutcome {
            id,
            filename,
            recognized,
        })
    }

    /// Remove a definition and its result log
    ///
    /// Returns `false` when no definition existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let Some(definition) = self.definition_path(id) else {
            return Ok(false);
        };

        let deleted = if definition.exists() {
            fs::remove_file(&definition)?;
            true
        } else {
            false
        };

        if let Some(results) = self.results_file(id) {
            fs::remove_file(results)?;
        }

        if deleted {
            info!("Deleted questionnaire '{}'", id);
        }
        Ok(deleted)
    }

    /// Append a validated answer row to the questionnaire's result log
    pub fn append_result(
        &self,
        id: &str,
        questions: &[Question],
        answers: &Answers,
        submitter: &Submitter,
        date: NaiveDate,
    ) -> Result<()> {
        let path = self
            .results_path(id)
            .ok_or_else(|| Error::NotFound(format!("questionnaire '{}'", id)))?;
        results::append_row(&path, questions, answers, submitter, date)
    }

    /// Parsed result log, `None` when there is none
    pub fn results(&self, id: &str) -> Result<Option<ResultTable>> {
        match self.results_path(id) {
            Some(path) => results::read_table(&path),
            None => Ok(None),
        }
    }

    /// Path of an existing result log
    pub fn results_file(&self, id: &str) -> Option<PathBuf> {
        self.results_path(id).filter(|path| path.exists())
    }

    fn results_path(&self, id: &str) -> Option<PathBuf> {
        is_valid_id(id).then(|| {
            self.results_dir
                .join(format!("{}.{}", id, RESULTS_EXTENSION))
        })
    }

    fn definition_path(&self, id: &str) -> Option<PathBuf> {
        is_valid_id(id).then(|| {
            self.questionnaire_dir
                .join(format!("{}.{}", id, DEFINITION_EXTENSION))
        })
    }
}

/// Identifiers are file stems: ASCII letters, digits, `_`, `-`, `.`, not
/// starting with `.`
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() < 200
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn has_json_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case(DEFINITION_EXTENSION))
        .unwrap_or(false)
}

/// Reduce an uploaded file name to a safe ASCII name
///
/// Transliterates to ASCII, turns path separators and whitespace into `_`,
/// drops anything outside `[A-Za-z0-9_.-]` and strips leading/trailing
/// `.` and `_`.
pub fn secure_filename(filename: &str) -> String {
    let ascii = unidecode::unidecode(filename).replace(|c| c == '/' || c == '\\', " ");
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Survey.json"), "My_Survey.json");
        assert_eq!(secure_filename("../../etc/passwd.json"), "etc_passwd.json");
        assert_eq!(secure_filename("été 2024.json"), "ete_2024.json");
        assert_eq!(secure_filename("__.json"), "json");
    }

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_id("satisfaction_2024"));
        assert!(is_valid_id("my-quiz.v2"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../secret"));
        assert!(!is_valid_id(".hidden"));
        assert!(!is_valid_id("a/b"));
    }

    #[test]
    fn test_json_extension() {
        assert!(has_json_extension("a.json"));
        assert!(has_json_extension("a.JSON"));
        assert!(!has_json_extension("a.csv"));
        assert!(!has_json_extension("json"));
    }

    #[test]
    fn test_draft_json_keeps_options_only_when_set() {
        let draft = QuestionDraft {
            key: "k".to_string(),
            label: "L".to_string(),
            kind: QuestionType::Multi,
            options: Some(vec!["A".to_string()]),
            ..Default::default()
        };
        let value = draft.to_json();
        assert_eq!(value["type"], "multi");
        assert_eq!(value["options"], json!(["A"]));

        let plain = QuestionDraft {
            label: "L".to_string(),
            ..Default::default()
        };
        assert!(plain.to_json().get("options").is_none());
    }
}
