//! Answer validation
//!
//! Checks a form submission against normalized questions. Every question is
//! evaluated once and all problems are collected; answers are only usable
//! when no error was recorded.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use super::types::{Question, QuestionType};

/// Four-digit year, unsigned; month and day may omit the leading zero
static DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}$").expect("regex"));

/// Separator used to store multiple selections in one cell
pub const MULTI_SEPARATOR: &str = " | ";

/// Suffix marking list-valued form fields (`key[]`)
pub const LIST_FIELD_SUFFIX: &str = "[]";

/// Submitted form values, split into single and list-valued fields
#[derive(Debug, Clone, Default)]
pub struct FormSubmission {
    single: HashMap<String, String>,
    multi: HashMap<String, Vec<String>>,
}

impl FormSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ordered form pairs
    ///
    /// Names ending in `[]` accumulate into a list; for plain names the first
    /// occurrence wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut submission = Self::new();
        for (name, value) in pairs {
            let name = name.into();
            match name.strip_suffix(LIST_FIELD_SUFFIX) {
                Some(key) => submission
                    .multi
                    .entry(key.to_string())
                    .or_default()
                    .push(value.into()),
                None => {
                    submission.single.entry(name).or_insert_with(|| value.into());
                }
            }
        }
        submission
    }

    /// Set a single-valued field
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.single.insert(key.into(), value.into());
        self
    }

    /// Set a list-valued field
    pub fn with_values<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.multi
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.single.get(key).map(String::as_str)
    }

    pub fn values(&self, key: &str) -> &[String] {
        self.multi.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Accepted answers keyed by question key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Answers {
    values: HashMap<String, String>,
}

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A per-question validation failure; `Display` is the message shown to users
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("'{label}' est obligatoire.")]
    Required { key: String, label: String },

    #[error("'{label}' doit être un nombre valide.")]
    InvalidNumber { key: String, label: String },

    #[error("'{label}' doit être une date valide (YYYY-MM-DD).")]
    InvalidDate { key: String, label: String },

    #[error("Réponse invalide pour '{label}'.")]
    InvalidChoice { key: String, label: String },

    #[error("Réponses invalides pour '{label}'.")]
    InvalidChoices { key: String, label: String },
}

impl AnswerError {
    /// Key of the question that failed
    pub fn key(&self) -> &str {
        match self {
            AnswerError::Required { key, .. }
            | AnswerError::InvalidNumber { key, .. }
            | AnswerError::InvalidDate { key, .. }
            | AnswerError::InvalidChoice { key, .. }
            | AnswerError::InvalidChoices { key, .. } => key,
        }
    }
}

/// Outcome of one validation pass
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub answers: Answers,
    pub errors: Vec<AnswerError>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// User-facing messages, in question order
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Answers when every question passed, otherwise all errors
    pub fn into_result(self) -> Result<Answers, Vec<AnswerError>> {
        if self.errors.is_empty() {
            Ok(self.answers)
        } else {
            Err(self.errors)
        }
    }
}

/// Validate a submission against normalized questions
pub fn validate(questions: &[Question], submitted: &FormSubmission) -> Validation {
    let mut validation = Validation::default();

    for question in questions {
        let value = submitted_value(question, submitted);

        if value.is_empty() {
            if question.required {
                validation.errors.push(AnswerError::Required {
                    key: question.key.clone(),
                    label: question.label.clone(),
                });
            } else {
                validation.answers.insert(question.key.as_str(), "");
            }
            continue;
        }

        match check_value(question, &value) {
            Ok(()) => validation.answers.insert(question.key.as_str(), value),
            Err(error) => validation.errors.push(error),
        }
    }

    validation
}

/// Split a stored multi answer back into its selections
pub fn split_selections(value: &str) -> Vec<&str> {
    value
        .split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

fn submitted_value(question: &Question, submitted: &FormSubmission) -> String {
    match question.kind {
        QuestionType::Multi => submitted
            .values(&question.key)
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(MULTI_SEPARATOR),
        _ => submitted
            .value(&question.key)
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
    }
}

fn check_value(question: &Question, value: &str) -> Result<(), AnswerError> {
    let key = question.key.clone();
    let label = question.label.clone();
    let options = question.options();

    match question.kind {
        QuestionType::Text => Ok(()),
        QuestionType::Number => value
            .replace(',', ".")
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| AnswerError::InvalidNumber { key, label }),
        QuestionType::Date if !DATE_SHAPE.is_match(value) => {
            Err(AnswerError::InvalidDate { key, label })
        }
        QuestionType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|_| ())
            .map_err(|_| AnswerError::InvalidDate { key, label }),
        QuestionType::Choice => {
            if options.is_empty() || options.iter().any(|o| o == value) {
                Ok(())
            } else {
                Err(AnswerError::InvalidChoice { key, label })
            }
        }
        QuestionType::Multi => {
            let all_known = split_selections(value)
                .into_iter()
                .all(|part| options.iter().any(|o| o == part));
            if options.is_empty() || all_known {
                Ok(())
            } else {
                Err(AnswerError::InvalidChoices { key, label })
            }
        }
    }
}
