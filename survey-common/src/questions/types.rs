//! Canonical question records

use serde::{Deserialize, Serialize};

/// Answer type declared by a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Free text (default)
    #[default]
    Text,
    /// Decimal number, `,` accepted as decimal separator
    Number,
    /// Calendar date in `YYYY-MM-DD` form
    Date,
    /// Single selection among the declared options
    Choice,
    /// Multiple selections among the declared options
    Multi,
}

impl QuestionType {
    /// Parse a type name; unknown names fall back to `Text`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "number" => QuestionType::Number,
            "date" => QuestionType::Date,
            "choice" => QuestionType::Choice,
            "multi" => QuestionType::Multi,
            _ => QuestionType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Number => "number",
            QuestionType::Date => "date",
            QuestionType::Choice => "choice",
            QuestionType::Multi => "multi",
        }
    }

    /// Whether questions of this type carry an options list
    pub fn has_options(&self) -> bool {
        matches!(self, QuestionType::Choice | QuestionType::Multi)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized question
///
/// `options` is `Some` only for `choice` and `multi` questions and is left
/// out of the serialized form otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// 1-based position in the source list
    pub id: usize,
    /// Unique slug (`[a-z0-9_]+`) within the questionnaire
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl Question {
    /// Declared options, empty when none
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }
}
