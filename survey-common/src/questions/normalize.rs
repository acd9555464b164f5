//! Question normalization
//!
//! Definitions come in two shapes:
//! - keyed entries: `{"key", "label"|"question", "type", "required", "options",
//!   "description"|"desc"}`
//! - legacy entries: `{"question"|"label", "options", "required", "description"}`
//!
//! Both are folded into [`Question`] records with unique slug keys.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

use super::types::{Question, QuestionType};

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]+").expect("regex"));
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("regex"));

/// Fallback slug for text without any usable character
const EMPTY_SLUG: &str = "question";

/// Turn arbitrary text into a `[a-z0-9_]+` identifier
///
/// # Examples
///
/// ```
/// use survey_common::slugify;
///
/// assert_eq!(slugify("  Quel âge avez-vous ? "), "quel_ge_avez_vous");
/// assert_eq!(slugify("?!"), "question");
/// ```
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let replaced = NON_SLUG_CHARS.replace_all(&lowered, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let slug = collapsed.trim_matches('_');
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// One raw entry, classified by shape
enum RawEntry<'a> {
    Keyed(&'a Map<String, Value>),
    Legacy(&'a Map<String, Value>),
}

/// Fields extracted from a raw entry before key resolution
struct Draft<'a> {
    key: String,
    label: String,
    description: String,
    kind: QuestionType,
    required: bool,
    options: Option<&'a Value>,
}

impl<'a> RawEntry<'a> {
    fn classify(entry: &'a Map<String, Value>) -> Self {
        if entry.contains_key("key")
            && (entry.contains_key("label") || entry.contains_key("question"))
        {
            RawEntry::Keyed(entry)
        } else {
            RawEntry::Legacy(entry)
        }
    }

    fn into_draft(self) -> Draft<'a> {
        match self {
            RawEntry::Keyed(entry) => {
                let kind = match text_of(entry.get("type")).trim() {
                    "" => QuestionType::Text,
                    name => QuestionType::parse(name),
                };
                Draft {
                    key: text_of(entry.get("key")).trim().to_string(),
                    label: first_text(entry, &["label", "question"]).trim().to_string(),
                    description: first_text(entry, &["description", "desc"]).trim().to_string(),
                    kind,
                    required: entry.get("required").map(truthy).unwrap_or(false),
                    options: entry.get("options"),
                }
            }
            RawEntry::Legacy(entry) => {
                let label = first_text(entry, &["question", "label"]).trim().to_string();
                let options = entry.get("options");
                let kind = match options {
                    Some(Value::Array(items)) if !items.is_empty() => QuestionType::Choice,
                    _ => QuestionType::Text,
                };
                let mut key = text_of(entry.get("key")).trim().to_string();
                if key.is_empty() {
                    key = slugify(&label);
                }
                Draft {
                    key,
                    label,
                    description: text_of(entry.get("description")).trim().to_string(),
                    kind,
                    required: entry.get("required").map(truthy).unwrap_or(true),
                    options,
                }
            }
        }
    }
}

/// Normalize a raw definition into canonical questions
///
/// Accepts `null`, a bare list of entries or an object with a `questions`
/// list. Anything else yields no questions. Non-object entries and entries
/// without a label are skipped; `id` keeps the 1-based position in the raw
/// list.
pub fn normalize(raw: &Value) -> Vec<Question> {
    let raw = match raw {
        Value::Object(map) if map.contains_key("questions") => &map["questions"],
        other => other,
    };

    let entries = match raw {
        Value::Array(entries) => entries,
        _ => return Vec::new(),
    };

    let mut normalized = Vec::with_capacity(entries.len());
    let mut used_keys: HashSet<String> = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let position = index + 1;
        let Value::Object(entry) = entry else {
            debug!("Skipping non-object question entry at position {}", position);
            continue;
        };

        let draft = RawEntry::classify(entry).into_draft();
        if draft.label.is_empty() {
            debug!("Dropping question without label at position {}", position);
            continue;
        }

        let key = if draft.key.is_empty() {
            format!("q{}", position)
        } else {
            draft.key
        };
        let key = unique_key(slugify(&key), &used_keys);
        used_keys.insert(key.clone());

        let options = draft
            .kind
            .has_options()
            .then(|| clean_options(draft.options));

        normalized.push(Question {
            id: position,
            key,
            label: draft.label,
            description: draft.description,
            kind: draft.kind,
            required: draft.required,
            options,
        });
    }

    normalized
}

fn unique_key(base: String, used: &HashSet<String>) -> String {
    if !used.contains(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn clean_options(options: Option<&Value>) -> Vec<String> {
    match options {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(option_text)
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn option_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Text of a field, empty when the value is absent or falsy
fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(v) if truthy(v) => match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        _ => String::new(),
    }
}

/// Text of the first field (in order) with a non-empty value
fn first_text(entry: &Map<String, Value>, fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| text_of(entry.get(*field)))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn is_slug(key: &str) -> bool {
        !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Age?"), "age");
        assert_eq!(slugify("  First   Name "), "first_name");
        assert_eq!(slugify("__a--b__"), "a_b");
        assert_eq!(slugify("Déjà vu"), "d_j_vu");
    }

    #[test]
    fn test_slugify_only_symbols_falls_back() {
        assert_eq!(slugify("?!#"), "question");
        assert_eq!(slugify(""), "question");
        assert_eq!(slugify("___"), "question");
    }

    #[test]
    fn test_null_and_bad_shapes_yield_nothing() {
        assert!(normalize(&Value::Null).is_empty());
        assert!(normalize(&json!("questions")).is_empty());
        assert!(normalize(&json!({"title": "no questions"})).is_empty());
        assert!(normalize(&json!({"questions": "nope"})).is_empty());
    }

    #[test]
    fn test_wrapped_list_is_unwrapped() {
        let questions = normalize(&json!({"questions": [{"question": "Nom"}]}));
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].key, "nom");
    }

    #[test]
    fn test_legacy_entry_defaults() {
        let questions = normalize(&json!([{"question": "Age?", "options": []}]));

        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        assert_eq!(q.id, 1);
        assert_eq!(q.key, "age");
        assert_eq!(q.label, "Age?");
        assert_eq!(q.kind, QuestionType::Text);
        assert!(q.required);
        assert_eq!(q.options, None);
    }

    #[test]
    fn test_legacy_entry_with_options_is_choice() {
        let questions = normalize(&json!([
            {"question": "Couleur", "options": [" Rouge ", "", "Bleu", null]},
        ]));

        assert_eq!(questions[0].kind, QuestionType::Choice);
        assert_eq!(
            questions[0].options,
            Some(vec!["Rouge".to_string(), "Bleu".to_string()])
        );
    }

    #[test]
    fn test_legacy_required_can_be_disabled() {
        let questions = normalize(&json!([{"label": "Remarques", "required": false}]));
        assert!(!questions[0].required);
    }

    #[test]
    fn test_keyed_entry() {
        let questions = normalize(&json!([
            {
                "key": "Favourite Fruits",
                "label": "Fruits",
                "desc": "Pick some",
                "type": "multi",
                "options": ["Apple", "Pear"]
            },
        ]));

        let q = &questions[0];
        assert_eq!(q.key, "favourite_fruits");
        assert_eq!(q.description, "Pick some");
        assert_eq!(q.kind, QuestionType::Multi);
        assert!(!q.required);
        assert_eq!(q.options(), ["Apple".to_string(), "Pear".to_string()]);
    }

    #[test]
    fn test_keyed_entry_without_options_list() {
        let questions = normalize(&json!([
            {"key": "c", "label": "Choice", "type": "choice", "options": "a,b"},
            {"key": "t", "label": "Text", "type": "text", "options": ["x"]},
        ]));

        assert_eq!(questions[0].options, Some(Vec::new()));
        assert_eq!(questions[1].options, None);
    }

    #[test]
    fn test_empty_key_uses_position() {
        let questions = normalize(&json!([
            "not an object",
            {"key": "", "label": "Second"},
        ]));

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, 2);
        assert_eq!(questions[0].key, "q2");
    }

    #[test]
    fn test_duplicate_keys_get_suffixes() {
        let questions = normalize(&json!([
            {"question": "Q"},
            {"question": "q?"},
            {"key": "q", "label": "Third"},
        ]));

        let keys: Vec<&str> = questions.iter().map(|q| q.key.as_str()).collect();
        assert_eq!(keys, ["q", "q_2", "q_3"]);
    }

    #[test]
    fn test_suffix_skips_taken_keys() {
        let questions = normalize(&json!([
            {"key": "a_2", "label": "One"},
            {"key": "a", "label": "Two"},
            {"key": "a", "label": "Three"},
        ]));

        let keys: Vec<&str> = questions.iter().map(|q| q.key.as_str()).collect();
        assert_eq!(keys, ["a_2", "a", "a_3"]);
    }

    #[test]
    fn test_unlabelled_entries_dropped_without_reserving_keys() {
        let questions = normalize(&json!([
            {"key": "x", "label": "   "},
            {"key": "x", "label": "Kept"},
        ]));

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, 2);
        assert_eq!(questions[0].key, "x");
    }

    #[test]
    fn test_label_falls_back_to_question_field() {
        let questions = normalize(&json!([{"key": "k", "label": "", "question": "Fallback"}]));
        assert_eq!(questions[0].label, "Fallback");
    }

    #[test]
    fn test_keys_are_unique_slugs() {
        let questions = normalize(&json!([
            {"key": "Été", "label": "a"},
            {"key": "été", "label": "b"},
            {"key": "!!", "label": "c"},
            {"question": "!!"},
            {"key": "UPPER case", "label": "d"},
        ]));

        let mut seen = HashSet::new();
        for q in &questions {
            assert!(is_slug(&q.key), "key {:?} is not a slug", q.key);
            assert!(seen.insert(q.key.clone()), "duplicate key {:?}", q.key);
        }
    }

    #[test]
    fn test_truthiness_of_required() {
        let questions = normalize(&json!([
            {"key": "a", "label": "A", "required": 1},
            {"key": "b", "label": "B", "required": "yes"},
            {"key": "c", "label": "C", "required": 0},
            {"key": "d", "label": "D", "required": null},
        ]));

        let required: Vec<bool> = questions.iter().map(|q| q.required).collect();
        assert_eq!(required, [true, true, false, false]);
    }

    #[test]
    fn test_normalized_output_is_stable() {
        let first = normalize(&json!([
            {"question": "Nom"},
            {"key": "age", "label": "Âge", "type": "number", "required": true},
            {"key": "jours", "label": "Jours", "type": "multi", "options": ["Lundi", "Mardi"]},
        ]));

        let saved = serde_json::to_value(&first).unwrap();
        let second = normalize(&json!({ "questions": saved }));
        assert_eq!(first, second);
    }
}
