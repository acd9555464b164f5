//! Integration tests for the questionnaire store
//!
//! Covers definition listing/loading, admin creation, JSON import, deletion
//! and result logging against a temporary root folder.

use chrono::NaiveDate;
use std::fs;
use survey_common::questions::{validate, FormSubmission, QuestionType};
use survey_common::results::Submitter;
use survey_common::store::{
    CreateError, ImportError, LoadedQuestionnaire, QuestionDraft, QuestionnaireStore,
};
use tempfile::TempDir;

fn setup_store() -> (TempDir, QuestionnaireStore) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let store = QuestionnaireStore::new(dir.path());
    (dir, store)
}

fn write_definition(store: &QuestionnaireStore, id: &str, content: &str) {
    fs::create_dir_all(store.questionnaire_dir()).unwrap();
    fs::write(store.questionnaire_dir().join(format!("{}.json", id)), content).unwrap();
}

fn submitter() -> Submitter {
    Submitter {
        id: 1,
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    }
}

fn draft(label: &str, kind: QuestionType, options: Option<&[&str]>) -> QuestionDraft {
    QuestionDraft {
        label: label.to_string(),
        kind,
        options: options.map(|o| o.iter().map(|s| s.to_string()).collect()),
        ..Default::default()
    }
}

// =============================================================================
// Listing and loading
// =============================================================================

#[test]
fn test_list_without_directory_is_empty() {
    let (_dir, store) = setup_store();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_list_sorted_with_result_flags() {
    let (_dir, store) = setup_store();
    write_definition(&store, "zeta", "[]");
    write_definition(&store, "alpha", "[]");
    fs::write(store.questionnaire_dir().join("notes.txt"), "ignored").unwrap();
    fs::create_dir_all(store.results_dir()).unwrap();
    fs::write(store.results_dir().join("zeta.csv"), "date;user_id\n").unwrap();

    let listing = store.list().unwrap();
    let ids: Vec<&str> = listing.iter().map(|q| q.id.as_str()).collect();

    assert_eq!(ids, ["alpha", "zeta"]);
    assert_eq!(listing[0].filename, "alpha.json");
    assert!(!listing[0].has_results);
    assert!(listing[1].has_results);
}

#[test]
fn test_load_distinguishes_missing_and_unusable() {
    let (_dir, store) = setup_store();
    write_definition(&store, "broken", "{ not json");
    write_definition(&store, "empty", r#"{"questions": []}"#);
    write_definition(&store, "ok", r#"[{"question": "Age?", "options": []}]"#);

    assert_eq!(store.load("missing").unwrap(), LoadedQuestionnaire::NotFound);
    assert_eq!(store.load("../ok").unwrap(), LoadedQuestionnaire::NotFound);
    assert_eq!(store.load("broken").unwrap(), LoadedQuestionnaire::Unusable);
    assert_eq!(store.load("empty").unwrap(), LoadedQuestionnaire::Unusable);

    match store.load("ok").unwrap() {
        LoadedQuestionnaire::Questions(questions) => {
            assert_eq!(questions.len(), 1);
            assert_eq!(questions[0].key, "age");
            assert_eq!(questions[0].kind, QuestionType::Text);
            assert!(questions[0].required);
        }
        other => panic!("Expected questions, got {:?}", other),
    }
}

// =============================================================================
// Creation
// =============================================================================

#[test]
fn test_create_writes_normalized_definition() {
    let (_dir, store) = setup_store();
    let drafts = vec![
        draft("Votre âge", QuestionType::Number, None),
        draft("Jours", QuestionType::Multi, Some(&["Lundi", " ", "Mardi"])),
    ];

    let id = store.create("Satisfaction 2024!", &drafts).unwrap();
    assert_eq!(id, "satisfaction_2024");

    let raw: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(store.questionnaire_dir().join("satisfaction_2024.json")).unwrap(),
    )
    .unwrap();
    let saved = raw["questions"].as_array().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0]["key"], "votre_ge");
    assert!(saved[0].get("options").is_none());
    assert_eq!(saved[1]["options"], serde_json::json!(["Lundi", "Mardi"]));

    match store.load(&id).unwrap() {
        LoadedQuestionnaire::Questions(questions) => assert_eq!(questions.len(), 2),
        other => panic!("Expected questions, got {:?}", other),
    }
}

#[test]
fn test_create_rejections() {
    let (_dir, store) = setup_store();
    let drafts = vec![draft("Nom", QuestionType::Text, None)];

    assert!(matches!(store.create("  ", &drafts), Err(CreateError::InvalidId)));
    assert!(matches!(store.create("quiz", &[]), Err(CreateError::NoQuestions)));
    assert!(matches!(
        store.create("quiz", &[draft("   ", QuestionType::Text, None)]),
        Err(CreateError::InvalidQuestions)
    ));

    store.create("quiz", &drafts).unwrap();
    let duplicate = store.create("Quiz", &drafts);
    assert!(matches!(duplicate, Err(CreateError::AlreadyExists)));
    assert_eq!(
        duplicate.unwrap_err().to_string(),
        "Un questionnaire avec cet identifiant existe déjà."
    );
}

// =============================================================================
// Import
// =============================================================================

#[test]
fn test_import_saves_sanitized_file() {
    let (_dir, store) = setup_store();

    let outcome = store
        .import("Mon Quiz.json", br#"{"questions": [{"question": "Nom"}]}"#)
        .unwrap();

    assert_eq!(outcome.id, "Mon_Quiz");
    assert_eq!(outcome.filename, "Mon_Quiz.json");
    assert!(outcome.recognized);
    assert!(store.questionnaire_dir().join("Mon_Quiz.json").exists());
}

#[test]
fn test_import_uppercase_extension() {
    let (_dir, store) = setup_store();

    let outcome = store
        .import("Upper.JSON", br#"{"questions": [{"question": "Nom"}]}"#)
        .unwrap();

    assert_eq!(outcome.id, "Upper");
    assert_eq!(outcome.filename, "Upper.json");
    assert!(outcome.recognized);
    assert!(matches!(store.load("Upper").unwrap(), LoadedQuestionnaire::Questions(_)));
    assert!(store.list().unwrap().iter().any(|entry| entry.id == "Upper"));
}

#[test]
fn test_import_unrecognized_content_is_kept() {
    let (_dir, store) = setup_store();

    let outcome = store.import("weird.json", b"{\"title\": 1}").unwrap();

    assert!(!outcome.recognized);
    assert_eq!(store.load("weird").unwrap(), LoadedQuestionnaire::Unusable);
}

#[test]
fn test_import_rejections() {
    let (_dir, store) = setup_store();

    assert!(matches!(store.import("", b"[]"), Err(ImportError::NoFile)));
    assert!(matches!(store.import("data.csv", b"[]"), Err(ImportError::NotJson)));
    assert!(matches!(store.import("json", b"[]"), Err(ImportError::NotJson)));
}

// =============================================================================
// Deletion and results
// =============================================================================

#[test]
fn test_delete_removes_definition_and_results() {
    let (_dir, store) = setup_store();
    write_definition(&store, "quiz", r#"[{"question": "Nom"}]"#);

    let questions = match store.load("quiz").unwrap() {
        LoadedQuestionnaire::Questions(q) => q,
        other => panic!("Expected questions, got {:?}", other),
    };
    let answers = validate(&questions, &FormSubmission::new().with_value("nom", "Ada"))
        .into_result()
        .unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    store
        .append_result("quiz", &questions, &answers, &submitter(), date)
        .unwrap();
    assert!(store.results_file("quiz").is_some());

    assert!(store.delete("quiz").unwrap());
    assert!(store.results_file("quiz").is_none());
    assert_eq!(store.load("quiz").unwrap(), LoadedQuestionnaire::NotFound);

    assert!(!store.delete("quiz").unwrap());
}

#[test]
fn test_results_table() {
    let (_dir, store) = setup_store();
    write_definition(
        &store,
        "quiz",
        r#"[{"key": "jours", "label": "Jours", "type": "multi", "options": ["A", "B"]}]"#,
    );
    let questions = match store.load("quiz").unwrap() {
        LoadedQuestionnaire::Questions(q) => q,
        other => panic!("Expected questions, got {:?}", other),
    };

    assert!(store.results("quiz").unwrap().is_none());

    let answers = validate(
        &questions,
        &FormSubmission::from_pairs(vec![("jours[]", "A"), ("jours[]", "B")]),
    )
    .into_result()
    .unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    store
        .append_result("quiz", &questions, &answers, &submitter(), date)
        .unwrap();

    let table = store.results("quiz").unwrap().unwrap();
    assert_eq!(
        table.fieldnames,
        ["date", "user_id", "user_name", "user_email", "jours"]
    );
    assert_eq!(
        table.rows,
        vec![vec!["31/12/2024", "1", "Ada", "ada@example.com", "A | B"]]
    );
}
