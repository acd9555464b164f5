//! Questionnaire questions: canonical records, normalization, validation

pub mod normalize;
pub mod types;
pub mod validate;

pub use normalize::{normalize, slugify};
pub use types::{Question, QuestionType};
pub use validate::{
    split_selections, validate, AnswerError, Answers, FormSubmission, Validation,
    MULTI_SEPARATOR,
};
