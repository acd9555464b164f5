//! # Survey Common Library
//!
//! Shared code for the questionnaire service:
//! - Question normalization and answer validation
//! - Questionnaire definition storage and CSV result logs
//! - User database and password hashing
//! - Configuration loading and root folder resolution

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod questions;
pub mod results;
pub mod store;

pub use error::{Error, Result};
pub use questions::{normalize, slugify, validate, Question, QuestionType};
