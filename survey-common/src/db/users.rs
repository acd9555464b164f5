//! User accounts

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::auth::{generate_salt, hash_password, verify_password};
use crate::{Error, Result};

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LEN: usize = 7;

/// A registered user (without credentials)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub is_admin: bool,
}

/// Data needed to register a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub password: String,
    pub is_admin: bool,
}

/// Sign-up form problems; `Display` is the message shown to users
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignUpError {
    #[error("L'adresse e-mail doit contenir plus de 3 caractères et un '@'.")]
    InvalidEmail,

    #[error("Cette adresse e-mail est déjà utilisée.")]
    EmailTaken,

    #[error("Le prénom doit contenir plus d'un caractère.")]
    FirstNameTooShort,

    #[error("Les mots de passe ne correspondent pas.")]
    PasswordMismatch,

    #[error("Le mot de passe doit contenir au moins 7 caractères.")]
    PasswordTooShort,
}

/// Check sign-up fields (everything but email uniqueness)
pub fn check_sign_up(
    email: &str,
    first_name: &str,
    password: &str,
    confirmation: &str,
) -> std::result::Result<(), SignUpError> {
    let email = email.trim();
    if email.chars().count() <= 3 || !email.contains('@') {
        return Err(SignUpError::InvalidEmail);
    }
    if first_name.trim().chars().count() <= 1 {
        return Err(SignUpError::FirstNameTooShort);
    }
    if password != confirmation {
        return Err(SignUpError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SignUpError::PasswordTooShort);
    }
    Ok(())
}

type UserRow = (i64, String, String, bool);

fn from_row((id, email, first_name, is_admin): UserRow) -> User {
    User {
        id,
        email,
        first_name,
        is_admin,
    }
}

/// Insert a user; a duplicate email is reported as `Error::Conflict`
pub async fn create_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User> {
    let email = new_user.email.trim().to_string();
    let first_name = new_user.first_name.trim().to_string();
    let salt = generate_salt();
    let hash = hash_password(&new_user.password, &salt);

    let result = sqlx::query(
        "INSERT INTO users (email, first_name, password_hash, password_salt, is_admin)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&email)
    .bind(&first_name)
    .bind(&hash)
    .bind(&salt)
    .bind(new_user.is_admin)
    .execute(pool)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(Error::Conflict(format!("email '{}' already registered", email)));
        }
        Err(e) => return Err(e.into()),
    };

    info!("Created user {} ({}, admin: {})", id, email, new_user.is_admin);

    Ok(User {
        id,
        email,
        first_name,
        is_admin: new_user.is_admin,
    })
}

pub async fn find_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id, email, first_name, is_admin FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(from_row))
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id, email, first_name, is_admin FROM users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(pool)
            .await?;
    Ok(row.map(from_row))
}

/// Look up a user by email and check the password
pub async fn authenticate(pool: &SqlitePool, email: &str, password: &str) -> Result<Option<User>> {
    let row: Option<(i64, String, String, bool, String, String)> = sqlx::query_as(
        "SELECT id, email, first_name, is_admin, password_hash, password_salt
         FROM users WHERE email = ?",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(id, email, first_name, is_admin, hash, salt)| {
        verify_password(password, &salt, &hash).then(|| from_row((id, email, first_name, is_admin)))
    }))
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
