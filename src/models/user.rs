// src/models/user.rs

use std::{borrow::Cow, str::FromStr, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Account role. Stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,

    /// Unique handle.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub role: Role,
    pub is_active: bool,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated account ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub bio: String,
}

/// DTO for creating a new user (Signup).
///
/// A client-supplied `role` is not part of the contract and is ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name is required (max 100 characters)"))]
    pub name: String,

    #[serde(default)]
    #[validate(custom(function = validate_email))]
    pub email: String,

    #[serde(default)]
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: String,

    #[serde(default)]
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be between 6 and 128 characters"
    ))]
    pub password: String,
}

impl SignupRequest {
    /// Trims the identity fields and lowercases the email. The password is kept as typed.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            username: self.username.trim().to_string(),
            password: self.password,
        }
    }
}

/// Email must contain "@" followed by a domain with a dot.
fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 255 || !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new("invalid_email")
            .with_message(Cow::Borrowed("Invalid email format")));
    }
    Ok(())
}

/// DTO for user login. `username` may also hold the account email.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub password: String,
}

/// DTO for a partial profile update.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,

    /// `null` clears the picture, absence keeps it.
    #[serde(default, deserialize_with = "super::double_option")]
    pub profile_picture: Option<Option<String>>,
}

impl UpdateProfileRequest {
    /// Blank names are ignored; bio is trimmed.
    pub fn normalized(self) -> Self {
        Self {
            name: self
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            bio: self.bio.map(|b| b.trim().to_string()),
            profile_picture: self.profile_picture,
        }
    }
}

/// DTO for the admin role change endpoint.
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    #[serde(default)]
    pub role: String,
}

/// Public fields returned after signup.
#[derive(Debug, Serialize)]
pub struct SignupUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for SignupUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Public profile returned alongside a login token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub bio: String,
    pub profile_picture: Option<String>,
}

impl From<&User> for LoginUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            bio: user.bio.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}
