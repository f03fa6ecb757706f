//! User domain model (collection `users`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lenient;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Citizen,
    Admin,
    Responder,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Citizen, UserRole::Admin, UserRole::Responder];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Citizen => "citizen",
            UserRole::Admin => "admin",
            UserRole::Responder => "responder",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            UserRole::Citizen => "Citizen",
            UserRole::Admin => "Admin",
            UserRole::Responder => "Responder",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "citizen" => Ok(UserRole::Citizen),
            "admin" => Ok(UserRole::Admin),
            "responder" => Ok(UserRole::Responder),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(UserStatus::Active),
            "INACTIVE" => Ok(UserStatus::Inactive),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user record. The id equals the identity-provider subject id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub email: String,
    #[serde(rename = "fullName", default, deserialize_with = "lenient::or_default")]
    pub full_name: String,
    #[serde(default, with = "lenient::token")]
    pub role: Option<UserRole>,
    #[serde(default, with = "lenient::token")]
    pub status: Option<UserStatus>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub municipality: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub barangay: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub phone: Option<String>,
    #[serde(
        rename = "emergencyPhone",
        default,
        deserialize_with = "lenient::optional_string"
    )]
    pub emergency_phone: Option<String>,
    #[serde(
        rename = "emergencyName",
        default,
        deserialize_with = "lenient::optional_string"
    )]
    pub emergency_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub profile_image: Option<String>,
    #[serde(
        default,
        skip_serializing,
        deserialize_with = "lenient::optional_string"
    )]
    pub two_factor_secret: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub two_factor_enabled: bool,
    #[serde(rename = "lastLogin", default, with = "lenient::timestamp")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt", default, with = "lenient::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Some(UserRole::Admin)
    }

    /// The provisioned TOTP secret, ignoring blank values.
    pub fn totp_secret(&self) -> Option<&str> {
        self.two_factor_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Case-insensitive, trimmed barangay comparison.
    pub fn in_barangay(&self, barangay: &str) -> bool {
        match self.barangay.as_deref() {
            Some(own) => own.trim().eq_ignore_ascii_case(barangay.trim()),
            None => false,
        }
    }

    /// Full name, falling back to the username.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

/// Request payload for creating a user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,

    #[serde(rename = "fullName", alias = "full_name", default)]
    pub full_name: String,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub role: Option<UserRole>,

    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub status: Option<UserStatus>,

    #[serde(default)]
    pub municipality: Option<String>,

    #[serde(default)]
    pub barangay: Option<String>,
}

/// Partial update of a user. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub username: Option<String>,

    #[validate(email(message = "Please enter a valid email address"))]
    pub email: Option<String>,

    pub address: Option<String>,

    #[serde(rename = "fullName", alias = "full_name")]
    pub full_name: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: Option<String>,

    pub profile_image: Option<String>,
    pub role: Option<UserRole>,
    pub department: Option<String>,
    pub status: Option<UserStatus>,
    pub barangay: Option<String>,
    pub municipality: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.address.is_none()
            && self.full_name.is_none()
            && self.password.is_none()
            && self.profile_image.is_none()
            && self.role.is_none()
            && self.department.is_none()
            && self.status.is_none()
            && self.barangay.is_none()
            && self.municipality.is_none()
    }
}
