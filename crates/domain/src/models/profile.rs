//! Admin profile view and update requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::user::User;

const DEFAULT_DEPARTMENT: &str = "Emergency Management";

/// Profile data shown to the signed-in admin.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub emergency_phone: String,
    pub emergency_name: String,
    pub role: String,
    pub department: String,
    pub address: String,
    pub joined_date: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(rename = "two_factor_enabled")]
    pub two_factor_enabled: bool,
    #[serde(rename = "profile_picture")]
    pub profile_picture: Option<String>,
}

impl ProfileView {
    /// `last_login` comes from the session when present.
    pub fn new(user: &User, last_login: Option<DateTime<Utc>>) -> Self {
        Self {
            id: user.id.clone(),
            full_name: if user.full_name.is_empty() {
                "Admin User".to_string()
            } else {
                user.full_name.clone()
            },
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            emergency_phone: user.emergency_phone.clone().unwrap_or_default(),
            emergency_name: user.emergency_name.clone().unwrap_or_default(),
            role: user
                .role
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
            department: user
                .department
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
            address: user.address.clone().unwrap_or_default(),
            joined_date: user.created_at,
            last_login: last_login.or(user.last_login),
            two_factor_enabled: user.two_factor_enabled,
            profile_picture: user.profile_image.clone(),
        }
    }
}

/// Raw profile update body; `type` selects which fields apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    #[serde(rename = "type", default)]
    pub profile_type: String,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "emergencyPhone")]
    pub emergency_phone: Option<String>,
    #[serde(rename = "emergencyName")]
    pub emergency_name: Option<String>,
    #[serde(rename = "currentPassword")]
    pub current_password: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
}

/// A validated profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUpdate {
    Personal {
        full_name: String,
        department: String,
        address: String,
    },
    Contact {
        email: String,
        phone: String,
        emergency_phone: String,
        emergency_name: String,
    },
    Account {
        current_password: String,
        new_password: String,
    },
}

impl ProfileUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            ProfileUpdate::Personal { .. } => "personal",
            ProfileUpdate::Contact { .. } => "contact",
            ProfileUpdate::Account { .. } => "account",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            ProfileUpdate::Personal { .. } => "Personal information updated successfully",
            ProfileUpdate::Contact { .. } => "Contact information updated successfully",
            ProfileUpdate::Account { .. } => "Password updated successfully",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Full name is required")]
    FullNameRequired,

    #[error("Email is required")]
    EmailRequired,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Both current and new passwords are required")]
    PasswordsRequired,

    #[error("New password must be at least {0} characters long")]
    PasswordTooShort(usize),

    #[error("Invalid profile type")]
    InvalidProfileType,
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

impl TryFrom<ProfileUpdateRequest> for ProfileUpdate {
    type Error = ProfileError;

    fn try_from(request: ProfileUpdateRequest) -> Result<Self, Self::Error> {
        match request.profile_type.as_str() {
            "personal" => {
                let full_name = trimmed(request.full_name);
                if full_name.is_empty() {
                    return Err(ProfileError::FullNameRequired);
                }
                Ok(ProfileUpdate::Personal {
                    full_name,
                    department: trimmed(request.department),
                    address: trimmed(request.address),
                })
            }
            "contact" => {
                let email = trimmed(request.email);
                if email.is_empty() {
                    return Err(ProfileError::EmailRequired);
                }
                shared::validation::validate_email_format(&email)
                    .map_err(|_| ProfileError::InvalidEmail)?;
                Ok(ProfileUpdate::Contact {
                    email,
                    phone: trimmed(request.phone),
                    emergency_phone: trimmed(request.emergency_phone),
                    emergency_name: trimmed(request.emergency_name),
                })
            }
            "account" => {
                let current_password = trimmed(request.current_password);
                let new_password = trimmed(request.new_password);
                if current_password.is_empty() || new_password.is_empty() {
                    return Err(ProfileError::PasswordsRequired);
                }
                shared::password::check_new_password(&new_password).map_err(|_| {
                    ProfileError::PasswordTooShort(shared::password::MIN_PASSWORD_LENGTH)
                })?;
                Ok(ProfileUpdate::Account {
                    current_password,
                    new_password,
                })
            }
            _ => Err(ProfileError::InvalidProfileType),
        }
    }
}
