//! Two-factor admin login state machine.
//!
//! Identity resolution and the password check happen before
//! [`submit_credentials`]; everything here works on an already loaded
//! [`User`] and the caller's [`AdminSession`]. Time is passed in so code
//! verification is deterministic.

use chrono::{DateTime, Utc};
use shared::totp::{self, TotpError};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::session::{AdminSession, AuthState, SessionPrincipal};
use crate::models::user::User;

/// Issuer shown in authenticator apps.
pub const DEFAULT_ISSUER: &str = "RizAlert";

/// Account label used when an admin has no email on file.
const FALLBACK_ACCOUNT_NAME: &str = "admin@rizalert.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TwoFactorError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access denied. Admin role required.")]
    AccessDenied,

    #[error("Invalid 2FA code. Please try again.")]
    InvalidOtp,

    #[error("No login is waiting for a verification code")]
    NoPendingLogin,

    #[error("2FA setup has not been started")]
    EnrollmentNotStarted,

    #[error("2FA is not enabled")]
    NotEnabled,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Stored 2FA secret is unusable: {0}")]
    CorruptSecret(TotpError),
}

/// Where a credential submission left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Provisional session; only profile and 2FA enrollment are allowed.
    SetupRequired,
    /// A one-time code must be submitted next.
    OtpRequired,
    Authenticated,
}

/// Candidate secret handed to the admin during enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentTicket {
    pub secret: String,
    /// `otpauth://` URI; also the QR code payload.
    pub provisioning_uri: String,
}

fn principal_for(user: &User, now: DateTime<Utc>) -> SessionPrincipal {
    SessionPrincipal {
        user_id: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        last_login: now,
    }
}

fn verify(secret: &str, code: &str, now: DateTime<Utc>) -> Result<bool, TwoFactorError> {
    let seconds = u64::try_from(now.timestamp()).unwrap_or(0);
    totp::verify_code(secret, code, seconds).map_err(TwoFactorError::CorruptSecret)
}

/// Advances the login after the password has been verified.
///
/// `code` is an optional one-time code supplied together with the password.
/// A wrong code leaves the session waiting for another attempt.
pub fn submit_credentials(
    session: &mut AdminSession,
    user: &User,
    code: Option<&str>,
    now: DateTime<Utc>,
) -> Result<LoginOutcome, TwoFactorError> {
    if !user.is_admin() {
        warn!(user_id = %user.id, "Login rejected: account is not an admin");
        return Err(TwoFactorError::AccessDenied);
    }

    session.pending_2fa_secret = None;

    let Some(secret) = user.totp_secret() else {
        info!(user_id = %user.id, "Admin without 2FA signed in; setup required");
        session.auth = AuthState::PendingSetup(principal_for(user, now));
        return Ok(LoginOutcome::SetupRequired);
    };

    session.auth = AuthState::AwaitingOtp {
        user_id: user.id.clone(),
        email: user.email.clone(),
    };

    match code.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(LoginOutcome::OtpRequired),
        Some(code) => {
            if verify(secret, code, now)? {
                session.auth = AuthState::Authenticated(principal_for(user, now));
                info!(user_id = %user.id, "Admin signed in with 2FA");
                Ok(LoginOutcome::Authenticated)
            } else {
                warn!(user_id = %user.id, "Invalid 2FA code at login");
                Err(TwoFactorError::InvalidOtp)
            }
        }
    }
}

/// User id of the login waiting for a one-time code, if any.
pub fn pending_login(session: &AdminSession) -> Option<&str> {
    match &session.auth {
        AuthState::AwaitingOtp { user_id, .. } => Some(user_id),
        _ => None,
    }
}

/// Completes an `AwaitingOtp` login. On failure the pending state is kept.
pub fn submit_otp(
    session: &mut AdminSession,
    user: &User,
    code: &str,
    now: DateTime<Utc>,
) -> Result<LoginOutcome, TwoFactorError> {
    if pending_login(session) != Some(user.id.as_str()) {
        return Err(TwoFactorError::NoPendingLogin);
    }
    if !user.is_admin() {
        session.auth = AuthState::AwaitingCredentials;
        return Err(TwoFactorError::AccessDenied);
    }
    let Some(secret) = user.totp_secret() else {
        // Secret was removed after the password step; start over.
        session.auth = AuthState::AwaitingCredentials;
        return Err(TwoFactorError::NoPendingLogin);
    };

    if verify(secret, code, now)? {
        session.auth = AuthState::Authenticated(principal_for(user, now));
        info!(user_id = %user.id, "Admin completed 2FA login");
        Ok(LoginOutcome::Authenticated)
    } else {
        warn!(user_id = %user.id, "Invalid 2FA code");
        Err(TwoFactorError::InvalidOtp)
    }
}

/// Generates a candidate secret and keeps it in the session.
///
/// Calling this again replaces the previous candidate.
pub fn begin_enrollment(
    session: &mut AdminSession,
    user: &User,
    issuer: &str,
) -> Result<EnrollmentTicket, TwoFactorError> {
    match session.auth.principal() {
        Some(principal) if principal.user_id == user.id => {}
        _ => return Err(TwoFactorError::NotAuthenticated),
    }

    let secret = totp::generate_secret();
    let account = if user.email.trim().is_empty() {
        FALLBACK_ACCOUNT_NAME
    } else {
        user.email.trim()
    };
    let provisioning_uri = totp::provisioning_uri(issuer, account, &secret);

    session.pending_2fa_secret = Some(secret.clone());
    Ok(EnrollmentTicket {
        secret,
        provisioning_uri,
    })
}

/// Checks `code` against the candidate secret.
///
/// On success the secret is returned for the caller to persist and a
/// provisional session becomes fully authenticated. On failure the
/// candidate is discarded.
pub fn confirm_enrollment(
    session: &mut AdminSession,
    code: &str,
    now: DateTime<Utc>,
) -> Result<String, TwoFactorError> {
    if session.auth.principal().is_none() {
        return Err(TwoFactorError::NotAuthenticated);
    }
    let secret = session
        .pending_2fa_secret
        .take()
        .ok_or(TwoFactorError::EnrollmentNotStarted)?;

    if !verify(&secret, code, now)? {
        return Err(TwoFactorError::InvalidOtp);
    }

    if let AuthState::PendingSetup(principal) = &session.auth {
        session.auth = AuthState::Authenticated(principal.clone());
    }
    Ok(secret)
}

/// Confirms a current code before 2FA is turned off.
pub fn verify_disable(user: &User, code: &str, now: DateTime<Utc>) -> Result<(), TwoFactorError> {
    let secret = user.totp_secret().ok_or(TwoFactorError::NotEnabled)?;
    if verify(secret, code, now)? {
        Ok(())
    } else {
        Err(TwoFactorError::InvalidOtp)
    }
}

/// Ends the session's login and drops all per-session state.
pub fn logout(session: &mut AdminSession) {
    session.reset();
}
