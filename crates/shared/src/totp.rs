//! Time-based one-time passwords (RFC 6238) for admin two-factor login.
//!
//! Secrets are exchanged with authenticator apps as RFC 4648 base32 without
//! padding. Codes use HMAC-SHA1, a 30 second step and 6 digits; verification
//! accepts the previous, current and next step to absorb clock drift.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use thiserror::Error;

use crate::crypto::constant_time_eq;

type HmacSha1 = Hmac<Sha1>;

/// Length of one time step in seconds.
pub const STEP_SECONDS: u64 = 30;
/// Number of digits in a generated code.
pub const DIGITS: u32 = 6;
/// Accepted drift in whole steps on either side of the current one.
pub const SKEW_STEPS: u64 = 1;
/// Random bytes in a freshly generated secret (160 bits, 32 base32 chars).
pub const SECRET_BYTES: usize = 20;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("Secret is not valid base32")]
    InvalidSecret,

    #[error("Secret is empty")]
    EmptySecret,
}

/// Encodes bytes as RFC 4648 base32 without padding.
pub fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            let index = ((buffer >> bits) & 0x1f) as usize;
            out.push(BASE32_ALPHABET[index] as char);
        }
    }

    if bits > 0 {
        let index = ((buffer << (5 - bits)) & 0x1f) as usize;
        out.push(BASE32_ALPHABET[index] as char);
    }

    out
}

/// Decodes RFC 4648 base32. Case, spaces, dashes and trailing `=` are ignored.
pub fn base32_decode(input: &str) -> Result<Vec<u8>, TotpError> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for ch in input.chars() {
        if ch == '=' || ch == ' ' || ch == '-' {
            continue;
        }
        let value = match ch.to_ascii_uppercase() {
            c @ 'A'..='Z' => c as u32 - 'A' as u32,
            c @ '2'..='7' => c as u32 - '2' as u32 + 26,
            _ => return Err(TotpError::InvalidSecret),
        };
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }

    Ok(out)
}

/// Generates a new random secret, base32-encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base32_encode(&bytes)
}

fn hotp(key: &[u8], counter: u64) -> Result<u32, TotpError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|_| TotpError::InvalidSecret)?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation (RFC 4226 section 5.3)
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    Ok(binary % 10u32.pow(DIGITS))
}

fn decode_key(secret: &str) -> Result<Vec<u8>, TotpError> {
    let key = base32_decode(secret)?;
    if key.is_empty() {
        return Err(TotpError::EmptySecret);
    }
    Ok(key)
}

/// Computes the code for the step containing `unix_seconds`.
pub fn generate_code(secret: &str, unix_seconds: u64) -> Result<String, TotpError> {
    let key = decode_key(secret)?;
    let code = hotp(&key, unix_seconds / STEP_SECONDS)?;
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

/// Verifies a user-supplied code against the secret at `unix_seconds`.
///
/// Whitespace inside the code is ignored. Malformed codes never match.
pub fn verify_code(secret: &str, code: &str, unix_seconds: u64) -> Result<bool, TotpError> {
    let key = decode_key(secret)?;
    let candidate: String = code.chars().filter(|c| !c.is_whitespace()).collect();

    if candidate.len() != DIGITS as usize || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }

    let current = unix_seconds / STEP_SECONDS;
    let first = current.saturating_sub(SKEW_STEPS);
    let last = current.saturating_add(SKEW_STEPS);

    let mut matched = false;
    for counter in first..=last {
        let expected = format!("{:0width$}", hotp(&key, counter)?, width = DIGITS as usize);
        matched |= constant_time_eq(expected.as_bytes(), candidate.as_bytes());
    }
    Ok(matched)
}

/// Builds the `otpauth://` URI understood by authenticator apps.
///
/// The same string is what a QR code for enrollment encodes.
pub fn provisioning_uri(issuer: &str, account_name: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        percent_encode(issuer),
        percent_encode(account_name),
        secret,
        percent_encode(issuer),
        DIGITS,
        STEP_SECONDS
    )
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'@' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
