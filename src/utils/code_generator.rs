//! Short code generation and validation.
//!
//! Generated codes are fixed-length base62 (`A-Z`, `a-z`, `0-9`) drawn from the
//! thread-local CSPRNG. Custom codes supplied by callers are validated against a
//! slightly wider policy and returned unchanged.
//!
//! Nothing here checks uniqueness: that is decided by the storage layer's
//! conditional insert (see [`crate::application::services::LinkService`]).

use std::fmt;

use crate::error::AppError;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::json;

/// Length of generated codes. 62^7 ≈ 3.5 * 10^12 candidates.
pub const CODE_LENGTH: usize = 7;

pub const MIN_CODE_LENGTH: usize = 3;
pub const MAX_CODE_LENGTH: usize = 20;

/// Route words a short code may never shadow (compared case-insensitively).
const RESERVED_CODES: &[&str] = &[
    "shorten", "stats", "health", "healthz", "readyz", "api", "admin",
];

/// A syntactically valid short code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortCode(String);

impl ShortCode {
    /// Parses any code that could have been issued by this service.
    ///
    /// Only the length and charset are checked, so reserved words parse too.
    /// Used on the redirect path to reject junk before touching cache or storage.
    pub fn parse(code: &str) -> Result<Self, AppError> {
        if code.len() < MIN_CODE_LENGTH || code.len() > MAX_CODE_LENGTH {
            return Err(AppError::bad_request(
                format!("Short code must be {MIN_CODE_LENGTH}-{MAX_CODE_LENGTH} characters"),
                json!({ "provided_length": code.len() }),
            ));
        }

        if !code.chars().all(is_code_char) {
            return Err(AppError::bad_request(
                "Short code can only contain letters, digits, hyphens and underscores",
                json!({ "code": code }),
            ));
        }

        Ok(Self(code.to_string()))
    }

    /// Validates a caller-supplied custom code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the code is too short/long, contains
    /// characters outside `[A-Za-z0-9_-]`, or is a reserved route word.
    pub fn parse_custom(code: &str) -> Result<Self, AppError> {
        let parsed = Self::parse(code)?;

        if is_reserved(code) {
            return Err(AppError::bad_request(
                "This code is reserved",
                json!({ "code": code }),
            ));
        }

        Ok(parsed)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_code_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn is_reserved(code: &str) -> bool {
    RESERVED_CODES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(code))
}

/// Source of candidate short codes.
///
/// Implementations must return a fresh candidate on every call so that the
/// allocation retry loop makes progress after a collision.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> ShortCode;
}

/// Random base62 generator backed by the thread-local RNG.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    /// # Panics
    ///
    /// Panics if `length` is outside `MIN_CODE_LENGTH..=MAX_CODE_LENGTH`.
    pub fn new(length: usize) -> Self {
        assert!(
            (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length),
            "code length out of range"
        );
        Self { length }
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(CODE_LENGTH)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> ShortCode {
        let mut rng = rand::rng();
        loop {
            let code: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(self.length)
                .map(char::from)
                .collect();

            if !is_reserved(&code) {
                return ShortCode(code);
            }
        }
    }
}

/// Generates a single random code of the default length.
pub fn generate_code() -> ShortCode {
    RandomCodeGenerator::default().generate()
}
