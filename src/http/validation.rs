//! Request body validation.
//!
//! Bodies arrive as a raw JSON object so that "absent", "null" and
//! "wrong type" stay distinguishable. Each check returns the first
//! problem found as an [`ApiError::Validation`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::http::error::ApiError;
use crate::store::{CategoryPatch, NewCategory};

pub type JsonObject = Map<String, Value>;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 255;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 100;
const FULL_NAME_MIN: usize = 2;
const FULL_NAME_MAX: usize = 100;

/// Validated registration input. Email is trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Validated login input.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    if email.chars().count() > EMAIL_MAX {
        return Err(ApiError::validation("Email must not exceed 255 characters"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if len == 0 {
        return Err(ApiError::validation("Password is required"));
    }
    if len < PASSWORD_MIN {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    if len > PASSWORD_MAX {
        return Err(ApiError::validation(
            "Password must not exceed 100 characters",
        ));
    }
    Ok(())
}

/// A register field must be a non-empty string.
fn required_str<'a>(body: &'a JsonObject, field: &str) -> Result<&'a str, ApiError> {
    match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(ApiError::validation(format!("Field \"{field}\" is required"))),
    }
}

pub fn registration(body: &JsonObject) -> Result<Registration, ApiError> {
    let email = required_str(body, "email")?;
    let password = required_str(body, "password")?;
    let full_name = required_str(body, "full_name")?;

    let email = email.trim().to_lowercase();
    validate_email(&email)?;
    validate_password(password)?;

    let full_name = full_name.trim();
    let len = full_name.chars().count();
    if len < FULL_NAME_MIN {
        return Err(ApiError::validation(
            "Full name must be at least 2 characters long",
        ));
    }
    if len > FULL_NAME_MAX {
        return Err(ApiError::validation(
            "Full name must not exceed 100 characters",
        ));
    }

    Ok(Registration {
        email,
        password: password.to_string(),
        full_name: full_name.to_string(),
    })
}

pub fn login(body: &JsonObject) -> Result<LoginRequest, ApiError> {
    let (Some(email), Some(password)) = (body.get("email"), body.get("password")) else {
        return Err(ApiError::validation("Email and password are required"));
    };

    let email = email.as_str().unwrap_or_default().trim().to_lowercase();
    let password = password.as_str().unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Email and password cannot be empty"));
    }

    Ok(LoginRequest {
        email,
        password: password.to_string(),
    })
}

fn category_name(value: &Value) -> Result<String, ApiError> {
    match value {
        Value::String(s) if !s.is_empty() => {
            if s.chars().count() > NAME_MAX {
                Err(ApiError::validation(
                    "Field 'name' must not exceed 100 characters",
                ))
            } else {
                Ok(s.clone())
            }
        }
        _ => Err(ApiError::validation(
            "Field 'name' must be a non-empty string",
        )),
    }
}

/// `None` for absent or null; error for any other non-string.
fn category_description(body: &JsonObject) -> Result<Option<Option<String>>, ApiError> {
    match body.get("description") {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(s)) => Ok(Some(Some(s.clone()))),
        Some(_) => Err(ApiError::validation(
            "Field 'description' must be a string",
        )),
    }
}

/// Absent and null both read as "not given".
fn category_is_active(body: &JsonObject) -> Result<Option<bool>, ApiError> {
    match body.get("is_active") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ApiError::validation("Field 'is_active' must be a boolean")),
    }
}

pub fn new_category(body: &JsonObject) -> Result<NewCategory, ApiError> {
    let name = body
        .get("name")
        .ok_or_else(|| ApiError::validation("Field 'name' is required"))?;
    let name = category_name(name)?;
    let description = category_description(body)?.flatten();
    let is_active = category_is_active(body)?.unwrap_or(true);

    Ok(NewCategory {
        name,
        description,
        is_active,
    })
}

/// Build a patch from whichever recognised fields are present.
pub fn category_patch(body: &JsonObject) -> Result<CategoryPatch, ApiError> {
    let name = body.get("name").map(category_name).transpose()?;
    let description = category_description(body)?;
    let is_active = category_is_active(body)?;

    let patch = CategoryPatch {
        name,
        description,
        is_active,
    };
    if patch.is_empty() {
        return Err(ApiError::validation("No valid fields to update"));
    }
    Ok(patch)
}
