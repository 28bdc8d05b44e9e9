use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::normalize_birth_date;

/// Profile returned by `GET /users/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl UserProfile {
    /// Reject profiles that deserialized but carry no usable identity.
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("profile has an empty username".to_string());
        }
        if self.email.trim().is_empty() {
            return Err("profile has an empty email".to_string());
        }
        Ok(())
    }

    /// "First Last", falling back to the username when no name is on file
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }
}

/// Access/refresh token pair returned by login and refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl TokenPair {
    pub fn validate(self) -> Result<Self, String> {
        if self.access_token.is_empty() {
            return Err("accessToken is empty".to_string());
        }
        if self.refresh_token.is_empty() {
            return Err("refreshToken is empty".to_string());
        }
        Ok(self)
    }
}

// Tokens never end up in logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
}

/// Registration payload for `POST /users/register`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RegisterData {
    pub username: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "birthDate")]
    pub birth_date: String,
    pub email: String,
    pub password: String,
    pub address: String,
}

impl RegisterData {
    /// Client-side checks run before anything is sent.
    ///
    /// On success the birth date is rewritten to `YYYY-MM-DD`, the only
    /// format the backend accepts.
    pub fn validate(&mut self) -> Result<(), String> {
        let required = [
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("birth date", &self.birth_date),
            ("address", &self.address),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(format!("Please fill in: {}", missing.join(", ")));
        }

        if !self.email.contains('@') {
            return Err("Please enter a valid email address".to_string());
        }

        self.birth_date = normalize_birth_date(&self.birth_date)
            .ok_or_else(|| "Please enter a valid date in YYYY-MM-DD format".to_string())?;

        Ok(())
    }
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("birth_date", &self.birth_date)
            .finish_non_exhaustive()
    }
}
