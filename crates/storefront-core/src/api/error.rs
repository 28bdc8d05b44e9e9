use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session may have expired")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("Could not load the user profile")]
    ProfileUnavailable,

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// User-facing message with a short title and a longer description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn malformed(endpoint: &str, reason: impl ToString) -> Self {
        ApiError::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Map the error to what a user should see
    pub fn notification(&self) -> Notification {
        match self {
            ApiError::InvalidCredentials => {
                Notification::new("Login failed", "Invalid email or password.")
            }
            ApiError::Validation(message) => Notification::new("Request rejected", message.clone()),
            ApiError::ProfileUnavailable => Notification::new(
                "Login failed",
                "Could not load your profile. Please try again.",
            ),
            ApiError::Unauthorized => {
                Notification::new("Session expired", "Please log in again.")
            }
            ApiError::NetworkError(_) => Notification::new(
                "Connection problem",
                "Could not reach the server. Check your connection and try again.",
            ),
            ApiError::RateLimited => Notification::new(
                "Too many requests",
                "Please wait a moment before trying again.",
            ),
            ApiError::MalformedResponse { .. }
            | ApiError::AccessDenied(_)
            | ApiError::NotFound(_)
            | ApiError::ServerError(_)
            | ApiError::InvalidResponse(_)
            | ApiError::InvalidRequest(_) => {
                Notification::new("Something went wrong", self.to_string())
            }
        }
    }
}
