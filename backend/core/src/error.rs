use thiserror::Error;

/// Failure while reading the source file through the relay.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Relay answered 404, or the URL could not be used at all.
    #[error("source not found: {url}")]
    NotFound { url: String },

    /// Relay answered 403.
    #[error("rate limited while fetching {url}")]
    RateLimited { url: String },

    /// Any other status, or a transport failure (`status` is `None`).
    #[error("source fetch failed ({}): {message}", status.map(|s| s.to_string()).unwrap_or_else(|| "no status".into()))]
    Unknown { status: Option<u16>, message: String },
}

impl FetchError {
    /// Classify a non-success relay status.
    pub fn from_status(url: &str, status: u16, body: &str) -> Self {
        match status {
            404 => FetchError::NotFound { url: url.to_string() },
            403 => FetchError::RateLimited { url: url.to_string() },
            other => FetchError::Unknown {
                status: Some(other),
                message: body.trim().to_string(),
            },
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            FetchError::NotFound { .. } => "not_found",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Unknown { .. } => "unknown",
        }
    }

    /// The single notification shown to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::NotFound { .. } => "The provided GitHub URL is not valid.",
            FetchError::RateLimited { .. } => {
                "You have hit the GitHub API rate limit. Please wait a while before trying again."
            }
            FetchError::Unknown { .. } => {
                "An unknown error occurred. Please check the logs for more details."
            }
        }
    }
}

/// Failure while asking the hosted model for a reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("API key rejected: {message}")]
    InvalidCredential { message: String },

    #[error("network failure during generation: {message}")]
    NetworkFailure { message: String },

    /// API errors, unparsable responses, and declined prompts.
    #[error("generation failed: {message}")]
    Unknown { message: String },
}

impl GenerationError {
    pub fn category(&self) -> &'static str {
        match self {
            GenerationError::InvalidCredential { .. } => "invalid_credential",
            GenerationError::NetworkFailure { .. } => "network_failure",
            GenerationError::Unknown { .. } => "unknown",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::InvalidCredential { .. } => {
                "The API key was rejected. Check the key and try again."
            }
            GenerationError::NetworkFailure { .. } => {
                "Could not reach the generation service. Check your connection and try again."
            }
            GenerationError::Unknown { .. } => {
                "An unknown error occurred. Please check the logs for more details."
            }
        }
    }
}

/// Why a generate action ended without a reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl TurnError {
    pub fn category(&self) -> &'static str {
        match self {
            TurnError::Fetch(e) => e.category(),
            TurnError::Generation(e) => e.category(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            TurnError::Fetch(e) => e.user_message(),
            TurnError::Generation(e) => e.user_message(),
        }
    }
}
