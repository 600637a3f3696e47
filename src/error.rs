use thiserror::Error;

/// Errors raised while talking to the game server or loading local files.
///
/// The `Display` text of each variant is what the player sees in the
/// advisory slot, so keep it short and readable.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Connection error. Please check your internet connection and try again.")]
    Connection(#[from] reqwest::Error),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GameError>;

impl GameError {
    /// Message used when a non-2xx response carries no `error` field.
    pub const UNKNOWN_REMOTE: &'static str = "Unknown error occurred";

    pub fn remote(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| Self::UNKNOWN_REMOTE.to_string());
        Self::Remote { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_displays_server_message() {
        let err = GameError::remote(404, Some("Player not found: Kobe".to_string()));
        assert_eq!(err.to_string(), "Player not found: Kobe");
    }

    #[test]
    fn test_remote_error_without_message_uses_default() {
        assert_eq!(GameError::remote(500, None).to_string(), "Unknown error occurred");
        assert_eq!(
            GameError::remote(500, Some("   ".to_string())).to_string(),
            "Unknown error occurred"
        );
    }

    #[test]
    fn test_invalid_response_display() {
        let err = GameError::InvalidResponse("score 140 out of range".to_string());
        assert!(err.to_string().contains("score 140 out of range"));
    }
}
