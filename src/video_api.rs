use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub type DynVideoApi = Box<dyn VideoApi>;

/// Remote operations needed to converge playlists. Each call maps to exactly
/// one request, retries and error policy are left to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// First page (at most 50) of the playlists owned by the account
    async fn get_playlists_info(&self) -> Result<Vec<Playlist>, ApiError>;
    /// Creates a private playlist
    async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist, ApiError>;
    async fn get_playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> Result<PlaylistItemsPage, ApiError>;
    async fn add_video_to_playlist(&self, playlist_id: &str, video_id: &str)
    -> Result<(), ApiError>;
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistItemsPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API returned {status}{}: {message}", fmt_reason(.reason))]
    Status {
        status: u16,
        reason: Option<String>,
        message: String,
    },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn fmt_reason(reason: &Option<String>) -> String {
    reason.as_ref().map(|r| format!(" ({r})")).unwrap_or_default()
}

impl ApiError {
    const TRANSIENT_REASONS: [&'static str; 4] = [
        "rateLimitExceeded",
        "userRateLimitExceeded",
        "backendError",
        "internalError",
    ];

    /// Whether the same request may succeed if sent again later. Daily quota
    /// exhaustion is not transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { .. } => self.is_transient_status(),
            Self::Decode(_) => false,
        }
    }

    /// Like `is_transient`, for requests that must not be applied twice. A
    /// timeout or a dropped connection may hide a request the server already
    /// executed, only a failed connection guarantees nothing was sent.
    pub fn is_transient_insert(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect(),
            Self::Status { .. } => self.is_transient_status(),
            Self::Decode(_) => false,
        }
    }

    fn is_transient_status(&self) -> bool {
        match self {
            Self::Status { status, reason, .. } => {
                *status == 429
                    || *status >= 500
                    || reason
                        .as_deref()
                        .is_some_and(|r| Self::TRANSIENT_REASONS.contains(&r))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, reason: Option<&str>) -> ApiError {
        ApiError::Status {
            status,
            reason: reason.map(str::to_string),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(status(429, None).is_transient());
        assert!(status(503, None).is_transient());
        assert!(status(403, Some("rateLimitExceeded")).is_transient());
        assert!(!status(403, Some("quotaExceeded")).is_transient());
        assert!(!status(404, Some("playlistNotFound")).is_transient());
        assert!(!status(409, None).is_transient());
    }

    #[test]
    fn test_insert_retries_on_transient_statuses() {
        assert!(status(429, None).is_transient_insert());
        assert!(status(503, Some("backendError")).is_transient_insert());
        assert!(!status(403, Some("quotaExceeded")).is_transient_insert());
        assert!(!status(404, Some("videoNotFound")).is_transient_insert());
    }

    #[tokio::test]
    async fn test_insert_retries_only_unsent_requests() {
        // Nothing listens on the discard port
        let err: ApiError = reqwest::get("http://127.0.0.1:9").await.unwrap_err().into();
        assert!(err.is_transient());
        assert!(err.is_transient_insert());

        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(50))
            .build()
            .unwrap();
        let err: ApiError = client.post(server.uri()).send().await.unwrap_err().into();
        assert!(err.is_transient());
        assert!(!err.is_transient_insert());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            status(403, Some("quotaExceeded")).to_string(),
            "API returned 403 (quotaExceeded): boom"
        );
        assert_eq!(status(500, None).to_string(), "API returned 500: boom");
    }
}
