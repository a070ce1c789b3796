use crate::video_api::{ApiError, Playlist, PlaylistItemsPage};

use super::model::{
    YoutubeErrorResponse, YoutubePageResponse, YoutubePlaylistItemResponse,
    YoutubePlaylistResponse,
};

impl From<YoutubePlaylistResponse> for Playlist {
    fn from(res: YoutubePlaylistResponse) -> Self {
        Playlist {
            id: res.id,
            name: res.snippet.title,
        }
    }
}

impl From<YoutubePageResponse<YoutubePlaylistResponse>> for Vec<Playlist> {
    fn from(res: YoutubePageResponse<YoutubePlaylistResponse>) -> Self {
        res.items.into_iter().map(Playlist::from).collect()
    }
}

impl From<YoutubePageResponse<YoutubePlaylistItemResponse>> for PlaylistItemsPage {
    fn from(res: YoutubePageResponse<YoutubePlaylistItemResponse>) -> Self {
        let video_ids = res
            .items
            .into_iter()
            // Only videos can be added by this tool, other resources are ignored
            .filter(|item| {
                item.snippet
                    .resource_id
                    .kind
                    .as_deref()
                    .is_none_or(|kind| kind == "youtube#video")
            })
            .filter_map(|item| item.snippet.resource_id.video_id)
            .collect();
        PlaylistItemsPage {
            video_ids,
            next_page_token: res.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Builds the error of a non-2xx response, the body is the API error
/// envelope when it can be decoded.
pub fn status_error(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<YoutubeErrorResponse>(body) {
        Ok(res) => ApiError::Status {
            status: res.error.code,
            reason: res.error.errors.into_iter().find_map(|e| e.reason),
            message: res.error.message,
        },
        Err(_) => ApiError::Status {
            status,
            reason: None,
            message: body.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlists_response() {
        let res: YoutubePageResponse<YoutubePlaylistResponse> = serde_json::from_str(
            r#"{
                "kind": "youtube#playlistListResponse",
                "pageInfo": {"totalResults": 2, "resultsPerPage": 50},
                "items": [
                    {"kind": "youtube#playlist", "id": "PL1", "snippet": {"title": "Music", "description": "d"}},
                    {"kind": "youtube#playlist", "id": "PL2", "snippet": {"title": "Talks"}}
                ]
            }"#,
        )
        .unwrap();
        let playlists: Vec<Playlist> = res.into();
        assert_eq!(
            playlists,
            vec![
                Playlist {
                    id: "PL1".to_string(),
                    name: "Music".to_string()
                },
                Playlist {
                    id: "PL2".to_string(),
                    name: "Talks".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_playlist_items_response() {
        let res: YoutubePageResponse<YoutubePlaylistItemResponse> = serde_json::from_str(
            r#"{
                "nextPageToken": "CDIQAA",
                "items": [
                    {"snippet": {"resourceId": {"kind": "youtube#video", "videoId": "v1"}}},
                    {"snippet": {"resourceId": {"kind": "youtube#channel", "channelId": "c1"}}},
                    {"snippet": {"resourceId": {"videoId": "v2"}}}
                ]
            }"#,
        )
        .unwrap();
        let page: PlaylistItemsPage = res.into();
        assert_eq!(page.video_ids, vec!["v1", "v2"]);
        assert_eq!(page.next_page_token.as_deref(), Some("CDIQAA"));
    }

    #[test]
    fn test_playlist_items_last_page() {
        let res: YoutubePageResponse<YoutubePlaylistItemResponse> =
            serde_json::from_str(r#"{"nextPageToken": ""}"#).unwrap();
        let page: PlaylistItemsPage = res.into();
        assert!(page.video_ids.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_status_error_envelope() {
        let err = status_error(
            403,
            r#"{"error": {"code": 403, "message": "quota", "errors": [{"domain": "youtube.quota", "reason": "quotaExceeded"}]}}"#,
        );
        match err {
            ApiError::Status {
                status,
                reason,
                message,
            } => {
                assert_eq!(status, 403);
                assert_eq!(reason.as_deref(), Some("quotaExceeded"));
                assert_eq!(message, "quota");
            }
            _ => panic!("expected a status error"),
        }
    }

    #[test]
    fn test_status_error_plain_body() {
        let err = status_error(502, "Bad Gateway\n");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "API returned 502: Bad Gateway");
    }
}
