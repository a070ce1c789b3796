mod model;
pub mod oauth;
mod response;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use color_eyre::Result;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use self::model::{
    YoutubePageResponse, YoutubePlaylistInsert, YoutubePlaylistItemInsert,
    YoutubePlaylistItemResponse, YoutubePlaylistItemSnippet, YoutubePlaylistResponse,
    YoutubePlaylistSnippet, YoutubePlaylistStatus, YoutubeResourceId,
};
use self::oauth::OAuthToken;
use self::response::status_error;
use crate::video_api::{ApiError, Playlist, PlaylistItemsPage, VideoApi};

pub struct YoutubeApi {
    client: reqwest::Client,
    base_url: String,
    token: Mutex<OAuthToken>,
    // Refreshed tokens are written back here
    token_path: Option<PathBuf>,
}

enum HttpMethod<'a, B: Serialize> {
    Get(&'a [(&'a str, &'a str)]),
    Post(&'a [(&'a str, &'a str)], &'a B),
}

impl YoutubeApi {
    pub const BASE_API: &'static str = "https://www.googleapis.com/youtube/v3";
    const PAGE_SIZE: &'static str = "50";
    const PRIVACY_STATUS: &'static str = "private";

    /// Authenticates through OAuth, reusing the token cached at
    /// `oauth_token_path` when possible
    pub async fn new_oauth(
        client_secret_path: &Path,
        oauth_token_path: &Path,
        clear_cache: bool,
        proxy: Option<&str>,
    ) -> Result<Self> {
        let token = oauth::load_credentials(client_secret_path, oauth_token_path, clear_cache).await?;
        Self::with_token(
            Self::BASE_API,
            token,
            Some(oauth_token_path.to_path_buf()),
            proxy,
        )
    }

    /// Client with a fixed access token that is never refreshed
    pub fn new(base_url: &str, access_token: &str, proxy: Option<&str>) -> Result<Self> {
        let token = OAuthToken {
            token: access_token.to_string(),
            refresh_token: None,
            token_uri: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scopes: vec![oauth::SCOPE.to_string()],
            expires_at: None,
        };
        Self::with_token(base_url, token, None, proxy)
    }

    /// Client that refreshes `token` when it expires or is rejected, saving
    /// the new one to `token_path`
    pub fn with_token(
        base_url: &str,
        token: OAuthToken,
        token_path: Option<PathBuf>,
        proxy: Option<&str>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", "application/json".parse()?);

        let mut client = reqwest::Client::builder().default_headers(headers);
        if let Some(proxy) = proxy {
            info!("using proxy {}", proxy);
            client = client.proxy(reqwest::Proxy::all(proxy)?);
        }
        let client = client.build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(token),
            token_path,
        })
    }

    fn build_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn access_token(&self) -> String {
        let mut token = self.token.lock().await;
        if token.expires_at.is_some() && !token.is_valid(oauth::unix_now()) {
            debug!("access token about to expire");
            self.refresh(&mut token).await;
        }
        token.token.clone()
    }

    /// Replaces the access token, returns false when it could not be refreshed
    async fn refresh(&self, token: &mut OAuthToken) -> bool {
        if token.refresh_token.is_none() {
            return false;
        }
        match oauth::refresh_token(token).await {
            Ok(new_token) => {
                info!("access token refreshed");
                if let Some(token_path) = &self.token_path {
                    if let Err(e) = oauth::save_token(token_path, &new_token) {
                        warn!("could not save refreshed token: {:#}", e);
                    }
                }
                *token = new_token;
                true
            }
            Err(e) => {
                warn!("error refreshing token: {:#}", e);
                false
            }
        }
    }

    /// Refreshes unless another request already replaced `rejected`
    async fn refresh_rejected(&self, rejected: &str) -> bool {
        let mut token = self.token.lock().await;
        if token.token != rejected {
            return true;
        }
        self.refresh(&mut token).await
    }

    async fn send<B: Serialize>(
        &self,
        endpoint: &str,
        method: &HttpMethod<'_, B>,
        access_token: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let request = match method {
            HttpMethod::Get(params) => self.client.get(endpoint).query(params),
            HttpMethod::Post(params, body) => self.client.post(endpoint).query(params).json(body),
        };
        Ok(request.bearer_auth(access_token).send().await?)
    }

    async fn make_request<T, B>(&self, path: &str, method: &HttpMethod<'_, B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let endpoint = self.build_endpoint(path);
        debug!("{} {}", method_name(method), endpoint);
        let access_token = self.access_token().await;
        let mut res = self.send(&endpoint, method, &access_token).await?;
        // A rejected request was not applied, so sending it again is safe
        if res.status() == StatusCode::UNAUTHORIZED && self.refresh_rejected(&access_token).await {
            debug!("retrying {} {} with a new access token", method_name(method), endpoint);
            let access_token = self.access_token().await;
            res = self.send(&endpoint, method, &access_token).await?;
        }
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }
        let obj = serde_json::from_str(&text)?;
        Ok(obj)
    }
}

fn method_name<B: Serialize>(method: &HttpMethod<'_, B>) -> &'static str {
    match method {
        HttpMethod::Get(_) => "GET",
        HttpMethod::Post(..) => "POST",
    }
}

#[async_trait]
impl VideoApi for YoutubeApi {
    async fn get_playlists_info(&self) -> Result<Vec<Playlist>, ApiError> {
        let params = [
            ("part", "snippet"),
            ("mine", "true"),
            ("maxResults", Self::PAGE_SIZE),
        ];
        let res: YoutubePageResponse<YoutubePlaylistResponse> = self
            .make_request("/playlists", &HttpMethod::<()>::Get(&params))
            .await?;
        Ok(res.into())
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist, ApiError> {
        let params = [("part", "snippet,status")];
        let body = YoutubePlaylistInsert {
            snippet: YoutubePlaylistSnippet {
                title: name.to_string(),
                description: description.to_string(),
            },
            status: YoutubePlaylistStatus {
                privacy_status: Self::PRIVACY_STATUS,
            },
        };
        let res: YoutubePlaylistResponse = self
            .make_request("/playlists", &HttpMethod::Post(&params, &body))
            .await?;
        Ok(res.into())
    }

    async fn get_playlist_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
    ) -> Result<PlaylistItemsPage, ApiError> {
        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", Self::PAGE_SIZE),
        ];
        if let Some(token) = page_token.as_deref() {
            params.push(("pageToken", token));
        }
        let res: YoutubePageResponse<YoutubePlaylistItemResponse> = self
            .make_request("/playlistItems", &HttpMethod::<()>::Get(&params))
            .await?;
        Ok(res.into())
    }

    async fn add_video_to_playlist(&self, playlist_id: &str, video_id: &str) -> Result<(), ApiError> {
        let params = [("part", "snippet")];
        let body = YoutubePlaylistItemInsert {
            snippet: YoutubePlaylistItemSnippet {
                playlist_id,
                resource_id: YoutubeResourceId {
                    kind: "youtube#video",
                    video_id,
                },
            },
        };
        let _: serde_json::Value = self
            .make_request("/playlistItems", &HttpMethod::Post(&params, &body))
            .await?;
        Ok(())
    }
}
