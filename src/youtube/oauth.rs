//! OAuth 2.0 for installed applications: cached token, refresh, then the
//! loopback consent flow as a last resort.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const SCOPE: &str = "https://www.googleapis.com/auth/youtube";
const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
// Tokens this close to expiry are refreshed up front
const EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Deserialize, Debug)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

/// Client credentials as downloaded from the Google Cloud Console
#[derive(Deserialize, Debug, Clone)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OAuthToken {
    pub token: String,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Unix timestamp in seconds, unknown expiry is treated as expired
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl OAuthToken {
    pub fn is_valid(&self, now: u64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at > now + EXPIRY_MARGIN_SECS)
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_token(
        self,
        client_id: &str,
        client_secret: &str,
        token_uri: &str,
        previous_refresh_token: Option<String>,
        now: u64,
    ) -> OAuthToken {
        OAuthToken {
            token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            token_uri: token_uri.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scopes: self
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_else(|| vec![SCOPE.to_string()]),
            expires_at: self.expires_in.map(|secs| now + secs),
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Returns a usable access token and stores it at `token_path`.
///
/// Fails only when no token can be obtained at all, which should abort the run.
pub async fn load_credentials(
    client_secret_path: &Path,
    token_path: &Path,
    clear_cache: bool,
) -> Result<OAuthToken> {
    let cached = if !clear_cache && token_path.exists() {
        match read_token(token_path) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("ignoring cached token: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let token = match cached {
        Some(token) if token.is_valid(unix_now()) => {
            info!("using cached token");
            return Ok(token);
        }
        Some(token) if token.refresh_token.is_some() => {
            info!("refreshing token");
            match refresh_token(&token).await {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!("error refreshing token: {:#}", e);
                    None
                }
            }
        }
        _ => None,
    };

    let token = match token {
        Some(token) => token,
        None => {
            if !client_secret_path.exists() {
                return Err(eyre!(
                    "{:?} not found, download it from the Google Cloud Console",
                    client_secret_path
                ));
            }
            info!("requesting new token");
            let secret = read_client_secret(client_secret_path)?;
            request_token(&secret).await?
        }
    };

    save_token(token_path, &token)?;
    Ok(token)
}

pub fn save_token(token_path: &Path, token: &OAuthToken) -> Result<()> {
    let file = std::fs::File::create(token_path)
        .wrap_err_with(|| format!("writing token to {:?}", token_path))?;
    serde_json::to_writer_pretty(file, token)?;
    Ok(())
}

fn read_token(token_path: &Path) -> Result<OAuthToken> {
    let reader = std::fs::File::open(token_path)?;
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_client_secret(path: &Path) -> Result<ClientSecret> {
    let reader = std::fs::File::open(path).wrap_err_with(|| format!("opening {:?}", path))?;
    let file: ClientSecretFile =
        serde_json::from_reader(reader).wrap_err_with(|| format!("parsing {:?}", path))?;
    file.installed
        .or(file.web)
        .ok_or_else(|| eyre!("{:?} holds no \"installed\" or \"web\" client", path))
}

pub async fn refresh_token(token: &OAuthToken) -> Result<OAuthToken> {
    let refresh_token = token
        .refresh_token
        .as_deref()
        .ok_or_else(|| eyre!("no refresh token"))?;
    let params = [
        ("client_id", token.client_id.as_str()),
        ("client_secret", token.client_secret.as_str()),
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];
    let client = reqwest::Client::new();
    let res = client.post(&token.token_uri).form(&params).send().await?;
    let res = res.error_for_status()?;
    let res: TokenResponse = res.json().await?;

    Ok(res.into_token(
        &token.client_id,
        &token.client_secret,
        &token.token_uri,
        token.refresh_token.clone(),
        unix_now(),
    ))
}

async fn request_token(secret: &ClientSecret) -> Result<OAuthToken> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());
    let auth_url = build_authorization_url(secret, &redirect_uri)?;

    info!("please authorize the app in your browser: {}", auth_url);
    if let Err(e) = webbrowser::open(&auth_url) {
        warn!("could not open the browser: {}", e);
    }
    let code = listen_for_code(&listener).await?;

    let params = [
        ("client_id", secret.client_id.as_str()),
        ("client_secret", secret.client_secret.as_str()),
        ("code", code.as_str()),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri.as_str()),
    ];
    let client = reqwest::Client::new();
    let res = client.post(&secret.token_uri).form(&params).send().await?;
    let res = res.error_for_status()?;
    let res: TokenResponse = res.json().await?;

    Ok(res.into_token(
        &secret.client_id,
        &secret.client_secret,
        &secret.token_uri,
        None,
        unix_now(),
    ))
}

pub fn build_authorization_url(secret: &ClientSecret, redirect_uri: &str) -> Result<String> {
    let params = [
        ("response_type", "code"),
        ("client_id", secret.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", SCOPE),
        ("access_type", "offline"),
        ("prompt", "consent"),
    ];
    Ok(reqwest::Url::parse_with_params(&secret.auth_uri, params)?.to_string())
}

async fn listen_for_code(listener: &TcpListener) -> Result<String> {
    loop {
        let (mut socket, _) = listener.accept().await?;
        let mut buffer = [0; 4096];
        let n = socket.read(&mut buffer).await?;
        let request = String::from_utf8_lossy(&buffer[..n]);

        let (status, message, result) = match parse_callback(&request) {
            Some(Ok(code)) => (
                "200 OK",
                "Authentication complete, you can close this window.",
                Some(Ok(code)),
            ),
            Some(Err(error)) => ("200 OK", "Authentication failed.", Some(Err(error))),
            // e.g. the browser asking for a favicon
            None => ("404 Not Found", "", None),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            message.len(),
            message
        );
        socket.write_all(response.as_bytes()).await?;

        match result {
            Some(Ok(code)) => return Ok(code),
            Some(Err(error)) => return Err(eyre!("authorization refused: {}", error)),
            None => continue,
        }
    }
}

/// Extracts the authorization code, or the error, from the redirect request
fn parse_callback(request: &str) -> Option<std::result::Result<String, String>> {
    let target = request.split_whitespace().nth(1)?;
    let url = reqwest::Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;

    let mut code = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    match (code, error) {
        (Some(code), _) => Some(Ok(code)),
        (None, Some(error)) => Some(Err(error)),
        (None, None) => None,
    }
}
