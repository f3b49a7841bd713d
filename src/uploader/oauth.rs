//! OAuth 2.0 installed-app authorization for the YouTube Data API.
//!
//! Token resolution order:
//!
//! 1. A stored token that is still valid (with a 60 second skew).
//! 2. A refresh using the stored refresh token; the new token is persisted.
//! 3. The interactive loopback flow: the consent URL is printed, one redirect
//!    is accepted on `127.0.0.1:<ephemeral port>`, the `state` is verified and
//!    the code is exchanged. Disabled when `interactive` is false, in which
//!    case [`PipelineError::AuthorizationRequired`] is returned.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};
use url::Url;

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube.readonly",
];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

/// The `installed` (or `web`) section of a downloaded client secrets file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecrets {
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(raw)?;
        file.installed.or(file.web).ok_or_else(|| {
            PipelineError::Config("client secrets file has neither an `installed` nor a `web` section".to_string())
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Config(format!(
                "cannot read OAuth client secrets {}: {e}; download them from the Google Cloud Console",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }
}

/// Token persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredToken {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    /// Refresh responses usually omit the refresh token; keep the old one.
    fn into_token(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: now + Duration::seconds(self.expires_in),
            scope: self.scope,
        }
    }
}

/// JSON file holding the [`StoredToken`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the file is missing or unreadable as a token.
    pub async fn load(&self) -> Result<Option<StoredToken>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).await?;
        match serde_json::from_str(&raw) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token file");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(token)?).await?;
        info!(path = %self.path.display(), "Saved OAuth token");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    http: reqwest::Client,
    secrets_path: PathBuf,
    store: TokenStore,
    interactive: bool,
}

impl Authenticator {
    pub fn new(http: reqwest::Client, secrets_path: PathBuf, token_path: PathBuf, interactive: bool) -> Self {
        Self {
            http,
            secrets_path,
            store: TokenStore::new(token_path),
            interactive,
        }
    }

    /// A usable access token, refreshing or authorizing as needed.
    #[instrument(level = "info", skip(self))]
    pub async fn access_token(&self) -> Result<String> {
        let stored = self.store.load().await?;
        if let Some(token) = &stored {
            if token.is_valid(Utc::now()) {
                return Ok(token.access_token.clone());
            }
            if let Some(refresh_token) = &token.refresh_token {
                let secrets = ClientSecrets::load(&self.secrets_path).await?;
                let fresh = self.refresh(&secrets, refresh_token).await?;
                self.store.save(&fresh).await?;
                return Ok(fresh.access_token);
            }
        }

        if !self.interactive {
            return Err(PipelineError::AuthorizationRequired(format!(
                "no usable token in {}; run once with interactive authorization enabled",
                self.store.path().display()
            )));
        }
        let secrets = ClientSecrets::load(&self.secrets_path).await?;
        let token = self.authorize_interactively(&secrets).await?;
        self.store.save(&token).await?;
        Ok(token.access_token)
    }

    async fn refresh(&self, secrets: &ClientSecrets, refresh_token: &str) -> Result<StoredToken> {
        info!("Refreshing OAuth token");
        let response = self
            .http
            .post(&secrets.token_uri)
            .form(&[
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let parsed: TokenResponse = PipelineError::check("Google OAuth", response).await?.json().await?;
        Ok(parsed.into_token(Utc::now(), Some(refresh_token.to_string())))
    }

    async fn authorize_interactively(&self, secrets: &ClientSecrets) -> Result<StoredToken> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());
        let state = random_state();
        let consent = consent_url(secrets, &redirect_uri, &state)?;

        println!("Open this URL in a browser to authorize YouTube uploads:\n\n{consent}\n");
        info!(%redirect_uri, "Waiting for OAuth redirect");

        let (mut stream, _) = listener.accept().await?;
        let (read, mut write) = stream.split();
        let mut request_line = String::new();
        BufReader::new(read).read_line(&mut request_line).await?;

        let outcome = request_target(&request_line).and_then(|target| parse_callback(target, &state));
        let page = match &outcome {
            Ok(_) => "Authorization complete. You can close this window.",
            Err(_) => "Authorization failed. Check the terminal for details.",
        };
        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{page}",
            page.len()
        );
        write.write_all(reply.as_bytes()).await?;
        let code = outcome?;

        let response = self
            .http
            .post(&secrets.token_uri)
            .form(&[
                ("code", code.as_str()),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let parsed: TokenResponse = PipelineError::check("Google OAuth", response).await?.json().await?;
        info!("OAuth authorization complete");
        Ok(parsed.into_token(Utc::now(), None))
    }
}

pub fn random_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub fn consent_url(secrets: &ClientSecrets, redirect_uri: &str, state: &str) -> Result<String> {
    let scope = SCOPES.join(" ");
    let url = Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )?;
    Ok(url.into())
}

/// Path and query of an HTTP request line (`GET /?code=.. HTTP/1.1`).
fn request_target(request_line: &str) -> Result<&str> {
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Ok(target),
        _ => Err(PipelineError::AuthorizationRequired(format!(
            "unexpected OAuth redirect request: {}",
            request_line.trim()
        ))),
    }
}

/// Extract the authorization code from the redirect target, checking `state`.
pub fn parse_callback(target: &str, expected_state: &str) -> Result<String> {
    let url = Url::parse("http://127.0.0.1")?.join(target)?;
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(PipelineError::AuthorizationRequired(format!("consent was denied: {value}")));
            }
            _ => {}
        }
    }
    if state.as_deref() != Some(expected_state) {
        return Err(PipelineError::AuthorizationRequired("OAuth state mismatch".to_string()));
    }
    code.ok_or_else(|| PipelineError::AuthorizationRequired("OAuth redirect carried no code".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_client_secrets_installed_section() {
        let raw = r#"{"installed":{"client_id":"id.apps","client_secret":"s3cret","project_id":"p",
            "auth_uri":"https://accounts.google.com/o/oauth2/auth","token_uri":"https://oauth2.googleapis.com/token",
            "redirect_uris":["http://localhost"]}}"#;
        let secrets = ClientSecrets::from_json(raw).unwrap();
        assert_eq!(secrets.client_id, "id.apps");
        assert_eq!(secrets.client_secret, "s3cret");
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_client_secrets_web_section_and_defaults() {
        let secrets = ClientSecrets::from_json(r#"{"web":{"client_id":"w","client_secret":"x"}}"#).unwrap();
        assert_eq!(secrets.client_id, "w");
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn test_client_secrets_without_section() {
        let err = ClientSecrets::from_json(r#"{"other":{}}"#).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_token_validity_uses_skew() {
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let token = |secs| StoredToken {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: now + Duration::seconds(secs),
            scope: None,
        };
        assert!(token(3600).is_valid(now));
        assert!(token(61).is_valid(now));
        assert!(!token(60).is_valid(now));
        assert!(!token(-10).is_valid(now));
    }

    #[test]
    fn test_refresh_keeps_previous_refresh_token() {
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"new","expires_in":3599,"token_type":"Bearer"}"#).unwrap();
        let token = parsed.into_token(now, Some("keep-me".into()));
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("keep-me"));
        assert_eq!(token.expires_at, now + Duration::seconds(3599));
    }

    #[tokio::test]
    async fn test_token_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested/youtube_token.json"));
        assert_eq!(store.load().await.unwrap(), None);

        let token = StoredToken {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            scope: Some(SCOPES.join(" ")),
        };
        store.save(&token).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_token_store_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("youtube_token.json");
        std::fs::write(&path, "not a token").unwrap();
        assert_eq!(TokenStore::new(path).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_interactive_without_token_requires_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authenticator::new(
            reqwest::Client::new(),
            dir.path().join("client_secrets.json"),
            dir.path().join("youtube_token.json"),
            false,
        );
        let err = auth.access_token().await.unwrap_err();
        assert!(matches!(err, PipelineError::AuthorizationRequired(_)));
    }

    #[tokio::test]
    async fn test_valid_stored_token_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("youtube_token.json");
        let token = StoredToken {
            access_token: "cached".into(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
            scope: None,
        };
        TokenStore::new(token_path.clone()).save(&token).await.unwrap();

        let auth = Authenticator::new(reqwest::Client::new(), dir.path().join("missing.json"), token_path, false);
        assert_eq!(auth.access_token().await.unwrap(), "cached");
    }

    #[test]
    fn test_parse_callback() {
        assert_eq!(parse_callback("/?state=abc&code=4%2F0Ab&scope=x", "abc").unwrap(), "4/0Ab");
        assert!(matches!(
            parse_callback("/?state=evil&code=c", "abc"),
            Err(PipelineError::AuthorizationRequired(_))
        ));
        assert!(parse_callback("/?error=access_denied&state=abc", "abc").is_err());
        assert!(parse_callback("/?state=abc", "abc").is_err());
    }

    #[test]
    fn test_request_target() {
        assert_eq!(request_target("GET /?code=1 HTTP/1.1\r\n").unwrap(), "/?code=1");
        assert!(request_target("POST / HTTP/1.1").is_err());
    }

    #[test]
    fn test_consent_url_carries_state_and_scopes() {
        let secrets = ClientSecrets::from_json(r#"{"installed":{"client_id":"id","client_secret":"s"}}"#).unwrap();
        let url = Url::parse(&consent_url(&secrets, "http://127.0.0.1:8080", "xyz").unwrap()).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["state"], "xyz");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8080");
        assert_eq!(pairs["access_type"], "offline");
        assert!(pairs["scope"].contains("youtube.upload"));
    }

    #[test]
    fn test_random_state_shape() {
        let a = random_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, random_state());
    }
}
