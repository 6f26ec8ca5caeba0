//! OAuth 2.0 authorization-code flow with PKCE for Google APIs.
//!
//! The interactive flow, for desktop use:
//!
//! 1. Generate a code verifier, its SHA-256 challenge and a random state
//! 2. Bind a loopback listener on `127.0.0.1`
//! 3. Open the consent page in the browser
//! 4. Receive the redirect carrying the authorization code
//! 5. Check the state and exchange code + verifier for tokens
//!
//! The same client also performs refresh-token grants.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleEndpoints, OAuthCredentials};
use super::tokens::TokenInfo;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Path the loopback listener expects the redirect on.
const CALLBACK_PATH: &str = "/callback";

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>Authorization Successful</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>Authorization Failed</h1>\
    <p>You can close this window.</p></body></html>";

/// Result of a refresh-token grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    /// The new access token.
    pub access_token: String,
    /// Lifetime of the new access token in seconds.
    pub expires_in: Option<i64>,
    /// A rotated refresh token, when Google issues one.
    pub refresh_token: Option<String>,
}

/// OAuth client for Google APIs.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    endpoints: GoogleEndpoints,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    pub fn new(
        credentials: OAuthCredentials,
        endpoints: GoogleEndpoints,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            credentials,
            endpoints,
            http_client,
        })
    }

    /// Returns the client credentials this instance uses.
    pub fn credentials(&self) -> &OAuthCredentials {
        &self.credentials
    }

    /// Runs the interactive browser flow and returns fresh tokens.
    ///
    /// # Errors
    ///
    /// - configuration error if no loopback port can be bound
    /// - authentication error if the user declines, the state does not
    ///   match, the redirect never arrives, or the code exchange is rejected
    /// - network error if the token endpoint cannot be reached, rate-limit or
    ///   server error if it answers with 429 or another failure status
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
        callback_timeout: Duration,
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);

        let auth_url = pkce.build_auth_url(
            &self.endpoints.auth_url,
            &self.credentials.client_id,
            &redirect_uri,
            scopes,
        );

        info!("starting OAuth flow, opening browser");
        debug!("authorization URL: {}", auth_url);
        eprintln!(
            "\nOpening your browser for Google authorization. If it does not open, visit:\n\n{}\n",
            auth_url
        );

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
        }

        let (code, received_state) = Self::wait_for_callback(listener, callback_timeout)?;

        if received_state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens");

        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token_response = self.post_token_request(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: token_response.access_token,
            expires_in: token_response.expires_in,
            refresh_token: token_response.refresh_token,
        })
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let token_response = self.post_token_request(&params, "token exchange").await?;

        // Google reports what was actually granted, which can be narrower
        // than what was asked for.
        let granted = match token_response.scope {
            Some(ref scope) => scope.split_whitespace().map(String::from).collect(),
            None => scopes.to_vec(),
        };

        info!("obtained tokens");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            granted,
        )
        .with_client(&self.credentials))
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        // Only an explicit rejection of the grant means the credential is bad.
        match status {
            s if s.is_success() => {}
            reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNAUTHORIZED => {
                return Err(ProviderError::authentication(format!(
                    "{} rejected ({}): {}",
                    what, status, body
                )));
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::rate_limited(format!(
                    "{} rate limited: {}",
                    what, body
                )));
            }
            _ => {
                return Err(ProviderError::server(format!(
                    "{} failed ({}): {}",
                    what, status, body
                )));
            }
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }

    /// Binds a loopback listener on the first free port in the range.
    ///
    /// `(0, 0)` asks the OS for any free port.
    fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) else {
                continue;
            };
            let bound = listener
                .local_addr()
                .map_err(|e| ProviderError::internal("failed to read listener address").with_source(e))?
                .port();
            debug!("bound loopback server on port {}", bound);
            return Ok((listener, bound));
        }
        Err(ProviderError::configuration(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Waits for the redirect and extracts the authorization code and state.
    fn wait_for_callback(
        listener: TcpListener,
        timeout: Duration,
    ) -> ProviderResult<(String, String)> {
        let (tx, rx) = mpsc::channel();

        // The accept loop runs on its own thread so the wait can time out.
        let _handle = thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(result) = Self::handle_callback(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                    }
                }
            }
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(ProviderError::authentication("OAuth callback timeout"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ProviderError::internal("callback channel disconnected"))
            }
        }
    }

    /// Answers one request on the loopback listener.
    ///
    /// Returns `None` for requests that are not the redirect (favicon etc.).
    fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<(String, String)>> {
        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();

        if reader.read_line(&mut request_line).is_err() {
            return None;
        }

        let result = parse_callback_request(&request_line)?;

        let page = if result.is_ok() {
            SUCCESS_PAGE
        } else {
            FAILURE_PAGE
        };
        let _ = stream.write_all(page.as_bytes());
        let _ = stream.flush();

        Some(result)
    }
}

/// Parses `GET /callback?code=...&state=... HTTP/1.1`.
///
/// Returns `None` when the request is not aimed at the callback path.
fn parse_callback_request(request_line: &str) -> Option<ProviderResult<(String, String)>> {
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 || parts[0] != "GET" {
        return None;
    }

    let target = parts[1];
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "code" => code = Some(value),
                "state" => state = Some(value),
                "error" => error = Some(value),
                _ => {}
            }
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        ))));
    }

    match code {
        Some(code) => Some(Ok((code, state.unwrap_or_default()))),
        None => Some(Err(ProviderError::authentication(
            "missing authorization code in callback",
        ))),
    }
}

/// PKCE flow state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_urlsafe(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        let state = random_urlsafe(16);

        Self {
            verifier,
            challenge,
            state,
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Builds the consent page URL.
    pub fn build_auth_url(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_endpoint,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_urlsafe(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

    fn client_for(server: &mockito::ServerGuard) -> OAuthClient {
        let endpoints = GoogleEndpoints {
            token_url: format!("{}/token", server.url()),
            ..GoogleEndpoints::default()
        };
        OAuthClient::new(
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret"),
            endpoints,
            Duration::from_secs(5),
            "quickevent-test",
        )
        .unwrap()
    }

    #[test]
    fn pkce_verifier_length() {
        let flow = PkceFlow::new();
        // Base64 encoding of 32 bytes = 43 characters (no padding)
        assert_eq!(flow.verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_is_deterministic() {
        let challenge1 = PkceFlow::compute_challenge("test-verifier-string");
        let challenge2 = PkceFlow::compute_challenge("test-verifier-string");
        assert_eq!(challenge1, challenge2);
    }

    #[test]
    fn pkce_flows_are_random() {
        let flow1 = PkceFlow::new();
        let flow2 = PkceFlow::new();
        assert_ne!(flow1.challenge, flow2.challenge);
        assert_ne!(flow1.state, flow2.state);
    }

    #[test]
    fn auth_url_format() {
        let flow = PkceFlow::new();
        let endpoint = GoogleEndpoints::default().auth_url;
        let url = flow.build_auth_url(
            &endpoint,
            "test-client.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &[SCOPE.to_string()],
        );

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test-client.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcalendar.events"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("state={}", flow.state)));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn callback_with_code_and_state() {
        let result = parse_callback_request("GET /callback?state=abc&code=4%2F0Ab HTTP/1.1\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(result, ("4/0Ab".to_string(), "abc".to_string()));
    }

    #[test]
    fn callback_denied_by_user() {
        let err = parse_callback_request("GET /callback?error=access_denied&state=abc HTTP/1.1")
            .unwrap()
            .unwrap_err();
        assert!(err.is_authentication());
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn callback_without_code() {
        let err = parse_callback_request("GET /callback?state=abc HTTP/1.1")
            .unwrap()
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn unrelated_requests_are_ignored() {
        assert!(parse_callback_request("GET /favicon.ico HTTP/1.1").is_none());
        assert!(parse_callback_request("POST /callback?code=x HTTP/1.1").is_none());
        assert!(parse_callback_request("GET /callbackx?code=x HTTP/1.1").is_none());
        assert!(parse_callback_request("").is_none());
    }

    #[test]
    fn ephemeral_port_binding() {
        let (listener, port) = OAuthClient::bind_loopback_server((0, 0)).unwrap();
        assert_ne!(port, 0);
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }

    #[test]
    fn callback_round_trip_over_loopback() {
        let (listener, port) = OAuthClient::bind_loopback_server((0, 0)).unwrap();

        let browser = thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream
                .write_all(b"GET /callback?code=the-code&state=the-state HTTP/1.1\r\nHost: x\r\n\r\n")
                .unwrap();
            let mut response = String::new();
            let _ = std::io::Read::read_to_string(&mut stream, &mut response);
            response
        });

        let (code, state) =
            OAuthClient::wait_for_callback(listener, Duration::from_secs(5)).unwrap();
        assert_eq!(code, "the-code");
        assert_eq!(state, "the-state");

        let page = browser.join().unwrap();
        assert!(page.starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn callback_times_out() {
        let (listener, _) = OAuthClient::bind_loopback_server((0, 0)).unwrap();
        let err = OAuthClient::wait_for_callback(listener, Duration::from_millis(50)).unwrap_err();
        assert!(err.is_authentication());
        assert!(err.message().contains("timeout"));
    }

    #[tokio::test]
    async fn refresh_token_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "r-1".into()),
                mockito::Matcher::UrlEncoded(
                    "client_id".into(),
                    "test-client.apps.googleusercontent.com".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"fresh","expires_in":3599,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let refreshed = client_for(&server).refresh_token("r-1").await.unwrap();
        assert_eq!(refreshed.access_token, "fresh");
        assert_eq!(refreshed.expires_in, Some(3599));
        assert!(refreshed.refresh_token.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#)
            .create_async()
            .await;

        let err = client_for(&server).refresh_token("revoked").await.unwrap_err();
        assert!(err.is_authentication());
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn token_endpoint_outages_are_remote_errors() {
        for (status, expected) in [
            (429, ProviderErrorCode::RateLimited),
            (500, ProviderErrorCode::ServerError),
            (503, ProviderErrorCode::ServerError),
        ] {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/token")
                .with_status(status)
                .with_body("try again later")
                .create_async()
                .await;

            let err = client_for(&server).refresh_token("r").await.unwrap_err();
            assert_eq!(err.code(), expected, "status {status}");
            assert!(err.is_remote(), "status {status}");
        }
    }

    #[tokio::test]
    async fn unauthorized_client_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let err = client_for(&server).refresh_token("r").await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!err.is_remote());
    }

    #[tokio::test]
    async fn code_exchange_records_granted_scopes_and_client() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("code".into(), "the-code".into()),
                mockito::Matcher::UrlEncoded("code_verifier".into(), "the-verifier".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"{{"access_token":"a","refresh_token":"r","expires_in":3599,"scope":"{}"}}"#,
                SCOPE
            ))
            .create_async()
            .await;

        let client = client_for(&server);
        let tokens = client
            .exchange_code(
                "the-code",
                "the-verifier",
                "http://127.0.0.1:1/callback",
                &[SCOPE.to_string()],
            )
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "a");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
        assert_eq!(tokens.scopes, vec![SCOPE.to_string()]);
        assert_eq!(tokens.client().as_ref(), Some(client.credentials()));
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_network_error() {
        let endpoints = GoogleEndpoints {
            token_url: "http://127.0.0.1:1/token".to_string(),
            ..GoogleEndpoints::default()
        };
        let client = OAuthClient::new(
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "s"),
            endpoints,
            Duration::from_secs(2),
            "quickevent-test",
        )
        .unwrap();

        let err = client.refresh_token("r").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
    }
}
