use anyhow::{Result, anyhow};
use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};
use url::Url;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Tokens returned by the oauth flow (in-memory)
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    /// Space-separated scopes Google reports as granted, when it reports them
    pub scope: Option<String>,
}

fn google_client(client_id: &str, client_secret: Option<&str>) -> Result<BasicClient> {
    let client_id = ClientId::new(client_id.to_string());
    let client_secret = client_secret.map(|s| ClientSecret::new(s.to_string()));

    let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_string())?;
    let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?;

    Ok(BasicClient::new(
        client_id,
        client_secret,
        auth_url,
        Some(token_url),
    ))
}

fn into_tokens(token: &impl TokenResponse<oauth2::basic::BasicTokenType>) -> Tokens {
    Tokens {
        access_token: token.access_token().secret().to_string(),
        refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
        expires_in: token.expires_in().map(|d| d.as_secs()),
        scope: token.scopes().map(|scopes| {
            scopes
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        }),
    }
}

/// Exchange a refresh token for a new access token using the oauth2 crate
pub fn refresh_access_token(
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
) -> Result<Tokens> {
    let oauth_client = google_client(client_id, client_secret)?;

    let rt = RefreshToken::new(refresh_token.to_string());
    let token = oauth_client
        .exchange_refresh_token(&rt)
        .request(http_client)
        .map_err(|e| anyhow!("refresh token exchange failed: {e}"))?;

    Ok(into_tokens(&token))
}

/// What the loopback server made of one browser request.
#[derive(Debug, PartialEq, Eq)]
pub enum Callback {
    Code(String),
    Denied(String),
    StateMismatch,
    Ignored,
}

/// Interpret the path+query of a redirect such as "/callback?code=...&state=...".
pub fn parse_callback(host: &str, port: u16, path_and_query: &str, expected_state: &str) -> Callback {
    // Build a full URL using the SAME host/port as redirect_uri.
    let Ok(parsed) = Url::parse(&format!("http://{host}:{port}{path_and_query}")) else {
        return Callback::Ignored;
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (k, v) in parsed.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "state" => state = Some(v.into_owned()),
            "error" => error = Some(v.into_owned()),
            _ => {}
        }
    }

    if let Some(err) = error {
        return Callback::Denied(err);
    }
    match code {
        Some(_) if state.as_deref() != Some(expected_state) => Callback::StateMismatch,
        Some(c) => Callback::Code(c),
        None => Callback::Ignored,
    }
}

fn loopback_addr(redirect_uri: &str) -> Result<(String, u16, SocketAddr)> {
    let redirect = Url::parse(redirect_uri)
        .map_err(|e| anyhow!("Invalid redirect_uri '{redirect_uri}': {e}"))?;

    let host = redirect
        .host_str()
        .ok_or_else(|| anyhow!("redirect_uri missing host: {redirect_uri}"))?
        .to_string();

    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| anyhow!("redirect_uri missing/unknown port: {redirect_uri}"))?;

    let bind_ip: IpAddr = match host.as_str() {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            anyhow!("redirect_uri host must be localhost/127.0.0.1 or an IP: {other}")
        })?,
    };

    Ok((host, port, SocketAddr::new(bind_ip, port)))
}

/// Perform Authorization Code + PKCE flow. Opens system browser and captures code via tiny server.
/// `user_email` is only passed to Google as a login hint.
pub fn perform_pkce_flow(
    client_id: &str,
    client_secret: Option<&str>,
    redirect_uri: &str,
    scope: &str,
    user_email: &str,
) -> Result<Tokens> {
    let (host, port, bind_addr) = loopback_addr(redirect_uri)?;

    // Listen before the browser is opened so the redirect cannot race us.
    let server = Server::http(bind_addr)
        .map_err(|e| anyhow!("Failed to bind OAuth callback server on {bind_addr}: {e:?}"))?;

    let oauth_client = google_client(client_id, client_secret)?
        .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string())?);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (auth_url, csrf_token) = oauth_client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(scope.to_string()))
        .add_extra_param("access_type", "offline")
        .add_extra_param("login_hint", user_email)
        .set_pkce_challenge(pkce_challenge)
        .url();

    println!("Open this URL in your browser:\n{auth_url}");
    if let Err(e) = open::that(auth_url.as_str()) {
        log::warn!("could not open browser automatically: {e}");
    }

    let mut code_opt: Option<String> = None;
    let wait_until = Instant::now() + CALLBACK_TIMEOUT;

    while Instant::now() < wait_until {
        let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };

        match parse_callback(&host, port, request.url(), csrf_token.secret()) {
            Callback::Code(code) => {
                let _ = request.respond(Response::from_string(
                    "Authorization received. You can close this tab.",
                ));
                code_opt = Some(code);
                break;
            }
            Callback::Denied(err) => {
                let _ = request.respond(Response::from_string(
                    "Authorization was denied. You can close this tab.",
                ));
                return Err(anyhow!("Authorization denied: {err}"));
            }
            Callback::StateMismatch => {
                log::warn!("ignoring OAuth callback with unexpected state");
                let _ = request.respond(Response::from_string("State mismatch").with_status_code(400));
            }
            Callback::Ignored => {
                let _ = request.respond(Response::from_string(
                    "No code found in redirect. You can close this tab.",
                ));
            }
        }
    }

    let code = code_opt.ok_or_else(|| anyhow!("No code received within timeout"))?;

    let token = oauth_client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request(http_client)
        .map_err(|err| {
            log::debug!("token exchange error: {err:#?}");
            anyhow!("Token exchange failed: {err}")
        })?;

    Ok(into_tokens(&token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_with_matching_state_yields_code() {
        let cb = parse_callback("127.0.0.1", 8080, "/callback?code=4%2Fabc&state=xyz", "xyz");
        assert_eq!(cb, Callback::Code("4/abc".into()));
    }

    #[test]
    fn callback_with_wrong_state_is_rejected() {
        let cb = parse_callback("127.0.0.1", 8080, "/callback?code=abc&state=evil", "xyz");
        assert_eq!(cb, Callback::StateMismatch);
    }

    #[test]
    fn callback_error_is_reported() {
        let cb = parse_callback("localhost", 8080, "/callback?error=access_denied&state=xyz", "xyz");
        assert_eq!(cb, Callback::Denied("access_denied".into()));
    }

    #[test]
    fn unrelated_request_is_ignored() {
        assert_eq!(parse_callback("localhost", 8080, "/favicon.ico", "xyz"), Callback::Ignored);
    }

    #[test]
    fn loopback_binding_follows_redirect_uri() {
        let (host, port, addr) = loopback_addr("http://localhost:9000/cb").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 9000);
        assert_eq!(addr, "127.0.0.1:9000".parse().unwrap());

        let (_, port, _) = loopback_addr("http://127.0.0.1").unwrap();
        assert_eq!(port, 80);

        assert!(loopback_addr("http://example.com/cb").is_err());
    }
}
