use async_trait::async_trait;
use url::Url;

pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";
pub const SCOPES: &str =
    "user-read-playback-state user-modify-playback-state user-read-currently-playing";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("spotify integration is disabled")]
    Disabled,
    #[error("no access token in {0:?}")]
    NoToken(String),
    #[error("authorization failed: {0}")]
    Failed(String),
}

/// Source of a bearer token for the player API.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    async fn authorize(&self) -> Result<String, AuthError>;
}

/// A token handed in directly, e.g. from `--spotify-token`.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AuthorizationProvider for StaticToken {
    async fn authorize(&self) -> Result<String, AuthError> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(AuthError::NoToken(String::new()));
        }
        Ok(token.to_string())
    }
}

/// The URL the browser lands on after the implicit grant, pasted back by
/// the user. A bare token is accepted as well.
#[derive(Debug, Clone)]
pub struct RedirectUrl(pub String);

#[async_trait]
impl AuthorizationProvider for RedirectUrl {
    async fn authorize(&self) -> Result<String, AuthError> {
        token_from_redirect(&self.0).ok_or_else(|| AuthError::NoToken(self.0.clone()))
    }
}

pub fn authorize_url(client_id: &str, redirect_uri: &str) -> Result<Url, AuthError> {
    let mut url = Url::parse(AUTHORIZE_ENDPOINT).map_err(|e| AuthError::Failed(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "token")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", SCOPES);
    Ok(url)
}

pub fn token_from_redirect(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let Ok(url) = Url::parse(input) else {
        // not a URL: treat as a raw token unless it looks like a fragment
        return match input.strip_prefix('#') {
            Some(fragment) => access_token(fragment),
            None if !input.contains(['=', '&', ' ']) => Some(input.to_string()),
            None => access_token(input),
        };
    };
    url.fragment().and_then(access_token)
}

fn access_token(fragment: &str) -> Option<String> {
    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(k, _)| k == "access_token")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}
