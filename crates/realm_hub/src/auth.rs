//! Token authentication for incoming WebSocket connections.
//!
//! Clients connect with query parameters `realm`, `user`, `expire` (unix
//! seconds), and `_token` (a hex-encoded MAC). The token authenticates the
//! canonical string `expire=<expire>&realm=<realm>&user=<user>` under the
//! server's secret key, so a client can neither forge another user's name
//! nor hop into a realm it was not issued a token for.

use crate::error::HubError;
use crate::message::Realm;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The authenticated identity extracted from a connection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The realm this connection was issued a token for
    pub realm: Realm,
    /// The authenticated username
    pub username: String,
}

/// Validates the query string of a WebSocket upgrade request.
///
/// `now` is the current unix time in seconds, passed in by the caller so
/// expiry handling stays testable. Connections failing validation must
/// never be registered with the hub.
///
/// # Errors
///
/// Returns [`HubError::Auth`] for missing or malformed parameters, an
/// expired token, or a signature mismatch, and [`HubError::Internal`] if
/// no secret key is configured.
pub fn validate_ws_request(query: &str, secret_key: &str, now: i64) -> Result<Credentials, HubError> {
    if secret_key.is_empty() {
        return Err(HubError::Internal("no secret key configured".to_string()));
    }

    let mut realm = None;
    let mut user = None;
    let mut expire = None;
    let mut token = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "realm" => realm = Some(value.into_owned()),
            "user" => user = Some(value.into_owned()),
            "expire" => expire = Some(value.into_owned()),
            "_token" => token = Some(value.into_owned()),
            _ => {}
        }
    }

    let expire: i64 = expire
        .unwrap_or_default()
        .parse()
        .map_err(|_| HubError::Auth("expiry timestamp missing or malformed".to_string()))?;
    if expire < now {
        return Err(HubError::Auth(format!(
            "token has expired (expire = {expire}, now = {now})"
        )));
    }
    let realm = realm
        .filter(|r| !r.is_empty())
        .ok_or_else(|| HubError::Auth("no realm was specified".to_string()))?;
    let user = user
        .filter(|u| !u.is_empty())
        .ok_or_else(|| HubError::Auth("no user was specified".to_string()))?;
    let token = hex::decode(token.unwrap_or_default())
        .map_err(|_| HubError::Auth("token is not valid hex".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| HubError::Internal(e.to_string()))?;
    mac.update(signed_string(expire, &realm, &user).as_bytes());
    mac.verify_slice(&token)
        .map_err(|_| HubError::Auth("token signature mismatch".to_string()))?;

    Ok(Credentials {
        realm: Realm::from(realm),
        username: user,
    })
}

/// Produces the hex token for the given parameters.
///
/// This is the counterpart of [`validate_ws_request`], used by whatever
/// issues connection tokens (and by the tests).
pub fn sign_connect_token(secret_key: &str, expire: i64, realm: &str, user: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signed_string(expire, realm, user).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn signed_string(expire: i64, realm: &str, user: &str) -> String {
    format!("expire={expire}&realm={realm}&user={user}")
}
