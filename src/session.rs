//! Signed cookie sessions.
//!
//! The whole session travels in one cookie:
//!
//! ```text
//! session=<base64url(json)>.<base64url(hmac-sha256(json-part, SECRET_KEY))>
//! ```
//!
//! Nothing is stored server-side. A cookie that fails to decode or verify is
//! treated as an empty session, never as an error.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::Error;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "session";

const COOKIE_ATTRIBUTES: &str = "HttpOnly; Path=/; SameSite=Lax";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl Session {
    /// A session logged in as `user_id`.
    pub fn for_user(user_id: i64) -> Self {
        Self { user_id: Some(user_id) }
    }

    /// Decodes the `session` cookie out of a raw `Cookie` header value.
    pub fn from_cookie_header(header: Option<&str>, secret: &str) -> Self {
        header
            .and_then(|h| {
                h.split(';')
                    .filter_map(|pair| pair.trim().split_once('='))
                    .find(|(name, _)| *name == COOKIE_NAME)
                    .map(|(_, value)| value)
            })
            .and_then(|value| decode(value, secret))
            .unwrap_or_default()
    }

    /// `Set-Cookie` value carrying this session.
    pub fn to_set_cookie(&self, secret: &str) -> Result<String, Error> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?);
        let signature = URL_SAFE_NO_PAD.encode(sign(payload.as_bytes(), secret).finalize().into_bytes());
        Ok(format!("{COOKIE_NAME}={payload}.{signature}; {COOKIE_ATTRIBUTES}"))
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clear_cookie() -> String {
        format!("{COOKIE_NAME}=; Max-Age=0; {COOKIE_ATTRIBUTES}")
    }
}

fn sign(payload: &[u8], secret: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    mac
}

fn decode(value: &str, secret: &str) -> Option<Session> {
    let (payload, signature) = value.split_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    sign(payload.as_bytes(), secret).verify_slice(&signature).ok()?;
    let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&json).ok()
}
