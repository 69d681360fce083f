use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use serde::Serialize;

pub(crate) const AUTH_PROTOCOL_PREFIX: &str = "sanban-auth-v1.";

/// Carried as the websocket subprotocol. The token itself is issued by the
/// account service; this tool only wraps it for transport.
#[derive(Serialize)]
struct AuthPayload {
    v: u8,
    name: String,
    ts: i64,
    nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn random_nonce() -> String {
    let bytes: [u8; 12] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn build_auth_protocol(
    name: &str,
    token: Option<&str>,
) -> Result<String, serde_json::Error> {
    let payload = AuthPayload {
        v: 1,
        name: name.to_string(),
        ts: now_ms(),
        nonce: random_nonce(),
        token: token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    };
    let payload_bytes = serde_json::to_vec(&payload)?;
    Ok(format!(
        "{AUTH_PROTOCOL_PREFIX}{}",
        URL_SAFE_NO_PAD.encode(payload_bytes)
    ))
}
