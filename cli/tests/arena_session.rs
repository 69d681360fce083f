//! Live integration tests against a running arena authority. They skip
//! cleanly unless ARENA_ADMIN_TOKEN (and optionally ARENA_WS_BASE_URL) is
//! set, so `cargo test` stays green without a server.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use sanban_core::codec::{decode, encode};
use sanban_core::protocol::{AdminMsg, ClientMsg, MoveCandidate, ServerMsg};
use sanban_core::session::GameSettings;
use sanban_core::session_code::{SESSION_CODE_ALPHABET, SESSION_CODE_LEN};
use sanban_core::GameKind;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
struct AuthPayload {
    v: u8,
    name: String,
    ts: i64,
    nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn admin_token_from_env() -> Option<String> {
    std::env::var("ARENA_ADMIN_TOKEN").ok()
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn build_auth_protocol(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    let nonce: [u8; 12] = rand::rng().random();
    let payload = AuthPayload {
        v: 1,
        name: name.to_string(),
        ts: now_ms(),
        nonce: URL_SAFE_NO_PAD.encode(nonce),
        token: None,
    };
    let payload_bytes = serde_json::to_vec(&payload)?;
    Ok(format!(
        "sanban-auth-v1.{}",
        URL_SAFE_NO_PAD.encode(payload_bytes)
    ))
}

fn generate_session_code() -> String {
    let mut rng = rand::rng();
    let alphabet = SESSION_CODE_ALPHABET.as_bytes();
    let mut code = String::with_capacity(SESSION_CODE_LEN);
    for _ in 0..SESSION_CODE_LEN {
        let idx = rng.random_range(0..alphabet.len());
        code.push(alphabet[idx] as char);
    }
    code
}

fn build_session_url(
    base_url: &str,
    code: &str,
    admin_token: Option<&str>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    let base_path = url.path().trim_end_matches('/');
    let path = format!("{}/{}", base_path, code);
    url.set_path(&path);
    url.set_query(None);
    if let Some(token) = admin_token {
        url.query_pairs_mut().append_pair("admin_token", token);
    }
    Ok(url)
}

async fn connect(
    base_url: &str,
    code: &str,
    name: &str,
    admin_token: Option<&str>,
) -> Result<WsStream, Box<dyn std::error::Error>> {
    let url = build_session_url(base_url, code, admin_token)?;
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|err| format!("failed to build websocket request: {err}"))?;
    request
        .headers_mut()
        .append("Sec-WebSocket-Protocol", build_auth_protocol(name)?.parse()?);
    let (ws, _) = connect_async(request).await?;
    Ok(ws)
}

async fn recv_server_msg(
    read: &mut futures_util::stream::SplitStream<WsStream>,
) -> Option<ServerMsg> {
    while let Some(message) = read.next().await {
        let Ok(message) = message else {
            continue;
        };
        match message {
            Message::Binary(bytes) => {
                if let Some(msg) = decode::<ServerMsg>(&bytes) {
                    return Some(msg);
                }
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn recv_with_timeout(
    read: &mut futures_util::stream::SplitStream<WsStream>,
    dur: Duration,
) -> Option<ServerMsg> {
    match timeout(dur, recv_server_msg(read)).await {
        Ok(msg) => msg,
        Err(_) => None,
    }
}

async fn send_client_msg(
    write: &mut futures_util::stream::SplitSink<WsStream, Message>,
    msg: ClientMsg,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bytes) = encode(&msg) {
        write.send(Message::Binary(bytes.into())).await?;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn guest_observes_host_move() -> Result<(), Box<dyn std::error::Error>> {
    let Some(admin_token) = admin_token_from_env() else {
        eprintln!("Skipping test: ARENA_ADMIN_TOKEN not set.");
        return Ok(());
    };
    let base_url = env_or("ARENA_WS_BASE_URL", "ws://127.0.0.1:8787/ws");
    let code = generate_session_code();

    let admin_ws = connect(&base_url, &code, "admin", Some(&admin_token)).await?;
    let (mut admin_write, mut admin_read) = admin_ws.split();
    send_admin(
        &mut admin_write,
        AdminMsg::Create {
            code: Some(code.clone()),
            host_name: "host".to_string(),
            settings: Some(GameSettings::Board {
                size: 9,
                clock: None,
            }),
        },
    )
    .await?;
    let mut created = false;
    while let Some(msg) = recv_with_timeout(&mut admin_read, Duration::from_secs(5)).await {
        match msg {
            ServerMsg::AdminAck { .. } => {
                created = true;
                break;
            }
            ServerMsg::Error { code, message } => {
                return Err(format!("create failed with {code}: {message}").into());
            }
            _ => {}
        }
    }
    assert!(created, "did not receive admin create ack");

    let host_ws = connect(&base_url, &code, "host", None).await?;
    let (mut host_write, mut host_read) = host_ws.split();
    send_client_msg(&mut host_write, ClientMsg::Join { code: code.clone() }).await?;

    let guest_ws = connect(&base_url, &code, "guest", None).await?;
    let (mut guest_write, mut guest_read) = guest_ws.split();
    send_client_msg(&mut guest_write, ClientMsg::Join { code: code.clone() }).await?;

    let deadline = Duration::from_secs(5);
    let mut host_joined = false;
    while let Some(msg) = recv_with_timeout(&mut host_read, deadline).await {
        if matches!(msg, ServerMsg::Joined { .. }) {
            host_joined = true;
            break;
        }
    }
    assert!(host_joined, "host did not receive join ack");
    let mut guest_joined = false;
    while let Some(msg) = recv_with_timeout(&mut guest_read, deadline).await {
        if matches!(msg, ServerMsg::Joined { .. }) {
            guest_joined = true;
            break;
        }
    }
    assert!(guest_joined, "guest did not receive join ack");

    send_client_msg(
        &mut host_write,
        ClientMsg::StartRound {
            code: code.clone(),
            game: GameKind::Board,
        },
    )
    .await?;
    let mut started = false;
    while let Some(msg) = recv_with_timeout(&mut host_read, deadline).await {
        match msg {
            ServerMsg::GameStarted { .. } => {
                started = true;
                break;
            }
            ServerMsg::Error { code, message } => {
                return Err(format!("start failed with {code}: {message}").into());
            }
            _ => {}
        }
    }
    assert!(started, "host did not observe game start");

    send_client_msg(
        &mut host_write,
        ClientMsg::SubmitMove {
            code: code.clone(),
            candidate: MoveCandidate::Stone { row: 4, col: 4 },
        },
    )
    .await?;

    let mut observed = false;
    while let Some(msg) = recv_with_timeout(&mut guest_read, deadline).await {
        if let ServerMsg::MoveResult { applied, .. } = msg {
            if applied == Some(MoveCandidate::Stone { row: 4, col: 4 }) {
                observed = true;
                break;
            }
        }
    }
    assert!(observed, "guest did not observe the host move");
    Ok(())
}

async fn send_admin(
    write: &mut futures_util::stream::SplitSink<WsStream, Message>,
    msg: AdminMsg,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bytes) = encode(&msg) {
        write.send(Message::Binary(bytes.into())).await?;
    }
    Ok(())
}
