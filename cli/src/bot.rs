use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use sanban_core::board::BoardOccupancy;
use sanban_core::codec::{decode, encode};
use sanban_core::outcome::{GamePhase, ScorePair};
use sanban_core::protocol::{ClientMsg, MoveCandidate, ServerMsg};
use sanban_core::session::{
    GameKind, GameSettings, ParticipantRole, SessionSnapshot, SessionStatus,
};

use crate::auth;
use crate::SessionArgs;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsRead = futures_util::stream::SplitStream<WsStream>;
type WsWrite = futures_util::stream::SplitSink<WsStream, Message>;

#[derive(clap::Subcommand)]
pub(super) enum BotCommand {
    /// Join a session and play whichever game starts, as a scripted opponent.
    Run {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, default_value_t = 120)]
        duration_secs: u64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 400)]
        think_min_ms: u64,
        #[arg(long, default_value_t = 2200)]
        think_max_ms: u64,
        /// Chance per board turn of passing instead of placing.
        #[arg(long, default_value_t = 0.05)]
        pass_rate: f32,
    },
}

pub(super) async fn run(command: BotCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        BotCommand::Run {
            session,
            duration_secs,
            seed,
            think_min_ms,
            think_max_ms,
            pass_rate,
        } => {
            run_bot(
                session,
                duration_secs,
                seed,
                (think_min_ms, think_max_ms),
                pass_rate,
            )
            .await
        }
    }
}

fn err_msg(msg: impl Into<String>) -> Box<dyn std::error::Error> {
    msg.into().into()
}

#[derive(Debug)]
struct BotState {
    role: Option<ParticipantRole>,
    session: Option<SessionSnapshot>,
    game: Option<GameKind>,
    settings: Option<GameSettings>,
    running: bool,
    turn: Option<ParticipantRole>,
    locked: bool,
    board: Option<BoardOccupancy>,
    scores: ScorePair,
    result: Option<String>,
}

impl BotState {
    fn new() -> Self {
        Self {
            role: None,
            session: None,
            game: None,
            settings: None,
            running: false,
            turn: None,
            locked: false,
            board: None,
            scores: ScorePair::default(),
            result: None,
        }
    }

    fn my_turn(&self) -> bool {
        if !self.running || self.locked {
            return false;
        }
        match self.game {
            // Simultaneous rounds: act whenever this round's pick is not
            // locked yet.
            Some(GameKind::Choice) => true,
            _ => self.role.is_some() && self.turn == self.role,
        }
    }

    fn apply_server_msg(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::Joined { session, role } => {
                self.role = Some(*role);
                self.running = session.status == SessionStatus::InProgress;
                if self.running {
                    self.game = session.active_game;
                    self.settings = session.pending_settings;
                    if let Some(GameSettings::Board { size, .. }) = session.pending_settings {
                        self.board = Some(BoardOccupancy::new(size));
                    }
                    self.turn = Some(ParticipantRole::Host);
                }
                self.session = Some(session.clone());
            }
            ServerMsg::GameStarted {
                session,
                game,
                settings,
            } => {
                self.session = Some(session.clone());
                self.game = Some(*game);
                self.settings = Some(*settings);
                self.board = match settings {
                    GameSettings::Board { size, .. } => Some(BoardOccupancy::new(*size)),
                    _ => None,
                };
                self.running = true;
                self.turn = Some(ParticipantRole::Host);
                self.locked = false;
                self.scores = ScorePair::default();
                self.result = None;
            }
            ServerMsg::MoveResult {
                by,
                applied,
                scores,
                next_turn,
                complete,
                ..
            } => {
                if let (Some(board), Some(MoveCandidate::Stone { row, col })) =
                    (self.board.as_mut(), applied)
                {
                    let _ = board.place(*row, *col, *by);
                }
                self.scores = *scores;
                self.locked = false;
                if *complete {
                    self.running = false;
                } else {
                    self.turn = *next_turn;
                }
            }
            ServerMsg::PassResult {
                next_turn, phase, ..
            } => {
                self.locked = false;
                self.turn = *next_turn;
                if *phase != GamePhase::Playing {
                    self.running = false;
                }
            }
            ServerMsg::ClockExpired { winner, message } => {
                self.running = false;
                self.result = Some(format!("timeout, {} wins: {message}", winner.label()));
            }
            ServerMsg::Resigned { winner, message } => {
                self.running = false;
                self.result = Some(format!("resignation, {} wins: {message}", winner.label()));
            }
            ServerMsg::ScoreFinalized { winner, .. } => {
                self.running = false;
                self.result = Some(match winner {
                    Some(winner) => format!("scored, {} wins", winner.label()),
                    None => "scored, drawn".to_string(),
                });
            }
            ServerMsg::Error { code, message } => {
                eprintln!("server error {code}: {message}");
                // A rejected action will not be resolved; free the slot.
                self.locked = false;
            }
            _ => {}
        }
    }
}

fn choose_candidate(state: &BotState, rng: &mut StdRng, pass_rate: f32) -> MoveCandidate {
    match state.game {
        Some(GameKind::Choice) => MoveCandidate::Pick {
            option: rng.random_range(0..3),
        },
        Some(GameKind::Matching) => {
            let cells = match state.settings {
                Some(GameSettings::Matching { pairs }) => (pairs as u16) * 2,
                _ => 16,
            };
            let first = rng.random_range(0..cells) as u8;
            let mut second = rng.random_range(0..cells) as u8;
            while second == first {
                second = rng.random_range(0..cells) as u8;
            }
            MoveCandidate::Reveal { first, second }
        }
        _ => choose_board_move(state.board.as_ref(), rng, pass_rate),
    }
}

fn choose_board_move(
    board: Option<&BoardOccupancy>,
    rng: &mut StdRng,
    pass_rate: f32,
) -> MoveCandidate {
    let Some(board) = board else {
        return MoveCandidate::Pass;
    };
    if rng.random::<f32>() < pass_rate {
        return MoveCandidate::Pass;
    }
    let size = board.size();
    let mut empty = Vec::new();
    for row in 0..size {
        for col in 0..size {
            if board.is_empty(row, col) {
                empty.push((row, col));
            }
        }
    }
    if empty.is_empty() {
        return MoveCandidate::Pass;
    }
    let (row, col) = empty[rng.random_range(0..empty.len())];
    MoveCandidate::Stone { row, col }
}

async fn connect_session(args: &SessionArgs) -> Result<WsStream, Box<dyn std::error::Error>> {
    let url = crate::build_join_url(&args.base_url, &args.code)?;
    let protocol = auth::build_auth_protocol(&args.name, args.token.as_deref())?;
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|err| err_msg(format!("failed to build websocket request: {err}")))?;
    request
        .headers_mut()
        .append("Sec-WebSocket-Protocol", protocol.parse()?);
    let (ws, _) = connect_async(request).await?;
    Ok(ws)
}

async fn recv_server_msg(read: &mut WsRead) -> Option<ServerMsg> {
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

async fn pump_messages(
    read: &mut WsRead,
    state: &mut BotState,
    window: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let deadline = Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }
        let Ok(maybe) = timeout(remaining, recv_server_msg(read)).await else {
            return Ok(());
        };
        let Some(msg) = maybe else {
            return Err(err_msg("connection closed"));
        };
        state.apply_server_msg(&msg);
    }
}

async fn send_client_msg(
    write: &mut WsWrite,
    msg: ClientMsg,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bytes) = encode(&msg) {
        write.send(Message::Binary(bytes.into())).await?;
    }
    Ok(())
}

async fn run_bot(
    args: SessionArgs,
    duration_secs: u64,
    seed: Option<u64>,
    think_bounds_ms: (u64, u64),
    pass_rate: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = {
        let base_seed = seed.unwrap_or_else(|| rand::rng().random());
        StdRng::seed_from_u64(base_seed)
    };

    let ws = connect_session(&args).await?;
    let (mut write, mut read) = ws.split();
    let mut state = BotState::new();

    send_client_msg(
        &mut write,
        ClientMsg::Join {
            code: args.code.clone(),
        },
    )
    .await?;

    let join_deadline = Instant::now() + Duration::from_secs(15);
    while state.role.is_none() {
        if Instant::now() >= join_deadline {
            return Err(err_msg("no join ack before timeout"));
        }
        pump_messages(&mut read, &mut state, Duration::from_millis(200)).await?;
    }
    println!(
        "joined {} as {}",
        args.code,
        state.role.map(|r| r.label()).unwrap_or("?")
    );

    let end_at = Instant::now() + Duration::from_secs(duration_secs);
    while Instant::now() < end_at {
        pump_messages(&mut read, &mut state, Duration::from_millis(120)).await?;
        if let Some(result) = state.result.take() {
            println!(
                "game over ({result}); score {}:{}",
                state.scores.host, state.scores.guest
            );
            // Stay in the room: a rematch may re-arm the session.
        }
        if !state.my_turn() {
            continue;
        }

        let think_ms = rng.random_range(think_bounds_ms.0..=think_bounds_ms.1.max(think_bounds_ms.0));
        sleep(Duration::from_millis(think_ms)).await;
        pump_messages(&mut read, &mut state, Duration::from_millis(20)).await?;
        if !state.my_turn() {
            continue;
        }

        let candidate = choose_candidate(&state, &mut rng, pass_rate);
        let msg = match candidate {
            MoveCandidate::Pass => ClientMsg::Pass {
                code: args.code.clone(),
            },
            candidate => ClientMsg::SubmitMove {
                code: args.code.clone(),
                candidate,
            },
        };
        send_client_msg(&mut write, msg).await?;
        state.locked = true;
    }

    println!("bot run finished");
    Ok(())
}
