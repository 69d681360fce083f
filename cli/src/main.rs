use clap::{Args, Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use sanban_core::clock::ClockMode;
use sanban_core::codec::{decode, encode};
use sanban_core::protocol::{AdminMsg, ServerMsg};
use sanban_core::session::GameSettings;
use sanban_core::session_code::{SessionCode, SESSION_CODE_ALPHABET, SESSION_CODE_LEN};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

mod auth;
mod bot;

#[derive(Parser)]
#[command(name = "sanban-cli", version, about = "Admin and bot tools for sanban arena sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Sessions {
        #[command(subcommand)]
        command: SessionCommand,
    },
    Bot {
        #[command(subcommand)]
        command: bot::BotCommand,
    },
}

#[derive(Args)]
pub(crate) struct SessionArgs {
    #[arg(long, env = "ARENA_WS_BASE_URL", default_value = "ws://localhost:8787/ws")]
    pub(crate) base_url: String,
    #[arg(long)]
    pub(crate) code: String,
    #[arg(long, default_value = "bot")]
    pub(crate) name: String,
    #[arg(long, env = "ARENA_AUTH_TOKEN")]
    pub(crate) token: Option<String>,
}

#[derive(Subcommand)]
enum SessionCommand {
    Create {
        #[arg(long, env = "ARENA_WS_BASE_URL", default_value = "ws://localhost:8787/ws")]
        base_url: String,
        #[arg(long, env = "ARENA_ADMIN_TOKEN")]
        admin_token: String,
        /// Game to pre-select: choice, board or matching.
        #[arg(long, default_value = "board")]
        game: String,
        #[arg(long, default_value_t = 9)]
        board_size: u8,
        /// Main thinking time in seconds; enables a clock for the board game.
        #[arg(long)]
        main_secs: Option<u64>,
        /// Per-move bonus in seconds (increment clock).
        #[arg(long)]
        increment_secs: Option<u64>,
        /// Overtime period length in seconds (period clock).
        #[arg(long)]
        period_secs: Option<u64>,
        #[arg(long, default_value_t = 5)]
        periods: u8,
        #[arg(long, default_value_t = 3)]
        best_of: u8,
        #[arg(long, default_value_t = 8)]
        pairs: u8,
        #[arg(long)]
        code: Option<String>,
        #[arg(long, default_value = "host")]
        host_name: String,
        #[arg(long)]
        no_connect: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sessions { command } => match command {
            SessionCommand::Create {
                base_url,
                admin_token,
                game,
                board_size,
                main_secs,
                increment_secs,
                period_secs,
                periods,
                best_of,
                pairs,
                code,
                host_name,
                no_connect,
            } => {
                let code = match code {
                    Some(code) => SessionCode::parse(&code)?.to_string(),
                    None => generate_session_code(),
                };
                let clock = build_clock(main_secs, increment_secs, period_secs, periods)?;
                let settings =
                    build_settings(&game, board_size, clock, best_of, pairs)?;
                if let Err(reason) = settings.validate() {
                    eprintln!("invalid settings: {reason}");
                    return Ok(());
                }

                let admin_url = build_admin_url(&base_url, &code, &admin_token)?;
                let join_url = build_join_url(&base_url, &code)?;

                println!("code: {code}");
                println!("join_url: {join_url}");

                if no_connect {
                    println!("admin_url: {admin_url}");
                    return Ok(());
                }

                let (ws, _response) = tokio_tungstenite::connect_async(admin_url.as_str()).await?;
                let (mut write, mut read) = ws.split();

                let msg = AdminMsg::Create {
                    code: Some(code),
                    host_name,
                    settings: Some(settings),
                };
                if let Some(payload) = encode(&msg) {
                    write.send(Message::Binary(payload.into())).await?;
                }

                if let Some(message) = read.next().await {
                    match message? {
                        Message::Text(text) => println!("server: {text}"),
                        Message::Binary(bytes) => match decode::<ServerMsg>(&bytes) {
                            Some(ServerMsg::AdminAck { session }) => {
                                println!(
                                    "created session {} (status {:?})",
                                    session.code, session.status
                                );
                            }
                            Some(msg) => println!("server: {msg:?}"),
                            None => println!("server sent an undecodable frame"),
                        },
                        Message::Close(frame) => println!("server closed: {frame:?}"),
                        _ => {}
                    }
                }
            }
        },
        Commands::Bot { command } => bot::run(command).await?,
    }

    Ok(())
}

fn build_clock(
    main_secs: Option<u64>,
    increment_secs: Option<u64>,
    period_secs: Option<u64>,
    periods: u8,
) -> Result<Option<ClockMode>, Box<dyn std::error::Error>> {
    let Some(main_secs) = main_secs else {
        if increment_secs.is_some() || period_secs.is_some() {
            return Err("clock flags require --main-secs".into());
        }
        return Ok(None);
    };
    let main_ms = main_secs * 1_000;
    match (increment_secs, period_secs) {
        (Some(_), Some(_)) => Err("pick either --increment-secs or --period-secs".into()),
        (Some(increment), None) => Ok(Some(ClockMode::IncrementOnMove {
            main_ms,
            increment_ms: increment * 1_000,
        })),
        (None, Some(period)) => Ok(Some(ClockMode::Periods {
            main_ms,
            period_ms: period * 1_000,
            periods,
        })),
        (None, None) => Ok(Some(ClockMode::IncrementOnMove {
            main_ms,
            increment_ms: 0,
        })),
    }
}

fn build_settings(
    game: &str,
    board_size: u8,
    clock: Option<ClockMode>,
    best_of: u8,
    pairs: u8,
) -> Result<GameSettings, Box<dyn std::error::Error>> {
    match game {
        "choice" => Ok(GameSettings::Choice { best_of }),
        "board" => Ok(GameSettings::Board {
            size: board_size,
            clock,
        }),
        "matching" => Ok(GameSettings::Matching { pairs }),
        other => Err(format!("unknown game: {other} (choice, board or matching)").into()),
    }
}

pub(crate) fn generate_session_code() -> String {
    let mut rng = rand::rng();
    let alphabet = SESSION_CODE_ALPHABET.as_bytes();
    let mut code = String::with_capacity(SESSION_CODE_LEN);
    for _ in 0..SESSION_CODE_LEN {
        let idx = rng.random_range(0..alphabet.len());
        code.push(alphabet[idx] as char);
    }
    code
}

fn build_admin_url(base_url: &str, code: &str, token: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    let base_path = url.path().trim_end_matches('/');
    let path = format!("{}/{}", base_path, code);
    url.set_path(&path);
    url.query_pairs_mut().append_pair("admin_token", token);
    Ok(url)
}

pub(crate) fn build_join_url(base_url: &str, code: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    let base_path = url.path().trim_end_matches('/');
    let path = format!("{}/{}", base_path, code);
    url.set_path(&path);
    url.set_query(None);
    Ok(url)
}
