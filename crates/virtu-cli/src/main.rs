//! virtu CLI — talking-avatar backend.
//!
//! ```text
//! virtu serve [--port 8000] [--host 0.0.0.0] [--gui-dir gui] [--avatars avatars.json]
//! virtu ask "hello there" [--model deepseek/deepseek-chat-v3-0324]
//! virtu catalog models|voices|llm [--server http://localhost:8000]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use virtu_lib::llm::{CompletionService, OpenAiClient};
use virtu_lib::state::{AppState, ServeConfig};
use virtu_lib::virtu_core::catalog::{AvatarCatalog, DEFAULT_EMOTION, LlmCatalog};
use virtu_lib::virtu_core::emotion::{parse_emotion, strip_markup};
use virtu_lib::virtu_core::prompt::system_prompt;
use virtu_lib::virtu_core::segment::{DEFAULT_MAX_CHUNK_LEN, DEFAULT_MIN_CHUNK_LEN};
use virtu_lib::virtu_core::types::{
    ConversationMessage, LlmConfig, SegmentConfig, TtsConfig,
};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// virtu — streaming LLM replies as avatar expressions, text and speech
#[derive(Parser)]
#[command(name = "virtu", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the avatar backend
    Serve {
        /// Listen port
        #[arg(long, default_value = "8000")]
        port: u16,
        /// Listen host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// OpenAI-compatible API base URL
        #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,
        /// API key for the completion service
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
        api_key: String,
        /// Speech synthesis service URL
        #[arg(long, env = "VIRTU_TTS_URL", default_value = "http://localhost:8001")]
        tts_url: String,
        /// JSON file replacing the built-in avatar catalog
        #[arg(long)]
        avatars: Option<PathBuf>,
        /// Static frontend directory served at /
        #[arg(long)]
        gui_dir: Option<PathBuf>,
        /// Shortest chunk sent for synthesis, in characters
        #[arg(long, default_value_t = DEFAULT_MIN_CHUNK_LEN)]
        min_chunk: usize,
        /// Chunk length that forces a cut at the next sentence end
        #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_LEN)]
        max_chunk: usize,
        /// Completion request retries
        #[arg(long, default_value = "3")]
        max_retries: u32,
        /// Seconds between completion retries
        #[arg(long, default_value = "20")]
        retry_delay: u64,
    },
    /// One-shot completion with the default avatar's prompt
    Ask {
        /// Message to send
        text: String,
        /// Completion model id
        #[arg(long)]
        model: Option<String>,
        #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
        api_key: String,
    },
    /// Print a catalog from a running server
    Catalog {
        kind: CatalogKind,
        /// Server URL
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CatalogKind {
    Models,
    Voices,
    Llm,
}

impl CatalogKind {
    fn path(self) -> &'static str {
        match self {
            Self::Models => "models",
            Self::Voices => "voices",
            Self::Llm => "llm",
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "virtu=info,virtu_lib=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            base_url,
            api_key,
            tts_url,
            avatars,
            gui_dir,
            min_chunk,
            max_chunk,
            max_retries,
            retry_delay,
        } => {
            let config = ServeConfig {
                llm: LlmConfig {
                    base_url,
                    api_key,
                    max_retries,
                    retry_delay: Duration::from_secs(retry_delay),
                    ..Default::default()
                },
                tts: TtsConfig {
                    url: tts_url,
                    ..Default::default()
                },
                segment: SegmentConfig {
                    min_chunk_len: min_chunk,
                    max_chunk_len: max_chunk,
                },
                avatars,
            };

            let state = AppState::from_config(config)
                .await
                .expect("failed to load configuration");
            let app = virtu_lib::server::router(state, gui_dir.as_deref());

            let addr = format!("{host}:{port}");
            info!("virtu listening on {addr}");

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .expect("failed to bind");

            axum::serve(listener, app).await.expect("server error");
        }

        Command::Ask {
            text,
            model,
            base_url,
            api_key,
        } => {
            let avatars = AvatarCatalog::builtin();
            let profile = avatars.default_profile();
            let model = model.unwrap_or_else(|| LlmCatalog::builtin().default_model().to_string());
            let messages = [
                ConversationMessage::system(system_prompt(profile)),
                ConversationMessage::user(text),
            ];

            let client = OpenAiClient::new(LlmConfig {
                base_url,
                api_key,
                ..Default::default()
            });
            let reply = client
                .complete(&messages, &model)
                .await
                .expect("completion failed");

            let emotion = parse_emotion(&reply, profile).unwrap_or_else(|| DEFAULT_EMOTION.into());
            println!("[{emotion}] {}", strip_markup(&reply).trim());
        }

        Command::Catalog { kind, server } => {
            let resp = reqwest::Client::new()
                .get(format!("{server}/virtupy/api/{}", kind.path()))
                .send()
                .await
                .expect("request failed");
            let body: serde_json::Value = resp.json().await.expect("invalid JSON response");
            println!(
                "{}",
                serde_json::to_string_pretty(&body).unwrap_or_default()
            );
        }
    }
}
