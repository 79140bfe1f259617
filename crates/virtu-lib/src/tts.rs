//! Speech synthesis — chunk text → WAV bytes from an HTTP TTS service.
//!
//! The service speaks the OpenAI `audio/speech` dialect extended with the
//! Silero fields (`language`, `sample_rate`). The language selects the model
//! from the voice catalog; the speaker is passed through as `voice`.

use async_trait::async_trait;
use tracing::{debug, error};

use virtu_core::catalog::VoiceCatalog;
use virtu_core::types::{TtsConfig, Voice};
use virtu_core::wav::normalize_wav;

use crate::error::{Error, Result};

/// Anything that can turn text into a playable clip.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice`, returning a complete WAV body.
    async fn synthesize(&self, text: &str, voice: &Voice) -> Result<Vec<u8>>;
}

pub struct HttpSynthesizer {
    http: reqwest::Client,
    config: TtsConfig,
    voices: VoiceCatalog,
}

impl HttpSynthesizer {
    pub fn new(config: TtsConfig, voices: VoiceCatalog) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            voices,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/speech", self.config.url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, voice: &Voice) -> Result<Vec<u8>> {
        let model = self.voices.model_for(&voice.language).ok_or_else(|| {
            Error::Synthesis(format!("no model for language '{}'", voice.language))
        })?;

        debug!(
            "tts: POST {} chars ({}/{})",
            text.chars().count(),
            voice.language,
            voice.speaker
        );

        let resp = self
            .http
            .post(self.endpoint())
            .json(&serde_json::json!({
                "input": text,
                "model": model,
                "voice": voice.speaker,
                "language": voice.language,
                "sample_rate": self.config.sample_rate,
                "response_format": "wav",
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("tts: service error {status}: {body}");
            return Err(Error::Synthesis(format!("{status}: {body}")));
        }

        let bytes = resp.bytes().await?;
        debug!("tts: received {} bytes", bytes.len());
        normalize_wav(bytes.to_vec()).map_err(|e| Error::Synthesis(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    /// Minimal WAV header with streaming sentinel sizes and `n` data bytes.
    fn streamed_wav(n: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&[1, 0, 1, 0]);
        buf.extend_from_slice(&48_000u32.to_le_bytes());
        buf.extend_from_slice(&96_000u32.to_le_bytes());
        buf.extend_from_slice(&[2, 0, 16, 0]);
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.resize(44 + n, 0);
        buf
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn synthesizer(url: String) -> HttpSynthesizer {
        HttpSynthesizer::new(
            TtsConfig {
                url,
                ..Default::default()
            },
            VoiceCatalog::builtin(),
        )
    }

    #[tokio::test]
    async fn posts_request_and_patches_wav() {
        let seen = Arc::new(Mutex::new(None));
        let router = Router::new()
            .route(
                "/v1/audio/speech",
                post(
                    |State(seen): State<Arc<Mutex<Option<serde_json::Value>>>>,
                     Json(body): Json<serde_json::Value>| async move {
                        *seen.lock().unwrap() = Some(body);
                        streamed_wav(100)
                    },
                ),
            )
            .with_state(seen.clone());
        let url = serve(router).await;

        let wav = synthesizer(url)
            .synthesize("Привет! ", &Voice::new("ru", "baya"))
            .await
            .unwrap();
        assert_eq!(wav.len(), 144);
        assert_eq!(&wav[4..8], &136u32.to_le_bytes());
        assert_eq!(&wav[40..44], &100u32.to_le_bytes());

        let body = seen.lock().unwrap().take().unwrap();
        assert_eq!(body["input"], "Привет! ");
        assert_eq!(body["model"], "v3_1_ru");
        assert_eq!(body["voice"], "baya");
        assert_eq!(body["language"], "ru");
        assert_eq!(body["sample_rate"], 48_000);
        assert_eq!(body["response_format"], "wav");
    }

    /// Log sink shared with a test subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn request_log_counts_characters() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let router = Router::new().route(
            "/v1/audio/speech",
            post(|| async { streamed_wav(10) }),
        );
        let url = serve(router).await;

        // 8 characters, 14 bytes.
        synthesizer(url)
            .synthesize("Привет! ", &Voice::new("ru", "baya"))
            .await
            .unwrap();

        let logs = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("tts: POST 8 chars (ru/baya)"), "{logs}");
    }

    #[tokio::test]
    async fn service_error_is_synthesis_error() {
        let router = Router::new().route(
            "/v1/audio/speech",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model loading") }),
        );
        let url = serve(router).await;

        let err = synthesizer(url)
            .synthesize("hello", &Voice::new("en", "en_0"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Synthesis(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn non_wav_body_rejected() {
        let router = Router::new().route("/v1/audio/speech", post(|| async { "not audio" }));
        let url = serve(router).await;

        let err = synthesizer(url)
            .synthesize("hello", &Voice::new("en", "en_0"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Synthesis(_)));
    }

    #[tokio::test]
    async fn unknown_language_fails_without_request() {
        // Nothing listens here; the error must come from the catalog lookup.
        let err = synthesizer("http://127.0.0.1:9".into())
            .synthesize("hello", &Voice::new("xx", "nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Synthesis(ref m) if m.contains("xx")));
    }
}
