//! Static catalogs — avatar profiles, synthesizer voices, and LLM ids.
//!
//! Catalogs are immutable once built and shared read-only between sessions.
//! Every selection a client makes is validated against them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Voice;

/// Emotion name used when an avatar has no expression table.
pub const DEFAULT_EMOTION: &str = "neutral";

/// Avatar selected for new sessions when the catalog contains it.
pub const DEFAULT_AVATAR: &str = "haru";

/// Model ids offered to clients. The first one is the default.
pub const AVAILABLE_LLMS: &[&str] = &[
    "deepseek/deepseek-chat-v3-0324",
    "openai/gpt-5-mini",
    "anthropic/claude-haiku-4.5",
];

const DEFAULT_LANGUAGE: &str = "ru";
const DEFAULT_SPEAKER: &str = "baya";

// ─── Avatars ───────────────────────────────────────────────────────────────

/// A Live2D character and its emotion → pose code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarProfile {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Model asset URL loaded by the browser.
    pub url: String,
    #[serde(default)]
    pub expressions: BTreeMap<String, String>,
}

impl AvatarProfile {
    /// Emotion names valid for a turn with this avatar.
    ///
    /// Never empty: an avatar without expressions accepts [`DEFAULT_EMOTION`].
    pub fn emotions(&self) -> Vec<&str> {
        if self.expressions.is_empty() {
            vec![DEFAULT_EMOTION]
        } else {
            self.expressions.keys().map(String::as_str).collect()
        }
    }
}

/// Avatar profiles keyed by id. Always holds at least one profile.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct AvatarCatalog {
    profiles: BTreeMap<String, AvatarProfile>,
    #[serde(skip)]
    default_id: String,
}

impl AvatarCatalog {
    /// Build a catalog from profiles keyed by id. Each profile's `id` is
    /// overwritten with its key.
    pub fn from_profiles(profiles: BTreeMap<String, AvatarProfile>) -> Result<Self, String> {
        let profiles = assign_ids(profiles);
        let default_id = if profiles.contains_key(DEFAULT_AVATAR) {
            DEFAULT_AVATAR.to_string()
        } else {
            profiles
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| "avatar catalog is empty".to_string())?
        };

        Ok(Self {
            profiles,
            default_id,
        })
    }

    /// Built-in avatars from the pixi-live2d-display sample assets.
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "haru".to_string(),
            profile(
                "Haru",
                "https://cdn.jsdelivr.net/gh/guansss/pixi-live2d-display/test/assets/haru/haru_greeter_t03.model3.json",
                &[
                    ("neutral", "F01"),
                    ("happy", "F02"),
                    ("angry", "F03"),
                    ("sad", "F04"),
                    ("surprised", "F05"),
                    ("embarrassed", "F06"),
                    ("thinking", "F07"),
                    ("excited", "F08"),
                ],
            ),
        );
        profiles.insert(
            "shizuku".to_string(),
            profile(
                "Shizuku",
                "https://cdn.jsdelivr.net/gh/guansss/pixi-live2d-display/test/assets/shizuku/shizuku.model.json",
                &[
                    ("happy", "f01"),
                    ("angry", "f02"),
                    ("sad", "f03"),
                    ("surprised", "f04"),
                ],
            ),
        );
        profiles.insert(
            "hiyori".to_string(),
            profile(
                "Hiyori",
                "https://cdn.jsdelivr.net/gh/Live2D/CubismWebSamples/Samples/Resources/Hiyori/Hiyori.model3.json",
                &[],
            ),
        );

        // Non-empty and contains DEFAULT_AVATAR, so this cannot fail.
        Self {
            profiles: assign_ids(profiles),
            default_id: DEFAULT_AVATAR.to_string(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&AvatarProfile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn default_profile(&self) -> &AvatarProfile {
        &self.profiles[&self.default_id]
    }
}

fn assign_ids(profiles: BTreeMap<String, AvatarProfile>) -> BTreeMap<String, AvatarProfile> {
    profiles
        .into_iter()
        .map(|(id, mut profile)| {
            profile.id = id.clone();
            (id, profile)
        })
        .collect()
}

fn profile(name: &str, url: &str, expressions: &[(&str, &str)]) -> AvatarProfile {
    AvatarProfile {
        id: String::new(),
        name: name.to_string(),
        url: url.to_string(),
        expressions: expressions
            .iter()
            .map(|(emotion, code)| (emotion.to_string(), code.to_string()))
            .collect(),
    }
}

// ─── Voices ────────────────────────────────────────────────────────────────

/// Speakers of one synthesizer language and the model that voices them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceLanguage {
    pub model: String,
    pub speakers: Vec<String>,
}

/// Synthesizer voices keyed by language code.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    languages: BTreeMap<String, VoiceLanguage>,
    default_voice: Voice,
}

impl VoiceCatalog {
    /// The Silero v3 voice set.
    pub fn builtin() -> Self {
        let mut languages = BTreeMap::new();
        languages.insert(
            "ru".to_string(),
            language("v3_1_ru", ["aidar", "baya", "kseniya", "xenia", "eugene"].map(String::from)),
        );
        languages.insert(
            "en".to_string(),
            language("v3_en", (0..=117).map(|i| format!("en_{i}"))),
        );
        languages.insert(
            "de".to_string(),
            language(
                "v3_de",
                ["bernd_ungerer", "eva_k", "friedrich", "hokuspokus", "karlsson"].map(String::from),
            ),
        );
        languages.insert(
            "es".to_string(),
            language("v3_es", (0..3).map(|i| format!("es_{i}"))),
        );
        languages.insert(
            "fr".to_string(),
            language("v3_fr", (0..6).map(|i| format!("fr_{i}"))),
        );

        Self {
            languages,
            default_voice: Voice::new(DEFAULT_LANGUAGE, DEFAULT_SPEAKER),
        }
    }

    /// Whether `voice` names a speaker of one of the catalog's languages.
    pub fn contains(&self, voice: &Voice) -> bool {
        self.languages
            .get(&voice.language)
            .is_some_and(|lang| lang.speakers.iter().any(|s| *s == voice.speaker))
    }

    /// Synthesizer model id for a language.
    pub fn model_for(&self, language: &str) -> Option<&str> {
        self.languages.get(language).map(|lang| lang.model.as_str())
    }

    pub fn default_voice(&self) -> &Voice {
        &self.default_voice
    }

    /// Speakers per language, as listed to clients.
    pub fn available(&self) -> BTreeMap<String, Vec<String>> {
        self.languages
            .iter()
            .map(|(code, lang)| (code.clone(), lang.speakers.clone()))
            .collect()
    }
}

fn language(model: &str, speakers: impl IntoIterator<Item = String>) -> VoiceLanguage {
    VoiceLanguage {
        model: model.to_string(),
        speakers: speakers.into_iter().collect(),
    }
}

// ─── LLMs ──────────────────────────────────────────────────────────────────

/// Completion model ids a session may select.
#[derive(Debug, Clone)]
pub struct LlmCatalog {
    models: Vec<String>,
}

impl LlmCatalog {
    pub fn builtin() -> Self {
        Self {
            models: AVAILABLE_LLMS.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn default_model(&self) -> &str {
        &self.models[0]
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

// ─── Bundle ────────────────────────────────────────────────────────────────

/// Every catalog a session validates against.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub avatars: AvatarCatalog,
    pub voices: VoiceCatalog,
    pub llms: LlmCatalog,
}

impl Default for Catalogs {
    fn default() -> Self {
        Self {
            avatars: AvatarCatalog::builtin(),
            voices: VoiceCatalog::builtin(),
            llms: LlmCatalog::builtin(),
        }
    }
}
