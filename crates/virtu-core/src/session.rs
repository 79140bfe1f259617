//! Per-connection conversation state.
//!
//! Owned by the connection's task and never shared, so selections made by
//! one client can't leak into another's turns.

use crate::catalog::{AvatarProfile, Catalogs};
use crate::prompt::system_prompt;
use crate::protocol::Control;
use crate::types::{ConversationMessage, Role, Voice};

#[derive(Debug, Clone)]
pub struct Session {
    history: Vec<ConversationMessage>,
    avatar: String,
    llm: String,
    voice: Voice,
}

impl Session {
    /// Fresh session with the catalogs' default selections.
    pub fn new(catalogs: &Catalogs) -> Self {
        Self {
            history: Vec::new(),
            avatar: catalogs.avatars.default_id().to_string(),
            llm: catalogs.llms.default_model().to_string(),
            voice: catalogs.voices.default_voice().clone(),
        }
    }

    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub fn avatar_id(&self) -> &str {
        &self.avatar
    }

    pub fn llm(&self) -> &str {
        &self.llm
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    /// Active avatar profile.
    pub fn profile<'a>(&self, catalogs: &'a Catalogs) -> &'a AvatarProfile {
        catalogs
            .avatars
            .get(&self.avatar)
            .unwrap_or_else(|| catalogs.avatars.default_profile())
    }

    /// Apply a selection. Unknown values leave the session untouched.
    /// Returns whether anything changed.
    pub fn apply(&mut self, control: &Control, catalogs: &Catalogs) -> bool {
        match control {
            Control::Avatar(id) if catalogs.avatars.contains(id) => self.avatar = id.clone(),
            Control::Llm(model) if catalogs.llms.contains(model) => self.llm = model.clone(),
            Control::Voice(voice) if catalogs.voices.contains(voice) => self.voice = voice.clone(),
            _ => return false,
        }
        true
    }

    /// Start a turn: rewrite the system prompt at index 0 for the current
    /// avatar, then append the user's text.
    pub fn begin_turn(&mut self, text: &str, catalogs: &Catalogs) {
        let prompt = system_prompt(self.profile(catalogs));
        match self.history.first_mut() {
            Some(first) if first.role == Role::System => first.content = prompt,
            _ => self.history.insert(0, ConversationMessage::system(prompt)),
        }
        self.history.push(ConversationMessage::user(text));
    }

    /// Archive the cleaned reply of a completed turn.
    pub fn finish_turn(&mut self, reply: String) {
        self.history.push(ConversationMessage::assistant(reply));
    }
}
