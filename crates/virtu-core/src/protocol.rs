//! WebSocket message shapes.
//!
//! Inbound text frames are either a control message selecting an avatar,
//! model or voice, or user text starting a turn. Anything that is not JSON
//! counts as user text. Outbound frames are small JSON objects plus raw
//! audio.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::Voice;

/// A selection change requested by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Avatar(String),
    Llm(String),
    Voice(Voice),
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Control(Control),
    /// Non-empty user text.
    Turn(String),
    /// Structured but unrecognized, or empty text.
    Ignored,
}

// Variant order decides which key wins when a client sends several.
#[derive(Deserialize)]
#[serde(untagged)]
enum Structured {
    Avatar { model: String },
    Llm { llm: String },
    Voice { voice: Voice },
    Turn { text: String },
}

impl Inbound {
    pub fn parse(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => return Self::turn(raw),
        };

        match value {
            Value::Object(_) => match serde_json::from_value(value) {
                Ok(Structured::Avatar { model }) => Self::Control(Control::Avatar(model)),
                Ok(Structured::Llm { llm }) => Self::Control(Control::Llm(llm)),
                Ok(Structured::Voice { voice }) => Self::Control(Control::Voice(voice)),
                Ok(Structured::Turn { text }) => Self::turn(&text),
                Err(_) => Self::Ignored,
            },
            Value::String(text) => Self::turn(&text),
            // Bare numbers and the like are something the user typed.
            _ => Self::turn(raw),
        }
    }

    fn turn(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            Self::Ignored
        } else {
            Self::Turn(text.to_string())
        }
    }
}

/// Everything the server sends during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Expression(String),
    Text(String),
    Audio(Vec<u8>),
    Done,
}

/// Transport-level frame for an [`Outbound`] message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Outbound {
    pub fn into_frame(self) -> Frame {
        match self {
            Self::Expression(name) => Frame::Text(json!({ "expression": name }).to_string()),
            Self::Text(text) => Frame::Text(json!({ "text": text }).to_string()),
            Self::Audio(bytes) => Frame::Binary(bytes),
            Self::Done => Frame::Text(json!({ "done": true }).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_control_messages() {
        assert_eq!(
            Inbound::parse(r#"{"model": "shizuku"}"#),
            Inbound::Control(Control::Avatar("shizuku".into()))
        );
        assert_eq!(
            Inbound::parse(r#"{"llm": "openai/gpt-5-mini"}"#),
            Inbound::Control(Control::Llm("openai/gpt-5-mini".into()))
        );
        assert_eq!(
            Inbound::parse(r#"{"voice": {"language": "en", "speaker": "en_3"}}"#),
            Inbound::Control(Control::Voice(Voice::new("en", "en_3")))
        );
    }

    #[test]
    fn parses_turn_text() {
        assert_eq!(
            Inbound::parse(r#"{"text": "  hello  "}"#),
            Inbound::Turn("hello".into())
        );
        assert_eq!(Inbound::parse(r#""quoted""#), Inbound::Turn("quoted".into()));
    }

    #[test]
    fn plain_text_is_a_turn() {
        assert_eq!(Inbound::parse("How are you?"), Inbound::Turn("How are you?".into()));
        assert_eq!(Inbound::parse("{broken json"), Inbound::Turn("{broken json".into()));
        assert_eq!(Inbound::parse("42"), Inbound::Turn("42".into()));
    }

    #[test]
    fn empty_or_unknown_is_ignored() {
        assert_eq!(Inbound::parse(""), Inbound::Ignored);
        assert_eq!(Inbound::parse("   "), Inbound::Ignored);
        assert_eq!(Inbound::parse(r#"{"text": ""}"#), Inbound::Ignored);
        assert_eq!(Inbound::parse(r#"{"foo": 1}"#), Inbound::Ignored);
        assert_eq!(Inbound::parse(r#"{"voice": "en"}"#), Inbound::Ignored);
    }

    #[test]
    fn outbound_frames() {
        assert_eq!(
            Outbound::Expression("happy".into()).into_frame(),
            Frame::Text(r#"{"expression":"happy"}"#.into())
        );
        assert_eq!(
            Outbound::Text("Hi.".into()).into_frame(),
            Frame::Text(r#"{"text":"Hi."}"#.into())
        );
        assert_eq!(Outbound::Done.into_frame(), Frame::Text(r#"{"done":true}"#.into()));
        assert_eq!(Outbound::Audio(vec![1, 2]).into_frame(), Frame::Binary(vec![1, 2]));
    }
}
