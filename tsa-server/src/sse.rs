//! `/api/rag-chat` SSE frame types.
//!
//! Every frame is `data: {json}\n\n`. A stream is always
//! `sources (token)* (done | error)` — `sources` is emitted before the
//! first token, and the stream ends with exactly one terminal frame.

use axum::response::sse::Event;
use serde::Serialize;
use tsa_core::domain::SearchMethod;
use tsa_core::ids::MessageId;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatFrame {
    Sources { sources: Vec<String>, confidence: f32, method: SearchMethod },
    Token { token: String },
    Done {
        #[serde(rename = "messageId")]
        message_id: MessageId,
    },
    Error { code: &'static str, message: String },
}

impl ChatFrame {
    pub fn into_event(self) -> Event {
        // `serde_json::to_string` on these leaf types never fails.
        Event::default().data(serde_json::to_string(&self).expect("ChatFrame serializes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_frame_serializes_with_tagged_type() {
        let frame = ChatFrame::Sources { sources: vec!["doc-1".into()], confidence: 0.9, method: SearchMethod::Hybrid };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"sources\""));
        assert!(json.contains("\"method\":\"hybrid\""));
    }

    #[test]
    fn done_frame_carries_message_id() {
        let frame = ChatFrame::Done { message_id: MessageId::new() };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"type\":\"done\""));
    }
}
