//! Wire protocol for the signaling relay.
//!
//! Every frame is a JSON object tagged by a `type` field. The server emits
//! `connected`, `answer` and `error` frames; clients send `offer`, `answer`
//! and `ice-candidate`. Candidate payloads are opaque to the relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An SDP session description as carried in `offer` and `answer` frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// "offer" or "answer".
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> SessionDescription {
        SessionDescription {
            kind: "offer".to_string(),
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> SessionDescription {
        SessionDescription {
            kind: "answer".to_string(),
            sdp: sdp.into(),
        }
    }
}

/// A signaling frame. The serde tag maps each variant to its kebab-cased
/// `type` value on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalMessage {
    /// One-way server greeting carrying the connection id.
    Connected { id: String },
    Offer { offer: SessionDescription },
    Answer { answer: SessionDescription },
    IceCandidate { candidate: Value },
    /// Reply sent whenever handling an inbound frame fails.
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connected_frame_shape() {
        let frame = SignalMessage::Connected {
            id: "7".to_string(),
        };
        let json: Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json, json!({ "type": "connected", "id": "7" }));
    }

    #[test]
    fn ice_candidate_tag_is_kebab_cased() {
        let frame = SignalMessage::IceCandidate {
            candidate: json!({ "candidate": "candidate:0 1 UDP 2122194687 10.0.0.2 50000 typ host" }),
        };
        let json: Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "ice-candidate");
        assert!(json["candidate"]["candidate"].is_string());
    }

    #[test]
    fn answer_frame_round_trips() {
        let frame = SignalMessage::Answer {
            answer: SessionDescription::answer("v=0\r\ns=-\r\n"),
        };
        let text = serde_json::to_string(&frame).unwrap();
        let back: SignalMessage = serde_json::from_str(&text).unwrap();
        match back {
            SignalMessage::Answer { answer } => {
                assert_eq!(answer.kind, "answer");
                assert!(answer.sdp.starts_with("v=0"));
            }
            other => panic!("expected answer frame, got {other:?}"),
        }
    }
}
