//! The signaling message router.
//!
//! Each inbound frame runs Received → Parsed → Dispatched → {Responded,
//! Errored}. Every failure, from malformed JSON to a negotiation fault,
//! becomes exactly one `error` reply to the originating connection; the
//! connection itself is never closed or penalized, so clients can retry.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::message::{SessionDescription, SignalMessage};
use crate::negotiate::Negotiator;
use crate::registry::{ConnectionId, ConnectionRegistry, SignalSink};

/// Failure while handling a single inbound frame.
///
/// `Display` renders the exact error text sent back over the wire.
#[derive(Debug)]
pub enum SignalingError {
    /// The frame is not parseable JSON.
    Malformed(String),
    /// The `type` field is absent or outside the recognized set.
    UnknownType(String),
    /// An offer or answer without a sane SDP payload.
    InvalidSdp,
    /// A missing or falsy ICE candidate payload.
    InvalidCandidate,
    /// The negotiation capability failed while producing an answer.
    Negotiation(String),
}

impl fmt::Display for SignalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalingError::Malformed(text) | SignalingError::Negotiation(text) => {
                write!(f, "{text}")
            }
            SignalingError::UnknownType(kind) => write!(f, "Unknown message type: {kind}"),
            SignalingError::InvalidSdp => write!(f, "Invalid SDP format"),
            SignalingError::InvalidCandidate => write!(f, "Invalid ICE candidate"),
        }
    }
}

impl std::error::Error for SignalingError {}

/// Router plus registry for one server instance.
///
/// The transport layer invokes `on_accept` / `on_message` / `on_close`
/// synchronously; none of them ever fail outward.
pub struct SignalingServer<N> {
    registry: ConnectionRegistry,
    negotiator: N,
}

impl<N: Negotiator> SignalingServer<N> {
    pub fn new(negotiator: N) -> SignalingServer<N> {
        SignalingServer {
            registry: ConnectionRegistry::new(),
            negotiator,
        }
    }

    /// Number of currently tracked connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Registers a freshly accepted connection and greets it with a
    /// `connected` frame carrying its id.
    pub fn on_accept(&mut self, sink: Arc<dyn SignalSink>) -> ConnectionId {
        let id = ConnectionId::next();
        let hello = SignalMessage::Connected { id: id.to_string() };
        Self::send(id, sink.as_ref(), &hello);
        self.registry.insert(id, sink);
        info!("client {} connected ({} active)", id, self.registry.len());
        id
    }

    /// Drops the connection from the registry. Safe to call more than once.
    pub fn on_close(&mut self, id: ConnectionId) {
        if self.registry.remove(id) {
            info!("client {} disconnected ({} active)", id, self.registry.len());
        }
    }

    /// Handles one inbound text frame from `id`, replying on the same
    /// connection when the dispatch produces a response or an error.
    pub fn on_message(&mut self, id: ConnectionId, frame: &str) {
        let reply = match self.dispatch(frame) {
            Ok(reply) => reply,
            Err(e) => {
                debug!("client {}: {}", id, e);
                Some(SignalMessage::Error {
                    error: e.to_string(),
                })
            }
        };

        let Some(reply) = reply else { return };
        match self.registry.get(id) {
            Some(sink) => Self::send(id, sink.as_ref(), &reply),
            None => debug!("client {} gone before reply", id),
        }
    }

    /// Parse and dispatch one frame. `Ok(None)` means the message was valid
    /// but warrants no reply (`answer` and `ice-candidate`).
    fn dispatch(&mut self, frame: &str) -> Result<Option<SignalMessage>, SignalingError> {
        let value: Value =
            serde_json::from_str(frame).map_err(|e| SignalingError::Malformed(e.to_string()))?;

        let kind = value.get("type").cloned().unwrap_or(Value::Null);
        match kind.as_str() {
            Some("offer") => {
                let sdp = valid_sdp(value.get("offer")).ok_or(SignalingError::InvalidSdp)?;
                let answer = self
                    .negotiator
                    .answer(&SessionDescription::offer(sdp))
                    .map_err(|e| SignalingError::Negotiation(e.to_string()))?;
                Ok(Some(SignalMessage::Answer { answer }))
            }
            Some("answer") => {
                // Validated but not forwarded anywhere; the sender learns of
                // acceptance by the absence of an error reply.
                valid_sdp(value.get("answer")).ok_or(SignalingError::InvalidSdp)?;
                Ok(None)
            }
            Some("ice-candidate") => {
                if is_truthy(value.get("candidate")) {
                    Ok(None)
                } else {
                    Err(SignalingError::InvalidCandidate)
                }
            }
            Some(other) => Err(SignalingError::UnknownType(other.to_string())),
            // Missing `type`, or one that isn't a string; echo it as JSON.
            None => Err(SignalingError::UnknownType(kind.to_string())),
        }
    }

    fn send(id: ConnectionId, sink: &dyn SignalSink, message: &SignalMessage) {
        match serde_json::to_string(message) {
            Ok(frame) => {
                if let Err(e) = sink.send(frame) {
                    warn!("client {}: send failed: {}", id, e);
                }
            }
            Err(e) => warn!("client {}: serializing reply failed: {}", id, e),
        }
    }
}

/// Extracts the `sdp` string from a session-description value, requiring the
/// leading version marker. Not a full SDP parse.
fn valid_sdp(desc: Option<&Value>) -> Option<&str> {
    desc?.get("sdp")?.as_str().filter(|s| s.starts_with("v=0"))
}

/// JS-style truthiness for an optional JSON value; an absent field is falsy.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
