use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::NodeId;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// A message travelling hop-by-hop toward the sink.
///
/// The payload is opaque to every relay. The trace lists every node that has
/// handled the message so far, starting with the origin; the sink uses it to
/// report the path the message actually took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshMessage {
    /// Unique identifier (UUID v7, timestamp-based).
    pub id: uuid::Uuid,
    /// Envelope format version.
    pub version: u8,
    /// Node that created the message.
    pub origin: NodeId,
    /// Sink the message is destined for.
    pub sink: NodeId,
    /// Nodes that have handled the message, in order.
    pub trace: Vec<NodeId>,
    /// Creation timestamp (Unix milliseconds).
    pub timestamp: u64,
    /// Application payload.
    pub payload: Bytes,
}

impl MeshMessage {
    /// Create a new message originating at `origin`.
    pub fn new(origin: NodeId, sink: NodeId, payload: impl Into<Bytes>) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            version: ENVELOPE_VERSION,
            origin,
            sink,
            trace: vec![origin],
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            payload: payload.into(),
        }
    }

    /// Validate the envelope.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.version == 0 {
            return Err(CoreError::ValidationError(
                "version must be greater than zero".into(),
            ));
        }
        if self.version > ENVELOPE_VERSION {
            return Err(CoreError::ValidationError(format!(
                "unsupported envelope version {}",
                self.version
            )));
        }
        match self.trace.first() {
            None => return Err(CoreError::MissingField("trace".into())),
            Some(first) if *first != self.origin => {
                return Err(CoreError::ValidationError(
                    "trace must start at the origin".into(),
                ));
            }
            Some(_) => {}
        }
        if self.timestamp == 0 {
            return Err(CoreError::MissingField("timestamp".into()));
        }
        Ok(())
    }

    /// Append `node` to the trace, unless it is already the last entry.
    pub fn record_hop(&mut self, node: NodeId) {
        if self.trace.last() != Some(&node) {
            self.trace.push(node);
        }
    }

    /// Number of links the message has crossed so far.
    pub fn hops_travelled(&self) -> usize {
        self.trace.len().saturating_sub(1)
    }

    /// Payload interpreted as UTF-8, lossily.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Render the trace as `a -> b -> c`.
    pub fn trace_display(&self) -> String {
        self.trace
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Encode for the wire.
    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from the wire and validate.
    pub fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        let msg: MeshMessage = serde_json::from_slice(bytes)?;
        msg.validate()?;
        Ok(msg)
    }
}
