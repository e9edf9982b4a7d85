use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::Address;

/// Logical channel a message travels on.
///
/// Tags let several request/response streams share one transport; receivers
/// match on the tag and, optionally, the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(pub u16);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag:{}", self.0)
    }
}

/// Message body carried between participants.
///
/// The payload is MessagePack-encoded. `correlation_id` ties a reply to the
/// request it answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Channel this message belongs to.
    pub tag: Tag,

    /// MessagePack-encoded payload bytes.
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,

    /// When this message was created.
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for request-response tracking.
    pub correlation_id: Uuid,

    /// Schema version for forward-compatible evolution.
    #[serde(default = "default_version")]
    pub version: u16,
}

fn default_version() -> u16 {
    1
}

impl Message {
    /// Create a new message, serializing the payload with MessagePack.
    pub fn new<T: Serialize>(tag: Tag, payload: &T) -> Result<Self, rmp_serde::encode::Error> {
        Self::with_correlation(tag, payload, Uuid::new_v4())
    }

    /// Create a message with an explicit correlation ID (for replies).
    pub fn with_correlation<T: Serialize>(
        tag: Tag,
        payload: &T,
        correlation_id: Uuid,
    ) -> Result<Self, rmp_serde::encode::Error> {
        Ok(Self {
            tag,
            payload: rmp_serde::to_vec(payload)?,
            timestamp: Utc::now(),
            correlation_id,
            version: 1,
        })
    }

    /// Deserialize the payload into the expected type.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, rmp_serde::decode::Error> {
        rmp_serde::from_slice(&self.payload)
    }
}

/// A message plus its routing header, as stored in mailboxes and sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub source: Address,
    pub dest: Address,
    pub message: Message,
}

impl Envelope {
    pub fn new(source: Address, dest: Address, message: Message) -> Self {
        Self {
            source,
            dest,
            message,
        }
    }

    pub fn tag(&self) -> Tag {
        self.message.tag
    }

    /// Serialize this envelope to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    /// Deserialize an envelope from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// Helper module for serde to handle `Vec<u8>` as raw bytes in MessagePack.
mod serde_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let bytes: &[u8] = Deserialize::deserialize(d)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PING: Tag = Tag(7);

    #[test]
    fn decode_payload() {
        let msg = Message::new(PING, &vec![3i32, -4, 5]).unwrap();
        assert_eq!(msg.tag, PING);
        assert_eq!(msg.decode::<Vec<i32>>().unwrap(), vec![3, -4, 5]);
    }

    #[test]
    fn envelope_survives_wire_encoding() {
        let msg = Message::new(PING, &Some(42u64)).unwrap();
        let env = Envelope::new(Address(2), Address::COORDINATOR, msg);
        let decoded = Envelope::from_bytes(&env.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded.source, Address(2));
        assert_eq!(decoded.dest, Address::COORDINATOR);
        assert_eq!(decoded.tag(), PING);
        assert_eq!(decoded.message.correlation_id, env.message.correlation_id);
        assert_eq!(decoded.message.decode::<Option<u64>>().unwrap(), Some(42));
    }

    #[test]
    fn with_correlation_preserves_id() {
        let id = Uuid::new_v4();
        let msg = Message::with_correlation(PING, &true, id).unwrap();
        assert_eq!(msg.correlation_id, id);
    }
}
