//! Message Types for Channel Subscriptions
//!
//! Channel names and payloads are opaque, binary-safe values. Both are backed
//! by [`Bytes`] so cloning a message never copies its payload.

use bytes::Bytes;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// How a subscription matches published channel names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ChannelKind {
    /// Matches a single channel by exact name
    Literal,
    /// Matches any channel whose name satisfies a glob-style pattern
    Pattern,
}

/// Immutable identifier of a subscribed channel or channel pattern
///
/// Identifiers compare by value: two identifiers are equal when both the
/// name bytes and the kind are equal.
///
/// # Example
///
/// ```rust
/// use subqueue::queue::ChannelIdentifier;
///
/// let news = ChannelIdentifier::literal("news");
/// let all_news = ChannelIdentifier::pattern("news.*");
///
/// assert_eq!(news, ChannelIdentifier::from("news"));
/// assert!(all_news.is_pattern());
/// assert_eq!(news.to_string(), "news");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ChannelIdentifier {
    name: Bytes,
    kind: ChannelKind,
}

impl ChannelIdentifier {
    pub fn literal(name: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Literal,
        }
    }

    pub fn pattern(name: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Pattern,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn is_pattern(&self) -> bool {
        self.kind == ChannelKind::Pattern
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.name
    }

    /// Channel name as text, replacing invalid UTF-8 sequences
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

impl From<&str> for ChannelIdentifier {
    fn from(name: &str) -> Self {
        Self::literal(Bytes::copy_from_slice(name.as_bytes()))
    }
}

impl From<String> for ChannelIdentifier {
    fn from(name: String) -> Self {
        Self::literal(name)
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.name))
    }
}

impl fmt::Debug for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.kind, String::from_utf8_lossy(&self.name))
    }
}

/// Binary-safe message payload
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Payload(Bytes);

impl Payload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<&str> for Payload {
    fn from(data: &str) -> Self {
        Self(Bytes::copy_from_slice(data.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(data: String) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

/// A message delivered through a channel subscription
///
/// `channel` is the channel the message was actually published on. Under a
/// pattern subscription it differs from the subscription channel, which is
/// kept as a weak back-reference to the queue that received the message.
///
/// Equality and hashing only consider the actual channel and the payload.
///
/// # Example
///
/// ```rust
/// use subqueue::queue::Message;
///
/// let message = Message::new("news", "hello");
/// assert_eq!(message.to_string(), "news:hello");
/// assert_eq!(message, Message::new("news", "hello"));
/// ```
#[derive(Clone)]
pub struct Message {
    subscription: Weak<ChannelIdentifier>,
    channel: ChannelIdentifier,
    payload: Payload,
}

impl Message {
    /// Create a message that is not attached to any subscription
    pub fn new(channel: impl Into<ChannelIdentifier>, payload: impl Into<Payload>) -> Self {
        Self {
            subscription: Weak::new(),
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    pub(crate) fn delivered(
        subscription: &Arc<ChannelIdentifier>,
        channel: ChannelIdentifier,
        payload: Payload,
    ) -> Self {
        Self {
            subscription: Arc::downgrade(subscription),
            channel,
            payload,
        }
    }

    /// The channel or pattern of the subscription that received this message
    ///
    /// Returns `None` for detached messages or once the receiving queue is gone.
    pub fn subscription_channel(&self) -> Option<ChannelIdentifier> {
        self.subscription.upgrade().map(|channel| (*channel).clone())
    }

    pub fn channel(&self) -> &ChannelIdentifier {
        &self.channel
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_parts(self) -> (ChannelIdentifier, Payload) {
        (self.channel, self.payload)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.channel == other.channel && self.payload == other.payload
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.channel.hash(state);
        self.payload.hash(state);
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.payload)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("channel", &self.channel)
            .field("payload", &self.payload)
            .finish()
    }
}
