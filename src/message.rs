/// Protocol messages exchanged between routers.
///
/// A message is an immutable record placed on the scheduler's pending list.
/// It carries no distance: the receiving handler is given the
/// sender's distance as it stands at delivery time, not at send time.

use crate::node::NodeId;
use crate::round::Round;

// ── Message ID ────────────────────────────────────────────────────────

/// A strictly increasing message identifier; reflects enqueue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageId(u64);

impl MessageId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        MessageId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M#{}", self.0)
    }
}

/// Deterministic message-id generator. One per scheduler.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageIdGen {
    next: u64,
}

impl MessageIdGen {
    pub fn new() -> Self {
        MessageIdGen { next: 0 }
    }

    pub fn next_id(&mut self) -> MessageId {
        let id = MessageId(self.next);
        self.next += 1;
        id
    }
}

// ── Message kind ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    /// "My distance changed."
    Update,
    /// "I am recomputing; tell me your distance."
    Query,
    /// Answer to a query.
    Reply,
}

impl MessageKind {
    /// Display precedence for presentation layers. Delivery order is
    /// always enqueue order; this value never influences it.
    pub fn priority(self) -> u8 {
        match self {
            MessageKind::Update => 0,
            MessageKind::Query => 1,
            MessageKind::Reply => 2,
        }
    }

    /// One-letter tag used in router logs ("U=5", "Q=inf", "R=7").
    pub fn tag(self) -> char {
        match self {
            MessageKind::Update => 'U',
            MessageKind::Query => 'Q',
            MessageKind::Reply => 'R',
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Update => f.write_str("Update"),
            MessageKind::Query => f.write_str("Query"),
            MessageKind::Reply => f.write_str("Reply"),
        }
    }
}

// ── Message ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub from: NodeId,
    pub to: NodeId,
    /// Round during which the message was enqueued.
    pub sent_in: Round,
}

impl Message {
    pub fn new(id: MessageId, kind: MessageKind, from: NodeId, to: NodeId, sent_in: Round) -> Self {
        Message {
            id,
            kind,
            from,
            to,
            sent_in,
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({} → {})", self.kind, self.from, self.to)
    }
}
