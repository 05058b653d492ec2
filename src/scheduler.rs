/// Round-based message scheduler.
///
/// Holds a single pending list. A round starts by taking the whole list
/// out at once; anything enqueued while that batch is being delivered
/// lands in the fresh list and therefore in the next round. Delivery order
/// within a round is enqueue order.

use crate::message::{Message, MessageId, MessageIdGen, MessageKind};
use crate::node::NodeId;
use crate::round::Round;

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    pending: Vec<Message>,
    id_gen: MessageIdGen,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            pending: Vec::new(),
            id_gen: MessageIdGen::new(),
        }
    }

    /// Append a message for the next round.
    pub fn enqueue(&mut self, kind: MessageKind, from: NodeId, to: NodeId, sent_in: Round) -> MessageId {
        let id = self.id_gen.next_id();
        self.pending.push(Message::new(id, kind, from, to, sent_in));
        id
    }

    /// Take the whole pending list, leaving an empty one behind.
    pub fn take_round(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.pending)
    }

    /// Messages waiting for the next round, in delivery order.
    pub fn pending(&self) -> &[Message] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
