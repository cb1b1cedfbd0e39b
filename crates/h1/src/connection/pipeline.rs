use std::collections::VecDeque;

use crate::ensure;
use crate::protocol::WriteError;

/// FIFO of exchange sequence numbers awaiting their response.
///
/// The queue only orders exchanges; their state lives with the connection. Sequence numbers
/// are handed out in arrival order and never reused on a connection.
#[derive(Debug, Default)]
pub struct PipelineQueue {
    queue: VecDeque<u64>,
    next_seq: u64,
}

impl PipelineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a new exchange and returns its sequence number.
    pub fn push(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back(seq);
        seq
    }

    /// The exchange whose response is due.
    pub fn front(&self) -> Option<u64> {
        self.queue.front().copied()
    }

    pub fn contains(&self, seq: u64) -> bool {
        self.queue.contains(&seq)
    }

    /// Checks that `seq` is allowed to write now.
    ///
    /// Only the front exchange may write; a later one is an [`WriteError::OutOfOrderWrite`],
    /// an unknown or already completed one an [`WriteError::InvalidWriteState`].
    pub fn check_turn(&self, seq: u64) -> Result<(), WriteError> {
        let Some(expected) = self.front() else {
            return Err(WriteError::invalid_write_state(format!("no exchange {seq} is awaiting a response")));
        };
        ensure!(self.contains(seq), WriteError::invalid_write_state(format!("no exchange {seq} is awaiting a response")));
        ensure!(seq == expected, WriteError::out_of_order(seq, expected));
        Ok(())
    }

    /// Removes the front exchange once its response is complete.
    pub fn complete(&mut self, seq: u64) -> Result<(), WriteError> {
        self.check_turn(seq)?;
        self.queue.pop_front();
        Ok(())
    }

    /// Sequence numbers still queued, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.queue.iter().copied()
    }

    pub fn pop_front(&mut self) -> Option<u64> {
        self.queue.pop_front()
    }

    /// Drops the most recent exchange if it is `seq`.
    pub fn discard(&mut self, seq: u64) -> bool {
        if self.queue.back() == Some(&seq) {
            self.queue.pop_back();
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
