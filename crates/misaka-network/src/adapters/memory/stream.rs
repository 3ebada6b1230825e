//! Bounded message log of one stream.

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use tokio::time::Instant;

use super::consumer::DurableConsumer;
use crate::domain::StreamSpec;

#[derive(Debug, Clone)]
pub(crate) struct StoredMessage {
    pub sequence: u64,
    pub subject: String,
    pub payload: Bytes,
    pub stored_at: Instant,
}

impl StoredMessage {
    fn size(&self) -> u64 {
        (self.subject.len() + self.payload.len()) as u64
    }
}

/// Contiguous run of sequences. Only the oldest end is ever trimmed.
#[derive(Debug, Default)]
pub(crate) struct MessageLog {
    messages: VecDeque<StoredMessage>,
    last_sequence: u64,
    bytes: u64,
}

impl MessageLog {
    pub fn append(&mut self, subject: &str, payload: Bytes, now: Instant) -> u64 {
        self.last_sequence += 1;
        let message = StoredMessage {
            sequence: self.last_sequence,
            subject: subject.to_string(),
            payload,
            stored_at: now,
        };
        self.bytes += message.size();
        self.messages.push_back(message);
        self.last_sequence
    }

    /// Discard from the oldest end until every limit holds.
    pub fn enforce_limits(&mut self, spec: &StreamSpec, now: Instant) {
        if !spec.max_age.is_zero() {
            while self
                .messages
                .front()
                .is_some_and(|m| now.duration_since(m.stored_at) >= spec.max_age)
            {
                self.pop_oldest();
            }
        }
        if spec.max_messages > 0 {
            while self.messages.len() as u64 > spec.max_messages as u64 {
                self.pop_oldest();
            }
        }
        if spec.max_bytes > 0 {
            while self.bytes > spec.max_bytes as u64 {
                self.pop_oldest();
            }
        }
    }

    fn pop_oldest(&mut self) {
        if let Some(message) = self.messages.pop_front() {
            self.bytes -= message.size();
        }
    }

    pub fn get(&self, sequence: u64) -> Option<&StoredMessage> {
        let first = self.messages.front()?.sequence;
        let index = usize::try_from(sequence.checked_sub(first)?).ok()?;
        self.messages.get(index)
    }

    /// Oldest retained sequence, or the next one to be assigned when empty.
    pub fn first_sequence(&self) -> u64 {
        self.messages
            .front()
            .map_or(self.last_sequence + 1, |m| m.sequence)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

pub(crate) struct StoredStream {
    pub spec: StreamSpec,
    pub log: MessageLog,
    pub consumers: HashMap<String, DurableConsumer>,
}

impl StoredStream {
    pub fn new(spec: StreamSpec) -> Self {
        Self {
            spec,
            log: MessageLog::default(),
            consumers: HashMap::new(),
        }
    }

    pub fn append(&mut self, subject: &str, payload: Bytes, now: Instant) -> u64 {
        let sequence = self.log.append(subject, payload, now);
        self.log.enforce_limits(&self.spec, now);
        for consumer in self.consumers.values() {
            consumer.wake();
        }
        sequence
    }

    pub fn info(&self) -> StreamInfo {
        StreamInfo {
            name: self.spec.name.clone(),
            subjects: self.spec.subjects.clone(),
            messages: self.log.len() as u64,
            bytes: self.log.bytes(),
            first_sequence: self.log.first_sequence(),
            last_sequence: self.log.last_sequence(),
            consumers: self.consumers.len(),
        }
    }
}

/// Snapshot of a stream's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub name: String,
    pub subjects: Vec<String>,
    pub messages: u64,
    pub bytes: u64,
    pub first_sequence: u64,
    pub last_sequence: u64,
    pub consumers: usize,
}
