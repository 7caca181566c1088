//! In-memory message queue.

use crate::core::Record;
use crate::errors::AdminError;
use crate::resources::QueueAdmin;
use async_trait::async_trait;
use dashmap::DashMap;

/// Topics as append-only logs.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    topics: DashMap<String, Vec<Record>>,
}

impl InMemoryQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to a topic.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the topic does not exist.
    pub fn publish(&self, topic: &str, message: Record) -> Result<(), AdminError> {
        let mut log = self.topics.get_mut(topic).ok_or(AdminError::NotFound)?;
        log.push(message);
        Ok(())
    }

    /// Returns every message at or after `offset`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the topic does not exist.
    pub fn read_from(&self, topic: &str, offset: usize) -> Result<Vec<Record>, AdminError> {
        let log = self.topics.get(topic).ok_or(AdminError::NotFound)?;
        Ok(log.iter().skip(offset).cloned().collect())
    }

    /// Returns true if the topic exists.
    #[must_use]
    pub fn topic_exists(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Returns the number of messages in a topic.
    #[must_use]
    pub fn topic_len(&self, topic: &str) -> Option<usize> {
        self.topics.get(topic).map(|log| log.len())
    }
}

#[async_trait]
impl QueueAdmin for InMemoryQueue {
    async fn create_topic(&self, name: &str) -> Result<(), AdminError> {
        if self.topics.contains_key(name) {
            return Err(AdminError::AlreadyExists);
        }
        self.topics.insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn delete_topic(&self, name: &str) -> Result<(), AdminError> {
        self.topics
            .remove(name)
            .map(|_| ())
            .ok_or(AdminError::NotFound)
    }
}
