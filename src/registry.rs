//! Desired vs confirmed subscription state.
//!
//! The registry is consulted by the session, never the other way around:
//! it holds the bootstrap set replayed on every connect, and the set of
//! topics whose subscription the server has actually confirmed. `active`
//! changes only when an operation resolves successfully, never
//! speculatively at issue time.

use std::collections::BTreeSet;

use pubsub_proto::Topic;

use crate::correlation::OperationKind;

pub(crate) struct TopicRegistry {
    initial: Vec<Topic>,
    active: BTreeSet<String>,
}

impl TopicRegistry {
    pub fn new(initial: Vec<Topic>) -> Self {
        Self {
            initial,
            active: BTreeSet::new(),
        }
    }

    /// The bootstrap set, replayed on every successful connect.
    pub fn initial(&self) -> &[Topic] {
        &self.initial
    }

    /// Apply a successfully resolved operation.
    ///
    /// Unlisten removes every listed topic whether or not it was confirmed
    /// active before; removal is idempotent.
    pub fn confirm(&mut self, kind: OperationKind, topics: &[Topic]) {
        match kind {
            OperationKind::Listen => {
                for topic in topics {
                    self.active.insert(topic.name().to_string());
                }
            }
            OperationKind::Unlisten => {
                for topic in topics {
                    self.active.remove(topic.name());
                }
            }
        }
    }

    /// Confirmed-active topic names, sorted.
    pub fn snapshot(&self) -> Vec<String> {
        self.active.iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }
}
