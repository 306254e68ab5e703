use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Sliding window over the most recent turns. Older turns are dropped, not
/// summarized, so they never leak into retrieval or generation.
#[derive(Debug, Clone, Copy)]
pub struct ContextManager {
    max_turns: usize,
}

impl ContextManager {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn condense(&self, history: &[ConversationTurn]) -> Vec<ConversationTurn> {
        condense(history, self.max_turns)
    }
}

pub fn condense(history: &[ConversationTurn], max_turns: usize) -> Vec<ConversationTurn> {
    let start = history.len().saturating_sub(max_turns);
    history[start..].to_vec()
}
