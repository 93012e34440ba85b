// In-process conversation windows, one bounded queue per user. Not persisted.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const MAX_HISTORY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

#[derive(Default)]
pub struct SessionMap {
    histories: Mutex<HashMap<String, VecDeque<Turn>>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, evicting the oldest once the window is full
    pub fn push(&self, user_id: &str, role: Role, content: &str) {
        let mut histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        let history = histories.entry(user_id.to_string()).or_default();
        history.push_back(Turn { role, content: content.to_string() });
        while history.len() > MAX_HISTORY {
            history.pop_front();
        }
    }

    /// Up to `limit` most recent turns, oldest first
    pub fn recent(&self, user_id: &str, limit: usize) -> Vec<Turn> {
        let histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        histories
            .get(user_id)
            .map(|history| {
                let skip = history.len().saturating_sub(limit);
                history.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Returns false when the user has no history
    pub fn clear(&self, user_id: &str) -> bool {
        let mut histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        match histories.get_mut(user_id) {
            Some(history) => {
                history.clear();
                true
            }
            None => false,
        }
    }

    pub fn users(&self) -> Vec<String> {
        let histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        let mut users: Vec<String> = histories.keys().cloned().collect();
        users.sort();
        users
    }

    pub fn user_count(&self) -> usize {
        self.histories.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
