use crate::types::*;
use parking_lot::Mutex;
use std::collections::VecDeque;

struct LedgerState {
    entries: VecDeque<Command>,
    next_id: u64,
}

/// Capped, ordered log of accepted commands.
///
/// Ids come from a counter that only moves forward: eviction and `clear`
/// never cause an id to be handed out twice.
pub struct CommandLedger {
    state: Mutex<LedgerState>,
}

impl CommandLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                entries: VecDeque::new(),
                next_id: 1,
            }),
        }
    }

    /// Record a command and return its id, or `None` when history is disabled.
    pub fn append(&self, draft: CommandDraft, preferences: &Preferences) -> Option<u64> {
        if !preferences.history_enabled {
            return None;
        }

        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;

        state.entries.push_back(Command {
            id,
            created_at: chrono::Utc::now(),
            user_prompt: draft.user_prompt,
            execution_code: draft.execution_code,
            undo_code: draft.undo_code,
            image_context: draft.image_context,
            status: CommandStatus::Executed,
        });

        let cap = preferences.max_history_length.max(1);
        while state.entries.len() > cap {
            if let Some(evicted) = state.entries.pop_front() {
                tracing::debug!("Evicted command {} from history", evicted.id);
            }
        }

        Some(id)
    }

    pub fn get(&self, id: u64) -> Option<Command> {
        self.state.lock().entries.iter().find(|c| c.id == id).cloned()
    }

    /// Drop every entry. The id counter keeps its position.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        removed
    }

    /// Evict from the front until at most `max_len` entries remain.
    pub fn enforce_cap(&self, max_len: usize) -> usize {
        let mut state = self.state.lock();
        let cap = max_len.max(1);
        let mut evicted = 0;
        while state.entries.len() > cap {
            state.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Entries in insertion order.
    pub fn snapshot(&self) -> Vec<Command> {
        self.state.lock().entries.iter().cloned().collect()
    }

    /// Up to `count` entries, most recent first.
    pub fn recent(&self, count: usize) -> Vec<Command> {
        self.state
            .lock()
            .entries
            .iter()
            .rev()
            .take(count)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}

impl Default for CommandLedger {
    fn default() -> Self {
        Self::new()
    }
}
