use std::collections::VecDeque;

pub const CHAT_CAPACITY: usize = 10;
pub const CHAT_LIFETIME: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub sender: String,
    pub text: String,
    pub age: f32,
}

/// Recent chat lines, newest first.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
}

impl ChatLog {
    pub fn push(&mut self, sender: &str, text: &str) {
        if self.entries.len() >= CHAT_CAPACITY {
            self.entries.pop_back();
        }
        self.entries.push_front(ChatEntry {
            sender: sender.to_string(),
            text: text.to_string(),
            age: 0.0,
        });
    }

    pub fn tick(&mut self, dt: f32) {
        for entry in &mut self.entries {
            entry.age += dt;
        }
        self.entries.retain(|entry| entry.age < CHAT_LIFETIME);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
