//! Conversation memory held by an agent instance.

use super::spec::MemoryKind;
use crate::provider::ChatMessage;
use parking_lot::Mutex;

/// Memory backing one agent instance.
///
/// Runs read a snapshot at start and commit their whole turn at the end, so a
/// run that is dropped midway leaves the transcript untouched.
pub enum Memory {
    None,
    Transcript(Mutex<Vec<ChatMessage>>),
}

impl Memory {
    pub fn for_kind(kind: MemoryKind) -> Self {
        match kind {
            MemoryKind::None => Memory::None,
            MemoryKind::InMemoryTranscript => Memory::Transcript(Mutex::new(Vec::new())),
        }
    }

    pub fn kind(&self) -> MemoryKind {
        match self {
            Memory::None => MemoryKind::None,
            Memory::Transcript(_) => MemoryKind::InMemoryTranscript,
        }
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        match self {
            Memory::None => Vec::new(),
            Memory::Transcript(messages) => messages.lock().clone(),
        }
    }

    /// Append a completed turn.
    pub fn commit(&self, turn: Vec<ChatMessage>) {
        if let Memory::Transcript(messages) = self {
            messages.lock().extend(turn);
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Memory::None => 0,
            Memory::Transcript(messages) => messages.lock().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Memory::Transcript(messages) = self {
            messages.lock().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_accumulates_turns() {
        let memory = Memory::for_kind(MemoryKind::InMemoryTranscript);
        memory.commit(vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")]);
        memory.commit(vec![ChatMessage::user("again")]);
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.snapshot()[2].content, "again");
        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn none_discards_turns() {
        let memory = Memory::for_kind(MemoryKind::None);
        memory.commit(vec![ChatMessage::user("hi")]);
        assert!(memory.is_empty());
        assert!(memory.snapshot().is_empty());
        assert_eq!(memory.kind(), MemoryKind::None);
    }
}
