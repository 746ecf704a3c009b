use crate::model::{Message, MessageRole};

const CONTEXT_PREFIX: &str = "Context: ";

/// Ordered, append-only transcript sent as context on every request.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the transcript with the persona prompt and the free-form context,
    /// skipping whichever is blank.
    pub fn seeded(system_prompt: &str, context: &str) -> Self {
        let mut conversation = Self::new();
        if !system_prompt.trim().is_empty() {
            conversation.append(Message::system(system_prompt));
        }
        if !context.trim().is_empty() {
            conversation.append(Message::system(format!("{CONTEXT_PREFIX}{context}")));
        }
        conversation
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|msg| msg.role == MessageRole::Assistant)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
