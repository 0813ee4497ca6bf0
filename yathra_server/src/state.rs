use std::sync::Arc;
use yathra_conversation::ConversationManager;
use yathra_session::SessionStore;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<ConversationManager>,
}

impl AppState {
    #[must_use]
    pub const fn new(conversations: Arc<ConversationManager>) -> Self {
        Self { conversations }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        self.conversations.store()
    }
}
