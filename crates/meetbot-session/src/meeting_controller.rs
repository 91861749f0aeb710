//! The surface a meeting-platform backend (browser automation, SIP
//! bridge, a native conferencing SDK) must implement to host a session.
//! Every method may fail with `ProviderNotSupported` when the concrete
//! backend has no equivalent capability (e.g. a SIP bridge has no chat).

use async_trait::async_trait;
use meetbot_foundation::error::MeetbotResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub is_muted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
}

#[async_trait]
pub trait MeetingController: Send + Sync {
    async fn join(&self, url: &str, name: &str, passcode: Option<&str>) -> MeetbotResult<()>;

    async fn leave(&self) -> MeetbotResult<()>;

    async fn send_chat_message(&self, text: &str) -> MeetbotResult<()>;

    async fn get_chat_history(&self) -> MeetbotResult<Vec<ChatMessage>> {
        Err(meetbot_foundation::error::MeetbotError::ProviderNotSupported(
            "chat history".to_string(),
        ))
    }

    async fn get_participants(&self) -> MeetbotResult<Vec<Participant>> {
        Err(meetbot_foundation::error::MeetbotError::ProviderNotSupported(
            "participant roster".to_string(),
        ))
    }

    async fn mute(&self) -> MeetbotResult<()> {
        Err(meetbot_foundation::error::MeetbotError::ProviderNotSupported(
            "mute".to_string(),
        ))
    }

    async fn unmute(&self) -> MeetbotResult<()> {
        Err(meetbot_foundation::error::MeetbotError::ProviderNotSupported(
            "unmute".to_string(),
        ))
    }
}
