use async_trait::async_trait;
use thiserror::Error;

/// Error descriptions meaning the chat can never be reached again.
const UNREACHABLE_MARKERS: &[&str] = &[
    "bot was blocked by the user",
    "user is deactivated",
    "chat not found",
    "bot was kicked",
];

/// A rendered notification for one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub chat_id: i64,
    /// HTML-formatted body.
    pub text: String,
    /// Sticker file id sent after the text, best-effort.
    pub sticker: Option<String>,
}

impl Message {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            sticker: None,
        }
    }

    pub fn with_sticker(mut self, sticker: Option<impl Into<String>>) -> Self {
        self.sticker = sticker.map(Into::into);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The recipient blocked the bot or no longer exists. Retrying is pointless.
    #[error("Recipient unreachable: {0}")]
    RecipientUnreachable(String),

    #[error("Transient delivery failure: {0}")]
    Transient(String),
}

impl DeliveryError {
    /// Classify a failed API call by HTTP status and error description.
    pub fn classify(status: Option<u16>, description: &str) -> Self {
        let lowered = description.to_lowercase();
        let unreachable = status == Some(403)
            || UNREACHABLE_MARKERS.iter().any(|marker| lowered.contains(marker));

        if unreachable {
            DeliveryError::RecipientUnreachable(description.to_string())
        } else {
            DeliveryError::Transient(description.to_string())
        }
    }

    pub fn is_recipient_unreachable(&self) -> bool {
        matches!(self, DeliveryError::RecipientUnreachable(_))
    }
}

/// Outbound delivery channel.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Deliver `message`. Only the text decides success; a failed sticker is
    /// logged and ignored.
    async fn deliver(&self, message: &Message) -> Result<(), DeliveryError>;
}
