//! Conversation state: messages, wizard phase and user choices.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{Card, Icp, ValuePropData};
use crate::memory::ConversationId;

/// Title of a conversation before any website is analyzed.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person driving the wizard.
    User,
    /// The service.
    Assistant,
}

/// One chat message, optionally carrying a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// Short random id.
    pub id: String,
    /// Author.
    pub role: Role,
    /// Markdown text, possibly empty for card-only messages.
    pub content: String,
    /// Attached card, written as `component` and `data` fields.
    #[serde(flatten)]
    pub card: Option<Card>,
}

impl ChatMessage {
    /// Text message from the user.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: nanoid::nanoid!(),
            role: Role::User,
            content: content.into(),
            card: None,
        }
    }

    /// Text message from the assistant.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: nanoid::nanoid!(),
            role: Role::Assistant,
            content: content.into(),
            card: None,
        }
    }

    /// Assistant message with a card.
    #[must_use]
    pub fn card(content: impl Into<String>, card: Card) -> Self {
        Self {
            card: Some(card),
            ..Self::assistant(content)
        }
    }
}

/// Wizard phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Waiting for a website.
    Analysis,
    /// Profiles shown, waiting for a pick.
    IcpSelection,
    /// Value proposition generated.
    ValueProp,
    /// Funnel shown.
    Funnel,
    /// Waiting for a content channel.
    ContentChoice,
    /// Content being generated.
    Generation,
    /// Content delivered; another channel can be picked.
    Complete,
}

/// One wizard conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Identifier.
    pub id: ConversationId,
    /// Display title, the analyzed host once known.
    pub title: String,
    /// Ordered message log.
    pub messages: Vec<ChatMessage>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Current phase.
    pub phase: Phase,
    /// Whether a wizard step is running.
    pub is_generating: bool,
    /// Analyzed website.
    pub website_url: Option<String>,
    /// Profiles from the last analysis.
    pub icps: Vec<Icp>,
    /// Chosen profile.
    pub selected_icp: Option<Icp>,
    /// Last generated value proposition.
    pub value_prop: Option<ValuePropData>,
}

impl Conversation {
    /// Fresh conversation.
    #[must_use]
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
            phase: Phase::Analysis,
            is_generating: false,
            website_url: None,
            icps: Vec::new(),
            selected_icp: None,
            value_prop: None,
        }
    }

    /// Append a message, returning its id.
    pub fn push(&mut self, message: ChatMessage) -> String {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Mutable access to a message by id.
    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }
}

/// Choice on the funnel card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelChoice {
    /// Email outreach.
    Email,
    /// Landing page.
    Landing,
}

/// Choice on the channel card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChoice {
    /// LinkedIn outreach.
    Linkedin,
    /// Email nurture sequence.
    Email,
    /// Landing page.
    Landing,
    /// Downloadable resource; not available yet.
    LeadMagnet,
}

impl ContentChoice {
    /// Human title used in chat messages.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Linkedin => "LinkedIn Outreach Sequence",
            Self::Email => "Email Nurture Sequence",
            Self::Landing => "Landing Page",
            Self::LeadMagnet => "Lead Magnet",
        }
    }
}

/// Choice on the email type card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailType {
    /// Standalone email.
    OneTime,
    /// Multi-email sequence.
    Sequence,
}

/// Allowed email sequence lengths.
pub const SEQUENCE_LENGTHS: [u8; 3] = [5, 7, 10];

/// Unknown choice value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown choice: {0}")]
pub struct ChoiceParseError(pub String);

macro_rules! choice_names {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ChoiceParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name => Ok(Self::$variant),)+
                    other => Err(ChoiceParseError(other.to_string())),
                }
            }
        }
    };
}

choice_names!(FunnelChoice {
    Email => "email",
    Landing => "landing",
});

choice_names!(ContentChoice {
    Linkedin => "linkedin",
    Email => "email",
    Landing => "landing",
    LeadMagnet => "lead-magnet",
});

choice_names!(EmailType {
    OneTime => "one-time",
    Sequence => "sequence",
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::IcpRef;

    #[test]
    fn test_card_message_flattens_component() {
        let message = ChatMessage::card(
            "",
            Card::FunnelChoice(IcpRef {
                icp: Icp::default(),
            }),
        );
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["component"], "funnel-choice");
        assert!(json["data"]["icp"].is_object());

        let plain = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert!(plain.get("component").is_none());
    }

    #[test]
    fn test_choice_names() {
        assert_eq!("lead-magnet".parse::<ContentChoice>(), Ok(ContentChoice::LeadMagnet));
        assert_eq!("one-time".parse::<EmailType>(), Ok(EmailType::OneTime));
        assert_eq!(FunnelChoice::Landing.to_string(), "landing");
        assert!("fax".parse::<ContentChoice>().is_err());
    }

    #[test]
    fn test_snapshot_shape() {
        let conversation = Conversation::new(ConversationId::new());
        let json = serde_json::to_value(&conversation).unwrap();
        assert_eq!(json["title"], DEFAULT_TITLE);
        assert_eq!(json["phase"], "analysis");
        assert_eq!(json["isGenerating"], false);
    }
}
