//! Journal entries and the per-conversation memory aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::Icp;
use crate::memory::action::Action;
use crate::memory::ids::ConversationId;

/// One journal entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// When the action finished.
    pub timestamp: DateTime<Utc>,
    /// What was done.
    pub action: Action,
    /// Generated payload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Whether the action succeeded.
    pub success: bool,
}

impl GenerationRecord {
    /// New record stamped now.
    #[must_use]
    pub fn new(action: Action, result: Option<Value>, success: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            result,
            success,
        }
    }
}

/// Lightweight user preferences remembered per conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// Last wizard action label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    /// Last chosen content channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_content_type: Option<String>,
}

/// Everything remembered about one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMemory {
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Analyzed website.
    #[serde(default)]
    pub website_url: Option<String>,
    /// Chosen profile.
    #[serde(default)]
    pub selected_icp: Option<Icp>,
    /// Append-only journal.
    #[serde(default)]
    pub generation_history: Vec<GenerationRecord>,
    /// Preferences.
    #[serde(default)]
    pub user_preferences: UserPreferences,
}

impl ConversationMemory {
    /// Empty memory for a conversation.
    #[must_use]
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            website_url: None,
            selected_icp: None,
            generation_history: Vec::new(),
            user_preferences: UserPreferences::default(),
        }
    }

    /// Distinct actions with at least one successful record, in first-success order.
    #[must_use]
    pub fn completed_actions(&self) -> Vec<Action> {
        let mut completed = Vec::new();
        for record in self.generation_history.iter().filter(|r| r.success) {
            if !completed.contains(&record.action) {
                completed.push(record.action);
            }
        }
        completed
    }

    /// Whether every prerequisite of `action` has succeeded.
    #[must_use]
    pub fn allows(&self, action: Action) -> bool {
        let completed = self.completed_actions();
        action
            .prerequisites()
            .iter()
            .all(|required| completed.contains(required))
    }

    /// Apply a partial update.
    pub fn apply(&mut self, update: MemoryUpdate) {
        if let Some(url) = update.website_url {
            self.website_url = Some(url);
        }
        if let Some(icp) = update.selected_icp {
            self.selected_icp = Some(icp);
        }
        if let Some(content_type) = update.preferred_content_type {
            self.user_preferences.preferred_content_type = Some(content_type);
        }
        if let Some(last_action) = update.last_action {
            self.user_preferences.last_action = Some(last_action);
        }
    }
}

/// Partial update merged into a [`ConversationMemory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryUpdate {
    /// New website URL.
    pub website_url: Option<String>,
    /// New selected profile.
    pub selected_icp: Option<Icp>,
    /// New preferred content type.
    pub preferred_content_type: Option<String>,
    /// New last action label.
    pub last_action: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_records_do_not_complete_actions() {
        let mut memory = ConversationMemory::new(ConversationId::new());
        memory
            .generation_history
            .push(GenerationRecord::new(Action::SelectIcp, None, false));
        assert!(memory.completed_actions().is_empty());
        assert!(!memory.allows(Action::ValueProp));

        memory
            .generation_history
            .push(GenerationRecord::new(Action::SelectIcp, None, true));
        memory
            .generation_history
            .push(GenerationRecord::new(Action::SelectIcp, None, true));
        assert_eq!(memory.completed_actions(), vec![Action::SelectIcp]);
        assert!(memory.allows(Action::ValueProp));
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut memory = ConversationMemory::new(ConversationId::new());
        memory.apply(MemoryUpdate {
            website_url: Some("https://acme.io".to_string()),
            ..MemoryUpdate::default()
        });
        memory.apply(MemoryUpdate {
            last_action: Some("content-choice".to_string()),
            ..MemoryUpdate::default()
        });

        assert_eq!(memory.website_url.as_deref(), Some("https://acme.io"));
        assert_eq!(
            memory.user_preferences.last_action.as_deref(),
            Some("content-choice")
        );
    }

    #[test]
    fn test_serialized_shape_is_camel_case() {
        let memory = ConversationMemory::new(ConversationId::new());
        let json = serde_json::to_value(&memory).unwrap();
        assert!(json.get("conversationId").is_some());
        assert!(json.get("generationHistory").is_some());
        assert!(json.get("userPreferences").is_some());
    }
}
