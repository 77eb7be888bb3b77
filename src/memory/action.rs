//! Journal actions and their prerequisites.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A step recorded in the conversation journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// A website was analyzed and profiles were produced.
    WebsiteAnalyzed,
    /// A profile was chosen.
    SelectIcp,
    /// A value proposition was generated.
    ValueProp,
    /// The outreach funnel was shown.
    Funnel,
    /// A content channel was picked.
    MakeContentChoice,
    /// An email was generated from the channel picker.
    Email,
    /// LinkedIn outreach was generated.
    Linkedin,
    /// A landing page was generated.
    Landing,
    /// A standalone email was generated.
    OneTimeEmail,
    /// An email sequence was generated.
    EmailSequence,
}

impl Action {
    /// Every action, in wizard order.
    pub const ALL: [Self; 10] = [
        Self::WebsiteAnalyzed,
        Self::SelectIcp,
        Self::ValueProp,
        Self::Funnel,
        Self::MakeContentChoice,
        Self::Email,
        Self::Linkedin,
        Self::Landing,
        Self::OneTimeEmail,
        Self::EmailSequence,
    ];

    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WebsiteAnalyzed => "website-analyzed",
            Self::SelectIcp => "select-icp",
            Self::ValueProp => "value-prop",
            Self::Funnel => "funnel",
            Self::MakeContentChoice => "make-content-choice",
            Self::Email => "email",
            Self::Linkedin => "linkedin",
            Self::Landing => "landing",
            Self::OneTimeEmail => "one-time-email",
            Self::EmailSequence => "email-sequence",
        }
    }

    /// Actions that must have succeeded before this one is allowed.
    #[must_use]
    pub const fn prerequisites(self) -> &'static [Self] {
        match self {
            Self::WebsiteAnalyzed | Self::SelectIcp => &[],
            Self::ValueProp => &[Self::SelectIcp],
            Self::Funnel => &[Self::ValueProp],
            Self::MakeContentChoice | Self::OneTimeEmail | Self::EmailSequence => &[Self::Funnel],
            Self::Email | Self::Linkedin | Self::Landing => &[Self::MakeContentChoice],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown action name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_serde_and_from_str() {
        for action in Action::ALL {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, serde_json::Value::String(action.as_str().to_string()));
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
        }
        assert!("teleport".parse::<Action>().is_err());
    }

    #[test]
    fn test_prerequisite_table() {
        assert!(Action::SelectIcp.prerequisites().is_empty());
        assert_eq!(Action::ValueProp.prerequisites(), &[Action::SelectIcp]);
        assert_eq!(Action::Funnel.prerequisites(), &[Action::ValueProp]);
        assert_eq!(Action::MakeContentChoice.prerequisites(), &[Action::Funnel]);
        assert_eq!(Action::Email.prerequisites(), &[Action::MakeContentChoice]);
        assert_eq!(Action::Linkedin.prerequisites(), &[Action::MakeContentChoice]);
        assert_eq!(Action::OneTimeEmail.prerequisites(), &[Action::Funnel]);
    }
}
