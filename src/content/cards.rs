//! Chat cards: the typed payload attached to an assistant message.

use serde::{Deserialize, Serialize};

use crate::content::types::{
    EmailSequenceData, FunnelSummary, GeneratedContent, Icp, LandingPageData,
    LinkedInOutreachData, OneTimeEmailData, ValuePropData,
};

/// Card referring to a single profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcpRef {
    /// The profile.
    pub icp: Icp,
}

/// Value proposition card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePropCard {
    /// Generated template and variations.
    #[serde(flatten)]
    pub data: ValuePropData,
    /// Profile the proposition targets.
    pub icp: Icp,
}

/// Generated content labelled with the persona it was written for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaContent<T> {
    /// Generated content.
    #[serde(flatten)]
    pub content: T,
    /// Title of the target profile.
    pub persona_title: String,
}

/// Every card the wizard can show, tagged by component name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "component", content = "data", rename_all = "kebab-case")]
pub enum Card {
    /// Profile picker.
    Icps(Vec<Icp>),
    /// Value proposition builder.
    ValueProp(ValuePropCard),
    /// Prompt to continue to the funnel.
    ContinueToFunnel(IcpRef),
    /// Outreach strategy summary.
    FunnelSummary(FunnelSummary),
    /// Email or landing page picker.
    FunnelChoice(IcpRef),
    /// Channel picker.
    ContentChoice(IcpRef),
    /// One-time email or sequence picker.
    EmailTypeChoice(IcpRef),
    /// Sequence length picker.
    SequenceLengthChoice(IcpRef),
    /// Standalone email.
    OneTimeEmail(PersonaContent<OneTimeEmailData>),
    /// LinkedIn outreach sequence.
    LinkedinOutreach(PersonaContent<LinkedInOutreachData>),
    /// Email nurture sequence.
    EmailSequence(PersonaContent<EmailSequenceData>),
    /// Landing page copy.
    LandingPage(PersonaContent<LandingPageData>),
}

impl Card {
    /// Component name of the card.
    #[must_use]
    pub const fn component(&self) -> &'static str {
        match self {
            Self::Icps(_) => "icps",
            Self::ValueProp(_) => "value-prop",
            Self::ContinueToFunnel(_) => "continue-to-funnel",
            Self::FunnelSummary(_) => "funnel-summary",
            Self::FunnelChoice(_) => "funnel-choice",
            Self::ContentChoice(_) => "content-choice",
            Self::EmailTypeChoice(_) => "email-type-choice",
            Self::SequenceLengthChoice(_) => "sequence-length-choice",
            Self::OneTimeEmail(_) => "one-time-email",
            Self::LinkedinOutreach(_) => "linkedin-outreach",
            Self::EmailSequence(_) => "email-sequence",
            Self::LandingPage(_) => "landing-page",
        }
    }

    /// Card showing generated content for a persona.
    #[must_use]
    pub fn for_content(content: GeneratedContent, icp: &Icp) -> Self {
        let persona_title = icp.title.clone();
        match content {
            GeneratedContent::ValueProp(data) => Self::ValueProp(ValuePropCard {
                data,
                icp: icp.clone(),
            }),
            GeneratedContent::LinkedinOutreach(content) => Self::LinkedinOutreach(PersonaContent {
                content,
                persona_title,
            }),
            GeneratedContent::EmailSequence(content) => Self::EmailSequence(PersonaContent {
                content,
                persona_title,
            }),
            GeneratedContent::OneTimeEmail(content) => Self::OneTimeEmail(PersonaContent {
                content,
                persona_title,
            }),
            GeneratedContent::LandingPage(content) => Self::LandingPage(PersonaContent {
                content,
                persona_title,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icp() -> Icp {
        Icp {
            id: "ops".to_string(),
            title: "Ops Leaders".to_string(),
            ..Icp::default()
        }
    }

    #[test]
    fn test_card_serializes_component_tag() {
        let card = Card::ContentChoice(IcpRef { icp: icp() });
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["component"], "content-choice");
        assert_eq!(json["data"]["icp"]["title"], "Ops Leaders");
        assert_eq!(card.component(), "content-choice");
    }

    #[test]
    fn test_persona_content_is_flattened() {
        let card = Card::for_content(
            GeneratedContent::LinkedinOutreach(LinkedInOutreachData {
                overall_strategy: "Warm intro first".to_string(),
                ..LinkedInOutreachData::default()
            }),
            &icp(),
        );
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["component"], "linkedin-outreach");
        assert_eq!(json["data"]["overallStrategy"], "Warm intro first");
        assert_eq!(json["data"]["personaTitle"], "Ops Leaders");
    }
}
