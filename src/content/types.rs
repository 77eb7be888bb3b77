//! Typed payloads produced by the content generator.
//!
//! Model output is decoded leniently: every field has a default so a missing
//! key degrades to an empty value instead of failing the whole response.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ideal Customer Profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Icp {
    /// Identifier, unique within one analysis.
    pub id: String,
    /// Short segment title.
    pub title: String,
    /// One-sentence segment description.
    pub description: String,
    /// Short pain points.
    pub pain_points: Vec<String>,
    /// Segment goals.
    pub goals: Vec<String>,
    /// Demographics and firmographics.
    pub demographics: String,
    /// Persona full name.
    pub persona_name: String,
    /// Persona job title.
    pub persona_role: String,
    /// Persona company with size.
    pub persona_company: String,
    /// Persona city or region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Persona country.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Brand colors inferred from website content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandColors {
    /// Primary color as a hex code.
    pub primary: String,
    /// Secondary color as a hex code.
    pub secondary: String,
}

impl Default for BrandColors {
    fn default() -> Self {
        Self {
            primary: "#FF6B9D".to_string(),
            secondary: "#A78BFA".to_string(),
        }
    }
}

/// A pain point with its business impact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PainPointMetric {
    /// The pain.
    pub pain: String,
    /// Quantified impact.
    pub metric: String,
}

/// Business summary produced alongside the ICPs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebsiteSummary {
    /// What the business does.
    pub business_description: String,
    /// Who the business sells to.
    pub target_market: String,
    /// Pain points with metrics.
    pub pain_points_with_metrics: Vec<PainPointMetric>,
    /// Lead multiplier shown to the user.
    pub opportunity_multiplier: String,
}

impl Default for WebsiteSummary {
    fn default() -> Self {
        Self {
            business_description: String::new(),
            target_market: String::new(),
            pain_points_with_metrics: Vec::new(),
            opportunity_multiplier: "3".to_string(),
        }
    }
}

/// Result of ICP generation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IcpBatch {
    /// Generated profiles.
    pub icps: Vec<Icp>,
    /// Inferred brand colors.
    pub brand_colors: BrandColors,
    /// Business summary.
    pub summary: WebsiteSummary,
}

/// A customizable variable of the value proposition template.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValuePropVariable {
    /// Template key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// `dropdown` or `input`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Options for dropdown variables.
    pub options: Vec<String>,
    /// Current value.
    pub selected_value: String,
    /// Placeholder for input variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// One stylistic variation of the value proposition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValuePropVariation {
    /// Identifier.
    pub id: String,
    /// Style name.
    pub style: String,
    /// Proposition text.
    pub text: String,
    /// Where this style works best.
    pub use_case: String,
    /// Decorative emoji.
    pub emoji: String,
}

/// Value proposition template plus variations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuePropData {
    /// Template variables.
    pub variables: Vec<ValuePropVariable>,
    /// Style variations.
    pub variations: Vec<ValuePropVariation>,
}

/// A LinkedIn outreach message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkedInMessage {
    /// Identifier.
    pub id: String,
    /// Position in the sequence.
    pub step: u32,
    /// `connection`, `follow-up-1` or `follow-up-2`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short title.
    pub title: String,
    /// When to send.
    pub timing: String,
    /// Character count of `message`.
    pub character_count: u32,
    /// Message body.
    pub message: String,
    /// Personalization tips.
    pub personalization_tips: Vec<String>,
    /// Expected response.
    pub expected_response: String,
}

/// LinkedIn outreach sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkedInOutreachData {
    /// Ordered messages.
    pub messages: Vec<LinkedInMessage>,
    /// Strategy overview.
    pub overall_strategy: String,
    /// Key takeaways.
    pub key_takeaways: Vec<String>,
}

/// One email of a nurture sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailMessage {
    /// Identifier.
    pub id: String,
    /// Position in the sequence.
    pub step: u32,
    /// `intro`, `value`, `social-proof`, `urgency` or `breakup`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Day the email is sent.
    pub day_number: u32,
    /// Subject line options.
    pub subject_lines: Vec<String>,
    /// Email body.
    pub body: String,
    /// Call to action.
    pub cta: String,
    /// Open rate benchmark.
    pub open_rate_benchmark: String,
    /// Reply rate benchmark.
    pub reply_rate_benchmark: String,
    /// Tips.
    pub tips: Vec<String>,
}

/// Email nurture sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailSequenceData {
    /// Ordered emails.
    pub emails: Vec<EmailMessage>,
    /// Goal of the sequence.
    pub sequence_goal: String,
    /// Best practices.
    pub best_practices: Vec<String>,
    /// Expected outcome.
    pub expected_outcome: String,
}

/// Standalone email.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OneTimeEmailData {
    /// Subject line options.
    pub subject_lines: Vec<String>,
    /// Preview text.
    pub preview_text: String,
    /// Email body.
    pub body: String,
    /// Call to action.
    pub cta: String,
    /// Tips.
    pub tips: Vec<String>,
}

/// Landing page section kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LandingSection {
    /// Headline, subheadline, CTA.
    Hero,
    /// Customer quote.
    Testimonial,
    /// Three benefits.
    Features,
    /// Problems and the solution.
    ProblemSolution,
    /// Three statistics.
    Stats,
}

impl LandingSection {
    /// Sections of a full landing page, in display order.
    pub const PAGE_ORDER: [Self; 5] = [
        Self::Hero,
        Self::ProblemSolution,
        Self::Features,
        Self::Stats,
        Self::Testimonial,
    ];

    /// Wire name of the section.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Testimonial => "testimonial",
            Self::Features => "features",
            Self::ProblemSolution => "problemSolution",
            Self::Stats => "stats",
        }
    }
}

impl fmt::Display for LandingSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a section name is unknown.
#[derive(Debug, thiserror::Error)]
#[error("invalid section: {0}")]
pub struct SectionParseError(pub String);

impl FromStr for LandingSection {
    type Err = SectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hero" => Ok(Self::Hero),
            "testimonial" => Ok(Self::Testimonial),
            "features" => Ok(Self::Features),
            "problemSolution" => Ok(Self::ProblemSolution),
            "stats" => Ok(Self::Stats),
            other => Err(SectionParseError(other.to_string())),
        }
    }
}

/// How much of a section to generate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionMode {
    /// Complete copy.
    #[default]
    Full,
    /// Titles only, bodies left empty.
    Title,
}

impl SectionMode {
    /// Parse a mode name; anything but `title` is full.
    #[must_use]
    pub fn parse_lenient(mode: Option<&str>) -> Self {
        match mode {
            Some("title") => Self::Title,
            _ => Self::Full,
        }
    }

    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Title => "title",
        }
    }
}

/// Generated copy for one landing section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingSectionContent {
    /// Which section.
    pub section: LandingSection,
    /// Section fields as returned by the model.
    pub section_data: Value,
}

/// Landing page copy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandingPageData {
    /// Sections in display order.
    pub sections: Vec<LandingSectionContent>,
}

/// Funnel summary shown after the value proposition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelSummary {
    /// Target profile.
    pub icp: Icp,
    /// Headline value proposition.
    pub value_prop: String,
    /// Why this strategy works.
    pub strategy: String,
    /// Expected benchmarks.
    pub benchmarks: String,
}

/// Result of one cached generation.
#[derive(Clone, Debug, PartialEq)]
pub enum GeneratedContent {
    /// Value proposition.
    ValueProp(ValuePropData),
    /// LinkedIn outreach.
    LinkedinOutreach(LinkedInOutreachData),
    /// Email nurture sequence.
    EmailSequence(EmailSequenceData),
    /// Standalone email.
    OneTimeEmail(OneTimeEmailData),
    /// Landing page copy.
    LandingPage(LandingPageData),
}

impl GeneratedContent {
    /// Payload as JSON, for the memory journal.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let encoded = match self {
            Self::ValueProp(data) => serde_json::to_value(data),
            Self::LinkedinOutreach(data) => serde_json::to_value(data),
            Self::EmailSequence(data) => serde_json::to_value(data),
            Self::OneTimeEmail(data) => serde_json::to_value(data),
            Self::LandingPage(data) => serde_json::to_value(data),
        };
        encoded.unwrap_or(Value::Null)
    }

    /// Extract a value proposition.
    #[must_use]
    pub fn into_value_prop(self) -> Option<ValuePropData> {
        match self {
            Self::ValueProp(data) => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icp_batch_defaults_on_absent_fields() {
        let batch: IcpBatch = serde_json::from_str(r#"{"icps": []}"#).unwrap();
        assert!(batch.icps.is_empty());
        assert_eq!(batch.brand_colors, BrandColors::default());
        assert_eq!(batch.summary.opportunity_multiplier, "3");
    }

    #[test]
    fn test_icp_decodes_camel_case() {
        let icp: Icp = serde_json::from_value(serde_json::json!({
            "id": "cto",
            "title": "Enterprise CTOs",
            "painPoints": ["Legacy systems"],
            "personaName": "Amara Okafor"
        }))
        .unwrap();
        assert_eq!(icp.pain_points, vec!["Legacy systems".to_string()]);
        assert_eq!(icp.persona_name, "Amara Okafor");
        assert!(icp.goals.is_empty());
    }

    #[test]
    fn test_section_names() {
        assert_eq!(
            "problemSolution".parse::<LandingSection>().unwrap(),
            LandingSection::ProblemSolution
        );
        assert!("footer".parse::<LandingSection>().is_err());
        assert_eq!(SectionMode::parse_lenient(Some("title")), SectionMode::Title);
        assert_eq!(SectionMode::parse_lenient(Some("other")), SectionMode::Full);
        assert_eq!(SectionMode::parse_lenient(None), SectionMode::Full);
    }

    #[test]
    fn test_generated_content_json_payload() {
        let content = GeneratedContent::OneTimeEmail(OneTimeEmailData {
            body: "Hi".to_string(),
            ..OneTimeEmailData::default()
        });
        assert_eq!(content.to_json()["body"], "Hi");
        assert!(content.into_value_prop().is_none());
    }
}
