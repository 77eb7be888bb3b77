//! Marketing content: typed payloads, chat cards, prompts and the generator.

pub mod cards;
pub mod generator;
pub mod prompts;
pub mod types;

pub use cards::{Card, IcpRef, PersonaContent, ValuePropCard};
pub use generator::{ContentGenerator, DEFAULT_SEQUENCE_LENGTH, extract_first_json_object};
pub use types::{
    BrandColors, EmailMessage, EmailSequenceData, FunnelSummary, GeneratedContent, Icp, IcpBatch,
    LandingPageData, LandingSection, LandingSectionContent, LinkedInMessage, LinkedInOutreachData,
    OneTimeEmailData, PainPointMetric, SectionMode, SectionParseError, ValuePropData, ValuePropVariable,
    ValuePropVariation, WebsiteSummary,
};
