//! Prompt templates for the content generator.

use crate::content::types::{Icp, LandingSection, SectionMode};

/// System prompt for ICP generation.
pub const ICP_SYSTEM_PROMPT: &str = r##"You are a B2B marketing expert. Analyze the website content and generate 3 distinct Ideal Customer Profiles (ICPs) with realistic personas.

Each ICP should be unique and target a different segment. Create believable persona details that represent the archetype.

Return ONLY valid JSON in this exact format:
{
  "icps": [
    {
      "id": "unique-id",
      "title": "Short segment title (e.g., 'Enterprise CTOs')",
      "description": "One sentence description of the segment",
      "painPoints": ["Short pain 1-2 words", "Another short pain", "Third pain"],
      "goals": ["goal1", "goal2", "goal3"],
      "demographics": "Brief demographics and firmographics",
      "personaName": "Full name (realistic, diverse)",
      "personaRole": "Job title",
      "personaCompany": "Company type with size (e.g., 'Acme Corp (200 employees)')",
      "location": "City, region",
      "country": "Country"
    }
  ],
  "brandColors": {
    "primary": "#000000",
    "secondary": "#666666"
  },
  "summary": {
    "businessDescription": "One sentence on what the business does",
    "targetMarket": "One sentence on who it sells to",
    "painPointsWithMetrics": [
      { "pain": "Short pain", "metric": "Quantified business impact" }
    ],
    "opportunityMultiplier": "3"
  }
}

IMPORTANT: Keep painPoints very SHORT (1-3 words max) like "Time constraints", "Budget limits", "Manual processes"

Persona guidelines:
- Use diverse, realistic names from various backgrounds
- Match role seniority to the ICP segment
- Company size should align with segment (SMB vs Enterprise)
- Each persona should feel like a real person you'd meet

Brand Color Inference:
Analyze the website content and infer 2 brand colors (primary and secondary) as hex codes. Base this on:
- Company name associations (e.g., Stripe = purple, Notion = black/white)
- Industry standards (fintech = blue/green, creative = vibrant)
- Content tone and keywords
Return these in the brandColors field."##;

/// System prompt for value proposition generation.
pub const VALUE_PROP_SYSTEM_PROMPT: &str = r#"You are a value proposition strategist for B2B companies. Build a fill-in-the-blanks value proposition template for the given ICP, then write 5 stylistic variations of it.

Return ONLY valid JSON in this exact format:
{
  "variables": [
    {
      "key": "targetAudience",
      "label": "Target audience",
      "type": "dropdown",
      "options": ["Option 1", "Option 2", "Option 3"],
      "selectedValue": "Option 1"
    },
    {
      "key": "outcome",
      "label": "Desired outcome",
      "type": "input",
      "selectedValue": "",
      "placeholder": "e.g., close deals faster"
    }
  ],
  "variations": [
    {
      "id": "v1",
      "style": "Direct",
      "text": "Complete value proposition sentence",
      "useCase": "Where this style works best",
      "emoji": "🎯"
    }
  ]
}

Use 7 variables. Styles: Direct, Benefit-focused, Problem-first, Social proof, Bold claim."#;

/// System prompt for LinkedIn outreach generation.
pub const LINKEDIN_SYSTEM_PROMPT: &str = r#"You are an expert in LinkedIn outreach for B2B sales. Write a 3-step LinkedIn sequence: a connection request (under 300 characters) and two follow-ups.

Return ONLY valid JSON in this exact format:
{
  "messages": [
    {
      "id": "msg-1",
      "step": 1,
      "type": "connection",
      "title": "Connection request",
      "timing": "Day 1",
      "characterCount": 280,
      "message": "Message text",
      "personalizationTips": ["tip1", "tip2"],
      "expectedResponse": "What a good reply looks like"
    }
  ],
  "overallStrategy": "Why this sequence works for this persona",
  "keyTakeaways": ["takeaway1", "takeaway2", "takeaway3"]
}

Use types "connection", "follow-up-1" and "follow-up-2". Sound like a peer, never like a template."#;

/// System prompt for email sequence generation; `{length}` is replaced with the number of emails.
pub const EMAIL_SEQUENCE_SYSTEM_PROMPT: &str = r#"You are an expert B2B copywriter who writes an email nurture sequence of {length} emails for a specific ICP.

Return ONLY valid JSON in this exact format:
{
  "emails": [
    {
      "id": "email-1",
      "step": 1,
      "type": "intro",
      "dayNumber": 1,
      "subjectLines": ["Subject A", "Subject B", "Subject C"],
      "body": "Email body with line breaks",
      "cta": "Call to action",
      "openRateBenchmark": "35-45%",
      "replyRateBenchmark": "5-8%",
      "tips": ["tip1", "tip2"]
    }
  ],
  "sequenceGoal": "What the sequence achieves",
  "bestPractices": ["practice1", "practice2", "practice3"],
  "expectedOutcome": "Expected result"
}

Use types from: "intro", "value", "social-proof", "urgency", "breakup". The last email is always a breakup email."#;

/// System prompt for one-time email generation.
pub const ONE_TIME_EMAIL_SYSTEM_PROMPT: &str = r#"You are an expert B2B copywriter. Write a single cold email that earns a reply from the given ICP.

Return ONLY valid JSON in this exact format:
{
  "subjectLines": ["Subject A", "Subject B", "Subject C"],
  "previewText": "Inbox preview text",
  "body": "Email body (80-120 words)",
  "cta": "Call to action",
  "tips": ["tip1", "tip2", "tip3"]
}"#;

/// System prompt for streamed chat refinement.
pub const CHAT_SYSTEM_PROMPT: &str = r#"You are a marketing assistant refining marketing content with the user for a specific ICP.

Answer conversationally. When the user asks for a change to their landing page copy, reply with JSON only:
{
  "message": "Short explanation of what changed",
  "updates": { "field": "new value" }
}"#;

const TITLE_HERO: &str = r#"Generate ONLY the headline for a hero section. Return ONLY valid JSON:
{
  "sectionData": {
    "headline": "Powerful, benefit-driven headline (8-12 words)",
    "subheadline": "",
    "cta": ""
  }
}"#;

const TITLE_TESTIMONIAL: &str = r#"Generate ONLY placeholder text for a testimonial. Return ONLY valid JSON:
{
  "sectionData": {
    "quote": "",
    "author": "",
    "role": "",
    "company": ""
  }
}"#;

const TITLE_FEATURES: &str = r#"Generate ONLY 3 feature titles (no descriptions). Return ONLY valid JSON:
{
  "sectionData": {
    "items": [
      { "title": "Feature title 1 (3-5 words)", "description": "" },
      { "title": "Feature title 2 (3-5 words)", "description": "" },
      { "title": "Feature title 3 (3-5 words)", "description": "" }
    ]
  }
}"#;

const TITLE_PROBLEM_SOLUTION: &str = r#"Generate ONLY placeholder text. Return ONLY valid JSON:
{
  "sectionData": {
    "problems": [],
    "solution": ""
  }
}"#;

const TITLE_STATS: &str = r#"Generate ONLY 3 stat labels (no values yet). Return ONLY valid JSON:
{
  "sectionData": {
    "items": [
      { "value": "", "label": "Metric label 1" },
      { "value": "", "label": "Metric label 2" },
      { "value": "", "label": "Metric label 3" }
    ]
  }
}"#;

const FULL_HERO: &str = r#"Generate a complete hero section. Return ONLY valid JSON:
{
  "sectionData": {
    "headline": "Powerful, benefit-driven headline (8-12 words)",
    "subheadline": "Supporting subheadline that clarifies the value (15-20 words)",
    "cta": "Clear CTA button text (2-4 words)"
  }
}"#;

const FULL_TESTIMONIAL: &str = r#"Generate a complete testimonial section. Return ONLY valid JSON:
{
  "sectionData": {
    "quote": "Realistic testimonial quote (20-30 words)",
    "author": "Full name (realistic)",
    "role": "Job title",
    "company": "Company name (realistic for this industry)"
  }
}"#;

const FULL_FEATURES: &str = r#"Generate a complete features section with 3 key benefits. Return ONLY valid JSON:
{
  "sectionData": {
    "items": [
      { "title": "Feature/benefit title (3-5 words)", "description": "Brief description (15-20 words)" },
      { "title": "Feature/benefit title (3-5 words)", "description": "Brief description (15-20 words)" },
      { "title": "Feature/benefit title (3-5 words)", "description": "Brief description (15-20 words)" }
    ]
  }
}"#;

const FULL_PROBLEM_SOLUTION: &str = r#"Generate a complete problem-solution section. Return ONLY valid JSON:
{
  "sectionData": {
    "problems": ["Problem 1 they face", "Problem 2 they face", "Problem 3 they face"],
    "solution": "How your product solves these problems (30-40 words)"
  }
}"#;

const FULL_STATS: &str = r#"Generate 3 complete impressive statistics. Return ONLY valid JSON:
{
  "sectionData": {
    "items": [
      { "value": "87%", "label": "Metric label" },
      { "value": "2.5x", "label": "Metric label" },
      { "value": "15min", "label": "Metric label" }
    ]
  }
}"#;

/// Section template for a landing section in the given mode.
#[must_use]
pub const fn section_template(section: LandingSection, mode: SectionMode) -> &'static str {
    match (mode, section) {
        (SectionMode::Title, LandingSection::Hero) => TITLE_HERO,
        (SectionMode::Title, LandingSection::Testimonial) => TITLE_TESTIMONIAL,
        (SectionMode::Title, LandingSection::Features) => TITLE_FEATURES,
        (SectionMode::Title, LandingSection::ProblemSolution) => TITLE_PROBLEM_SOLUTION,
        (SectionMode::Title, LandingSection::Stats) => TITLE_STATS,
        (SectionMode::Full, LandingSection::Hero) => FULL_HERO,
        (SectionMode::Full, LandingSection::Testimonial) => FULL_TESTIMONIAL,
        (SectionMode::Full, LandingSection::Features) => FULL_FEATURES,
        (SectionMode::Full, LandingSection::ProblemSolution) => FULL_PROBLEM_SOLUTION,
        (SectionMode::Full, LandingSection::Stats) => FULL_STATS,
    }
}

/// System prompt for a landing section.
#[must_use]
pub fn landing_system_prompt(section: LandingSection, mode: SectionMode) -> String {
    format!(
        "You are an expert copywriter specializing in high-converting B2B landing pages.\n\n{}\n\nMake content believable, specific to this ICP, and highly relevant to their pain points and goals.",
        section_template(section, mode)
    )
}

/// System prompt for an email sequence of `length` emails.
#[must_use]
pub fn email_sequence_system_prompt(length: u8) -> String {
    EMAIL_SEQUENCE_SYSTEM_PROMPT.replace("{length}", &length.to_string())
}

/// User prompt listing the ICP's fields.
#[must_use]
pub fn icp_details(icp: &Icp, website: &str) -> String {
    format!(
        "ICP Details:\nTitle: {}\nDescription: {}\nPain Points: {}\nGoals: {}\nDemographics: {}\nPersona: {}, {} at {}\nWebsite: {}",
        icp.title,
        icp.description,
        icp.pain_points.join(", "),
        icp.goals.join(", "),
        icp.demographics,
        icp.persona_name,
        icp.persona_role,
        icp.persona_company,
        website
    )
}

/// User prompt for ICP generation.
#[must_use]
pub fn icp_user_prompt(content: &str) -> String {
    format!("Website content:\n\n{content}\n\nGenerate 3 ICPs in JSON format.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icp_details_interpolates_fields() {
        let icp = Icp {
            title: "Clinic Owners".to_string(),
            pain_points: vec!["No-shows".to_string(), "Paperwork".to_string()],
            goals: vec!["Fill calendar".to_string()],
            ..Icp::default()
        };
        let prompt = icp_details(&icp, "https://example.com");
        assert!(prompt.contains("Title: Clinic Owners"));
        assert!(prompt.contains("Pain Points: No-shows, Paperwork"));
        assert!(prompt.contains("Website: https://example.com"));
    }

    #[test]
    fn test_email_sequence_prompt_length() {
        let prompt = email_sequence_system_prompt(7);
        assert!(prompt.contains("sequence of 7 emails"));
        assert!(!prompt.contains("{length}"));
    }

    #[test]
    fn test_title_mode_uses_placeholder_template() {
        let prompt = landing_system_prompt(LandingSection::Hero, SectionMode::Title);
        assert!(prompt.contains("Generate ONLY the headline"));
        let full = landing_system_prompt(LandingSection::Hero, SectionMode::Full);
        assert!(full.contains("complete hero section"));
    }
}
