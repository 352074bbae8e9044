//! Built-in recruiting personas
//!
//! A persona bundles the default tone, sequence variant and the greeting that
//! opens every conversation held under it.

/// Static persona definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub id: &'static str,
    pub name: &'static str,
    pub style: &'static str,
    pub tone: &'static str,
    pub sequence_type: &'static str,
    pub greeting: &'static str,
}

/// Persona used when none is configured
pub const DEFAULT_PERSONA: &str = "corporate_pro";

const PERSONAS: &[Persona] = &[
    Persona {
        id: "corporate_pro",
        name: "Corporate Professional",
        style: "Formal and structured outreach",
        tone: "professional",
        sequence_type: "passive",
        greeting: "I'm your Corporate Professional Recruiting Assistant. I help create formal, \
                   structured outreach sequences that reflect corporate excellence. I'll guide \
                   you through gathering information about the role, company, and requirements \
                   to craft compelling recruiting messages.",
    },
    Persona {
        id: "startup_founder",
        name: "Startup Founder",
        style: "Direct and passionate outreach",
        tone: "founder",
        sequence_type: "aggressive",
        greeting: "I'm your Startup Founder Recruiting Assistant. I bring startup energy and \
                   vision to help you craft engaging outreach sequences. I'll help you highlight \
                   growth opportunities and innovative challenges to attract top talent.",
    },
    Persona {
        id: "friendly_recruiter",
        name: "Friendly Recruiter",
        style: "Warm and personable approach",
        tone: "friendly",
        sequence_type: "soft",
        greeting: "I'm your Friendly Recruiting Assistant. I help create warm, personalized \
                   messages that build genuine connections with candidates. I'll guide you \
                   through crafting welcoming outreach sequences that resonate with potential \
                   hires.",
    },
    Persona {
        id: "tech_expert",
        name: "Tech Expert",
        style: "Technical and detailed outreach",
        tone: "professional",
        sequence_type: "passive",
        greeting: "I'm your Technical Recruiting Assistant. I specialize in crafting detailed, \
                   technical outreach sequences that speak the language of developers. I'll help \
                   you highlight technical challenges and engineering opportunities to attract \
                   top tech talent.",
    },
];

/// All built-in personas, in display order
pub fn all_personas() -> &'static [Persona] {
    PERSONAS
}

/// The persona named by [`DEFAULT_PERSONA`]
pub fn default_persona() -> &'static Persona {
    &PERSONAS[0]
}

/// Look up a persona by id
pub fn find(id: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|p| p.id == id)
}
