//! Failure classification for the hosted model call.
//!
//! The upstream SDK and transport surface free-form error text. Callers get
//! a stable category and a fixed user-facing message instead, derived from
//! case-insensitive substring matching over an ordered rule list. The first
//! matching rule wins, so broad keywords never shadow the specific
//! categories listed before them.

/// Category of a hosted-model failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFailure {
    /// Credential rejected or missing on the provider side
    Auth,
    /// Request or quota throttled
    RateLimit,
    /// Content refused by safety filtering
    ContentFiltered,
    /// Model reported unavailable
    ModelUnavailable,
    /// Transport-level timeout or connectivity failure
    NetworkTimeout,
    /// Anything the rules do not cover
    Other,
}

/// One classification rule. A rule matches when at least one `any_of`
/// needle occurs in the message (or `any_of` is empty) and every `all_of`
/// needle occurs as well. Matching is case-insensitive.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Category produced on match
    pub category: ServiceFailure,
    /// Needles of which one must be present
    pub any_of: &'static [&'static str],
    /// Needles which must all be present
    pub all_of: &'static [&'static str],
}

impl Rule {
    fn matches(&self, lowered: &str) -> bool {
        let any_ok = self.any_of.is_empty() || self.any_of.iter().any(|n| lowered.contains(n));
        let all_ok = self.all_of.iter().all(|n| lowered.contains(n));
        any_ok && all_ok
    }
}

/// Default rule order. Auth before rate limiting before safety filtering
/// before availability before network, so messages carrying several
/// keywords resolve to the most actionable category.
pub const DEFAULT_RULES: &[Rule] = &[
    Rule {
        category: ServiceFailure::Auth,
        any_of: &["api key", "authentication"],
        all_of: &[],
    },
    Rule {
        category: ServiceFailure::RateLimit,
        any_of: &["rate limit", "quota"],
        all_of: &[],
    },
    Rule {
        category: ServiceFailure::ContentFiltered,
        any_of: &["safety", "blocked"],
        all_of: &[],
    },
    Rule {
        category: ServiceFailure::ModelUnavailable,
        any_of: &[],
        all_of: &["model", "unavailable"],
    },
    Rule {
        category: ServiceFailure::NetworkTimeout,
        any_of: &["timeout", "network"],
        all_of: &[],
    },
];

/// Classifies a raw failure message against `DEFAULT_RULES`.
pub fn classify(message: &str) -> ServiceFailure {
    classify_with(DEFAULT_RULES, message)
}

/// Classifies a raw failure message against a caller-supplied rule order.
pub fn classify_with(rules: &[Rule], message: &str) -> ServiceFailure {
    let lowered = message.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.category)
        .unwrap_or(ServiceFailure::Other)
}

/// Maps a raw failure message to the message shown to callers. Only the
/// `Other` category echoes the raw text.
pub fn user_message(raw: &str) -> String {
    match classify(raw) {
        ServiceFailure::Auth => {
            "Authentication failed: Invalid or expired API key. Please check your GEMINI_API_KEY."
                .to_string()
        }
        ServiceFailure::RateLimit => {
            "Rate limit exceeded. Please try again later or check your API quota.".to_string()
        }
        ServiceFailure::ContentFiltered => {
            "Content blocked by safety filters. Try rephrasing your question.".to_string()
        }
        ServiceFailure::ModelUnavailable => {
            "Gemini model temporarily unavailable. Please try again later.".to_string()
        }
        ServiceFailure::NetworkTimeout => {
            "Network timeout. Please check your internet connection and try again.".to_string()
        }
        ServiceFailure::Other => format!("AI service error: {raw}"),
    }
}
