//! Trigger rules and the trigger matcher.
//!
//! A flow is entered when an inbound message from a customer with no open
//! execution matches its trigger. Candidate flows are active and published;
//! the matcher takes them in priority-descending order and the first match
//! wins.

use serde::{Deserialize, Serialize};

use crate::definition::Flow;

/// The rule deciding whether an inbound message starts a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum TriggerRule {
    /// Matches when the message equals one of the keywords, or starts with
    /// one of them followed by a space.
    Keyword {
        /// Comma-separated keyword list.
        #[serde(rename = "trigger_value")]
        keywords: String,
    },
    /// Matches every message. Typically used as a low-priority catch-all.
    AnyMessage,
}

impl TriggerRule {
    /// Returns true if `text` satisfies this rule.
    ///
    /// Keyword matching trims and lowercases both sides, then accepts either
    /// exact equality or the keyword-plus-argument form (`"order 42"` matches
    /// keyword `"order"`).
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::AnyMessage => true,
            Self::Keyword { keywords } => {
                let text = text.trim().to_lowercase();
                keywords
                    .split(',')
                    .map(|keyword| keyword.trim().to_lowercase())
                    .filter(|keyword| !keyword.is_empty())
                    .any(|keyword| {
                        text == keyword || text.starts_with(&format!("{keyword} "))
                    })
            }
        }
    }
}

/// Selects the flow an inbound message starts, if any.
///
/// Flows are re-sorted by priority descending so callers do not have to rely
/// on store ordering; among equal priorities the input order is kept. The
/// first matching flow wins, not the best match.
#[must_use]
pub fn match_flow<'a>(flows: &'a [Flow], text: &str) -> Option<&'a Flow> {
    let mut candidates: Vec<&Flow> = flows
        .iter()
        .filter(|flow| flow.is_active && flow.is_published)
        .collect();
    candidates.sort_by_key(|flow| std::cmp::Reverse(flow.priority));
    candidates
        .into_iter()
        .find(|flow| flow.trigger.matches(text))
}
