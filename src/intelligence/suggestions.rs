//! Project improvement suggestions
//!
//! Rule-based analysis of the current knowledge and instructions against a
//! conversation summary. Rules are evaluated independently and reported in
//! declaration order.

use std::collections::HashSet;

use crate::types::{InstructionSection, KnowledgeEntry};

/// Returned alone when no rule fires, so "nothing to report" is never an empty list
pub const WELL_ORGANIZED: &str =
    "No specific improvements suggested at this time. The project knowledge appears well-organized.";

const TECHNICAL_KEYWORDS: &[&str] = &["code", "architecture"];
const PREFERENCE_KEYWORDS: &[&str] = &["prefer"];
const LIMITATION_KEYWORDS: &[&str] = &["limit", "constraint"];

/// Entry count above which low-importance entries are reviewed
const REVIEW_MIN_ENTRIES: usize = 10;
/// Number of low-importance entries that must be exceeded to suggest a review
const REVIEW_LOW_IMPORTANCE: usize = 5;

/// What the analyzer looks at
pub struct ImprovementInput<'a> {
    pub knowledge: &'a [KnowledgeEntry],
    pub instructions: &'a [InstructionSection],
    pub conversation_summary: &'a str,
    /// Extra topics the caller wants considered; scanned like the summary
    pub focus_areas: &'a [String],
}

/// Analyze and return suggestion strings, or the single `WELL_ORGANIZED` message
pub fn suggest_improvements(input: &ImprovementInput<'_>) -> Vec<String> {
    let mut text = input.conversation_summary.to_lowercase();
    for area in input.focus_areas {
        text.push(' ');
        text.push_str(&area.to_lowercase());
    }
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    let categories: HashSet<&str> = input
        .knowledge
        .iter()
        .map(|k| k.category.as_str())
        .collect();
    let sections: HashSet<&str> = input
        .instructions
        .iter()
        .filter(|i| i.active)
        .map(|i| i.section.as_str())
        .collect();

    let mut suggestions = Vec::new();

    if !categories.contains("technical") && mentions(TECHNICAL_KEYWORDS) {
        suggestions.push(
            "Consider adding technical knowledge about coding practices or architecture"
                .to_string(),
        );
    }

    if !categories.contains("preferences") && mentions(PREFERENCE_KEYWORDS) {
        suggestions
            .push("Consider documenting user preferences mentioned in conversations".to_string());
    }

    if !sections.contains("constraints") && mentions(LIMITATION_KEYWORDS) {
        suggestions.push(
            "Consider adding constraint instructions based on mentioned limitations".to_string(),
        );
    }

    if !sections.contains("guidelines") && !input.knowledge.is_empty() {
        suggestions.push(
            "Consider adding guideline instructions for how to use the accumulated knowledge"
                .to_string(),
        );
    }

    if input.knowledge.len() > REVIEW_MIN_ENTRIES {
        let low = input.knowledge.iter().filter(|k| k.importance < 3).count();
        if low > REVIEW_LOW_IMPORTANCE {
            suggestions.push(format!(
                "Consider reviewing {} low-importance knowledge entries for relevance",
                low
            ));
        }
    }

    if suggestions.is_empty() {
        suggestions.push(WELL_ORGANIZED.to_string());
    }

    suggestions
}
