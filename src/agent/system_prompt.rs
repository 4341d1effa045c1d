//! System Prompt Builder
//!
//! The prompt is rebuilt each model call so the rolling summary stays
//! current without touching the message log itself.

const PERSONA: &str = "You are a helpful personal assistant called Valet. You answer the user \
directly when you can and call a tool when one of your capabilities fits the request. Call at \
most one tool at a time, and use the tool result to answer rather than guessing. If a tool \
returns an error, tell the user what went wrong or try a different approach.";

/// Build the system instructions for the next model call, folding in
/// the rolling summary of evicted turns when one exists.
pub fn build_system_prompt(summary: &str) -> String {
    if summary.is_empty() {
        PERSONA.to_string()
    } else {
        format!(
            "{PERSONA}\n\nEarlier conversation, condensed:\n{summary}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_summary() {
        let prompt = build_system_prompt("");
        assert!(prompt.contains("Valet"));
        assert!(!prompt.contains("condensed"));
    }

    #[test]
    fn test_prompt_folds_in_summary() {
        let prompt = build_system_prompt("user asked for three jokes");
        assert!(prompt.contains("user asked for three jokes"));
    }
}
