//! Dynamic planning: decompose a user request into an ordered list of
//! capability names drawn only from the currently available set.

use crate::contract::json_object_spans;
use crate::llm::LLMClient;
use crate::types::{AppError, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Wire shape of the planning LLM response.
#[derive(Debug, Deserialize)]
struct PlanResponse {
    steps: Vec<String>,
}

/// Ask the planning LLM to decompose `request` into an ordered, minimal
/// list of capabilities. An empty list means no capability applies and the
/// caller should answer directly.
///
/// # Errors
///
/// Returns [`AppError::Planning`] when the LLM call fails or the response
/// cannot be parsed as a plan. Planning is never retried.
pub async fn build_plan(
    llm: &dyn LLMClient,
    request: &str,
    capabilities: &BTreeSet<String>,
) -> Result<Vec<String>> {
    let system_prompt = planning_prompt(capabilities);
    debug!(request = %truncated(request, 200), "Requesting plan");

    let response = llm
        .generate_with_system(&system_prompt, request)
        .await
        .map_err(|e| AppError::Planning(format!("planning LLM call failed: {e}")))?;

    let steps = parse_plan(&response)?;
    info!(steps = ?steps, "Planner returned plan");
    Ok(steps)
}

/// Parse `{"steps": [...]}` out of the LLM response, tolerating extra text
/// around the JSON object.
fn parse_plan(response: &str) -> Result<Vec<String>> {
    let trimmed = response.trim();

    if let Ok(plan) = serde_json::from_str::<PlanResponse>(trimmed) {
        return Ok(plan.steps);
    }

    for candidate in json_object_spans(trimmed) {
        if let Ok(plan) = serde_json::from_str::<PlanResponse>(candidate) {
            return Ok(plan.steps);
        }
    }

    Err(AppError::Planning(format!(
        "planner returned an unparseable plan: '{}'",
        truncated(trimmed, 500)
    )))
}

/// Build the planning system prompt: the capability strings verbatim,
/// strict output rules, and examples sized to the available set.
fn planning_prompt(capabilities: &BTreeSet<String>) -> String {
    let capabilities_text = capabilities
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");

    let caps: Vec<&String> = capabilities.iter().collect();
    let examples = match caps.as_slice() {
        [a, b, c, ..] => format!(
            "User: \"perform a task requiring {a}, then {b}, then {c}\"\n\
             Response: {{\"steps\": [\"{a}\", \"{b}\", \"{c}\"]}}\n\n\
             User: \"perform a task requiring {a}\"\n\
             Response: {{\"steps\": [\"{a}\"]}}\n\n\
             User: \"what is 2+2?\"\n\
             Response: {{\"steps\": []}}"
        ),
        [a, b] => format!(
            "User: \"perform a task requiring {a} then {b}\"\n\
             Response: {{\"steps\": [\"{a}\", \"{b}\"]}}\n\n\
             User: \"what is 2+2?\"\n\
             Response: {{\"steps\": []}}"
        ),
        [a] => format!(
            "User: \"perform a task requiring {a}\"\n\
             Response: {{\"steps\": [\"{a}\"]}}\n\n\
             User: \"what is 2+2?\"\n\
             Response: {{\"steps\": []}}"
        ),
        [] => "User: \"what is 2+2?\"\nResponse: {\"steps\": []}".to_string(),
    };

    format!(
        "You are the Supervisor / Planner in a STRICT multi-agent system.\n\
         \n\
         Available capabilities (EXACT STRINGS, use verbatim):\n\
         {capabilities_text}\n\
         \n\
         Your task:\n\
         1. Analyze the user's request.\n\
         2. Decide which of the AVAILABLE capabilities above are REQUIRED.\n\
         3. Return a minimal, ordered list of capabilities.\n\
         \n\
         Return ONLY valid JSON in this format:\n\
         {{\"steps\": [\"capability_1\", \"capability_2\"]}}\n\
         \n\
         STRICT RULES:\n\
         - Use ONLY the listed capabilities.\n\
         - Use capability strings EXACTLY as shown.\n\
         - Do NOT invent, rename, or explain.\n\
         - Do NOT return text outside JSON.\n\
         \n\
         Return an EMPTY list only if the request is purely conversational\n\
         and none of the capabilities apply.\n\
         \n\
         EXAMPLES:\n\
         \n\
         {examples}"
    )
}

fn truncated(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_clean_json() {
        let steps = parse_plan(r#"{"steps": ["research", "create_document"]}"#).unwrap();
        assert_eq!(steps, vec!["research", "create_document"]);
    }

    #[test]
    fn test_parse_plan_empty_steps() {
        let steps = parse_plan(r#"{"steps": []}"#).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn test_parse_plan_embedded_in_prose() {
        let steps =
            parse_plan("Here is the plan:\n{\"steps\": [\"research\"]}\nDone.").unwrap();
        assert_eq!(steps, vec!["research"]);
    }

    #[test]
    fn test_parse_plan_rejects_garbage() {
        assert!(parse_plan("I cannot plan this").is_err());
        assert!(parse_plan(r#"{"not_steps": []}"#).is_err());
    }

    #[test]
    fn test_planning_prompt_lists_capabilities_verbatim() {
        let caps: BTreeSet<String> =
            ["research".to_string(), "gmail".to_string()].into_iter().collect();
        let prompt = planning_prompt(&caps);
        assert!(prompt.contains("- research"));
        assert!(prompt.contains("- gmail"));
        // Two capabilities: the two-step example is used.
        assert!(prompt.contains(r#"{"steps": ["gmail", "research"]}"#));
    }

    #[test]
    fn test_planning_prompt_single_capability_example() {
        let caps: BTreeSet<String> = ["research".to_string()].into_iter().collect();
        let prompt = planning_prompt(&caps);
        assert!(prompt.contains(r#"{"steps": ["research"]}"#));
        assert!(prompt.contains(r#"{"steps": []}"#));
    }
}
