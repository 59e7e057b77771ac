use agentrun_llm::{ChatMessage, CompletionRequest, LlmClient, LlmError, THINKING_MAX_TOKENS};
use agentrun_models::core::Agent;
use log::debug;

/// Linear reflection: `depth` sequential completions, each prompt carrying
/// every earlier step's output. No branching and no early exit.
pub async fn think(
    agent: &Agent,
    llm: &dyn LlmClient,
    model: &str,
    depth: u32,
) -> Result<Vec<String>, LlmError> {
    let objective = agent
        .config
        .get("objective")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Plan the next {} run for '{}'", agent.agent_type, agent.name));

    let mut steps = Vec::with_capacity(depth as usize);
    let mut context = String::new();

    for step in 1..=depth {
        let prompt = if context.is_empty() {
            format!("Objective: {objective}\n\nStep {step} of {depth}: outline an approach.")
        } else {
            format!(
                "Objective: {objective}\n\nReasoning so far:\n{context}\nStep {step} of {depth}: refine the approach."
            )
        };

        let output = llm
            .complete(CompletionRequest {
                model: model.to_string(),
                messages: vec![
                    ChatMessage::system("You are a marketing strategist thinking step by step."),
                    ChatMessage::user(prompt),
                ],
                max_tokens: THINKING_MAX_TOKENS,
            })
            .await?;

        debug!("Agent {} thinking step {}/{} complete", agent.name, step, depth);
        context.push_str(&format!("Step {step}: {output}\n"));
        steps.push(output);
    }

    Ok(steps)
}
