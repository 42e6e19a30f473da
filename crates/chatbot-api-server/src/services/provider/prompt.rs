use crate::config::{AiConfig, ProviderKind};
use crate::models::chat::{ChatMessage, Role};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful customer support AI assistant. Be concise and friendly.";

const CONTEXT_INSTRUCTION: &str =
    "Use the following relevant information from our website to answer the user's question:";

const NO_CONTEXT_INSTRUCTION: &str =
    "If you don't know the answer based on our website content, be honest and say you're not sure.";

/// Configured system prompt for a backend. Gemini falls back to the OpenAI
/// prompt when it has none of its own.
pub fn base_system_prompt(ai: &AiConfig, kind: ProviderKind) -> String {
    let own = non_blank(ai.provider(kind).system_prompt.as_deref());
    let shared = match kind {
        ProviderKind::Gemini => non_blank(ai.openai.system_prompt.as_deref()),
        ProviderKind::OpenAi => None,
    };

    own.or(shared).unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string()
}

/// System instruction sent ahead of the history on every completion.
pub fn system_instruction(base: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("{}\n\n{}\n{}", base, CONTEXT_INSTRUCTION, context),
        None => format!("{}\n\n{}", base, NO_CONTEXT_INSTRUCTION),
    }
}

/// History without stored system messages; the fresh system instruction supersedes them.
pub fn conversation(history: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    history.iter().filter(|m| m.role != Role::System)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
