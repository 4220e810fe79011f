// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file holds the cross-cutting pieces.

/// Instruction that enforces JSON-only output. Engines ignore it often enough
/// that callers must still validate what comes back.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with only a valid JSON object. \
    Do NOT include any text, markdown, or code fences before or after the JSON. \
    Do NOT include explanations or apologies.";
