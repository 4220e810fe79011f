//! Evaluation Request Builder — renders the two documents into one instruction payload.
//!
//! Pure and deterministic: the same request always yields byte-identical output.
//! Document bodies are appended verbatim, never run through placeholder substitution,
//! so text inside a resume cannot rewrite the instructions or the other document.

use crate::evaluation::models::EvaluationRequest;
use crate::evaluation::prompts::{
    DELIMITER_NOTICE, EVALUATION_PREAMBLE, EVALUATION_SCHEMA, JOB_DESCRIPTION_BEGIN,
    JOB_DESCRIPTION_END, RESUME_BEGIN, RESUME_END,
};
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;

/// What the transport sends: the instruction text plus the structured-output hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPayload {
    pub instruction: String,
    pub structured_output: bool,
}

pub fn build_payload(request: &EvaluationRequest<'_>) -> EvaluationPayload {
    let resume = request.resume_text();
    let job_description = request.job_description_text();

    let sections = [
        EVALUATION_PREAMBLE,
        JSON_ONLY_INSTRUCTION,
        EVALUATION_SCHEMA,
        DELIMITER_NOTICE,
    ];
    let mut instruction = String::with_capacity(resume.len() + job_description.len() + 2048);

    for section in sections {
        instruction.push_str(section);
        instruction.push_str("\n\n");
    }

    push_document(&mut instruction, JOB_DESCRIPTION_BEGIN, job_description, JOB_DESCRIPTION_END);
    instruction.push('\n');
    push_document(&mut instruction, RESUME_BEGIN, resume, RESUME_END);

    EvaluationPayload {
        instruction,
        structured_output: true,
    }
}

fn push_document(out: &mut String, begin: &str, body: &str, end: &str) {
    out.push_str(begin);
    out.push('\n');
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(end);
    out.push('\n');
}
