//! Prompt assembly for grounded answering.
//!
//! The system message fixes the persona, the grounding requirement, the
//! citation syntax, the abstention instruction, and a detail-length
//! directive. The user message carries the question plus the numbered
//! context blocks in rank order.

use vaultmind_core::{ChatMessage, DetailLevel, RetrievedChunk};

/// Build the system message for an ask.
pub fn system_prompt(detail: DetailLevel, refusal_phrase: &str) -> String {
    format!(
        "You are a careful assistant answering questions from a personal \
         collection of Markdown notes. Ground every claim in the numbered \
         context blocks provided; do not use outside knowledge. Cite each \
         source you use with the exact syntax \
         [File: <rel_path>, Section: <heading_path>], using the file and \
         section values shown in the context. If the context is empty or \
         does not contain the answer, reply exactly: \"{refusal_phrase}\" \
         {directive}",
        directive = detail.directive(),
    )
}

/// Build the user message: the question followed by the numbered context.
pub fn user_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let mut out = format!("Question: {question}\n\nContext:\n");
    for (index, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!(
            "[{n}] vault: {vault}, file: {file}, section: {section}\n{text}\n\n",
            n = index + 1,
            vault = chunk.vault,
            file = chunk.rel_path,
            section = chunk.heading_path,
            text = chunk.text,
        ));
    }
    out
}

/// Assemble the full message list for the chat backend.
pub fn build_messages(
    question: &str,
    chunks: &[RetrievedChunk],
    detail: DetailLevel,
    refusal_phrase: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(detail, refusal_phrase)),
        ChatMessage::user(user_prompt(question, chunks)),
    ]
}
