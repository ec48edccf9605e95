//! Folder scope selection.
//!
//! When the caller does not pin folders explicitly, the engine can ask the
//! chat backend to pick the most relevant folders for the question from
//! the distinct folder labels stored in the metadata store. The reply is
//! parsed tolerantly: one label per line or comma-separated, bullets and
//! quotes stripped, matched case-insensitively against the candidates.

use std::sync::Arc;

use tracing::debug;

use vaultmind_core::{ChatBackend, ChatMessage, Result};

/// Fixed system prompt for folder selection.
const FOLDER_SELECT_PROMPT: &str = "You route questions to folders of a note \
collection. Given a question and a list of folder paths, reply with only \
the folder paths most likely to contain the answer, one per line, copied \
exactly from the list. Reply with the word none if no folder is relevant.";

/// Temperature for the routing call; selection should be near-greedy.
const SELECT_TEMPERATURE: f32 = 0.0;

/// Token cap for the routing call.
const SELECT_MAX_TOKENS: u32 = 256;

/// Ask the chat backend to choose folders for a question.
pub async fn select_folders(
    chat: &Arc<dyn ChatBackend>,
    question: &str,
    candidates: &[String],
) -> Result<Vec<String>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let user = format!(
        "Question: {question}\n\nFolders:\n{}",
        candidates.join("\n")
    );
    let messages = vec![
        ChatMessage::system(FOLDER_SELECT_PROMPT),
        ChatMessage::user(user),
    ];

    let reply = chat
        .complete(&messages, SELECT_TEMPERATURE, SELECT_MAX_TOKENS)
        .await?;
    let selected = parse_folder_reply(&reply, candidates);

    debug!(
        subsystem = "query",
        component = "scope",
        op = "select_folders",
        result_count = selected.len(),
        "Folder selection complete"
    );
    Ok(selected)
}

/// Parse a folder-selection reply into canonical candidate labels,
/// preserving reply order and dropping anything not in the candidate list.
pub fn parse_folder_reply(reply: &str, candidates: &[String]) -> Vec<String> {
    let mut selected = Vec::new();
    for raw in reply.split(['\n', ',']) {
        let cleaned = raw
            .trim()
            .trim_start_matches(['-', '*', '•'])
            .trim()
            .trim_matches(['"', '\'', '`']);
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("none") {
            continue;
        }
        if let Some(canonical) = candidates
            .iter()
            .find(|c| c.eq_ignore_ascii_case(cleaned))
        {
            if !selected.contains(canonical) {
                selected.push(canonical.clone());
            }
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<String> {
        vec!["notes".into(), "work/projects".into(), "recipes".into()]
    }

    #[test]
    fn test_parse_one_per_line() {
        let selected = parse_folder_reply("notes\nrecipes", &candidates());
        assert_eq!(selected, vec!["notes", "recipes"]);
    }

    #[test]
    fn test_parse_comma_separated() {
        let selected = parse_folder_reply("notes, work/projects", &candidates());
        assert_eq!(selected, vec!["notes", "work/projects"]);
    }

    #[test]
    fn test_parse_strips_bullets_and_quotes() {
        let selected = parse_folder_reply("- \"notes\"\n* 'recipes'", &candidates());
        assert_eq!(selected, vec!["notes", "recipes"]);
    }

    #[test]
    fn test_parse_is_case_insensitive_but_canonical() {
        let selected = parse_folder_reply("NOTES", &candidates());
        assert_eq!(selected, vec!["notes"]);
    }

    #[test]
    fn test_parse_drops_hallucinated_folders() {
        let selected = parse_folder_reply("notes\nattic\nbasement", &candidates());
        assert_eq!(selected, vec!["notes"]);
    }

    #[test]
    fn test_parse_none_is_empty() {
        assert!(parse_folder_reply("none", &candidates()).is_empty());
        assert!(parse_folder_reply("None", &candidates()).is_empty());
    }

    #[test]
    fn test_parse_dedupes() {
        let selected = parse_folder_reply("notes\nnotes", &candidates());
        assert_eq!(selected, vec!["notes"]);
    }
}
