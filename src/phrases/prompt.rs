//! Instructions sent to the phrase service.

/// System role message
pub const SYSTEM_PROMPT: &str =
    "You are an assistant that identifies the most important phrases and sentences in text.";

/// User message asking for verbatim phrases from `chunk`
pub fn user_prompt(chunk: &str) -> String {
    format!(
        "Analyze the following text section and extract ONLY the most important phrases, \
         sentences, or key points that should be highlighted. Return EXACTLY the phrases as \
         they appear in the original text, one per line, with no bullets, numbers, or other \
         formatting. ONLY include text that appears verbatim in the original document.\n\n\
         TEXT SECTION:\n{chunk}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_embeds_chunk() {
        let prompt = user_prompt("Alpha point one.");
        assert!(prompt.ends_with("TEXT SECTION:\nAlpha point one."));
        assert!(prompt.contains("verbatim"));
        assert!(prompt.contains("one per line"));
    }
}
