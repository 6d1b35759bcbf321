//! Prompt templates.
//!
//! Every template yields a system prompt and a user prompt. The sampling
//! temperature is chosen by the caller from [`crate::Temperatures`].

/// A system/user message pair for one chat completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const WRITER_PREAMBLE: &str = "You are an expert prompt writer. You are in charge of writing diverse prompts to send to a large language model.";

const PLACEHOLDER_NOTE: &str = "A placeholder is a word in square brackets (e.g., [name]).";

/// Rewrite `draft` (an inverted embedding) into a well-formed sentence modeled on `example`.
pub fn correction(draft: &str, example: &str) -> Prompt {
    let system = [
        WRITER_PREAMBLE,
        &format!("Follow these steps to modify Sentence A. {PLACEHOLDER_NOTE}"),
        "1) If Sentence A contains any placeholders, remove them.",
        "2) If Sentence B has any placeholders, add them to Sentence A.",
        "3) Using Sentence B as an example of a well-written sentence, edit Sentence A to be complete and grammatically correct, while maintaining its length and meaning.",
        "4) Make sure Sentence A is the same type of sentence as Sentence B (e.g., statement, question, command).",
        "5) Make sure Sentence A is not identical to Sentence B, and ends with a period, question mark, or quotation mark.",
        "Just generate the modified version of Sentence A without explanations:",
    ]
    .join("\n");
    Prompt {
        system,
        user: format!("Sentence A: {draft}\nSentence B: {example}"),
    }
}

/// `count` stylistic variations of `sentence`.
pub fn variation(sentence: &str, count: usize) -> Prompt {
    let system = [
        WRITER_PREAMBLE,
        &format!("Generate exactly {count} different variations of Sentence A."),
        PLACEHOLDER_NOTE,
        "If Sentence A contains any placeholders, make sure all newly generated sentences have the same placeholders.",
        "Maintain the length and style of the original sentence, but vary the sentence structure and wording.",
        "Make sure each new sentence is the same type of sentence as Sentence A (e.g., statement, question, command).",
        "Remember you are not responding to Sentence A, but generating variations of it.",
        "Format your response with one new sentence per line (separated with a \\n character).",
        &format!("Just generate the {count} new sentences without explanations:"),
    ]
    .join("\n");
    Prompt {
        system,
        user: format!("Sentence A: {sentence}"),
    }
}

/// `count` variations of `sentence` produced by applying `instruction`.
pub fn instructed_variation(sentence: &str, count: usize, instruction: &str) -> Prompt {
    let system = [
        WRITER_PREAMBLE,
        &format!(
            "Generate exactly {count} different variations of Sentence A by applying this instruction: {instruction}."
        ),
        "Remember you are not responding to Sentence A, but generating variations of it.",
        "Each new sentence should be different from the original and other generated sentences.",
        "Format your response with one new sentence per line (separated with a \\n character).",
        &format!("Just generate the {count} new sentences without explanations:"),
    ]
    .join("\n");
    Prompt {
        system,
        user: format!("Sentence A: {sentence}"),
    }
}

/// Repair an ordered list of interpolated drafts so it blends from `anchor_a` to `anchor_b`.
pub fn batch_correction(drafts: &[String], anchor_a: &str, anchor_b: &str) -> Prompt {
    let count = drafts.len();
    let system = [
        WRITER_PREAMBLE,
        &format!("Follow these steps to modify each of the {count} sentences in the list."),
        &format!(
            "These sentences were generated by interpolating between two sentences, sentence A: '{anchor_a}' and sentence B: '{anchor_b}'."
        ),
        "1) Edit each sentence to be complete and grammatically correct, while maintaining its length and meaning.",
        "2) Remember that each sentence should be a blend of sentence A and sentence B.",
        &format!(
            "This means all sentences should have aspects of both sentence A and sentence B, but with earlier sentences leaning more towards {anchor_a} and later sentences leaning more towards {anchor_b}."
        ),
        "This progression should be smooth and gradual, like a story that starts with sentence A and ends with sentence B.",
        &format!("3) {PLACEHOLDER_NOTE} If sentence A or sentence B contains any placeholders, add them accordingly to the interpolated sentences."),
        "4) Make sure there are no duplicate sentences, and no sentences end in commas.",
        "5) Format your response with one new sentence per line (separated with a \\n character).",
        &format!("Just generate the {count} new sentences without explanations:"),
    ]
    .join("\n");
    // rendered as a JSON array so quotes inside drafts stay unambiguous
    let list = serde_json::to_string(drafts).unwrap_or_else(|_| drafts.join("\n"));
    Prompt {
        system,
        user: format!("Sentences:\n{list}"),
    }
}

/// `count` prompt ideas for augmenting a dataset around `sentence`.
pub fn prompt_ideas(sentence: &str, count: usize) -> Prompt {
    let system = [
        "You are an expert prompt writer in charge of augmenting a dataset of sentences to increase the data diversity.",
        &format!(
            "Please come up with {count} prompt ideas you could send to a large language model to generate diverse variations of the provided sentence."
        ),
        "Remember you're not rewriting the sentence but coming up with ideas that would be useful to modify the sentence in various ways.",
        "Don't include the sentence or summarize details about it in the prompt. Each prompt should be concise and unique.",
        "Format your response with one prompt per line (separated with a \\n character), without numbers or bullet points.",
        &format!("Just generate the {count} prompts without explanations:"),
    ]
    .join("\n");
    Prompt {
        system,
        user: format!("Sentence: {sentence}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_orders_draft_then_example() {
        let p = correction("cat the sat", "The cat sat.");
        assert_eq!(p.user, "Sentence A: cat the sat\nSentence B: The cat sat.");
        assert!(p.system.contains("not identical to Sentence B"));
        assert!(p.system.contains("[name]"));
    }

    #[test]
    fn variation_states_count_twice() {
        let p = variation("Tell me about [city].", 4);
        assert!(p.system.contains("exactly 4 different variations"));
        assert!(p.system.contains("generate the 4 new sentences"));
        assert!(p.system.contains("same placeholders"));
        assert_eq!(p.user, "Sentence A: Tell me about [city].");
    }

    #[test]
    fn instructed_variation_embeds_instruction() {
        let p = instructed_variation("Hello.", 2, "make it a question");
        assert!(p.system.contains("by applying this instruction: make it a question."));
    }

    #[test]
    fn batch_correction_lists_drafts_and_anchors() {
        let drafts = vec!["a cat ran".to_string(), "dog \"sat\"".to_string()];
        let p = batch_correction(&drafts, "The cat sat.", "The dog ran.");
        assert!(p.system.contains("each of the 2 sentences"));
        assert!(p.system.contains("sentence A: 'The cat sat.'"));
        assert!(p.system.contains("no sentences end in commas"));
        assert_eq!(p.user, "Sentences:\n[\"a cat ran\",\"dog \\\"sat\\\"\"]");
    }

    #[test]
    fn prompt_ideas_forbid_numbering() {
        let p = prompt_ideas("Write a haiku.", 5);
        assert!(p.system.contains("5 prompt ideas"));
        assert!(p.system.contains("without numbers or bullet points"));
        assert_eq!(p.user, "Sentence: Write a haiku.");
    }
}
