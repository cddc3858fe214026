//! Prompt templates and bounded context assembly

use crate::types::response::SearchResult;

/// Marker appended when the assembled context is cut at the budget
pub const TRUNCATION_MARKER: &str = "...";

/// Builder for generation inputs
pub struct PromptBuilder;

impl PromptBuilder {
    /// Assemble retrieved content into a single bounded context string
    ///
    /// Content fields are concatenated in retrieval order with single
    /// spaces, skipping results with empty content. When the combined
    /// length exceeds `budget` characters the string is cut at the budget
    /// and the truncation marker appended. Results are never re-ordered
    /// or dropped whole before the cut.
    pub fn build_context(results: &[SearchResult], budget: usize) -> String {
        let mut context = String::new();
        for result in results {
            let content = result.content();
            if content.is_empty() {
                continue;
            }
            if !context.is_empty() {
                context.push(' ');
            }
            context.push_str(content);
        }

        if let Some((cut, _)) = context.char_indices().nth(budget) {
            context.truncate(cut);
            context.push_str(TRUNCATION_MARKER);
        }

        context
    }

    /// Build the answer-generation prompt
    ///
    /// The model is instructed to answer only from the supplied context
    /// and to say so when the context does not contain the answer; that
    /// refusal text is surfaced to the caller as-is.
    pub fn build_answer_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Answer the following query based only on the provided context. If the context does not contain the information needed, respond that the answer is not available in the provided documents.

Query: {question}

Context:
{context}

Answer:"#,
            question = question,
            context = context
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(content: &str) -> SearchResult {
        let mut metadata = HashMap::new();
        metadata.insert("content".to_string(), serde_json::json!(content));
        SearchResult {
            id: "id".to_string(),
            score: 0.5,
            metadata,
        }
    }

    #[test]
    fn contents_join_with_single_spaces() {
        let results = vec![result("first"), result("second"), result("third")];
        assert_eq!(
            PromptBuilder::build_context(&results, 100),
            "first second third"
        );
    }

    #[test]
    fn empty_contents_are_skipped() {
        let results = vec![result("first"), result(""), result("third")];
        assert_eq!(PromptBuilder::build_context(&results, 100), "first third");
    }

    #[test]
    fn over_budget_context_is_cut_with_marker() {
        let results = vec![result(&"a".repeat(12000)), result(&"b".repeat(8000))];
        let context = PromptBuilder::build_context(&results, 15000);

        assert_eq!(context.chars().count(), 15000 + TRUNCATION_MARKER.len());
        assert!(context.ends_with(TRUNCATION_MARKER));

        // The kept portion is a prefix of the unbounded concatenation
        let unbounded = format!("{} {}", "a".repeat(12000), "b".repeat(8000));
        assert_eq!(&context[..15000], &unbounded[..15000]);
    }

    #[test]
    fn within_budget_context_is_untouched() {
        let results = vec![result("short context")];
        let context = PromptBuilder::build_context(&results, 15000);
        assert_eq!(context, "short context");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let results = vec![result(&"₹".repeat(20))];
        let context = PromptBuilder::build_context(&results, 10);
        assert_eq!(
            context.chars().count(),
            10 + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn prompt_embeds_question_and_context() {
        let prompt = PromptBuilder::build_answer_prompt("What was revenue?", "Revenue was 500M.");
        assert!(prompt.contains("Query: What was revenue?"));
        assert!(prompt.contains("Revenue was 500M."));
    }
}
