use crate::vector_store::ScoredChunk;

pub const NOT_ENOUGH_INFORMATION: &str = "I don't have enough information to answer that question.";

/// Builds the grounded-answer prompt: retrieved chunks joined by newlines, then the question.
pub fn build_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
    let context = chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Answer the following question based only on the provided context. \
If the answer is not in the context, say \"{NOT_ENOUGH_INFORMATION}\"

Context:
{context}

Question:
{question}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt() {
        let chunks = vec![
            ScoredChunk { content: "Paris is the capital of France.".to_string(), score: 0.9 },
            ScoredChunk { content: "Berlin is the capital of Germany.".to_string(), score: 0.4 },
        ];
        let prompt = build_prompt("What is the capital of France?", &chunks);

        assert!(prompt.starts_with("Answer the following question based only on the provided context."));
        assert!(prompt.contains(
            "say \"I don't have enough information to answer that question.\""
        ));
        assert!(prompt.contains(
            "Context:\nParis is the capital of France.\nBerlin is the capital of Germany.\n\nQuestion:\nWhat is the capital of France?\n"
        ));
    }

    #[test]
    fn test_build_prompt_without_context() {
        let prompt = build_prompt("Anything?", &[]);
        assert!(prompt.contains("Context:\n\n\nQuestion:\nAnything?"));
    }
}
