//! Prompt builders for the cross-evaluation and arbiter stages.
//!
//! Domain logic for rendering judge prompts. Provider-agnostic; both builders
//! produce text-only prompts regardless of whether the original prompt
//! carried images.

use crate::pipeline::types::{GeneratedResponse, Prompt};

/// Marker sentence fixing the evaluator output contract. Kept as a constant so
/// tests (and mock judges) can recognize an evaluation call by its prompt.
pub const EVALUATION_FORMAT_MARKER: &str = "Return ONLY the JSON array, no other text.";

/// Marker sentence fixing the arbiter output contract.
pub const RANKING_FORMAT_MARKER: &str = "Return ONLY the JSON object, no other text.";

/// Build the prompt sent to every evaluator model.
///
/// Responses are enumerated with their stable 0-based index, matching the
/// `responseIndex` values the evaluator must echo back.
pub fn evaluation_prompt(original: &Prompt, responses: &[GeneratedResponse]) -> Prompt {
    let mut text = format!(
        "You are an expert evaluator of AI responses. Please evaluate the following \
         responses to this prompt:\n\nOriginal Prompt: \"{}\"\n\n",
        original.text
    );

    for (i, r) in responses.iter().enumerate() {
        text.push_str(&format!(
            "\nResponse {} (from {}):\n{}\n",
            i, r.display_name, r.text
        ));
    }

    text.push_str(&format!(
        "\n\nFor each response, provide a score from 1-10 based on:\n\
         - Quality and accuracy\n\
         - Clarity and coherence\n\
         - Relevance to the prompt\n\
         - Completeness\n\n\
         Return ONLY a JSON array with this exact format:\n\
         [\n\
         \x20 {{\"responseIndex\": 0, \"score\": 8.5, \"reasoning\": \"brief explanation\"}},\n\
         \x20 {{\"responseIndex\": 1, \"score\": 7.0, \"reasoning\": \"brief explanation\"}}\n\
         ]\n\n\
         Important: {EVALUATION_FORMAT_MARKER}"
    ));

    Prompt::text_only(text)
}

/// Build the prompt sent to the arbiter model over the top-three responses.
///
/// Positions 0..=2 follow the order of `top_three`, which is the selection
/// order from the aggregator, not rank order.
pub fn ranking_prompt(original: &Prompt, top_three: &[GeneratedResponse]) -> Prompt {
    let mut text = format!(
        "You are an expert AI evaluator. You must rank these 3 responses to the \
         following prompt from best to worst:\n\nOriginal Prompt: \"{}\"\n\n",
        original.text
    );

    for (i, r) in top_three.iter().enumerate() {
        text.push_str(&format!(
            "\nResponse {} (Model: {}):\n{}\n",
            i, r.display_name, r.text
        ));
    }

    text.push_str(&format!(
        "\n\nAnalyze each response based on:\n\
         - Accuracy and correctness\n\
         - Clarity and coherence\n\
         - Completeness\n\
         - Relevance to the prompt\n\
         - Overall quality\n\n\
         Return ONLY a JSON object with this exact format:\n\
         {{\n\
         \x20 \"ranking\": [0, 1, 2],\n\
         \x20 \"reasoning\": \"brief explanation of your ranking decision\"\n\
         }}\n\n\
         The \"ranking\" array should contain the response indices (0, 1, 2) ordered \
         from best to worst.\n\
         Important: {RANKING_FORMAT_MARKER}"
    ));

    Prompt::text_only(text)
}
