//! Prompt composition.

/// Separator between the question and the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Label that opens the context block.
pub const CONTEXT_LABEL: &str = "Context:\n";

/// Build the prompt sent to the model.
///
/// With no context (or an empty one) the question is returned unchanged.
/// Otherwise the full context text follows the question in a labeled block,
/// verbatim: it is never truncated or summarized.
pub fn compose(question: &str, context: Option<&str>) -> String {
    match context {
        Some(context) if !context.is_empty() => {
            let mut prompt = String::with_capacity(
                question.len() + CONTEXT_SEPARATOR.len() + CONTEXT_LABEL.len() + context.len(),
            );
            prompt.push_str(question);
            prompt.push_str(CONTEXT_SEPARATOR);
            prompt.push_str(CONTEXT_LABEL);
            prompt.push_str(context);
            prompt
        }
        _ => question.to_string(),
    }
}
