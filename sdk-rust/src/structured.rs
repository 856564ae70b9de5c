use crate::{CompletionError, CompletionResult};
use serde::de::DeserializeOwned;

/// Slice from the first `[` to the last `]`, dropping whatever prose or code
/// fences the model wrapped around the array. Returns the input unchanged when
/// no such span exists.
#[must_use]
pub fn extract_json_array(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Parse a JSON array out of raw model output.
pub fn parse_json_array<T: DeserializeOwned>(text: &str) -> CompletionResult<Vec<T>> {
    serde_json::from_str(extract_json_array(text)).map_err(|error| {
        CompletionError::MalformedOutput(format!("expected a JSON array: {error}"))
    })
}
