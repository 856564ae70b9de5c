use super::api::{
    Blob, Content, GenerateContentConfig, GenerateContentParameters, GenerateContentResponse,
    Part as GooglePart, UsageMetadata,
};
use crate::{
    client_utils, LanguageModel, LanguageModelError, LanguageModelInput, LanguageModelResult,
    Message, ModelResponse, ModelUsage, Part,
};
use futures::future::BoxFuture;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::collections::HashMap;

const PROVIDER: &str = "google";

pub struct GoogleModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
    max_output_tokens: Option<u32>,
}

#[derive(Clone, Default)]
pub struct GoogleModelOptions {
    pub api_key: String,
    pub base_url: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
    /// Output token cap used when the input does not set `max_tokens`.
    pub max_output_tokens: Option<u32>,
}

impl GoogleModel {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: GoogleModelOptions) -> Self {
        let GoogleModelOptions {
            api_key,
            base_url,
            headers,
            client,
            max_output_tokens,
        } = options;

        let base_url = base_url
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string())
            .trim_end_matches('/')
            .to_string();
        let client = client.unwrap_or_else(Client::new);
        let headers = headers.unwrap_or_default();

        Self {
            model_id: model_id.into(),
            api_key,
            base_url,
            client,
            headers,
            max_output_tokens,
        }
    }

    fn request_headers(&self) -> LanguageModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid Google header name '{key}': {error}"
                ))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid Google header value for '{key}': {error}"
                ))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

impl LanguageModel for GoogleModel {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    fn generate(
        &self,
        input: LanguageModelInput,
    ) -> BoxFuture<'_, LanguageModelResult<ModelResponse>> {
        Box::pin(async move {
            crate::opentelemetry::trace_generate(
                self.provider(),
                &self.model_id(),
                input,
                |input| async move {
                    if self.api_key.is_empty() {
                        return Err(LanguageModelError::InvalidInput(
                            "Gemini API key missing".to_string(),
                        ));
                    }

                    let params =
                        convert_to_generate_content_parameters(input, self.max_output_tokens);

                    let url = format!(
                        "{}/models/{}:generateContent?key={}",
                        self.base_url, self.model_id, self.api_key
                    );

                    let headers = self.request_headers()?;
                    let response: GenerateContentResponse =
                        client_utils::send_json(&self.client, &url, &params, headers).await?;

                    map_google_response(response)
                },
            )
            .await
        })
    }
}

fn convert_to_generate_content_parameters(
    input: LanguageModelInput,
    default_max_output_tokens: Option<u32>,
) -> GenerateContentParameters {
    let system_instruction = input.system_prompt.map(|system_prompt| Content {
        role: None,
        parts: Some(vec![GooglePart {
            text: Some(system_prompt),
            ..Default::default()
        }]),
    });

    let generation_config = GenerateContentConfig {
        temperature: input.temperature,
        max_output_tokens: input.max_tokens.or(default_max_output_tokens),
    };

    GenerateContentParameters {
        contents: input.messages.into_iter().map(convert_to_google_content).collect(),
        system_instruction,
        generation_config: Some(generation_config),
    }
}

fn convert_to_google_content(message: Message) -> Content {
    let (role, parts) = match message {
        Message::User(message) => ("user", message.content),
        Message::Assistant(message) => ("model", message.content),
    };

    Content {
        role: Some(role.to_string()),
        parts: Some(parts.into_iter().map(convert_to_google_part).collect()),
    }
}

fn convert_to_google_part(part: Part) -> GooglePart {
    match part {
        Part::Text(text_part) => GooglePart {
            text: Some(text_part.text),
            ..Default::default()
        },
        Part::Image(image_part) => GooglePart {
            inline_data: Some(Blob {
                data: Some(image_part.image_data),
                mime_type: Some(image_part.mime_type),
            }),
            ..Default::default()
        },
    }
}

fn map_google_response(response: GenerateContentResponse) -> LanguageModelResult<ModelResponse> {
    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| {
            LanguageModelError::Invariant(PROVIDER, "No candidate in response".to_string())
        })?;

    let content: Vec<Part> = candidate
        .content
        .and_then(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| !part.thought.unwrap_or(false))
        .filter_map(|part| part.text.map(Part::text))
        .collect();

    if content.is_empty() {
        return Err(LanguageModelError::Invariant(
            PROVIDER,
            format!(
                "Candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    }

    Ok(ModelResponse {
        content,
        usage: response.usage_metadata.as_ref().map(map_google_usage),
    })
}

fn map_google_usage(usage: &UsageMetadata) -> ModelUsage {
    ModelUsage {
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_contents_with_model_role_and_system_instruction() {
        let input = LanguageModelInput {
            system_prompt: Some("You are a tutor.".to_string()),
            messages: vec![
                Message::user(vec![Part::text("What is 2 + 2?")]),
                Message::assistant(vec![Part::text("4")]),
                Message::user(vec![
                    Part::text("And this?"),
                    Part::image("AAAA", "image/png"),
                ]),
            ],
            temperature: Some(0.8),
            max_tokens: None,
        };

        let params = convert_to_generate_content_parameters(input, Some(2048));
        let value = serde_json::to_value(&params).unwrap();

        assert_eq!(
            value,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "What is 2 + 2?" }] },
                    { "role": "model", "parts": [{ "text": "4" }] },
                    { "role": "user", "parts": [
                        { "text": "And this?" },
                        { "inlineData": { "data": "AAAA", "mimeType": "image/png" } }
                    ] }
                ],
                "systemInstruction": { "parts": [{ "text": "You are a tutor." }] },
                "generationConfig": { "temperature": 0.8, "maxOutputTokens": 2048 }
            })
        );
    }

    #[test]
    fn maps_first_candidate_text_and_skips_thoughts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "Photosynthesis converts light into energy." }
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 7 }
        }))
        .unwrap();

        let response = map_google_response(response).unwrap();
        assert_eq!(
            response.output_text().as_deref(),
            Some("Photosynthesis converts light into energy.")
        );
        assert_eq!(
            response.usage,
            Some(ModelUsage {
                input_tokens: 12,
                output_tokens: 7
            })
        );
    }

    #[test]
    fn missing_candidates_is_an_invariant_error() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        let error = map_google_response(response).unwrap_err();
        assert!(matches!(error, LanguageModelError::Invariant("google", _)));
    }

    #[test]
    fn blocked_candidate_without_text_is_an_invariant_error() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let error = map_google_response(response).unwrap_err();
        assert!(error.to_string().contains("SAFETY"));
    }
}
