use super::api::{
    ChatCompletion, ChatCompletionAssistantMessageParam, ChatCompletionContentPart,
    ChatCompletionContentPartImage, ChatCompletionContentPartImageImageURL,
    ChatCompletionContentPartText, ChatCompletionCreateParams, ChatCompletionMessageParam,
    ChatCompletionSystemMessageParam, ChatCompletionUserContent, ChatCompletionUserMessageParam,
};
use crate::{
    client_utils, LanguageModel, LanguageModelError, LanguageModelInput, LanguageModelResult,
    Message, ModelResponse, ModelUsage, Part,
};
use futures::future::BoxFuture;
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::collections::HashMap;

const PROVIDER: &str = "openai";

/// A model served through an OpenAI-compatible `/chat/completions` endpoint,
/// such as `OpenAI` itself or `OpenRouter`.
pub struct OpenAIChatModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct OpenAIChatModelOptions {
    pub base_url: Option<String>,
    pub api_key: String,
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
}

impl OpenAIChatModel {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: OpenAIChatModelOptions) -> Self {
        let OpenAIChatModelOptions {
            base_url,
            api_key,
            headers,
            client,
        } = options;

        let base_url = base_url
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
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
        }
    }

    fn request_headers(&self) -> LanguageModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        let auth_header =
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid OpenAI API key header value: {error}"
                ))
            })?;
        headers.insert(header::AUTHORIZATION, auth_header);

        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid OpenAI header name '{key}': {error}"
                ))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid OpenAI header value for '{key}': {error}"
                ))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

impl LanguageModel for OpenAIChatModel {
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
                    let request = convert_to_openai_create_params(input, &self.model_id);
                    let headers = self.request_headers()?;

                    let response: ChatCompletion = client_utils::send_json(
                        &self.client,
                        &format!("{}/chat/completions", self.base_url),
                        &request,
                        headers,
                    )
                    .await?;

                    map_openai_response(response)
                },
            )
            .await
        })
    }
}

fn convert_to_openai_create_params(
    input: LanguageModelInput,
    model_id: &str,
) -> ChatCompletionCreateParams {
    let mut messages = Vec::with_capacity(input.messages.len() + 1);

    if let Some(system_prompt) = input.system_prompt {
        messages.push(ChatCompletionMessageParam::System(
            ChatCompletionSystemMessageParam {
                content: system_prompt,
            },
        ));
    }

    messages.extend(input.messages.into_iter().map(convert_to_openai_message));

    ChatCompletionCreateParams {
        messages,
        model: model_id.to_string(),
        max_tokens: input.max_tokens,
        temperature: input.temperature,
    }
}

fn convert_to_openai_message(message: Message) -> ChatCompletionMessageParam {
    match message {
        Message::User(user_message) => {
            let has_image = user_message
                .content
                .iter()
                .any(|part| matches!(part, Part::Image(_)));

            let content = if has_image {
                ChatCompletionUserContent::Parts(
                    user_message
                        .content
                        .into_iter()
                        .map(convert_to_openai_content_part)
                        .collect(),
                )
            } else {
                ChatCompletionUserContent::Text(join_text(&user_message.content))
            };

            ChatCompletionMessageParam::User(ChatCompletionUserMessageParam { content })
        }
        Message::Assistant(assistant_message) => {
            ChatCompletionMessageParam::Assistant(ChatCompletionAssistantMessageParam {
                content: join_text(&assistant_message.content),
            })
        }
    }
}

fn convert_to_openai_content_part(part: Part) -> ChatCompletionContentPart {
    match part {
        Part::Text(text_part) => ChatCompletionContentPart::Text(ChatCompletionContentPartText {
            text: text_part.text,
        }),
        Part::Image(image_part) => {
            ChatCompletionContentPart::Image(ChatCompletionContentPartImage {
                image_url: ChatCompletionContentPartImageImageURL {
                    url: image_part.to_data_url(),
                },
            })
        }
    }
}

fn join_text(parts: &[Part]) -> String {
    parts
        .iter()
        .map(Part::to_plain_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn map_openai_response(response: ChatCompletion) -> LanguageModelResult<ModelResponse> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        LanguageModelError::Invariant(PROVIDER, "No choices in response".to_string())
    })?;

    if let Some(refusal) = choice.message.refusal.filter(|r| !r.is_empty()) {
        return Err(LanguageModelError::Invariant(
            PROVIDER,
            format!("Model refused: {refusal}"),
        ));
    }

    let text = choice
        .message
        .content
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            LanguageModelError::Invariant(PROVIDER, "Empty message content".to_string())
        })?;

    Ok(ModelResponse {
        content: vec![Part::text(text)],
        usage: response.usage.map(|usage| ModelUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_prompt_leads_and_text_messages_stay_strings() {
        let input = LanguageModelInput {
            system_prompt: Some("You are a JSON generator.".to_string()),
            messages: vec![
                Message::user(vec![Part::text("Generate 2 flashcards")]),
                Message::assistant(vec![Part::text("[]")]),
            ],
            temperature: Some(0.8),
            max_tokens: None,
        };

        let request = convert_to_openai_create_params(input, "mistralai/mistral-7b-instruct:free");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "messages": [
                    { "role": "system", "content": "You are a JSON generator." },
                    { "role": "user", "content": "Generate 2 flashcards" },
                    { "role": "assistant", "content": "[]" }
                ],
                "model": "mistralai/mistral-7b-instruct:free",
                "temperature": 0.8
            })
        );
    }

    #[test]
    fn images_switch_user_content_to_parts() {
        let message = Message::user(vec![
            Part::text("What is in this diagram?"),
            Part::image("QUJD", "image/png"),
        ]);

        let value = serde_json::to_value(convert_to_openai_message(message)).unwrap();

        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": "What is in this diagram?" },
                    { "type": "image_url", "image_url": { "url": "data:image/png;base64,QUJD" } }
                ]
            })
        );
    }

    #[test]
    fn maps_first_choice_and_usage() {
        let response: ChatCompletion = serde_json::from_value(json!({
            "id": "gen-1",
            "model": "google/gemini-2.0-flash-exp:free",
            "choices": [
                { "index": 0, "finish_reason": "stop", "message": { "role": "assistant", "content": "Hi there!" } }
            ],
            "usage": { "prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13 }
        }))
        .unwrap();

        let response = map_openai_response(response).unwrap();
        assert_eq!(response.output_text().as_deref(), Some("Hi there!"));
        assert_eq!(
            response.usage,
            Some(ModelUsage {
                input_tokens: 10,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn missing_choices_and_empty_content_are_invariant_errors() {
        let response: ChatCompletion = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(
            map_openai_response(response),
            Err(LanguageModelError::Invariant("openai", _))
        ));

        let response: ChatCompletion = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "   " } }]
        }))
        .unwrap();
        assert!(matches!(
            map_openai_response(response),
            Err(LanguageModelError::Invariant("openai", _))
        ));
    }
}
