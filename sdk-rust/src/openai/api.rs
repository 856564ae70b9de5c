use serde::{Deserialize, Serialize};

// https://platform.openai.com/docs/api-reference/chat
// OpenRouter accepts the same request and response shapes.

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatCompletionCreateParams {
    /// A list of messages comprising the conversation so far.
    pub messages: Vec<ChatCompletionMessageParam>,

    /// Model ID used to generate the response, like `gpt-4o` or
    /// `mistralai/mistral-7b-instruct:free`.
    pub model: String,

    /// An upper bound for the number of tokens that can be generated for a
    /// completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// What sampling temperature to use, between 0 and 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatCompletionMessageParam {
    System(ChatCompletionSystemMessageParam),
    User(ChatCompletionUserMessageParam),
    Assistant(ChatCompletionAssistantMessageParam),
}

/// Developer-provided instructions that the model should follow, regardless of
/// messages sent by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionSystemMessageParam {
    /// The contents of the system message.
    pub content: String,
}

/// Messages sent by an end user, containing prompts or additional context
/// information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionUserMessageParam {
    /// The contents of the user message.
    pub content: ChatCompletionUserContent,
}

/// Plain text for text-only messages, a part list once images are involved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatCompletionUserContent {
    Text(String),
    Parts(Vec<ChatCompletionContentPart>),
}

/// Messages sent by the model in response to user messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionAssistantMessageParam {
    /// The contents of the assistant message.
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatCompletionContentPart {
    Text(ChatCompletionContentPartText),
    #[serde(rename = "image_url")]
    Image(ChatCompletionContentPartImage),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatCompletionContentPartText {
    /// The text content.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionContentPartImage {
    pub image_url: ChatCompletionContentPartImageImageURL,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionContentPartImageImageURL {
    /// Either a URL of the image or the base64 encoded image data.
    pub url: String,
}

/// Represents a chat completion response returned by model, based on the
/// provided input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// A list of chat completion choices.
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,

    /// The model used for the chat completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Usage statistics for the completion request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    /// The reason the model stopped generating tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// A chat completion message generated by the model.
    pub message: ChatCompletionMessage,
}

/// A chat completion message generated by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    /// The contents of the message.
    pub content: Option<String>,

    /// The refusal message generated by the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
}

/// Usage statistics for the completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionUsage {
    /// Number of tokens in the generated completion.
    pub completion_tokens: u32,

    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,
}
