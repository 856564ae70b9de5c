use crate::{LanguageModelInput, LanguageModelResult, ModelResponse};
use futures::future::BoxFuture;

/// A model that can complete a conversation.
pub trait LanguageModel: Send + Sync {
    fn provider(&self) -> &'static str;
    fn model_id(&self) -> String;
    fn generate(
        &self,
        input: LanguageModelInput,
    ) -> BoxFuture<'_, LanguageModelResult<ModelResponse>>;
}
