use std::{collections::HashMap, sync::Arc};
use study_buddy_sdk::{
    google::{GoogleModel, GoogleModelOptions},
    openai::{OpenAIChatModel, OpenAIChatModelOptions},
    CompletionOrchestrator, LanguageModel,
};

pub fn get_orchestrator() -> CompletionOrchestrator {
    let mut builder = CompletionOrchestrator::builder();

    if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
        builder = builder.primary(Arc::new(GoogleModel::new(
            "gemini-1.5-flash",
            GoogleModelOptions {
                api_key,
                max_output_tokens: Some(2048),
                ..Default::default()
            },
        )));
    }

    if let Ok(api_key) = std::env::var("OPENROUTER_API_KEY") {
        let headers = HashMap::from([("X-Title".to_string(), "AI Study Buddy".to_string())]);
        let models = [
            "google/gemini-2.0-flash-exp:free",
            "mistralai/mistral-7b-instruct:free",
            "meta-llama/llama-3-8b-instruct:free",
        ]
        .into_iter()
        .map(|model_id| -> Arc<dyn LanguageModel> {
            Arc::new(OpenAIChatModel::new(
                model_id,
                OpenAIChatModelOptions {
                    base_url: Some("https://openrouter.ai/api/v1".to_string()),
                    api_key: api_key.clone(),
                    headers: Some(headers.clone()),
                    ..Default::default()
                },
            ))
        });
        builder = builder.fallbacks(models);
    }

    builder.build()
}
