use dotenvy::dotenv;
use study_buddy_sdk::{LanguageModelInput, Message, Part};

mod common;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let orchestrator = common::get_orchestrator();

    let text = orchestrator
        .complete(LanguageModelInput {
            system_prompt: Some("You are a patient tutor.".to_string()),
            messages: vec![
                Message::user(vec![Part::text("Can you explain derivatives?")]),
                Message::assistant(vec![Part::text(
                    "Sure! Do you want the intuition or the formal definition?",
                )]),
                Message::user(vec![Part::text("the intuition")]),
            ],
            temperature: Some(0.8),
            ..Default::default()
        })
        .await
        .unwrap();

    println!("{text}");
}
