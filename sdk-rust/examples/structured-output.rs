use dotenvy::dotenv;
use serde::Deserialize;
use study_buddy_sdk::{LanguageModelInput, Message, Part};

mod common;

#[derive(Debug, Deserialize)]
struct Flashcard {
    front: String,
    back: String,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let orchestrator = common::get_orchestrator();

    let cards: Vec<Flashcard> = orchestrator
        .generate_json_array(LanguageModelInput {
            system_prompt: Some(
                "You are a JSON generator. Response must be ONLY a raw JSON array.".to_string(),
            ),
            messages: vec![Message::user(vec![Part::text(
                "Generate 3 flashcards about the French Revolution. Each object must have \"front\" and \"back\".",
            )])],
            ..Default::default()
        })
        .await
        .unwrap();

    for card in cards {
        println!("{} -> {}", card.front, card.back);
    }
}
