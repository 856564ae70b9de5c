use dotenvy::dotenv;
use std::sync::Arc;
use study_buddy::{store::MemoryDocumentStore, StudyBuddy, StudyBuddyConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let topic = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Photosynthesis".to_string());

    let config = StudyBuddyConfig::from_env();
    let buddy = StudyBuddy::from_config(&config, Arc::new(MemoryDocumentStore::new()));
    let session = buddy.session("demo");

    let set = session.flashcards().generate_set(&topic, 5, None).await?;
    for card in &set.cards {
        println!("Q: {}\nA: {}\n", card.front, card.back);
    }
    session.flashcards().record_study(&set.id, set.cards.len()).await?;

    // answers the first option every time
    let mut quiz = session.quizzes().start(&topic).await?;
    while let Some(question) = quiz.current() {
        println!("{}", question.text);
        if let Some(outcome) = quiz.answer(Some(0)) {
            println!("  -> {}", if outcome.is_correct { "correct" } else { "wrong" });
        }
    }
    println!("Score: {}/{} ({}%)", quiz.score(), quiz.total(), quiz.percentage());
    session.quizzes().record_result(&quiz).await?;

    for item in session.history().list().await? {
        println!("{:?}: {}", item.kind, item.title);
    }
    let stats = session.analytics().load().await?.stats;
    println!("Study hours: {:.2}", stats.total_hours);

    Ok(())
}
