use dotenvy::dotenv;
use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};
use study_buddy::{chat::GLOBAL_PROJECT, store::MemoryDocumentStore, StudyBuddy, StudyBuddyConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = StudyBuddyConfig::from_env();
    let buddy = StudyBuddy::from_config(&config, Arc::new(MemoryDocumentStore::new()));
    let session = buddy.session("demo");

    for message in session.chat().messages(GLOBAL_PROJECT).await? {
        println!("AI: {}", message.content);
    }

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/clear" {
            session.chat().clear_history(GLOBAL_PROJECT).await?;
            continue;
        }

        let reply = session.chat().send(GLOBAL_PROJECT, line, Vec::new()).await?;
        println!("AI: {}", reply.content);
    }

    Ok(())
}
