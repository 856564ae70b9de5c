use chrono::{DateTime, Local, NaiveDate, Weekday};
use futures::StreamExt;
use std::{collections::BTreeMap, sync::Arc};
use study_buddy::{
    history::HISTORY_LIMIT, store::MemoryDocumentStore, AnalyticsSnapshot, Attachment, HistoryItem,
    HistoryKind, StudyBuddy, StudyError, DEFAULT_SESSION_COLOR,
};
use study_buddy_sdk::{
    sdk_test::{MockGenerateResult, MockLanguageModel},
    CompletionError, CompletionOrchestrator,
};

fn setup() -> (StudyBuddy, Arc<MockLanguageModel>) {
    let model = Arc::new(MockLanguageModel::named("google", "gemini-1.5-flash"));
    let ai = CompletionOrchestrator::builder()
        .fallback(model.clone())
        .build();
    let buddy = StudyBuddy::new(ai, Arc::new(MemoryDocumentStore::new()));
    (buddy, model)
}

const QUIZ_JSON: &str = r#"Sure! Here is your quiz:
[
  {"id": 1, "text": "Powerhouse of the cell?", "options": ["Nucleus", "Mitochondria", "Ribosome", "Golgi"], "correct": 1},
  {"id": 2, "text": "DNA shape?", "options": ["Single helix", "Double helix", "Sheet", "Ring"], "correct": 1},
  {"id": 3, "text": "Cell membrane is made of?", "options": ["Lipids", "Sugars", "Metals", "Salt"], "correct": 0},
  {"id": 4, "text": "Plants make food by?", "options": ["Respiration", "Digestion", "Photosynthesis", "Osmosis"], "correct": 2},
  {"id": 5, "text": "Basic unit of life?", "options": ["Atom", "Organ", "Tissue", "Cell"], "correct": 3}
]"#;

#[tokio::test]
async fn generated_flashcard_set_is_stored_and_logged() {
    let (buddy, model) = setup();
    model.enqueue_generate(MockGenerateResult::text(
        "```json\n[{\"front\": \"2 + 2\", \"back\": \"4\"}, {\"front\": \"3 x 3\", \"back\": \"9\"}]\n```",
    ));
    let session = buddy.session("u1");

    let set = session
        .flashcards()
        .generate_set("Arithmetic", 2, Some("times tables"))
        .await
        .unwrap();
    assert_eq!(set.cards.len(), 2);
    assert_eq!(set.mastery, 0);
    assert_eq!(set.last_studied, None);

    let stored = session.flashcards().list().await.unwrap();
    assert_eq!(stored, vec![set.clone()]);

    let analytics = session.analytics().load().await.unwrap();
    assert_eq!(analytics.stats.flashcards_generated, 2);
    assert_eq!(analytics.stats.tasks_done, 1);
    assert!((analytics.stats.total_hours - 0.1).abs() < 1e-9);

    let history = session.history().list().await.unwrap();
    assert_eq!(history[0].kind, HistoryKind::Flashcards);
    assert_eq!(history[0].title, "Generated Arithmetic set");

    let input = &model.tracked_generate_inputs()[0];
    assert_eq!(
        input.system_prompt.as_deref(),
        Some("You are a JSON generator. Response must be ONLY a raw JSON array.")
    );
}

#[tokio::test]
async fn studying_a_set_updates_mastery_and_history() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");
    let set = session
        .flashcards()
        .create_set(
            "Capitals",
            None,
            vec![
                study_buddy::Flashcard {
                    front: "France".to_string(),
                    back: "Paris".to_string(),
                },
                study_buddy::Flashcard {
                    front: "Japan".to_string(),
                    back: "Tokyo".to_string(),
                },
                study_buddy::Flashcard {
                    front: "Peru".to_string(),
                    back: "Lima".to_string(),
                },
            ],
        )
        .await
        .unwrap();

    let mastery = session.flashcards().record_study(&set.id, 2).await.unwrap();
    assert_eq!(mastery, 67);

    let set = session.flashcards().get(&set.id).await.unwrap().unwrap();
    assert_eq!(set.mastery, 67);
    assert_eq!(set.last_studied, Some(Local::now().date_naive()));

    let history = session.history().list().await.unwrap();
    assert_eq!(history[0].title, "Studied Capitals");
    assert_eq!(history[0].metadata.get("score").map(String::as_str), Some("67% Mastery"));

    let error = session
        .flashcards()
        .update_mastery(&set.id, 101)
        .await
        .unwrap_err();
    assert!(matches!(error, StudyError::Validation(_)));

    let error = session.flashcards().record_study(&set.id, 4).await.unwrap_err();
    assert!(matches!(error, StudyError::Validation(_)));

    session.flashcards().delete(&set.id).await.unwrap();
    assert!(session.flashcards().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn quiz_round_is_scored_and_recorded() {
    let (buddy, model) = setup();
    model.enqueue_generate(MockGenerateResult::text(QUIZ_JSON));
    let session = buddy.session("u1");

    let mut quiz = session.quizzes().start("Biology").await.unwrap();
    assert_eq!(quiz.total(), 5);

    // right, right, wrong, timeout, right
    quiz.answer(Some(1));
    quiz.answer(Some(1));
    quiz.answer(Some(3));
    assert!(quiz.tick(15).is_some());
    quiz.answer(Some(3));
    assert!(quiz.is_finished());
    assert_eq!(quiz.score(), 3);

    session.quizzes().record_result(&quiz).await.unwrap();

    let analytics = session.analytics().load().await.unwrap();
    assert_eq!(analytics.stats.quiz_count, 1);
    assert_eq!(analytics.stats.quiz_score, 3);
    assert_eq!(analytics.stats.tasks_done, 1);
    assert!((analytics.stats.total_hours - 0.25).abs() < 1e-9);

    let history = session.history().list().await.unwrap();
    assert_eq!(history[0].title, "Completed Biology Quiz");
    assert_eq!(history[0].metadata.get("score").map(String::as_str), Some("3/5"));
}

#[tokio::test]
async fn unfinished_quiz_cannot_be_recorded() {
    let (buddy, model) = setup();
    model.enqueue_generate(MockGenerateResult::text(QUIZ_JSON));
    let session = buddy.session("u1");

    let quiz = session.quizzes().start("Biology").await.unwrap();
    let error = session.quizzes().record_result(&quiz).await.unwrap_err();
    assert!(matches!(error, StudyError::Validation(_)));
}

#[tokio::test]
async fn quiz_with_three_options_is_rejected() {
    let (buddy, model) = setup();
    model.enqueue_generate(MockGenerateResult::text(
        r#"[{"id": 1, "text": "Q", "options": ["A", "B", "C"], "correct": 0}]"#,
    ));
    let session = buddy.session("u1");

    let error = session.quizzes().generate("Chemistry").await.unwrap_err();
    assert!(matches!(
        error,
        StudyError::Completion(CompletionError::MalformedOutput(_))
    ));
}

#[tokio::test]
async fn summarizer_records_history_and_rejects_empty_text() {
    let (buddy, model) = setup();
    model.enqueue_generate(MockGenerateResult::text("## 📝 Key Takeaways\n- Water moves"));
    let session = buddy.session("u1");

    let error = session.summarizer().summarize("  \n ").await.unwrap_err();
    assert!(matches!(error, StudyError::Validation(_)));
    assert_eq!(model.generate_calls(), 0);

    let summary = session
        .summarizer()
        .summarize("Osmosis is the diffusion of water across a membrane.")
        .await
        .unwrap();
    assert!(summary.starts_with("## 📝 Key Takeaways"));

    let history = session.history().list().await.unwrap();
    assert_eq!(history[0].kind, HistoryKind::Summarizer);
    assert_eq!(history[0].title, "Summarized Osmosis is the diffusion of wa...");
}

#[tokio::test]
async fn summarizer_reads_uploaded_pdf_text() {
    let (buddy, model) = setup();
    model.enqueue_generate(MockGenerateResult::text("## 📝 Key Takeaways\n- Cells divide"));
    let session = buddy.session("u1");

    let error = session
        .summarizer()
        .summarize_attachment(&Attachment::image("cell.png", "image/png", b"ABC"))
        .await
        .unwrap_err();
    assert!(matches!(error, StudyError::Validation(_)));

    let lecture = Attachment::pdf_text("lecture.pdf", ["Mitosis", "Meiosis"]);
    session
        .summarizer()
        .summarize_attachment(&lecture)
        .await
        .unwrap();

    let input = &model.tracked_generate_inputs()[0];
    let prompt = input.messages[0].content()[0].to_plain_text();
    assert!(prompt.ends_with("Content to summarize:\n[Page 1]\nMitosis\n\n[Page 2]\nMeiosis"));

    let history = session.history().list().await.unwrap();
    assert_eq!(history[0].title, "Summarized [Page 1]\nMitosis\n\n[Page 2]\nMei...");
}

#[tokio::test]
async fn planner_validates_and_filters_by_day() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");
    let planner = session.planner();
    let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let tuesday = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();

    let essay = planner
        .schedule(
            "History Essay Draft",
            tuesday.and_hms_opt(14, 0, 0).unwrap(),
            120,
            None,
        )
        .await
        .unwrap();
    let exam = planner
        .schedule(
            "Calculus Exam",
            monday.and_hms_opt(9, 0, 0).unwrap(),
            180,
            Some("#ef4444"),
        )
        .await
        .unwrap();
    assert_eq!(essay.color, DEFAULT_SESSION_COLOR);

    let titles: Vec<String> = planner
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|session| session.title)
        .collect();
    assert_eq!(titles, vec!["Calculus Exam", "History Essay Draft"]);

    let on_monday = planner.on_day(monday).await.unwrap();
    assert_eq!(on_monday, vec![exam.clone()]);
    assert_eq!(on_monday[0].end(), monday.and_hms_opt(12, 0, 0).unwrap());

    assert!(matches!(
        planner.schedule(" ", monday.and_hms_opt(8, 0, 0).unwrap(), 30, None).await,
        Err(StudyError::Validation(_))
    ));
    assert!(matches!(
        planner.schedule("Review", monday.and_hms_opt(8, 0, 0).unwrap(), 0, None).await,
        Err(StudyError::Validation(_))
    ));

    planner.delete(&exam.id).await.unwrap();
    assert!(planner.on_day(monday).await.unwrap().is_empty());
}

fn history_item(title: &str, millis: i64) -> HistoryItem {
    HistoryItem {
        id: String::new(),
        kind: HistoryKind::Chat,
        title: title.to_string(),
        timestamp: DateTime::from_timestamp_millis(millis).unwrap(),
        metadata: BTreeMap::new(),
    }
}

#[tokio::test]
async fn history_lists_newest_first_up_to_the_limit() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");

    for index in 0..55 {
        session
            .history()
            .record(history_item(&format!("item {index}"), 1_700_000_000_000 + index))
            .await
            .unwrap();
    }

    let items = session.history().list().await.unwrap();
    assert_eq!(items.len(), HISTORY_LIMIT);
    assert_eq!(items[0].title, "item 54");
    assert_eq!(items[49].title, "item 5");
}

#[tokio::test]
async fn history_items_in_the_same_millisecond_list_latest_first() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");

    for title in ["Generated Bio set", "Studied Bio"] {
        session
            .history()
            .record(history_item(title, 1_700_000_000_000))
            .await
            .unwrap();
    }

    let titles: Vec<String> = session
        .history()
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect();
    assert_eq!(titles, vec!["Studied Bio", "Generated Bio set"]);
}

#[tokio::test]
async fn history_feed_follows_new_items() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");
    session
        .history()
        .record(history_item("first", 1_000))
        .await
        .unwrap();

    let mut feed = session.history().subscribe().await.unwrap();
    assert_eq!(feed.next().await.unwrap().len(), 1);

    session
        .history()
        .record(history_item("second", 2_000))
        .await
        .unwrap();
    let items = feed.next().await.unwrap();
    assert_eq!(items[0].title, "second");

    feed.clear();
    assert!(feed.items().is_empty());
}

#[tokio::test]
async fn analytics_subscription_sees_each_update() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");

    let mut snapshots = session.analytics().subscribe().await.unwrap();
    let initial = snapshots.next().await.unwrap();
    assert_eq!(initial, AnalyticsSnapshot::default());

    session.analytics().log_message().await.unwrap();
    let updated = snapshots.next().await.unwrap();
    assert_eq!(updated.stats.messages_sent, 1);

    session.analytics().log_quiz(4, 5).await.unwrap();
    let updated = snapshots.next().await.unwrap();
    assert_eq!(updated.stats.quiz_score, 4);
    assert_eq!(updated.stats.quiz_count, 1);
    assert_eq!(updated.stats.messages_sent, 1);
}

#[tokio::test]
async fn study_time_lands_on_the_given_weekday() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");

    session
        .analytics()
        .add_study_time_on(1.5, Weekday::Wed)
        .await
        .unwrap();
    let snapshot = session
        .analytics()
        .add_study_time_on(0.5, Weekday::Wed)
        .await
        .unwrap();

    let wednesday = snapshot
        .activity_data
        .iter()
        .find(|day| day.name == "Wed")
        .unwrap();
    assert!((wednesday.hours - 2.0).abs() < 1e-9);
    assert!((snapshot.stats.total_hours - 2.0).abs() < 1e-9);
    assert_eq!(session.analytics().load().await.unwrap(), snapshot);
}

#[tokio::test]
async fn focus_block_counts_a_session() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");

    session.focus().credit_focus_block(25).await.unwrap();

    let snapshot = session.analytics().load().await.unwrap();
    assert_eq!(snapshot.stats.sessions, 1);
    assert!((snapshot.stats.total_hours - 25.0 / 60.0).abs() < 1e-9);

    let history = session.history().list().await.unwrap();
    assert_eq!(history[0].kind, HistoryKind::Focus);
}

#[tokio::test]
async fn profiles_default_and_update() {
    let (buddy, _model) = setup();
    let session = buddy.session("u1");

    let profile = session.profiles().load().await.unwrap();
    assert_eq!(profile.name, "Student");
    assert_eq!(profile.avatar, "S");

    let created = session
        .profiles()
        .create("ada lovelace", "ada@example.com", "555-0100")
        .await
        .unwrap();
    assert_eq!(created.avatar, "A");
    assert_eq!(session.profiles().load().await.unwrap(), created);

    let updated = session.profiles().update("Grace", "555-0199").await.unwrap();
    assert_eq!(updated.name, "Grace");
    assert_eq!(updated.avatar, "G");
    assert_eq!(updated.phone, "555-0199");
    assert_eq!(updated.email, "ada@example.com");
}
