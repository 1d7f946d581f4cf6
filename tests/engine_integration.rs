#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! Engine integration tests
//!
//! Exercise the facade end to end: tenant isolation, conversation scopes,
//! grounded answers and log migration.

use docqa::answer::{Generator, NO_CONTEXT_REPLY, NOT_CONFIGURED_REPLY};
use docqa::config::{Config, EmbeddingBackend};
use docqa::ranking::ExcerptBound;
use docqa::scope::ScopeResolver;
use docqa::search_log::Role;
use docqa::store::PageInput;
use docqa::{DocqaError, Engine};
use std::sync::{Arc, Mutex};
use std::thread;

/// Generator that echoes a fixed reply and remembers each prompt
#[derive(Default)]
struct ScriptedGenerator {
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn calls(&self) -> usize {
        self.prompts.lock().expect("prompt lock").len()
    }

    fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .expect("prompt lock")
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(prompt.to_string());
        Ok("Rent is due on the first.".to_string())
    }
}

fn hashed_config() -> Config {
    let mut config = Config::default();
    config.embedding.backend = EmbeddingBackend::HashedToken;
    config
}

fn scopes(conversation: Option<&str>, namespace: Option<&str>) -> ScopeResolver {
    ScopeResolver::new(conversation, namespace)
}

fn lease_pages() -> Vec<PageInput> {
    vec![
        PageInput::new(1, "The tenant pays rent on the first day of each month."),
        PageInput::new(2, "Pets are allowed with a deposit."),
    ]
}

#[test]
fn tenants_do_not_see_each_other() {
    let engine = Engine::new(&hashed_config(), None);

    engine
        .ingest_pages(&scopes(None, Some("acme")), Some("lease"), lease_pages())
        .expect("ingest should succeed");
    engine.ingest_pages(
        &scopes(None, Some("globex")),
        Some("handbook"),
        vec![PageInput::new(1, "Vacation requests need two weeks notice.")],
    ).expect("ingest should succeed");

    let acme = engine.list(&scopes(None, Some("ACME")));
    assert_eq!(acme.len(), 1);
    assert_eq!(acme[0].name, "lease");

    let hits = engine
        .rank(
            &scopes(None, Some("globex")),
            "rent",
            Some(10),
            None,
            ExcerptBound::Preview,
        )
        .expect("rank should succeed");
    assert!(hits.iter().all(|hit| hit.scope == "globex"));
    assert!(hits.iter().all(|hit| hit.doc == "handbook"));
}

#[test]
fn conversation_documents_are_read_before_namespace_documents() {
    let engine = Engine::new(&hashed_config(), None);

    let report = engine
        .ingest_pages(&scopes(Some("c1"), Some("acme")), Some("lease"), lease_pages())
        .expect("ingest should succeed");
    assert_eq!(report.scopes, vec!["conv::c1".to_string(), "acme".to_string()]);
    assert_eq!(report.page_count, 2);

    let listed = engine.list(&scopes(Some("c1"), Some("acme")));
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].scope, "conv::c1");
    assert_eq!(listed[1].scope, "acme");

    let outsider = engine.list(&scopes(Some("c2"), Some("other")));
    assert!(outsider.is_empty());

    let health = engine.health();
    assert!(health.ok);
    assert_eq!(health.scopes, 2);
    assert_eq!(health.docs_total, 2);
    assert!(!health.ai_ready);
}

#[test]
fn grounded_answer_cites_retrieved_pages() {
    let generator = Arc::new(ScriptedGenerator::default());
    let engine = Engine::new(&hashed_config(), Some(generator.clone()));
    let ns = scopes(None, Some("acme"));

    engine.ingest_pages(&ns, Some("lease"), lease_pages()).expect("ingest should succeed");
    engine.ingest_pages(
        &ns,
        Some("memo"),
        vec![PageInput::new(1, "Parking is in the rear lot.")],
    ).expect("ingest should succeed");

    let allow = vec!["lease".to_string()];
    let answer = engine
        .answer(&ns, "When is rent due?", Some(2), Some(allow.as_slice()))
        .expect("answer should succeed");

    assert_eq!(answer.reply(), "Rent is due on the first.");
    assert_eq!(generator.calls(), 1);
    assert!(!answer.citations().is_empty());
    assert!(answer.citations().iter().all(|hit| hit.doc == "lease"));
    assert!(generator.last_prompt().contains("When is rent due?"));
    assert!(generator.last_prompt().contains("[acme:lease p.1]"));
}

#[test]
fn answer_without_documents_skips_generation() {
    let generator = Arc::new(ScriptedGenerator::default());
    let engine = Engine::new(&hashed_config(), Some(generator.clone()));

    let answer = engine
        .answer(&scopes(None, Some("empty")), "anything?", None, None)
        .expect("answer should succeed");

    assert_eq!(answer.reply(), NO_CONTEXT_REPLY);
    assert!(answer.citations().is_empty());
    assert_eq!(generator.calls(), 0);
}

#[test]
fn answer_without_generator_reports_not_configured() {
    let engine = Engine::new(&hashed_config(), None);
    engine
        .ingest_pages(&scopes(None, None), Some("lease"), lease_pages())
        .expect("ingest should succeed");

    let answer = engine
        .answer(&scopes(None, None), "rent?", None, None)
        .expect("answer should succeed");
    assert_eq!(answer.reply(), NOT_CONFIGURED_REPLY);
}

#[test]
fn blank_query_is_a_validation_error() {
    let engine = Engine::new(&hashed_config(), None);

    let result = engine.search_reply(&scopes(None, None), "   ", None);
    assert!(matches!(result, Err(DocqaError::Validation(_))));

    let result = engine.search_reply(&scopes(None, None), "rent", Some(0));
    assert!(matches!(result, Err(DocqaError::Validation(_))));
}

#[test]
fn conversation_log_moves_into_namespace() {
    let engine = Engine::new(&hashed_config(), None);

    engine.log_append("conv::c1", Role::User, "When is rent due?", None);
    engine.log_append("conv::c1", Role::Assistant, "On the first.", None);
    engine.log_append("acme", Role::User, "Earlier question", None);

    assert_eq!(engine.log_migrate("conv::c1", "acme"), 2);
    assert!(engine.log_entries("conv::c1").is_empty());

    let entries = engine.log_entries("acme");
    let contents: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["Earlier question", "When is rent due?", "On the first."]);

    assert_eq!(engine.log_migrate("conv::c1", "acme"), 0);
    assert_eq!(engine.log_clear("acme"), 3);
}

#[test]
fn concurrent_ingest_into_separate_tenants() {
    let engine = Arc::new(Engine::new(&hashed_config(), None));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let ns = format!("tenant{}", i);
                for doc in 0..5 {
                    engine.ingest_pages(
                        &scopes(None, Some(&ns)),
                        Some(&format!("doc{}", doc)),
                        vec![PageInput::new(1, format!("tenant {} doc {}", i, doc))],
                    ).expect("ingest should succeed");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("ingest thread should not panic");
    }

    let health = engine.health();
    assert_eq!(health.scopes, 8);
    assert_eq!(health.docs_total, 40);
    assert_eq!(engine.list(&scopes(None, Some("tenant3"))).len(), 5);
}

#[test]
fn ranking_during_replacement_sees_whole_documents() {
    const PAGES: u32 = 5;
    const ROUNDS: usize = 150;

    fn uniform(text: &str) -> Vec<PageInput> {
        (1..=PAGES).map(|page| PageInput::new(page, text)).collect()
    }

    let engine = Arc::new(Engine::new(&hashed_config(), None));
    engine
        .ingest_pages(&scopes(None, Some("acme")), Some("lease"), uniform("rent alpha"))
        .expect("ingest should succeed");

    let writers: Vec<_> = ["rent alpha", "rent beta"]
        .into_iter()
        .map(|text| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    engine
                        .ingest_pages(&scopes(None, Some("acme")), Some("lease"), uniform(text))
                        .expect("ingest should succeed");
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let hits = engine
                        .rank(
                            &scopes(None, Some("acme")),
                            "rent",
                            Some(50),
                            None,
                            ExcerptBound::Preview,
                        )
                        .expect("rank should succeed");
                    assert_eq!(hits.len(), PAGES as usize);
                    let first = &hits[0].excerpt;
                    assert!(hits.iter().all(|hit| &hit.excerpt == first));
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().expect("thread should not panic");
    }
}
