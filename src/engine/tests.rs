use std::sync::Mutex;

use super::*;
use crate::answer::{NO_CONTEXT_REPLY, NOT_CONFIGURED_REPLY};

/// Generator recording every prompt and answering with a fixed reply
#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock should not be poisoned").clone()
    }
}

impl Generator for RecordingGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .push(prompt.to_string());
        Ok("  grounded reply \n".to_string())
    }
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("service unavailable")
    }
}

fn engine_with(generator: Option<Arc<dyn Generator>>) -> Engine {
    Engine::new(&Config::default(), generator)
}

fn hints(conversation: Option<&str>, namespace: Option<&str>) -> ScopeResolver {
    ScopeResolver::new(conversation, namespace)
}

#[test]
fn ingest_writes_conversation_and_namespace() {
    let engine = engine_with(None);
    let report = engine.ingest_pages(
        &hints(Some("42"), Some("Acme")),
        Some("lease"),
        vec![PageInput::new(1, "Rent is due monthly.")],
    ).expect("ingest should succeed");

    assert_eq!(report.name, "lease");
    assert_eq!(report.page_count, 1);
    assert_eq!(report.scopes, vec!["conv::42", "acme"]);
    assert_eq!(engine.list(&hints(None, Some("acme"))).len(), 1);
    assert_eq!(engine.list(&hints(Some("42"), Some("Acme"))).len(), 2);
    assert_eq!(engine.list(&hints(Some("42"), None)).len(), 1);
}

#[test]
fn ingest_without_hints_goes_to_guest() {
    let engine = engine_with(None);
    let report = engine
        .ingest_pages(&ScopeResolver::default(), Some("doc"), Vec::new())
        .expect("ingest should succeed");
    assert_eq!(report.scopes, vec!["guest"]);
}

#[test]
fn missing_name_is_generated() {
    let engine = engine_with(None);
    for name in [None, Some("   ")] {
        let report = engine
            .ingest_pages(&ScopeResolver::default(), name, Vec::new())
            .expect("ingest should succeed");
        assert!(report.name.starts_with("doc_"));
        assert_eq!(report.name.len(), 10);
        assert!(
            report
                .name
                .trim_start_matches("doc_")
                .chars()
                .all(|c| c.is_ascii_hexdigit())
        );
    }
}

#[test]
fn ingest_text_uses_configured_slice_size() {
    let engine = engine_with(None);
    let text = "y".repeat(3300);

    let report = engine
        .ingest_text(&ScopeResolver::default(), Some("long"), &text, None)
        .expect("ingest should succeed");
    assert_eq!(report.page_count, 3);

    let report = engine
        .ingest_text(&ScopeResolver::default(), Some("long"), &text, Some(1000))
        .expect("ingest should succeed");
    assert_eq!(report.page_count, 4);

    let result = engine.ingest_text(&ScopeResolver::default(), Some("long"), &text, Some(0));
    assert!(matches!(result, Err(DocqaError::Validation(_))));
}

#[test]
fn search_reply_formats_hits() {
    let engine = engine_with(None);
    let scopes = hints(None, Some("acme"));
    let long_text = "a".repeat(300);
    engine
        .ingest_pages(&scopes, Some("notes"), vec![PageInput::new(4, long_text)])
        .expect("ingest should succeed");

    let reply = engine
        .search_reply(&scopes, "a", None)
        .expect("search should succeed");

    assert_eq!(reply.citations.len(), 1);
    assert_eq!(reply.citations[0].excerpt.chars().count(), 300);
    assert_eq!(
        reply.reply,
        format!("- [acme] notes p.4 (1.00): {}…", "a".repeat(200))
    );
}

#[test]
fn search_reply_without_matches() {
    let engine = engine_with(None);
    let reply = engine
        .search_reply(&hints(None, Some("empty")), "anything", Some(3))
        .expect("search should succeed");
    assert_eq!(reply.reply, NO_MATCHES_REPLY);
    assert!(reply.citations.is_empty());
}

#[test]
fn rank_rejects_blank_query_and_zero_k() {
    let engine = engine_with(None);
    let scopes = ScopeResolver::default();
    assert!(matches!(
        engine.rank(&scopes, "  ", None, None, ExcerptBound::Preview),
        Err(DocqaError::Validation(_))
    ));
    assert!(matches!(
        engine.rank(&scopes, "q", Some(0), None, ExcerptBound::Preview),
        Err(DocqaError::Validation(_))
    ));
}

#[test]
fn answer_without_generator_is_not_configured() {
    let engine = engine_with(None);
    let answer = engine
        .answer(&ScopeResolver::default(), "question", None, None)
        .expect("answer should succeed");
    assert_eq!(answer, Answer::NotConfigured);
    assert_eq!(answer.reply(), NOT_CONFIGURED_REPLY);
}

#[test]
fn answer_with_no_documents_skips_generator() {
    let generator = Arc::new(RecordingGenerator::default());
    let engine = engine_with(Some(Arc::clone(&generator) as Arc<dyn Generator>));

    let answer = engine
        .answer(&hints(Some("1"), None), "question", None, None)
        .expect("answer should succeed");

    assert_eq!(answer.reply(), NO_CONTEXT_REPLY);
    assert!(generator.prompts().is_empty());
}

#[test]
fn answer_builds_grounded_prompt() {
    let generator = Arc::new(RecordingGenerator::default());
    let engine = engine_with(Some(Arc::clone(&generator) as Arc<dyn Generator>));
    let scopes = hints(Some("7"), Some("acme"));
    engine.ingest_pages(
        &scopes,
        Some("lease"),
        vec![PageInput::new(3, "Rent is due monthly.")],
    ).expect("ingest should succeed");

    let answer = engine
        .answer(&scopes, "When is rent due?", Some(1), None)
        .expect("answer should succeed");

    assert_eq!(answer.reply(), "grounded reply");
    assert_eq!(answer.citations().len(), 1);
    assert_eq!(answer.citations()[0].scope, "conv::7");

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[conv::7:lease p.3] Rent is due monthly."));
    assert!(prompts[0].contains("Question: When is rent due?"));
}

#[test]
fn answer_respects_allow_list() {
    let generator = Arc::new(RecordingGenerator::default());
    let engine = engine_with(Some(Arc::clone(&generator) as Arc<dyn Generator>));
    let scopes = hints(None, Some("acme"));
    engine
        .ingest_pages(&scopes, Some("lease"), vec![PageInput::new(1, "lease text")])
        .expect("ingest should succeed");
    engine
        .ingest_pages(&scopes, Some("memo"), vec![PageInput::new(1, "memo text")])
        .expect("ingest should succeed");

    let allow = vec!["memo".to_string()];
    let answer = engine
        .answer(&scopes, "question", None, Some(&allow))
        .expect("answer should succeed");

    assert!(answer.citations().iter().all(|hit| hit.doc == "memo"));

    let allow = vec!["missing".to_string()];
    let answer = engine
        .answer(&scopes, "question", None, Some(&allow))
        .expect("answer should succeed");
    assert_eq!(answer, Answer::NoContext);
}

#[test]
fn answer_generator_failure_is_upstream() {
    let engine = engine_with(Some(Arc::new(FailingGenerator)));
    let scopes = ScopeResolver::default();
    engine
        .ingest_pages(&scopes, Some("d"), vec![PageInput::new(1, "text")])
        .expect("ingest should succeed");

    let result = engine.answer(&scopes, "question", None, None);
    assert!(matches!(result, Err(DocqaError::Upstream(_))));
}

#[test]
fn converse_paths() {
    assert_eq!(
        engine_with(None)
            .converse("hello")
            .expect("converse should succeed"),
        NOT_CONFIGURED_REPLY
    );

    let engine = engine_with(Some(Arc::new(RecordingGenerator::default())));
    assert_eq!(
        engine.converse("hello").expect("converse should succeed"),
        "grounded reply"
    );
    assert!(matches!(
        engine.converse(" "),
        Err(DocqaError::Validation(_))
    ));

    let engine = engine_with(Some(Arc::new(FailingGenerator)));
    assert!(matches!(
        engine.converse("hello"),
        Err(DocqaError::Upstream(_))
    ));
}

#[test]
fn log_operations_delegate() {
    let engine = engine_with(None);
    assert_eq!(engine.log_append("conv::1", Role::User, "q", None), 1);
    assert_eq!(engine.log_append("conv::1", Role::Assistant, "a", None), 2);
    assert_eq!(engine.log_migrate("conv::1", "acme"), 2);
    assert_eq!(engine.log_entries("acme").len(), 2);
    assert_eq!(engine.log_clear("acme"), 2);
    assert!(engine.search_log().entries("acme").is_empty());
}

#[test]
fn health_counts_scopes_and_documents() {
    let engine = engine_with(Some(Arc::new(RecordingGenerator::default())));
    engine
        .ingest_pages(&hints(Some("1"), Some("acme")), Some("a"), Vec::new())
        .expect("ingest should succeed");
    engine
        .ingest_pages(&hints(None, Some("acme")), Some("b"), Vec::new())
        .expect("ingest should succeed");

    assert_eq!(
        engine.health(),
        Health {
            ok: true,
            scopes: 2,
            docs_total: 3,
            ai_ready: true,
        }
    );
    assert!(!engine_with(None).health().ai_ready);
}

#[test]
fn from_config_rejects_invalid_configuration() {
    let mut config = Config::default();
    config.store.slice_size = 0;

    let result = Engine::from_config(&config);
    assert!(matches!(result, Err(DocqaError::Configuration(_))));
}

#[test]
fn page_zero_fails_ingest_and_keeps_prior_document() {
    let engine = engine_with(None);
    let scopes = hints(Some("7"), Some("acme"));
    engine
        .ingest_pages(&scopes, Some("lease"), vec![PageInput::new(1, "original")])
        .expect("ingest should succeed");

    let result = engine.ingest_pages(&scopes, Some("lease"), vec![PageInput::new(0, "zero")]);
    assert!(matches!(result, Err(DocqaError::Validation(_))));

    let listed = engine.list(&scopes);
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|doc| doc.page_count == 1));
}
