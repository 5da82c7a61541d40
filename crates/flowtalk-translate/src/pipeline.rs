//! The pipeline orchestrator.
//!
//! `translate_message` turns one stored message into per-language
//! translations: mask protected spans once, then for every target language
//! (bounded concurrency) either serve the translation from the cache or
//! protect the glossary, call the provider, restore, unmask, cache, and
//! append. Failures are per-target; the message settles `translated` as soon
//! as one target succeeds and `failed` only when every target failed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use flowtalk_shared::constants::{DEFAULT_TRANSLATE_CONCURRENCY, MAX_CONTENT_CODEPOINTS};
use flowtalk_shared::{Language, MessageId};
use flowtalk_store::{Database, MessageStatus, StoreError, TranslationRecord};

use crate::cache::{cache_key, TranslationCache};
use crate::detect::{Detection, LanguageDetector};
use crate::error::TranslateError;
use crate::glossary::{default_terms, GlossaryProtector, GlossaryTerm};
use crate::parser::{ContentParser, Segment};
use crate::provider::TranslateProvider;

/// The store handle shared between the HTTP layer and the pipeline.
pub type SharedDb = Arc<Mutex<Database>>;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bound on concurrent external translator calls.
    pub concurrency: usize,
    /// Maximum accepted message length in code points.
    pub max_content_codepoints: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_TRANSLATE_CONCURRENCY,
            max_content_codepoints: MAX_CONTENT_CODEPOINTS,
        }
    }
}

/// Per-target result of a fan-out run.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOutcome {
    Done {
        language: Language,
        from_cache: bool,
    },
    Failed {
        language: Language,
        reason: String,
    },
}

impl TargetOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, TargetOutcome::Done { .. })
    }

    pub fn language(&self) -> Language {
        match self {
            TargetOutcome::Done { language, .. } | TargetOutcome::Failed { language, .. } => {
                *language
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FanoutSummary {
    pub message_id: MessageId,
    /// True when another run already owns (or concluded) this message and no
    /// work was performed.
    pub skipped: bool,
    pub outcomes: Vec<TargetOutcome>,
}

impl FanoutSummary {
    fn skipped(message_id: MessageId) -> Self {
        Self {
            message_id,
            skipped: true,
            outcomes: Vec::new(),
        }
    }
}

pub struct TranslationPipeline {
    parser: ContentParser,
    detector: LanguageDetector,
    cache: Arc<TranslationCache>,
    provider: Arc<dyn TranslateProvider>,
    semaphore: Arc<Semaphore>,
    in_flight: Mutex<HashSet<MessageId>>,
}

impl TranslationPipeline {
    pub fn new(
        cache: Arc<TranslationCache>,
        provider: Arc<dyn TranslateProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            parser: ContentParser::with_max_codepoints(config.max_content_codepoints),
            detector: LanguageDetector::new(),
            cache,
            provider,
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn parser(&self) -> &ContentParser {
        &self.parser
    }

    pub fn detector(&self) -> &LanguageDetector {
        &self.detector
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Detect the source language of raw content, with protected spans masked
    /// out first for a cleaner signal.
    pub fn detect_source(&self, content: &str) -> Detection {
        let masked = self.parser.mask(content);
        self.detector.detect(&masked.text)
    }

    /// Translate a stored message into every target language.
    ///
    /// Concurrent invocations for the same message collapse: the in-flight set
    /// catches same-process races and the `sent -> translating` compare-and-
    /// swap catches everything else, so the second caller returns without
    /// duplicate work.
    pub async fn translate_message(
        &self,
        db: &SharedDb,
        message_id: MessageId,
        targets: &[Language],
    ) -> Result<FanoutSummary, TranslateError> {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(message_id) {
                debug!(id = %message_id, "translation already in flight, skipping");
                return Ok(FanoutSummary::skipped(message_id));
            }
        }

        let result = self.run(db, message_id, targets).await;

        self.in_flight.lock().await.remove(&message_id);
        result
    }

    async fn run(
        &self,
        db: &SharedDb,
        message_id: MessageId,
        targets: &[Language],
    ) -> Result<FanoutSummary, TranslateError> {
        match db.lock().await.update_status(
            message_id,
            MessageStatus::Sent,
            MessageStatus::Translating,
        ) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                debug!(id = %message_id, "message already past 'sent', skipping");
                return Ok(FanoutSummary::skipped(message_id));
            }
            Err(e) => return Err(e.into()),
        }

        let message = db.lock().await.get_message(message_id)?;

        // Drop duplicates and targets equal to the source. A romanized source
        // keeps its native language as a target: the translation is the
        // native-script rendering.
        let mut targets_filtered: Vec<Language> = Vec::new();
        for &target in targets {
            let same_as_source =
                target == message.source_language && !message.source_romanized;
            if !same_as_source && !targets_filtered.contains(&target) {
                targets_filtered.push(target);
            }
        }

        if targets_filtered.is_empty() {
            self.settle(db, message_id, 0, 0).await?;
            return Ok(FanoutSummary {
                message_id,
                skipped: false,
                outcomes: Vec::new(),
            });
        }

        let masked = self.parser.mask(&message.content);
        if self.parser.translatable_is_empty(&masked) {
            debug!(id = %message_id, "message is entirely protected content, nothing to translate");
            self.settle(db, message_id, 0, 0).await?;
            return Ok(FanoutSummary {
                message_id,
                skipped: false,
                outcomes: Vec::new(),
            });
        }

        let glossary = self.load_glossary(db, &message.channel_id).await?;

        let content = Arc::new(message.content.clone());
        let masked_text = Arc::new(masked.text);
        let segments: Arc<Vec<Segment>> = Arc::new(masked.segments);
        let terms: Arc<Vec<GlossaryTerm>> = Arc::new(glossary);

        let mut tasks = JoinSet::new();
        for target in targets_filtered {
            tasks.spawn(translate_one(
                db.clone(),
                self.cache.clone(),
                self.provider.clone(),
                self.semaphore.clone(),
                self.parser.clone(),
                content.clone(),
                masked_text.clone(),
                segments.clone(),
                terms.clone(),
                message_id,
                message.source_language,
                target,
            ));
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(id = %message_id, error = %e, "translation task aborted"),
            }
        }

        let successes = outcomes.iter().filter(|o| o.is_done()).count();
        self.settle(db, message_id, successes, outcomes.len()).await?;

        Ok(FanoutSummary {
            message_id,
            skipped: false,
            outcomes,
        })
    }

    /// Conclude the run: `translated` when at least one target succeeded (or
    /// there was nothing to do), `failed` when every target failed.
    async fn settle(
        &self,
        db: &SharedDb,
        message_id: MessageId,
        successes: usize,
        attempted: usize,
    ) -> Result<(), TranslateError> {
        let final_status = if attempted > 0 && successes == 0 {
            MessageStatus::Failed
        } else {
            MessageStatus::Translated
        };

        match db.lock().await.update_status(
            message_id,
            MessageStatus::Translating,
            final_status,
        ) {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict(_)) => {
                debug!(id = %message_id, "status already concluded elsewhere");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The merged glossary for the message's scope: community terms layered
    /// over stored defaults, layered over the bundled set.
    async fn load_glossary(
        &self,
        db: &SharedDb,
        channel_id: &flowtalk_shared::ChannelId,
    ) -> Result<Vec<GlossaryTerm>, TranslateError> {
        let db = db.lock().await;

        let scope = match db.glossary_scope_for_channel(*channel_id) {
            Ok(Some(community)) => Some(community.to_string()),
            Ok(None) => None,
            // Messages can outlive their channel records; fall back to the
            // default glossary rather than failing the fan-out.
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let stored = db
            .glossary_terms_for_scope(scope.as_deref())?
            .iter()
            .map(GlossaryTerm::from_record)
            .collect();

        Ok(GlossaryProtector::merge(default_terms(), stored))
    }
}

/// Translate a single target language: cache hit, or the full
/// protect -> provider -> restore -> unmask -> cache -> append chain.
#[allow(clippy::too_many_arguments)]
async fn translate_one(
    db: SharedDb,
    cache: Arc<TranslationCache>,
    provider: Arc<dyn TranslateProvider>,
    semaphore: Arc<Semaphore>,
    parser: ContentParser,
    content: Arc<String>,
    masked_text: Arc<String>,
    segments: Arc<Vec<Segment>>,
    terms: Arc<Vec<GlossaryTerm>>,
    message_id: MessageId,
    source: Language,
    target: Language,
) -> TargetOutcome {
    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            return TargetOutcome::Failed {
                language: target,
                reason: format!("worker pool unavailable: {e}"),
            }
        }
    };

    let key = cache_key(&content, target);
    if let Some(cached) = cache.get(&key).await {
        debug!(id = %message_id, target = target.code(), "translation served from cache");
        return append_translation(&db, message_id, target, cached, true).await;
    }

    let (protected, glossary_matches) = GlossaryProtector::protect(&masked_text, &terms);

    let raw = match provider.translate(&protected, source, target).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                id = %message_id,
                target = target.code(),
                error = %e,
                "translation failed"
            );
            return TargetOutcome::Failed {
                language: target,
                reason: e.to_string(),
            };
        }
    };

    let restored = GlossaryProtector::restore(&raw, &glossary_matches);
    let final_text = parser.unmask(&restored, &segments);

    cache.set(&key, &final_text).await;
    append_translation(&db, message_id, target, final_text, false).await
}

async fn append_translation(
    db: &SharedDb,
    message_id: MessageId,
    target: Language,
    translated_content: String,
    from_cache: bool,
) -> TargetOutcome {
    let record = TranslationRecord {
        target_language: target,
        translated_content,
        created_at: Utc::now(),
    };

    match db.lock().await.append_translation(message_id, &record) {
        Ok(inserted) => {
            if !inserted {
                debug!(
                    id = %message_id,
                    target = target.code(),
                    "translation already present, dropping duplicate"
                );
            }
            TargetOutcome::Done {
                language: target,
                from_cache,
            }
        }
        Err(e) => TargetOutcome::Failed {
            language: target,
            reason: format!("failed to persist translation: {e}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use flowtalk_shared::{ChannelId, CommunityId, UserId};
    use flowtalk_store::{
        ChannelRecord, CommunityRecord, MessageRecord, UserRecord,
    };

    use crate::cache::CacheConfig;

    struct IdentityProvider;

    #[async_trait]
    impl TranslateProvider for IdentityProvider {
        async fn translate(
            &self,
            text: &str,
            _source: Language,
            _target: Language,
        ) -> Result<String, TranslateError> {
            Ok(text.to_string())
        }
    }

    /// Uppercases everything it is given; placeholders survive because they
    /// contain no lowercase ASCII.
    struct UppercaseProvider;

    #[async_trait]
    impl TranslateProvider for UppercaseProvider {
        async fn translate(
            &self,
            text: &str,
            _source: Language,
            _target: Language,
        ) -> Result<String, TranslateError> {
            Ok(text.to_uppercase())
        }
    }

    /// Prefixes the output with the target tag, counting every call.
    struct TaggingProvider {
        calls: AtomicUsize,
    }

    impl TaggingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TranslateProvider for TaggingProvider {
        async fn translate(
            &self,
            text: &str,
            _source: Language,
            target: Language,
        ) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("[{}] {}", target.code(), text))
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl TranslateProvider for FailingProvider {
        async fn translate(
            &self,
            _text: &str,
            _source: Language,
            _target: Language,
        ) -> Result<String, TranslateError> {
            Err(TranslateError::Provider {
                status: Some(500),
                message: "provider down".to_string(),
            })
        }
    }

    /// Fails only for one specific target language.
    struct SelectiveFailProvider {
        failing: Language,
    }

    #[async_trait]
    impl TranslateProvider for SelectiveFailProvider {
        async fn translate(
            &self,
            text: &str,
            _source: Language,
            target: Language,
        ) -> Result<String, TranslateError> {
            if target == self.failing {
                Err(TranslateError::Provider {
                    status: Some(500),
                    message: "target unavailable".to_string(),
                })
            } else {
                Ok(format!("[{}] {}", target.code(), text))
            }
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        db: SharedDb,
        channel: ChannelId,
        sender: UserId,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let sender = UserId::new();
        db.create_user(&UserRecord {
            id: sender,
            email: "erin@example.com".to_string(),
            username: "erin".to_string(),
            password_hash: "ab$cd".to_string(),
            primary_language: Language::En,
            avatar: None,
            status: None,
            created_at: Utc::now(),
        })
        .unwrap();

        let community = CommunityRecord {
            id: CommunityId::new(),
            name: "rustaceans".to_string(),
            description: None,
            created_at: Utc::now(),
        };
        db.create_community(&community).unwrap();
        db.add_member(community.id, sender).unwrap();

        let channel = ChannelRecord {
            id: ChannelId::new(),
            community_id: community.id,
            name: "general".to_string(),
            description: None,
            created_at: Utc::now(),
        };
        db.create_channel(&channel).unwrap();

        Fixture {
            _dir: dir,
            db: Arc::new(Mutex::new(db)),
            channel: channel.id,
            sender,
        }
    }

    async fn post_message(fx: &Fixture, content: &str, source: Language) -> MessageId {
        post_message_romanized(fx, content, source, false).await
    }

    async fn post_message_romanized(
        fx: &Fixture,
        content: &str,
        source: Language,
        romanized: bool,
    ) -> MessageId {
        let message = MessageRecord {
            id: MessageId::new(),
            channel_id: fx.channel,
            sender_id: fx.sender,
            content: content.to_string(),
            source_language: source,
            source_romanized: romanized,
            status: MessageStatus::Sent,
            timestamp: Utc::now(),
            attachment: None,
            translations: Vec::new(),
        };
        fx.db.lock().await.create_message(&message).unwrap();
        message.id
    }

    fn pipeline_with(provider: Arc<dyn TranslateProvider>) -> Arc<TranslationPipeline> {
        let cache = Arc::new(TranslationCache::new(CacheConfig::default()));
        Arc::new(TranslationPipeline::new(
            cache,
            provider,
            PipelineConfig::default(),
        ))
    }

    #[tokio::test]
    async fn fans_out_to_every_target_language() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(TaggingProvider::new()));
        let id = post_message(&fx, "Hello world, how is everyone doing", Language::En).await;

        let summary = pipeline
            .translate_message(&fx.db, id, &[Language::Es, Language::Fr])
            .await
            .unwrap();

        assert!(!summary.skipped);
        assert_eq!(summary.outcomes.len(), 2);
        assert!(summary.outcomes.iter().all(|o| o.is_done()));

        let message = fx.db.lock().await.get_message(id).unwrap();
        assert_eq!(message.status, MessageStatus::Translated);
        let langs: Vec<_> = message
            .translations
            .iter()
            .map(|t| t.target_language)
            .collect();
        assert!(langs.contains(&Language::Es));
        assert!(langs.contains(&Language::Fr));
        assert!(!langs.contains(&Language::En));
    }

    #[tokio::test]
    async fn source_language_is_not_a_target() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(TaggingProvider::new()));
        let id = post_message(&fx, "Hello world, how is everyone doing", Language::En).await;

        let summary = pipeline
            .translate_message(&fx.db, id, &[Language::En, Language::Es])
            .await
            .unwrap();

        assert_eq!(summary.outcomes.len(), 1);
        assert_eq!(summary.outcomes[0].language(), Language::Es);
    }

    #[tokio::test]
    async fn code_survives_round_trip_under_identity_translator() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(IdentityProvider));
        let content =
            "Use `console.log()` like this:\n```js\nconsole.log(\"hello\")\n```";
        let id = post_message(&fx, content, Language::En).await;

        pipeline
            .translate_message(&fx.db, id, &[Language::Es])
            .await
            .unwrap();

        let message = fx.db.lock().await.get_message(id).unwrap();
        assert_eq!(message.translations.len(), 1);
        let translated = &message.translations[0].translated_content;
        assert_eq!(translated, content);
        assert!(translated.contains("`console.log()`"));
        assert!(translated.contains("```js\nconsole.log(\"hello\")\n```"));
    }

    #[tokio::test]
    async fn glossary_terms_survive_a_hostile_translator() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(UppercaseProvider));
        let id = post_message(&fx, "FlowTalk is great for teams", Language::En).await;

        pipeline
            .translate_message(&fx.db, id, &[Language::Es])
            .await
            .unwrap();

        let message = fx.db.lock().await.get_message(id).unwrap();
        let translated = &message.translations[0].translated_content;
        assert!(
            translated.contains("FlowTalk"),
            "brand must keep its case, got: {translated}"
        );
        assert!(translated.contains("IS GREAT"));
    }

    #[tokio::test]
    async fn cache_serves_the_second_identical_message() {
        let fx = fixture();
        let provider = Arc::new(TaggingProvider::new());
        let pipeline = pipeline_with(provider.clone());

        let first = post_message(&fx, "Good morning team, shipping today", Language::En).await;
        let second = post_message(&fx, "Good morning team, shipping today", Language::En).await;

        let summary_one = pipeline
            .translate_message(&fx.db, first, &[Language::Fr])
            .await
            .unwrap();
        let summary_two = pipeline
            .translate_message(&fx.db, second, &[Language::Fr])
            .await
            .unwrap();

        assert_eq!(
            summary_one.outcomes[0],
            TargetOutcome::Done {
                language: Language::Fr,
                from_cache: false
            }
        );
        assert_eq!(
            summary_two.outcomes[0],
            TargetOutcome::Done {
                language: Language::Fr,
                from_cache: true
            }
        );

        // One external call for two messages; the stats prove the hit.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        let stats = pipeline.cache().stats().await;
        assert!(stats.hits >= 1);

        let one = fx.db.lock().await.get_message(first).unwrap();
        let two = fx.db.lock().await.get_message(second).unwrap();
        assert_eq!(
            one.translations[0].translated_content,
            two.translations[0].translated_content
        );
    }

    #[tokio::test]
    async fn disabled_cache_still_produces_translations() {
        let fx = fixture();
        let provider = Arc::new(TaggingProvider::new());
        let cache = Arc::new(TranslationCache::new(CacheConfig::disabled()));
        let pipeline = Arc::new(TranslationPipeline::new(
            cache,
            provider.clone(),
            PipelineConfig::default(),
        ));

        let first = post_message(&fx, "Good morning team, shipping today", Language::En).await;
        let second = post_message(&fx, "Good morning team, shipping today", Language::En).await;

        for id in [first, second] {
            let summary = pipeline
                .translate_message(&fx.db, id, &[Language::Fr])
                .await
                .unwrap();
            assert_eq!(
                summary.outcomes[0],
                TargetOutcome::Done {
                    language: Language::Fr,
                    from_cache: false
                }
            );
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn all_failed_targets_settle_failed() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(FailingProvider));
        let id = post_message(&fx, "Hello world, how is everyone doing", Language::En).await;

        let summary = pipeline
            .translate_message(&fx.db, id, &[Language::Es, Language::Fr])
            .await
            .unwrap();

        assert!(summary.outcomes.iter().all(|o| !o.is_done()));
        let message = fx.db.lock().await.get_message(id).unwrap();
        assert_eq!(message.status, MessageStatus::Failed);
        assert!(message.translations.is_empty());
    }

    #[tokio::test]
    async fn partial_failure_settles_translated() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(SelectiveFailProvider {
            failing: Language::Fr,
        }));
        let id = post_message(&fx, "Hello world, how is everyone doing", Language::En).await;

        let summary = pipeline
            .translate_message(&fx.db, id, &[Language::Es, Language::Fr])
            .await
            .unwrap();

        let done: Vec<_> = summary.outcomes.iter().filter(|o| o.is_done()).collect();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].language(), Language::Es);

        let message = fx.db.lock().await.get_message(id).unwrap();
        assert_eq!(message.status, MessageStatus::Translated);
        assert_eq!(message.translations.len(), 1);
        assert_eq!(message.translations[0].target_language, Language::Es);
    }

    #[tokio::test]
    async fn zero_targets_settles_translated_with_no_translations() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(TaggingProvider::new()));
        let id = post_message(&fx, "Hello world, how is everyone doing", Language::En).await;

        let summary = pipeline.translate_message(&fx.db, id, &[]).await.unwrap();

        assert!(summary.outcomes.is_empty());
        let message = fx.db.lock().await.get_message(id).unwrap();
        assert_eq!(message.status, MessageStatus::Translated);
        assert!(message.translations.is_empty());
    }

    #[tokio::test]
    async fn entirely_code_message_needs_no_provider() {
        let fx = fixture();
        let provider = Arc::new(TaggingProvider::new());
        let pipeline = pipeline_with(provider.clone());
        let id = post_message(&fx, "```\nlet x = 1;\n```", Language::En).await;

        pipeline
            .translate_message(&fx.db, id, &[Language::Es, Language::Fr])
            .await
            .unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        let message = fx.db.lock().await.get_message(id).unwrap();
        assert_eq!(message.status, MessageStatus::Translated);
        assert!(message.translations.is_empty());
    }

    #[tokio::test]
    async fn repeated_invocation_is_idempotent() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(TaggingProvider::new()));
        let id = post_message(&fx, "Hello world, how is everyone doing", Language::En).await;

        let first = pipeline
            .translate_message(&fx.db, id, &[Language::Es])
            .await
            .unwrap();
        let second = pipeline
            .translate_message(&fx.db, id, &[Language::Es])
            .await
            .unwrap();

        assert!(!first.skipped);
        assert!(second.skipped);

        let message = fx.db.lock().await.get_message(id).unwrap();
        assert_eq!(message.translations.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_invocations_collapse() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(TaggingProvider::new()));
        let id = post_message(&fx, "Hello world, how is everyone doing", Language::En).await;

        let (a, b) = tokio::join!(
            pipeline.translate_message(&fx.db, id, &[Language::Es]),
            pipeline.translate_message(&fx.db, id, &[Language::Es]),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.skipped != b.skipped, "exactly one run should do the work");

        let message = fx.db.lock().await.get_message(id).unwrap();
        assert_eq!(message.translations.len(), 1);
        assert_eq!(message.status, MessageStatus::Translated);
    }

    #[tokio::test]
    async fn romanized_source_still_translates_to_native_script_target() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(TaggingProvider::new()));
        let id =
            post_message_romanized(&fx, "muje aapki help chahiye", Language::Hi, true).await;

        let summary = pipeline
            .translate_message(&fx.db, id, &[Language::En, Language::Hi])
            .await
            .unwrap();

        assert_eq!(summary.outcomes.len(), 2);

        let message = fx.db.lock().await.get_message(id).unwrap();
        for translation in &message.translations {
            assert!(!translation.translated_content.is_empty());
            assert_ne!(translation.translated_content, message.content);
        }
    }

    #[tokio::test]
    async fn missing_message_is_a_store_error() {
        let fx = fixture();
        let pipeline = pipeline_with(Arc::new(IdentityProvider));

        let result = pipeline
            .translate_message(&fx.db, MessageId::new(), &[Language::Es])
            .await;
        assert!(matches!(
            result,
            Err(TranslateError::Store(StoreError::NotFound))
        ));
    }
}
