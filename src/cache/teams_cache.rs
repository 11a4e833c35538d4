//! The cache facade.
//!
//! [`TeamsCache`] owns a record source and a build-once gate. The first query
//! triggers the build pass; concurrent first callers wait for it; every later
//! query reads the published index. A failed build is remembered and returned to
//! every caller until [`TeamsCache::reset`] is called.

use std::sync::Arc;

use crate::config::{ConfigHelper, QueryConfig};
use crate::leveldb::{LevelDbDirectory, RecordSource};
use crate::model::{
    CallRecord, Conversation, ConversationHistory, Message, Participant, SearchMatch, Summary,
    UserStats,
};
use crate::projector::CacheIndex;
use crate::query::QueryEngine;
use crate::render::{HtmlTextRenderer, TextRenderer};
use crate::util::BuildGate;

use super::build::{build_index, BuildSettings};
use super::error::{CacheError, Result};
use super::locate::locate_cache;

// =============================================================================
// TeamsCache
// =============================================================================

/// Lazily built, read-only view of a Teams cache.
pub struct TeamsCache {
    source: Arc<dyn RecordSource>,
    settings: BuildSettings,
    query: QueryConfig,
    renderer: Arc<dyn TextRenderer>,
    gate: BuildGate<CacheIndex, CacheError>,
}

impl TeamsCache {
    /// Create a cache over `source` with default query limits and HTML rendering.
    pub fn new(source: Arc<dyn RecordSource>, settings: BuildSettings) -> Self {
        Self {
            source,
            settings,
            query: crate::config::default_config().query,
            renderer: Arc::new(HtmlTextRenderer),
            gate: BuildGate::new(),
        }
    }

    /// Create a cache as configured: the configured path, else the platform location.
    ///
    /// Fails with `CacheNotFound` or `UnsupportedPlatform` before any build is attempted.
    pub fn open(config: &ConfigHelper) -> Result<Self> {
        let path = match config.cache_path() {
            Some(path) => path.to_path_buf(),
            None => locate_cache()?,
        };
        tracing::debug!("using cache at {}", path.display());

        let cache = Self::new(Arc::new(LevelDbDirectory::new(path)), config.build_settings())
            .with_query_config(*config.query());
        Ok(cache)
    }

    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn TextRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    /// Whether the build pass has completed, successfully or not.
    pub fn is_built(&self) -> bool {
        self.gate.is_built()
    }

    /// Number of build passes started so far.
    pub fn build_count(&self) -> usize {
        self.gate.build_count()
    }

    /// The built index, running the build pass on first use.
    pub async fn index(&self) -> Result<Arc<CacheIndex>> {
        if self.gate.is_built() {
            tracing::debug!("reusing built cache index");
        }
        self.gate
            .get_or_build(|| build_index(self.source.as_ref(), &self.settings))
            .await
    }

    /// A query engine over the built index.
    pub async fn engine(&self) -> Result<QueryEngine> {
        let index = self.index().await?;
        Ok(
            QueryEngine::new(index, Arc::clone(&self.renderer), self.location())
                .with_snippet_length(self.query.snippet_length),
        )
    }

    /// Forget the build outcome so the next query rebuilds.
    pub fn reset(&mut self) {
        tracing::info!("resetting cache index for {}", self.location());
        self.gate.reset();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Conversations, optionally of one type; `limit` defaults to the configured list limit.
    pub async fn list_conversations(
        &self,
        type_filter: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Conversation>> {
        let limit = limit.unwrap_or(self.query.list_limit);
        Ok(self.engine().await?.list_conversations(type_filter, Some(limit)))
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.engine().await?.get_conversation(id))
    }

    pub async fn get_messages(
        &self,
        conversation_id: &str,
        include_system: bool,
    ) -> Result<Vec<Message>> {
        Ok(self.engine().await?.get_messages(conversation_id, include_system))
    }

    pub async fn conversation_history(
        &self,
        conversation_id: &str,
        include_system: bool,
    ) -> Result<Option<ConversationHistory>> {
        Ok(self
            .engine()
            .await?
            .conversation_history(conversation_id, include_system))
    }

    pub async fn search_messages(
        &self,
        query: &str,
        from_user: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<SearchMatch>> {
        let limit = limit.unwrap_or(self.query.search_limit);
        Ok(self.engine().await?.search_messages(query, from_user, limit))
    }

    pub async fn get_call_history(&self, limit: Option<usize>) -> Result<Vec<CallRecord>> {
        let limit = limit.unwrap_or(self.query.call_limit);
        Ok(self.engine().await?.get_call_history(limit))
    }

    pub async fn get_participants(&self, conversation_id: &str) -> Result<Vec<Participant>> {
        Ok(self.engine().await?.get_participants(conversation_id))
    }

    pub async fn search_by_participant(
        &self,
        name_part: &str,
        type_filter: Option<&str>,
    ) -> Result<Vec<Conversation>> {
        Ok(self
            .engine()
            .await?
            .search_by_participant(name_part, type_filter))
    }

    pub async fn participant_directory(&self) -> Result<Vec<Participant>> {
        Ok(self.engine().await?.participant_directory())
    }

    pub async fn get_summary(&self) -> Result<Summary> {
        Ok(self.engine().await?.get_summary())
    }

    pub async fn get_user_stats(&self, user_name: Option<&str>) -> Result<UserStats> {
        Ok(self.engine().await?.get_user_stats(user_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::leveldb::{MemoryRecordSource, RawRecord};
    use crate::render::PlainTextRenderer;
    use crate::test_support::{
        build_log, member, message, reply_chain, TeamsFixture, WriteBatchBuilder,
    };
    use serde_json::json;
    use tempfile::TempDir;

    fn fixture() -> TeamsFixture {
        let mut fixture = TeamsFixture::new();
        fixture
            .conversation(json!({
                "id": "19:meeting@thread.v2",
                "type": "Meeting",
                "threadProperties": { "topic": "Planning" },
                "members": [member("8:orgid:abc", "Alice"), member("8:orgid:def", "Bob")]
            }))
            .conversation(json!({
                "id": "48:calllogs",
                "type": "Thread",
                "members": [member("8:orgid:abc", "Alice")]
            }))
            .reply_chain(reply_chain(vec![
                message("19:meeting@thread.v2", "8:orgid:def", "Bob", 30, "Text", "third"),
                message(
                    "19:meeting@thread.v2",
                    "worker/8:orgid:abc",
                    "",
                    10,
                    "RichText/Html",
                    "<p>Hello <b>all</b></p>",
                ),
                message(
                    "19:meeting@thread.v2",
                    "8:orgid:def",
                    "Bob",
                    20,
                    "ThreadActivity/AddMember",
                    "<addmember/>",
                ),
            ]))
            .reply_chain(reply_chain(vec![message(
                "48:calllogs",
                "8:orgid:abc",
                "Alice",
                40,
                "Event/Call",
                "<partlist/>",
            )]));
        fixture
    }

    fn memory_cache() -> (Arc<MemoryRecordSource>, TeamsCache) {
        let source = Arc::new(MemoryRecordSource::new(fixture().into_records()));
        let cache = TeamsCache::new(source.clone(), BuildSettings::default());
        (source, cache)
    }

    #[tokio::test]
    async fn test_queries_through_facade() {
        let (_, cache) = memory_cache();
        assert!(!cache.is_built());

        let messages = cache
            .get_messages("19:meeting@thread.v2", false)
            .await
            .unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Hello all", "third"]);
        assert_eq!(messages[0].sender, "Alice");

        let hits = cache.search_messages("HELLO", None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sender, "Alice");

        let calls = cache.get_call_history(None).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].conversation_id, "48:calllogs");

        let meetings = cache.list_conversations(Some("Meeting"), None).await.unwrap();
        assert_eq!(meetings.len(), 1);
        assert_eq!(meetings[0].title.as_deref(), Some("Planning"));
        assert_eq!(meetings[0].message_count, 3);

        assert_eq!(
            cache.search_by_participant("bob", None).await.unwrap().len(),
            1
        );
        assert!(cache.get_conversation("missing").await.unwrap().is_none());

        let summary = cache.get_summary().await.unwrap();
        assert_eq!(summary.conversation_count, 2);
        assert_eq!(summary.message_count, 4);
        assert_eq!(summary.participant_count, 2);
        assert_eq!(summary.cache_path, "memory");
        assert_eq!(cache.build_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_callers_share_one_scan() {
        let (source, cache) = memory_cache();
        let cache = Arc::new(cache);

        let mut handles = vec![];
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.index().await }));
        }
        let mut indices = vec![];
        for handle in handles {
            indices.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(source.scan_count(), 1);
        assert_eq!(cache.build_count(), 1);
        for index in &indices {
            assert!(Arc::ptr_eq(index, &indices[0]));
        }

        cache.get_summary().await.unwrap();
        assert_eq!(source.scan_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_build_is_replayed_until_reset() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let mut cache = TeamsCache::new(
            Arc::new(LevelDbDirectory::new(&missing)),
            BuildSettings::default(),
        );

        let first = cache.get_summary().await.unwrap_err();
        let second = cache.list_conversations(None, None).await.unwrap_err();
        assert!(matches!(first, CacheError::Store(_)));
        assert_eq!(first, second);
        assert_eq!(cache.build_count(), 1);

        cache.reset();
        std::fs::create_dir_all(&missing).unwrap();
        let records: Vec<RawRecord> = fixture().into_records();
        write_log(&missing, &records);

        let summary = cache.get_summary().await.unwrap();
        assert_eq!(summary.conversation_count, 2);
        assert_eq!(cache.build_count(), 2);
    }

    fn write_log(dir: &std::path::Path, records: &[RawRecord]) {
        let batches: Vec<Vec<u8>> = records
            .iter()
            .map(|record| {
                let batch = WriteBatchBuilder::new(record.sequence);
                if record.is_live() {
                    batch.put(&record.key, &record.value).finish()
                } else {
                    batch.delete(&record.key).finish()
                }
            })
            .collect();
        std::fs::write(dir.join("000003.log"), build_log(&batches)).unwrap();
    }

    #[tokio::test]
    async fn test_open_from_config() {
        let dir = TempDir::new().unwrap();
        write_log(dir.path(), &fixture().into_records());

        let mut config = Config::default();
        config.cache.path = Some(dir.path().to_path_buf());
        config.query.search_limit = 1;
        config.decode.parallel = false;
        let cache = TeamsCache::open(&ConfigHelper::new(config))
            .unwrap()
            .with_renderer(Arc::new(PlainTextRenderer));

        assert_eq!(cache.location(), dir.path().display().to_string());
        let hits = cache.search_messages("<b>all", None, None).await.unwrap();
        assert_eq!(hits.len(), 1);

        let stats = cache.get_user_stats(Some("bob")).await.unwrap();
        assert_eq!(stats.user_message_count, Some(2));
        assert!(stats.summary.diagnostics.files_read >= 1);
    }
}
