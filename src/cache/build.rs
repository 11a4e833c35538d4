//! The one-time build pass: raw records to a [`CacheIndex`].
//!
//! Stages run in order: read every raw record, resolve versions, resolve
//! IndexedDB metadata, decode the values of the stores of interest, project them
//! into domain indices. Only an unreadable store fails the build; malformed
//! values are skipped and counted.

use crate::config::default_config;
use crate::indexeddb::{MetadataResolver, ObjectStoreRef};
use crate::leveldb::{LevelDbContents, LogicalView, RecordSource};
use crate::model::BuildDiagnostics;
use crate::projector::{CacheIndex, DomainProjector};
use crate::value::{decode_record_value, DecodedGraph, DecodeError};

use super::error::{CacheError, Result};

/// What the build pass decodes and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Object store names to decode; all others are ignored.
    pub stores_of_interest: Vec<String>,
    /// Decode stores on the blocking pool concurrently.
    pub parallel: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        let config = default_config();
        Self {
            stores_of_interest: config.stores.of_interest,
            parallel: config.decode.parallel,
        }
    }
}

type DecodedStore = (String, Vec<std::result::Result<DecodedGraph, DecodeError>>);

fn decode_values(values: Vec<Vec<u8>>) -> Vec<std::result::Result<DecodedGraph, DecodeError>> {
    values.iter().map(|value| decode_record_value(value)).collect()
}

async fn decode_stores(
    stores: Vec<(ObjectStoreRef, Vec<Vec<u8>>)>,
    parallel: bool,
) -> Result<Vec<DecodedStore>> {
    if !parallel {
        return Ok(stores
            .into_iter()
            .map(|(store, values)| (store.name, decode_values(values)))
            .collect());
    }

    let tasks = stores.into_iter().map(|(store, values)| {
        tokio::task::spawn_blocking(move || (store.name, decode_values(values)))
    });

    // join_all keeps input order, so projection order matches scan order.
    futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.map_err(|e| CacheError::Build(format!("decode task failed: {}", e))))
        .collect()
}

/// Run the complete build pass over `source`.
pub async fn build_index(
    source: &dyn RecordSource,
    settings: &BuildSettings,
) -> Result<CacheIndex> {
    tracing::info!("building cache index from {}", source.location());

    let LevelDbContents { records, stats } = source.read_records().await?;
    let records_read = records.len();
    let view = LogicalView::resolve(records);
    tracing::debug!(
        "resolved {} live keys ({} superseded, {} deleted)",
        view.len(),
        view.superseded_count(),
        view.deleted_count()
    );

    let metadata = MetadataResolver::resolve(&view);
    let stores = metadata.stores_of_interest(&settings.stores_of_interest);
    if stores.is_empty() {
        tracing::warn!("no object stores of interest found in {}", source.location());
    }

    let mut diagnostics = BuildDiagnostics {
        files_read: stats.files_read,
        files_skipped: stats.files_skipped,
        records_read,
        corrupt_entries: stats.corrupt_entries,
        live_keys: view.len(),
        stores_scanned: stores.len(),
        ..BuildDiagnostics::default()
    };

    let scanned: Vec<(ObjectStoreRef, Vec<Vec<u8>>)> = stores
        .into_iter()
        .map(|store| {
            let values: Vec<Vec<u8>> = store.records(&view).map(|r| r.value.clone()).collect();
            tracing::debug!(
                "store {} (database {}, id {}): {} values",
                store.name,
                store.database_id,
                store.object_store_id,
                values.len()
            );
            (store, values)
        })
        .collect();
    drop(view);

    let decoded = decode_stores(scanned, settings.parallel).await?;
    diagnostics.values_decoded = decoded
        .iter()
        .flat_map(|(_, results)| results.iter())
        .filter(|result| result.is_ok())
        .count();

    let mut projector = DomainProjector::with_diagnostics(diagnostics);
    for (store, results) in decoded {
        for result in results {
            match result {
                Ok(graph) => projector.project(&store, &graph),
                Err(e) => {
                    tracing::debug!("skipping undecodable {} value: {}", store, e);
                    projector.record_skip(e.kind());
                }
            }
        }
    }

    let index = projector.finish();
    let diagnostics = index.diagnostics();
    if diagnostics.nothing_recovered() {
        tracing::warn!(
            "store contains data but nothing could be projected ({} values skipped)",
            diagnostics.skipped_total()
        );
    }
    tracing::info!(
        "cache index built: {} records, {} live keys, {} values decoded, {} skipped",
        diagnostics.records_read,
        diagnostics.live_keys,
        diagnostics.values_decoded,
        diagnostics.skipped_total()
    );

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leveldb::MemoryRecordSource;
    use crate::test_support::{
        member, message, reply_chain, wrap_value, GraphWriter, TeamsFixture,
    };
    use serde_json::json;

    fn fixture_with_corrupt_value() -> TeamsFixture {
        let mut fixture = TeamsFixture::new();
        for i in 0..9 {
            fixture.conversation(json!({ "id": format!("19:c{i}@thread.v2"), "type": "Chat" }));
        }
        // Unknown object-graph tag inside a valid envelope.
        fixture.raw_conversation(wrap_value(&[0xFF, 0x0F, b'Z'], false));
        fixture
    }

    #[tokio::test]
    async fn test_corrupt_value_is_skipped() {
        for parallel in [true, false] {
            let source = MemoryRecordSource::new(fixture_with_corrupt_value().into_records());
            let settings = BuildSettings {
                parallel,
                ..BuildSettings::default()
            };

            let index = build_index(&source, &settings).await.unwrap();

            assert_eq!(index.conversations().count(), 9);
            let diagnostics = index.diagnostics();
            assert_eq!(diagnostics.values_decoded, 9);
            assert_eq!(diagnostics.values_skipped.get("unsupported_tag"), Some(&1));
            assert!(!diagnostics.nothing_recovered());
        }
    }

    #[tokio::test]
    async fn test_hostile_values_among_good_records() {
        let mut fixture = TeamsFixture::new();
        for i in 0..4 {
            fixture.conversation(json!({ "id": format!("19:c{i}@thread.v2"), "type": "Chat" }));
        }

        // A sparse array claiming two billion elements.
        let mut sparse = GraphWriter::new();
        sparse
            .begin_sparse_array(2_000_000_001)
            .key_int(2_000_000_000)
            .int(1)
            .end_sparse_array(1, 2_000_000_001);
        fixture.raw_conversation(wrap_value(&sparse.finish(), false));

        // An object cut off after its first key.
        let mut truncated = GraphWriter::new();
        truncated.begin_object().key("id");
        fixture.raw_conversation(wrap_value(&truncated.finish(), false));

        fixture.conversation(json!({ "id": "19:last@thread.v2", "type": "Chat" }));
        let source = MemoryRecordSource::new(fixture.into_records());

        let index = build_index(&source, &BuildSettings::default()).await.unwrap();

        assert_eq!(index.conversations().count(), 5);
        let diagnostics = index.diagnostics();
        assert_eq!(diagnostics.values_decoded, 6);
        assert_eq!(diagnostics.values_skipped.get("malformed_value"), Some(&1));
        assert_eq!(diagnostics.values_skipped.get("missing_field"), Some(&1));
        assert_eq!(diagnostics.skipped_total(), 2);
    }

    #[tokio::test]
    async fn test_only_stores_of_interest_are_decoded() {
        let mut fixture = TeamsFixture::new();
        fixture
            .conversation(json!({ "id": "c1", "members": [member("8:a", "Alice")] }))
            .reply_chain(reply_chain(vec![message("c1", "8:a", "Alice", 1, "Text", "hi")]))
            .setting(json!({ "id": "theme", "value": "dark" }));
        let source = MemoryRecordSource::new(fixture.into_records());

        let index = build_index(&source, &BuildSettings::default()).await.unwrap();
        assert_eq!(index.conversations().count(), 1);
        assert_eq!(index.messages("c1").len(), 1);
        assert_eq!(index.diagnostics().values_decoded, 2);

        let settings = BuildSettings {
            stores_of_interest: vec!["conversations".to_string()],
            parallel: false,
        };
        let index = build_index(&source, &settings).await.unwrap();
        assert_eq!(index.diagnostics().stores_scanned, 1);
        assert_eq!(index.message_count(), 0);
    }

    #[tokio::test]
    async fn test_all_values_undecodable_is_distinguishable() {
        let mut fixture = TeamsFixture::new();
        fixture.raw_conversation(vec![0x0F, 0x01]);
        let source = MemoryRecordSource::new(fixture.into_records());

        let index = build_index(&source, &BuildSettings::default()).await.unwrap();
        assert_eq!(index.conversations().count(), 0);
        assert!(index.diagnostics().nothing_recovered());

        let empty = MemoryRecordSource::new(Vec::new());
        let index = build_index(&empty, &BuildSettings::default()).await.unwrap();
        assert!(!index.diagnostics().nothing_recovered());
    }
}
