//! Record operations
//!
//! `list_records` and `delete_random` are the two things this service does.
//! Both resolve the table target from configuration first, so a missing
//! credential never reaches the network.

use crate::airtable::{Record, RecordStore};
use crate::config::AirtableConfig;
use crate::error::ServiceError;
use crate::selection::{pick_index, RandomSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Number of records returned by `GET /records`
pub const LIST_LIMIT: u32 = 5;

/// Response of `GET /records`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordListing {
    pub total_records: usize,
    pub records: Vec<Record>,
    pub table: String,
}

/// Response of `POST /delete-random`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub success: bool,
    pub message: String,
    pub deleted_record: Record,
    pub total_records_before_deletion: usize,
    pub timestamp: DateTime<Utc>,
}

/// Fetch up to [`LIST_LIMIT`] records. Never deletes anything.
pub async fn list_records<S: RecordStore>(
    store: &S,
    config: &AirtableConfig,
) -> Result<RecordListing, ServiceError> {
    let table = config.table()?;

    let page = store
        .list_records(&table, Some(LIST_LIMIT))
        .await
        .map_err(|e| ServiceError::listing_failed(&table, e))?;

    info!(table = %table.name, count = page.records.len(), "Fetched records");

    Ok(RecordListing {
        total_records: page.records.len(),
        records: page.records,
        table: table.name,
    })
}

/// Delete one record chosen uniformly at random from the first page.
pub async fn delete_random<S: RecordStore>(
    store: &S,
    config: &AirtableConfig,
    random: &dyn RandomSource,
) -> Result<DeletionReport, ServiceError> {
    let table = config.table()?;

    let page = store
        .list_records(&table, None)
        .await
        .map_err(|e| ServiceError::fetch_failed(&table, e))?;

    if page.offset.is_some() {
        warn!(
            table = %table.name,
            fetched = page.records.len(),
            "Table has more than one page of records; only the first page is eligible"
        );
    }

    let total = page.records.len();
    let index = pick_index(total, random).ok_or_else(|| ServiceError::NoRecords {
        table: table.name.clone(),
    })?;

    let mut records = page.records;
    let selected = records.swap_remove(index);

    info!(
        table = %table.name,
        record_id = %selected.id,
        index,
        total,
        "Deleting randomly selected record"
    );

    store
        .delete_record(&table, &selected.id)
        .await
        .map_err(|e| ServiceError::delete_failed(&table, e))?;

    info!(table = %table.name, record_id = %selected.id, "Record deleted");

    Ok(DeletionReport {
        success: true,
        message: format!("Successfully deleted random record {}", selected.id),
        deleted_record: selected,
        total_records_before_deletion: total,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airtable::mock::{sample_records, MockCall, MockStore};
    use crate::selection::{FixedRandom, SeededRandom};

    fn configured() -> AirtableConfig {
        AirtableConfig {
            token: Some("pat".to_string()),
            base_id: Some("appBase".to_string()),
            ..AirtableConfig::default()
        }
    }

    #[tokio::test]
    async fn test_delete_random_deletes_selected_record() {
        let store = MockStore::with_records(sample_records(3));

        let report = delete_random(&store, &configured(), &FixedRandom(0.5))
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.deleted_record.id, "rec1");
        assert_eq!(report.total_records_before_deletion, 3);
        assert_eq!(store.deleted_ids(), vec!["rec1".to_string()]);
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_random_fetches_without_cap() {
        let store = MockStore::with_records(sample_records(2));

        delete_random(&store, &configured(), &FixedRandom(0.0))
            .await
            .unwrap();

        assert_eq!(
            store.calls()[0],
            MockCall::List {
                table: "responses".to_string(),
                max_records: None
            }
        );
    }

    #[tokio::test]
    async fn test_delete_random_empty_table() {
        let store = MockStore::new();

        let err = delete_random(&store, &configured(), &FixedRandom(0.5))
            .await
            .unwrap_err();

        match err {
            ServiceError::NoRecords { table } => assert_eq!(table, "responses"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn test_delete_random_without_credentials_makes_no_calls() {
        let store = MockStore::with_records(sample_records(3));

        let mut config = configured();
        config.base_id = None;
        let err = delete_random(&store, &config, &FixedRandom(0.5))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::MissingConfig("AIRTABLE_BASE_ID")));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_random_only_considers_first_page() {
        let store = MockStore::with_records(sample_records(10)).with_page_size(4);

        let report = delete_random(&store, &configured(), &FixedRandom(0.99))
            .await
            .unwrap();

        assert_eq!(report.total_records_before_deletion, 4);
        assert_eq!(report.deleted_record.id, "rec3");
    }

    #[tokio::test]
    async fn test_delete_random_picks_from_fetched_ids() {
        let source = SeededRandom::new(11);

        for _ in 0..20 {
            let store = MockStore::with_records(sample_records(6));
            let before: Vec<String> = store.records().into_iter().map(|r| r.id).collect();

            let report = delete_random(&store, &configured(), &source).await.unwrap();

            assert_eq!(
                before.iter().filter(|id| **id == report.deleted_record.id).count(),
                1
            );
            assert_eq!(report.total_records_before_deletion, before.len());
            assert_eq!(store.deleted_ids(), vec![report.deleted_record.id.clone()]);
        }
    }

    #[tokio::test]
    async fn test_delete_failure_is_reported() {
        let store = MockStore::with_records(sample_records(2));
        store.fail_delete_with(404);

        let err = delete_random(&store, &configured(), &FixedRandom(0.0))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_list_records_caps_and_never_deletes() {
        let store = MockStore::with_records(sample_records(7));

        let listing = list_records(&store, &configured()).await.unwrap();

        assert_eq!(listing.total_records, 5);
        assert_eq!(listing.records.len(), 5);
        assert_eq!(listing.table, "responses");
        assert!(store.deleted_ids().is_empty());
        assert_eq!(store.records().len(), 7);
    }

    #[tokio::test]
    async fn test_list_records_without_token() {
        let store = MockStore::with_records(sample_records(1));

        let err = list_records(&store, &AirtableConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::MissingConfig("AIRTABLE_TOKEN")));
        assert!(store.calls().is_empty());
    }
}
