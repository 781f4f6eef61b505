//! In-memory record store for tests.
//!
//! Behaves like a single Airtable table: list calls honour `maxRecords` and
//! the page size, deletes remove records, and every call is recorded so
//! tests can assert on what reached the "network".

use super::{AirtableError, Record, RecordPage, RecordStore};
use crate::config::Table;
use parking_lot::Mutex;
use std::sync::Arc;

/// Airtable's list page size
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A call that reached the mock store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    List {
        table: String,
        max_records: Option<u32>,
    },
    Delete {
        table: String,
        record_id: String,
    },
}

#[derive(Debug, Default)]
struct MockState {
    records: Vec<Record>,
    calls: Vec<MockCall>,
    fail_list: Option<u16>,
    fail_delete: Option<u16>,
}

/// Mock Airtable table for testing.
#[derive(Debug, Clone)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
    page_size: usize,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Create an empty mock table.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a mock table holding the given records.
    pub fn with_records(records: Vec<Record>) -> Self {
        let store = Self::new();
        store.state.lock().records = records;
        store
    }

    /// Override the page size used by list calls.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every list call fail with the given upstream status.
    pub fn fail_list_with(&self, status: u16) {
        self.state.lock().fail_list = Some(status);
    }

    /// Make every delete call fail with the given upstream status.
    pub fn fail_delete_with(&self, status: u16) {
        self.state.lock().fail_delete = Some(status);
    }

    /// Records currently in the table.
    pub fn records(&self) -> Vec<Record> {
        self.state.lock().records.clone()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Number of list calls made so far.
    pub fn list_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::List { .. }))
            .count()
    }

    /// Ids passed to delete calls, in order.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Delete { record_id, .. } => Some(record_id),
                _ => None,
            })
            .collect()
    }
}

impl RecordStore for MockStore {
    async fn list_records(
        &self,
        table: &Table,
        max_records: Option<u32>,
    ) -> Result<RecordPage, AirtableError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::List {
            table: table.name.clone(),
            max_records,
        });

        if let Some(status) = state.fail_list {
            return Err(AirtableError::from_status(
                status,
                format!("mock list failure ({status})"),
            ));
        }

        let available = match max_records {
            Some(max) => state.records.len().min(max as usize),
            None => state.records.len(),
        };
        let take = available.min(self.page_size);
        let offset = (take < available).then(|| format!("itr{take}"));

        Ok(RecordPage {
            records: state.records[..take].to_vec(),
            offset,
        })
    }

    async fn delete_record(&self, table: &Table, record_id: &str) -> Result<(), AirtableError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Delete {
            table: table.name.clone(),
            record_id: record_id.to_string(),
        });

        if let Some(status) = state.fail_delete {
            return Err(AirtableError::from_status(
                status,
                format!("mock delete failure ({status})"),
            ));
        }

        let position = state
            .records
            .iter()
            .position(|r| r.id == record_id)
            .ok_or_else(|| AirtableError::NotFound(format!("record {record_id} not found")))?;
        state.records.remove(position);

        Ok(())
    }
}

/// Build `count` records with ids `rec0`, `rec1`, ...
pub fn sample_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let mut fields = serde_json::Map::new();
            fields.insert("Name".to_string(), serde_json::json!(format!("Person {i}")));
            fields.insert("Index".to_string(), serde_json::json!(i));
            Record {
                id: format!("rec{i}"),
                created_time: format!("2024-01-01T00:00:{:02}.000Z", i % 60),
                fields,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table {
            token: "pat".to_string(),
            base_id: "appMock".to_string(),
            name: "responses".to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_honours_max_records() {
        let store = MockStore::with_records(sample_records(7));

        let page = store.list_records(&table(), Some(5)).await.unwrap();
        assert_eq!(page.records.len(), 5);
        assert!(page.offset.is_none());
        assert_eq!(
            store.calls(),
            vec![MockCall::List {
                table: "responses".to_string(),
                max_records: Some(5)
            }]
        );
    }

    #[tokio::test]
    async fn test_list_is_paged() {
        let store = MockStore::with_records(sample_records(5)).with_page_size(3);

        let page = store.list_records(&table(), None).await.unwrap();
        assert_eq!(page.records.len(), 3);
        assert!(page.offset.is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = MockStore::with_records(sample_records(2));

        store.delete_record(&table(), "rec1").await.unwrap();
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.deleted_ids(), vec!["rec1".to_string()]);

        let err = store.delete_record(&table(), "rec1").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MockStore::with_records(sample_records(1));
        store.fail_list_with(401);

        let err = store.list_records(&table(), None).await.unwrap_err();
        assert!(matches!(err, AirtableError::Unauthorized(_)));
        assert_eq!(store.list_calls(), 1);
    }
}
