//! ABOUTME: Matrix Executor: fans a single step out over a loaded item list

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use wave_core::{Result, WaveError};

/// Parse `content` (tried as JSON, then YAML) and, if `item_key` is given,
/// drill into it via a dotted path (e.g. `results.items`) to find the array
/// to fan out over.
pub fn load_items(content: &str, item_key: Option<&str>) -> Result<Vec<serde_json::Value>> {
    let root: serde_json::Value = serde_json::from_str(content).or_else(|_| {
        serde_yaml::from_str::<serde_json::Value>(content).map_err(|e| WaveError::Validation {
            kind: wave_core::ValidationKind::InvalidKind,
            message: format!("matrix items_source is neither valid JSON nor YAML: {e}"),
        })
    })?;

    let mut cursor = &root;
    if let Some(key) = item_key {
        for part in key.split('.') {
            cursor = cursor.get(part).ok_or_else(|| WaveError::Validation {
                kind: wave_core::ValidationKind::InvalidKind,
                message: format!("matrix item_key '{key}' not found (missing segment '{part}')"),
            })?;
        }
    }

    cursor
        .as_array()
        .cloned()
        .ok_or_else(|| WaveError::Validation {
            kind: wave_core::ValidationKind::InvalidKind,
            message: "matrix items resolved to a non-array value".to_string(),
        })
}

pub type MatrixWorker = Arc<dyn Fn(usize, serde_json::Value) -> BoxFuture<'static, Result<Vec<String>>> + Send + Sync>;

/// Run every item through `worker`, bounded by `max_concurrency`. Unlike the
/// Concurrency Executor, a failing worker does not cancel the rest: every
/// item runs to completion, and failures/conflicts are aggregated afterward.
pub async fn run_matrix(items: Vec<serde_json::Value>, max_concurrency: usize, worker: MatrixWorker) -> Result<()> {
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let worker = worker.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("matrix executor semaphore should never be closed");
            (index, worker(index, item).await)
        }));
    }

    let mut failed: Vec<(usize, WaveError)> = Vec::new();
    let mut modified_by_file: HashMap<String, Vec<usize>> = HashMap::new();

    for handle in handles {
        let (index, result) = handle.await.map_err(|e| WaveError::Internal {
            message: format!("matrix worker panicked: {e}"),
        })?;
        match result {
            Ok(files) => {
                for file in files {
                    modified_by_file.entry(file).or_default().push(index);
                }
            }
            Err(err) => failed.push((index, err)),
        }
    }

    let conflicted: Vec<String> = modified_by_file
        .into_iter()
        .filter(|(_, workers)| workers.len() > 1)
        .map(|(file, _)| file)
        .collect();
    if !conflicted.is_empty() {
        return Err(WaveError::FileConflict { files: conflicted });
    }

    if !failed.is_empty() {
        let mut parts: Vec<String> = failed
            .iter()
            .take(3)
            .map(|(i, e)| format!("item {i}: {e}"))
            .collect();
        if failed.len() > 3 {
            parts.push(format!("(and {} more)", failed.len() - 3));
        }
        return Err(WaveError::PartialFailure {
            failed: failed.len(),
            total,
            message: parts.join("; "),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_items_from_plain_json_array() {
        let items = load_items(r#"[{"a": 1}, {"a": 2}]"#, None).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn load_items_from_dotted_item_key() {
        let content = r#"{"results": {"items": [1, 2, 3]}}"#;
        let items = load_items(content, Some("results.items")).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn load_items_rejects_non_array_resolution() {
        let content = r#"{"results": {"items": "not an array"}}"#;
        assert!(load_items(content, Some("results.items")).is_err());
    }

    #[tokio::test]
    async fn all_items_succeed() {
        let worker: MatrixWorker = Arc::new(|_i, _v| Box::pin(async { Ok(Vec::new()) }));
        let items = vec![serde_json::json!(1), serde_json::json!(2)];
        assert!(run_matrix(items, 4, worker).await.is_ok());
    }

    #[tokio::test]
    async fn partial_failure_is_aggregated_with_truncation() {
        let worker: MatrixWorker = Arc::new(|i, _v| {
            Box::pin(async move {
                if i % 2 == 0 {
                    Err(WaveError::Internal { message: format!("worker {i} failed") })
                } else {
                    Ok(Vec::new())
                }
            })
        });
        let items: Vec<serde_json::Value> = (0..10).map(|i| serde_json::json!(i)).collect();
        let err = run_matrix(items, 4, worker).await.unwrap_err();
        match err {
            WaveError::PartialFailure { failed, total, message } => {
                assert_eq!(failed, 5);
                assert_eq!(total, 10);
                assert!(message.contains("(and 2 more)"));
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn conflicting_writes_are_reported() {
        let worker: MatrixWorker = Arc::new(|_i, _v| Box::pin(async { Ok(vec!["shared.rs".to_string()]) }));
        let items = vec![serde_json::json!(1), serde_json::json!(2)];
        let err = run_matrix(items, 4, worker).await.unwrap_err();
        assert!(matches!(err, WaveError::FileConflict { .. }));
    }
}
