use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use staffing_gaps::error::AppError;
use staffing_gaps::workflows::vacancy::snapshot;
use staffing_gaps::workflows::vacancy::{MemoryStore, StoreLimits};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Builds the in-memory store, hydrated from a CSV snapshot directory when one
/// is configured.
pub(crate) fn load_store(snapshot_dir: Option<&Path>) -> Result<Arc<MemoryStore>, AppError> {
    let limits = StoreLimits::default();
    match snapshot_dir {
        Some(dir) => {
            let seed = snapshot::load_dir(dir)?;
            Ok(Arc::new(MemoryStore::seeded(limits, seed)))
        }
        None => {
            tracing::warn!("no snapshot directory configured; starting with an empty store");
            Ok(Arc::new(MemoryStore::new(limits)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_reports_the_bad_input() {
        assert_eq!(
            parse_date(" 2025-03-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"))
        );
        let err = parse_date("03/01/2025").expect_err("wrong format");
        assert!(err.contains("03/01/2025"));
    }

    #[test]
    fn missing_snapshot_dir_is_an_error() {
        let dir = Path::new("./does-not-exist-snapshot");
        assert!(matches!(load_store(Some(dir)), Err(AppError::Snapshot(_))));
    }
}
