use serde::{Deserialize, Serialize};

use super::batch::BatchStatus;

/// Ingestion-level status, derived from its batches on every read.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    YetToStart,
    Triggered,
    Completed,
    /// Every batch finished and at least one failed.
    Failed,
}

/// Fold batch statuses into the ingestion status.
///
/// - all `yet_to_start` -> `yet_to_start` (also the result for no batches)
/// - all `completed` -> `completed`
/// - all terminal with at least one `failed` -> `failed`
/// - anything else -> `triggered`
pub fn aggregate_status<I>(statuses: I) -> IngestionStatus
where
    I: IntoIterator<Item = BatchStatus>,
{
    let mut all_pending = true;
    let mut all_completed = true;
    let mut all_terminal = true;
    let mut any_failed = false;

    for status in statuses {
        all_pending &= status == BatchStatus::YetToStart;
        all_completed &= status == BatchStatus::Completed;
        all_terminal &= status.is_terminal();
        any_failed |= status == BatchStatus::Failed;
    }

    if all_pending {
        IngestionStatus::YetToStart
    } else if all_completed {
        IngestionStatus::Completed
    } else if all_terminal && any_failed {
        IngestionStatus::Failed
    } else {
        IngestionStatus::Triggered
    }
}
