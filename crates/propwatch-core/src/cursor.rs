use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker of how far the remote comment stream has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub last_comment_id: u64,
    pub last_processed_at: DateTime<Utc>,
}
