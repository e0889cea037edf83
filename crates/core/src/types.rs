/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Variables threaded from one script into the next.
///
/// Insertion order is not significant; a later write for the same key
/// replaces the earlier value.
pub type Variables = serde_json::Map<String, serde_json::Value>;
