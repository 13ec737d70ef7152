//! Shared payload types

/// One untyped document flowing from a producer into a batch.
///
/// Keys are strings, values are any JSON value. No schema is enforced.
pub type Record = serde_json::Map<String, serde_json::Value>;
