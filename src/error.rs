use thiserror::Error;

/// Errors surfaced by the strict insertion entry point.
///
/// `get`/`remove` never error on a missing key: absence is normal, not a failure.
/// This enum only has a home for conflicts `insert_strict` refuses to silently
/// resolve by overwriting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError<K, V> {
    /// `insert_strict` was called with a key already present in the tree. The tree
    /// is left unchanged and the rejected pair is handed back to the caller.
    #[error("key already present in tree")]
    DuplicateKey { key: K, value: V },
}
