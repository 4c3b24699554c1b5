use crate::models::error::AudioError;

/// Key-value persistence for settings, word lists, and recordings.
///
/// Injected into the pipeline and exporter instead of being reached as
/// global state. Writes from the pipeline are best effort: failures are
/// logged, never propagated to the recording flow.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AudioError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), AudioError>;

    /// Remove a key. Removing a missing key is not an error.
    fn clear(&self, key: &str) -> Result<(), AudioError>;
}
