//! Single-slot store for the last attempted replacement payload

use tracing::debug;

use crate::error::FileError;

/// Holds the most recent replacement text that failed to apply
///
/// Callers that generated a large payload can retry through the buffer
/// instead of sending the same text again. Every `set` overwrites the slot.
#[derive(Debug, Clone, Default)]
pub struct ContentBuffer {
    content: Option<String>,
}

impl ContentBuffer {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores content, replacing whatever was there
    pub fn set(&mut self, content: impl Into<String>) {
        let content = content.into();
        debug!("Buffered {} bytes of replacement content", content.len());
        self.content = Some(content);
    }

    /// Peeks at the buffered content
    pub fn get(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Buffered content, or [`FileError::BufferEmpty`]
    pub fn get_or_require(&self) -> Result<&str, FileError> {
        self.get().ok_or(FileError::BufferEmpty)
    }

    /// Empties the slot
    pub fn clear(&mut self) {
        self.content = None;
    }

    /// Byte length of the buffered content, 0 when empty
    pub fn len(&self) -> usize {
        self.content.as_ref().map_or(0, String::len)
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = ContentBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert!(matches!(buffer.get_or_require(), Err(FileError::BufferEmpty)));
    }

    #[test]
    fn test_set_overwrites() {
        let mut buffer = ContentBuffer::new();
        buffer.set("first");
        buffer.set("second payload");

        assert_eq!(buffer.get(), Some("second payload"));
        assert_eq!(buffer.len(), 14);
    }

    #[test]
    fn test_empty_string_is_still_buffered() {
        let mut buffer = ContentBuffer::new();
        buffer.set("");

        assert!(!buffer.is_empty());
        assert_eq!(buffer.get_or_require().unwrap(), "");
    }

    #[test]
    fn test_clear() {
        let mut buffer = ContentBuffer::new();
        buffer.set("payload");
        buffer.clear();
        assert_eq!(buffer.get(), None);
    }
}
