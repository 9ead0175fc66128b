//! Buffering of upload sources.

use stowage_core::ByteSource;
use tokio::io::AsyncReadExt;

/// Upper bound on the buffer reserved up front from a declared size.
pub(crate) const PREALLOC_LIMIT: usize = 8 * 1024 * 1024;

/// Initial capacity for a source declared as `declared` bytes. The declared
/// size is a hint and may be 0 or overstated.
pub(crate) fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared)
        .unwrap_or(PREALLOC_LIMIT)
        .min(PREALLOC_LIMIT)
}

/// Read a source to its end.
pub(crate) async fn read_source(reader: &mut ByteSource, declared: u64) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::with_capacity(initial_capacity(declared));
    reader.read_to_end(&mut data).await?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_initial_capacity_is_bounded() {
        assert_eq!(initial_capacity(0), 0);
        assert_eq!(initial_capacity(1024), 1024);
        assert_eq!(initial_capacity(u64::MAX), PREALLOC_LIMIT);
    }

    #[tokio::test]
    async fn test_read_source_ignores_overstated_size() {
        let mut reader: ByteSource = Box::pin(Cursor::new(vec![1u8, 2, 3, 4]));
        let data = read_source(&mut reader, u64::MAX).await.unwrap();
        assert_eq!(data, vec![1, 2, 3, 4]);
    }
}
