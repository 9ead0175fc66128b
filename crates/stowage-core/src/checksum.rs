//! Content checksums (SHA-256, lowercase hex).

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash everything readable from `reader`.
pub async fn sha256_reader<R>(reader: &mut R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
