//! Incremental SHA-256 hashing for streamed uploads.
//!
//! The engine feeds the hasher chunk by chunk while copying bytes to disk,
//! so the stream is never materialized in memory.

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::defaults::UPLOAD_BUFFER_SIZE;

/// Incremental SHA-256 state.
///
/// `update` may be called any number of times; `finalize` consumes the
/// state and yields the 32-byte digest.
#[derive(Default)]
pub struct StreamingSha256 {
    inner: Sha256,
}

impl StreamingSha256 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finalize(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}

/// One-shot SHA-256 over a full byte slice.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// SHA-256 over an async reader without materializing it.
///
/// Returns the digest and the total number of bytes consumed. Reads happen
/// in [`UPLOAD_BUFFER_SIZE`] chunks; dropping the future between reads
/// abandons the hash cleanly.
pub async fn sha256_reader<R>(mut reader: R) -> std::io::Result<([u8; 32], u64)>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = StreamingSha256::new();
    let mut buf = vec![0u8; UPLOAD_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }

    Ok((hasher.finalize(), total))
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of the empty input, from FIPS 180-4 test vectors.
    const EMPTY_HEX: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_empty_digest_matches_known_vector() {
        assert_eq!(hex::encode(sha256(b"")), EMPTY_HEX);
    }

    #[test]
    fn test_abc_digest_matches_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_incremental_equals_one_shot() {
        let data = b"hello streaming world";
        let mut hasher = StreamingSha256::new();
        hasher.update(&data[..5]);
        hasher.update(&data[5..]);
        assert_eq!(hasher.finalize(), sha256(data));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let data: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();
        assert_eq!(sha256(&data), sha256(&data));
    }

    #[tokio::test]
    async fn test_reader_equals_one_shot() {
        let data: Vec<u8> = (0..=255u8).cycle().take(3 * UPLOAD_BUFFER_SIZE + 17).collect();
        let (digest, total) = sha256_reader(data.as_slice()).await.unwrap();
        assert_eq!(digest, sha256(&data));
        assert_eq!(total, data.len() as u64);
    }

    #[tokio::test]
    async fn test_reader_empty_input() {
        let (digest, total) = sha256_reader(&b""[..]).await.unwrap();
        assert_eq!(hex::encode(digest), EMPTY_HEX);
        assert_eq!(total, 0);
    }

    #[test]
    fn test_digest_is_32_bytes() {
        assert_eq!(sha256(b"x").len(), 32);
    }
}
