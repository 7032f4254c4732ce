use std::{fmt, fs::File, io::Read, path::Path};

use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::{DigestResult, error::Result};

/// Read size used while streaming file content into the digest.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// SHA-1 is kept as the default for compatibility with previously recorded
/// fingerprints; it is not collision resistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DigestAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha1 => f.write_str("SHA-1"),
            DigestAlgorithm::Sha256 => f.write_str("SHA-256"),
        }
    }
}

pub struct ContentHasher {
    algorithm: DigestAlgorithm,
}

impl ContentHasher {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn hash_file<P: AsRef<Path>>(&self, path: P) -> Result<DigestResult> {
        let file = File::open(path)?;
        self.hash_reader(file)
    }

    /// Streams `reader` to exhaustion. Any read error aborts the whole digest.
    pub fn hash_reader<R: Read>(&self, reader: R) -> Result<DigestResult> {
        let bytes = match self.algorithm {
            DigestAlgorithm::Sha1 => Self::stream::<Sha1, R>(reader)?,
            DigestAlgorithm::Sha256 => Self::stream::<Sha256, R>(reader)?,
        };

        Ok(DigestResult {
            algorithm: self.algorithm,
            hex: hex::encode(&bytes),
            bytes,
        })
    }

    fn stream<D: Digest, R: Read>(mut reader: R) -> Result<Vec<u8>> {
        let mut hasher = D::new();
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(hasher.finalize().to_vec())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Write};

    /// Hands out at most `step` bytes per read call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device gone"))
        }
    }

    #[test]
    fn test_sha1_known_vector() {
        let digest = ContentHasher::default().hash_reader(Cursor::new(b"abc")).unwrap();
        assert_eq!(digest.hex, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(digest.bytes.len(), 20);
    }

    #[test]
    fn test_sha256_output_len() {
        let digest = ContentHasher::new(DigestAlgorithm::Sha256)
            .hash_reader(Cursor::new(b"abc"))
            .unwrap();
        assert_eq!(digest.bytes.len(), DigestAlgorithm::Sha256.output_len());
        assert_eq!(
            digest.hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_chunking_does_not_change_digest() {
        let data = (0..3 * CHUNK_SIZE + 17).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        let hasher = ContentHasher::default();

        let whole = hasher.hash_reader(Cursor::new(&data)).unwrap();
        let trickled = hasher.hash_reader(Trickle { data: &data, step: 7 }).unwrap();
        let one_shot = hex::encode(Sha1::digest(&data));

        assert_eq!(whole.bytes, trickled.bytes);
        assert_eq!(whole.hex, one_shot);
    }

    #[test]
    fn test_single_byte_change_changes_digest() {
        let mut data = vec![0x42u8; 10_000];
        let hasher = ContentHasher::default();
        let before = hasher.hash_reader(Cursor::new(&data)).unwrap();
        data[5_000] ^= 0x01;
        let after = hasher.hash_reader(Cursor::new(&data)).unwrap();
        assert_ne!(before.hex, after.hex);
    }

    #[test]
    fn test_file_hash_depends_only_on_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("copy.jpg");
        for path in [&a, &b] {
            let mut file = File::create(path).unwrap();
            file.write_all(b"same content, different name").unwrap();
        }

        let hasher = ContentHasher::default();
        assert_eq!(hasher.hash_file(&a).unwrap().hex, hasher.hash_file(&b).unwrap().hex);
    }

    #[test]
    fn test_read_error_yields_no_digest() {
        let result = ContentHasher::default().hash_reader(Failing);
        assert!(matches!(result, Err(crate::error::ForensicsError::Io(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ContentHasher::default().hash_file(dir.path().join("missing.jpg"));
        assert!(matches!(result, Err(crate::error::ForensicsError::Io(_))));
    }
}
