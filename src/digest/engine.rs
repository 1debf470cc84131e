// Streaming SHA-256 engine
// Reads a file in fixed-size chunks through an incremental digest so
// memory stays O(chunk size) regardless of file size. Progress is
// throttled and cancellation is checked at every chunk boundary.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::cancel::CancelHandle;
use super::error::DigestError;

/// Default read buffer size (2 MiB). Large enough to amortize read
/// syscalls, small enough to keep progress granularity and cancellation
/// latency meaningful.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Report progress every this many chunks. Short final reads and the
/// terminal byte count always report regardless of the interval.
const PROGRESS_CHUNK_INTERVAL: u64 = 4;

// Helper function to serialize Duration as seconds
fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Immutable output of one completed digest run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HashResult {
    /// Lowercase canonical hex rendering, two characters per digest byte.
    pub hex: String,
    /// Standard base64 rendering of the same 32 digest bytes.
    pub base64: String,
    /// Wall clock from just before open to just after finalization.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
    /// Total bytes fed through the digest.
    pub bytes: u64,
    /// Source file path, echoed back for display.
    pub path: PathBuf,
}

/// Streaming digest computer.
#[derive(Debug, Clone)]
pub struct DigestEngine {
    chunk_size: usize,
}

impl DigestEngine {
    /// Create an engine with the default 2 MiB chunk size.
    pub fn new() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE }
    }

    /// Create an engine with a custom chunk size. The chunk size doubles
    /// as the cancellation-responsiveness knob, so zero is rejected.
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self, DigestError> {
        if chunk_size == 0 {
            return Err(DigestError::InvalidArgument {
                message: "chunk size must be positive".to_string(),
            });
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Compute the SHA-256 digest of `path`, feeding processed-byte
    /// checkpoints to `on_progress`.
    ///
    /// The final checkpoint always equals the total byte count, including
    /// files whose length is an exact multiple of the chunk size. The
    /// total file length is determined up front on a best-effort basis;
    /// a failed stat is not an error.
    pub fn compute<F>(
        &self,
        path: &Path,
        mut on_progress: F,
        cancel: &CancelHandle,
    ) -> Result<HashResult, DigestError>
    where
        F: FnMut(u64),
    {
        if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
            return Err(DigestError::InvalidArgument {
                message: "file path must be provided".to_string(),
            });
        }
        if cancel.is_cancelled() {
            return Err(DigestError::Cancelled);
        }

        let started = Instant::now();

        let mut file = File::open(path)
            .map_err(|e| DigestError::from_io_error(e, "opening", Some(path.to_path_buf())))?;

        // Best-effort: an unreadable length means "unknown", not a failure.
        let total = file.metadata().map(|m| m.len()).unwrap_or(0);
        debug!(path = %path.display(), total, chunk_size = self.chunk_size, "digest started");

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut processed = 0u64;
        let mut chunks = 0u64;
        let mut last_reported = None;

        loop {
            let read = file.read(&mut buffer).map_err(|e| {
                DigestError::from_io_error(e, "reading", Some(path.to_path_buf()))
            })?;
            if read == 0 {
                break;
            }
            if cancel.is_cancelled() {
                debug!(path = %path.display(), processed, "digest cancelled");
                return Err(DigestError::Cancelled);
            }

            hasher.update(&buffer[..read]);
            processed += read as u64;
            chunks += 1;

            if chunks % PROGRESS_CHUNK_INTERVAL == 0 || read < self.chunk_size {
                on_progress(processed);
                last_reported = Some(processed);
            }
        }

        // The terminal checkpoint must land on the full byte count even
        // when the last read filled the buffer exactly.
        if last_reported != Some(processed) {
            on_progress(processed);
        }

        let digest = hasher.finalize();
        let hex = hex::encode(digest);
        let base64 = BASE64.encode(digest);
        let elapsed = started.elapsed();
        debug!(path = %path.display(), processed, ?elapsed, "digest complete");

        Ok(HashResult {
            hex,
            base64,
            elapsed,
            bytes: processed,
            path: path.to_path_buf(),
        })
    }
}

impl Default for DigestEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const ABC_SHA256: &str =
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn write_temp(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn compute(engine: &DigestEngine, path: &Path) -> HashResult {
        engine.compute(path, |_| {}, &CancelHandle::new()).unwrap()
    }

    #[test]
    fn test_empty_file_known_vector() {
        let file = write_temp(b"");
        let result = compute(&DigestEngine::new(), file.path());

        assert_eq!(result.hex, EMPTY_SHA256);
        assert_eq!(result.bytes, 0);
        assert_eq!(result.path, file.path());
    }

    #[test]
    fn test_abc_known_vector() {
        let file = write_temp(b"abc");
        let result = compute(&DigestEngine::new(), file.path());

        assert_eq!(result.hex, ABC_SHA256);
        assert_eq!(result.bytes, 3);
    }

    #[test]
    fn test_base64_matches_hex_bytes() {
        let file = write_temp(b"abc");
        let result = compute(&DigestEngine::new(), file.path());

        let from_b64 = BASE64.decode(&result.base64).unwrap();
        let from_hex = hex::decode(&result.hex).unwrap();
        assert_eq!(from_b64, from_hex);
        assert_eq!(from_hex.len(), 32);
    }

    #[test]
    fn test_digest_is_chunk_size_invariant() {
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let file = write_temp(&content);

        let small = DigestEngine::with_chunk_size(1024).unwrap();
        assert_eq!(small.chunk_size(), 1024);
        let medium = DigestEngine::with_chunk_size(1024 * 1024).unwrap();
        let oversized = DigestEngine::with_chunk_size(content.len() * 2).unwrap();

        let a = compute(&small, file.path());
        let b = compute(&medium, file.path());
        let c = compute(&oversized, file.path());

        assert_eq!(a.hex, b.hex);
        assert_eq!(b.hex, c.hex);
        assert_eq!(a.base64, c.base64);
        assert_eq!(a.bytes, content.len() as u64);
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_total() {
        let content = vec![7u8; 10_000];
        let file = write_temp(&content);
        let engine = DigestEngine::with_chunk_size(1024).unwrap();

        let mut reports = Vec::new();
        engine
            .compute(file.path(), |p| reports.push(p), &CancelHandle::new())
            .unwrap();

        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reports.last().unwrap(), content.len() as u64);
    }

    #[test]
    fn test_final_report_on_exact_chunk_multiple() {
        // 4096 bytes with 1024-byte chunks: the last read fills the
        // buffer exactly, so the terminal checkpoint comes from the
        // post-loop report.
        let content = vec![1u8; 4096];
        let file = write_temp(&content);
        let engine = DigestEngine::with_chunk_size(1024).unwrap();

        let mut reports = Vec::new();
        engine
            .compute(file.path(), |p| reports.push(p), &CancelHandle::new())
            .unwrap();

        assert_eq!(*reports.last().unwrap(), 4096);
    }

    #[test]
    fn test_empty_path_rejected_before_io() {
        let engine = DigestEngine::new();
        let err = engine
            .compute(Path::new(""), |_| {}, &CancelHandle::new())
            .unwrap_err();
        assert!(matches!(err, DigestError::InvalidArgument { .. }));

        let err = engine
            .compute(Path::new("   "), |_| {}, &CancelHandle::new())
            .unwrap_err();
        assert!(matches!(err, DigestError::InvalidArgument { .. }));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let engine = DigestEngine::new();
        let err = engine
            .compute(
                Path::new("/nonexistent/shastream-test-file"),
                |_| {},
                &CancelHandle::new(),
            )
            .unwrap_err();
        assert!(matches!(err, DigestError::FileNotFound { .. }));
    }

    #[test]
    fn test_precancelled_handle_reports_nothing() {
        let file = write_temp(b"some content");
        let engine = DigestEngine::new();

        let cancel = CancelHandle::new();
        cancel.cancel();

        let mut reports = Vec::new();
        let err = engine
            .compute(file.path(), |p| reports.push(p), &cancel)
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(reports.is_empty());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            DigestEngine::with_chunk_size(0),
            Err(DigestError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_determinism_across_runs() {
        let file = write_temp(b"hello world");
        let engine = DigestEngine::new();
        let a = compute(&engine, file.path());
        let b = compute(&engine, file.path());
        assert_eq!(a.hex, b.hex);
        assert_eq!(a.base64, b.base64);
    }
}
