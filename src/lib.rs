// Library crate for shastream
// Re-exports the digest engine and session controller for the binary
// and integration tests.

pub mod digest;
pub mod session;

pub use digest::{CancelHandle, DigestEngine, DigestError, HashResult, DEFAULT_CHUNK_SIZE};
pub use session::{Change, HashController, Progress, SessionState, Terminal};
