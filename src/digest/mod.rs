// Digest engine module
// Streams a file through incremental SHA-256 with throttled progress
// reporting and cooperative cancellation.

pub mod cancel;
pub mod engine;
pub mod error;

pub use cancel::CancelHandle;
pub use engine::{DigestEngine, HashResult, DEFAULT_CHUNK_SIZE};
pub use error::DigestError;
