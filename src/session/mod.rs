// Session controller module
// Owns the Idle -> Hashing -> {Completed | Cancelled | Failed} state
// machine and the supersession token that suppresses stale results.

pub mod controller;
pub mod notify;
pub mod progress;

pub use controller::{HashController, SessionState};
pub use notify::{Change, Terminal};
pub use progress::Progress;
