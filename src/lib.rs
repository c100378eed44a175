//! Reverse-entropy logical clocks: a creator commits to a secret and
//! proves the passage of logical time by revealing successive points on
//! a one-way chain, without any party (including the creator) being able
//! to forge or backdate a timestamp. Two chain flavors are provided —
//! [`hash_clock`] (SHA-256 preimage chain) and [`point_clock`] (Ed25519
//! point-doubling chain, which additionally supports signing messages
//! under the current time) — composed into causally-ordered
//! [`vector_clock::VectorClock`]s generic over either backend.
//!
//! This is a pure, synchronous, in-memory library: no I/O, no
//! background threads, no logging subscriber wired in (there's nothing
//! here worth instrumenting that isn't already visible in a `Result`).
//! Callers own all persistence and synchronization; see each module's
//! docs for the concurrency contract.

pub mod clock_backend;
pub mod error;
pub mod hash_clock;
pub mod point_clock;
pub mod primitives;
pub mod vector_clock;

pub use clock_backend::ClockBackend;
pub use error::{ClockError, Result};
pub use hash_clock::{HashClock, HashClockUpdater};
pub use point_clock::{PointClock, PointClockUpdater, Timestamp};
pub use vector_clock::{are_concurrent, are_incomparable, happens_before, ClockMap, VectorClock};

/// Crate version, same convention as the SDK this workspace grew out of.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient glob import for consumers.
pub mod prelude {
    pub use crate::clock_backend::ClockBackend;
    pub use crate::error::{ClockError, Result};
    pub use crate::hash_clock::{HashClock, HashClockUpdater};
    pub use crate::point_clock::{PointClock, PointClockUpdater, Timestamp};
    pub use crate::vector_clock::{
        are_concurrent, are_incomparable, happens_before, ClockMap, VectorClock,
    };
}
