//! The capability set [`crate::vector_clock::VectorClock`] needs from a
//! single clock, so it can hold either [`crate::hash_clock::HashClock`]
//! or [`crate::point_clock::PointClock`] (or in principle a future third
//! flavor) without duplicating the near-identical composition logic
//! twice.

use crate::error::Result;

pub trait ClockBackend: Default + Clone {
    /// The clock's fixed identity, once known, or `None` before setup
    /// (and before a vector clock has bootstrapped this slot).
    fn uuid(&self) -> Option<Vec<u8>>;

    /// The current `(time, value)` pair, or `None` before setup.
    fn state(&self) -> Option<(u32, Vec<u8>)>;

    /// Accept a timestamp if it verifies against the current state.
    /// Returns `Err` only for uninitialized-use; a rejected timestamp is
    /// a silent no-op, `Ok(())`.
    fn update(&mut self, state: (u32, Vec<u8>)) -> Result<()>;

    /// Does the current state still chain back to `uuid`?
    fn verify(&self) -> bool;

    /// Does this candidate timestamp chain back to `uuid`?
    fn verify_timestamp(&self, state: &(u32, Vec<u8>)) -> bool;

    fn pack(&self) -> Result<Vec<u8>>;

    fn unpack(data: &[u8]) -> Result<Self>
    where
        Self: Sized;

    /// Chain `value` forward `steps` times (sha256 for the hash variant,
    /// point doubling for the point variant). Used by `VectorClock` to
    /// derive a never-before-seen slot's `uuid` from the first timestamp
    /// it's handed for that slot.
    fn chain_forward(value: &[u8], steps: u32) -> Result<Vec<u8>>;

    /// Seed a previously-empty slot directly at `(0, uuid)`, bypassing
    /// `update`'s monotonicity check — used only for vector-clock
    /// bootstrapping.
    fn seed_uuid(&mut self, uuid: Vec<u8>);
}
