//! Hash-chain reverse-entropy clock: a creator commits to a secret root
//! and a `max_time`, publishes `uuid = sha256^max_time(root)`, and proves
//! successive timestamps by revealing `(t, sha256^(max_time - t)(root))`
//! — each reveal is closer to `root` (and further from `uuid`) the
//! earlier `t` is, so nobody without `root` can produce a valid
//! timestamp out of order.

use crate::clock_backend::ClockBackend;
use crate::error::{ClockError, Result};
use crate::primitives::{constant_time_eq, recursive_hash};
use rand::RngCore;

/// Holds the secret `root` and can mint timestamps for any `time <=
/// max_time`. Never shared with verifiers — only `HashClock::setup`'s
/// caller (the clock's creator) holds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashClockUpdater {
    root: Vec<u8>,
    uuid: Vec<u8>,
    max_time: u32,
}

impl HashClockUpdater {
    /// Chains `root` forward `max_time` times to fix `uuid`.
    pub fn setup(root: Vec<u8>, max_time: u32) -> Self {
        let uuid = recursive_hash(&root, max_time);
        Self {
            root,
            uuid,
            max_time,
        }
    }

    pub fn uuid(&self) -> &[u8] {
        &self.uuid
    }

    pub fn max_time(&self) -> u32 {
        self.max_time
    }

    pub fn root(&self) -> &[u8] {
        &self.root
    }

    /// Mint the timestamp for `time`. Asking for a time beyond
    /// `max_time` is a programmer error (the chain was never set up to
    /// reach that far), not a rejected timestamp — it fails loudly.
    pub fn advance(&self, time: u32) -> Result<(u32, Vec<u8>)> {
        if time > self.max_time {
            return Err(ClockError::InvalidArgument(format!(
                "time {time} exceeds max_time {}",
                self.max_time
            )));
        }
        let value = recursive_hash(&self.root, self.max_time - time);
        Ok((time, value))
    }

    /// `4-byte big-endian max_time || root`.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.root.len());
        out.extend_from_slice(&self.max_time.to_be_bytes());
        out.extend_from_slice(&self.root);
        out
    }

    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < 5 {
            return Err(ClockError::Malformed(
                "updater pack must be at least 5 bytes".into(),
            ));
        }
        let max_time = u32::from_be_bytes(data[0..4].try_into().unwrap());
        let root = data[4..].to_vec();
        Ok(Self::setup(root, max_time))
    }
}

/// The verifier-side half: tracks the latest accepted `(time, value)`
/// pair and the `uuid` it must ultimately chain back to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashClock {
    uuid: Option<Vec<u8>>,
    state: Option<(u32, Vec<u8>)>,
}

impl HashClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh `root_size`-byte root, build the updater, and
    /// seed this clock's own state at `(0, uuid)`. Calling `setup` twice
    /// is a programmer error.
    pub fn setup(&mut self, max_time: u32, root_size: usize) -> Result<HashClockUpdater> {
        if self.state.is_some() {
            return Err(ClockError::AlreadyInitialized);
        }
        let mut root = vec![0u8; root_size];
        rand::rngs::OsRng.fill_bytes(&mut root);
        let updater = HashClockUpdater::setup(root, max_time);
        self.uuid = Some(updater.uuid.clone());
        self.state = Some((0, updater.uuid.clone()));
        Ok(updater)
    }

    pub fn uuid(&self) -> Option<&[u8]> {
        self.uuid.as_deref()
    }

    pub fn state(&self) -> Option<&(u32, Vec<u8>)> {
        self.state.as_ref()
    }

    /// Current logical time, or `-1` if never set up.
    pub fn read(&self) -> i64 {
        self.state.as_ref().map(|(t, _)| *t as i64).unwrap_or(-1)
    }

    /// `true` until the chain value stops being 32 bytes long — which
    /// for a hash chain can only happen if `root`'s length differs from
    /// 32 (the chain's state is, at time 0, the root itself).
    pub fn can_be_updated(&self) -> bool {
        self.state.as_ref().map(|(_, s)| s.len() == 32).unwrap_or(false)
    }

    pub fn has_terminated(&self) -> bool {
        self.state.is_some() && !self.can_be_updated()
    }

    /// Accept `state` if it's strictly newer and chains back to the
    /// current value in exactly `state.0 - current.0` hashes — an
    /// incremental check, not a walk all the way to `uuid`, so cost
    /// scales with the gap rather than with absolute time.
    ///
    /// Calling `update` before `setup`/`unpack` is a programmer error.
    /// A bad or stale `state` is never an error: it's silently dropped.
    pub fn update(&mut self, state: (u32, Vec<u8>)) -> Result<()> {
        let Some((cur_t, cur_s)) = self.state.clone() else {
            return Err(ClockError::Uninitialized);
        };
        if !self.can_be_updated() {
            return Ok(());
        }
        if state.0 <= cur_t {
            return Ok(());
        }
        let computed = recursive_hash(&state.1, state.0 - cur_t);
        if constant_time_eq(&computed, &cur_s) {
            self.state = Some(state);
        }
        Ok(())
    }

    /// Does the current state chain all the way back to `uuid`?
    pub fn verify(&self) -> bool {
        match (&self.uuid, &self.state) {
            (Some(uuid), Some((t, s))) => constant_time_eq(&recursive_hash(s, *t), uuid),
            (None, None) => true,
            _ => false,
        }
    }

    /// Does an arbitrary candidate timestamp chain back to `uuid`,
    /// without touching `self.state`? Malformed input (including being
    /// asked before `uuid` is known) returns `false`, never panics.
    pub fn verify_timestamp(&self, ts: &(u32, Vec<u8>)) -> bool {
        let Some(uuid) = &self.uuid else {
            return false;
        };
        if ts.1.is_empty() {
            return false;
        }
        constant_time_eq(&recursive_hash(&ts.1, ts.0), uuid)
    }

    /// `4-byte big-endian time || chain value`.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let (t, s) = self.state.as_ref().ok_or(ClockError::Uninitialized)?;
        let mut out = Vec::with_capacity(4 + s.len());
        out.extend_from_slice(&t.to_be_bytes());
        out.extend_from_slice(s);
        Ok(out)
    }

    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < 5 {
            return Err(ClockError::Malformed(
                "clock pack must be at least 5 bytes".into(),
            ));
        }
        let t = u32::from_be_bytes(data[0..4].try_into().unwrap());
        let s = data[4..].to_vec();
        let uuid = recursive_hash(&s, t);
        Ok(Self {
            uuid: Some(uuid),
            state: Some((t, s)),
        })
    }
}

impl ClockBackend for HashClock {
    fn uuid(&self) -> Option<Vec<u8>> {
        self.uuid.clone()
    }

    fn state(&self) -> Option<(u32, Vec<u8>)> {
        self.state.clone()
    }

    fn update(&mut self, state: (u32, Vec<u8>)) -> Result<()> {
        self.update(state)
    }

    fn verify(&self) -> bool {
        self.verify()
    }

    fn verify_timestamp(&self, state: &(u32, Vec<u8>)) -> bool {
        self.verify_timestamp(state)
    }

    fn pack(&self) -> Result<Vec<u8>> {
        self.pack()
    }

    fn unpack(data: &[u8]) -> Result<Self> {
        Self::unpack(data)
    }

    fn chain_forward(value: &[u8], steps: u32) -> Result<Vec<u8>> {
        Ok(recursive_hash(value, steps))
    }

    fn seed_uuid(&mut self, uuid: Vec<u8>) {
        self.state = Some((0, uuid.clone()));
        self.uuid = Some(uuid);
    }
}
