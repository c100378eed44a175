//! Ed25519 point-chain reverse-entropy clock. Structurally the mirror of
//! [`crate::hash_clock`] — a creator commits to a root, publishes
//! `uuid = max_time` doublings of `G * skey`, and proves timestamps by
//! revealing fewer doublings as "now" approaches `max_time` — but built
//! on point (and scalar) doubling instead of hashing, which additionally
//! lets a timestamp carry a Schnorr-style signature under the
//! time-`t` point.
//!
//! Point doubling has no preimage resistance (see
//! [`crate::primitives::recursive_next_point`]'s doc comment), so unlike
//! the hash chain this one never terminates: every chain value here is
//! always exactly a compressed 32-byte Ed25519 point.

use crate::clock_backend::ClockBackend;
use crate::error::{ClockError, Result};
use crate::primitives::{
    constant_time_eq, derive_key_from_seed, derive_point_from_scalar, h_small,
    recursive_next_point, recursive_next_scalar, sign_with_scalar,
};
use ed25519_dalek::{Signature, VerifyingKey};
use rand::RngCore;
use signature::Verifier;

/// A timestamp that may or may not carry a signature over some message —
/// modeled as a tagged sum rather than sniffing arity at runtime, since
/// the two shapes are verified differently.
#[derive(Debug, Clone)]
pub enum Timestamp {
    Plain {
        time: u32,
        value: Vec<u8>,
    },
    Signed {
        time: u32,
        value: Vec<u8>,
        signature: Box<[u8; 64]>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointClockUpdater {
    root: Vec<u8>,
    uuid: [u8; 32],
    max_time: u32,
}

impl PointClockUpdater {
    fn scalar0(root: &[u8]) -> [u8; 32] {
        derive_key_from_seed(&h_small(&[root]))
    }

    fn point0(root: &[u8]) -> [u8; 32] {
        derive_point_from_scalar(&Self::scalar0(root))
    }

    pub fn setup(root: Vec<u8>, max_time: u32) -> Result<Self> {
        let point0 = Self::point0(&root);
        let uuid_vec = recursive_next_point(&point0, max_time)?;
        let uuid: [u8; 32] = uuid_vec.try_into().expect("point is always 32 bytes");
        Ok(Self {
            root,
            uuid,
            max_time,
        })
    }

    pub fn uuid(&self) -> &[u8; 32] {
        &self.uuid
    }

    pub fn max_time(&self) -> u32 {
        self.max_time
    }

    pub fn root(&self) -> &[u8] {
        &self.root
    }

    pub fn advance(&self, time: u32) -> Result<(u32, Vec<u8>)> {
        if time > self.max_time {
            return Err(ClockError::InvalidArgument(format!(
                "time {time} exceeds max_time {}",
                self.max_time
            )));
        }
        let point0 = Self::point0(&self.root);
        let point_t = recursive_next_point(&point0, self.max_time - time)?;
        Ok((time, point_t))
    }

    /// Like [`Self::advance`], but also signs `message` under the
    /// time-`t` point, so a verifier who trusts `uuid` can check both
    /// "this timestamp is genuine" and "this message was endorsed at
    /// this time" in one shot.
    pub fn advance_and_sign(&self, time: u32, message: &[u8]) -> Result<Timestamp> {
        if time > self.max_time {
            return Err(ClockError::InvalidArgument(format!(
                "time {time} exceeds max_time {}",
                self.max_time
            )));
        }
        let scalar0 = Self::scalar0(&self.root);
        let x_t = recursive_next_scalar(&scalar0, self.max_time - time)?;
        let x_t: [u8; 32] = x_t.try_into().expect("scalar doubling preserves length");
        let signature = sign_with_scalar(&x_t, message, &self.root);
        let point_t = derive_point_from_scalar(&x_t);
        Ok(Timestamp::Signed {
            time,
            value: point_t.to_vec(),
            signature: Box::new(signature),
        })
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
        Self::setup(root, max_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointClock {
    uuid: Option<[u8; 32]>,
    state: Option<(u32, Vec<u8>)>,
}

impl PointClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setup(&mut self, max_time: u32, root_size: usize) -> Result<PointClockUpdater> {
        if self.state.is_some() {
            return Err(ClockError::AlreadyInitialized);
        }
        let mut root = vec![0u8; root_size];
        rand::rngs::OsRng.fill_bytes(&mut root);
        let updater = PointClockUpdater::setup(root, max_time)?;
        self.uuid = Some(updater.uuid);
        self.state = Some((0, updater.uuid.to_vec()));
        Ok(updater)
    }

    pub fn uuid(&self) -> Option<&[u8; 32]> {
        self.uuid.as_ref()
    }

    pub fn state(&self) -> Option<&(u32, Vec<u8>)> {
        self.state.as_ref()
    }

    pub fn read(&self) -> i64 {
        self.state.as_ref().map(|(t, _)| *t as i64).unwrap_or(-1)
    }

    /// Accept `state` if newer and it doubles back to the current value
    /// in exactly `state.0 - current.0` doublings. As with the hash
    /// variant: uninitialized use is a loud error, everything else is a
    /// silent accept-or-drop.
    pub fn update(&mut self, state: (u32, Vec<u8>)) -> Result<()> {
        let Some((cur_t, cur_s)) = self.state.clone() else {
            return Err(ClockError::Uninitialized);
        };
        if state.0 <= cur_t {
            return Ok(());
        }
        let computed = match recursive_next_point(&state.1, state.0 - cur_t) {
            Ok(v) => v,
            Err(_) => return Ok(()),
        };
        if constant_time_eq(&computed, &cur_s) {
            self.state = Some(state);
        }
        Ok(())
    }

    pub fn verify(&self) -> bool {
        match (&self.uuid, &self.state) {
            (Some(uuid), Some((t, s))) => match recursive_next_point(s, *t) {
                Ok(computed) => constant_time_eq(&computed, uuid),
                Err(_) => false,
            },
            (None, None) => true,
            _ => false,
        }
    }

    pub fn verify_timestamp(&self, ts: &(u32, Vec<u8>)) -> bool {
        let Some(uuid) = &self.uuid else {
            return false;
        };
        match recursive_next_point(&ts.1, ts.0) {
            Ok(computed) => constant_time_eq(&computed, uuid),
            Err(_) => false,
        }
    }

    /// Verify both the chain membership of `(t, point)` and that
    /// `signature` is a valid Ed25519 signature over `message` under
    /// `point`.
    pub fn verify_signed_timestamp(
        &self,
        ts: &(u32, Vec<u8>, [u8; 64]),
        message: &[u8],
    ) -> bool {
        let (t, point, signature) = ts;
        if !self.verify_timestamp(&(*t, point.clone())) {
            return false;
        }
        let Ok(point_bytes): std::result::Result<[u8; 32], _> = point.as_slice().try_into()
        else {
            return false;
        };
        let Ok(vk) = VerifyingKey::from_bytes(&point_bytes) else {
            return false;
        };
        let sig = Signature::from_bytes(signature);
        vk.verify(message, &sig).is_ok()
    }

    /// Dispatches on the [`Timestamp`] tag: plain timestamps go through
    /// `verify_timestamp`, signed ones additionally need `message` and
    /// go through `verify_signed_timestamp`.
    pub fn verify_any(&self, ts: &Timestamp, message: Option<&[u8]>) -> bool {
        match ts {
            Timestamp::Plain { time, value } => self.verify_timestamp(&(*time, value.clone())),
            Timestamp::Signed {
                time,
                value,
                signature,
            } => match message {
                Some(m) => self.verify_signed_timestamp(&(*time, value.clone(), **signature), m),
                None => false,
            },
        }
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
        let uuid_vec = recursive_next_point(&s, t)?;
        let uuid: [u8; 32] = uuid_vec.try_into().expect("point is always 32 bytes");
        Ok(Self {
            uuid: Some(uuid),
            state: Some((t, s)),
        })
    }
}

impl ClockBackend for PointClock {
    fn uuid(&self) -> Option<Vec<u8>> {
        self.uuid.map(|u| u.to_vec())
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
        recursive_next_point(value, steps)
    }

    fn seed_uuid(&mut self, uuid: Vec<u8>) {
        if let Ok(arr) = <[u8; 32]>::try_from(uuid.as_slice()) {
            self.uuid = Some(arr);
            self.state = Some((0, uuid));
        }
    }
}
