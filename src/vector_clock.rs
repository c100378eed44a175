//! Vector-clock composition over a fixed set of node ids, generic over
//! the clock flavor backing each slot. Adds causal ordering on top of
//! the per-node chains: `happens_before`, `are_concurrent`, and
//! `are_incomparable` reason about a snapshot of every node's state at
//! once (a [`ClockMap`]), not about live clock instances.

use crate::clock_backend::ClockBackend;
use crate::error::{ClockError, Result};
use std::collections::BTreeMap;

/// A read-only snapshot: the vector's outer uuid plus, for every node
/// id, either `(-1, None)` (never touched) or `(time, Some(value))`.
/// This is what `read()`/`advance()` return and what `update()` and the
/// causality predicates consume — never a live `VectorClock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockMap {
    pub uuid: [u8; 16],
    pub entries: BTreeMap<Vec<u8>, (i64, Option<Vec<u8>>)>,
}

/// Two timestamps whose outer uuids differ, or which share no node-id
/// key at all, can't be compared — not "concurrent," genuinely
/// incomparable.
pub fn are_incomparable(ts1: &ClockMap, ts2: &ClockMap) -> bool {
    if ts1.uuid != ts2.uuid {
        return true;
    }
    !ts1.entries.keys().any(|k| ts2.entries.contains_key(k))
}

/// `ts1` happens-before `ts2` iff some shared node's time in `ts1` is
/// strictly earlier and none is strictly later. Calling this on
/// incomparable timestamps is a programmer error — check
/// `are_incomparable` first, or catch the `Err`.
pub fn happens_before(ts1: &ClockMap, ts2: &ClockMap) -> Result<bool> {
    if are_incomparable(ts1, ts2) {
        return Err(ClockError::Incomparable);
    }
    let mut at_least_one_earlier = false;
    let mut reverse_causality = false;
    for (id, (t1, _)) in &ts1.entries {
        let Some((t2, _)) = ts2.entries.get(id) else {
            continue;
        };
        if t1 < t2 {
            at_least_one_earlier = true;
        }
        if t1 > t2 {
            reverse_causality = true;
        }
    }
    Ok(at_least_one_earlier && !reverse_causality)
}

/// Neither happens-before the other.
pub fn are_concurrent(ts1: &ClockMap, ts2: &ClockMap) -> Result<bool> {
    Ok(!happens_before(ts1, ts2)? && !happens_before(ts2, ts1)?)
}

/// A vector clock over a fixed set of node ids, each backed by its own
/// `C` (a [`crate::hash_clock::HashClock`] or
/// [`crate::point_clock::PointClock`]).
#[derive(Debug, Clone)]
pub struct VectorClock<C: ClockBackend> {
    uuid: [u8; 16],
    node_ids: Vec<Vec<u8>>,
    clocks: BTreeMap<Vec<u8>, C>,
}

impl<C: ClockBackend> VectorClock<C> {
    /// Fix the node-id set and assign each one an empty clock slot and a
    /// fresh random outer uuid.
    pub fn setup(node_ids: Vec<Vec<u8>>) -> Self {
        let uuid = *uuid::Uuid::new_v4().as_bytes();
        let clocks = node_ids
            .iter()
            .cloned()
            .map(|id| (id, C::default()))
            .collect();
        Self {
            uuid,
            node_ids,
            clocks,
        }
    }

    pub fn uuid(&self) -> [u8; 16] {
        self.uuid
    }

    pub fn node_ids(&self) -> &[Vec<u8>] {
        &self.node_ids
    }

    pub fn read(&self) -> ClockMap {
        let mut entries = BTreeMap::new();
        for id in &self.node_ids {
            let entry = match self.clocks[id].state() {
                Some((t, s)) => (t as i64, Some(s)),
                None => (-1, None),
            };
            entries.insert(id.clone(), entry);
        }
        ClockMap {
            uuid: self.uuid,
            entries,
        }
    }

    /// Derive `state`'s slot from scratch: chain its value back to time
    /// zero to recover the slot's `uuid`, seed the slot there, then
    /// apply `state` as a normal update. Malformed chain content is
    /// silently ignored rather than bootstrapping garbage.
    fn bootstrap(clock: &mut C, state: &(u32, Vec<u8>)) -> Result<()> {
        match C::chain_forward(&state.1, state.0) {
            Ok(uuid) => {
                clock.seed_uuid(uuid);
                clock.update(state.clone())
            }
            Err(_) => Ok(()),
        }
    }

    /// Record a new timestamp for `node_id` (normally the caller's own
    /// node) and return the resulting snapshot. An unknown `node_id` is
    /// a programmer error.
    pub fn advance(&mut self, node_id: &[u8], state: (u32, Vec<u8>)) -> Result<ClockMap> {
        let clock = self
            .clocks
            .get_mut(node_id)
            .ok_or_else(|| ClockError::InvalidArgument("unknown node id".into()))?;
        if clock.uuid().is_none() {
            Self::bootstrap(clock, &state)?;
        } else {
            clock.update(state.clone())?;
        }
        Ok(self.read())
    }

    /// Fold an externally-received [`ClockMap`] into this vector clock.
    /// A mismatched outer uuid or a node id outside `node_ids` is a
    /// programmer error (this map wasn't meant for this vector); a
    /// stale or tampered per-node state is silently dropped.
    pub fn update(&mut self, map: &ClockMap) -> Result<()> {
        if map.uuid != self.uuid {
            return Err(ClockError::InvalidArgument(
                "vector clock uuid mismatch".into(),
            ));
        }
        for (node_id, (time, value)) in &map.entries {
            let clock = self
                .clocks
                .get_mut(node_id)
                .ok_or_else(|| ClockError::InvalidArgument("unknown node id in update".into()))?;
            let Some(value) = value else { continue };
            let state = (*time as u32, value.clone());
            if clock.uuid().is_none() {
                Self::bootstrap(clock, &state)?;
            } else {
                clock.update(state)?;
            }
        }
        Ok(())
    }

    /// Do all non-empty slots still chain back to their recorded uuid?
    pub fn verify(&self) -> bool {
        self.clocks.values().all(|c| c.verify())
    }

    /// Does `map` verify against this vector's known per-node uuids?
    /// A slot `map` references that we haven't bootstrapped yet is
    /// trusted on first sight (there's nothing yet to refute it with).
    pub fn verify_timestamp(&self, map: &ClockMap) -> bool {
        if map.uuid != self.uuid {
            return false;
        }
        for (node_id, (time, value)) in &map.entries {
            let Some(clock) = self.clocks.get(node_id) else {
                return false;
            };
            let Some(value) = value else { continue };
            if clock.uuid().is_some() && !clock.verify_timestamp(&(*time as u32, value.clone())) {
                return false;
            }
        }
        true
    }

    /// Compact JSON: `{"uuid": "<hex>", "<hex node id>": "<hex
    /// pack()>" | null, ...}`, keys sorted lexicographically.
    pub fn pack(&self) -> Result<String> {
        let mut map: BTreeMap<String, Option<String>> = BTreeMap::new();
        map.insert("uuid".to_string(), Some(hex::encode(self.uuid)));
        for id in &self.node_ids {
            let clock = &self.clocks[id];
            let packed = if clock.uuid().is_some() {
                Some(hex::encode(clock.pack()?))
            } else {
                None
            };
            map.insert(hex::encode(id), packed);
        }
        serde_json::to_string(&map).map_err(|e| ClockError::Malformed(e.to_string()))
    }

    pub fn unpack(data: &str) -> Result<Self> {
        let map: BTreeMap<String, Option<String>> =
            serde_json::from_str(data).map_err(|e| ClockError::Malformed(e.to_string()))?;

        let uuid_hex = map
            .get("uuid")
            .and_then(|v| v.clone())
            .ok_or_else(|| ClockError::Malformed("missing uuid".into()))?;
        let uuid_bytes =
            hex::decode(uuid_hex).map_err(|e| ClockError::Malformed(e.to_string()))?;
        let uuid: [u8; 16] = uuid_bytes
            .try_into()
            .map_err(|_| ClockError::Malformed("uuid must be 16 bytes".into()))?;

        let mut node_ids = Vec::new();
        let mut clocks = BTreeMap::new();
        for (key, value) in &map {
            if key == "uuid" {
                continue;
            }
            let id = hex::decode(key).map_err(|e| ClockError::Malformed(e.to_string()))?;
            let clock = match value {
                Some(hex_packed) => {
                    let bytes = hex::decode(hex_packed)
                        .map_err(|e| ClockError::Malformed(e.to_string()))?;
                    C::unpack(&bytes)?
                }
                None => C::default(),
            };
            node_ids.push(id.clone());
            clocks.insert(id, clock);
        }

        Ok(Self {
            uuid,
            node_ids,
            clocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_clock::HashClock;

    fn two_node_vector() -> VectorClock<HashClock> {
        VectorClock::setup(vec![b"123".to_vec(), b"321".to_vec()])
    }

    #[test]
    fn fresh_vector_has_sentinel_entries() {
        let vc = two_node_vector();
        let map = vc.read();
        assert_eq!(map.entries.len(), 2);
        for (_, v) in &map.entries {
            assert_eq!(v, &(-1, None));
        }
        assert!(vc.verify());
    }

    #[test]
    fn advance_on_unknown_node_is_an_error() {
        let mut vc = two_node_vector();
        assert!(vc.advance(b"nope", (1, vec![1, 2, 3])).is_err());
    }

    #[test]
    fn happens_before_across_advances() {
        let mut vc = two_node_vector();
        let t0 = vc.read();

        let ts1 = vc
            .advance(b"123", (1, {
                let updater_root = crate::hash_clock::HashClockUpdater::setup(vec![0u8; 16], 5);
                let (_, v) = updater_root.advance(1).unwrap();
                v
            }))
            .unwrap();
        assert!(happens_before(&t0, &ts1).unwrap());
        assert!(!happens_before(&ts1, &t0).unwrap());

        let root2 = crate::hash_clock::HashClockUpdater::setup(vec![1u8; 16], 5);
        let (_, v2) = root2.advance(1).unwrap();
        let ts2 = vc.advance(b"321", (1, v2)).unwrap();

        assert!(happens_before(&ts1, &ts2).unwrap());
        assert!(happens_before(&t0, &ts2).unwrap());
        assert!(!happens_before(&ts2, &t0).unwrap());
    }

    #[test]
    fn happens_before_self_is_false_and_self_is_concurrent() {
        let vc = two_node_vector();
        let t0 = vc.read();
        assert!(!happens_before(&t0, &t0).unwrap());
        assert!(are_concurrent(&t0, &t0).unwrap());
    }

    #[test]
    fn mismatched_uuids_are_incomparable() {
        let vc1 = two_node_vector();
        let vc2 = two_node_vector();
        let t1 = vc1.read();
        let t2 = vc2.read();
        assert!(are_incomparable(&t1, &t2));
        assert!(happens_before(&t1, &t2).is_err());
    }

    #[test]
    fn update_rejects_foreign_uuid() {
        let mut vc1 = two_node_vector();
        let vc2 = two_node_vector();
        let foreign = vc2.read();
        assert!(vc1.update(&foreign).is_err());
    }

    #[test]
    fn pack_unpack_round_trip() {
        let mut vc = two_node_vector();
        let root = crate::hash_clock::HashClockUpdater::setup(vec![3u8; 16], 4);
        let (_, v) = root.advance(2).unwrap();
        vc.advance(b"123", (2, v)).unwrap();

        let packed = vc.pack().unwrap();
        assert!(packed.starts_with('{'));
        let restored: VectorClock<HashClock> = VectorClock::unpack(&packed).unwrap();
        assert_eq!(restored.uuid(), vc.uuid());
        assert_eq!(restored.read(), vc.read());
    }
}
