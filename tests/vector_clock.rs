// tests/vector_clock.rs
use reverse_entropy_clocks::hash_clock::{HashClock, HashClockUpdater};
use reverse_entropy_clocks::vector_clock::{are_concurrent, are_incomparable, happens_before, VectorClock};

#[test]
fn two_independent_advances_are_concurrent_until_observed() {
    let mut vc = VectorClock::<HashClock>::setup(vec![b"123".to_vec(), b"321".to_vec()]);
    let t0 = vc.read();

    let updater_a = HashClockUpdater::setup(b"root-a-------".to_vec(), 4);
    let (_, value_a) = updater_a.advance(1).unwrap();
    let t1 = vc.advance(b"123", (1, value_a)).unwrap();

    let updater_b = HashClockUpdater::setup(b"root-b-------".to_vec(), 4);
    let (_, value_b) = updater_b.advance(1).unwrap();
    let t2 = vc.advance(b"321", (1, value_b)).unwrap();

    assert!(happens_before(&t0, &t1).unwrap());
    assert!(happens_before(&t1, &t2).unwrap());
    assert!(happens_before(&t0, &t2).unwrap());
    assert!(!happens_before(&t2, &t0).unwrap());
    assert!(vc.verify());
}

#[test]
fn vector_clocks_from_different_setups_are_incomparable() {
    let vc1 = VectorClock::<HashClock>::setup(vec![b"a".to_vec()]);
    let vc2 = VectorClock::<HashClock>::setup(vec![b"a".to_vec()]);
    let t1 = vc1.read();
    let t2 = vc2.read();

    assert!(are_incomparable(&t1, &t2));
    assert!(happens_before(&t1, &t2).is_err());
    assert!(are_concurrent(&t1, &t2).is_err());
}

#[test]
fn update_from_json_snapshot_round_trips_causality() {
    let mut vc = VectorClock::<HashClock>::setup(vec![b"alice".to_vec(), b"bob".to_vec()]);
    let root = HashClockUpdater::setup(b"a shared secret!".to_vec(), 6);
    let (_, value) = root.advance(3).unwrap();
    vc.advance(b"alice", (3, value)).unwrap();

    let snapshot = vc.pack().unwrap();
    let mirrored: VectorClock<HashClock> = VectorClock::unpack(&snapshot).unwrap();

    assert_eq!(mirrored.read(), vc.read());
    assert!(mirrored.verify());
    assert!(mirrored.verify_timestamp(&vc.read()));
}
