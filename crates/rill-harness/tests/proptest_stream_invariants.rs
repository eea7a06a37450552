//! Property-based invariants for variables and operators.
//!
//! 1. Replay law: a subscriber sees the current value, then every write
//! 2. Distinct suppression matches a naive dedup model
//! 3. Fixed-size batching matches `chunks_exact`
//! 4. `zip` emits the latest pair on every arrival once both sides produced
//! 5. `scan` ends at the fold of its inputs
//! 6. `skip_while` / `take_while` match their iterator counterparts

#![forbid(unsafe_code)]

use proptest::prelude::*;
use rill_core::{ObservableExt, Signal, Variable, zip};
use rill_harness::Recorder;

proptest! {
    #[test]
    fn variable_replay_law(
        initial in any::<i32>(),
        before in proptest::collection::vec(any::<i32>(), 0..20),
        after in proptest::collection::vec(any::<i32>(), 0..20),
    ) {
        let variable = Variable::new(initial);
        let early = Recorder::attach(&variable);
        for &v in &before {
            variable.set(v);
        }
        let late = Recorder::attach(&variable);
        for &v in &after {
            variable.set(v);
        }

        let mut expected_early = vec![initial];
        expected_early.extend(&before);
        expected_early.extend(&after);
        prop_assert_eq!(early.values(), expected_early);

        let mut expected_late = vec![*before.last().unwrap_or(&initial)];
        expected_late.extend(&after);
        prop_assert_eq!(late.values(), expected_late);
    }

    #[test]
    fn distinct_matches_dedup(values in proptest::collection::vec(0u8..4, 0..64)) {
        let (signal, sink) = Signal::<u8>::make();
        let recorder = Recorder::attach(&signal.distinct_until_changed());
        for &v in &values {
            sink.send(v);
        }

        let mut expected = values.clone();
        expected.dedup();
        prop_assert_eq!(recorder.values(), expected);
    }

    #[test]
    fn buffered_matches_chunks_exact(
        values in proptest::collection::vec(any::<u16>(), 0..64),
        count in 1usize..8,
    ) {
        let (signal, sink) = Signal::<u16>::make();
        let recorder = Recorder::attach(&signal.buffered(count).unwrap());
        for &v in &values {
            sink.send(v);
        }

        let expected: Vec<Vec<u16>> = values.chunks_exact(count).map(<[u16]>::to_vec).collect();
        prop_assert_eq!(recorder.values(), expected);
    }

    #[test]
    fn zip_is_combine_latest(arrivals in proptest::collection::vec(any::<(bool, u8)>(), 0..64)) {
        let (left, left_sink) = Signal::<u8>::make();
        let (right, right_sink) = Signal::<u8>::make();
        let recorder = Recorder::attach(&zip(&left, &right));

        let (mut l, mut r) = (None, None);
        let mut expected = Vec::new();
        for &(is_left, v) in &arrivals {
            if is_left {
                left_sink.send(v);
                l = Some(v);
            } else {
                right_sink.send(v);
                r = Some(v);
            }
            if let (Some(l), Some(r)) = (l, r) {
                expected.push((l, r));
            }
        }
        prop_assert_eq!(recorder.values(), expected);
    }

    #[test]
    fn scan_ends_at_fold(values in proptest::collection::vec(any::<i16>(), 0..64)) {
        let (signal, sink) = Signal::<i16>::make();
        let sums = signal.scan(0i64, |acc, v| acc + i64::from(v));
        for &v in &values {
            sink.send(v);
        }
        prop_assert_eq!(sums.get(), values.iter().map(|&v| i64::from(v)).sum::<i64>());
    }

    #[test]
    fn gates_match_iterators(values in proptest::collection::vec(0u8..10, 0..64), limit in 0u8..10) {
        let (signal, sink) = Signal::<u8>::make();
        let skipped = Recorder::attach(&signal.skip_while(move |v| *v < limit));
        let taken = Recorder::attach(&signal.take_while(move |v| *v < limit));
        for &v in &values {
            sink.send(v);
        }

        let expected_skip: Vec<u8> = values.iter().copied().skip_while(|v| *v < limit).collect();
        let expected_take: Vec<u8> = values.iter().copied().take_while(|v| *v < limit).collect();
        prop_assert_eq!(skipped.values(), expected_skip);
        prop_assert_eq!(taken.values(), expected_take);
    }
}
