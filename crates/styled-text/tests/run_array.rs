//! Property tests for `RunArray` against a plain `Vec` model.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use styled_text::RunArray;

#[derive(Debug, Clone)]
enum Op {
    Insert { at: usize, value: u8, count: usize },
    Remove { at: usize, count: usize },
    Set { at: usize, value: u8 },
    SetRange { at: usize, count: usize, value: u8 },
}

fn op() -> impl Strategy<Value = Op> {
    // Few distinct values so that merging happens often.
    prop_oneof![
        (0usize..64, 0u8..3, 0usize..6).prop_map(|(at, value, count)| Op::Insert { at, value, count }),
        (0usize..64, 0usize..6).prop_map(|(at, count)| Op::Remove { at, count }),
        (0usize..64, 0u8..3).prop_map(|(at, value)| Op::Set { at, value }),
        (0usize..64, 0usize..6, 0u8..3).prop_map(|(at, count, value)| Op::SetRange { at, count, value }),
    ]
}

fn materialize(runs: &RunArray<u8>) -> Vec<u8> {
    runs.iter().copied().collect()
}

/// Apply `op` to both, clamping positions into range.
fn apply(runs: &mut RunArray<u8>, model: &mut Vec<u8>, op: &Op) {
    let len = model.len();
    match *op {
        Op::Insert { at, value, count } => {
            let at = at % (len + 1);
            runs.insert(at, value, count).unwrap();
            model.splice(at..at, std::iter::repeat_n(value, count));
        }
        Op::Remove { at, count } => {
            let at = at % (len + 1);
            let count = count.min(len - at);
            runs.remove_range(at, count).unwrap();
            model.drain(at..at + count);
        }
        Op::Set { at, value } if len > 0 => {
            let at = at % len;
            runs.set(at, value).unwrap();
            model[at] = value;
        }
        Op::SetRange { at, count, value } => {
            let at = at % (len + 1);
            let count = count.min(len - at);
            runs.set_range(at, count, value).unwrap();
            model[at..at + count].fill(value);
        }
        Op::Set { .. } => {
            assert!(runs.set(0, 0).is_err());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Edits behave like the same edits on a `Vec` and keep runs maximal.
    #[test]
    fn edits_match_vec_model(ops in prop::collection::vec(op(), 0..40)) {
        let mut runs = RunArray::new();
        let mut model = Vec::new();
        for op in &ops {
            apply(&mut runs, &mut model, op);
            prop_assert!(runs.is_well_formed(), "{op:?} broke {runs:?}");
            prop_assert_eq!(runs.len(), model.len());
        }
        prop_assert_eq!(materialize(&runs), model.clone());
        for (i, value) in model.iter().enumerate() {
            prop_assert_eq!(runs.get(i), Some(value));
        }
        prop_assert_eq!(runs.get(model.len()), None);
    }

    /// Weighted sums agree with a direct sum over the model.
    #[test]
    fn sum_of_matches_model(values in prop::collection::vec(0u8..4, 0..50), a in 0usize..51, b in 0usize..51) {
        let runs = RunArray::from_runs(values.iter().map(|v| (1, *v)));
        let (start, end) = (a.min(b).min(values.len()), a.max(b).min(values.len()));
        let expected: i64 = values[start..end].iter().map(|v| i64::from(*v)).sum();
        prop_assert_eq!(runs.sum_of(start..end, |v| i64::from(*v)).unwrap(), expected);
    }

    /// The element found for a target sum is the one whose span contains the target.
    #[test]
    fn find_by_sum_locates_containing_element(values in prop::collection::vec(0u8..4, 1..50), target in 0i64..120) {
        let runs = RunArray::from_runs(values.iter().map(|v| (1, *v)));
        let total: i64 = values.iter().map(|v| i64::from(*v)).sum();
        match runs.find_by_sum(target, 0, |v| i64::from(*v)) {
            Ok((index, before)) => {
                let expected: i64 = values[..index].iter().map(|v| i64::from(*v)).sum();
                prop_assert_eq!(before, expected);
                prop_assert!(before <= target && target < before + i64::from(values[index]));
            }
            Err((index, _)) => {
                prop_assert!(target >= total);
                prop_assert_eq!(index, values.len() - 1);
            }
        }
    }

    /// Slicing then re-inserting a slice reproduces the original.
    #[test]
    fn slice_and_insert_slice(values in prop::collection::vec(0u8..3, 0..40), a in 0usize..41, b in 0usize..41) {
        let runs = RunArray::from_runs(values.iter().map(|v| (1, *v)));
        let (start, end) = (a.min(b).min(values.len()), a.max(b).min(values.len()));
        let middle = runs.slice(start, end - start).unwrap();
        prop_assert_eq!(materialize(&middle), values[start..end].to_vec());

        let mut rebuilt = runs.clone();
        rebuilt.remove_range(start, end - start).unwrap();
        rebuilt.insert_slice(start, &middle).unwrap();
        prop_assert!(rebuilt.is_well_formed());
        prop_assert_eq!(rebuilt, runs);
    }
}

#[test]
fn test_out_of_range_edits_are_rejected() {
    let mut runs = RunArray::with_value('a', 3);
    assert!(runs.insert(4, 'b', 1).is_err());
    assert!(runs.remove_range(2, 2).is_err());
    assert!(runs.slice(1, 3).is_err());
    assert!(runs.sum_of(0..4, |_| 1).is_err());
    assert_eq!(materialize_chars(&runs), "aaa");
}

#[test]
fn test_from_runs_merges_and_skips_empty() {
    let runs = RunArray::from_runs([(2, 'a'), (0, 'b'), (1, 'a'), (3, 'c')]);
    assert_eq!(runs.run_count(), 2);
    assert_eq!(runs.runs().collect::<Vec<_>>(), vec![(3, &'a'), (3, &'c')]);
    assert_eq!(runs.run_range_at(4), Some(3..6));
}

fn materialize_chars(runs: &RunArray<char>) -> String {
    runs.iter().collect()
}
