use ffs_store::{extract_records, extract_records_from_text, format_index, merge_record_sets, ConfigRecord};
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = ConfigRecord> {
    (0usize..5, "[a-z]{1,6}", "[a-z]{1,6}")
        .prop_map(|(interface, file, parent)| ConfigRecord::new(interface, file, parent))
}

fn sorted(mut records: Vec<ConfigRecord>) -> Vec<ConfigRecord> {
    records.sort();
    records
}

proptest! {
    #[test]
    fn merge_order_does_not_change_record_multiset(
        parts in proptest::collection::vec(proptest::collection::vec(record_strategy(), 0..6), 1..6),
        rotation in 0usize..6,
    ) {
        let forward = merge_record_sets(parts.clone());

        let mut reversed_parts = parts.clone();
        reversed_parts.reverse();
        let reversed = merge_record_sets(reversed_parts);

        let mut rotated_parts = parts.clone();
        let len = rotated_parts.len();
        rotated_parts.rotate_left(rotation % len);
        let rotated = merge_record_sets(rotated_parts);

        // Pairwise partial merges, then a merge of the partials.
        let mut partials = Vec::new();
        for chunk in parts.chunks(2) {
            partials.push(merge_record_sets(chunk.to_vec()));
        }
        let nested = merge_record_sets(partials);

        prop_assert_eq!(sorted(forward.clone()), sorted(reversed));
        prop_assert_eq!(sorted(forward.clone()), sorted(rotated));
        prop_assert_eq!(forward, nested);
    }

    #[test]
    fn extraction_is_a_stable_filter(
        records in proptest::collection::vec(record_strategy(), 0..20),
        interface in 0usize..6,
    ) {
        let expected: Vec<ConfigRecord> = records
            .iter()
            .filter(|record| record.interface == interface)
            .cloned()
            .collect();
        let found = extract_records(interface, &records);
        if expected.is_empty() {
            prop_assert!(found.is_none());
        } else {
            prop_assert_eq!(found, Some(expected.clone()));
        }

        let from_text = extract_records_from_text(interface, &format_index(&records)).unwrap();
        prop_assert_eq!(from_text.unwrap_or_default(), expected);
    }
}
