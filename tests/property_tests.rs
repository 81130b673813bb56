use fildup::duplicates::{Classifier, DuplicateFinder, FinderConfig};
use fildup::scanner::{hash_bytes, HashAlgorithm, Hasher};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

proptest! {
    #[test]
    fn test_classifier_groups_match_key_counts(keys in prop::collection::vec(0u8..20, 0..60)) {
        let classifier: Classifier<u8, usize> =
            keys.iter().copied().enumerate().map(|(i, k)| (k, i)).collect();

        let mut expected: HashMap<u8, Vec<usize>> = HashMap::new();
        for (i, k) in keys.iter().enumerate() {
            expected.entry(*k).or_default().push(i);
        }

        for (key, positions) in &expected {
            if positions.len() >= 2 {
                // Arrival order is preserved within a group.
                prop_assert_eq!(classifier.get(key), Some(positions.as_slice()));
                prop_assert!(!classifier.is_unique(key));
            } else {
                prop_assert!(classifier.get(key).is_none());
                prop_assert!(classifier.is_unique(key));
            }
        }

        let grouped = expected.values().filter(|v| v.len() >= 2).count();
        prop_assert_eq!(classifier.group_count(), grouped);
        prop_assert_eq!(classifier.unique_len(), expected.len() - grouped);
        prop_assert_eq!(
            classifier.grouped_len() + classifier.unique_len(),
            keys.len()
        );
    }

    #[test]
    fn test_streaming_digest_matches_one_shot(content in prop::collection::vec(any::<u8>(), 0..200_000)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob");
        fs::write(&path, &content).unwrap();

        for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256] {
            let streamed = Hasher::new().with_algorithm(algorithm).digest(&path).unwrap();
            prop_assert_eq!(streamed, hash_bytes(algorithm, &content));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_groups_are_exactly_identical_content(
        files in prop::collection::vec((0u8..4, 1usize..4), 0..16),
        min_size in 0u64..4,
    ) {
        let dir = TempDir::new().unwrap();
        let mut by_content: BTreeMap<Vec<u8>, BTreeSet<PathBuf>> = BTreeMap::new();

        for (i, (byte, len)) in files.iter().enumerate() {
            let content = vec![*byte; *len];
            let path = dir.path().join(format!("f{i:02}"));
            fs::write(&path, &content).unwrap();
            if content.len() as u64 >= min_size {
                by_content.entry(content).or_default().insert(path);
            }
        }

        let finder = DuplicateFinder::new(FinderConfig::default().with_min_size(min_size));
        let (groups, _) = finder.find_duplicates(dir.path()).unwrap();

        let expected: BTreeSet<BTreeSet<PathBuf>> = by_content
            .into_values()
            .filter(|paths| paths.len() >= 2)
            .collect();
        let actual: BTreeSet<BTreeSet<PathBuf>> = groups
            .iter()
            .map(|g| g.paths.iter().cloned().collect())
            .collect();

        prop_assert_eq!(actual, expected);
        for group in &groups {
            prop_assert!(group.len() >= 2);
            prop_assert!(group.size >= min_size);
        }
    }
}
