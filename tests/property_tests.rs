use proptest::prelude::*;
use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;
use tierdupe::catalog::FileCatalog;
use tierdupe::scanner::{HashTier, Hasher};

/// Short contents over a tiny alphabet so collisions are common.
fn contents() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(0u8..3, 0..6), 0..16)
}

fn build(contents: &[Vec<u8>]) -> (TempDir, FileCatalog) {
    let dir = TempDir::new().unwrap();
    let catalog = FileCatalog::new(dir.path()).unwrap();
    for (i, content) in contents.iter().enumerate() {
        let path = dir.path().join(format!("f{i:02}"));
        fs::write(&path, content).unwrap();
        catalog.add_file(&path).unwrap();
    }
    (dir, catalog)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_compute_is_idempotent(content in prop::collection::vec(any::<u8>(), 0..9000)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, &content).unwrap();

        let hasher = Hasher::new();
        for tier in HashTier::ALL {
            let first = hasher.compute(&path, content.len() as u64, tier, &|| false).unwrap();
            let second = hasher.compute(&path, content.len() as u64, tier, &|| false).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_groups_without_singletons_have_two_members(files in contents()) {
        let (_dir, catalog) = build(&files);
        for tier in HashTier::ALL {
            catalog.compute_tier(tier);
            let set = catalog.group(tier, false);
            for group in set.iter() {
                prop_assert!(group.len() >= 2);
            }
        }
    }

    #[test]
    fn test_group_members_share_size_and_content(files in contents()) {
        let (_dir, catalog) = build(&files);
        catalog.compute_tier(HashTier::Full);

        let set = catalog.group(HashTier::Full, false);
        for group in set.iter() {
            let first = fs::read(group.files()[0].path()).unwrap();
            for member in group.files() {
                prop_assert_eq!(member.size(), group.size());
                prop_assert_eq!(&fs::read(member.path()).unwrap(), &first);
            }
        }

        let size_set = catalog.group(HashTier::Size, false);
        for group in size_set.iter() {
            let sizes: HashSet<u64> = group.files().iter().map(|f| f.size()).collect();
            prop_assert_eq!(sizes.len(), 1);
        }
    }

    #[test]
    fn test_singletons_complete_the_partition(files in contents()) {
        let (_dir, catalog) = build(&files);
        catalog.compute_tier(HashTier::Full);

        let set = catalog.group(HashTier::Full, true);
        prop_assert_eq!(set.excluded(), 0);

        let mut seen = HashSet::new();
        for group in set.iter() {
            for member in group.files() {
                prop_assert!(seen.insert(member.path().to_path_buf()));
            }
        }
        prop_assert_eq!(seen.len(), files.len());

        let distinct: HashSet<&Vec<u8>> = files.iter().collect();
        prop_assert_eq!(set.len(), distinct.len());
    }

    #[test]
    fn test_different_sizes_never_reach_quick_together(files in contents()) {
        let (_dir, catalog) = build(&files);
        catalog.compute_tier(HashTier::Quick);

        let mut counts = std::collections::HashMap::new();
        for f in &files {
            *counts.entry(f.len()).or_insert(0usize) += 1;
        }
        for d in catalog.descriptors() {
            let shared = counts[&(d.size() as usize)] >= 2;
            prop_assert_eq!(d.hash(HashTier::Quick).is_some(), shared);
        }
    }
}
