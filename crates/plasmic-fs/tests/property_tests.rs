//! Property tests for path normalization

use plasmic_fs::NormalizedPath;
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalization_is_idempotent(s in "[a-zA-Z0-9._/\\\\-]{0,40}") {
        let once = NormalizedPath::new(&s);
        let twice = NormalizedPath::new(once.as_str());
        prop_assert_eq!(once.as_str(), twice.as_str());
    }

    #[test]
    fn normalized_paths_have_no_dot_segments(s in "[a-z./]{0,30}") {
        let path = NormalizedPath::new(&s);
        let inner = path.as_str();
        prop_assert!(!inner.contains('\\'));
        if inner != "." {
            prop_assert!(inner.split('/').all(|seg| seg != "."));
        }
    }

    #[test]
    fn joined_child_is_under_parent(dir in "[a-z]{1,8}(/[a-z]{1,8}){0,3}", name in "[a-z]{1,8}\\.tsx") {
        let base = NormalizedPath::new(format!("/{dir}"));
        let child = base.join(&name);
        prop_assert!(child.starts_with(&base));
        prop_assert_eq!(child.file_name(), Some(name.as_str()));
    }
}
