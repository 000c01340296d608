use proptest::prelude::*;
use scout::ScoutError;
use scout::core::paths::{ancestor_paths, denormalize, normalize};
use std::path::{Path, PathBuf};

const ROOT: &str = "/srv/repo";

fn root() -> &'static Path {
    Path::new(ROOT)
}

#[test]
fn relative_paths_are_taken_as_root_relative() {
    assert_eq!(normalize(root(), Path::new("foo/bar")).unwrap().as_str(), "foo/bar");
    assert_eq!(normalize(root(), Path::new("./foo")).unwrap().as_str(), "foo");
}

#[test]
fn absolute_paths_under_root_are_stripped() {
    assert_eq!(
        normalize(root(), Path::new("/srv/repo/foo/bar")).unwrap().as_str(),
        "foo/bar"
    );
    assert_eq!(
        normalize(root(), Path::new("/srv/repo/foo/bar/")).unwrap().as_str(),
        "foo/bar"
    );
}

#[test]
fn root_and_empty_normalize_to_the_empty_path() {
    assert!(normalize(root(), Path::new("")).unwrap().is_root());
    assert!(normalize(root(), Path::new(".")).unwrap().is_root());
    assert!(normalize(root(), Path::new(ROOT)).unwrap().is_root());
}

#[test]
fn outside_paths_are_rejected() {
    for outside in ["/srv", "/srv/other", "/srv/repository/a", "/"] {
        let err = normalize(root(), Path::new(outside)).unwrap_err();
        assert!(
            matches!(err, ScoutError::PathOutsideTarget { .. }),
            "{outside} should be outside: {err}"
        );
    }
}

#[test]
fn parent_components_are_never_supported() {
    for path in ["..", "a/../b", "/srv/repo/..", "/srv/repo/a/../../x"] {
        let err = normalize(root(), Path::new(path)).unwrap_err();
        assert!(matches!(err, ScoutError::PathNotSupported(_)), "{path}: {err}");
        let err = denormalize(root(), Path::new(path)).unwrap_err();
        assert!(matches!(err, ScoutError::PathNotSupported(_)), "{path}: {err}");
    }
}

#[test]
fn denormalize_joins_relative_and_checks_absolute() {
    assert_eq!(
        denormalize(root(), Path::new("a/b/c")).unwrap(),
        PathBuf::from("/srv/repo/a/b/c")
    );
    assert_eq!(denormalize(root(), Path::new("")).unwrap(), PathBuf::from(ROOT));
    assert_eq!(
        denormalize(root(), Path::new("/srv/repo/a")).unwrap(),
        PathBuf::from("/srv/repo/a")
    );
    let err = denormalize(root(), Path::new("/elsewhere/a")).unwrap_err();
    assert!(matches!(err, ScoutError::PathOutsideTarget { .. }));
}

#[test]
fn ancestor_chain_is_inclusive_and_root_first() {
    let chain = |p: &str| -> Vec<String> {
        ancestor_paths(root(), Path::new(p))
            .unwrap()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    };
    assert_eq!(chain("a/b/c"), vec!["a", "a/b", "a/b/c"]);
    assert_eq!(chain("/srv/repo/a/b"), vec!["a", "a/b"]);
    assert_eq!(chain("a"), vec!["a"]);
    assert!(chain("").is_empty());
    assert!(ancestor_paths(root(), Path::new("/tmp/x")).is_err());
}

fn component() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_][a-zA-Z0-9_. -]{0,11}".prop_filter("not a dot component", |s| {
        s != "." && s != ".."
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn denormalize_inverts_normalize(parts in prop::collection::vec(component(), 0..6)) {
        let relative: PathBuf = parts.iter().collect();
        let absolute = root().join(&relative);

        let from_rel = normalize(root(), &relative).unwrap();
        let from_abs = normalize(root(), &absolute).unwrap();
        prop_assert_eq!(&from_rel, &from_abs);
        prop_assert_eq!(denormalize(root(), from_rel.as_ref()).unwrap(), absolute);
        prop_assert_eq!(from_rel.depth(), parts.len());
    }

    #[test]
    fn ancestor_chain_length_matches_depth(parts in prop::collection::vec(component(), 0..6)) {
        let relative: PathBuf = parts.iter().collect();
        let chain = ancestor_paths(root(), &relative).unwrap();
        prop_assert_eq!(chain.len(), parts.len());
        if let Some(leaf) = chain.last() {
            prop_assert_eq!(leaf, &normalize(root(), &relative).unwrap());
        }
        for pair in chain.windows(2) {
            prop_assert_eq!(pair[1].parent().unwrap(), pair[0].clone());
        }
    }
}
