//! Property-based tests for names, paths and resource identity.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use editflow::core::identity::ResourceIdentity;
use editflow::core::naming::{is_sanitized_path, sanitize_path, sanitize_segment};
use editflow::core::paths::{self, Sidecar};
use editflow::core::types::Shasum;
use editflow::engine::form::Form;

/// Strategy for arbitrary user-typed file names.
fn typed_name() -> impl Strategy<Value = String> {
    "[ a-zA-Z0-9_.\\-!?/]{0,40}"
}

/// Strategy for already-clean path segments.
fn clean_segment() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}(-[a-z0-9]{1,8}){0,2}(\\.[a-z]{1,4})?"
}

fn clean_path() -> impl Strategy<Value = String> {
    prop::collection::vec(clean_segment(), 1..5).prop_map(|segs| segs.join("/"))
}

proptest! {
    /// Sanitizing is idempotent.
    #[test]
    fn sanitize_segment_idempotent(name in typed_name()) {
        let once = sanitize_segment(&name);
        prop_assert_eq!(sanitize_segment(&once), once.clone());
    }

    /// Sanitized segments contain only safe characters and never a slash.
    #[test]
    fn sanitize_segment_charset(name in typed_name()) {
        let clean = sanitize_segment(&name);
        prop_assert!(clean
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'));
        prop_assert!(!clean.starts_with(['-', '.']));
        prop_assert!(!clean.ends_with(['-', '.']));
    }

    /// A sanitized path can never climb out of its directory.
    #[test]
    fn sanitize_path_has_no_traversal(path in typed_name()) {
        let clean = sanitize_path(&path);
        prop_assert!(is_sanitized_path(&clean));
        prop_assert!(
            clean.is_empty() || !clean.split('/').any(|seg| seg == ".." || seg == "." || seg.is_empty())
        );
    }

    /// Clean paths survive sanitization unchanged.
    #[test]
    fn clean_paths_are_fixed_points(path in clean_path()) {
        prop_assert_eq!(sanitize_path(&path), path);
    }

    /// Sidecar paths parse back to the identity they came from.
    #[test]
    fn sidecar_path_strips_back(path in clean_path(), code in "[a-z]{2}") {
        let id = ResourceIdentity::parse("content", &code, &path).unwrap();
        for kind in Sidecar::ALL {
            let sidecar = id.sidecar_path(kind);
            let (base, found) = Sidecar::strip(&sidecar);
            prop_assert_eq!(base, id.file_path());
            prop_assert_eq!(found, Some(kind));
        }
    }

    /// Identity ignores leading, trailing and doubled slashes.
    #[test]
    fn identity_normalizes_slashes(path in clean_path()) {
        let plain = ResourceIdentity::parse("content", "en", &path).unwrap();
        let messy_path = format!("//{}/", path.replace('/', "//"));
        let messy = ResourceIdentity::parse("content", "/en/", &messy_path).unwrap();
        prop_assert_eq!(plain.canonical(), messy.canonical());
        prop_assert_eq!(plain, messy);
    }

    /// The parent of a joined path is the directory joined onto.
    #[test]
    fn join_then_parent(dir in clean_path(), name in clean_segment()) {
        let joined = paths::join(&[&dir, &name]);
        prop_assert_eq!(paths::parent(&joined), dir.as_str());
        prop_assert_eq!(paths::file_name(&joined), name.as_str());
    }

    /// Shasums are stable and sensitive to a single flipped byte.
    #[test]
    fn shasum_detects_changes(
        bytes in prop::collection::vec(any::<u8>(), 1..256),
        at in any::<prop::sample::Index>(),
    ) {
        let original = Shasum::of(&bytes);
        prop_assert_eq!(Shasum::of(&bytes), original.clone());
        let mut flipped = bytes.clone();
        let i = at.index(flipped.len());
        flipped[i] ^= 0xff;
        prop_assert_ne!(Shasum::of(&flipped), original);
    }

    /// Any key=value pair parses back to its parts.
    #[test]
    fn form_pairs_split_on_first_equals(key in "[a-z][a-z~\\-]{0,15}", value in "[ -~]{0,30}") {
        let (k, v) = Form::parse_pair(&format!("{key}={value}")).unwrap();
        prop_assert_eq!(k, key);
        prop_assert_eq!(v, value);
    }
}
