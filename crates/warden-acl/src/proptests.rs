//! Property-based tests for the ACL algebra.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use crate::acl::{Acl, RenderOptions};
    use crate::declaration::RoleAccess;
    use crate::mask::{AccessId, AccessMask};
    use crate::registry::Registry;

    const MAX_ID: u32 = 10;

    fn mask_strategy() -> impl Strategy<Value = AccessMask> {
        prop::collection::btree_set(1..=MAX_ID, 0..5)
            .prop_map(|ids| ids.into_iter().map(AccessId::new).collect())
    }

    fn acl_strategy() -> impl Strategy<Value = Acl> {
        prop::collection::vec(mask_strategy(), 0..4).prop_map(Acl::from_alternatives)
    }

    fn as_set(acl: &Acl) -> BTreeSet<Vec<u32>> {
        acl.alternatives()
            .iter()
            .map(|alt| alt.iter().map(AccessId::get).collect())
            .collect()
    }

    /// Ten identifiers: six permissions and four roles.
    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.define_resource("Book", "read,write,edit").unwrap();
        registry.define_resource("Song", "play,listen,compose").unwrap();
        for role in ["Reader", "Writer", "Listener", "Composer"] {
            registry.define_role(role, None).unwrap();
        }
        registry
            .define_role("Reader", Some(RoleAccess::from("Book.read")))
            .unwrap();
        registry
    }

    proptest! {
        #[test]
        fn test_add_commutes(a in acl_strategy(), b in acl_strategy()) {
            let mut left = a.clone();
            left.add(&b);
            let mut right = b.clone();
            right.add(&a);
            prop_assert_eq!(as_set(&left), as_set(&right));
        }

        #[test]
        fn test_empty_is_add_identity(a in acl_strategy()) {
            let mut acl = Acl::empty();
            acl.add(&a);
            prop_assert_eq!(&acl, &a);
            let mut acl = a.clone();
            acl.add(&Acl::empty());
            prop_assert_eq!(&acl, &a);
        }

        #[test]
        fn test_combine_associates(a in acl_strategy(), b in acl_strategy(), c in acl_strategy()) {
            let mut left = a.clone();
            left.combine(&b).combine(&c);
            let mut inner = b.clone();
            inner.combine(&c);
            let mut right = a.clone();
            right.combine(&inner);
            prop_assert_eq!(as_set(&left), as_set(&right));
        }

        #[test]
        fn test_filter_idempotent(a in acl_strategy(), allowed in acl_strategy()) {
            let mut once = a.clone();
            once.filter(&allowed).unwrap();
            let mut twice = once.clone();
            twice.filter(&allowed).unwrap();
            prop_assert_eq!(as_set(&once), as_set(&twice));
        }

        #[test]
        fn test_optimization_preserves_grants(required in acl_strategy(), granted in acl_strategy()) {
            let expected = required.is_granted_to(&granted);

            let mut minimized = required.clone();
            minimized.minimize().unwrap();
            prop_assert_eq!(minimized.is_granted_to(&granted), expected);

            let mut maximized = granted.clone();
            maximized.maximize().unwrap();
            prop_assert_eq!(required.is_granted_to(&maximized), expected);
        }

        #[test]
        fn test_optimized_alternatives_incomparable(a in acl_strategy()) {
            let mut acl = a.clone();
            acl.minimize().unwrap();
            let alts = acl.alternatives();
            for (i, x) in alts.iter().enumerate() {
                for (j, y) in alts.iter().enumerate() {
                    prop_assert!(i == j || !x.contains_all(y));
                }
            }
        }

        #[test]
        fn test_export_round_trip(a in acl_strategy()) {
            let registry = registry();
            let text = a.render(&registry, RenderOptions::export());
            let parsed = registry.parse(&text).unwrap();
            prop_assert_eq!(parsed, a);
        }

        #[test]
        fn test_facet_matches_rendered_text(a in acl_strategy()) {
            let registry = registry();
            for options in [
                RenderOptions::export().without_roles(),
                RenderOptions::export().without_permissions(),
            ] {
                let text = a.render(&registry, options);
                let parsed = registry.parse(&text).unwrap();
                prop_assert_eq!(parsed, a.facet(&registry, options));
            }
        }
    }
}
