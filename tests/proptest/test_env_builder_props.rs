//! Property-based tests for environment prepend rules

use proptest::prelude::*;
use release_verify::env::{build, EnvRule};
use std::collections::HashMap;

proptest! {
    #[test]
    fn test_two_prepends_order(
        original in "[a-zA-Z0-9/_.-]{1,30}",
        a in "[a-zA-Z0-9/_.-]{1,30}",
        b in "[a-zA-Z0-9/_.-]{1,30}",
    ) {
        let mut base = HashMap::new();
        base.insert("X".to_string(), original.clone());

        let env = build(&base, &[EnvRule::path("X", a.clone()), EnvRule::path("X", b.clone())]);
        prop_assert_eq!(&env["X"], &format!("{}:{}:{}", b, a, original));
    }

    #[test]
    fn test_unrelated_variables_unchanged(
        vars in prop::collection::hash_map("[A-Z]{1,8}", "[a-z0-9]{0,12}", 0..10),
        value in "[a-z]{1,10}",
    ) {
        let env = build(&vars, &[EnvRule::path("RV_TARGET_VAR", value.clone())]);

        prop_assert_eq!(&env["RV_TARGET_VAR"], &value);
        for (key, original) in &vars {
            prop_assert_eq!(&env[key], original);
        }
        prop_assert_eq!(env.len(), vars.len() + 1);
    }

    #[test]
    fn test_rule_count_matches_segments(
        values in prop::collection::vec("[a-z]{1,6}", 1..8),
    ) {
        let rules: Vec<EnvRule> = values.iter().map(|v| EnvRule::path("P", v.clone())).collect();
        let env = build(&HashMap::new(), &rules);

        let segments: Vec<&str> = env["P"].split(':').collect();
        let reversed: Vec<&str> = values.iter().rev().map(String::as_str).collect();
        prop_assert_eq!(segments, reversed);
    }
}
