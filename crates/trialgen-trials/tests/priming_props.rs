use proptest::prelude::*;
use trialgen_core::{RngHandle, SingletonPresence, TrialCategory, TrialLabel};
use trialgen_trials::{
    instantiate, verify_sequence, ConditionPool, ControlExclusion, InstantiateOptions,
    VerifyOptions,
};

fn category() -> impl Strategy<Value = TrialCategory> {
    prop_oneof![
        3 => Just(TrialCategory::Control),
        1 => Just(TrialCategory::NegativePriming),
        1 => Just(TrialCategory::PositivePriming),
    ]
}

/// Labels where every NP trial follows a singleton-present trial.
fn feasible_labels() -> impl Strategy<Value = Vec<TrialLabel>> {
    prop::collection::vec((category(), any::<bool>()), 1..40).prop_map(|raw| {
        let mut labels: Vec<TrialLabel> = raw
            .into_iter()
            .map(|(category, present)| TrialLabel::new(category, SingletonPresence::from_bool(present)))
            .collect();
        for index in 1..labels.len() {
            if labels[index].category == TrialCategory::NegativePriming {
                labels[index - 1] = labels[index - 1].with_presence(SingletonPresence::Present);
            }
        }
        labels
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn instantiated_blocks_keep_priming_relations(
        labels in feasible_labels(),
        seed in any::<u64>(),
        relations_only in any::<bool>(),
    ) {
        let pool = ConditionPool::enumerate(9, 3).unwrap();
        let options = InstantiateOptions {
            control: if relations_only { ControlExclusion::Relations } else { ControlExclusion::Strict },
            bias: None,
        };
        let mut rng = RngHandle::from_seed(seed);
        let result = instantiate(&labels, &pool, &options, &mut rng).unwrap();
        prop_assert_eq!(result.records.len(), labels.len());

        let report = verify_sequence(&result.records, &VerifyOptions::default());
        for name in ["priming-relations", "within-trial-integrity", "control-first"] {
            let check = report.check(name).unwrap();
            prop_assert!(check.passed, "{} failed: {}", name, check.detail);
        }
        for pair in result.records.windows(2) {
            if pair[1].label.category == TrialCategory::Control {
                prop_assert_ne!(pair[1].condition.target, pair[0].condition.target);
                prop_assert_ne!(Some(pair[1].condition.target), pair[0].condition.singleton);
            }
        }
    }

    #[test]
    fn enumerated_pools_are_well_formed(n_digits in 2u8..7, n_locations in 2u8..5) {
        prop_assume!(n_locations <= n_digits);
        let pool = ConditionPool::enumerate(n_digits, n_locations).unwrap();
        let falling = |n: usize, k: usize| (n - k + 1..=n).product::<usize>();
        let l = n_locations as usize;
        prop_assert_eq!(pool.len(), 2 * falling(n_digits as usize, l) * falling(l, l));
        prop_assert_eq!(pool.roles(), l);
        for row in pool.rows() {
            prop_assert!(row.is_well_formed());
            prop_assert_eq!(row.placements().count(), l);
        }
        prop_assert_eq!(
            pool.subset(SingletonPresence::Present).count(),
            pool.subset(SingletonPresence::Absent).count()
        );
    }
}
