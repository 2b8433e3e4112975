use proptest::prelude::*;
use trialgen_core::{
    CandidateCondition, Placement, SingletonPresence, TrialCategory, TrialLabel,
};

#[test]
fn labels_render_with_presence_suffix() {
    let label = TrialLabel::present(TrialCategory::Control);
    assert_eq!(label.to_string(), "C_SP");
    assert_eq!(TrialLabel::absent(TrialCategory::NegativePriming).to_string(), "NP");
}

#[test]
fn labels_parse_both_suffixes() {
    let sp: TrialLabel = "PP_SP".parse().unwrap();
    assert_eq!(sp, TrialLabel::present(TrialCategory::PositivePriming));
    let sa: TrialLabel = "C_SA".parse().unwrap();
    assert_eq!(sa, TrialLabel::absent(TrialCategory::Control));
    assert!("XP".parse::<TrialLabel>().is_err());
}

#[test]
fn priming_tags_match_categories() {
    assert_eq!(TrialCategory::Control.priming(), 0);
    assert_eq!(TrialCategory::NegativePriming.priming(), -1);
    assert_eq!(TrialCategory::PositivePriming.priming(), 1);
    assert_eq!(TrialCategory::from_priming(-1), Some(TrialCategory::NegativePriming));
    assert!(TrialCategory::PositivePriming.is_priming());
    assert!(!TrialCategory::Control.is_priming());
}

#[test]
fn non_singleton_roles_follow_presence() {
    let present = CandidateCondition {
        target: Placement::new(1, 1),
        singleton: Some(Placement::new(2, 2)),
        non_singletons: vec![Placement::new(3, 3)],
    };
    let roles: Vec<usize> = present.non_singleton_roles().map(|(role, _)| role).collect();
    assert_eq!(roles, vec![2]);
    assert_eq!(present.presence(), SingletonPresence::Present);

    let absent = CandidateCondition {
        target: Placement::new(1, 1),
        singleton: None,
        non_singletons: vec![Placement::new(2, 2), Placement::new(3, 3)],
    };
    let roles: Vec<usize> = absent.non_singleton_roles().map(|(role, _)| role).collect();
    assert_eq!(roles, vec![1, 2]);
}

#[test]
fn repeated_digit_is_not_well_formed() {
    let condition = CandidateCondition {
        target: Placement::new(4, 1),
        singleton: Some(Placement::new(4, 2)),
        non_singletons: vec![Placement::new(5, 3)],
    };
    assert!(!condition.is_well_formed());
}

proptest! {
    #[test]
    fn label_display_parses_back(category in 0usize..3, present in any::<bool>()) {
        let category = [
            TrialCategory::Control,
            TrialCategory::NegativePriming,
            TrialCategory::PositivePriming,
        ][category];
        let label = TrialLabel::new(category, SingletonPresence::from_bool(present));
        let parsed: TrialLabel = label.to_string().parse().unwrap();
        prop_assert_eq!(parsed, label);
    }
}
