//! Property tests over the analyzer and policy using the testkit generators.

use std::sync::OnceLock;

use proptest::prelude::*;

use safehall::core::RiskLevel;
use safehall::policy::{
    AccessPolicy, Channel, ChannelMode, ChannelType, DeniedReason, ParticipantGrant, Principal,
};
use safehall::safety::ContentAnalyzer;
use safehall_testkit::fixtures::school_hours;
use safehall_testkit::generators::{benign_text, channel_type, message_kind, negative_term, permission_level, principal, role};

fn analyzer() -> &'static ContentAnalyzer {
    static ANALYZER: OnceLock<ContentAnalyzer> = OnceLock::new();
    ANALYZER.get_or_init(|| ContentAnalyzer::standard().unwrap())
}

proptest! {
    #[test]
    fn benign_text_is_clean(text in benign_text()) {
        let assessment = analyzer().analyze(&text);
        prop_assert!(assessment.flagged_terms.is_empty());
        prop_assert_eq!(assessment.risk_level, RiskLevel::Low);
        prop_assert_eq!(assessment.safety_score, 1.0);
    }

    #[test]
    fn embedded_term_is_flagged(prefix in benign_text(), term in negative_term(), suffix in benign_text()) {
        let text = format!("{prefix} {} {suffix}", term.to_uppercase());
        let assessment = analyzer().analyze(&text);
        prop_assert!(assessment.flagged_terms.contains(&term));
        prop_assert!(assessment.safety_score < 1.0);
    }

    #[test]
    fn no_grant_means_not_participant(p in principal(), kind in message_kind(), ty in channel_type()) {
        let channel = Channel::new("c", ty, ChannelMode::Moderated, p.org_id.clone(), p.id.clone()).unwrap();
        let decision = AccessPolicy::default().can_send_message(&p, &channel, None, kind, school_hours());
        prop_assert_eq!(decision.denied_reason(), Some(DeniedReason::NotParticipant));
    }

    #[test]
    fn cross_org_grants_never_issue(a in role(), level in permission_level()) {
        let outsider = Principal::new("x", a, "org-elsewhere", "X");
        let channel = Channel::new("c", ChannelType::Direct, ChannelMode::Moderated, "org-northside", "t").unwrap();
        let result = ParticipantGrant::issue(&outsider, &channel, level, 0);
        prop_assert_eq!(result.err(), Some(DeniedReason::CrossOrg));
    }
}
