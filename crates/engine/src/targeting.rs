use crate::segmentation::Segment;

/// Which survey each segment is routed to. `demo` doubles as the fallback
/// for wallets no targeted survey wants.
pub fn select_survey_for_segment(segment: Segment) -> &'static str {
    match segment {
        Segment::YieldOptimizer => "yield-optimizer-advanced",
        Segment::YieldCurious => "yield-curious-onboarding",
        Segment::MemecoinDegen => "memecoin-sentiment",
        Segment::ConservativeDefi => "conservative-yield",
        Segment::NftCollector => "nft-utility",
        Segment::Beginner => "demo",
    }
}

/// USDC-equivalent reward for completing a survey. Unknown survey ids get
/// the demo amount.
pub fn reward_amount_for_survey(survey_id: &str) -> u32 {
    match survey_id {
        "yield-optimizer-advanced" => 5,
        "yield-curious-onboarding" => 3,
        "memecoin-sentiment" => 2,
        "conservative-yield" => 3,
        "nft-utility" => 2,
        _ => 1,
    }
}

/// Approximate ETH equivalents for the USDC amounts, pinned at the rate the
/// reward wallet was funded at.
pub fn eth_equivalent(usdc_amount: u32) -> &'static str {
    match usdc_amount {
        5 => "0.002",
        3 => "0.0012",
        2 => "0.0008",
        _ => "0.0004",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_segment_routes_to_a_survey() {
        let segments = [
            Segment::YieldOptimizer,
            Segment::YieldCurious,
            Segment::MemecoinDegen,
            Segment::ConservativeDefi,
            Segment::NftCollector,
            Segment::Beginner,
        ];
        for segment in segments {
            assert!(!select_survey_for_segment(segment).is_empty());
        }
        assert_eq!(select_survey_for_segment(Segment::Beginner), "demo");
    }

    #[test]
    fn test_reward_amounts() {
        assert_eq!(reward_amount_for_survey("yield-optimizer-advanced"), 5);
        assert_eq!(reward_amount_for_survey("yield-curious-onboarding"), 3);
        assert_eq!(reward_amount_for_survey("memecoin-sentiment"), 2);
        assert_eq!(reward_amount_for_survey("conservative-yield"), 3);
        assert_eq!(reward_amount_for_survey("nft-utility"), 2);
        assert_eq!(reward_amount_for_survey("demo"), 1);
        assert_eq!(reward_amount_for_survey("never-heard-of-it"), 1);
    }

    #[test]
    fn test_eth_equivalents() {
        assert_eq!(eth_equivalent(5), "0.002");
        assert_eq!(eth_equivalent(3), "0.0012");
        assert_eq!(eth_equivalent(2), "0.0008");
        assert_eq!(eth_equivalent(1), "0.0004");
        assert_eq!(eth_equivalent(99), "0.0004");
    }
}
