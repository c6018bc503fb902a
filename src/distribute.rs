use std::collections::BTreeMap;

use crate::models::{CampaignSummary, EntityCounters};

/// How a client-level total is apportioned across that client's campaigns.
///
/// Replies and meetings carry a client attribute but no reliable campaign
/// key, so any per-campaign attribution is an approximation. The policy is a
/// trait so the split can be replaced (proportional by volume, or exact once
/// a real key exists) without touching the funnel or breakdown code.
pub trait AllocationPolicy {
    fn allocate(&self, client_total: i64, campaign_count: usize) -> i64;
}

/// Even split with round-half-up. A client with no campaigns in scope gets 0
/// rather than a division by zero. Rounding means the per-campaign shares can
/// sum to slightly more than the client total; that is accepted, not a bug.
pub struct EvenSplit;

impl AllocationPolicy for EvenSplit {
    fn allocate(&self, client_total: i64, campaign_count: usize) -> i64 {
        if campaign_count == 0 {
            return 0;
        }
        (client_total as f64 / campaign_count as f64).round() as i64
    }
}

/// Fill in reply and meeting counts on per-campaign summaries from the
/// client-level maps, using the given allocation policy.
pub fn apportion_client_counts<P: AllocationPolicy>(
    campaigns: &mut [CampaignSummary],
    replies_by_client: &BTreeMap<String, EntityCounters>,
    meetings_by_client: &BTreeMap<String, EntityCounters>,
    policy: &P,
) {
    let mut campaigns_per_client: BTreeMap<String, usize> = BTreeMap::new();
    for campaign in campaigns.iter() {
        *campaigns_per_client.entry(campaign.client.clone()).or_default() += 1;
    }

    for campaign in campaigns.iter_mut() {
        let count = campaigns_per_client
            .get(&campaign.client)
            .copied()
            .unwrap_or(0);
        if let Some(replies) = replies_by_client.get(&campaign.client) {
            campaign.counters.total_replies = policy.allocate(replies.total_replies, count);
            campaign.counters.real_replies = policy.allocate(replies.real_replies, count);
        }
        if let Some(meetings) = meetings_by_client.get(&campaign.client) {
            campaign.counters.meetings = policy.allocate(meetings.meetings, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(campaign: &str, client: &str) -> CampaignSummary {
        CampaignSummary {
            campaign_name: campaign.to_string(),
            client: client.to_string(),
            counters: EntityCounters::default(),
        }
    }

    fn client_counters(real_replies: i64, meetings: i64) -> EntityCounters {
        EntityCounters {
            total_replies: real_replies,
            real_replies,
            meetings,
            ..EntityCounters::default()
        }
    }

    #[test]
    fn seven_replies_over_two_campaigns_gives_four_each() {
        assert_eq!(EvenSplit.allocate(7, 2), 4);
    }

    #[test]
    fn zero_campaigns_never_divides() {
        assert_eq!(EvenSplit.allocate(7, 0), 0);
    }

    #[test]
    fn exact_division_splits_cleanly() {
        assert_eq!(EvenSplit.allocate(6, 3), 2);
    }

    #[test]
    fn apportions_only_within_the_owning_client() {
        let mut campaigns = vec![
            summary("A", "Acme"),
            summary("B", "Acme"),
            summary("C", "Borealis"),
        ];
        let mut replies = BTreeMap::new();
        replies.insert("Acme".to_string(), client_counters(7, 0));
        replies.insert("Borealis".to_string(), client_counters(3, 0));
        let mut meetings = BTreeMap::new();
        meetings.insert("Acme".to_string(), client_counters(0, 4));

        apportion_client_counts(&mut campaigns, &replies, &meetings, &EvenSplit);

        let by_name: BTreeMap<_, _> = campaigns
            .iter()
            .map(|c| (c.campaign_name.as_str(), &c.counters))
            .collect();
        assert_eq!(by_name["A"].real_replies, 4);
        assert_eq!(by_name["B"].real_replies, 4);
        assert_eq!(by_name["C"].real_replies, 3);
        assert_eq!(by_name["A"].meetings, 2);
        assert_eq!(by_name["C"].meetings, 0);
    }
}
