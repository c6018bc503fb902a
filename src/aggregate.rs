use std::collections::BTreeMap;

use crate::models::{
    CampaignRow, CampaignSummary, EngagedLeadRow, EntityCounters, MeetingRow, ReplyRow,
    StageCounts,
};

/// A record from one of the source collections that knows which counters it
/// contributes to. Aggregation itself is a single fold over the records, so
/// metrics for every entity come out of one full read per collection instead
/// of one query per entity.
pub trait Countable {
    fn apply(&self, counters: &mut EntityCounters);
}

impl Countable for CampaignRow {
    fn apply(&self, counters: &mut EntityCounters) {
        counters.emails_sent += self.emails_sent;
        counters.prospects_contacted += self.leads_contacted;
        counters.positive_replies += self.interested;
        counters.bounces += self.bounced;
    }
}

impl Countable for ReplyRow {
    fn apply(&self, counters: &mut EntityCounters) {
        counters.total_replies += 1;
        if self.is_real() {
            counters.real_replies += 1;
        }
    }
}

impl Countable for MeetingRow {
    fn apply(&self, counters: &mut EntityCounters) {
        counters.meetings += 1;
    }
}

/// Group records by `key_fn` and accumulate counters in one linear pass.
pub fn aggregate_by<R, F>(records: &[R], key_fn: F) -> BTreeMap<String, EntityCounters>
where
    R: Countable,
    F: Fn(&R) -> String,
{
    let mut map: BTreeMap<String, EntityCounters> = BTreeMap::new();
    for record in records {
        record.apply(map.entry(key_fn(record)).or_default());
    }
    map
}

/// Collapse a record set into a single counter block (the "all entities in
/// scope" view used by the performance overview and the funnel).
pub fn total<R: Countable>(records: &[R]) -> EntityCounters {
    let mut counters = EntityCounters::default();
    for record in records {
        record.apply(&mut counters);
    }
    counters
}

/// Union-merge per-collection maps: every key present in `other` ends up in
/// `base`, with counters added field by field.
pub fn merge_maps(
    base: &mut BTreeMap<String, EntityCounters>,
    other: BTreeMap<String, EntityCounters>,
) {
    for (key, counters) in other {
        base.entry(key).or_default().merge(&counters);
    }
}

/// Per-campaign rollup of summary rows. Keyed by campaign name, keeping the
/// owning client for the reply/meeting distribution step.
pub fn campaign_summaries(rows: &[CampaignRow]) -> Vec<CampaignSummary> {
    let mut map: BTreeMap<String, CampaignSummary> = BTreeMap::new();
    for row in rows {
        let entry = map
            .entry(row.campaign_name.clone())
            .or_insert_with(|| CampaignSummary {
                campaign_name: row.campaign_name.clone(),
                client: row.client.clone(),
                counters: EntityCounters::default(),
            });
        row.apply(&mut entry.counters);
    }
    map.into_values().collect()
}

/// Count engaged-lead stage flags for the downstream funnel stages.
pub fn count_stage_flags(leads: &[EngagedLeadRow]) -> StageCounts {
    let mut counts = StageCounts::default();
    for lead in leads {
        counts.showed_up_to_disco += i64::from(lead.showed_up_to_disco);
        counts.qualified += i64::from(lead.qualified);
        counts.demo_booked += i64::from(lead.demo_booked);
        counts.showed_up_to_demo += i64::from(lead.showed_up_to_demo);
        counts.proposal_sent += i64::from(lead.proposal_sent);
        counts.closed += i64::from(lead.closed);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign_row(client: &str, campaign: &str, emails: i64, leads: i64) -> CampaignRow {
        CampaignRow {
            client: client.to_string(),
            campaign_id: format!("{client}-{campaign}"),
            campaign_name: campaign.to_string(),
            emails_sent: emails,
            leads_contacted: leads,
            interested: 1,
            bounced: 0,
        }
    }

    fn reply(client: &str, category: &str) -> ReplyRow {
        ReplyRow {
            client: client.to_string(),
            category: Some(category.to_string()),
        }
    }

    #[test]
    fn groups_campaign_rows_by_client() {
        let rows = vec![
            campaign_row("Acme", "A", 100, 40),
            campaign_row("Acme", "B", 50, 20),
            campaign_row("Borealis", "C", 10, 5),
        ];
        let by_client = aggregate_by(&rows, |r| r.client.clone());
        assert_eq!(by_client.len(), 2);
        assert_eq!(by_client["Acme"].emails_sent, 150);
        assert_eq!(by_client["Acme"].prospects_contacted, 60);
        assert_eq!(by_client["Acme"].positive_replies, 2);
        assert_eq!(by_client["Borealis"].emails_sent, 10);
    }

    #[test]
    fn replies_split_into_total_and_real() {
        let replies = vec![
            reply("Acme", "Interested"),
            reply("Acme", "Out Of Office"),
            reply("Acme", "Not Interested"),
        ];
        let by_client = aggregate_by(&replies, |r| r.client.clone());
        assert_eq!(by_client["Acme"].total_replies, 3);
        assert_eq!(by_client["Acme"].real_replies, 2);
    }

    #[test]
    fn bulk_pass_matches_per_entity_aggregation() {
        let rows = vec![
            campaign_row("Acme", "A", 100, 40),
            campaign_row("Borealis", "C", 10, 5),
            campaign_row("Acme", "B", 50, 20),
            campaign_row("Cascade", "D", 7, 3),
        ];
        let bulk = aggregate_by(&rows, |r| r.client.clone());

        for client in ["Acme", "Borealis", "Cascade"] {
            let filtered: Vec<CampaignRow> = rows
                .iter()
                .filter(|r| r.client == client)
                .cloned()
                .collect();
            assert_eq!(bulk[client], total(&filtered), "mismatch for {client}");
        }
    }

    #[test]
    fn merge_unions_keys_and_adds_counters() {
        let rows = vec![campaign_row("Acme", "A", 100, 40)];
        let replies = vec![reply("Borealis", "Interested"), reply("Acme", "Interested")];

        let mut merged = aggregate_by(&rows, |r| r.client.clone());
        merge_maps(&mut merged, aggregate_by(&replies, |r| r.client.clone()));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged["Acme"].emails_sent, 100);
        assert_eq!(merged["Acme"].real_replies, 1);
        assert_eq!(merged["Borealis"].emails_sent, 0);
        assert_eq!(merged["Borealis"].real_replies, 1);
    }

    #[test]
    fn campaign_summaries_keep_owning_client() {
        let rows = vec![
            campaign_row("Acme", "A", 100, 40),
            campaign_row("Acme", "A", 20, 10),
            campaign_row("Acme", "B", 50, 20),
        ];
        let summaries = campaign_summaries(&rows);
        assert_eq!(summaries.len(), 2);
        let a = summaries
            .iter()
            .find(|s| s.campaign_name == "A")
            .unwrap();
        assert_eq!(a.client, "Acme");
        assert_eq!(a.counters.emails_sent, 120);
    }

    #[test]
    fn stage_flags_count_each_true() {
        let leads = vec![
            EngagedLeadRow {
                client: "Acme".to_string(),
                showed_up_to_disco: true,
                qualified: true,
                demo_booked: false,
                showed_up_to_demo: false,
                proposal_sent: false,
                closed: false,
            },
            EngagedLeadRow {
                client: "Acme".to_string(),
                showed_up_to_disco: true,
                qualified: false,
                demo_booked: false,
                showed_up_to_demo: false,
                proposal_sent: false,
                closed: false,
            },
        ];
        let counts = count_stage_flags(&leads);
        assert_eq!(counts.showed_up_to_disco, 2);
        assert_eq!(counts.qualified, 1);
        assert_eq!(counts.closed, 0);
    }
}
