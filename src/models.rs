use chrono::NaiveDate;
use serde::Serialize;

/// Query scope shared by every view: optional client, optional campaign,
/// optional date window. Bounds are normalized on construction, so an
/// inverted range from a caller is swapped rather than rejected.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    client: Option<String>,
    campaign: Option<String>,
    bounds: Option<(NaiveDate, NaiveDate)>,
}

impl Filter {
    pub fn new(
        client: Option<String>,
        campaign: Option<String>,
        date_start: Option<NaiveDate>,
        date_end: Option<NaiveDate>,
    ) -> Self {
        let bounds = match (date_start, date_end) {
            (Some(start), Some(end)) if start > end => Some((end, start)),
            (Some(start), Some(end)) => Some((start, end)),
            (None, None) => None,
            _ => {
                // A single-sided range means "all time", same as no range.
                log::warn!("ignoring one-sided date range; both bounds are required");
                None
            }
        };
        Filter {
            client,
            campaign,
            bounds,
        }
    }

    pub fn client(&self) -> Option<&str> {
        self.client.as_deref()
    }

    pub fn campaign(&self) -> Option<&str> {
        self.campaign.as_deref()
    }

    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.bounds
    }

    pub fn with_bounds(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Filter::new(
            self.client.clone(),
            self.campaign.clone(),
            Some(start),
            Some(end),
        )
    }
}

/// One daily summary row from campaign_reporting. Numeric fields are already
/// coerced (NULL or unparseable contributes 0) by the reader.
#[derive(Debug, Clone)]
pub struct CampaignRow {
    pub client: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub emails_sent: i64,
    pub leads_contacted: i64,
    pub interested: i64,
    pub bounced: i64,
}

#[derive(Debug, Clone)]
pub struct ReplyRow {
    pub client: String,
    pub category: Option<String>,
}

impl ReplyRow {
    /// "Real" replies exclude the Out Of Office category.
    pub fn is_real(&self) -> bool {
        self.category.as_deref() != Some("Out Of Office")
    }
}

#[derive(Debug, Clone)]
pub struct MeetingRow {
    pub client: String,
}

#[derive(Debug, Clone)]
pub struct EngagedLeadRow {
    pub client: String,
    pub showed_up_to_disco: bool,
    pub qualified: bool,
    pub demo_booked: bool,
    pub showed_up_to_demo: bool,
    pub proposal_sent: bool,
    pub closed: bool,
}

/// Fixed counter set accumulated per entity (client, or campaign).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounters {
    pub emails_sent: i64,
    pub prospects_contacted: i64,
    pub total_replies: i64,
    pub real_replies: i64,
    pub positive_replies: i64,
    pub bounces: i64,
    pub meetings: i64,
}

impl EntityCounters {
    pub fn merge(&mut self, other: &EntityCounters) {
        self.emails_sent += other.emails_sent;
        self.prospects_contacted += other.prospects_contacted;
        self.total_replies += other.total_replies;
        self.real_replies += other.real_replies;
        self.positive_replies += other.positive_replies;
        self.bounces += other.bounces;
        self.meetings += other.meetings;
    }
}

/// Post-meeting stage totals counted from engaged_leads flags.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageCounts {
    pub showed_up_to_disco: i64,
    pub qualified: i64,
    pub demo_booked: i64,
    pub showed_up_to_demo: i64,
    pub proposal_sent: i64,
    pub closed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelStage {
    pub name: &'static str,
    pub count: i64,
    pub conversion_pct: f64,
    pub dropoff_pct: f64,
}

/// Per-day target rates for one client, read from the target catalog.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Targets {
    pub emails_per_day: Option<f64>,
    pub prospects_per_day: Option<f64>,
    pub replies_per_day: Option<f64>,
    pub bounces_per_day: Option<f64>,
    pub meetings_per_day: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Green,
    Yellow,
    Red,
}

/// Actual-vs-target result for one metric. When no target is configured the
/// ratio and severity are absent and only the actual is reported.
#[derive(Debug, Clone, Serialize)]
pub struct TargetComparison {
    pub actual: i64,
    pub target: f64,
    pub ratio_pct: Option<f64>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub name: String,
    pub counters: EntityCounters,
    pub emails: TargetComparison,
    pub prospects: TargetComparison,
    pub replies: TargetComparison,
    pub meetings: TargetComparison,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub campaign_name: String,
    pub client: String,
    pub counters: EntityCounters,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let filter = Filter::new(None, None, Some(date(2024, 3, 14)), Some(date(2024, 3, 8)));
        assert_eq!(filter.bounds(), Some((date(2024, 3, 8), date(2024, 3, 14))));
    }

    #[test]
    fn one_sided_range_means_all_time() {
        let filter = Filter::new(None, None, Some(date(2024, 3, 8)), None);
        assert_eq!(filter.bounds(), None);
    }

    #[test]
    fn out_of_office_is_not_a_real_reply() {
        let ooo = ReplyRow {
            client: "Acme".to_string(),
            category: Some("Out Of Office".to_string()),
        };
        let interested = ReplyRow {
            client: "Acme".to_string(),
            category: Some("Interested".to_string()),
        };
        let uncategorized = ReplyRow {
            client: "Acme".to_string(),
            category: None,
        };
        assert!(!ooo.is_real());
        assert!(interested.is_real());
        assert!(uncategorized.is_real());
    }
}
