use std::fmt::Write;

use crate::compare::delta_pct;
use crate::models::{
    CampaignSummary, ClientSummary, EntityCounters, FunnelStage, Severity, TargetComparison,
    Targets,
};

fn severity_label(severity: Option<Severity>) -> &'static str {
    match severity {
        Some(Severity::Green) => "green",
        Some(Severity::Yellow) => "yellow",
        Some(Severity::Red) => "red",
        None => "-",
    }
}

fn pct(numerator: i64, denominator: i64) -> String {
    if denominator <= 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", numerator as f64 / denominator as f64 * 100.0)
}

fn delta_label(current: i64, previous: Option<i64>) -> String {
    match delta_pct(current, previous) {
        Some(delta) if delta >= 0.0 => format!("↑{:.1}%", delta),
        Some(delta) => format!("↓{:.1}%", delta.abs()),
        None => "-".to_string(),
    }
}

fn metric_line(output: &mut String, label: &str, comparison: &TargetComparison) {
    match comparison.ratio_pct {
        Some(ratio) => {
            let _ = writeln!(
                output,
                "  {}: {} / target {:.0} ({:.1}%, {})",
                label,
                comparison.actual,
                comparison.target,
                ratio,
                severity_label(comparison.severity)
            );
        }
        None => {
            let _ = writeln!(output, "  {}: {} (no target)", label, comparison.actual);
        }
    }
}

pub fn render_quick_view(clients: &[ClientSummary], range_days: i64) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Quick View ({range_days}-day targets)");
    let _ = writeln!(output);

    if clients.is_empty() {
        let _ = writeln!(output, "No data found for the selected filters.");
        return output;
    }

    for client in clients {
        let _ = writeln!(output, "## {}", client.name);
        metric_line(&mut output, "emails sent", &client.emails);
        metric_line(&mut output, "unique prospects", &client.prospects);
        metric_line(&mut output, "real replies", &client.replies);
        metric_line(&mut output, "meetings", &client.meetings);
        let _ = writeln!(output);
    }
    output
}

pub fn render_funnel(stages: &[FunnelStage]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Pipeline Funnel");
    let _ = writeln!(output);

    for (index, stage) in stages.iter().enumerate() {
        if index == 0 {
            let _ = writeln!(output, "{:<20} {:>8}", stage.name, stage.count);
        } else {
            let _ = writeln!(
                output,
                "{:<20} {:>8}  conversion {:>5.1}%  drop-off {:>5.1}%",
                stage.name, stage.count, stage.conversion_pct, stage.dropoff_pct
            );
        }
    }
    output
}

pub fn render_performance(
    current: &EntityCounters,
    previous: Option<&EntityCounters>,
) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Performance Overview");
    let _ = writeln!(output);

    let rows = [
        ("Total Emails Sent", current.emails_sent, previous.map(|p| p.emails_sent)),
        (
            "Unique Prospects",
            current.prospects_contacted,
            previous.map(|p| p.prospects_contacted),
        ),
        ("Total Replies", current.total_replies, previous.map(|p| p.total_replies)),
        ("Real Replies", current.real_replies, previous.map(|p| p.real_replies)),
        (
            "Positive Replies",
            current.positive_replies,
            previous.map(|p| p.positive_replies),
        ),
        ("Bounces", current.bounces, previous.map(|p| p.bounces)),
        ("Meetings Booked", current.meetings, previous.map(|p| p.meetings)),
    ];
    for (label, value, prior) in rows {
        let _ = writeln!(
            output,
            "{:<18} {:>8}  vs previous period: {}",
            label,
            value,
            delta_label(value, prior)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "reply rate {} | real reply rate {} | positive of real {} | meetings of real {} | bounce rate {}",
        pct(current.total_replies, current.prospects_contacted),
        pct(current.real_replies, current.prospects_contacted),
        pct(current.positive_replies, current.real_replies),
        pct(current.meetings, current.real_replies),
        pct(current.bounces, current.emails_sent),
    );
    output
}

pub fn render_campaigns(campaigns: &[CampaignSummary]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Campaign Breakdown");
    let _ = writeln!(
        output,
        "Replies and meetings are split evenly across each client's campaigns; \
         the source data has no per-campaign attribution for them."
    );
    let _ = writeln!(output);

    if campaigns.is_empty() {
        let _ = writeln!(output, "No campaign data found for the selected filters.");
        return output;
    }

    for campaign in campaigns {
        let counters = &campaign.counters;
        let _ = writeln!(
            output,
            "- {} ({}): {} emails, {} prospects, {} real replies (~), {} positive, {} bounces, {} meetings (~)",
            campaign.campaign_name,
            campaign.client,
            counters.emails_sent,
            counters.prospects_contacted,
            counters.real_replies,
            counters.positive_replies,
            counters.bounces,
            counters.meetings,
        );
    }
    output
}

pub fn render_targets(targets: &std::collections::BTreeMap<String, Targets>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Client Targets (per day)");
    let _ = writeln!(output);

    if targets.is_empty() {
        let _ = writeln!(output, "No targets configured.");
        return output;
    }

    let show = |value: Option<f64>| match value {
        Some(rate) => format!("{rate:.1}"),
        None => "-".to_string(),
    };
    for (client, target) in targets {
        let _ = writeln!(
            output,
            "- {}: emails {} | prospects {} | replies {} | bounces {} | meetings {}",
            client,
            show(target.emails_per_day),
            show(target.prospects_per_day),
            show(target.replies_per_day),
            show(target.bounces_per_day),
            show(target.meetings_per_day),
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_view_shows_actual_alone_without_target() {
        let comparison = TargetComparison {
            actual: 42,
            target: 0.0,
            ratio_pct: None,
            severity: None,
        };
        let client = ClientSummary {
            name: "Acme".to_string(),
            counters: EntityCounters::default(),
            emails: comparison.clone(),
            prospects: comparison.clone(),
            replies: comparison.clone(),
            meetings: comparison,
        };
        let text = render_quick_view(&[client], 7);
        assert!(text.contains("## Acme"));
        assert!(text.contains("emails sent: 42 (no target)"));
    }

    #[test]
    fn empty_result_renders_a_no_data_state() {
        let text = render_quick_view(&[], 1);
        assert!(text.contains("No data found"));
        let breakdown = render_campaigns(&[]);
        assert!(breakdown.contains("No campaign data found"));
    }
}
