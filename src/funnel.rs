use crate::models::{EntityCounters, FunnelStage, StageCounts};

/// Fixed stage order, sent through closed. Consumers iterate this as a
/// fixed-length list, so every stage is always emitted even at count 0.
pub const STAGE_NAMES: [&str; 11] = [
    "Total Sent",
    "Unique Contacts",
    "Real Replies",
    "Positive Replies",
    "Meetings Booked",
    "Showed Up to Disco",
    "Qualified",
    "Demo Booked",
    "Showed Up to Demo",
    "Proposal Sent",
    "Closed",
];

/// Everything the funnel needs: counters from the summary, reply and meeting
/// collections, plus the post-meeting stage flag counts.
#[derive(Debug, Clone, Default)]
pub struct FunnelInputs {
    pub counters: EntityCounters,
    pub stages: StageCounts,
}

/// Walk the fixed stage order and compute stage-over-stage conversion and
/// drop-off. Conversion is relative to the immediately preceding stage,
/// rounded to one decimal and clamped to [0, 100]; a zero predecessor gives
/// a 0 conversion rather than a division error.
pub fn build_funnel(inputs: &FunnelInputs) -> Vec<FunnelStage> {
    let counts = [
        inputs.counters.emails_sent,
        inputs.counters.prospects_contacted,
        inputs.counters.real_replies,
        inputs.counters.positive_replies,
        inputs.counters.meetings,
        inputs.stages.showed_up_to_disco,
        inputs.stages.qualified,
        inputs.stages.demo_booked,
        inputs.stages.showed_up_to_demo,
        inputs.stages.proposal_sent,
        inputs.stages.closed,
    ];

    let mut stages = Vec::with_capacity(STAGE_NAMES.len());
    let mut previous = 0i64;
    for (index, (&name, &count)) in STAGE_NAMES.iter().zip(counts.iter()).enumerate() {
        let conversion_pct = if index == 0 {
            if count > 0 {
                100.0
            } else {
                0.0
            }
        } else {
            conversion(count, previous)
        };
        stages.push(FunnelStage {
            name,
            count,
            conversion_pct,
            dropoff_pct: 100.0 - conversion_pct,
        });
        previous = count;
    }
    stages
}

fn conversion(count: i64, previous: i64) -> f64 {
    if previous <= 0 {
        return 0.0;
    }
    let pct = (count as f64 / previous as f64 * 1000.0).round() / 10.0;
    pct.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_eleven_stages_in_order() {
        let stages = build_funnel(&FunnelInputs::default());
        assert_eq!(stages.len(), 11);
        assert_eq!(stages[0].name, "Total Sent");
        assert_eq!(stages[4].name, "Meetings Booked");
        assert_eq!(stages[10].name, "Closed");
    }

    #[test]
    fn zero_stages_are_emitted_not_omitted() {
        let inputs = FunnelInputs {
            counters: EntityCounters {
                emails_sent: 1000,
                prospects_contacted: 400,
                real_replies: 40,
                positive_replies: 10,
                meetings: 0,
                ..EntityCounters::default()
            },
            stages: StageCounts::default(),
        };
        let stages = build_funnel(&inputs);
        assert_eq!(stages.len(), 11);
        let meetings = &stages[4];
        assert_eq!(meetings.count, 0);
        assert_eq!(meetings.conversion_pct, 0.0);
        // Stages after a zero predecessor stay at 0 too.
        assert_eq!(stages[5].conversion_pct, 0.0);
    }

    #[test]
    fn conversion_is_vs_immediately_preceding_stage() {
        let inputs = FunnelInputs {
            counters: EntityCounters {
                emails_sent: 1000,
                prospects_contacted: 400,
                real_replies: 40,
                positive_replies: 7,
                meetings: 3,
                ..EntityCounters::default()
            },
            stages: StageCounts {
                showed_up_to_disco: 2,
                ..StageCounts::default()
            },
        };
        let stages = build_funnel(&inputs);
        assert_eq!(stages[1].conversion_pct, 40.0);
        assert_eq!(stages[2].conversion_pct, 10.0);
        assert_eq!(stages[3].conversion_pct, 17.5);
        assert_eq!(stages[4].conversion_pct, 42.9);
        assert_eq!(stages[5].conversion_pct, 66.7);
    }

    #[test]
    fn conversion_stays_in_range_and_dropoff_complements() {
        // A stage larger than its predecessor clamps at 100 instead of
        // reporting an impossible conversion.
        let inputs = FunnelInputs {
            counters: EntityCounters {
                emails_sent: 10,
                prospects_contacted: 25,
                ..EntityCounters::default()
            },
            stages: StageCounts::default(),
        };
        let stages = build_funnel(&inputs);
        for stage in &stages {
            assert!(stage.conversion_pct >= 0.0 && stage.conversion_pct <= 100.0);
            assert_eq!(stage.dropoff_pct, 100.0 - stage.conversion_pct);
        }
        assert_eq!(stages[1].conversion_pct, 100.0);
    }
}
