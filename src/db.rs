use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::models::{
    CampaignRow, EngagedLeadRow, Filter, MeetingRow, ReplyRow, Targets,
};

/// One timeout around the whole fan-out: on expiry the load fails as a
/// whole instead of returning partially aggregated data.
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Process-wide connection pool, constructed on first use and reused. The
/// OnceCell guarantees a single construction even when concurrent callers
/// race on the first access.
pub async fn pool() -> anyhow::Result<&'static PgPool> {
    POOL.get_or_try_init(connect).await
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set to a Postgres instance")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// Row adapters. Source data is dirty by design: NULL or missing numerics
// contribute 0, a missing client groups under "Unknown", and unset stage
// flags read as false. Downstream code assumes this one canonical shape.

fn coerce_num(row: &PgRow, column: &str) -> i64 {
    row.try_get::<Option<f64>, _>(column)
        .ok()
        .flatten()
        .map(|value| value.round() as i64)
        .unwrap_or(0)
}

fn coerce_text(row: &PgRow, column: &str) -> String {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn coerce_flag(row: &PgRow, column: &str) -> bool {
    row.try_get::<Option<bool>, _>(column)
        .ok()
        .flatten()
        .unwrap_or(false)
}

/// Campaign summary rows. The only collection that supports all three
/// predicates: client, campaign, and a report-date range.
pub async fn fetch_campaign_rows(
    pool: &PgPool,
    filter: &Filter,
) -> anyhow::Result<Vec<CampaignRow>> {
    let mut conditions = Vec::new();
    let mut param = 0usize;
    if filter.client().is_some() {
        param += 1;
        conditions.push(format!("client = ${param}"));
    }
    if filter.campaign().is_some() {
        param += 1;
        conditions.push(format!("campaign_name = ${param}"));
    }
    if filter.bounds().is_some() {
        conditions.push(format!("date >= ${} AND date <= ${}", param + 1, param + 2));
    }

    let mut query = String::from(
        "SELECT client, campaign_id, campaign_name, emails_sent, \
         COALESCE(total_leads_contacted, total_leads) AS total_leads_contacted, \
         interested, bounced \
         FROM campaign_reporting",
    );
    if !conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }

    let mut rows = sqlx::query(&query);
    if let Some(client) = filter.client() {
        rows = rows.bind(client);
    }
    if let Some(campaign) = filter.campaign() {
        rows = rows.bind(campaign);
    }
    if let Some((start, end)) = filter.bounds() {
        rows = rows.bind(start).bind(end);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records
        .iter()
        .map(|row| CampaignRow {
            client: coerce_text(row, "client"),
            campaign_id: coerce_text(row, "campaign_id"),
            campaign_name: coerce_text(row, "campaign_name"),
            emails_sent: coerce_num(row, "emails_sent"),
            leads_contacted: coerce_num(row, "total_leads_contacted"),
            interested: coerce_num(row, "interested"),
            bounced: coerce_num(row, "bounced"),
        })
        .collect())
}

/// Replies carry no reliable campaign key, so the campaign predicate is
/// deliberately not applied here. Date bounds use the received date.
pub async fn fetch_replies(pool: &PgPool, filter: &Filter) -> anyhow::Result<Vec<ReplyRow>> {
    let mut conditions = Vec::new();
    let mut param = 0usize;
    if filter.client().is_some() {
        param += 1;
        conditions.push(format!("client = ${param}"));
    }
    if filter.bounds().is_some() {
        conditions.push(format!(
            "date_received >= ${} AND date_received <= ${}",
            param + 1,
            param + 2
        ));
    }

    let mut query = String::from("SELECT client, category FROM replies");
    if !conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }

    let mut rows = sqlx::query(&query);
    if let Some(client) = filter.client() {
        rows = rows.bind(client);
    }
    if let Some((start, end)) = filter.bounds() {
        rows = rows.bind(start).bind(end);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records
        .iter()
        .map(|row| ReplyRow {
            client: coerce_text(row, "client"),
            category: row.try_get::<Option<String>, _>("category").ok().flatten(),
        })
        .collect())
}

/// Meetings are count-only, keyed by client, bounded on creation time. The
/// end bound is widened to the end of its day since the column is a
/// timestamp.
pub async fn fetch_meetings(pool: &PgPool, filter: &Filter) -> anyhow::Result<Vec<MeetingRow>> {
    let mut conditions = Vec::new();
    let mut param = 0usize;
    if filter.client().is_some() {
        param += 1;
        conditions.push(format!("client = ${param}"));
    }
    if filter.bounds().is_some() {
        conditions.push(format!(
            "created_time >= ${} AND created_time < ${} + 1",
            param + 1,
            param + 2
        ));
    }

    let mut query = String::from("SELECT client FROM meetings_booked");
    if !conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }

    let mut rows = sqlx::query(&query);
    if let Some(client) = filter.client() {
        rows = rows.bind(client);
    }
    if let Some((start, end)) = filter.bounds() {
        rows = rows.bind(start).bind(end);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records
        .iter()
        .map(|row| MeetingRow {
            client: coerce_text(row, "client"),
        })
        .collect())
}

pub async fn fetch_engaged_leads(
    pool: &PgPool,
    filter: &Filter,
) -> anyhow::Result<Vec<EngagedLeadRow>> {
    let mut conditions = Vec::new();
    let mut param = 0usize;
    if filter.client().is_some() {
        param += 1;
        conditions.push(format!("client = ${param}"));
    }
    if filter.bounds().is_some() {
        conditions.push(format!(
            "created_at >= ${} AND created_at < ${} + 1",
            param + 1,
            param + 2
        ));
    }

    let mut query = String::from(
        "SELECT client, showed_up_to_disco, qualified, demo_booked, \
         showed_up_to_demo, proposal_sent, closed \
         FROM engaged_leads",
    );
    if !conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }

    let mut rows = sqlx::query(&query);
    if let Some(client) = filter.client() {
        rows = rows.bind(client);
    }
    if let Some((start, end)) = filter.bounds() {
        rows = rows.bind(start).bind(end);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records
        .iter()
        .map(|row| EngagedLeadRow {
            client: coerce_text(row, "client"),
            showed_up_to_disco: coerce_flag(row, "showed_up_to_disco"),
            qualified: coerce_flag(row, "qualified"),
            demo_booked: coerce_flag(row, "demo_booked"),
            showed_up_to_demo: coerce_flag(row, "showed_up_to_demo"),
            proposal_sent: coerce_flag(row, "proposal_sent"),
            closed: coerce_flag(row, "closed"),
        })
        .collect())
}

/// The three collections every per-client or single-scope view needs.
pub struct SourceReads {
    pub campaign_rows: Vec<CampaignRow>,
    pub replies: Vec<ReplyRow>,
    pub meetings: Vec<MeetingRow>,
}

/// Fan out the three reads, join them under one timeout. Record order
/// between the reads does not matter; aggregation is commutative.
pub async fn fetch_sources(pool: &PgPool, filter: &Filter) -> anyhow::Result<SourceReads> {
    let (campaign_rows, replies, meetings) = tokio::time::timeout(QUERY_TIMEOUT, async {
        tokio::try_join!(
            fetch_campaign_rows(pool, filter),
            fetch_replies(pool, filter),
            fetch_meetings(pool, filter),
        )
    })
    .await
    .context("source reads timed out; try a smaller date range")??;
    log::debug!(
        "loaded {} campaign rows, {} replies, {} meetings",
        campaign_rows.len(),
        replies.len(),
        meetings.len()
    );
    Ok(SourceReads {
        campaign_rows,
        replies,
        meetings,
    })
}

/// The funnel additionally needs the engaged-lead stage flags.
pub async fn fetch_funnel_sources(
    pool: &PgPool,
    filter: &Filter,
) -> anyhow::Result<(SourceReads, Vec<EngagedLeadRow>)> {
    let (campaign_rows, replies, meetings, engaged_leads) =
        tokio::time::timeout(QUERY_TIMEOUT, async {
            tokio::try_join!(
                fetch_campaign_rows(pool, filter),
                fetch_replies(pool, filter),
                fetch_meetings(pool, filter),
                fetch_engaged_leads(pool, filter),
            )
        })
        .await
        .context("source reads timed out; try a smaller date range")??;
    Ok((
        SourceReads {
            campaign_rows,
            replies,
            meetings,
        },
        engaged_leads,
    ))
}

/// Known clients, for listing and filter validation. Lookup order: the
/// roster table, then its legacy cased variant, then distinct client names
/// derived from the summary collection.
pub async fn fetch_client_roster(pool: &PgPool) -> anyhow::Result<Vec<String>> {
    match sqlx::query("SELECT business FROM clients ORDER BY business")
        .fetch_all(pool)
        .await
    {
        Ok(rows) => {
            return Ok(rows
                .iter()
                .map(|row| row.get::<String, _>("business"))
                .collect())
        }
        Err(err) => log::warn!("clients roster not readable ({err}); trying legacy casing"),
    }

    match sqlx::query(r#"SELECT "Business" AS business FROM "Clients" ORDER BY 1"#)
        .fetch_all(pool)
        .await
    {
        Ok(rows) => {
            return Ok(rows
                .iter()
                .map(|row| row.get::<String, _>("business"))
                .collect())
        }
        Err(err) => log::warn!("legacy roster not readable ({err}); deriving from summary rows"),
    }

    let rows = sqlx::query(
        "SELECT DISTINCT client FROM campaign_reporting WHERE client IS NOT NULL ORDER BY client",
    )
    .fetch_all(pool)
    .await
    .context("no usable client roster source")?;
    Ok(rows.iter().map(|row| row.get::<String, _>("client")).collect())
}

fn rate(row: &PgRow, column: &str) -> Option<f64> {
    row.try_get::<Option<f64>, _>(column).ok().flatten()
}

pub async fn fetch_targets(pool: &PgPool) -> anyhow::Result<BTreeMap<String, Targets>> {
    let rows = sqlx::query(
        "SELECT client, emails_per_day, prospects_per_day, replies_per_day, \
         bounces_per_day, meetings_per_day \
         FROM client_targets",
    )
    .fetch_all(pool)
    .await?;

    let mut targets = BTreeMap::new();
    for row in rows {
        let client: String = row.get("client");
        targets.insert(
            client,
            Targets {
                emails_per_day: rate(&row, "emails_per_day"),
                prospects_per_day: rate(&row, "prospects_per_day"),
                replies_per_day: rate(&row, "replies_per_day"),
                bounces_per_day: rate(&row, "bounces_per_day"),
                meetings_per_day: rate(&row, "meetings_per_day"),
            },
        );
    }
    Ok(targets)
}

pub async fn upsert_target(
    pool: &PgPool,
    client: &str,
    targets: &Targets,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO client_targets
        (client, emails_per_day, prospects_per_day, replies_per_day, bounces_per_day, meetings_per_day)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (client) DO UPDATE
        SET emails_per_day = EXCLUDED.emails_per_day,
            prospects_per_day = EXCLUDED.prospects_per_day,
            replies_per_day = EXCLUDED.replies_per_day,
            bounces_per_day = EXCLUDED.bounces_per_day,
            meetings_per_day = EXCLUDED.meetings_per_day
        "#,
    )
    .bind(client)
    .bind(targets.emails_per_day)
    .bind(targets.prospects_per_day)
    .bind(targets.replies_per_day)
    .bind(targets.bounces_per_day)
    .bind(targets.meetings_per_day)
    .execute(pool)
    .await?;
    Ok(())
}

/// Import campaign summary rows from a CSV export. One row per campaign per
/// day; re-imports update the counts in place.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        client: String,
        campaign_id: String,
        campaign_name: String,
        date: NaiveDate,
        emails_sent: Option<f64>,
        total_leads_contacted: Option<f64>,
        interested: Option<f64>,
        bounced: Option<f64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let outcome = sqlx::query(
            r#"
            INSERT INTO campaign_reporting
            (id, client, campaign_id, campaign_name, date, emails_sent, total_leads_contacted, interested, bounced)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (campaign_id, date) DO UPDATE
            SET emails_sent = EXCLUDED.emails_sent,
                total_leads_contacted = EXCLUDED.total_leads_contacted,
                interested = EXCLUDED.interested,
                bounced = EXCLUDED.bounced
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.client)
        .bind(&row.campaign_id)
        .bind(&row.campaign_name)
        .bind(row.date)
        .bind(row.emails_sent)
        .bind(row.total_leads_contacted)
        .bind(row.interested)
        .bind(row.bounced)
        .execute(pool)
        .await?;

        if outcome.rows_affected() > 0 {
            imported += 1;
        }
    }

    Ok(imported)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    for name in ["Acme Robotics", "Borealis Labs"] {
        sqlx::query(
            "INSERT INTO clients (id, business) VALUES ($1, $2) ON CONFLICT (business) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .execute(pool)
        .await?;
    }

    let summary_rows = vec![
        ("Acme Robotics", "acme-001", "Acme Cold Intro", (2026, 2, 2), 420.0, 180.0, 4.0, 6.0),
        ("Acme Robotics", "acme-001", "Acme Cold Intro", (2026, 2, 3), 390.0, 165.0, 3.0, 5.0),
        ("Acme Robotics", "acme-002", "Acme Follow Up", (2026, 2, 3), 150.0, 80.0, 2.0, 1.0),
        ("Borealis Labs", "bor-001", "Borealis Launch", (2026, 2, 2), 600.0, 240.0, 7.0, 9.0),
    ];
    for (client, campaign_id, campaign_name, (y, m, d), emails, leads, interested, bounced) in
        summary_rows
    {
        let date = NaiveDate::from_ymd_opt(y, m, d).context("invalid seed date")?;
        sqlx::query(
            r#"
            INSERT INTO campaign_reporting
            (id, client, campaign_id, campaign_name, date, emails_sent, total_leads_contacted, interested, bounced)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (campaign_id, date) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(client)
        .bind(campaign_id)
        .bind(campaign_name)
        .bind(date)
        .bind(emails)
        .bind(leads)
        .bind(interested)
        .bind(bounced)
        .execute(pool)
        .await?;
    }

    let replies = vec![
        ("Acme Robotics", "Interested", (2026, 2, 3)),
        ("Acme Robotics", "Out Of Office", (2026, 2, 3)),
        ("Acme Robotics", "Not Interested", (2026, 2, 4)),
        ("Borealis Labs", "Interested", (2026, 2, 2)),
    ];
    for (client, category, (y, m, d)) in replies {
        let date = NaiveDate::from_ymd_opt(y, m, d).context("invalid seed date")?;
        sqlx::query(
            "INSERT INTO replies (id, client, category, date_received) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(client)
        .bind(category)
        .bind(date)
        .execute(pool)
        .await?;
    }

    let meetings = vec![
        ("Acme Robotics", (2026, 2, 4)),
        ("Borealis Labs", (2026, 2, 3)),
    ];
    for (client, (y, m, d)) in meetings {
        let date = NaiveDate::from_ymd_opt(y, m, d).context("invalid seed date")?;
        sqlx::query(
            "INSERT INTO meetings_booked (id, client, created_time) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(client)
        .bind(date)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO engaged_leads
        (id, client, showed_up_to_disco, qualified, demo_booked, showed_up_to_demo, proposal_sent, closed, created_at)
        VALUES ($1, $2, true, true, false, false, false, false, $3)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("Acme Robotics")
    .bind(NaiveDate::from_ymd_opt(2026, 2, 5).context("invalid seed date")?)
    .execute(pool)
    .await?;

    let targets = vec![
        ("Acme Robotics", 400.0, 170.0, 2.0, 1.0),
        ("Borealis Labs", 550.0, 220.0, 3.0, 1.0),
    ];
    for (client, emails, prospects, replies_rate, meetings_rate) in targets {
        upsert_target(
            pool,
            client,
            &Targets {
                emails_per_day: Some(emails),
                prospects_per_day: Some(prospects),
                replies_per_day: Some(replies_rate),
                bounces_per_day: None,
                meetings_per_day: Some(meetings_rate),
            },
        )
        .await?;
    }

    Ok(())
}
