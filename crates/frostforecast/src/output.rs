use chrono::SecondsFormat;
use frost_core::model::fact::Scalar;
use frost_core::query::{RunRecord, RunStatus, StatusResponse, UsageResponse};
use owo_colors::OwoColorize;

pub fn print_usage_human(v: &UsageResponse) {
    let measure_names = &v.columns[v.columns.len().saturating_sub(measure_count(v))..];
    for row in &v.rows {
        let ts = row.hour_start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut fields = Vec::with_capacity(row.measures.len());
        for (name, value) in measure_names.iter().zip(&row.measures) {
            fields.push(format!("{name}={}", render_scalar(*value)));
        }
        let tags = row
            .tags
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|t| {
                let rendered = t
                    .pairs()
                    .iter()
                    .map(|p| format!("{}={}", p.tag_name, p.tag_value))
                    .collect::<Vec<_>>()
                    .join(",");
                format!(" tags={rendered}")
            })
            .unwrap_or_default();
        println!("{ts} {} | {}{tags}", row.key.join("/"), fields.join(" "));
    }
    println!(
        "-- {} matches ({} returned) --",
        v.total_matches, v.returned
    );
}

pub fn print_runs_human(v: &[RunRecord]) {
    for run in v {
        println!(
            "{} {} {} {} candidates={} inserted={} watermark={}",
            run.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            run.domain,
            run.trigger.as_str(),
            status_label(run.status),
            run.candidate_rows,
            run.inserted_rows,
            run.watermark.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        if let Some(error) = &run.error {
            println!("  error: {error}");
        }
    }
    println!("-- {} runs --", v.len());
}

pub fn print_status_human(v: &StatusResponse) {
    println!("db_path={}", v.db_path);
    println!("db_size_bytes={}", v.db_size_bytes);
    println!("runs={}", v.runs_count);
    for d in &v.domains {
        let watermark = d
            .watermark
            .map(|w| w.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "-".to_string());
        let last_run = match d.last_run_status {
            Some(status) => status_label(status),
            None => "never".to_string(),
        };
        println!(
            "{} rows={} watermark={} last_run={}",
            d.domain, d.fact_rows, watermark, last_run
        );
    }
}

fn status_label(status: RunStatus) -> String {
    match status {
        RunStatus::Ok => "ok".green().to_string(),
        RunStatus::Failed => "failed".red().to_string(),
    }
}

fn render_scalar(value: Scalar) -> String {
    match value {
        Scalar::Int(v) => v.to_string(),
        Scalar::Float(v) => format!("{v:.4}"),
    }
}

fn measure_count(v: &UsageResponse) -> usize {
    v.rows.first().map(|r| r.measures.len()).unwrap_or(0)
}
