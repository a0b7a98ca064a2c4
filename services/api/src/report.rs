use crate::infra::load_store;
use chrono::{Local, NaiveDate};
use clap::Args;
use staffing_gaps::config::AppConfig;
use staffing_gaps::error::AppError;
use staffing_gaps::workflows::vacancy::domain::ContractRef;
use staffing_gaps::workflows::vacancy::sla::SuspiciousDate;
use staffing_gaps::workflows::vacancy::{
    HeadcountLine, IngestionPartition, MatchTarget, ScoredCandidate, SlaReport, VacancyService,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Directory of CSV tables (falls back to STAFFING_SNAPSHOT_DIR).
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,
    /// Override the reporting date (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// List every event that crossed an SLA or date-consistency threshold.
    #[arg(long)]
    pub(crate) list: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct MatchArgs {
    /// Directory of CSV tables (falls back to STAFFING_SNAPSHOT_DIR).
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,
    /// Role of the vacancy to fill.
    #[arg(long)]
    pub(crate) role: String,
    /// Cost center or workplace of the vacancy.
    #[arg(long, default_value = "")]
    pub(crate) location: String,
    /// Contract registry id.
    #[arg(long)]
    pub(crate) contract: Option<String>,
    /// Contract trade name, used when no registry id is given.
    #[arg(long)]
    pub(crate) trade_name: Option<String>,
    /// Only rank employees whose name contains this fragment.
    #[arg(long, default_value = "")]
    pub(crate) name: String,
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        snapshot,
        today,
        list,
    } = args;
    let config = AppConfig::load()?;
    let store = load_store(snapshot.or(config.snapshot_dir).as_deref())?;
    let service = VacancyService::new(store, &config.reconciliation);

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let partition = service.ingest().await;
    let sla = service.sla_report(&partition, today);
    let headcount = service.headcount_overview().await?;

    for line in report_lines(&partition, &sla, &headcount, today, list) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) async fn run_match(args: MatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = load_store(args.snapshot.or(config.snapshot_dir).as_deref())?;
    let service = VacancyService::new(store, &config.reconciliation);

    let target = MatchTarget {
        role: args.role,
        location: args.location,
        contract: ContractRef {
            contract_id: args.contract,
            trade_name: args.trade_name,
        },
    };
    let ranked = service.match_substitutes(&args.name, &target).await?;

    for line in match_lines(&target, &ranked) {
        println!("{line}");
    }
    Ok(())
}

fn describe_suspicious(flag: &SuspiciousDate) -> String {
    match flag {
        SuspiciousDate::OpenedLongBeforeEvent { days } => {
            format!("opened {days} days before the event")
        }
        SuspiciousDate::UndatedLongOpen { days } => format!("open {days} days with no opened date"),
    }
}

pub(crate) fn report_lines(
    partition: &IngestionPartition,
    sla: &SlaReport,
    headcount: &[HeadcountLine],
    today: NaiveDate,
    list: bool,
) -> Vec<String> {
    let mut lines = vec![format!("Vacancy reconciliation report (evaluated {today})")];

    lines.push(format!("Pending responses: {}", partition.pending.len()));
    lines.push(format!("Responded: {}", partition.responded.len()));
    lines.push(format!("Manual vacancies: {}", partition.manual.len()));
    if !partition.is_complete() {
        lines.push(format!(
            "Partial results: {} roster entries unresolved after {} failed store calls",
            partition.unresolved,
            partition.failures.len()
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "SLA: {} events, {} critical, {} with suspicious dates",
        sla.summary.total, sla.summary.critical, sla.summary.suspicious
    ));
    for (state, count) in &sla.summary.by_state {
        lines.push(format!("- {}: {count}", state.label()));
    }

    if list {
        if sla.flagged.is_empty() {
            lines.push("Flagged events: none".to_string());
        } else {
            lines.push("Flagged events".to_string());
            for assessment in &sla.flagged {
                let employee = partition
                    .find(assessment.key)
                    .map(|(event, _)| event.employee_name.as_str())
                    .unwrap_or("unknown");
                let days = assessment
                    .days_open
                    .map(|days| format!("{days} days"))
                    .unwrap_or_else(|| "n/a".to_string());
                let mut notes: Vec<String> = assessment
                    .suspicious
                    .iter()
                    .map(describe_suspicious)
                    .collect();
                if assessment.critical {
                    notes.insert(0, "critical".to_string());
                }
                lines.push(format!(
                    "- {} {}: {}, {} [{}]",
                    assessment.key,
                    employee,
                    assessment.lifecycle.state.label(),
                    days,
                    notes.join(", ")
                ));
            }
        }
    }

    lines.push(String::new());
    if headcount.is_empty() {
        lines.push("Headcount: no targets configured".to_string());
    } else {
        lines.push("Headcount".to_string());
        for line in headcount {
            let target = line
                .target
                .map(|target| target.to_string())
                .unwrap_or_else(|| "-".to_string());
            let saldo = line
                .saldo
                .map(|saldo| format!("{saldo:+}"))
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "- {} @ {}: {} active, {} on leave, target {}, saldo {} ({})",
                line.role,
                line.location,
                line.active,
                line.on_leave,
                target,
                saldo,
                line.status.label()
            ));
        }
    }
    lines
}

pub(crate) fn match_lines(target: &MatchTarget, ranked: &[ScoredCandidate]) -> Vec<String> {
    let mut lines = vec![format!(
        "Candidates for {} @ {}",
        target.role,
        if target.location.is_empty() {
            "any location"
        } else {
            target.location.as_str()
        }
    )];
    if ranked.is_empty() {
        lines.push("No candidates found".to_string());
        return lines;
    }
    for (rank, scored) in ranked.iter().enumerate() {
        let mut matched = Vec::new();
        if scored.matched.role {
            matched.push("role");
        }
        if scored.matched.location {
            matched.push("location");
        }
        if scored.matched.contract {
            matched.push("contract");
        }
        lines.push(format!(
            "{:>2}. {} ({}, {}) score {} [{}]",
            rank + 1,
            scored.candidate.name,
            scored.candidate.role,
            scored.candidate.location.display_name(),
            scored.score,
            matched.join(", ")
        ));
    }
    lines
}
