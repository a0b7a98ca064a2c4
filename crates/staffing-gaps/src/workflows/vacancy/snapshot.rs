//! Loads exported CSV tables into a [`StoreSeed`].
//!
//! A snapshot directory holds `roster.csv`, `ledger.csv`, `responses.csv` and
//! `targets.csv`; `assignments.csv` and `manual_vacancies.csv` are optional.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::domain::{
    AnalystAssignment, AnalystRef, ContractRef, EmployeeId, EmployeeStatus, EventId, FillAnswer,
    HeadcountTarget, LedgerEntry, Location, ManualVacancy, MovementKind, OriginType, RosterEntry,
};
use super::lifecycle::ResponseRow;
use super::store::StoreSeed;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in {table}: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{table} row {row}: invalid {field} '{value}'")]
    InvalidValue {
        table: &'static str,
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Reads every table of a snapshot directory.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<StoreSeed, SnapshotError> {
    let dir = dir.as_ref();
    let seed = StoreSeed {
        roster: read_roster(open(dir, "roster.csv")?)?,
        ledger: read_ledger(open(dir, "ledger.csv")?)?,
        responses: read_responses(open(dir, "responses.csv")?)?,
        targets: read_targets(open(dir, "targets.csv")?)?,
        assignments: match open_optional(dir, "assignments.csv")? {
            Some(file) => read_assignments(file)?,
            None => Vec::new(),
        },
        manual_vacancies: match open_optional(dir, "manual_vacancies.csv")? {
            Some(file) => read_manual_vacancies(file)?,
            None => Vec::new(),
        },
    };
    tracing::info!(
        dir = %dir.display(),
        roster = seed.roster.len(),
        ledger = seed.ledger.len(),
        responses = seed.responses.len(),
        targets = seed.targets.len(),
        "snapshot loaded"
    );
    Ok(seed)
}

fn open(dir: &Path, name: &str) -> Result<File, SnapshotError> {
    let path = dir.join(name);
    File::open(&path).map_err(|source| SnapshotError::Io { path, source })
}

fn open_optional(dir: &Path, name: &str) -> Result<Option<File>, SnapshotError> {
    let path = dir.join(name);
    match File::open(&path) {
        Ok(file) => Ok(Some(file)),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SnapshotError::Io { path, source }),
    }
}

fn rows<R: Read, T: DeserializeOwned>(
    table: &'static str,
    reader: R,
) -> Result<Vec<T>, SnapshotError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader
        .deserialize::<T>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| SnapshotError::Csv { table, source })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_date(
    table: &'static str,
    row: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<NaiveDate>, SnapshotError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| SnapshotError::InvalidValue {
                table,
                row,
                field,
                value: raw,
            })
        })
        .transpose()
}

fn required_date(
    table: &'static str,
    row: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<NaiveDate, SnapshotError> {
    parse_date(table, row, field, value)?.ok_or(SnapshotError::InvalidValue {
        table,
        row,
        field,
        value: String::new(),
    })
}

fn parse_flag(
    table: &'static str,
    row: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<bool>, SnapshotError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "sim" | "t" => Ok(Some(true)),
        "0" | "false" | "no" | "nao" | "f" => Ok(Some(false)),
        _ => Err(SnapshotError::InvalidValue {
            table,
            row,
            field,
            value: raw,
        }),
    }
}

fn parse_origin(table: &'static str, row: usize, raw: String) -> Result<OriginType, SnapshotError> {
    OriginType::parse(&raw).ok_or(SnapshotError::InvalidValue {
        table,
        row,
        field: "origin_type",
        value: raw,
    })
}

#[derive(Debug, Deserialize)]
struct RosterCsvRow {
    employee_id: i64,
    name: String,
    role: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    cost_center: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    workplace: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contract_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    trade_name: Option<String>,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status_changed_on: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    admission_date: Option<String>,
}

fn read_roster<R: Read>(reader: R) -> Result<Vec<RosterEntry>, SnapshotError> {
    const TABLE: &str = "roster.csv";
    rows::<_, RosterCsvRow>(TABLE, reader)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| -> Result<RosterEntry, SnapshotError> {
            let line = index + 1;
            Ok(RosterEntry {
                employee_id: EmployeeId(row.employee_id),
                name: row.name,
                role: row.role,
                location: Location {
                    cost_center: row.cost_center,
                    workplace: row.workplace,
                },
                contract: ContractRef {
                    contract_id: row.contract_id,
                    trade_name: row.trade_name,
                },
                status: EmployeeStatus::from_code(&row.status),
                status_changed_on: required_date(
                    TABLE,
                    line,
                    "status_changed_on",
                    row.status_changed_on,
                )?,
                admission_date: parse_date(TABLE, line, "admission_date", row.admission_date)?,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct LedgerCsvRow {
    event_id: i64,
    employee_id: i64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    event_date: Option<String>,
    origin_status: String,
}

fn read_ledger<R: Read>(reader: R) -> Result<Vec<LedgerEntry>, SnapshotError> {
    const TABLE: &str = "ledger.csv";
    rows::<_, LedgerCsvRow>(TABLE, reader)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| -> Result<LedgerEntry, SnapshotError> {
            Ok(LedgerEntry {
                event_id: EventId(row.event_id),
                employee_id: EmployeeId(row.employee_id),
                event_date: required_date(TABLE, index + 1, "event_date", row.event_date)?,
                origin_status: row.origin_status,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ResponseCsvRow {
    event_id: i64,
    origin_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    opened_vacancy: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    opened_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    vacancy_filled: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    closed_date: Option<String>,
    #[serde(default)]
    substitute_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    substitute_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pending_confirmation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    archived: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    not_found: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    not_found_note: Option<String>,
    #[serde(default)]
    parent_event_id: Option<i64>,
    #[serde(default)]
    analyst_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    analyst_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    note: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    responded_on: Option<String>,
}

fn read_responses<R: Read>(reader: R) -> Result<Vec<ResponseRow>, SnapshotError> {
    const TABLE: &str = "responses.csv";
    rows::<_, ResponseCsvRow>(TABLE, reader)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| -> Result<ResponseRow, SnapshotError> {
            let line = index + 1;
            let vacancy_filled = row
                .vacancy_filled
                .map(|raw| {
                    FillAnswer::parse(&raw).ok_or(SnapshotError::InvalidValue {
                        table: TABLE,
                        row: line,
                        field: "vacancy_filled",
                        value: raw,
                    })
                })
                .transpose()?;
            let flag = |field, value| {
                parse_flag(TABLE, line, field, value).map(|parsed| parsed.unwrap_or(false))
            };
            Ok(ResponseRow {
                event_id: EventId(row.event_id),
                origin_type: parse_origin(TABLE, line, row.origin_type)?,
                opened_vacancy: parse_flag(TABLE, line, "opened_vacancy", row.opened_vacancy)?,
                opened_date: parse_date(TABLE, line, "opened_date", row.opened_date)?,
                vacancy_filled,
                closed_date: parse_date(TABLE, line, "closed_date", row.closed_date)?,
                substitute_id: row.substitute_id.map(EmployeeId),
                substitute_name: row.substitute_name,
                pending_confirmation: flag("pending_confirmation", row.pending_confirmation)?,
                archived: flag("archived", row.archived)?,
                not_found: flag("not_found", row.not_found)?,
                not_found_note: row.not_found_note,
                parent_event_id: row.parent_event_id.map(EventId),
                analyst_id: row.analyst_id,
                analyst_name: row.analyst_name,
                note: row.note,
                responded_on: parse_date(TABLE, line, "responded_on", row.responded_on)?,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct TargetCsvRow {
    role: String,
    location: String,
    target_count: u32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    weekly_hours: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    archived: Option<String>,
}

fn read_targets<R: Read>(reader: R) -> Result<Vec<HeadcountTarget>, SnapshotError> {
    const TABLE: &str = "targets.csv";
    rows::<_, TargetCsvRow>(TABLE, reader)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| -> Result<HeadcountTarget, SnapshotError> {
            Ok(HeadcountTarget {
                role: row.role,
                location: row.location,
                target_count: row.target_count,
                weekly_hours: row.weekly_hours,
                archived: parse_flag(TABLE, index + 1, "archived", row.archived)?
                    .unwrap_or(false),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct AssignmentCsvRow {
    event_id: i64,
    analyst_id: i64,
    analyst_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contract_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    assigned_on: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    active: Option<String>,
}

fn read_assignments<R: Read>(reader: R) -> Result<Vec<AnalystAssignment>, SnapshotError> {
    const TABLE: &str = "assignments.csv";
    rows::<_, AssignmentCsvRow>(TABLE, reader)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| -> Result<AnalystAssignment, SnapshotError> {
            let line = index + 1;
            Ok(AnalystAssignment {
                event_id: EventId(row.event_id),
                analyst: AnalystRef {
                    id: row.analyst_id,
                    name: row.analyst_name,
                },
                contract_id: row.contract_id,
                assigned_on: required_date(TABLE, line, "assigned_on", row.assigned_on)?,
                active: parse_flag(TABLE, line, "active", row.active)?.unwrap_or(true),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ManualVacancyCsvRow {
    id: i64,
    kind: String,
    role: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    cost_center: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    workplace: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contract_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    trade_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    opened_on: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    note: Option<String>,
}

fn read_manual_vacancies<R: Read>(reader: R) -> Result<Vec<ManualVacancy>, SnapshotError> {
    const TABLE: &str = "manual_vacancies.csv";
    rows::<_, ManualVacancyCsvRow>(TABLE, reader)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| -> Result<ManualVacancy, SnapshotError> {
            let line = index + 1;
            let kind = match row.kind.to_ascii_uppercase().as_str() {
                "TRANSFER" | "TRANSFERENCIA" => MovementKind::Transfer,
                "PROMOTION" | "PROMOCAO" => MovementKind::Promotion,
                _ => {
                    return Err(SnapshotError::InvalidValue {
                        table: TABLE,
                        row: line,
                        field: "kind",
                        value: row.kind,
                    })
                }
            };
            Ok(ManualVacancy {
                id: row.id,
                kind,
                role: row.role,
                location: Location {
                    cost_center: row.cost_center,
                    workplace: row.workplace,
                },
                contract: ContractRef {
                    contract_id: row.contract_id,
                    trade_name: row.trade_name,
                },
                opened_on: required_date(TABLE, line, "opened_on", row.opened_on)?,
                note: row.note,
            })
        })
        .collect()
}
