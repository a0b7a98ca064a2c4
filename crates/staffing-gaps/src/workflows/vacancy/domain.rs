use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a vacancy event (a movement-ledger row, or the synthetic
/// employee-id fallback until the ledger row exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub i64);

impl EmployeeId {
    /// Synthetic event id used while no ledger event exists for this employee.
    pub const fn fallback_event_id(self) -> EventId {
        EventId(self.0)
    }
}

/// What triggered a vacancy event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OriginType {
    Termination,
    Leave,
}

impl OriginType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Termination => "TERMINATION",
            Self::Leave => "LEAVE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TERMINATION" | "DEMISSAO" => Some(Self::Termination),
            "LEAVE" | "AFASTAMENTO" => Some(Self::Leave),
            _ => None,
        }
    }
}

/// Compound key of the response table; the store upserts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResponseKey {
    pub event_id: EventId,
    pub origin_type: OriginType,
}

impl ResponseKey {
    pub const fn new(event_id: EventId, origin_type: OriginType) -> Self {
        Self {
            event_id,
            origin_type,
        }
    }
}

impl fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.event_id, self.origin_type.label())
    }
}

/// The two comparable location fields carried by roster rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub cost_center: Option<String>,
    pub workplace: Option<String>,
}

impl Location {
    pub fn display_name(&self) -> &str {
        self.cost_center
            .as_deref()
            .or(self.workplace.as_deref())
            .unwrap_or("unassigned")
    }
}

/// Contract identification: the registry id when known, otherwise the trade name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRef {
    pub contract_id: Option<String>,
    pub trade_name: Option<String>,
}

/// Parsed roster status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Terminated,
    /// Short medical absence; staffed for headcount, never a vacancy source.
    ShortAbsence,
    OnLeave(String),
}

impl EmployeeStatus {
    pub fn from_code(code: &str) -> Self {
        let normalized = code.trim().to_uppercase();
        match normalized.as_str() {
            "ACTIVE" | "01-ATIVO" | "ATIVO" => Self::Active,
            "TERMINATED" | "99-DEMITIDO" | "DEMITIDO" => Self::Terminated,
            "SHORT_ABSENCE" => Self::ShortAbsence,
            _ if normalized.contains("ATESTADO") => Self::ShortAbsence,
            _ => Self::OnLeave(code.trim().to_string()),
        }
    }

    /// Origin type for statuses that open a vacancy.
    pub fn vacancy_origin(&self) -> Option<OriginType> {
        match self {
            Self::Terminated => Some(OriginType::Termination),
            Self::OnLeave(_) => Some(OriginType::Leave),
            Self::Active | Self::ShortAbsence => None,
        }
    }

    pub fn is_staffed(&self) -> bool {
        !matches!(self, Self::Terminated)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// One employee row as exposed by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub employee_id: EmployeeId,
    pub name: String,
    pub role: String,
    pub location: Location,
    pub contract: ContractRef,
    pub status: EmployeeStatus,
    pub status_changed_on: NaiveDate,
    pub admission_date: Option<NaiveDate>,
}

/// Movement ledger row linking an employee status change to an event id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub event_id: EventId,
    pub employee_id: EmployeeId,
    pub event_date: NaiveDate,
    pub origin_status: String,
}

/// Insert payload for a ledger row that ingestion flagged as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDraft {
    pub employee_id: EmployeeId,
    pub event_date: NaiveDate,
    pub origin_status: String,
    pub origin_type: OriginType,
}

/// A staffing gap under analyst review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyEvent {
    pub id: EventId,
    pub origin_type: OriginType,
    pub employee_id: Option<EmployeeId>,
    pub employee_name: String,
    pub role: String,
    pub location: Location,
    pub contract: ContractRef,
    pub event_date: NaiveDate,
    pub origin_status: String,
    /// True while `id` is the synthetic employee-id fallback.
    pub needs_creation: bool,
}

impl VacancyEvent {
    pub fn key(&self) -> ResponseKey {
        ResponseKey::new(self.id, self.origin_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillAnswer {
    #[serde(rename = "SIM", alias = "YES")]
    Yes,
    #[serde(rename = "NAO", alias = "NO")]
    No,
}

impl FillAnswer {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SIM" | "YES" | "TRUE" => Some(Self::Yes),
            "NAO" | "NÃO" | "NO" | "FALSE" => Some(Self::No),
            _ => None,
        }
    }
}

/// Identity attached to a response; trusted as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystRef {
    pub id: i64,
    pub name: String,
}

/// Candidate replacement drawn from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: EmployeeId,
    pub name: String,
    pub role: String,
    pub location: Location,
    pub contract: ContractRef,
    pub admission_date: Option<NaiveDate>,
}

impl From<&RosterEntry> for Candidate {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            id: entry.employee_id,
            name: entry.name.clone(),
            role: entry.role.clone(),
            location: entry.location.clone(),
            contract: entry.contract.clone(),
            admission_date: entry.admission_date,
        }
    }
}

/// Configured ideal staffing count for a role and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadcountTarget {
    pub role: String,
    pub location: String,
    pub target_count: u32,
    #[serde(default)]
    pub weekly_hours: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Transfer,
    Promotion,
}

/// Gap opened by hand for a transfer or promotion rather than a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualVacancy {
    pub id: i64,
    pub kind: MovementKind,
    pub role: String,
    pub location: Location,
    pub contract: ContractRef,
    pub opened_on: NaiveDate,
    pub note: Option<String>,
}

/// Fields supplied when registering a manual vacancy; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualVacancyDraft {
    pub kind: MovementKind,
    pub role: String,
    pub location: Location,
    pub contract: ContractRef,
    pub opened_on: NaiveDate,
    pub note: Option<String>,
}

/// Analyst-assignment table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystAssignment {
    pub event_id: EventId,
    pub analyst: AnalystRef,
    pub contract_id: Option<String>,
    pub assigned_on: NaiveDate,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_vacancy_origins() {
        assert_eq!(
            EmployeeStatus::from_code("99-Demitido").vacancy_origin(),
            Some(OriginType::Termination)
        );
        assert_eq!(
            EmployeeStatus::from_code("ON_LEAVE_MATERNITY").vacancy_origin(),
            Some(OriginType::Leave)
        );
        assert_eq!(EmployeeStatus::from_code(" active "), EmployeeStatus::Active);
        assert_eq!(
            EmployeeStatus::from_code("14-Atestado medico"),
            EmployeeStatus::ShortAbsence
        );
        assert!(EmployeeStatus::from_code("14-Atestado medico")
            .vacancy_origin()
            .is_none());
    }

    #[test]
    fn fill_answer_reads_both_spellings() {
        assert_eq!(FillAnswer::parse("sim"), Some(FillAnswer::Yes));
        assert_eq!(FillAnswer::parse("NO"), Some(FillAnswer::No));
        assert_eq!(FillAnswer::parse("maybe"), None);
        let json = serde_json::to_string(&FillAnswer::Yes).expect("serializes");
        assert_eq!(json, "\"SIM\"");
    }

    #[test]
    fn location_display_prefers_cost_center() {
        let location = Location {
            cost_center: None,
            workplace: Some("Unit A".to_string()),
        };
        assert_eq!(location.display_name(), "Unit A");
        assert_eq!(Location::default().display_name(), "unassigned");
    }
}
