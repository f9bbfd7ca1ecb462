//! Wire-level DTOs (§6): the boundary payloads an HTTP transport outside
//! this crate would serialize/deserialize directly.

use crate::diagnostics::DebugInfo as InternalDebugInfo;
use crate::domain::Assignment;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub start_iso: NaiveDate,
    pub end_iso: NaiveDate,
    #[serde(default)]
    pub only_fill_required: bool,
    #[serde(default)]
    pub abort_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncoveredSlotDto {
    pub date_iso: NaiveDate,
    pub row_id: String,
    pub missing: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoursViolationDto {
    pub clinician_id: String,
    pub assigned_minutes: f64,
    pub target_minutes: f64,
    pub deviation_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugInfoDto {
    pub solver_status: String,
    pub time_ms: u64,
    pub solution_count: u32,
    pub uncovered: Vec<UncoveredSlotDto>,
    pub hours_violations: Vec<HoursViolationDto>,
}

impl From<&InternalDebugInfo> for DebugInfoDto {
    fn from(info: &InternalDebugInfo) -> Self {
        DebugInfoDto {
            solver_status: format!("{:?}", info.solver_status).to_uppercase(),
            time_ms: info.wall_time_ms,
            solution_count: info.incumbent_count,
            uncovered: info
                .uncovered
                .iter()
                .map(|u| UncoveredSlotDto {
                    date_iso: u.date,
                    row_id: u.row_id.clone(),
                    missing: u.missing,
                })
                .collect(),
            hours_violations: info
                .hours_outliers
                .iter()
                .map(|h| HoursViolationDto {
                    clinician_id: h.clinician_id.clone(),
                    assigned_minutes: h.assigned_minutes,
                    target_minutes: h.target_minutes,
                    deviation_minutes: h.deviation_minutes,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    pub assignments: Vec<Assignment>,
    pub notes: Vec<String>,
    pub debug_info: DebugInfoDto,
}

/// A live intermediate solution, emitted in strictly increasing
/// `solution_num` and non-increasing `objective`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncumbentEvent {
    pub solution_num: u32,
    pub time_ms: u64,
    pub objective: i64,
    pub assignments: Vec<Assignment>,
}

/// Returned by an observer callback after receiving an `IncumbentEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverAction {
    Continue,
    Cancel,
}
