//! Wire-level state snapshot schema and the boundary normalization pass (§6, §9).

use crate::domain::{
    Assignment, Clinician, DayType, DEFAULT_LOCATION_ID, DEFAULT_SUBSHIFT_ID, Holiday, Location,
    RuntimeRowId, Section, SectionKind, SubShift, TemplateSlot,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Pool IDs the source kept emitting long after they stopped meaning
/// anything; normalization drops them and any assignment referencing them.
const DROPPED_POOL_IDS: &[&str] = &["pool-not-allocated", "pool-manual"];
/// Pool IDs that still render something in the calendar UI and must survive.
const RETAINED_POOL_IDS: &[&str] = &["pool-rest-day", "pool-vacation"];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Weights {
    pub coverage: i64,
    pub continuity: i64,
    pub location: i64,
    pub hours: i64,
    pub preference: i64,
    pub window: i64,
    pub on_call_rest_soft: i64,
}

impl Weights {
    /// Defaults satisfying `Wcov >> Wcont > Wloc ~= Whrs > Wpref > Wwin`,
    /// decided in SPEC_FULL.md §9.
    pub fn defaults() -> Self {
        Weights {
            coverage: 1_000_000,
            continuity: 10_000,
            location: 500,
            hours: 500,
            preference: 50,
            window: 5,
            on_call_rest_soft: 20_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnCallRestConfig {
    pub on_call_class_id: String,
    pub days_before: i64,
    pub days_after: i64,
    /// When false, the guard is a soft penalty (S7) rather than an
    /// eligibility gate.
    #[serde(default = "default_true")]
    pub hard: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSettings {
    #[serde(default)]
    pub only_fill_required: bool,
    #[serde(default)]
    pub allow_multiple_shifts_per_day: bool,
    #[serde(default)]
    pub enforce_same_location_per_day: bool,
    #[serde(default)]
    pub prefer_continuous_shifts: bool,
    #[serde(default)]
    pub on_call_rest: Option<OnCallRestConfig>,
    #[serde(default = "Weights::defaults")]
    pub weights: Weights,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            only_fill_required: false,
            allow_multiple_shifts_per_day: false,
            enforce_same_location_per_day: false,
            prefer_continuous_shifts: false,
            on_call_rest: None,
            weights: Weights::defaults(),
        }
    }
}

/// Raw, as-received `solverRules` payload. Every field here is either
/// forwarded to `SolverSettings` or dropped as deprecated — see §6
/// normalization rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSolverRules {
    #[serde(default, rename = "allowMultipleShiftsPerDay")]
    pub allow_multiple_shifts_per_day: Option<bool>,
    #[serde(default, rename = "showDistributionPool")]
    pub show_distribution_pool: Option<bool>,
    #[serde(default, rename = "showReservePool")]
    pub show_reserve_pool: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColBandDef {
    pub id: String,
    pub day_type: DayType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationTemplate {
    pub location_id: String,
    pub row_bands: Vec<String>,
    pub col_bands: Vec<ColBandDef>,
    pub slots: Vec<TemplateSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    pub version: u32,
    pub blocks: Vec<Section>,
    pub locations: Vec<LocationTemplate>,
}

/// The raw, as-received snapshot: loosely typed enough to carry legacy and
/// deprecated shapes through to the normalization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStateSnapshot {
    #[serde(default)]
    pub locations: Vec<Location>,
    pub rows: Vec<Section>,
    pub clinicians: Vec<Clinician>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub min_slots_by_row_id: HashMap<String, MinSlots>,
    #[serde(default)]
    pub slot_overrides_by_key: HashMap<String, i64>,
    pub weekly_template: WeeklyTemplate,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub solver_settings: SolverSettings,
    #[serde(default)]
    pub solver_rules: RawSolverRules,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MinSlots {
    pub weekday: u32,
    pub weekend: u32,
}

/// A fully normalized snapshot — the only form the rest of the crate sees.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub locations: Vec<Location>,
    pub rows: Vec<Section>,
    pub clinicians: Vec<Clinician>,
    pub assignments: Vec<Assignment>,
    pub min_slots_by_row_id: HashMap<RuntimeRowId, MinSlots>,
    pub slot_overrides_by_key: HashMap<String, i64>,
    pub weekly_template: WeeklyTemplate,
    pub holidays: HashSet<chrono::NaiveDate>,
    pub holiday_names: HashMap<chrono::NaiveDate, String>,
    pub solver_settings: SolverSettings,
}

impl StateSnapshot {
    pub fn section(&self, class_id: &str) -> Option<&Section> {
        self.rows.iter().find(|r| r.id == class_id)
    }

    pub fn clinician(&self, id: &str) -> Option<&Clinician> {
        self.clinicians.iter().find(|c| c.id == id)
    }
}

/// Pure normalization: `(raw) -> (normalized, warnings)`, per §9.
pub fn normalize(raw: RawStateSnapshot) -> (StateSnapshot, Vec<String>) {
    let mut warnings = Vec::new();

    let known_location_ids: HashSet<String> = raw
        .locations
        .iter()
        .map(|l| l.id.clone())
        .chain(std::iter::once(DEFAULT_LOCATION_ID.to_string()))
        .collect();

    let mut locations = raw.locations;
    if !locations.iter().any(|l| l.id == DEFAULT_LOCATION_ID) {
        locations.push(Location {
            id: DEFAULT_LOCATION_ID.to_string(),
            name: "Default".to_string(),
        });
    }

    let reassign_location = |loc_id: &str, warnings: &mut Vec<String>, ctx: &str| -> String {
        if known_location_ids.contains(loc_id) {
            loc_id.to_string()
        } else {
            warnings.push(format!(
                "{ctx}: unknown location '{loc_id}', reassigned to '{DEFAULT_LOCATION_ID}'"
            ));
            DEFAULT_LOCATION_ID.to_string()
        }
    };

    let filtered_rows: Vec<Section> = raw
        .rows
        .into_iter()
        .filter(|row| {
            if DROPPED_POOL_IDS.contains(&row.id.as_str()) {
                warnings.push(format!("dropped deprecated pool row '{}'", row.id));
                false
            } else {
                true
            }
        })
        .collect();

    let mut rows: Vec<Section> = filtered_rows
        .into_iter()
        .map(|mut row| {
            row.location_id = reassign_location(&row.location_id, &mut warnings, &format!("row '{}'", row.id));
            if row.subshifts.is_empty() && row.kind == SectionKind::Class {
                warnings.push(format!(
                    "row '{}' had no subshifts, defaulted to a single 8h 's1'",
                    row.id
                ));
                row.subshifts.push(SubShift::new(DEFAULT_SUBSHIFT_ID, 1, "Default"));
            }
            if row.subshifts.len() > 3 {
                warnings.push(format!(
                    "row '{}' declared {} subshifts, truncated to 3",
                    row.id,
                    row.subshifts.len()
                ));
                row.subshifts.truncate(3);
            }
            row
        })
        .collect();
    rows.sort_by(|a, b| a.id.cmp(&b.id));

    let dropped_row_ids: HashSet<&str> = DROPPED_POOL_IDS.iter().copied().collect();
    let known_row_ids: HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let retained_pool_ids: HashSet<&str> = RETAINED_POOL_IDS.iter().copied().collect();

    let assignments: Vec<Assignment> = raw
        .assignments
        .into_iter()
        .filter(|a| {
            let class_id = a.row_id.class_id.as_str();
            if dropped_row_ids.contains(class_id) {
                warnings.push(format!(
                    "dropped assignment '{}' referencing deprecated pool '{}'",
                    a.id, class_id
                ));
                return false;
            }
            if !known_row_ids.contains(class_id) && !retained_pool_ids.contains(class_id) {
                warnings.push(format!(
                    "dropped assignment '{}' referencing unknown row '{}'",
                    a.id, class_id
                ));
                return false;
            }
            true
        })
        .collect();

    let min_slots_by_row_id = raw
        .min_slots_by_row_id
        .into_iter()
        .map(|(k, v)| (RuntimeRowId::parse(&k), v))
        .collect();

    for deprecated in [
        raw.solver_rules.allow_multiple_shifts_per_day,
        raw.solver_rules.show_distribution_pool,
        raw.solver_rules.show_reserve_pool,
    ] {
        if deprecated.is_some() {
            warnings.push("discarded deprecated solverRules flag".to_string());
        }
    }

    let holidays: HashSet<chrono::NaiveDate> = raw.holidays.iter().map(|h| h.date).collect();
    let holiday_names = raw.holidays.into_iter().map(|h| (h.date, h.name)).collect();

    for clinician in &raw.clinicians {
        if let Err(msg) = clinician.validate() {
            warnings.push(msg);
        }
    }

    if warnings.is_empty() {
        tracing::debug!("normalized state snapshot without warnings");
    } else {
        for w in &warnings {
            warn!(target: "radschedule_core::state", "{w}");
        }
    }

    (
        StateSnapshot {
            locations,
            rows,
            clinicians: raw.clinicians,
            assignments,
            min_slots_by_row_id,
            slot_overrides_by_key: raw.slot_overrides_by_key,
            weekly_template: raw.weekly_template,
            holidays,
            holiday_names,
            solver_settings: raw.solver_settings,
        },
        warnings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SectionKind;

    fn minimal_raw() -> RawStateSnapshot {
        RawStateSnapshot {
            locations: vec![],
            rows: vec![Section {
                id: "MRI".into(),
                name: "MRI".into(),
                kind: SectionKind::Class,
                location_id: "unknown-loc".into(),
                subshifts: vec![],
            }],
            clinicians: vec![],
            assignments: vec![],
            min_slots_by_row_id: HashMap::new(),
            slot_overrides_by_key: HashMap::new(),
            weekly_template: WeeklyTemplate {
                version: 4,
                blocks: vec![],
                locations: vec![],
            },
            holidays: vec![],
            solver_settings: SolverSettings::default(),
            solver_rules: RawSolverRules::default(),
        }
    }

    #[test]
    fn ensures_default_location_exists() {
        let (normalized, _) = normalize(minimal_raw());
        assert!(normalized.locations.iter().any(|l| l.id == DEFAULT_LOCATION_ID));
    }

    #[test]
    fn reassigns_unknown_location_and_warns() {
        let (normalized, warnings) = normalize(minimal_raw());
        assert_eq!(normalized.rows[0].location_id, DEFAULT_LOCATION_ID);
        assert!(warnings.iter().any(|w| w.contains("unknown location")));
    }

    #[test]
    fn defaults_missing_subshifts() {
        let (normalized, warnings) = normalize(minimal_raw());
        assert_eq!(normalized.rows[0].subshifts.len(), 1);
        assert_eq!(normalized.rows[0].subshifts[0].id, DEFAULT_SUBSHIFT_ID);
        assert!(warnings.iter().any(|w| w.contains("defaulted")));
    }

    #[test]
    fn drops_deprecated_pool_rows() {
        let mut raw = minimal_raw();
        raw.rows.push(Section {
            id: "pool-not-allocated".into(),
            name: "Unallocated".into(),
            kind: SectionKind::Pool,
            location_id: DEFAULT_LOCATION_ID.into(),
            subshifts: vec![],
        });
        let (normalized, warnings) = normalize(raw);
        assert!(!normalized.rows.iter().any(|r| r.id == "pool-not-allocated"));
        assert!(warnings.iter().any(|w| w.contains("pool-not-allocated")));
    }

    #[test]
    fn drops_assignments_on_deprecated_pools() {
        let mut raw = minimal_raw();
        raw.assignments.push(Assignment {
            id: "a1".into(),
            clinician_id: "c1".into(),
            row_id: RuntimeRowId::new("pool-manual", "s1"),
            date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            manual: true,
        });
        let (normalized, _) = normalize(raw);
        assert!(normalized.assignments.is_empty());
    }
}
