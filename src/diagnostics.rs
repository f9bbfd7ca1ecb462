//! Diagnostics (§4.H): per-run warnings and structured `debugInfo`.

use crate::backend::SolveStatus;
use crate::calendar::SlotInstance;
use crate::domain::{Assignment, Clinician};
use crate::eligibility::{eligible, SlotLookup};
use crate::objective::working_days_in_range;
use crate::state::StateSnapshot;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct UncoveredSlot {
    pub date: NaiveDate,
    pub row_id: String,
    pub missing: u32,
}

#[derive(Debug, Clone)]
pub struct HoursOutlier {
    pub clinician_id: String,
    pub assigned_minutes: f64,
    pub target_minutes: f64,
    pub deviation_minutes: f64,
}

#[derive(Debug, Clone)]
pub struct RejectedPin {
    pub clinician_id: String,
    pub row_id: String,
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct DebugInfo {
    pub solver_status: SolveStatus,
    pub wall_time_ms: u64,
    pub incumbent_count: u32,
    pub uncovered: Vec<UncoveredSlot>,
    pub hours_outliers: Vec<HoursOutlier>,
    pub rejected_pins: Vec<RejectedPin>,
}

/// Required slots left unfilled by the final assignment list, one entry per
/// slot instance with `missing > 0`. `UnreachableCoverage` in spec terms.
pub fn uncovered_slots(instances: &[SlotInstance], assignments: &[Assignment]) -> Vec<UncoveredSlot> {
    instances
        .iter()
        .filter_map(|inst| {
            let filled = assignments
                .iter()
                .filter(|a| a.row_id == inst.row_id && a.date == inst.date)
                .count() as u32;
            let missing = inst.required_count.saturating_sub(filled);
            if missing == 0 {
                return None;
            }
            Some(UncoveredSlot {
                date: inst.date,
                row_id: inst.row_id.to_string(),
                missing,
            })
        })
        .collect()
}

/// Manual pins that violate one of the §4.C hard eligibility rules. These
/// are reported, never removed: manual assignments are immutable inputs and
/// survive extraction unconditionally.
pub fn rejected_pins(
    state: &StateSnapshot,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
) -> Vec<RejectedPin> {
    let lookup = SlotLookup::build(state);
    state
        .assignments
        .iter()
        .filter(|a| a.manual)
        .filter_map(|pin| {
            let instance = instances.iter().find(|i| i.row_id == pin.row_id && i.date == pin.date);
            let Some(instance) = instance else {
                return Some(RejectedPin {
                    clinician_id: pin.clinician_id.clone(),
                    row_id: pin.row_id.to_string(),
                    date: pin.date,
                    reason: "slot not found in requested range".to_string(),
                });
            };
            let clinician = clinicians.iter().find(|c| c.id == pin.clinician_id)?;
            match eligible(state, &lookup, clinician, instance) {
                Ok(()) => None,
                Err(reason) => Some(RejectedPin {
                    clinician_id: pin.clinician_id.clone(),
                    row_id: pin.row_id.to_string(),
                    date: pin.date,
                    reason: format!("{:?}", reason),
                }),
            }
        })
        .collect()
}

/// Clinicians whose final assigned minutes fall outside their tolerance
/// band around `workingHoursPerWeek`, scaled to the requested range.
pub fn hours_outliers(
    state: &StateSnapshot,
    clinicians: &[Clinician],
    assignments: &[Assignment],
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Vec<HoursOutlier> {
    let working_days = working_days_in_range(range_start, range_end) as f64;
    let lookup = SlotLookup::build(state);

    clinicians
        .iter()
        .filter_map(|clinician| {
            let hours_per_week = clinician.working_hours_per_week?;
            let target_minutes = hours_per_week * 60.0 * working_days / 5.0;
            let tolerance_minutes = clinician.tolerance_hours() * 60.0;

            let assigned_minutes: f64 = assignments
                .iter()
                .filter(|a| a.clinician_id == clinician.id)
                .filter_map(|a| {
                    let day_type = crate::calendar::day_type(a.date, state);
                    lookup.interval_for(&a.row_id, day_type)
                })
                .map(|iv| iv.duration_minutes() as f64)
                .sum();

            let deviation = (assigned_minutes - target_minutes).abs() - tolerance_minutes;
            if deviation <= 0.0 {
                return None;
            }
            Some(HoursOutlier {
                clinician_id: clinician.id.clone(),
                assigned_minutes,
                target_minutes,
                deviation_minutes: deviation,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::expand_slots;
    use crate::domain::{DayType, Location, RuntimeRowId as RowId, Section, SectionKind, SubShift, TemplateSlot};
    use crate::state::{LocationTemplate, RawStateSnapshot, SolverSettings, WeeklyTemplate};
    use std::collections::HashMap;

    fn raw() -> RawStateSnapshot {
        let slot = TemplateSlot {
            location_id: "loc-default".into(),
            row_band: "row-1".into(),
            day_type: DayType::Mon,
            class_id: "MRI".into(),
            subshift_id: "s1".into(),
            required_count: 1,
            start_min: 8 * 60,
            end_min: 12 * 60,
            end_day_offset: 0,
        };
        RawStateSnapshot {
            locations: vec![Location { id: "loc-default".into(), name: "Default".into() }],
            rows: vec![Section {
                id: "MRI".into(),
                name: "MRI".into(),
                kind: SectionKind::Class,
                location_id: "loc-default".into(),
                subshifts: vec![SubShift::new("s1", 1, "Default")],
            }],
            clinicians: vec![Clinician::new("c1", "Alice").with_qualifications(["MRI"])],
            assignments: vec![],
            min_slots_by_row_id: HashMap::new(),
            slot_overrides_by_key: HashMap::new(),
            weekly_template: WeeklyTemplate {
                version: 4,
                blocks: vec![],
                locations: vec![LocationTemplate {
                    location_id: "loc-default".into(),
                    row_bands: vec!["row-1".into()],
                    col_bands: vec![],
                    slots: vec![slot],
                }],
            },
            holidays: vec![],
            solver_settings: SolverSettings::default(),
            solver_rules: Default::default(),
        }
    }

    #[test]
    fn unfilled_required_slot_is_uncovered() {
        let (state, _) = crate::state::normalize(raw());
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let instances = expand_slots(&state, mon, mon);
        let uncovered = uncovered_slots(&instances, &[]);
        assert_eq!(uncovered.len(), 1);
        assert_eq!(uncovered[0].missing, 1);
    }

    #[test]
    fn unqualified_pin_is_rejected() {
        let mut raw = raw();
        raw.clinicians[0].qualified_class_ids.clear();
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        raw.assignments.push(Assignment {
            id: "a1".into(),
            clinician_id: "c1".into(),
            row_id: RowId::new("MRI", "s1"),
            date: mon,
            manual: true,
        });
        let (state, _) = crate::state::normalize(raw);
        let instances = expand_slots(&state, mon, mon);
        let rejected = rejected_pins(&state, &instances, &state.clinicians);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].clinician_id, "c1");
    }

    #[test]
    fn clinician_within_tolerance_is_not_an_outlier() {
        let mut raw = raw();
        raw.clinicians[0] = raw.clinicians[0].clone().with_target_hours(4.0);
        let (state, _) = crate::state::normalize(raw);
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let assignments = vec![Assignment {
            id: "a1".into(),
            clinician_id: "c1".into(),
            row_id: RowId::new("MRI", "s1"),
            date: mon,
            manual: false,
        }];
        let outliers = hours_outliers(&state, &state.clinicians, &assignments, mon, mon);
        assert!(outliers.is_empty());
    }
}
