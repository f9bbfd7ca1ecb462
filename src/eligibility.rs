//! Eligibility Resolver (§4.C): computes the (clinician x slot-instance)
//! feasibility matrix that later becomes the decision-variable domain.

use crate::calendar::SlotInstance;
use crate::domain::{Clinician, DayType, RuntimeRowId, TemplateSlot, WindowKind};
use crate::state::StateSnapshot;
use crate::time::Interval;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    NotQualified,
    OnVacation,
    OnCallRestBlocked,
    ManualOverlap,
    OutsideMandatoryWindow,
}

/// Indexes template slots by `(row, day type)` so an existing assignment's
/// time window can be recovered even when its date falls outside the
/// currently requested range.
pub struct SlotLookup<'a> {
    by_row_and_day: HashMap<(RuntimeRowId, DayType), &'a TemplateSlot>,
}

impl<'a> SlotLookup<'a> {
    pub fn build(state: &'a StateSnapshot) -> Self {
        let mut by_row_and_day = HashMap::new();
        for loc in &state.weekly_template.locations {
            for slot in &loc.slots {
                by_row_and_day.insert((slot.row_id(), slot.day_type), slot);
            }
        }
        SlotLookup { by_row_and_day }
    }

    pub fn interval_for(&self, row_id: &RuntimeRowId, day_type: DayType) -> Option<Interval> {
        self.by_row_and_day
            .get(&(row_id.clone(), day_type))
            .map(|s| s.interval())
    }
}

/// Evaluates §4.C rules 1-5 for a single (clinician, slot instance) pair.
pub fn eligible(
    state: &StateSnapshot,
    lookup: &SlotLookup,
    clinician: &Clinician,
    instance: &SlotInstance,
) -> Result<(), Ineligible> {
    // Rule 1: qualification.
    if !clinician.qualified_class_ids.contains(&instance.row_id.class_id) {
        return Err(Ineligible::NotQualified);
    }

    // Rule 2: vacation.
    if clinician.is_on_vacation(instance.date) {
        return Err(Ineligible::OnVacation);
    }

    // Rule 3: on-call rest, domain-exclusion form, gated on manual on-call
    // assignments already on the books (§4.D H6's "variables excluded ...
    // by variable domain" reading of §4.C rule 3). The soft form (S7) reuses
    // `violates_on_call_rest` instead of excluding the variable.
    if let Some(rest) = &state.solver_settings.on_call_rest {
        if rest.hard && violates_on_call_rest(state, rest, &clinician.id, instance.date, &instance.row_id.class_id) {
            return Err(Ineligible::OnCallRestBlocked);
        }
    }

    // Rule 4: no time-overlap with an existing manual assignment on the
    // same date.
    let overlaps_manual = state.assignments.iter().any(|a| {
        if !(a.manual && a.clinician_id == clinician.id && a.date == instance.date) {
            return false;
        }
        if a.row_id == instance.row_id {
            // Same slot concept: not a conflict, it's the pin this instance
            // represents (or a pin on a different physical subshift, still
            // the same row, left to H3/H7 to reconcile).
            return false;
        }
        let day_type = crate::calendar::day_type(a.date, state);
        match lookup.interval_for(&a.row_id, day_type) {
            Some(existing) => existing.overlaps(&instance.interval),
            None => false,
        }
    });
    if overlaps_manual {
        return Err(Ineligible::ManualOverlap);
    }

    // Rule 5: mandatory preferred windows constrain eligibility; preferred
    // (non-mandatory) windows never do.
    let day_type = crate::calendar::day_type(instance.date, state);
    for window in &clinician.preferred_windows {
        if window.kind != WindowKind::Mandatory || window.day_type != day_type {
            continue;
        }
        let inside = instance.interval.start >= window.start_min as i64
            && instance.interval.end <= window.end_min as i64;
        if !inside {
            return Err(Ineligible::OutsideMandatoryWindow);
        }
    }

    Ok(())
}

fn is_within_rest_window(on_call_date: chrono::NaiveDate, candidate_date: chrono::NaiveDate, days_before: i64, days_after: i64) -> bool {
    let delta = (candidate_date - on_call_date).num_days();
    (-days_after..=days_before).contains(&delta)
}

/// True when `clinician_id` has a manual on-call assignment within
/// `rest`'s window of `date`, and `class_id` is not the on-call class
/// itself. Shared by the hard eligibility gate and the soft S7 penalty.
pub fn violates_on_call_rest(
    state: &StateSnapshot,
    rest: &crate::state::OnCallRestConfig,
    clinician_id: &str,
    date: chrono::NaiveDate,
    class_id: &str,
) -> bool {
    if class_id == rest.on_call_class_id {
        return false;
    }
    state.assignments.iter().any(|a| {
        a.manual
            && a.clinician_id == clinician_id
            && a.row_id.class_id == rest.on_call_class_id
            && is_within_rest_window(a.date, date, rest.days_before, rest.days_after)
    })
}

/// The full feasibility matrix: which (clinician, slot-instance) pairs
/// admit a decision variable.
pub struct EligibilityMatrix {
    /// `pairs[instance_idx]` lists the eligible clinician indices for that
    /// instance, sorted for deterministic variable creation order.
    pub pairs: Vec<Vec<usize>>,
}

impl EligibilityMatrix {
    pub fn build(state: &StateSnapshot, instances: &[SlotInstance], clinicians: &[Clinician]) -> Self {
        let lookup = SlotLookup::build(state);
        let pairs = instances
            .iter()
            .map(|instance| {
                clinicians
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| eligible(state, &lookup, c, instance).is_ok())
                    .map(|(idx, _)| idx)
                    .collect()
            })
            .collect();
        EligibilityMatrix { pairs }
    }

    pub fn is_eligible(&self, instance_idx: usize, clinician_idx: usize) -> bool {
        self.pairs
            .get(instance_idx)
            .map(|v| v.binary_search(&clinician_idx).is_ok() || v.contains(&clinician_idx))
            .unwrap_or(false)
    }

    pub fn eligible_clinicians(&self, instance_idx: usize) -> &[usize] {
        self.pairs.get(instance_idx).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::expand_slots;
    use crate::domain::{Assignment, Location, RuntimeRowId as RowId, Section, SectionKind, SubShift, TemplateSlot};
    use crate::state::{LocationTemplate, RawStateSnapshot, SolverSettings, WeeklyTemplate};
    use std::collections::HashMap;

    fn base_raw() -> RawStateSnapshot {
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
    fn unqualified_clinician_ineligible() {
        let mut raw = base_raw();
        raw.clinicians[0].qualified_class_ids.clear();
        let (state, _) = crate::state::normalize(raw);
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let instances = expand_slots(&state, mon, mon);
        let lookup = SlotLookup::build(&state);
        assert_eq!(
            eligible(&state, &lookup, &state.clinicians[0], &instances[0]),
            Err(Ineligible::NotQualified)
        );
    }

    #[test]
    fn vacation_blocks_eligibility() {
        let mut raw = base_raw();
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        raw.clinicians[0] = raw.clinicians[0].clone().with_vacation(mon, mon);
        let (state, _) = crate::state::normalize(raw);
        let instances = expand_slots(&state, mon, mon);
        let lookup = SlotLookup::build(&state);
        assert_eq!(
            eligible(&state, &lookup, &state.clinicians[0], &instances[0]),
            Err(Ineligible::OnVacation)
        );
    }

    #[test]
    fn manual_overlap_blocks_eligibility() {
        let mut raw = base_raw();
        // Second row overlapping the first in time.
        raw.rows.push(Section {
            id: "CT".into(),
            name: "CT".into(),
            kind: SectionKind::Class,
            location_id: "loc-default".into(),
            subshifts: vec![SubShift::new("s1", 1, "Default")],
        });
        raw.weekly_template.locations[0].slots.push(TemplateSlot {
            location_id: "loc-default".into(),
            row_band: "row-2".into(),
            day_type: DayType::Mon,
            class_id: "CT".into(),
            subshift_id: "s1".into(),
            required_count: 1,
            start_min: 9 * 60,
            end_min: 11 * 60,
            end_day_offset: 0,
        });
        raw.clinicians[0] = raw.clinicians[0].clone().with_qualifications(["MRI", "CT"]);
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        raw.assignments.push(Assignment {
            id: "a1".into(),
            clinician_id: "c1".into(),
            row_id: RowId::new("CT", "s1"),
            date: mon,
            manual: true,
        });
        let (state, _) = crate::state::normalize(raw);
        let instances = expand_slots(&state, mon, mon);
        let lookup = SlotLookup::build(&state);
        let mri_instance = instances.iter().find(|i| i.row_id.class_id == "MRI").unwrap();
        assert_eq!(
            eligible(&state, &lookup, &state.clinicians[0], mri_instance),
            Err(Ineligible::ManualOverlap)
        );
    }

    #[test]
    fn on_call_rest_blocks_adjacent_days() {
        let mut raw = base_raw();
        raw.solver_settings.on_call_rest = Some(crate::state::OnCallRestConfig {
            on_call_class_id: "ONCALL".into(),
            days_before: 1,
            days_after: 1,
            hard: true,
        });
        let jan4 = chrono::NaiveDate::from_ymd_opt(2026, 1, 4).unwrap();
        let jan5 = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        raw.assignments.push(Assignment {
            id: "oncall".into(),
            clinician_id: "c1".into(),
            row_id: RowId::new("ONCALL", "s1"),
            date: jan5,
            manual: true,
        });
        let (state, _) = crate::state::normalize(raw);
        let instances = expand_slots(&state, jan4, jan4);
        let lookup = SlotLookup::build(&state);
        assert_eq!(
            eligible(&state, &lookup, &state.clinicians[0], &instances[0]),
            Err(Ineligible::OnCallRestBlocked)
        );
    }
}
