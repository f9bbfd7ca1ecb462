//! Stats Evaluator (§4.I): a pure function of the current (possibly
//! partial) solution, callable from the solver's incumbent callback or
//! post hoc on the final assignment list.

use crate::calendar::SlotInstance;
use crate::domain::{Assignment, Clinician};
use crate::eligibility::SlotLookup;
use crate::objective::working_days_in_range;
use crate::state::StateSnapshot;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub filled_slots: u32,
    pub total_required_slots: u32,
    pub open_slots: u32,
    pub non_consecutive_shifts: u32,
    pub clinicians_within_hours: u32,
    pub total_clinicians_with_target: u32,
}

pub fn evaluate(
    state: &StateSnapshot,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
    assignments: &[Assignment],
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Stats {
    let mut filled_slots = 0u32;
    let mut total_required_slots = 0u32;
    for inst in instances {
        let filled = assignments
            .iter()
            .filter(|a| a.row_id == inst.row_id && a.date == inst.date)
            .count() as u32;
        filled_slots += filled.min(inst.required_count);
        total_required_slots += inst.required_count;
    }
    let open_slots = total_required_slots.saturating_sub(filled_slots);

    let lookup = SlotLookup::build(state);
    let non_consecutive_shifts = count_non_consecutive(state, &lookup, assignments);

    let working_days = working_days_in_range(range_start, range_end) as f64;
    let mut clinicians_within_hours = 0u32;
    let mut total_clinicians_with_target = 0u32;
    for clinician in clinicians {
        let Some(hours_per_week) = clinician.working_hours_per_week else { continue };
        total_clinicians_with_target += 1;
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
        if (assigned_minutes - target_minutes).abs() <= tolerance_minutes {
            clinicians_within_hours += 1;
        }
    }

    Stats {
        filled_slots,
        total_required_slots,
        open_slots,
        non_consecutive_shifts,
        clinicians_within_hours,
        total_clinicians_with_target,
    }
}

/// Counts `(clinician, date)` pairs whose assigned intervals, ordered by
/// start, contain a gap — i.e. are not a single contiguous run.
fn count_non_consecutive(state: &StateSnapshot, lookup: &SlotLookup, assignments: &[Assignment]) -> u32 {
    let mut by_clinician_day: HashMap<(&str, NaiveDate), Vec<crate::time::Interval>> = HashMap::new();
    for a in assignments {
        let day_type = crate::calendar::day_type(a.date, state);
        let Some(interval) = lookup.interval_for(&a.row_id, day_type) else { continue };
        by_clinician_day
            .entry((a.clinician_id.as_str(), a.date))
            .or_default()
            .push(interval);
    }

    let mut count = 0u32;
    for mut intervals in by_clinician_day.into_values() {
        if intervals.len() < 2 {
            continue;
        }
        intervals.sort_by_key(|iv| iv.start);
        let contiguous = intervals.windows(2).all(|w| w[0].end >= w[1].start);
        if !contiguous {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::expand_slots;
    use crate::domain::{DayType, Location, RuntimeRowId as RowId, Section, SectionKind, SubShift, TemplateSlot};
    use crate::state::{LocationTemplate, RawStateSnapshot, SolverSettings, WeeklyTemplate};
    use std::collections::HashMap as StdHashMap;

    fn two_slots_raw() -> RawStateSnapshot {
        let morning = TemplateSlot {
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
        let afternoon = TemplateSlot {
            location_id: "loc-default".into(),
            row_band: "row-1".into(),
            day_type: DayType::Mon,
            class_id: "MRI".into(),
            subshift_id: "s2".into(),
            required_count: 1,
            start_min: 13 * 60,
            end_min: 16 * 60,
            end_day_offset: 0,
        };
        RawStateSnapshot {
            locations: vec![Location { id: "loc-default".into(), name: "Default".into() }],
            rows: vec![Section {
                id: "MRI".into(),
                name: "MRI".into(),
                kind: SectionKind::Class,
                location_id: "loc-default".into(),
                subshifts: vec![SubShift::new("s1", 1, "Morning"), SubShift::new("s2", 2, "Afternoon")],
            }],
            clinicians: vec![Clinician::new("c1", "Alice").with_qualifications(["MRI"])],
            assignments: vec![],
            min_slots_by_row_id: StdHashMap::new(),
            slot_overrides_by_key: StdHashMap::new(),
            weekly_template: WeeklyTemplate {
                version: 4,
                blocks: vec![],
                locations: vec![LocationTemplate {
                    location_id: "loc-default".into(),
                    row_bands: vec!["row-1".into()],
                    col_bands: vec![],
                    slots: vec![morning, afternoon],
                }],
            },
            holidays: vec![],
            solver_settings: SolverSettings::default(),
            solver_rules: Default::default(),
        }
    }

    #[test]
    fn counts_filled_and_open_slots() {
        let (state, _) = crate::state::normalize(two_slots_raw());
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let instances = expand_slots(&state, mon, mon);
        let assignments = vec![Assignment {
            id: "a1".into(),
            clinician_id: "c1".into(),
            row_id: RowId::new("MRI", "s1"),
            date: mon,
            manual: false,
        }];
        let stats = evaluate(&state, &instances, &state.clinicians, &assignments, mon, mon);
        assert_eq!(stats.total_required_slots, 2);
        assert_eq!(stats.filled_slots, 1);
        assert_eq!(stats.open_slots, 1);
    }

    #[test]
    fn gap_between_shifts_counts_as_non_consecutive() {
        let (state, _) = crate::state::normalize(two_slots_raw());
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let instances = expand_slots(&state, mon, mon);
        let assignments = vec![
            Assignment {
                id: "a1".into(),
                clinician_id: "c1".into(),
                row_id: RowId::new("MRI", "s1"),
                date: mon,
                manual: false,
            },
            Assignment {
                id: "a2".into(),
                clinician_id: "c1".into(),
                row_id: RowId::new("MRI", "s2"),
                date: mon,
                manual: false,
            },
        ];
        let stats = evaluate(&state, &instances, &state.clinicians, &assignments, mon, mon);
        assert_eq!(stats.non_consecutive_shifts, 1, "08-12 and 13-16 leave a 12-13 gap");
    }
}
