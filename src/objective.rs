//! Objective Composer (§4.D soft constraints, §4.E): builds the weighted
//! penalty objective and whatever auxiliary variables/constraints a penalty
//! term needs beyond the Model Builder's decision variables.

use crate::calendar::SlotInstance;
use crate::domain::{Clinician, WindowKind};
use crate::eligibility::{violates_on_call_rest, SlotLookup};
use crate::model::{Constraint, Model, Sense, SolverProblem, VarKind};
use crate::state::StateSnapshot;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// Assembles the full MIP: `model`'s hard constraints plus every soft term
/// S1-S7, honoring `state.solver_settings.weights`.
pub fn build_problem(
    state: &StateSnapshot,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
    model: &Model,
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> SolverProblem {
    let weights = state.solver_settings.weights;
    let base_vars = model.total_vars();
    let mut objective = vec![0.0; base_vars];
    let mut var_kinds = vec![VarKind::Binary; base_vars];
    let mut extra_constraints = Vec::new();

    apply_coverage_shortfall(model, weights.coverage, &mut objective);
    apply_preference_and_window(model, instances, clinicians, weights.preference, weights.window, &mut objective);
    apply_on_call_soft(state, model, instances, clinicians, weights.on_call_rest_soft, &mut objective);

    apply_continuity(model, instances, weights.continuity, &mut objective, &mut var_kinds, &mut extra_constraints);

    if !state.solver_settings.enforce_same_location_per_day {
        apply_location_transitions(
            model,
            instances,
            weights.location,
            &mut objective,
            &mut var_kinds,
            &mut extra_constraints,
        );
    }

    apply_hours_deviation(
        state,
        model,
        instances,
        clinicians,
        weights.hours,
        range_start,
        range_end,
        &mut objective,
        &mut var_kinds,
        &mut extra_constraints,
    );

    let mut constraints = model.constraints.clone();
    constraints.extend(extra_constraints);

    SolverProblem { var_kinds, objective, constraints }
}

/// S1: minimizing `Wcov * (remainingCapacity - filled)` is, up to the
/// constant `Wcov * remainingCapacity`, the same as subtracting `Wcov` from
/// every variable covering that instance.
fn apply_coverage_shortfall(model: &Model, weight: i64, objective: &mut [f64]) {
    for idx in 0..model.vars.len() {
        objective[idx] -= weight as f64;
    }
}

/// S5 (preference match) and S6 (time-window preference), both purely
/// per-variable linear terms.
fn apply_preference_and_window(
    model: &Model,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
    pref_weight: i64,
    window_weight: i64,
    objective: &mut [f64],
) {
    for (idx, var) in model.vars.iter().enumerate() {
        let instance = &instances[var.instance_idx];
        let clinician = &clinicians[var.clinician_idx];

        match clinician.preference_rank(&instance.row_id.class_id) {
            Some(rank) => {
                let n = clinician.preferred_class_ids.len().max(1) as f64;
                let reward = pref_weight as f64 * (n - rank as f64) / n;
                objective[idx] -= reward;
            }
            None => objective[idx] += pref_weight as f64,
        }

        let minutes_outside = preferred_window_overflow(clinician, instance);
        if minutes_outside > 0 {
            objective[idx] += window_weight as f64 * minutes_outside as f64;
        }
    }
}

fn preferred_window_overflow(clinician: &Clinician, instance: &SlotInstance) -> i64 {
    let day_type = crate::domain::DayType::from_weekday(instance.date.weekday());
    clinician
        .preferred_windows
        .iter()
        .filter(|w| w.kind == WindowKind::Preferred && w.day_type == day_type)
        .map(|w| {
            let before = (w.start_min as i64 - instance.interval.start).max(0);
            let after = (instance.interval.end - w.end_min as i64).max(0);
            before + after
        })
        .sum()
}

/// S7, soft form: penalize on-call-rest violations directly, since the
/// hard form already removed the variable entirely (§4.C rule 3).
fn apply_on_call_soft(
    state: &StateSnapshot,
    model: &Model,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
    weight: i64,
    objective: &mut [f64],
) {
    let Some(rest) = &state.solver_settings.on_call_rest else { return };
    if rest.hard {
        return;
    }
    for (idx, var) in model.vars.iter().enumerate() {
        let instance = &instances[var.instance_idx];
        let clinician = &clinicians[var.clinician_idx];
        if violates_on_call_rest(state, rest, &clinician.id, instance.date, &instance.row_id.class_id) {
            objective[idx] += weight as f64;
        }
    }
}

/// S2: penalizes gaps in each (clinician, day, location) group's
/// chosen-slot sequence, ordered by start time. Only list-adjacent slots
/// with a genuine clock gap between them (the next one doesn't start the
/// instant the previous ends) count as a break; an indicator fires, and
/// is penalized, only when *both* sides of that gap are selected — filling
/// every slot in a run, including ones separated by a real gap, still
/// costs one penalty per gap crossed.
fn apply_continuity(
    model: &Model,
    instances: &[SlotInstance],
    weight: i64,
    objective: &mut Vec<f64>,
    var_kinds: &mut Vec<VarKind>,
    constraints: &mut Vec<Constraint>,
) {
    for group in group_vars_by_clinician_day_location(model, instances) {
        if group.vars.len() < 2 {
            continue;
        }
        for window in group.vars.windows(2) {
            let (prev, curr) = (window[0], window[1]);
            let prev_interval = &instances[model.vars[prev].instance_idx].interval;
            let curr_interval = &instances[model.vars[curr].instance_idx].interval;
            if curr_interval.start <= prev_interval.end {
                // Back-to-back (or overlapping, already forbidden by H3):
                // no gap, so nothing to penalize.
                continue;
            }
            let aux_idx = objective.len();
            objective.push(weight as f64);
            var_kinds.push(VarKind::Binary);
            // aux >= prev + curr - 1  <=>  prev + curr - aux <= 1
            constraints.push(Constraint {
                label: format!("continuity-gap[{}]", aux_idx),
                terms: vec![(prev, 1.0), (curr, 1.0), (aux_idx, -1.0)],
                sense: Sense::Le,
                rhs: 1.0,
            });
        }
    }
}

/// S3: only active when H5 is off. Reuses the location-indicator pattern
/// from `model::add_same_location_constraints`, but as a pure penalty (no
/// mutual exclusion): one indicator per distinct location touched, minus a
/// constant that doesn't affect the optimum.
fn apply_location_transitions(
    model: &Model,
    instances: &[SlotInstance],
    weight: i64,
    objective: &mut Vec<f64>,
    var_kinds: &mut Vec<VarKind>,
    constraints: &mut Vec<Constraint>,
) {
    let mut indicator_index: HashMap<(usize, NaiveDate, String), usize> = HashMap::new();

    for (var_idx, var) in model.vars.iter().enumerate() {
        let instance = &instances[var.instance_idx];
        let key = (var.clinician_idx, instance.date, instance.location_id.clone());
        let indicator_idx = *indicator_index.entry(key).or_insert_with(|| {
            let idx = objective.len();
            objective.push(weight as f64);
            var_kinds.push(VarKind::Binary);
            idx
        });
        constraints.push(Constraint {
            label: format!("location-touch-link[{},{}]", var_idx, indicator_idx),
            terms: vec![(var_idx, 1.0), (indicator_idx, -1.0)],
            sense: Sense::Le,
            rhs: 0.0,
        });
    }
}

/// S4: piecewise deviation from `workingHoursPerWeek`, linearized with one
/// continuous "minutes outside tolerance" variable per clinician with a
/// target.
#[allow(clippy::too_many_arguments)]
fn apply_hours_deviation(
    state: &StateSnapshot,
    model: &Model,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
    weight: i64,
    range_start: NaiveDate,
    range_end: NaiveDate,
    objective: &mut Vec<f64>,
    var_kinds: &mut Vec<VarKind>,
    constraints: &mut Vec<Constraint>,
) {
    let working_days = working_days_in_range(range_start, range_end) as f64;
    let lookup = SlotLookup::build(state);

    for (clinician_idx, clinician) in clinicians.iter().enumerate() {
        let Some(hours_per_week) = clinician.working_hours_per_week else { continue };
        let target_minutes = hours_per_week * 60.0 * working_days / 5.0;
        let tolerance_minutes = clinician.tolerance_hours() * 60.0;

        let pinned_minutes: f64 = state
            .assignments
            .iter()
            .filter(|a| a.manual && a.clinician_id == clinician.id)
            .filter_map(|a| {
                let day_type = crate::calendar::day_type(a.date, state);
                lookup.interval_for(&a.row_id, day_type)
            })
            .map(|iv| iv.duration_minutes() as f64)
            .sum();

        let terms: Vec<(usize, f64)> = model
            .vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.clinician_idx == clinician_idx)
            .map(|(var_idx, v)| (var_idx, instances[v.instance_idx].interval.duration_minutes() as f64))
            .collect();
        if terms.is_empty() && pinned_minutes == 0.0 {
            continue;
        }

        let dev_idx = objective.len();
        objective.push(weight as f64);
        var_kinds.push(VarKind::ContinuousNonNegative);

        // assigned - target - tolerance <= dev
        let mut over_terms = terms.clone();
        over_terms.push((dev_idx, -1.0));
        constraints.push(Constraint {
            label: format!("hours-over[{}]", clinician.id),
            terms: over_terms,
            sense: Sense::Le,
            rhs: target_minutes + tolerance_minutes - pinned_minutes,
        });

        // target - assigned - tolerance <= dev
        let mut under_terms: Vec<(usize, f64)> = terms.iter().map(|&(v, c)| (v, -c)).collect();
        under_terms.push((dev_idx, -1.0));
        constraints.push(Constraint {
            label: format!("hours-under[{}]", clinician.id),
            terms: under_terms,
            sense: Sense::Le,
            rhs: tolerance_minutes - target_minutes + pinned_minutes,
        });
    }
}

/// Working-day count used to scale a clinician's weekly target hours over
/// an arbitrary date range; shared with the Stats Evaluator and Diagnostics.
pub(crate) fn working_days_in_range(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut count = 0;
    let mut date = start;
    while date <= end {
        if !matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            count += 1;
        }
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    count
}

struct ContinuityGroup {
    vars: Vec<usize>,
}

/// Groups decision variables by `(clinician, date, location)`, ordered by
/// start time within the group, for S2/continuity reasoning.
fn group_vars_by_clinician_day_location(model: &Model, instances: &[SlotInstance]) -> Vec<ContinuityGroup> {
    let mut by_key: HashMap<(usize, NaiveDate, String), Vec<usize>> = HashMap::new();
    for (var_idx, var) in model.vars.iter().enumerate() {
        let instance = &instances[var.instance_idx];
        let key = (var.clinician_idx, instance.date, instance.location_id.clone());
        by_key.entry(key).or_default().push(var_idx);
    }

    by_key
        .into_values()
        .map(|mut vars| {
            vars.sort_by_key(|&v| instances[model.vars[v].instance_idx].interval.start);
            ContinuityGroup { vars }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::expand_slots;
    use crate::domain::{DayType, Location, Section, SectionKind, SubShift, TemplateSlot};
    use crate::eligibility::EligibilityMatrix;
    use crate::state::{LocationTemplate, RawStateSnapshot, SolverSettings, WeeklyTemplate};
    use std::collections::HashMap as StdHashMap;

    fn two_adjacent_slots_raw() -> RawStateSnapshot {
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
            start_min: 14 * 60,
            end_min: 18 * 60,
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
    fn continuity_adds_one_edge_variable_for_two_slot_group() {
        let (state, _) = crate::state::normalize(two_adjacent_slots_raw());
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let instances = expand_slots(&state, mon, mon);
        let eligibility = EligibilityMatrix::build(&state, &instances, &state.clinicians);
        let model = crate::model::build(&state, &instances, &state.clinicians, &eligibility);
        let problem = build_problem(&state, &instances, &state.clinicians, &model, mon, mon);
        assert_eq!(problem.var_kinds.len(), model.total_vars() + 1);
        assert!(problem.constraints.iter().any(|c| c.label.starts_with("continuity-gap")));
    }

    #[test]
    fn back_to_back_slots_add_no_continuity_gap_constraint() {
        let mut raw = two_adjacent_slots_raw();
        raw.weekly_template.locations[0].slots[1].start_min = 12 * 60;
        raw.weekly_template.locations[0].slots[1].end_min = 16 * 60;
        let (state, _) = crate::state::normalize(raw);
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let instances = expand_slots(&state, mon, mon);
        let eligibility = EligibilityMatrix::build(&state, &instances, &state.clinicians);
        let model = crate::model::build(&state, &instances, &state.clinicians, &eligibility);
        let problem = build_problem(&state, &instances, &state.clinicians, &model, mon, mon);
        assert!(!problem.constraints.iter().any(|c| c.label.starts_with("continuity-gap")));
    }

    #[test]
    fn coverage_shortfall_pushes_negative_coefficient() {
        let (state, _) = crate::state::normalize(two_adjacent_slots_raw());
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let instances = expand_slots(&state, mon, mon);
        let eligibility = EligibilityMatrix::build(&state, &instances, &state.clinicians);
        let model = crate::model::build(&state, &instances, &state.clinicians, &eligibility);
        let problem = build_problem(&state, &instances, &state.clinicians, &model, mon, mon);
        assert!(problem.objective[0] < 0.0);
    }
}
