//! Model Builder (§4.D): turns the eligibility matrix into decision
//! variables and the hard constraints H1-H6. Manual pins (H7) are not
//! modeled as variables at all — they are background facts that shrink the
//! remaining capacity and block overlapping/non-overlapping decision
//! variables on the same day; the Assignment Extractor re-inserts them into
//! the final schedule unconditionally.

use crate::calendar::SlotInstance;
use crate::domain::Clinician;
use crate::eligibility::EligibilityMatrix;
use crate::state::StateSnapshot;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Eq,
    Le,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub label: String,
    pub terms: Vec<(usize, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    fn at_most_one(label: String, vars: &[usize]) -> Self {
        Constraint {
            label,
            terms: vars.iter().map(|&v| (v, 1.0)).collect(),
            sense: Sense::Le,
            rhs: 1.0,
        }
    }
}

/// Column type for the assembled MIP, since the Objective Composer adds
/// continuous deviation variables (S4) alongside the builder's binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    ContinuousNonNegative,
}

/// The fully assembled problem a `Backend` solves: hard constraints from
/// `Model` plus the Objective Composer's penalty terms and auxiliary
/// variables, flattened into one column space.
pub struct SolverProblem {
    pub var_kinds: Vec<VarKind>,
    pub objective: Vec<f64>,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, Copy)]
pub struct AssignmentVar {
    pub instance_idx: usize,
    pub clinician_idx: usize,
}

/// `y[clinician, date, location]`: 1 when `clinician` works anywhere at
/// `location` on `date`. Only created when H5 is in effect.
#[derive(Debug, Clone)]
pub struct LocationIndicatorVar {
    pub clinician_idx: usize,
    pub date: NaiveDate,
    pub location_id: String,
}

pub struct Model {
    pub vars: Vec<AssignmentVar>,
    pub var_index: HashMap<(usize, usize), usize>,
    pub location_vars: Vec<LocationIndicatorVar>,
    pub constraints: Vec<Constraint>,
    /// `required_count` minus already-seated manual pins, per slot instance;
    /// this is the remaining capacity the decision variables compete for.
    pub remaining_capacity: Vec<u32>,
}

impl Model {
    pub fn total_vars(&self) -> usize {
        self.vars.len() + self.location_vars.len()
    }

    pub fn location_var_index(&self, idx: usize) -> usize {
        self.vars.len() + idx
    }

    pub fn var_for(&self, instance_idx: usize, clinician_idx: usize) -> Option<usize> {
        self.var_index.get(&(instance_idx, clinician_idx)).copied()
    }
}

pub fn build(
    state: &StateSnapshot,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
    eligibility: &EligibilityMatrix,
) -> Model {
    let pinned_same_row: HashMap<(usize, usize), ()> =
        pinned_pairs(state, instances, clinicians);

    let mut vars = Vec::new();
    let mut var_index = HashMap::new();
    for (instance_idx, clinician_indices) in eligibility.pairs.iter().enumerate() {
        for &clinician_idx in clinician_indices {
            if pinned_same_row.contains_key(&(instance_idx, clinician_idx)) {
                // Already seated by a manual pin; no variable needed.
                continue;
            }
            let idx = vars.len();
            vars.push(AssignmentVar { instance_idx, clinician_idx });
            var_index.insert((instance_idx, clinician_idx), idx);
        }
    }

    let remaining_capacity: Vec<u32> = instances
        .iter()
        .map(|inst| {
            let pinned = pinned_count_for_instance(state, inst);
            inst.required_count.saturating_sub(pinned)
        })
        .collect();

    let mut constraints = Vec::new();
    constraints.extend(coverage_constraints(state, instances, &var_index, &remaining_capacity, eligibility));
    constraints.extend(same_day_constraints(state, instances, clinicians, &var_index, &vars));

    let mut model = Model {
        vars,
        var_index,
        location_vars: Vec::new(),
        constraints,
        remaining_capacity,
    };

    if state.solver_settings.enforce_same_location_per_day {
        add_same_location_constraints(instances, &mut model);
    }

    model
}

fn pinned_count_for_instance(state: &StateSnapshot, instance: &SlotInstance) -> u32 {
    state
        .assignments
        .iter()
        .filter(|a| a.manual && a.row_id == instance.row_id && a.date == instance.date)
        .count() as u32
}

/// Maps each manual pin to the `(instance_idx, clinician_idx)` pair it
/// occupies, so the corresponding decision variable is never created.
fn pinned_pairs(
    state: &StateSnapshot,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
) -> HashMap<(usize, usize), ()> {
    let mut out = HashMap::new();
    for a in state.assignments.iter().filter(|a| a.manual) {
        let Some(instance_idx) = instances
            .iter()
            .position(|i| i.row_id == a.row_id && i.date == a.date)
        else {
            continue;
        };
        let Some(clinician_idx) = clinicians.iter().position(|c| c.id == a.clinician_id) else {
            continue;
        };
        out.insert((instance_idx, clinician_idx), ());
    }
    out
}

/// H1/H2: capacity per slot instance. `onlyFillRequired` asks for exact
/// fill (`==`) against `requiredCount`; otherwise the bound is not
/// `requiredCount` at all but the number of clinicians actually eligible
/// for the slot, so the Objective Composer's S1 term can distribute
/// coverage past the nominal requirement wherever feasibility allows it.
fn coverage_constraints(
    state: &StateSnapshot,
    instances: &[SlotInstance],
    var_index: &HashMap<(usize, usize), usize>,
    remaining_capacity: &[u32],
    eligibility: &EligibilityMatrix,
) -> Vec<Constraint> {
    let only_fill_required = state.solver_settings.only_fill_required;
    let sense = if only_fill_required { Sense::Eq } else { Sense::Le };
    instances
        .iter()
        .enumerate()
        .filter_map(|(instance_idx, inst)| {
            let terms: Vec<(usize, f64)> = var_index
                .iter()
                .filter(|((i, _), _)| *i == instance_idx)
                .map(|(_, &v)| (v, 1.0))
                .collect();
            if terms.is_empty() {
                return None;
            }
            let rhs = if only_fill_required {
                remaining_capacity[instance_idx] as f64
            } else {
                let pinned = pinned_count_for_instance(state, inst);
                eligibility.pairs[instance_idx].len().saturating_sub(pinned as usize) as f64
            };
            Some(Constraint {
                label: format!("coverage[{}@{}]", inst.row_id, inst.date),
                terms,
                sense,
                rhs,
            })
        })
        .collect()
}

/// H3/H4: no two decision variables may seat the same clinician in
/// overlapping windows on a day; when `allowMultipleShiftsPerDay` is off,
/// at most one shift total is allowed that day (and none at all if a
/// manual pin already occupies it).
fn same_day_constraints(
    state: &StateSnapshot,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
    var_index: &HashMap<(usize, usize), usize>,
    vars: &[AssignmentVar],
) -> Vec<Constraint> {
    let mut by_clinician_day: HashMap<(usize, NaiveDate), Vec<usize>> = HashMap::new();
    for (&(instance_idx, clinician_idx), &var) in var_index {
        let date = instances[instance_idx].date;
        by_clinician_day.entry((clinician_idx, date)).or_default().push(var);
    }

    let mut constraints = Vec::new();
    for ((clinician_idx, date), vars_today) in by_clinician_day {
        let clinician = &clinicians[clinician_idx];
        let already_pinned_that_day = state
            .assignments
            .iter()
            .any(|a| a.manual && a.clinician_id == clinician.id && a.date == date);

        if !state.solver_settings.allow_multiple_shifts_per_day {
            let rhs = if already_pinned_that_day { 0.0 } else { 1.0 };
            constraints.push(Constraint {
                label: format!("one-shift-per-day[{},{}]", clinician.id, date),
                terms: vars_today.iter().map(|&v| (v, 1.0)).collect(),
                sense: Sense::Le,
                rhs,
            });
            continue;
        }

        // Multiple shifts allowed: still forbid overlapping windows.
        for i in 0..vars_today.len() {
            for j in (i + 1)..vars_today.len() {
                let inst_a = &instances[vars[vars_today[i]].instance_idx];
                let inst_b = &instances[vars[vars_today[j]].instance_idx];
                if inst_a.interval.overlaps(&inst_b.interval) {
                    constraints.push(Constraint::at_most_one(
                        format!("no-overlap[{},{}]", clinician.id, date),
                        &[vars_today[i], vars_today[j]],
                    ));
                }
            }
        }
    }
    constraints
}

/// H5: `enforceSameLocationPerDay` — every shift a clinician works on a
/// given day must share one location, via indicator variables.
fn add_same_location_constraints(instances: &[SlotInstance], model: &mut Model) {
    let mut indicator_index: HashMap<(usize, NaiveDate, String), usize> = HashMap::new();
    let mut new_constraints = Vec::new();

    for (&(instance_idx, clinician_idx), &var) in model.var_index.clone().iter() {
        let inst = &instances[instance_idx];
        let key = (clinician_idx, inst.date, inst.location_id.clone());
        let indicator_idx = *indicator_index.entry(key.clone()).or_insert_with(|| {
            let idx = model.location_vars.len();
            model.location_vars.push(LocationIndicatorVar {
                clinician_idx,
                date: inst.date,
                location_id: inst.location_id.clone(),
            });
            idx
        });
        let indicator_var = model.location_var_index(indicator_idx);
        // x[var] <= y[indicator]  =>  x - y <= 0
        new_constraints.push(Constraint {
            label: format!("same-location-link[{},{},{}]", clinician_idx, inst.date, inst.location_id),
            terms: vec![(var, 1.0), (indicator_var, -1.0)],
            sense: Sense::Le,
            rhs: 0.0,
        });
    }

    let mut by_clinician_day: HashMap<(usize, NaiveDate), Vec<usize>> = HashMap::new();
    for (idx, indicator) in model.location_vars.iter().enumerate() {
        by_clinician_day
            .entry((indicator.clinician_idx, indicator.date))
            .or_default()
            .push(model.location_var_index(idx));
    }
    for (key, indicators) in by_clinician_day {
        new_constraints.push(Constraint {
            label: format!("same-location-exclusive[{},{}]", key.0, key.1),
            terms: indicators.iter().map(|&v| (v, 1.0)).collect(),
            sense: Sense::Le,
            rhs: 1.0,
        });
    }

    model.constraints.extend(new_constraints);
}
