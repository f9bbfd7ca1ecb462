//! Assignment Extractor (§4.G): turns a solved decision vector back into
//! `Assignment` records.

use crate::calendar::SlotInstance;
use crate::domain::{Assignment, Clinician};
use crate::model::Model;
use crate::state::StateSnapshot;
use std::collections::HashSet;

/// Converts `solution_values` (indexed the same way as `model.vars`) into
/// the final assignment list: manual pins untouched, solved assignments
/// appended with canonical IDs, ordered `(dateISO, rowId, clinicianId)`,
/// deduplicated on that same key.
pub fn extract(
    state: &StateSnapshot,
    instances: &[SlotInstance],
    clinicians: &[Clinician],
    model: &Model,
    solution_values: &[f64],
) -> Vec<Assignment> {
    let mut out: Vec<Assignment> = state.assignments.clone();
    let mut seen: HashSet<(crate::domain::RuntimeRowId, chrono::NaiveDate, String)> = out
        .iter()
        .map(|a| (a.row_id.clone(), a.date, a.clinician_id.clone()))
        .collect();

    for (var_idx, var) in model.vars.iter().enumerate() {
        if solution_values.get(var_idx).copied().unwrap_or(0.0) < 0.5 {
            continue;
        }
        let instance = &instances[var.instance_idx];
        let clinician = &clinicians[var.clinician_idx];
        let key = (instance.row_id.clone(), instance.date, clinician.id.clone());
        if !seen.insert(key) {
            continue;
        }
        let seq = out
            .iter()
            .filter(|a| a.row_id == instance.row_id && a.date == instance.date)
            .count() as u32;
        out.push(Assignment {
            id: Assignment::canonical_id(&instance.row_id, instance.date, &clinician.id, seq),
            clinician_id: clinician.id.clone(),
            row_id: instance.row_id.clone(),
            date: instance.date,
            manual: false,
        });
    }

    out.sort_by(|a, b| (a.date, &a.row_id, &a.clinician_id).cmp(&(b.date, &b.row_id, &b.clinician_id)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::expand_slots;
    use crate::domain::{DayType, Location, RuntimeRowId as RowId, Section, SectionKind, SubShift, TemplateSlot};
    use crate::eligibility::EligibilityMatrix;
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
    fn extracts_chosen_variable_as_assignment() {
        let (state, _) = crate::state::normalize(raw());
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let instances = expand_slots(&state, mon, mon);
        let eligibility = EligibilityMatrix::build(&state, &instances, &state.clinicians);
        let model = crate::model::build(&state, &instances, &state.clinicians, &eligibility);
        let values = vec![1.0; model.total_vars()];
        let assignments = extract(&state, &instances, &state.clinicians, &model, &values);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].clinician_id, "c1");
        assert_eq!(assignments[0].row_id, RowId::new("MRI", "s1"));
        assert!(!assignments[0].manual);
    }

    #[test]
    fn manual_assignments_pass_through_untouched() {
        let mut raw = raw();
        let mon = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        raw.assignments.push(Assignment {
            id: "manual-1".into(),
            clinician_id: "c1".into(),
            row_id: RowId::new("MRI", "s1"),
            date: mon,
            manual: true,
        });
        let (state, _) = crate::state::normalize(raw);
        let instances = expand_slots(&state, mon, mon);
        let eligibility = EligibilityMatrix::build(&state, &instances, &state.clinicians);
        let model = crate::model::build(&state, &instances, &state.clinicians, &eligibility);
        let values = vec![0.0; model.total_vars()];
        let assignments = extract(&state, &instances, &state.clinicians, &model, &values);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].id, "manual-1");
        assert!(assignments[0].manual);
    }
}
