//! Synthetic radiology-roster generators, for tests and the solve-loop
//! benchmark.

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

use crate::domain::{Clinician, DayType, Location, Section, SectionKind, SubShift, TemplateSlot};
use crate::state::{LocationTemplate, RawStateSnapshot, SolverSettings, WeeklyTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoData {
    Small,
    Large,
}

/// Single source of truth for the name <-> variant mapping, so `FromStr`,
/// `as_str`, and `list_demo_data` can't drift out of sync with each other.
const DEMO_DATA_NAMES: [(&str, DemoData); 2] = [("SMALL", DemoData::Small), ("LARGE", DemoData::Large)];

impl std::str::FromStr for DemoData {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        DEMO_DATA_NAMES.iter().find(|(name, _)| *name == upper).map(|&(_, demo)| demo).ok_or(())
    }
}

impl DemoData {
    pub fn as_str(&self) -> &'static str {
        DEMO_DATA_NAMES.iter().find(|(_, demo)| demo == self).map(|&(name, _)| name).expect("exhaustive table")
    }

    fn parameters(&self) -> DemoDataParameters {
        match self {
            DemoData::Small => DemoDataParameters {
                locations: vec!["Main Imaging", "Outpatient Annex"],
                section_names: vec!["MRI", "CT", "XRAY"],
                clinician_count: 10,
                days_in_schedule: 14,
                qualification_count_distribution: vec![(1, 2.0), (2, 3.0), (3, 1.0)],
                vacation_count_distribution: vec![(0, 6.0), (1, 3.0), (2, 1.0)],
            },
            DemoData::Large => DemoDataParameters {
                locations: vec!["Main Imaging", "Outpatient Annex", "North Campus", "Night Clinic"],
                section_names: vec!["MRI", "CT", "XRAY", "ULTRASOUND", "ONCALL"],
                clinician_count: 30,
                days_in_schedule: 28,
                qualification_count_distribution: vec![(2, 3.0), (3, 2.0), (4, 1.0)],
                vacation_count_distribution: vec![(0, 5.0), (1, 3.0), (2, 2.0)],
            },
        }
    }
}

struct DemoDataParameters {
    locations: Vec<&'static str>,
    section_names: Vec<&'static str>,
    clinician_count: usize,
    days_in_schedule: i64,
    qualification_count_distribution: Vec<(usize, f64)>,
    vacation_count_distribution: Vec<(usize, f64)>,
}

/// List of available demo data sets.
pub fn list_demo_data() -> Vec<&'static str> {
    DEMO_DATA_NAMES.iter().map(|&(name, _)| name).collect()
}

/// Generates a deterministic synthetic roster and weekly template.
pub fn generate(demo: DemoData) -> RawStateSnapshot {
    let params = demo.parameters();
    let mut rng = StdRng::seed_from_u64(0);

    let start_date = find_next_monday(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

    let locations: Vec<Location> = params
        .locations
        .iter()
        .enumerate()
        .map(|(i, name)| Location { id: format!("loc-{}", i), name: name.to_string() })
        .collect();

    let sections: Vec<Section> = params
        .section_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let location = &locations[i % locations.len()];
            let subshift_count = if *name == "ONCALL" { 1 } else { rng.gen_range(1..=2) };
            let subshifts = (1..=subshift_count)
                .map(|ord| SubShift::new(format!("s{}", ord), ord as u8, subshift_name(ord)))
                .collect();
            Section {
                id: name.to_string(),
                name: name.to_string(),
                kind: SectionKind::Class,
                location_id: location.id.clone(),
                subshifts,
            }
        })
        .collect();

    let name_permutations = generate_name_permutations(&mut rng);
    let mut clinicians = Vec::new();
    for i in 0..params.clinician_count {
        let name = name_permutations[i % name_permutations.len()].clone();
        let qualification_count =
            pick_count(&mut rng, &params.qualification_count_distribution).min(sections.len());
        let qualified: Vec<String> = sections
            .choose_multiple(&mut rng, qualification_count.max(1))
            .map(|s| s.id.clone())
            .collect();

        let mut clinician = Clinician::new(format!("c{}", i), name).with_qualifications(qualified.clone());
        if let Some(preferred) = qualified.first() {
            clinician = clinician.with_preference_order([preferred.clone()]);
        }
        clinician = clinician.with_target_hours(if rng.gen_bool(0.7) { 40.0 } else { 20.0 });

        let vacation_count = pick_count(&mut rng, &params.vacation_count_distribution);
        for _ in 0..vacation_count {
            let offset = rng.gen_range(0..params.days_in_schedule.max(1));
            let vacation_start = start_date + Duration::days(offset);
            clinician = clinician.with_vacation(vacation_start, vacation_start + Duration::days(1));
        }

        clinicians.push(clinician);
    }

    let mut slots_by_location: HashMap<String, Vec<TemplateSlot>> = HashMap::new();
    for (row_idx, section) in sections.iter().enumerate() {
        for subshift in &section.subshifts {
            let (start_min, end_min) = subshift_hours(subshift.ordinal);
            for day_type in weekdays_for(section) {
                slots_by_location.entry(section.location_id.clone()).or_default().push(TemplateSlot {
                    location_id: section.location_id.clone(),
                    row_band: format!("row-{}", row_idx),
                    day_type,
                    class_id: section.id.clone(),
                    subshift_id: subshift.id.clone(),
                    required_count: 1,
                    start_min,
                    end_min,
                    end_day_offset: 0,
                });
            }
        }
    }

    let weekly_locations: Vec<LocationTemplate> = locations
        .iter()
        .map(|loc| LocationTemplate {
            location_id: loc.id.clone(),
            row_bands: sections
                .iter()
                .enumerate()
                .filter(|(_, s)| s.location_id == loc.id)
                .map(|(i, _)| format!("row-{}", i))
                .collect(),
            col_bands: vec![],
            slots: slots_by_location.remove(&loc.id).unwrap_or_default(),
        })
        .collect();

    RawStateSnapshot {
        locations,
        rows: sections.clone(),
        clinicians,
        assignments: vec![],
        min_slots_by_row_id: HashMap::new(),
        slot_overrides_by_key: HashMap::new(),
        weekly_template: WeeklyTemplate { version: 4, blocks: sections, locations: weekly_locations },
        holidays: vec![],
        solver_settings: SolverSettings::default(),
        solver_rules: Default::default(),
    }
}

fn subshift_name(ordinal: u8) -> &'static str {
    match ordinal {
        1 => "Morning",
        2 => "Afternoon",
        _ => "Evening",
    }
}

fn subshift_hours(ordinal: u8) -> (u32, u32) {
    match ordinal {
        1 => (8 * 60, 14 * 60),
        2 => (14 * 60, 20 * 60),
        _ => (20 * 60, 24 * 60),
    }
}

fn weekdays_for(section: &Section) -> Vec<DayType> {
    if section.id == "ONCALL" {
        vec![DayType::Sat, DayType::Sun]
    } else {
        vec![DayType::Mon, DayType::Tue, DayType::Wed, DayType::Thu, DayType::Fri]
    }
}

/// Rolls `date` forward to the Monday on or after it, via the day-of-week
/// distance rather than a per-weekday lookup table.
fn find_next_monday(date: NaiveDate) -> NaiveDate {
    let forward = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(forward as i64)
}

/// Rolls a weighted die over `distribution`, accumulating weight until the
/// roll falls under the running total.
fn pick_count(rng: &mut StdRng, distribution: &[(usize, f64)]) -> usize {
    let total: f64 = distribution.iter().map(|&(_, weight)| weight).sum();
    let roll = rng.gen::<f64>() * total;
    let mut running = 0.0;
    distribution
        .iter()
        .find(|&&(_, weight)| {
            running += weight;
            roll < running
        })
        .map(|&(count, _)| count)
        .unwrap_or_else(|| distribution.last().map(|&(c, _)| c).unwrap_or(1))
}

const FIRST_NAMES: &[&str] =
    &["Priya", "Mateo", "Noor", "Liam", "Sade", "Koji", "Farid", "Greta", "Oscar", "Wren"];
const LAST_NAMES: &[&str] =
    &["Abara", "Castellan", "Dubois", "Esposito", "Halvorsen", "Ikeda", "Marsh", "Novak", "Quill", "Tran"];

/// Every first/last pairing, shuffled into the order clinicians are assigned.
fn generate_name_permutations(rng: &mut StdRng) -> Vec<String> {
    let mut names: Vec<String> = FIRST_NAMES
        .iter()
        .flat_map(|first| LAST_NAMES.iter().map(move |last| format!("{} {}", first, last)))
        .collect();
    names.shuffle(rng);
    names
}
