//! Benchmark for the model-build + solve pipeline on generated data.
//!
//! Run with: cargo run --release --bin bench

use radschedule_core::backend::default_backend;
use radschedule_core::calendar::expand_slots;
use radschedule_core::eligibility::EligibilityMatrix;
use radschedule_core::{demo_data, model, objective, state};
use std::time::{Duration, Instant};

fn main() {
    let raw = demo_data::generate(demo_data::DemoData::Large);
    let (snapshot, warnings) = state::normalize(raw);
    for warning in &warnings {
        eprintln!("normalization warning: {}", warning);
    }

    let start = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    let end = start + chrono::Duration::days(27);

    println!("Benchmark: model build + solve");
    println!("  Clinicians: {}", snapshot.clinicians.len());
    println!("  Date range: {} .. {}", start, end);
    println!();

    let expand_start = Instant::now();
    let instances = expand_slots(&snapshot, start, end);
    println!("Slot expansion: {} instances ({:?})", instances.len(), expand_start.elapsed());

    let eligibility_start = Instant::now();
    let eligibility = EligibilityMatrix::build(&snapshot, &instances, &snapshot.clinicians);
    println!("Eligibility resolution: {:?}", eligibility_start.elapsed());

    let model_start = Instant::now();
    let built_model = model::build(&snapshot, &instances, &snapshot.clinicians, &eligibility);
    println!("Model build: {} vars ({:?})", built_model.total_vars(), model_start.elapsed());

    let problem = objective::build_problem(&snapshot, &instances, &snapshot.clinicians, &built_model, start, end);

    let backend = default_backend();
    let solve_start = Instant::now();
    let mut incumbents = 0u32;
    let solution = backend.solve(&problem, Duration::from_secs(10), &mut |_| incumbents += 1);
    println!(
        "Solve: status {:?}, objective {}, {} incumbent update(s) ({:?})",
        solution.status,
        solution.objective,
        incumbents,
        solve_start.elapsed()
    );
}
