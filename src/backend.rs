//! Solver backend abstraction (§4.F): the Solver Driver talks to this trait,
//! never to a specific MIP library, so swapping `coin_cbc` for `highs` is a
//! feature-flag decision rather than a rewrite.

use crate::model::{Sense, SolverProblem, VarKind};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct BackendSolution {
    pub status: SolveStatus,
    /// One value per variable index, `problem.var_kinds.len()` long.
    pub values: Vec<f64>,
    pub objective: f64,
}

pub trait Backend: Send + Sync {
    /// Solves `problem` within `time_budget`. `on_incumbent` receives the
    /// best objective value found so far, for `solver.rs` to forward as an
    /// `IncumbentEvent`; backends without native incumbent callbacks may
    /// call it once with the final result.
    fn solve(
        &self,
        problem: &SolverProblem,
        time_budget: Duration,
        on_incumbent: &mut dyn FnMut(f64),
    ) -> BackendSolution;
}

fn objective_value(objective: &[f64], values: &[f64]) -> f64 {
    objective.iter().zip(values.iter()).map(|(c, v)| c * v).sum()
}

#[cfg(feature = "coin_cbc")]
pub struct CbcBackend;

#[cfg(feature = "coin_cbc")]
impl Backend for CbcBackend {
    fn solve(
        &self,
        problem: &SolverProblem,
        time_budget: Duration,
        on_incumbent: &mut dyn FnMut(f64),
    ) -> BackendSolution {
        use coin_cbc::{Col, Model as CbcModel, Sense as CbcSense};

        let mut cbc = CbcModel::default();
        let cols: Vec<Col> = problem
            .var_kinds
            .iter()
            .map(|kind| match kind {
                VarKind::Binary => cbc.add_binary(),
                VarKind::ContinuousNonNegative => {
                    let col = cbc.add_col();
                    cbc.set_col_lower(col, 0.0);
                    col
                }
            })
            .collect();

        for (idx, &coeff) in problem.objective.iter().enumerate() {
            if coeff != 0.0 {
                cbc.set_obj_coeff(cols[idx], coeff);
            }
        }
        cbc.set_obj_sense(CbcSense::Minimize);

        for constraint in &problem.constraints {
            let row = cbc.add_row();
            for &(var, coeff) in &constraint.terms {
                cbc.set_weight(row, cols[var], coeff);
            }
            match constraint.sense {
                Sense::Eq => {
                    cbc.set_row_lower(row, constraint.rhs);
                    cbc.set_row_upper(row, constraint.rhs);
                }
                Sense::Le => cbc.set_row_upper(row, constraint.rhs),
            }
        }

        cbc.set_parameter("seconds", &time_budget.as_secs_f64().to_string());
        cbc.set_parameter("threads", "1");
        cbc.set_parameter("logLevel", "0");

        let solution = cbc.solve();
        let status = map_cbc_status(solution.raw().status());
        let values: Vec<f64> = cols.iter().map(|&c| solution.col(c)).collect();
        let objective = objective_value(&problem.objective, &values);
        on_incumbent(objective);
        BackendSolution { status, values, objective }
    }
}

#[cfg(feature = "coin_cbc")]
fn map_cbc_status(status: coin_cbc::raw::Status) -> SolveStatus {
    use coin_cbc::raw::Status;
    match status {
        Status::Finished => SolveStatus::Optimal,
        Status::Stopped => SolveStatus::Feasible,
        Status::Abandoned => SolveStatus::Unknown,
        Status::UserEvent => SolveStatus::Feasible,
        _ => SolveStatus::Unknown,
    }
}

#[cfg(feature = "highs")]
pub struct HighsBackend;

#[cfg(feature = "highs")]
impl Backend for HighsBackend {
    fn solve(
        &self,
        problem: &SolverProblem,
        time_budget: Duration,
        on_incumbent: &mut dyn FnMut(f64),
    ) -> BackendSolution {
        use highs::{HighsModelStatus, RowProblem, Sense as HighsSense};

        let mut pb = RowProblem::default();
        let cols: Vec<_> = problem
            .var_kinds
            .iter()
            .zip(problem.objective.iter())
            .map(|(kind, &coeff)| match kind {
                VarKind::Binary => pb.add_integer_column(coeff, 0.0..=1.0),
                VarKind::ContinuousNonNegative => pb.add_column(coeff, 0.0..=f64::INFINITY),
            })
            .collect();

        for constraint in &problem.constraints {
            let bounds = match constraint.sense {
                Sense::Eq => constraint.rhs..=constraint.rhs,
                Sense::Le => f64::NEG_INFINITY..=constraint.rhs,
            };
            let row: Vec<_> = constraint
                .terms
                .iter()
                .map(|&(var, coeff)| (cols[var], coeff))
                .collect();
            pb.add_row(bounds, row);
        }

        let mut solved = pb.optimise(HighsSense::Minimise);
        solved.set_option("time_limit", time_budget.as_secs_f64());
        solved.set_option("output_flag", false);
        let solved = solved.solve();

        let status = match solved.status() {
            HighsModelStatus::Optimal => SolveStatus::Optimal,
            HighsModelStatus::TimeLimit | HighsModelStatus::IterationLimit => SolveStatus::Feasible,
            HighsModelStatus::Infeasible => SolveStatus::Infeasible,
            _ => SolveStatus::Unknown,
        };
        let values = solved.get_solution().columns().to_vec();
        let objective = objective_value(&problem.objective, &values);
        on_incumbent(objective);
        BackendSolution { status, values, objective }
    }
}

/// Picks the compiled-in default backend, preferring CBC
/// (`default = ["coin_cbc"]`).
pub fn default_backend() -> Box<dyn Backend> {
    #[cfg(feature = "coin_cbc")]
    {
        return Box::new(CbcBackend);
    }
    #[cfg(all(not(feature = "coin_cbc"), feature = "highs"))]
    {
        return Box::new(HighsBackend);
    }
    #[cfg(not(any(feature = "coin_cbc", feature = "highs")))]
    {
        compile_error!("at least one of the `coin_cbc` or `highs` features must be enabled");
    }
}
