//! Solver adapter.
//!
//! Dispatches an assembled [`TourModel`](crate::model::TourModel) to a MILP
//! backend selected by name from a registry of compiled-in implementations,
//! falling back to the bundled default (HiGHS). The adapter performs no
//! retries; a failed solve is reported once, verbatim, to the caller.

use std::collections::BTreeMap;
use std::time::Instant;

use good_lp::solvers::SolutionStatus;
use good_lp::{ResolutionError, Solution, SolverModel, WithTimeLimit};

use crate::catalog::{Location, NodeId};
use crate::error::{PlanError, Result};
use crate::model::{ModelArc, TourModel};

/// A compiled-in solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Highs,
    #[cfg(feature = "cbc")]
    Cbc,
}

impl Backend {
    /// The bundled default backend, always available.
    pub const DEFAULT: Backend = Backend::Highs;

    /// Looks up a backend by name, case-insensitively.
    pub fn lookup(name: &str) -> Option<Backend> {
        match name.to_ascii_lowercase().as_str() {
            "highs" => Some(Backend::Highs),
            #[cfg(feature = "cbc")]
            "cbc" | "coin_cbc" => Some(Backend::Cbc),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Highs => "highs",
            #[cfg(feature = "cbc")]
            Backend::Cbc => "cbc",
        }
    }
}

/// Options for one solve call.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Preferred backend name; unknown names fall back to the default.
    pub backend: Option<String>,
    /// Wall-clock limit handed to the backend. On expiry the backend's
    /// best-known solution is surfaced as [`SolveStatus::BestEffort`].
    pub time_limit_secs: Option<f64>,
}

/// Whether a solution was proven optimal or is the best found within a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SolveStatus {
    Optimal,
    BestEffort,
}

/// One arc readback: the solved flow of a `y` variable.
#[derive(Debug, Clone)]
pub(crate) struct SolvedArc {
    pub(crate) day: usize,
    pub(crate) from: NodeId,
    pub(crate) to: NodeId,
    pub(crate) flow: f64,
}

/// Plain numeric readback of a solved model, decoupled from the backend so
/// tour extraction stays a pure function over values.
#[derive(Debug, Clone)]
pub struct SolvedModel {
    pub(crate) days: usize,
    pub(crate) status: SolveStatus,
    pub(crate) objective: f64,
    pub(crate) visits: BTreeMap<(usize, NodeId), f64>,
    pub(crate) arc_flows: Vec<SolvedArc>,
    pub(crate) daily_distances: Vec<f64>,
    pub(crate) nodes: BTreeMap<NodeId, Location>,
}

impl SolvedModel {
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Objective value: total distance over all days, in meters.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn daily_distance(&self, day: usize) -> Option<f64> {
        self.daily_distances.get(day).copied()
    }

    pub fn visit_value(&self, day: usize, id: &NodeId) -> Option<f64> {
        self.visits.get(&(day, id.clone())).copied()
    }
}

fn map_resolution_error(err: ResolutionError) -> PlanError {
    match err {
        ResolutionError::Infeasible => PlanError::Infeasible,
        other => PlanError::SolverFailure(other.to_string()),
    }
}

fn select_backend(preferred: Option<&str>) -> Backend {
    let Some(name) = preferred else {
        return Backend::DEFAULT;
    };
    match Backend::lookup(name) {
        Some(backend) => backend,
        None => {
            tracing::warn!(
                requested = name,
                fallback = Backend::DEFAULT.name(),
                "requested solver backend not available, falling back"
            );
            Backend::DEFAULT
        }
    }
}

/// Solves the model with the preferred backend, or the bundled default.
///
/// Fails with [`PlanError::Infeasible`] when the constraint set has no
/// satisfying assignment and [`PlanError::SolverFailure`] on any other
/// abnormal termination.
pub fn solve_model(model: TourModel, options: &SolveOptions) -> Result<SolvedModel> {
    let backend = select_backend(options.backend.as_deref());
    tracing::info!(
        backend = backend.name(),
        variables = model.variable_count,
        constraints = model.constraints.len(),
        days = model.days,
        "starting solve"
    );

    let TourModel {
        vars,
        objective,
        constraints,
        days,
        visits,
        arcs,
        daily,
        nodes,
        ..
    } = model;

    let started = Instant::now();
    let solved = match backend {
        Backend::Highs => {
            let mut problem = vars.minimise(objective).using(good_lp::highs);
            if let Some(secs) = options.time_limit_secs {
                problem = problem.with_time_limit(secs);
            }
            for constraint in constraints {
                problem = problem.with(constraint);
            }
            let solution = problem.solve().map_err(map_resolution_error)?;
            read_back(&solution, days, visits, &arcs, &daily, nodes)
        }
        #[cfg(feature = "cbc")]
        Backend::Cbc => {
            let mut problem = vars.minimise(objective).using(good_lp::coin_cbc);
            if let Some(secs) = options.time_limit_secs {
                problem = problem.with_time_limit(secs);
            }
            for constraint in constraints {
                problem = problem.with(constraint);
            }
            let solution = problem.solve().map_err(map_resolution_error)?;
            read_back(&solution, days, visits, &arcs, &daily, nodes)
        }
    };

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(
        backend = backend.name(),
        status = ?solved.status,
        objective = solved.objective,
        elapsed_secs = elapsed,
        "solve finished"
    );
    Ok(solved)
}

/// Backends report limit and memory stops through the solution status; only a
/// proven optimum maps to [`SolveStatus::Optimal`].
fn solve_status(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        _ => SolveStatus::BestEffort,
    }
}

fn read_back<S: Solution>(
    solution: &S,
    days: usize,
    visits: BTreeMap<(usize, NodeId), good_lp::Variable>,
    arcs: &[ModelArc],
    daily: &[good_lp::Variable],
    nodes: BTreeMap<NodeId, Location>,
) -> SolvedModel {
    let visits = visits
        .into_iter()
        .map(|(key, var)| (key, solution.value(var)))
        .collect();
    let arc_flows = arcs
        .iter()
        .map(|arc| SolvedArc {
            day: arc.day,
            from: arc.from.clone(),
            to: arc.to.clone(),
            flow: solution.value(arc.var),
        })
        .collect();
    let daily_distances: Vec<f64> = daily.iter().map(|d| solution.value(*d)).collect();
    let objective = daily_distances.iter().sum();

    SolvedModel {
        days,
        status: solve_status(solution.status()),
        objective,
        visits,
        arc_flows,
        daily_distances,
        nodes,
    }
}
