//! Top-level planning entry point.
//!
//! Runs the pipeline sequentially and synchronously: resolve home distances
//! (when an address is set), build the decision model, solve it, extract the
//! per-day tours. Each call owns its model; the catalog is only read.

use crate::backend::{SolveOptions, solve_model};
use crate::catalog::{Catalog, HomeDistanceResolver};
use crate::error::{PlanError, Result};
use crate::model::{PlanParams, build_model};
use crate::tour::{TourPlan, extract_tours};

/// Plans a multi-day tour.
///
/// `home_resolver` is only consulted when `params.home_address` is set; an
/// unresolvable address fails here, before any model is built. All failure
/// modes propagate to the caller unretried; relaxing parameters and trying
/// again is the caller's decision.
pub fn plan(
    catalog: &Catalog,
    params: &PlanParams,
    options: &SolveOptions,
    home_resolver: Option<&dyn HomeDistanceResolver>,
) -> Result<TourPlan> {
    let home = match &params.home_address {
        Some(address) => {
            let resolver = home_resolver.ok_or_else(|| {
                PlanError::InvalidParameter(
                    "a home address was given but no home distance resolver".into(),
                )
            })?;
            Some(catalog.home_distances(address, resolver)?)
        }
        None => None,
    };

    let model = build_model(catalog, params, home.as_deref())?;
    let solved = solve_model(model, options)?;
    let days = extract_tours(&solved)?;

    let plan = TourPlan {
        days,
        total_distance: solved.objective(),
        status: solved.status(),
    };
    tracing::info!(
        days = plan.days.len(),
        stamps = plan.visited_stamp_count(),
        total_distance = plan.total_distance,
        "planned tour"
    );
    Ok(plan)
}
