//! Decision model construction.
//!
//! Builds the mixed-integer tour model from the catalog and the caller's
//! parameters: visit indicators per day and location, arc-usage indicators
//! over the distance table, Miller-Tucker-Zemlin rank variables for subtour
//! elimination, and one bounded daily-distance variable per day. The model is
//! owned by a single solve and never shared.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable};

use crate::catalog::{
    Catalog, HOME_END_ID, HOME_START_ID, Home, HomeDistances, Location, NodeId, StampPoint,
};
use crate::error::{PlanError, Result};

/// Caller-supplied planning parameters.
#[derive(Debug, Clone)]
pub struct PlanParams {
    /// Number of hiking days, at least 1.
    pub days: u32,
    /// Upper bound on the distance walked per day, in meters.
    pub max_daily_distance: f64,
    /// Minimum number of distinct stamp points across all days.
    pub min_stamps: u32,
    /// Home address; enables the synthetic home-start/home-end nodes.
    pub home_address: Option<String>,
    /// Maximum number of days starting from a bus stop.
    pub max_bus_days: u32,
    /// Maximum number of days starting from a parking lot.
    pub max_parking_days: u32,
    /// Stamp numbers excluded from the problem entirely; their variables and
    /// incident arcs are omitted, not zeroed.
    pub ignore_stamp_ids: BTreeSet<u32>,
}

impl Default for PlanParams {
    fn default() -> Self {
        Self {
            days: 1,
            max_daily_distance: 20_000.0,
            min_stamps: 0,
            home_address: None,
            max_bus_days: 0,
            max_parking_days: 0,
            ignore_stamp_ids: BTreeSet::new(),
        }
    }
}

/// One directed arc instantiated for one day of the model.
pub(crate) struct ModelArc {
    pub(crate) day: usize,
    pub(crate) from: NodeId,
    pub(crate) to: NodeId,
    pub(crate) distance: f64,
    pub(crate) var: Variable,
}

/// The assembled decision model: variables, constraints and objective, plus
/// the handles needed to read a solution back.
pub struct TourModel {
    pub(crate) vars: ProblemVariables,
    pub(crate) objective: Expression,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) days: usize,
    pub(crate) visits: BTreeMap<(usize, NodeId), Variable>,
    pub(crate) arcs: Vec<ModelArc>,
    pub(crate) daily: Vec<Variable>,
    pub(crate) nodes: BTreeMap<NodeId, Location>,
    pub(crate) variable_count: usize,
}

impl std::fmt::Debug for TourModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TourModel")
            .field("days", &self.days)
            .field("variable_count", &self.variable_count)
            .finish_non_exhaustive()
    }
}

impl TourModel {
    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn day_count(&self) -> usize {
        self.days
    }
}

struct ArcDef {
    from: NodeId,
    to: NodeId,
    distance: f64,
}

/// Builds the tour model.
///
/// `home` carries the resolved walking distances for `params.home_address`;
/// pass `None` when no home address is in play. Fails with
/// [`PlanError::InvalidParameter`] before any variable is created when the
/// parameters are out of range or the ignore set removes every stamp point
/// while a minimum is still required.
pub fn build_model(
    catalog: &Catalog,
    params: &PlanParams,
    home: Option<&HomeDistances>,
) -> Result<TourModel> {
    if params.days < 1 {
        return Err(PlanError::InvalidParameter("days must be at least 1".into()));
    }
    if !params.max_daily_distance.is_finite() || params.max_daily_distance < 0.0 {
        return Err(PlanError::InvalidParameter(format!(
            "max_daily_distance must be finite and nonnegative, got {}",
            params.max_daily_distance
        )));
    }

    let stamps: BTreeMap<&NodeId, &StampPoint> = catalog
        .stamp_points()
        .iter()
        .filter(|(_, s)| !params.ignore_stamp_ids.contains(&s.stamp_id))
        .collect();
    if stamps.is_empty() && params.min_stamps > 0 {
        return Err(PlanError::InvalidParameter(
            "ignore_stamp_ids removes every stamp point but min_stamps > 0".into(),
        ));
    }

    let days = params.days as usize;
    let stamp_count = stamps.len() as f64;

    let is_omitted = |id: &NodeId| -> bool {
        catalog.stamp_points().contains_key(id) && !stamps.contains_key(id)
    };

    // The arc set: the distance table restricted to non-ignored stamp points,
    // plus home-start -> stamp and stamp -> home-end arcs from the resolved
    // home distances.
    let mut arc_defs: Vec<ArcDef> = Vec::new();
    for (from, to, distance) in catalog.arcs() {
        if is_omitted(from) || is_omitted(to) {
            continue;
        }
        arc_defs.push(ArcDef {
            from: from.clone(),
            to: to.clone(),
            distance,
        });
    }

    let home_start = NodeId::new(HOME_START_ID);
    let home_end = NodeId::new(HOME_END_ID);
    if let Some(home) = home {
        for (stamp_id, distance) in &home.to_stamp {
            if !stamps.contains_key(stamp_id) {
                continue;
            }
            arc_defs.push(ArcDef {
                from: home_start.clone(),
                to: stamp_id.clone(),
                distance: *distance,
            });
            arc_defs.push(ArcDef {
                from: stamp_id.clone(),
                to: home_end.clone(),
                distance: *distance,
            });
        }
    }

    let mut nodes: BTreeMap<NodeId, Location> = BTreeMap::new();
    for (id, stamp) in &stamps {
        nodes.insert((*id).clone(), Location::Stamp((*stamp).clone()));
    }
    for (id, bus) in catalog.bus_stops() {
        nodes.insert(id.clone(), Location::Bus(bus.clone()));
    }
    for (id, lot) in catalog.parking_lots() {
        nodes.insert(id.clone(), Location::Parking(lot.clone()));
    }
    if let Some(home) = home {
        nodes.insert(
            home_start.clone(),
            Location::HomeStart(Home {
                id: home_start.clone(),
                latitude: home.latitude,
                longitude: home.longitude,
            }),
        );
        nodes.insert(
            home_end.clone(),
            Location::HomeEnd(Home {
                id: home_end.clone(),
                latitude: home.latitude,
                longitude: home.longitude,
            }),
        );
    }

    let mut vars = ProblemVariables::new();
    let mut visits: BTreeMap<(usize, NodeId), Variable> = BTreeMap::new();
    let mut ranks: BTreeMap<(usize, NodeId), Variable> = BTreeMap::new();
    let mut daily: Vec<Variable> = Vec::with_capacity(days);

    for day in 0..days {
        for id in stamps.keys() {
            visits.insert(
                (day, (*id).clone()),
                vars.add(variable().binary().name(format!("x_{day}_{id}"))),
            );
            ranks.insert(
                (day, (*id).clone()),
                vars.add(
                    variable()
                        .min(0.0)
                        .max(stamp_count)
                        .name(format!("z_{day}_{id}")),
                ),
            );
        }
        for id in catalog.bus_stops().keys() {
            visits.insert(
                (day, id.clone()),
                vars.add(variable().binary().name(format!("x_{day}_{id}"))),
            );
        }
        for id in catalog.parking_lots().keys() {
            visits.insert(
                (day, id.clone()),
                vars.add(variable().binary().name(format!("x_{day}_{id}"))),
            );
        }
        if home.is_some() {
            for id in [&home_start, &home_end] {
                visits.insert(
                    (day, id.clone()),
                    vars.add(variable().binary().name(format!("x_{day}_{id}"))),
                );
            }
        }
        // Bounded above by the cap, so an unsatisfiable cap surfaces as model
        // infeasibility instead of an unenforced objective term.
        daily.push(vars.add(
            variable()
                .min(0.0)
                .max(params.max_daily_distance)
                .name(format!("d_{day}")),
        ));
    }

    let mut arcs: Vec<ModelArc> = Vec::with_capacity(days * arc_defs.len());
    for day in 0..days {
        for def in &arc_defs {
            let var = vars.add(
                variable()
                    .binary()
                    .name(format!("y_{day}_{}_{}", def.from, def.to)),
            );
            arcs.push(ModelArc {
                day,
                from: def.from.clone(),
                to: def.to.clone(),
                distance: def.distance,
                var,
            });
        }
    }

    let mut constraints: Vec<Constraint> = Vec::new();

    for day in 0..days {
        let day_arcs = || arcs.iter().filter(move |a| a.day == day);

        // The daily distance variable equals the distance walked that day,
        // home arcs included. Equality, so its upper bound doubles as the cap.
        let walked = day_arcs().fold(Expression::from(0.0), |acc, a| acc + a.distance * a.var);
        constraints.push(constraint!(walked == daily[day]));

        // Exactly one starting node per day: a bus stop, a parking lot, or
        // home-start.
        let origin_ids = catalog
            .bus_stops()
            .keys()
            .chain(catalog.parking_lots().keys())
            .cloned()
            .chain(home.is_some().then(|| home_start.clone()));
        let origin = origin_ids.fold(Expression::from(0.0), |acc, id| acc + visits[&(day, id)]);
        constraints.push(constraint!(origin == 1.0));

        // A day ends at home exactly when it starts there.
        if home.is_some() {
            let start = visits[&(day, home_start.clone())];
            let end = visits[&(day, home_end.clone())];
            constraints.push(constraint!(start - end == 0.0));
        }

        // Flow conservation: chosen outgoing arcs of a node equal its visit
        // indicator, likewise incoming. Home-start only ever appears as an
        // arc tail and home-end only as an arc head.
        let mut out_by_node: BTreeMap<NodeId, Vec<Variable>> = BTreeMap::new();
        let mut in_by_node: BTreeMap<NodeId, Vec<Variable>> = BTreeMap::new();
        for arc in day_arcs() {
            out_by_node.entry(arc.from.clone()).or_default().push(arc.var);
            in_by_node.entry(arc.to.clone()).or_default().push(arc.var);
        }
        for (node, outgoing) in out_by_node {
            let sum = outgoing
                .iter()
                .fold(Expression::from(0.0), |acc, v| acc + *v);
            constraints.push(constraint!(sum == visits[&(day, node)]));
        }
        for (node, incoming) in in_by_node {
            let sum = incoming
                .iter()
                .fold(Expression::from(0.0), |acc, v| acc + *v);
            constraints.push(constraint!(sum == visits[&(day, node)]));
        }

        // Miller-Tucker-Zemlin rank inequalities over stamp-to-stamp arcs:
        // no cycle confined to stamp points can select all of its arcs.
        for arc in day_arcs() {
            let (Some(rank_from), Some(rank_to)) = (
                ranks.get(&(day, arc.from.clone())),
                ranks.get(&(day, arc.to.clone())),
            ) else {
                continue;
            };
            constraints.push(constraint!(
                *rank_from - *rank_to + stamp_count * arc.var <= stamp_count - 1.0
            ));
        }
    }

    // Each stamp point is visited on at most one day.
    for id in stamps.keys() {
        let across_days = (0..days).fold(Expression::from(0.0), |acc, day| {
            acc + visits[&(day, (*id).clone())]
        });
        constraints.push(constraint!(across_days <= 1.0));
    }

    // Visit at least min_stamps stamp points in total.
    let coverage = stamps.keys().fold(Expression::from(0.0), |acc, id| {
        (0..days).fold(acc, |acc, day| acc + visits[&(day, (*id).clone())])
    });
    constraints.push(constraint!(coverage >= params.min_stamps as f64));

    // Budgets on days starting from a bus stop or a parking lot.
    let bus_days = catalog
        .bus_stops()
        .keys()
        .fold(Expression::from(0.0), |acc, id| {
            (0..days).fold(acc, |acc, day| acc + visits[&(day, id.clone())])
        });
    constraints.push(constraint!(bus_days <= params.max_bus_days as f64));
    let parking_days = catalog
        .parking_lots()
        .keys()
        .fold(Expression::from(0.0), |acc, id| {
            (0..days).fold(acc, |acc, day| acc + visits[&(day, id.clone())])
        });
    constraints.push(constraint!(parking_days <= params.max_parking_days as f64));

    // Minimize the total distance walked.
    let objective = daily
        .iter()
        .fold(Expression::from(0.0), |acc, d| acc + *d);

    let variable_count = visits.len() + ranks.len() + arcs.len() + daily.len();
    tracing::debug!(
        days,
        stamp_points = stamps.len(),
        variables = variable_count,
        constraints = constraints.len(),
        "built tour model"
    );

    Ok(TourModel {
        vars,
        objective,
        constraints,
        days,
        visits,
        arcs,
        daily,
        nodes,
        variable_count,
    })
}
