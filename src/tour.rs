//! Tour extraction.
//!
//! Converts the solved arc-selection variables of each day into an ordered
//! sequence of locations. Extraction is a pure function over the immutable
//! solved values: it builds a successor map from every arc whose flow rounds
//! to one, finds the day's unique non-stamp start node, and walks successors
//! until the map is exhausted (home-end) or the walk closes back at the
//! start (bus stop or parking lot loop).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::backend::{SolveStatus, SolvedModel};
use crate::catalog::{Location, NodeId, StampPoint};
use crate::error::{PlanError, Result};

/// Rounding threshold for binary arc variables, matching the relaxation
/// tolerance of the backends.
const ARC_SELECTED_THRESHOLD: f64 = 0.5;

/// The ordered tour of one day. Empty when the day has no selected arcs.
#[derive(Debug, Clone, Serialize)]
pub struct DayTour {
    pub stops: Vec<Location>,
    /// Distance walked that day in meters, from the solved model.
    pub distance: f64,
}

impl DayTour {
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// The day's start node, a non-stamp location.
    pub fn origin(&self) -> Option<&Location> {
        self.stops.first()
    }

    /// Stamp points visited on this day, in walking order.
    pub fn stamp_points(&self) -> impl Iterator<Item = &StampPoint> {
        self.stops.iter().filter_map(Location::as_stamp_point)
    }
}

/// A complete multi-day plan.
#[derive(Debug, Clone, Serialize)]
pub struct TourPlan {
    pub days: Vec<DayTour>,
    /// Objective value: total distance over all days, in meters.
    pub total_distance: f64,
    pub status: SolveStatus,
}

impl TourPlan {
    /// Number of distinct stamp points visited across all days.
    pub fn visited_stamp_count(&self) -> usize {
        self.days
            .iter()
            .flat_map(|day| day.stamp_points())
            .map(|s| &s.id)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Reconstructs one ordered tour per day from the solved model.
///
/// Fails with [`PlanError::NoStartNode`] when a day has selected arcs but no
/// unique non-stamp start, and [`PlanError::InconsistentTour`] when a walk
/// revisits a node or a stamp point shows up on two days. Both signal a
/// builder defect or a malformed solved model and are fatal.
pub fn extract_tours(solved: &SolvedModel) -> Result<Vec<DayTour>> {
    let mut tours = Vec::with_capacity(solved.days);
    let mut stamps_seen: BTreeSet<&NodeId> = BTreeSet::new();

    for day in 0..solved.days {
        let mut successors: BTreeMap<&NodeId, &NodeId> = BTreeMap::new();
        for arc in solved.arc_flows.iter().filter(|a| a.day == day) {
            if arc.flow <= ARC_SELECTED_THRESHOLD {
                continue;
            }
            if successors.insert(&arc.from, &arc.to).is_some() {
                // Two outgoing arcs from one node on the same day.
                return Err(PlanError::InconsistentTour {
                    day,
                    node: arc.from.clone(),
                });
            }
        }

        if successors.is_empty() {
            tours.push(DayTour {
                stops: Vec::new(),
                distance: solved.daily_distances.get(day).copied().unwrap_or(0.0),
            });
            continue;
        }

        let stops = walk_day(day, &successors, &solved.nodes, &mut stamps_seen)?;
        tours.push(DayTour {
            stops,
            distance: solved.daily_distances.get(day).copied().unwrap_or(0.0),
        });
    }

    Ok(tours)
}

fn walk_day<'a>(
    day: usize,
    successors: &BTreeMap<&'a NodeId, &'a NodeId>,
    nodes: &BTreeMap<NodeId, Location>,
    stamps_seen: &mut BTreeSet<&'a NodeId>,
) -> Result<Vec<Location>> {
    let is_stamp = |id: &NodeId| {
        nodes
            .get(id)
            .map(Location::is_stamp_point)
            .unwrap_or(false)
    };

    // The start is the unique successor-map key that is not a stamp point:
    // home-start, a bus stop, or a parking lot.
    let mut starts = successors.keys().filter(|id| !is_stamp(id));
    let start = match (starts.next(), starts.next()) {
        (Some(start), None) => *start,
        _ => return Err(PlanError::NoStartNode { day }),
    };

    let location = |id: &NodeId| -> Result<Location> {
        nodes
            .get(id)
            .cloned()
            .ok_or_else(|| PlanError::InconsistentTour {
                day,
                node: id.clone(),
            })
    };

    let mut stops = vec![location(start)?];
    let mut visited: BTreeSet<&NodeId> = BTreeSet::from([start]);
    let mut current = start;

    while let Some(&next) = successors.get(current) {
        if next == start {
            // Closed loop back to the bus stop or parking lot.
            stops.push(location(next)?);
            break;
        }
        if !visited.insert(next) {
            return Err(PlanError::InconsistentTour {
                day,
                node: next.clone(),
            });
        }
        if is_stamp(next) && !stamps_seen.insert(next) {
            return Err(PlanError::InconsistentTour {
                day,
                node: next.clone(),
            });
        }
        stops.push(location(next)?);
        current = next;
    }

    Ok(stops)
}
