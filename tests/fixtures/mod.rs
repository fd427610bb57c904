//! Test fixtures for hike-planner.
//!
//! A synthetic line of stamp points with uniform 1000 m spacing and a
//! complete walking-distance table: the distance between positions `a` and
//! `b` is `|a - b| * 1000` meters. A bus stop can sit at the first stamp
//! point, a parking lot at the last, and a home anywhere on the line.

use std::collections::BTreeMap;

use hike_planner::catalog::{
    ArcRecord, BusStop, Catalog, CatalogData, HOME_END_ID, HOME_START_ID, HomeDistanceResolver,
    HomeDistances, Location, NodeId, ParkingLot, StampPoint,
};
use hike_planner::error::{PlanError, Result};

pub const SPACING_M: f64 = 1000.0;

pub fn stamp_id_at(index: usize) -> u32 {
    index as u32 + 1
}

fn stamp(index: usize) -> StampPoint {
    StampPoint {
        id: NodeId::new(format!("s{index}")),
        latitude: 51.8 + index as f64 * 0.01,
        longitude: 10.6,
        stamp_id: stamp_id_at(index),
        name: format!("Stamp {}", stamp_id_at(index)),
    }
}

/// Builds the line catalog with `n` stamp points.
pub fn line_catalog(n: usize, with_bus: bool, with_parking: bool) -> Catalog {
    let mut arcs = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i != j {
                arcs.push(ArcRecord {
                    from: NodeId::new(format!("s{i}")),
                    to: NodeId::new(format!("s{j}")),
                    distance: (i as f64 - j as f64).abs() * SPACING_M,
                });
            }
        }
    }

    let mut bus_stops = Vec::new();
    if with_bus {
        // Co-located with the first stamp point.
        bus_stops.push(BusStop {
            id: NodeId::new("bus"),
            latitude: 51.8,
            longitude: 10.6,
        });
        for i in 0..n {
            let distance = i as f64 * SPACING_M;
            arcs.push(ArcRecord {
                from: NodeId::new("bus"),
                to: NodeId::new(format!("s{i}")),
                distance,
            });
            arcs.push(ArcRecord {
                from: NodeId::new(format!("s{i}")),
                to: NodeId::new("bus"),
                distance,
            });
        }
    }

    let mut parking_lots = Vec::new();
    if with_parking {
        // Co-located with the last stamp point.
        parking_lots.push(ParkingLot {
            id: NodeId::new("parking"),
            latitude: 51.8 + (n - 1) as f64 * 0.01,
            longitude: 10.6,
        });
        for i in 0..n {
            let distance = (n - 1 - i) as f64 * SPACING_M;
            arcs.push(ArcRecord {
                from: NodeId::new("parking"),
                to: NodeId::new(format!("s{i}")),
                distance,
            });
            arcs.push(ArcRecord {
                from: NodeId::new(format!("s{i}")),
                to: NodeId::new("parking"),
                distance,
            });
        }
    }

    Catalog::from_data(CatalogData {
        stamp_points: (0..n).map(stamp).collect(),
        bus_stops,
        parking_lots,
        arcs,
    })
    .expect("line fixture must be a valid catalog")
}

/// Resolver for a home sitting at `position` on the line.
pub struct LineHomeResolver {
    pub n: usize,
    pub position: f64,
}

impl HomeDistanceResolver for LineHomeResolver {
    fn resolve(&self, address: &str) -> Result<HomeDistances> {
        let to_stamp: BTreeMap<NodeId, f64> = (0..self.n)
            .map(|i| {
                (
                    NodeId::new(format!("s{i}")),
                    (i as f64 - self.position).abs() * SPACING_M,
                )
            })
            .collect();
        Ok(HomeDistances {
            address: address.to_string(),
            latitude: 51.8 + self.position * 0.01,
            longitude: 10.6,
            to_stamp,
        })
    }
}

/// Resolver for an address with no walkable node in range.
pub struct UnreachableHomeResolver;

impl HomeDistanceResolver for UnreachableHomeResolver {
    fn resolve(&self, address: &str) -> Result<HomeDistances> {
        Err(PlanError::AddressResolution {
            address: address.to_string(),
            reason: "no walkable node within the search radius".into(),
        })
    }
}

/// Position of a fixture location on the line, in stamp-spacing units.
pub fn line_position(location: &Location, n: usize, home_position: f64) -> f64 {
    let id = location.id().as_str();
    match id {
        "bus" => 0.0,
        "parking" => (n - 1) as f64,
        HOME_START_ID | HOME_END_ID => home_position,
        _ => id
            .strip_prefix('s')
            .and_then(|rest| rest.parse::<f64>().ok())
            .unwrap_or_else(|| panic!("unexpected fixture node id {id}")),
    }
}

/// Walking distance between two fixture locations.
pub fn line_distance(from: &Location, to: &Location, n: usize, home_position: f64) -> f64 {
    (line_position(from, n, home_position) - line_position(to, n, home_position)).abs() * SPACING_M
}
