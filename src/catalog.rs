//! Location and distance catalog.
//!
//! A read-only view over all known locations (stamp points, bus stops,
//! parking lots) and the directed walking-distance graph between them,
//! supplied by the geospatial import pipeline. Absence of an arc means
//! "no known route", never zero distance.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// Reserved identifier of the synthetic home-start node.
pub const HOME_START_ID: &str = "home/start";
/// Reserved identifier of the synthetic home-end node.
pub const HOME_END_ID: &str = "home/end";

/// Opaque, stable identifier shared by the distance table and the solved model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A waypoint that must be visited to count toward the stamp minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampPoint {
    pub id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
    /// Human-facing stamp number, used by the ignore filter and for display.
    pub stamp_id: u32,
    pub name: String,
}

/// An optional daily start/end location with a usage budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStop {
    pub id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
}

/// An optional daily start/end location with a usage budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingLot {
    pub id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
}

/// The home address, materialized as two synthetic graph nodes so a tour that
/// starts and ends at home is not forced through one shared node mid-tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Home {
    pub id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
}

/// Any node the planner can route through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Location {
    Stamp(StampPoint),
    Bus(BusStop),
    Parking(ParkingLot),
    HomeStart(Home),
    HomeEnd(Home),
}

impl Location {
    pub fn id(&self) -> &NodeId {
        match self {
            Location::Stamp(s) => &s.id,
            Location::Bus(b) => &b.id,
            Location::Parking(p) => &p.id,
            Location::HomeStart(h) | Location::HomeEnd(h) => &h.id,
        }
    }

    pub fn is_stamp_point(&self) -> bool {
        matches!(self, Location::Stamp(_))
    }

    pub fn as_stamp_point(&self) -> Option<&StampPoint> {
        match self {
            Location::Stamp(s) => Some(s),
            _ => None,
        }
    }
}

/// A directed edge of the distance table, in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub distance: f64,
}

/// Serde-friendly handoff format produced by the import pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    pub stamp_points: Vec<StampPoint>,
    pub bus_stops: Vec<BusStop>,
    pub parking_lots: Vec<ParkingLot>,
    pub arcs: Vec<ArcRecord>,
}

/// Walking distances from one home address to every known stamp point.
///
/// The single mapping feeds two logically distinct arc sets: home-start to
/// stamp (origin of a day) and stamp to home-end (destination of a day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeDistances {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Stamp point id -> distance from home in meters.
    pub to_stamp: BTreeMap<NodeId, f64>,
}

/// Resolves a free-text home address to walking distances.
///
/// Raises [`PlanError::AddressResolution`] when the address cannot be
/// geocoded or no walkable node exists within the search radius; that failure
/// happens before any model is built.
pub trait HomeDistanceResolver {
    fn resolve(&self, address: &str) -> Result<HomeDistances>;
}

/// Read-only catalog of locations plus forward and reverse adjacency.
///
/// Safe to share across concurrent solves; the only interior mutability is
/// the home-distance cache, keyed by address and invalidated when the
/// address changes.
#[derive(Debug)]
pub struct Catalog {
    stamp_points: BTreeMap<NodeId, StampPoint>,
    bus_stops: BTreeMap<NodeId, BusStop>,
    parking_lots: BTreeMap<NodeId, ParkingLot>,
    forward: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
    reverse: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
    home_cache: Mutex<Option<(String, Arc<HomeDistances>)>>,
}

impl Catalog {
    /// Builds a catalog from imported data, validating that every arc
    /// references a declared node and carries a nonnegative finite distance.
    pub fn from_data(data: CatalogData) -> Result<Self> {
        let mut catalog = Catalog {
            stamp_points: BTreeMap::new(),
            bus_stops: BTreeMap::new(),
            parking_lots: BTreeMap::new(),
            forward: BTreeMap::new(),
            reverse: BTreeMap::new(),
            home_cache: Mutex::new(None),
        };

        for stamp in data.stamp_points {
            catalog.check_new_id(&stamp.id)?;
            catalog.stamp_points.insert(stamp.id.clone(), stamp);
        }
        for bus in data.bus_stops {
            catalog.check_new_id(&bus.id)?;
            catalog.bus_stops.insert(bus.id.clone(), bus);
        }
        for lot in data.parking_lots {
            catalog.check_new_id(&lot.id)?;
            catalog.parking_lots.insert(lot.id.clone(), lot);
        }

        for arc in data.arcs {
            if !catalog.knows(&arc.from) {
                return Err(PlanError::UnknownNode(arc.from));
            }
            if !catalog.knows(&arc.to) {
                return Err(PlanError::UnknownNode(arc.to));
            }
            if arc.from == arc.to {
                return Err(PlanError::InvalidParameter(format!(
                    "self arc on node {}",
                    arc.from
                )));
            }
            if !arc.distance.is_finite() || arc.distance < 0.0 {
                return Err(PlanError::InvalidParameter(format!(
                    "arc {} -> {} has distance {}",
                    arc.from, arc.to, arc.distance
                )));
            }
            catalog
                .forward
                .entry(arc.from.clone())
                .or_default()
                .insert(arc.to.clone(), arc.distance);
            catalog
                .reverse
                .entry(arc.to)
                .or_default()
                .insert(arc.from, arc.distance);
        }

        Ok(catalog)
    }

    fn check_new_id(&self, id: &NodeId) -> Result<()> {
        if id.as_str() == HOME_START_ID || id.as_str() == HOME_END_ID {
            return Err(PlanError::InvalidParameter(format!(
                "node id {id} is reserved for the synthetic home nodes"
            )));
        }
        if self.knows(id) {
            return Err(PlanError::InvalidParameter(format!("duplicate node id {id}")));
        }
        Ok(())
    }

    fn knows(&self, id: &NodeId) -> bool {
        self.stamp_points.contains_key(id)
            || self.bus_stops.contains_key(id)
            || self.parking_lots.contains_key(id)
    }

    pub fn stamp_points(&self) -> &BTreeMap<NodeId, StampPoint> {
        &self.stamp_points
    }

    pub fn bus_stops(&self) -> &BTreeMap<NodeId, BusStop> {
        &self.bus_stops
    }

    pub fn parking_lots(&self) -> &BTreeMap<NodeId, ParkingLot> {
        &self.parking_lots
    }

    /// Looks up a declared location by id.
    pub fn location(&self, id: &NodeId) -> Option<Location> {
        if let Some(s) = self.stamp_points.get(id) {
            return Some(Location::Stamp(s.clone()));
        }
        if let Some(b) = self.bus_stops.get(id) {
            return Some(Location::Bus(b.clone()));
        }
        self.parking_lots.get(id).map(|p| Location::Parking(p.clone()))
    }

    /// Recorded forward distance in meters.
    pub fn distance(&self, from: &NodeId, to: &NodeId) -> Result<f64> {
        self.forward
            .get(from)
            .and_then(|adj| adj.get(to))
            .copied()
            .ok_or_else(|| PlanError::NoRoute {
                from: from.clone(),
                to: to.clone(),
            })
    }

    /// Reachable neighbors with known distances. Empty when no arcs are
    /// recorded; some nodes legitimately have no reachable stamp point
    /// within range.
    pub fn outgoing(&self, from: &NodeId) -> impl Iterator<Item = (&NodeId, f64)> {
        self.forward
            .get(from)
            .into_iter()
            .flat_map(|adj| adj.iter().map(|(to, d)| (to, *d)))
    }

    /// Nodes that can reach `to` with a known distance. Empty when none.
    pub fn incoming(&self, to: &NodeId) -> impl Iterator<Item = (&NodeId, f64)> {
        self.reverse
            .get(to)
            .into_iter()
            .flat_map(|adj| adj.iter().map(|(from, d)| (from, *d)))
    }

    /// All arcs of the distance table in `(from, to, distance)` form.
    pub fn arcs(&self) -> impl Iterator<Item = (&NodeId, &NodeId, f64)> {
        self.forward
            .iter()
            .flat_map(|(from, adj)| adj.iter().map(move |(to, d)| (from, to, *d)))
    }

    /// Stamp-to-distance mapping for a home address, computed through the
    /// resolver on first use and cached until the address string changes.
    pub fn home_distances(
        &self,
        address: &str,
        resolver: &dyn HomeDistanceResolver,
    ) -> Result<Arc<HomeDistances>> {
        let mut cache = self
            .home_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((cached_address, distances)) = cache.as_ref() {
            if cached_address == address {
                return Ok(Arc::clone(distances));
            }
        }
        let distances = Arc::new(resolver.resolve(address)?);
        *cache = Some((address.to_string(), Arc::clone(&distances)));
        Ok(distances)
    }
}
