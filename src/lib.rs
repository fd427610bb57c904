//! hike-planner core
//!
//! Multi-day hiking tour optimization: assigns stamp-point visits to days and
//! orders them into per-day tours that start and end at a bus stop, parking
//! lot, or home, minimizing total distance under daily caps and origin
//! budgets. Modeled as a MILP and solved through a pluggable backend.

pub mod backend;
pub mod catalog;
pub mod error;
pub mod model;
pub mod planner;
pub mod tour;
