//! End-to-end planning scenarios on the line fixture.
//!
//! These run the full pipeline against the bundled HiGHS backend.

mod fixtures;

use std::collections::BTreeSet;

use hike_planner::backend::{SolveOptions, SolveStatus};
use hike_planner::error::PlanError;
use hike_planner::model::PlanParams;
use hike_planner::planner::plan;
use hike_planner::tour::TourPlan;

use fixtures::{
    LineHomeResolver, UnreachableHomeResolver, line_catalog, line_distance, stamp_id_at,
};

const EPS: f64 = 1e-6;

/// Every non-empty tour must start and end at a non-stamp node with only
/// stamp points in between; a cycle mixing a bus stop or parking lot into
/// the middle of a day would show up here.
fn assert_tours_well_formed(plan: &TourPlan) {
    for tour in &plan.days {
        if tour.is_empty() {
            continue;
        }
        let first = tour.stops.first().unwrap();
        let last = tour.stops.last().unwrap();
        assert!(!first.is_stamp_point(), "tour starts at {:?}", first);
        assert!(!last.is_stamp_point(), "tour ends at {:?}", last);
        for interior in &tour.stops[1..tour.stops.len() - 1] {
            assert!(
                interior.is_stamp_point(),
                "non-stamp node {:?} inside a tour",
                interior
            );
        }
    }
}

/// No stamp point may appear in more than one tour, or twice in one.
fn assert_stamps_unique(plan: &TourPlan) {
    let mut seen = BTreeSet::new();
    for tour in &plan.days {
        for stamp in tour.stamp_points() {
            assert!(seen.insert(stamp.id.clone()), "stamp {} repeated", stamp.id);
        }
    }
}

fn assert_distances_consistent(plan: &TourPlan, n: usize, home_position: f64) {
    let mut total = 0.0;
    for tour in &plan.days {
        let walked: f64 = tour
            .stops
            .windows(2)
            .map(|pair| line_distance(&pair[0], &pair[1], n, home_position))
            .sum();
        assert!(
            (walked - tour.distance).abs() < EPS,
            "reconstructed {} m but the model says {} m",
            walked,
            tour.distance
        );
        total += tour.distance;
    }
    assert!((total - plan.total_distance).abs() < EPS);
}

#[test]
fn three_day_line_scenario() {
    let n = 10;
    let home_position = 4.0;
    let catalog = line_catalog(n, true, true);
    let resolver = LineHomeResolver {
        n,
        position: home_position,
    };
    let params = PlanParams {
        days: 3,
        max_daily_distance: 5_000.0,
        min_stamps: 6,
        home_address: Some("Torfhaus 1, 38667 Torfhaus".into()),
        max_bus_days: 1,
        max_parking_days: 1,
        ..PlanParams::default()
    };

    let plan = plan(&catalog, &params, &SolveOptions::default(), Some(&resolver)).unwrap();

    assert_eq!(plan.days.len(), 3);
    assert_eq!(plan.status, SolveStatus::Optimal);
    assert!(plan.visited_stamp_count() >= 6);
    assert!(plan.total_distance <= 15_000.0 + EPS);
    assert_tours_well_formed(&plan);
    assert_stamps_unique(&plan);
    assert_distances_consistent(&plan, n, home_position);

    let mut bus_days = 0;
    let mut parking_days = 0;
    for tour in &plan.days {
        assert!(tour.distance <= params.max_daily_distance + EPS);
        match tour.origin() {
            Some(origin) if origin.id().as_str() == "bus" => bus_days += 1,
            Some(origin) if origin.id().as_str() == "parking" => parking_days += 1,
            _ => {}
        }
    }
    assert!(bus_days <= 1, "used the bus on {bus_days} days");
    assert!(parking_days <= 1, "parked on {parking_days} days");
}

#[test]
fn home_only_day_is_an_open_path() {
    let n = 3;
    let catalog = line_catalog(n, false, false);
    let resolver = LineHomeResolver { n, position: 0.0 };
    let params = PlanParams {
        days: 1,
        max_daily_distance: 10_000.0,
        min_stamps: 2,
        home_address: Some("Torfhaus 1".into()),
        ..PlanParams::default()
    };
    let options = SolveOptions {
        time_limit_secs: Some(60.0),
        ..SolveOptions::default()
    };

    let plan = plan(&catalog, &params, &options, Some(&resolver)).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    let tour = &plan.days[0];
    assert!(matches!(
        tour.stops.first(),
        Some(hike_planner::catalog::Location::HomeStart(_))
    ));
    assert!(matches!(
        tour.stops.last(),
        Some(hike_planner::catalog::Location::HomeEnd(_))
    ));
    assert!(plan.visited_stamp_count() >= 2);
    // Cheapest pair from a home at s0: s0 and s1, 2000 m in total.
    assert!((plan.total_distance - 2_000.0).abs() < EPS);
    assert_tours_well_formed(&plan);
}

#[test]
fn min_stamps_beyond_reach_is_infeasible() {
    let catalog = line_catalog(4, true, false);
    let params = PlanParams {
        days: 2,
        max_daily_distance: 100_000.0,
        min_stamps: 5,
        max_bus_days: 2,
        ..PlanParams::default()
    };

    let err = plan(&catalog, &params, &SolveOptions::default(), None).unwrap_err();
    assert!(matches!(err, PlanError::Infeasible));
}

#[test]
fn cap_too_tight_is_infeasible() {
    let catalog = line_catalog(3, true, false);
    // Any two stamps from the bus stop cost at least 2000 m.
    let params = PlanParams {
        days: 1,
        max_daily_distance: 1_500.0,
        min_stamps: 2,
        max_bus_days: 1,
        ..PlanParams::default()
    };

    let err = plan(&catalog, &params, &SolveOptions::default(), None).unwrap_err();
    assert!(matches!(err, PlanError::Infeasible));
}

#[test]
fn ignored_stamps_never_appear_in_tours() {
    let catalog = line_catalog(5, true, false);
    let ignored = stamp_id_at(2);
    let params = PlanParams {
        days: 2,
        max_daily_distance: 20_000.0,
        min_stamps: 3,
        max_bus_days: 2,
        ignore_stamp_ids: BTreeSet::from([ignored]),
        ..PlanParams::default()
    };

    let plan = plan(&catalog, &params, &SolveOptions::default(), None).unwrap();

    assert!(plan.visited_stamp_count() >= 3);
    for tour in &plan.days {
        for stamp in tour.stamp_points() {
            assert_ne!(stamp.stamp_id, ignored);
        }
    }
    assert_tours_well_formed(&plan);
    assert_stamps_unique(&plan);
}

#[test]
fn a_larger_cap_never_costs_more() {
    let catalog = line_catalog(6, true, true);
    let base = PlanParams {
        days: 2,
        max_daily_distance: 6_000.0,
        min_stamps: 4,
        max_bus_days: 1,
        max_parking_days: 1,
        ..PlanParams::default()
    };
    let relaxed = PlanParams {
        max_daily_distance: 12_000.0,
        ..base.clone()
    };

    let tight_plan = plan(&catalog, &base, &SolveOptions::default(), None).unwrap();
    let relaxed_plan = plan(&catalog, &relaxed, &SolveOptions::default(), None).unwrap();

    assert!(relaxed_plan.total_distance <= tight_plan.total_distance + EPS);
}

#[test]
fn unresolvable_address_fails_before_solving() {
    let catalog = line_catalog(3, true, false);
    let params = PlanParams {
        days: 1,
        max_daily_distance: 10_000.0,
        min_stamps: 1,
        home_address: Some("Nowhere 99".into()),
        max_bus_days: 1,
        ..PlanParams::default()
    };

    let err = plan(
        &catalog,
        &params,
        &SolveOptions::default(),
        Some(&UnreachableHomeResolver),
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::AddressResolution { .. }));
}

#[test]
fn home_address_without_resolver_is_a_parameter_error() {
    let catalog = line_catalog(3, true, false);
    let params = PlanParams {
        days: 1,
        max_daily_distance: 10_000.0,
        home_address: Some("Torfhaus 1".into()),
        max_bus_days: 1,
        ..PlanParams::default()
    };

    let err = plan(&catalog, &params, &SolveOptions::default(), None).unwrap_err();
    assert!(matches!(err, PlanError::InvalidParameter(_)));
}

#[test]
fn plans_serialize_to_json() {
    let catalog = line_catalog(3, true, false);
    let params = PlanParams {
        days: 1,
        max_daily_distance: 10_000.0,
        min_stamps: 1,
        max_bus_days: 1,
        ..PlanParams::default()
    };

    let plan = plan(&catalog, &params, &SolveOptions::default(), None).unwrap();
    let json = serde_json::to_string(&plan).unwrap();
    assert!(json.contains("total_distance"));
}
