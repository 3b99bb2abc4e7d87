//! End-to-end scenarios over a loaded session.

use super::*;
use crate::domain::{
    Direction, Minutes, RunningTime, RuntimeClass, Station, StationIdx, Train, TrainClass, TrainId,
};
use crate::schedule::{Baseline, ConflictRules, Interval, MissingRuntimeFault};
use crate::session::Session;

fn id(s: &str) -> TrainId {
    TrainId::new(s).unwrap()
}

fn train(name: &str, direction: Direction, origin: &str, start: Minutes) -> Train {
    Train::new(id(name), TrainClass::Passenger, direction, origin, start)
}

/// Two stations 50 km apart, 60 minutes either way.
fn two_stations(trains: Vec<Train>) -> Session {
    Session::new(
        vec![Station::new("A", 0.0), Station::new("B", 50.0)],
        vec![("A".into(), "B".into())],
        trains,
        vec![RunningTime::new("A", "B", RuntimeClass::Passenger, 60)],
    )
    .unwrap()
}

fn scenario_one() -> Session {
    two_stations(vec![
        train("T1", Direction::Up, "A", 0),
        train("T2", Direction::Up, "A", 0),
    ])
}

#[test]
fn same_direction_at_same_time_conflicts() {
    let s = scenario_one();
    let rules = ConflictRules::new(5, 3, 0);

    let conflicts = s.conflicts(&rules);

    assert_eq!(conflicts.len(), 1);
    let c = &conflicts[0];
    assert!(c.same_direction);
    assert_eq!((c.first.as_str(), c.second.as_str()), ("T1", "T2"));
    assert_eq!(c.interval, Interval::new(0, 60));
    assert_eq!(c.first_window.start - c.second_window.start, 0);
    assert_eq!(c.first_window.end - c.second_window.end, 0);
    assert_eq!(c.describe(s.topology()), "T1 x T2 on A-B [00:00-01:00] same direction");
}

#[test]
fn opposite_direction_with_clearance_is_clear() {
    let s = two_stations(vec![
        train("A1", Direction::Up, "A", 0),
        train("B1", Direction::Down, "B", 65),
    ]);
    let rules = ConflictRules::new(5, 3, 0);

    let eval = s.evaluate(&rules);

    assert!(eval.conflicts.is_empty());
    assert_eq!(eval.timetable.get(&id("A1")).unwrap().final_arrival(), Some(60));
    assert_eq!(eval.timetable.get(&id("B1")).unwrap().final_arrival(), Some(125));
}

#[test]
fn missing_running_time_truncates_one_train() {
    let s = Session::new(
        vec![
            Station::new("A", 0.0),
            Station::new("B", 50.0),
            Station::new("C", 100.0),
        ],
        vec![],
        vec![train("T1", Direction::Up, "A", 0)],
        vec![RunningTime::new("A", "B", RuntimeClass::Passenger, 60)],
    )
    .unwrap();

    let eval = s.evaluate(&ConflictRules::default());

    let times = eval.timetable.get(&id("T1")).unwrap();
    assert_eq!(times.arrivals(), &[(StationIdx(0), 0), (StationIdx(1), 60)]);
    assert!(!times.is_complete());
    assert_eq!(
        eval.faults,
        vec![MissingRuntimeFault {
            train: id("T1"),
            class: RuntimeClass::Passenger,
            from: "B".into(),
            to: "C".into(),
        }]
    );
    assert!(!eval.is_complete());
}

#[test]
fn greedy_repair_absorbs_need_as_dwell() {
    let mut s = scenario_one();
    let rules = ConflictRules::new(5, 3, 0);

    let out = repair(&mut s, &rules, &RepairConfig::new(500, 20));

    assert!(out.is_resolved());
    assert_eq!(out.log(), vec!["T2 @ A +5 min dwell".to_string()]);
    let t2 = s.train(&id("T2")).unwrap();
    assert_eq!(t2.dwell_at("A"), 5);
    assert_eq!(t2.start, 0);
    assert!(s.conflicts(&rules).is_empty());
}

#[test]
fn optimizer_drops_one_of_two_identical_trains() {
    let mut s = scenario_one();
    let rules = ConflictRules::new(5, 3, 0);

    let out = optimize(&mut s, &rules, &OptimizerConfig::default()).unwrap();

    assert!(out.is_usable());
    assert_eq!(out.placed.len(), 1);
    assert_eq!(out.dropped.len(), 1);
    assert!(!out.placed.contains(&out.dropped[0]));
}

#[test]
fn pipeline_repairs_what_the_optimizer_drops() {
    let mut s = scenario_one();
    let rules = ConflictRules::new(5, 3, 0);

    let res = resolve(&mut s, &rules, &OptimizerConfig::default(), &RepairConfig::default());

    assert_eq!(res.strategies, vec![Strategy::Optimizer, Strategy::Greedy]);
    assert_eq!(res.optimizer.as_ref().map(|o| o.dropped.len()), Some(1));
    assert!(res.is_resolved());
    assert!(s.conflicts(&rules).is_empty());
}

#[test]
fn optimizer_builds_a_meet() {
    let mut s = Session::new(
        vec![
            Station::new("A", 0.0),
            Station::new("B", 10.0),
            Station::new("C", 20.0),
        ],
        vec![],
        vec![
            train("T1", Direction::Up, "A", 0).with_destination("C"),
            train("T2", Direction::Down, "C", 5).with_destination("A"),
        ],
        vec![
            RunningTime::new("A", "B", RuntimeClass::Passenger, 10),
            RunningTime::new("B", "C", RuntimeClass::Passenger, 10),
        ],
    )
    .unwrap();
    let rules = ConflictRules::default();
    assert!(!s.conflicts(&rules).is_empty());

    let res = resolve(&mut s, &rules, &OptimizerConfig::default(), &RepairConfig::default());

    assert_eq!(res.strategies, vec![Strategy::Optimizer]);
    let out = res.optimizer.unwrap();
    assert_eq!(out.placed.len(), 2);
    assert!(out.dropped.is_empty());
    assert!(s.conflicts(&rules).is_empty());
}

#[test]
fn placed_trains_respect_class_bounds() {
    let mut s = Session::new(
        vec![
            Station::new("A", 0.0),
            Station::new("B", 10.0),
            Station::new("C", 20.0),
        ],
        vec![],
        vec![
            Train::new(id("E1"), TrainClass::Express, Direction::Up, "A", 30),
            Train::new(id("F1"), TrainClass::Freight, Direction::Up, "A", 25),
            Train::new(id("P1"), TrainClass::Passenger, Direction::Down, "C", 35),
        ],
        vec![
            RunningTime::new("A", "B", RuntimeClass::Passenger, 10),
            RunningTime::new("B", "C", RuntimeClass::Passenger, 10),
            RunningTime::new("A", "B", RuntimeClass::Freight, 15),
            RunningTime::new("B", "C", RuntimeClass::Freight, 15),
        ],
    )
    .unwrap();
    let before = s.trains().to_vec();
    let baseline = s.propagate().timetable;
    let rules = ConflictRules::default();
    let config = OptimizerConfig::default();

    let out = optimize(&mut s, &rules, &config).unwrap();
    assert!(out.is_usable());

    let after = s.propagate().timetable;
    for placed in &out.placed {
        let loaded = before.iter().find(|t| &t.id == placed).unwrap();
        let now = s.train(placed).unwrap();
        assert!((now.start - loaded.start).abs() <= loaded.class.start_shift_limit());

        let deviation = after.get(placed).unwrap().final_arrival().unwrap()
            - baseline.get(placed).unwrap().final_arrival().unwrap();
        assert!(deviation.abs() <= loaded.class.arrival_deviation_limit());
        assert!(now.dwell.values().all(|&d| d <= config.dwell_cap_mins));
    }

    // Placed trains never conflict with each other.
    for c in s.conflicts(&rules) {
        assert!(!(out.placed.contains(&c.first) && out.placed.contains(&c.second)));
    }
}

#[test]
fn baseline_flags_and_accepts_large_shift() {
    let mut s = scenario_one();
    let mut baseline = Baseline::capture(s.trains());

    s.shift_train(&id("T1"), 16).unwrap();
    let violations = baseline.violations(s.trains());
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].train, id("T1"));
    assert_eq!((violations[0].delta, violations[0].limit), (16, 15));

    baseline.accept(s.trains(), &id("T1")).unwrap();
    assert!(baseline.violations(s.trains()).is_empty());
}

#[test]
fn suggestions_leave_the_session_alone() {
    let s = scenario_one();
    let before = s.trains().to_vec();
    let rules = ConflictRules::new(5, 3, 0);

    let fixes = suggest(&s, &rules, &RepairConfig::default(), &SuggestionCosts::default());

    assert_eq!(fixes.len(), 1);
    assert_eq!(s.trains(), before.as_slice());
    assert_eq!(s.conflicts(&rules).len(), 1);
}

#[test]
fn unknown_stations_are_reported() {
    let s = Session::new(
        vec![Station::new("A", 0.0), Station::new("B", 50.0)],
        vec![("B".into(), "Yard".into())],
        vec![train("T1", Direction::Up, "Depot", 0).with_destination("b")],
        vec![RunningTime::new("A", "B", RuntimeClass::Passenger, 60)],
    )
    .unwrap();

    assert_eq!(s.unknown_stations(), vec!["Depot".to_string(), "Yard".to_string()]);
    // The unknown origin still gets a full-line path.
    assert_eq!(s.path(&id("T1")).unwrap().len(), 2);
}
