//! Mixed-integer timetable optimizer.
//!
//! Every train gets an integer start shift, a non-negative extra dwell at one
//! anchor station and, when dropping is allowed, a binary "placed" flag. All
//! timing constraints are reified on the placed flags of the trains they
//! mention, so an unplaceable train can be switched off instead of making the
//! whole model infeasible. The placement reward dominates the objective;
//! among maximal placements the model minimises dwell, shifting and makespan.
//!
//! The model is solved on the shared solver worker with a wall-clock budget.
//! When the budget runs out, or an earlier timed-out model still occupies the
//! worker for the whole budget, the result is reported as
//! [`SolveStatus::Unknown`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use good_lp::{
    Constraint, Expression, IntoAffineExpression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable, variable,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::OptimizerConfig;
use super::worker::{self, Budgeted};
use crate::domain::{DAY_MINUTES, Minutes, PhysicalSegment, StationIdx, TrainId, clamp_to_day};
use crate::schedule::ConflictRules;
use crate::session::Session;

/// Errors that prevent the optimizer from running at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptimizeError {
    /// Some train has no running time for one of its segments.
    #[error("time table is incomplete ({faults} missing running times)")]
    IncompleteTimetable { faults: usize },

    /// The solver worker could not be started.
    #[error("could not start solver: {0}")]
    Worker(String),
}

/// How the solver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    /// Time limit reached or solver failure; nothing was placed.
    Unknown,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Extra dwell the optimizer chose for one train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwellChange {
    pub train: TrainId,
    pub station: String,
    pub minutes: Minutes,
}

/// Result of one optimizer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeOutcome {
    pub status: SolveStatus,
    /// Start shift per placed train, zero shifts included.
    pub shifts: BTreeMap<TrainId, Minutes>,
    /// Non-zero extra dwell per placed train.
    pub extra_dwell: Vec<DwellChange>,
    pub placed: Vec<TrainId>,
    pub dropped: Vec<TrainId>,
}

impl OptimizeOutcome {
    fn unsolved(status: SolveStatus, trains: Vec<TrainId>) -> Self {
        Self {
            status,
            shifts: BTreeMap::new(),
            extra_dwell: Vec::new(),
            placed: Vec::new(),
            dropped: trains,
        }
    }

    /// Whether the outcome carries a placement worth writing back.
    pub fn is_usable(&self) -> bool {
        self.status != SolveStatus::Infeasible && !self.placed.is_empty()
    }
}

/// Build and solve the model for the current session, then write the chosen
/// shifts and dwell back into it if the outcome is usable.
///
/// Refuses to run on a partial time table.
pub fn optimize(
    session: &mut Session,
    rules: &ConflictRules,
    config: &OptimizerConfig,
) -> Result<OptimizeOutcome, OptimizeError> {
    let outcome = plan(session, rules, config)?;
    if outcome.is_usable() {
        apply(session, &outcome);
    }
    Ok(outcome)
}

/// Solve without touching the session.
pub fn plan(
    session: &Session,
    rules: &ConflictRules,
    config: &OptimizerConfig,
) -> Result<OptimizeOutcome, OptimizeError> {
    let propagation = session.propagate();
    if !propagation.faults.is_empty() {
        return Err(OptimizeError::IncompleteTimetable {
            faults: propagation.faults.len(),
        });
    }

    let mut model = Model::new(config);
    let mut trains = Vec::with_capacity(session.trains().len());
    for (train, path) in session.scheduled() {
        let Some(times) = propagation.timetable.get(&train.id) else {
            continue;
        };
        let stations: Vec<StationIdx> = path.stations().to_vec();
        let names: Vec<String> = stations
            .iter()
            .map(|&s| session.topology().name(s).to_string())
            .collect();
        let arrivals: Vec<Minutes> = times.arrivals().iter().map(|&(_, t)| t).collect();
        let dwell: Vec<Minutes> = names.iter().map(|n| train.dwell_at(n)).collect();
        let anchor = match stations.len() {
            0 => None,
            1 => Some(0),
            _ => Some(1),
        };
        trains.push(TrainData {
            id: train.id.clone(),
            start: train.start,
            shift_limit: train.class.start_shift_limit(),
            deviation_limit: train.class.arrival_deviation_limit(),
            stations,
            names,
            arrivals,
            dwell,
            anchor,
        });
    }
    let ids: Vec<TrainId> = trains.iter().map(|t| t.id.clone()).collect();

    model.set_big_m(&trains, rules);
    let vars: Vec<TrainVars> = trains.iter().map(|t| model.train_vars(t)).collect();
    let timed: Vec<Timed<'_>> = trains
        .iter()
        .zip(vars.iter())
        .map(|(data, vars)| Timed { data, vars })
        .collect();

    for t in &timed {
        model.add_train(t, rules);
    }
    model.add_segment_pairs(&timed, rules);
    model.add_node_separation(&timed);
    model.add_makespan(&timed);

    info!(
        trains = timed.len(),
        variables = model.variables,
        constraints = model.constraints.len(),
        big_m = model.big_m,
        "built optimizer model"
    );

    let (status, values) = model.solve(&vars, config)?;
    let Some(values) = values else {
        warn!(%status, "optimizer produced no placement");
        return Ok(OptimizeOutcome::unsolved(status, ids));
    };

    let mut outcome = OptimizeOutcome::unsolved(status, Vec::new());
    for (data, value) in trains.iter().zip(values) {
        if value.active < 0.5 {
            outcome.dropped.push(data.id.clone());
            continue;
        }
        outcome.placed.push(data.id.clone());
        outcome
            .shifts
            .insert(data.id.clone(), value.shift.round() as Minutes);
        let extra = value.extra.round() as Minutes;
        if let (Some(anchor), true) = (data.anchor, extra > 0) {
            outcome.extra_dwell.push(DwellChange {
                train: data.id.clone(),
                station: data.names[anchor].clone(),
                minutes: extra,
            });
        }
    }
    info!(
        %status,
        placed = outcome.placed.len(),
        dropped = outcome.dropped.len(),
        "optimizer finished"
    );
    Ok(outcome)
}

/// Write an outcome's shifts and extra dwell back into the session.
pub fn apply(session: &mut Session, outcome: &OptimizeOutcome) {
    for (id, &shift) in &outcome.shifts {
        if let Ok(train) = session.train_mut(id) {
            train.start = clamp_to_day(train.start.saturating_add(shift));
        }
    }
    for change in &outcome.extra_dwell {
        if let Ok(train) = session.train_mut(&change.train) {
            let current = train.dwell_at(&change.station);
            train
                .dwell
                .insert(change.station.clone(), current.saturating_add(change.minutes));
        }
    }
    debug!(
        shifted = outcome.shifts.values().filter(|s| **s != 0).count(),
        dwell_changes = outcome.extra_dwell.len(),
        "applied optimizer outcome"
    );
}

/// Base timing of one train, taken from the propagated time table.
struct TrainData {
    id: TrainId,
    start: Minutes,
    shift_limit: Minutes,
    deviation_limit: Minutes,
    stations: Vec<StationIdx>,
    names: Vec<String>,
    arrivals: Vec<Minutes>,
    dwell: Vec<Minutes>,
    /// Path position where extra dwell may be added.
    anchor: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct TrainVars {
    shift: Variable,
    abs_shift: Variable,
    extra: Option<Variable>,
    active: Option<Variable>,
}

/// Solved values for one train.
#[derive(Debug, Clone, Copy)]
struct TrainValues {
    shift: f64,
    extra: f64,
    active: f64,
}

struct Timed<'a> {
    data: &'a TrainData,
    vars: &'a TrainVars,
}

impl Timed<'_> {
    /// Arrival at path position `k`.
    fn arr(&self, k: usize) -> Expression {
        let mut e = self.vars.shift.into_expression() + self.data.arrivals[k] as f64;
        if let (Some(anchor), Some(extra)) = (self.data.anchor, self.vars.extra) {
            if anchor < k {
                e = e + extra;
            }
        }
        e
    }

    /// Departure from path position `k`.
    fn dep(&self, k: usize) -> Expression {
        let mut e = self.arr(k) + self.data.dwell[k] as f64;
        if let (Some(anchor), Some(extra)) = (self.data.anchor, self.vars.extra) {
            if anchor == k {
                e = e + extra;
            }
        }
        e
    }

    fn position(&self, station: StationIdx) -> Option<usize> {
        self.data.stations.iter().position(|&s| s == station)
    }

    fn placed(&self) -> Vec<Lit> {
        self.vars.active.map(Lit::Pos).into_iter().collect()
    }
}

/// A condition under which a reified constraint is enforced.
#[derive(Debug, Clone, Copy)]
enum Lit {
    Pos(Variable),
    Neg(Variable),
}

struct Model {
    vars: ProblemVariables,
    constraints: Vec<Constraint>,
    objective: Expression,
    big_m: f64,
    variables: usize,
    node_separation: f64,
    max_extra_dwell: Minutes,
    dwell_cap: Minutes,
    weights: Weights,
    allow_drop: bool,
}

#[derive(Debug, Clone, Copy)]
struct Weights {
    dwell: f64,
    shift: f64,
    span: f64,
    place: f64,
    compact: f64,
}

impl Model {
    fn new(config: &OptimizerConfig) -> Self {
        Self {
            vars: ProblemVariables::new(),
            constraints: Vec::new(),
            objective: 0.into(),
            big_m: 0.0,
            variables: 0,
            node_separation: config.node_separation_mins as f64,
            max_extra_dwell: config.max_extra_dwell_mins,
            dwell_cap: config.dwell_cap_mins,
            weights: Weights {
                dwell: config.weight_dwell,
                shift: config.weight_shift,
                span: config.weight_span,
                place: config.weight_place,
                compact: config.weight_compact,
            },
            allow_drop: config.allow_drop,
        }
    }

    fn add(&mut self, def: good_lp::VariableDefinition) -> Variable {
        self.variables += 1;
        self.vars.add(def)
    }

    /// Pick a big-M that exceeds any difference between two event times or
    /// required gaps in the model.
    fn set_big_m(&mut self, trains: &[TrainData], rules: &ConflictRules) {
        let lo = trains
            .iter()
            .filter_map(|t| t.arrivals.first().map(|a| a - t.shift_limit))
            .min()
            .unwrap_or(0);
        let hi = trains
            .iter()
            .flat_map(|t| {
                t.arrivals
                    .iter()
                    .zip(&t.dwell)
                    .map(move |(a, d)| a + d + t.shift_limit)
            })
            .max()
            .unwrap_or(DAY_MINUTES)
            + self.max_extra_dwell.max(0);
        let gaps = 2 * rules.headway_mins.max(rules.clearance_mins).max(0)
            + 2 * rules.station_slack_mins.abs()
            + self.node_separation.abs() as Minutes;
        self.big_m = (4 * (hi - lo).max(0) + gaps + 1000) as f64;
    }

    fn train_vars(&mut self, t: &TrainData) -> TrainVars {
        let lo = (-t.shift_limit).max(-t.start);
        let hi = t.shift_limit.min(DAY_MINUTES - t.start).max(lo);
        let shift = self.add(
            variable()
                .integer()
                .min(lo as f64)
                .max(hi as f64)
                .name(format!("shift_{}", t.id)),
        );
        let abs_shift = self.add(
            variable()
                .min(0.0)
                .max(lo.abs().max(hi.abs()) as f64)
                .name(format!("abs_shift_{}", t.id)),
        );
        let extra = t.anchor.map(|k| {
            let headroom = (self.dwell_cap - t.dwell[k]).max(0);
            let upper = self.max_extra_dwell.min(headroom).max(0);
            self.add(
                variable()
                    .integer()
                    .min(0.0)
                    .max(upper as f64)
                    .name(format!("extra_dwell_{}", t.id)),
            )
        });
        let active = self
            .allow_drop
            .then(|| self.add(variable().binary().name(format!("placed_{}", t.id))));

        TrainVars {
            shift,
            abs_shift,
            extra,
            active,
        }
    }

    /// Enforce `lhs >= 0` whenever every literal in `when` holds.
    fn require(&mut self, lhs: Expression, when: &[Lit]) {
        let mut e = lhs;
        for lit in when {
            match *lit {
                Lit::Pos(v) => e = e + self.big_m - v.into_expression() * self.big_m,
                Lit::Neg(v) => e = e + v.into_expression() * self.big_m,
            }
        }
        self.constraints.push(e.geq(0.0));
    }

    /// Either `a` leads `b` by `gap` or `b` leads `a` by `gap`, chosen by a
    /// fresh boolean. `a` and `b` are `(start, end)` pairs. Returns the
    /// boolean.
    fn disjoint(
        &mut self,
        a: (Expression, Expression),
        b: (Expression, Expression),
        gap: f64,
        when: &[Lit],
        name: String,
    ) -> Variable {
        let order = self.add(variable().binary().name(name));
        let a_first: Vec<Lit> = std::iter::once(Lit::Pos(order)).chain(when.iter().copied()).collect();
        let b_first: Vec<Lit> = std::iter::once(Lit::Neg(order)).chain(when.iter().copied()).collect();
        self.require(b.0.clone() - a.1.clone() - gap, &a_first);
        self.require(a.0 - b.1 - gap, &b_first);
        order
    }

    fn add_train(&mut self, t: &Timed<'_>, rules: &ConflictRules) {
        let (shift, abs_shift) = (t.vars.shift, t.vars.abs_shift);
        self.constraints.push((abs_shift.into_expression() - shift).geq(0.0));
        self.constraints.push((abs_shift.into_expression() + shift).geq(0.0));

        self.objective = self.objective.clone() + abs_shift.into_expression() * self.weights.shift;
        if let Some(extra) = t.vars.extra {
            self.objective = self.objective.clone() + extra.into_expression() * self.weights.dwell;
        }
        if let Some(active) = t.vars.active {
            self.objective = self.objective.clone() - active.into_expression() * self.weights.place;
        }

        let placed = t.placed();
        let slack = rules.station_slack_mins as f64;

        // The trimmed occupancy window on every step stays well formed.
        for k in 1..t.data.stations.len() {
            self.require(t.arr(k) - slack - (t.dep(k - 1) + slack), &placed);
        }

        if let Some(last) = t.data.stations.len().checked_sub(1) {
            let deviation = t.arr(last) - t.data.arrivals[last] as f64;
            let limit = t.data.deviation_limit as f64;
            self.require(deviation.clone() * -1.0 + limit, &placed);
            self.require(deviation + limit, &placed);
        }
    }

    /// Pairwise disjunction on every physical segment both trains use.
    fn add_segment_pairs(&mut self, timed: &[Timed<'_>], rules: &ConflictRules) {
        let slack = rules.station_slack_mins as f64;
        let mut users: BTreeMap<PhysicalSegment, Vec<(usize, usize, bool)>> = BTreeMap::new();
        for (i, t) in timed.iter().enumerate() {
            for k in 1..t.data.stations.len() {
                let (u, v) = (t.data.stations[k - 1], t.data.stations[k]);
                users
                    .entry(PhysicalSegment::new(u, v))
                    .or_default()
                    .push((i, k - 1, u < v));
            }
        }

        for (segment, list) in &users {
            for (n, &(i, ki, up_i)) in list.iter().enumerate() {
                for &(j, kj, up_j) in &list[n + 1..] {
                    if i == j {
                        continue;
                    }
                    let (a, b) = (&timed[i], &timed[j]);
                    let gap = if up_i == up_j {
                        2 * rules.headway_mins
                    } else {
                        2 * rules.clearance_mins
                    } as f64;
                    let wa = (a.dep(ki) + slack, a.arr(ki + 1) - slack);
                    let wb = (b.dep(kj) + slack, b.arr(kj + 1) - slack);
                    let when: Vec<Lit> = a.placed().into_iter().chain(b.placed()).collect();
                    self.disjoint(
                        wa,
                        wb,
                        gap,
                        &when,
                        format!("order_{}_{}_{}", segment, a.data.id, b.data.id),
                    );
                }
            }
        }
    }

    /// Two trains' events at a shared station are at least the node
    /// separation apart.
    fn add_node_separation(&mut self, timed: &[Timed<'_>]) {
        let stations: BTreeSet<StationIdx> = timed
            .iter()
            .flat_map(|t| t.data.stations.iter().copied())
            .collect();
        let sep = self.node_separation;

        for station in stations {
            let visiting: Vec<(usize, usize)> = timed
                .iter()
                .enumerate()
                .filter_map(|(i, t)| t.position(station).map(|k| (i, k)))
                .collect();
            for (n, &(i, ki)) in visiting.iter().enumerate() {
                for &(j, kj) in &visiting[n + 1..] {
                    let (a, b) = (&timed[i], &timed[j]);
                    let when: Vec<Lit> = a.placed().into_iter().chain(b.placed()).collect();
                    let events = [
                        ("aa", a.arr(ki), b.arr(kj)),
                        ("dd", a.dep(ki), b.dep(kj)),
                        ("ad", a.arr(ki), b.dep(kj)),
                        ("da", a.dep(ki), b.arr(kj)),
                    ];
                    for (tag, ea, eb) in events {
                        let name = format!("node_{}_{}_{}_{}", station.0, a.data.id, b.data.id, tag);
                        self.separate(ea, eb, sep, &when, name);
                    }
                }
            }
        }
    }

    /// Point events `a` and `b` at least `sep` apart. With a compaction
    /// weight the excess over `sep` is penalised.
    fn separate(&mut self, a: Expression, b: Expression, sep: f64, when: &[Lit], name: String) {
        let order = self.disjoint((a.clone(), a.clone()), (b.clone(), b.clone()), sep, when, name);
        if self.weights.compact <= 0.0 {
            return;
        }
        let excess = self.add(variable().min(0.0).max(self.big_m));
        let a_first: Vec<Lit> = std::iter::once(Lit::Pos(order)).chain(when.iter().copied()).collect();
        let b_first: Vec<Lit> = std::iter::once(Lit::Neg(order)).chain(when.iter().copied()).collect();
        self.require(excess.into_expression() - (b.clone() - a.clone() - sep), &a_first);
        self.require(excess.into_expression() - (a - b - sep), &b_first);
        self.objective = self.objective.clone() + excess.into_expression() * self.weights.compact;
    }

    /// Span from the earliest placed departure to the latest placed arrival.
    fn add_makespan(&mut self, timed: &[Timed<'_>]) {
        let bound = self.big_m * 2.0;
        let first = self.add(variable().min(-bound).max(bound).name("span_start"));
        let last = self.add(variable().min(-bound).max(bound).name("span_end"));
        for t in timed {
            let Some(end) = t.data.stations.len().checked_sub(1) else {
                continue;
            };
            let placed = t.placed();
            self.require(t.dep(0) - first, &placed);
            self.require(last.into_expression() - t.arr(end), &placed);
        }
        self.constraints.push((last.into_expression() - first).geq(0.0));
        self.objective = self.objective.clone() + (last.into_expression() - first) * self.weights.span;
    }

    /// Solve on the shared solver worker within the configured time limit.
    fn solve(
        self,
        watch: &[TrainVars],
        config: &OptimizerConfig,
    ) -> Result<(SolveStatus, Option<Vec<TrainValues>>), OptimizeError> {
        let watch = watch.to_vec();
        let Model {
            vars,
            constraints,
            objective,
            ..
        } = self;

        let job = move || {
            let mut problem = vars
                .minimise(objective)
                .using(good_lp::solvers::microlp::microlp);
            for c in constraints {
                problem.add_constraint(c);
            }
            match problem.solve() {
                Ok(solution) => Ok(watch
                    .iter()
                    .map(|v| TrainValues {
                        shift: solution.value(v.shift),
                        extra: v.extra.map_or(0.0, |e| solution.value(e)),
                        active: v.active.map_or(1.0, |a| solution.value(a)),
                    })
                    .collect::<Vec<_>>()),
                Err(ResolutionError::Infeasible) => Err(SolveStatus::Infeasible),
                Err(e) => {
                    warn!(error = %e, "solver failed");
                    Err(SolveStatus::Unknown)
                }
            }
        };
        let limit_ms = config.time_limit.as_millis();

        let outcome = worker::run(config.time_limit, job)
            .map_err(|e| OptimizeError::Worker(e.to_string()))?;
        Ok(match outcome {
            Budgeted::Done(Ok(values)) => (SolveStatus::Optimal, Some(values)),
            Budgeted::Done(Err(status)) => (status, None),
            Budgeted::Busy => {
                warn!(limit_ms, "solver still busy with an earlier model");
                (SolveStatus::Unknown, None)
            }
            Budgeted::TimedOut => {
                warn!(limit_ms, "optimizer hit its time limit");
                (SolveStatus::Unknown, None)
            }
            Budgeted::Failed => {
                warn!("solver worker failed");
                (SolveStatus::Unknown, None)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{Direction, RunningTime, RuntimeClass, Station, Train, TrainClass};

    fn id(s: &str) -> TrainId {
        TrainId::new(s).unwrap()
    }

    fn corridor(trains: Vec<Train>) -> Session {
        Session::new(
            vec![
                Station::new("A", 0.0),
                Station::new("B", 10.0),
                Station::new("C", 20.0),
            ],
            vec![],
            trains,
            vec![
                RunningTime::new("A", "B", RuntimeClass::Passenger, 10),
                RunningTime::new("B", "C", RuntimeClass::Passenger, 10),
            ],
        )
        .unwrap()
    }

    #[test]
    fn crossing_is_placed_with_dwell() {
        let mut s = corridor(vec![
            Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0).with_destination("C"),
            Train::new(id("T2"), TrainClass::Passenger, Direction::Down, "C", 5)
                .with_destination("A"),
        ]);
        let rules = ConflictRules::default();

        let out = optimize(&mut s, &rules, &OptimizerConfig::default()).unwrap();

        assert_eq!(out.status, SolveStatus::Optimal);
        assert!(out.is_usable());
        assert_eq!(out.placed.len(), 2);
        assert!(out.dropped.is_empty());
        assert!(out.shifts.values().all(|&x| x == 0));
        assert_eq!(
            out.extra_dwell,
            vec![DwellChange {
                train: id("T1"),
                station: "B".into(),
                minutes: 9,
            }]
        );
        assert_eq!(s.train(&id("T1")).unwrap().dwell_at("B"), 9);
        assert!(s.conflicts(&rules).is_empty());
    }

    #[test]
    fn unplaceable_train_is_dropped() {
        let mut s = Session::new(
            vec![Station::new("A", 0.0), Station::new("B", 50.0)],
            vec![],
            vec![
                Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0),
                Train::new(id("T2"), TrainClass::Passenger, Direction::Up, "A", 0),
            ],
            vec![RunningTime::new("A", "B", RuntimeClass::Passenger, 60)],
        )
        .unwrap();
        let rules = ConflictRules::new(5, 3, 0);

        let out = optimize(&mut s, &rules, &OptimizerConfig::default()).unwrap();

        assert_eq!(out.status, SolveStatus::Optimal);
        assert!(out.is_usable());
        assert_eq!(out.placed.len(), 1);
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.shifts.values().copied().collect::<Vec<_>>(), vec![0]);
        assert!(out.extra_dwell.is_empty());
    }

    #[test]
    fn without_drop_the_model_is_infeasible() {
        let mut s = Session::new(
            vec![Station::new("A", 0.0), Station::new("B", 50.0)],
            vec![],
            vec![
                Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0),
                Train::new(id("T2"), TrainClass::Passenger, Direction::Up, "A", 0),
            ],
            vec![RunningTime::new("A", "B", RuntimeClass::Passenger, 60)],
        )
        .unwrap();
        let before = s.trains().to_vec();
        let config = OptimizerConfig {
            allow_drop: false,
            ..OptimizerConfig::default()
        };

        let out = optimize(&mut s, &ConflictRules::new(5, 3, 0), &config).unwrap();

        assert_eq!(out.status, SolveStatus::Infeasible);
        assert!(!out.is_usable());
        assert_eq!(out.dropped.len(), 2);
        assert_eq!(s.trains(), before.as_slice());
    }

    #[test]
    fn partial_time_table_is_refused() {
        let mut s = Session::new(
            vec![
                Station::new("A", 0.0),
                Station::new("B", 10.0),
                Station::new("C", 20.0),
            ],
            vec![],
            vec![Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0)],
            vec![RunningTime::new("A", "B", RuntimeClass::Passenger, 10)],
        )
        .unwrap();
        let before = s.trains().to_vec();

        let err = optimize(&mut s, &ConflictRules::default(), &OptimizerConfig::default())
            .unwrap_err();

        assert_eq!(err, OptimizeError::IncompleteTimetable { faults: 1 });
        assert_eq!(s.trains(), before.as_slice());
    }

    #[test]
    fn conflict_free_input_is_left_alone() {
        let mut s = corridor(vec![
            Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0),
            Train::new(id("T2"), TrainClass::Passenger, Direction::Up, "A", 120),
        ]);
        let before = s.trains().to_vec();

        let out = optimize(&mut s, &ConflictRules::default(), &OptimizerConfig::default()).unwrap();

        assert_eq!(out.placed.len(), 2);
        assert!(out.extra_dwell.is_empty());
        assert_eq!(s.trains(), before.as_slice());
    }

    #[test]
    fn exhausted_budget_is_unknown_and_the_next_run_still_solves() {
        let trains = || {
            vec![
                Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 0).with_destination("C"),
                Train::new(id("T2"), TrainClass::Passenger, Direction::Down, "C", 5)
                    .with_destination("A"),
            ]
        };
        let rules = ConflictRules::default();
        let mut s = corridor(trains());
        let rushed = OptimizerConfig {
            time_limit: Duration::ZERO,
            ..OptimizerConfig::default()
        };

        let out = optimize(&mut s, &rules, &rushed).unwrap();

        assert_eq!(out.status, SolveStatus::Unknown);
        assert!(!out.is_usable());
        assert_eq!(out.dropped.len(), 2);
        assert_eq!(s.trains(), corridor(trains()).trains());

        let out = optimize(&mut s, &rules, &OptimizerConfig::default()).unwrap();
        assert_eq!(out.status, SolveStatus::Optimal);
        assert_eq!(out.placed.len(), 2);
        assert!(s.conflicts(&rules).is_empty());
    }

    #[test]
    fn outcome_usability() {
        let unsolved = OptimizeOutcome::unsolved(SolveStatus::Unknown, vec![id("T1")]);
        assert!(!unsolved.is_usable());

        let mut placed = OptimizeOutcome::unsolved(SolveStatus::Optimal, vec![]);
        placed.placed.push(id("T1"));
        assert!(placed.is_usable());

        placed.status = SolveStatus::Infeasible;
        assert!(!placed.is_usable());
    }

    #[test]
    fn apply_clamps_and_accumulates() {
        let mut s = corridor(vec![
            Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 1430).with_dwell("B", 2),
        ]);
        let outcome = OptimizeOutcome {
            status: SolveStatus::Optimal,
            shifts: BTreeMap::from([(id("T1"), 15)]),
            extra_dwell: vec![DwellChange {
                train: id("T1"),
                station: "B".into(),
                minutes: 4,
            }],
            placed: vec![id("T1")],
            dropped: vec![],
        };

        apply(&mut s, &outcome);

        let t1 = s.train(&id("T1")).unwrap();
        assert_eq!(t1.start, 1440);
        assert_eq!(t1.dwell_at("B"), 6);
    }

    #[test]
    fn apply_saturates_extreme_values() {
        let mut s = corridor(vec![
            Train::new(id("T1"), TrainClass::Passenger, Direction::Up, "A", 100).with_dwell("B", 2),
            Train::new(id("T2"), TrainClass::Passenger, Direction::Up, "A", 100),
        ]);
        let outcome = OptimizeOutcome {
            status: SolveStatus::Optimal,
            shifts: BTreeMap::from([(id("T1"), Minutes::MAX), (id("T2"), Minutes::MIN)]),
            extra_dwell: vec![DwellChange {
                train: id("T1"),
                station: "B".into(),
                minutes: Minutes::MAX,
            }],
            placed: vec![id("T1"), id("T2")],
            dropped: vec![],
        };

        apply(&mut s, &outcome);

        assert_eq!(s.train(&id("T1")).unwrap().start, 1440);
        assert_eq!(s.train(&id("T1")).unwrap().dwell_at("B"), Minutes::MAX);
        assert_eq!(s.train(&id("T2")).unwrap().start, 0);
    }
}
