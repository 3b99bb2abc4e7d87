//! Data transfer objects for web requests and responses.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    Direction, DomainError, InvalidDirection, InvalidTrainClass, InvalidTrainId, Minutes,
    RunningTime, Station, TimeError, Topology, Train, TrainClass, TrainId, format_hhmm, parse_hhmm,
};
use crate::resolve::{
    OptimizeOutcome, OptimizerConfig, RepairConfig, RepairOutcome, Resolution, Suggestion,
    SuggestionCosts,
};
use crate::schedule::{Conflict, ConflictRules, MissingRuntimeFault, ShiftViolation, TrainTimes};
use crate::session::{Evaluation, Session};

/// Why a dataset could not be turned into a session.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    TrainId(#[from] InvalidTrainId),

    #[error(transparent)]
    Class(#[from] InvalidTrainClass),

    #[error(transparent)]
    Direction(#[from] InvalidDirection),

    #[error("train {train}: {source}")]
    Start { train: String, source: TimeError },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// A time given either as minutes or as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TimeValue {
    Minutes(Minutes),
    Clock(String),
}

impl TimeValue {
    pub fn to_minutes(&self) -> Result<Minutes, TimeError> {
        match self {
            TimeValue::Minutes(m) => Ok(*m),
            TimeValue::Clock(s) => parse_hhmm(s),
        }
    }
}

/// A station row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationRow {
    pub name: String,

    /// Position along the line in kilometres
    pub km: f64,
}

/// A segment row. Informational only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmentRow {
    pub from: String,
    pub to: String,
}

/// A train row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainRow {
    pub id: String,

    /// Class code, e.g. "P", "F" or "YHT"
    pub class: String,

    /// "up" or "down"
    pub direction: String,

    pub origin: String,

    #[serde(default)]
    pub destination: Option<String>,

    /// Requested start, minutes or "HH:MM"
    pub start: TimeValue,

    /// Dwell minutes per station name
    #[serde(default)]
    pub dwell: BTreeMap<String, Minutes>,
}

/// A running-time row.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeRow {
    pub from: String,
    pub to: String,

    /// Any train class code; freight codes select the freight table
    pub class: String,

    pub minutes: Minutes,
}

/// A complete dataset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetRequest {
    pub stations: Vec<StationRow>,

    #[serde(default)]
    pub segments: Vec<SegmentRow>,

    #[serde(default)]
    pub trains: Vec<TrainRow>,

    #[serde(default)]
    pub runtimes: Vec<RuntimeRow>,
}

impl DatasetRequest {
    /// Parse every row and load the result into a fresh session.
    pub fn into_session(self) -> Result<Session, DatasetError> {
        let stations = self
            .stations
            .into_iter()
            .map(|s| Station::new(s.name, s.km))
            .collect();
        let segments = self.segments.into_iter().map(|s| (s.from, s.to)).collect();

        let trains = self
            .trains
            .into_iter()
            .map(TrainRow::into_train)
            .collect::<Result<Vec<_>, _>>()?;

        let runtimes = self
            .runtimes
            .into_iter()
            .map(|r| {
                let class: TrainClass = r.class.parse()?;
                Ok(RunningTime::new(r.from, r.to, class.runtime_class(), r.minutes))
            })
            .collect::<Result<Vec<_>, DatasetError>>()?;

        Ok(Session::new(stations, segments, trains, runtimes)?)
    }
}

impl TrainRow {
    fn into_train(self) -> Result<Train, DatasetError> {
        let id = TrainId::new(&self.id)?;
        let class: TrainClass = self.class.parse()?;
        let direction: Direction = self.direction.parse()?;
        let start = self.start.to_minutes().map_err(|source| DatasetError::Start {
            train: self.id.clone(),
            source,
        })?;

        let mut train = Train::new(id, class, direction, self.origin, start);
        train.destination = self.destination.filter(|d| !d.trim().is_empty());
        train.dwell = self.dwell;
        Ok(train)
    }
}

/// Summary of a loaded dataset.
#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    pub stations: usize,
    pub trains: usize,
    pub runtimes: usize,
    pub unknown_stations: Vec<String>,
}

impl DatasetResponse {
    pub fn from_session(session: &Session) -> Self {
        Self {
            stations: session.topology().len(),
            trains: session.trains().len(),
            runtimes: session.runtimes().len(),
            unknown_stations: session.unknown_stations(),
        }
    }
}

/// Conflict rule overrides. Missing fields keep the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesParams {
    pub headway_mins: Option<Minutes>,
    pub clearance_mins: Option<Minutes>,
    pub station_slack_mins: Option<Minutes>,
}

impl RulesParams {
    pub fn to_rules(&self) -> ConflictRules {
        let d = ConflictRules::default();
        ConflictRules::new(
            self.headway_mins.unwrap_or(d.headway_mins),
            self.clearance_mins.unwrap_or(d.clearance_mins),
            self.station_slack_mins.unwrap_or(d.station_slack_mins),
        )
    }
}

/// One stop in a train's time table.
#[derive(Debug, Serialize)]
pub struct StopResult {
    pub station: String,
    pub arrival: Minutes,
    pub arrival_hhmm: String,
    pub departure: Minutes,
    pub departure_hhmm: String,
}

/// A train's propagated times.
#[derive(Debug, Serialize)]
pub struct TrainTimesResult {
    pub train: String,
    pub complete: bool,
    pub stops: Vec<StopResult>,
}

impl TrainTimesResult {
    pub fn from_times(topology: &Topology, train: Option<&Train>, times: &TrainTimes) -> Self {
        let stops = times
            .arrivals()
            .iter()
            .map(|&(station, arrival)| {
                let name = topology.name(station).to_string();
                let departure = arrival + train.map_or(0, |t| t.dwell_at(&name));
                StopResult {
                    station: name,
                    arrival,
                    arrival_hhmm: format_hhmm(arrival),
                    departure,
                    departure_hhmm: format_hhmm(departure),
                }
            })
            .collect();
        Self {
            train: times.train().to_string(),
            complete: times.is_complete(),
            stops,
        }
    }
}

/// A missing running time.
#[derive(Debug, Serialize)]
pub struct FaultResult {
    pub train: String,
    pub class: String,
    pub from: String,
    pub to: String,
    pub message: String,
}

impl FaultResult {
    pub fn from_fault(fault: &MissingRuntimeFault) -> Self {
        Self {
            train: fault.train.to_string(),
            class: fault.class.to_string(),
            from: fault.from.clone(),
            to: fault.to.clone(),
            message: fault.to_string(),
        }
    }
}

/// A detected conflict.
#[derive(Debug, Serialize)]
pub struct ConflictResult {
    pub first: String,
    pub second: String,

    /// Segment as "Low-High"
    pub segment: String,

    pub start: Minutes,
    pub end: Minutes,

    /// Interval as "HH:MM-HH:MM"
    pub interval: String,

    pub same_direction: bool,
    pub text: String,
}

impl ConflictResult {
    pub fn from_conflict(topology: &Topology, conflict: &Conflict) -> Self {
        Self {
            first: conflict.first.to_string(),
            second: conflict.second.to_string(),
            segment: topology.describe(conflict.segment),
            start: conflict.interval.start,
            end: conflict.interval.end,
            interval: conflict.interval.to_string(),
            same_direction: conflict.same_direction,
            text: conflict.describe(topology),
        }
    }
}

/// Response for the time table.
#[derive(Debug, Serialize)]
pub struct TimetableResponse {
    pub trains: Vec<TrainTimesResult>,
    pub faults: Vec<FaultResult>,
    pub conflicts: Vec<ConflictResult>,
}

impl TimetableResponse {
    pub fn from_evaluation(session: &Session, eval: &Evaluation) -> Self {
        let topology = session.topology();
        Self {
            trains: eval
                .timetable
                .iter()
                .map(|t| TrainTimesResult::from_times(topology, session.train(t.train()), t))
                .collect(),
            faults: eval.faults.iter().map(FaultResult::from_fault).collect(),
            conflicts: eval
                .conflicts
                .iter()
                .map(|c| ConflictResult::from_conflict(topology, c))
                .collect(),
        }
    }
}

/// Response for the conflict list.
#[derive(Debug, Serialize)]
pub struct ConflictsResponse {
    pub conflicts: Vec<ConflictResult>,
}

/// A start shift beyond the class limit.
#[derive(Debug, Serialize)]
pub struct ViolationResult {
    pub train: String,
    pub class: String,
    pub delta: Minutes,
    pub limit: Minutes,
}

impl ViolationResult {
    pub fn from_violation(v: &ShiftViolation) -> Self {
        Self {
            train: v.train.to_string(),
            class: v.class.to_string(),
            delta: v.delta,
            limit: v.limit,
        }
    }
}

/// Response for shift-limit warnings.
#[derive(Debug, Serialize)]
pub struct WarningsResponse {
    pub violations: Vec<ViolationResult>,
}

/// Request to accept current starts into the baseline.
#[derive(Debug, Default, Deserialize)]
pub struct AcceptRequest {
    /// One train, or every train when absent
    #[serde(default)]
    pub train: Option<String>,
}

/// Request to shift a train's start.
#[derive(Debug, Deserialize)]
pub struct ShiftRequest {
    pub minutes: Minutes,
}

/// Response after shifting a train.
#[derive(Debug, Serialize)]
pub struct ShiftResponse {
    pub train: String,
    pub start: Minutes,
    pub start_hhmm: String,
}

/// Request to set one dwell value.
#[derive(Debug, Deserialize)]
pub struct DwellRequest {
    pub station: String,
    pub minutes: Minutes,
}

/// Request to run greedy repair.
#[derive(Debug, Default, Deserialize)]
pub struct RepairRequest {
    #[serde(flatten)]
    pub rules: RulesParams,
    pub max_iterations: Option<usize>,
    pub dwell_cap_mins: Option<Minutes>,
}

impl RepairRequest {
    pub fn to_config(&self) -> RepairConfig {
        let d = RepairConfig::default();
        RepairConfig::new(
            self.max_iterations.unwrap_or(d.max_iterations),
            self.dwell_cap_mins.unwrap_or(d.dwell_cap_mins),
        )
    }
}

/// Response for greedy repair.
#[derive(Debug, Serialize)]
pub struct RepairResponse {
    pub iterations: usize,
    pub remaining: usize,
    pub log: Vec<String>,
}

impl RepairResponse {
    pub fn from_outcome(outcome: &RepairOutcome) -> Self {
        Self {
            iterations: outcome.iterations,
            remaining: outcome.remaining,
            log: outcome.log(),
        }
    }
}

/// Request for suggestions.
#[derive(Debug, Default, Deserialize)]
pub struct SuggestRequest {
    #[serde(flatten)]
    pub rules: RulesParams,
    pub dwell_cap_mins: Option<Minutes>,
    pub dwell_cost: Option<Minutes>,
    pub shift_cost: Option<Minutes>,
}

impl SuggestRequest {
    pub fn to_costs(&self) -> SuggestionCosts {
        let d = SuggestionCosts::default();
        SuggestionCosts::new(
            self.dwell_cost.unwrap_or(d.dwell_per_min),
            self.shift_cost.unwrap_or(d.shift_per_min),
        )
    }

    pub fn to_repair(&self) -> RepairConfig {
        RepairConfig {
            dwell_cap_mins: self
                .dwell_cap_mins
                .unwrap_or(RepairConfig::default().dwell_cap_mins),
            ..RepairConfig::default()
        }
    }
}

/// One suggestion.
#[derive(Debug, Serialize)]
pub struct SuggestionResult {
    pub train: String,
    pub station: Option<String>,
    pub dwell: Minutes,
    pub shift: Minutes,
    pub text: String,
}

impl SuggestionResult {
    pub fn from_suggestion(s: &Suggestion) -> Self {
        Self {
            train: s.train.to_string(),
            station: s.station.clone(),
            dwell: s.dwell,
            shift: s.shift,
            text: s.text.clone(),
        }
    }
}

/// Response for suggestions.
#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<SuggestionResult>,
}

/// Request to run the optimizer.
#[derive(Debug, Default, Deserialize)]
pub struct OptimizeRequest {
    #[serde(flatten)]
    pub rules: RulesParams,
    pub node_separation_mins: Option<Minutes>,
    pub max_extra_dwell_mins: Option<Minutes>,
    pub dwell_cap_mins: Option<Minutes>,
    pub time_limit_secs: Option<u64>,
    pub weight_dwell: Option<f64>,
    pub weight_shift: Option<f64>,
    pub weight_compact: Option<f64>,
    pub allow_drop: Option<bool>,
}

impl OptimizeRequest {
    pub fn to_config(&self) -> OptimizerConfig {
        let d = OptimizerConfig::default();
        OptimizerConfig {
            node_separation_mins: self.node_separation_mins.unwrap_or(d.node_separation_mins),
            max_extra_dwell_mins: self.max_extra_dwell_mins.unwrap_or(d.max_extra_dwell_mins),
            dwell_cap_mins: self.dwell_cap_mins.unwrap_or(d.dwell_cap_mins),
            time_limit: self
                .time_limit_secs
                .map(Duration::from_secs)
                .unwrap_or(d.time_limit),
            weight_dwell: self.weight_dwell.unwrap_or(d.weight_dwell),
            weight_shift: self.weight_shift.unwrap_or(d.weight_shift),
            weight_compact: self.weight_compact.unwrap_or(d.weight_compact),
            allow_drop: self.allow_drop.unwrap_or(d.allow_drop),
            ..d
        }
    }
}

/// Extra dwell chosen by the optimizer.
#[derive(Debug, Serialize)]
pub struct DwellResult {
    pub train: String,
    pub station: String,
    pub minutes: Minutes,
}

/// Response for the optimizer.
#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub status: String,
    pub usable: bool,
    pub shifts: BTreeMap<String, Minutes>,
    pub extra_dwell: Vec<DwellResult>,
    pub placed: Vec<String>,
    pub dropped: Vec<String>,
}

impl OptimizeResponse {
    pub fn from_outcome(outcome: &OptimizeOutcome) -> Self {
        Self {
            status: outcome.status.to_string(),
            usable: outcome.is_usable(),
            shifts: outcome
                .shifts
                .iter()
                .map(|(id, m)| (id.to_string(), *m))
                .collect(),
            extra_dwell: outcome
                .extra_dwell
                .iter()
                .map(|d| DwellResult {
                    train: d.train.to_string(),
                    station: d.station.clone(),
                    minutes: d.minutes,
                })
                .collect(),
            placed: outcome.placed.iter().map(ToString::to_string).collect(),
            dropped: outcome.dropped.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Request to run the full pipeline.
#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    #[serde(flatten)]
    pub optimizer: OptimizeRequest,
    pub max_iterations: Option<usize>,
}

impl ResolveRequest {
    pub fn to_repair(&self) -> RepairConfig {
        let d = RepairConfig::default();
        RepairConfig::new(
            self.max_iterations.unwrap_or(d.max_iterations),
            self.optimizer.dwell_cap_mins.unwrap_or(d.dwell_cap_mins),
        )
    }
}

/// Response for the full pipeline.
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub strategies: Vec<String>,
    pub optimizer: Option<OptimizeResponse>,

    /// Why the optimizer did not run
    pub skipped: Option<String>,

    pub repair: Option<RepairResponse>,
    pub remaining: usize,
}

impl ResolveResponse {
    pub fn from_resolution(res: &Resolution) -> Self {
        Self {
            strategies: res.strategies.iter().map(ToString::to_string).collect(),
            optimizer: res.optimizer.as_ref().map(OptimizeResponse::from_outcome),
            skipped: res.skipped.as_ref().map(ToString::to_string),
            repair: res.repair.as_ref().map(RepairResponse::from_outcome),
            remaining: res.remaining,
        }
    }
}

/// Response listing unknown station names.
#[derive(Debug, Serialize)]
pub struct UnknownStationsResponse {
    pub stations: Vec<String>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
