//! Segment occupancy and pairwise conflict detection.
//!
//! A train occupies the segment between consecutive path stations `u` and `v`
//! from its departure at `u` (arrival plus dwell) until its arrival at `v`.
//! Two trains on the same physical segment conflict when their windows,
//! trimmed by the station slack, violate the headway rule (same direction)
//! or the clearance rule (opposite direction).

use std::fmt;

use tracing::debug;

use super::config::ConflictRules;
use super::timetable::TrainTimes;
use crate::domain::{
    Direction, Minutes, PhysicalSegment, StationIdx, Topology, Train, TrainId, format_hhmm,
};

/// A closed span of minutes. `start > end` is allowed and means the span is
/// empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: Minutes,
    pub end: Minutes,
}

impl Interval {
    pub fn new(start: Minutes, end: Minutes) -> Self {
        Self { start, end }
    }

    /// Shrink both ends by `slack`.
    pub fn trimmed(self, slack: Minutes) -> Self {
        Self {
            start: self.start + slack,
            end: self.end - slack,
        }
    }

    /// Zero or negative length.
    pub fn is_degenerate(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_hhmm(self.start), format_hhmm(self.end))
    }
}

/// One train's occupation of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupancyWindow {
    pub segment: PhysicalSegment,
    /// Station the train enters the segment from.
    pub from: StationIdx,
    pub to: StationIdx,
    pub span: Interval,
}

/// All windows of one train, in path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainWindows {
    pub train: TrainId,
    pub direction: Direction,
    pub windows: Vec<OccupancyWindow>,
}

impl TrainWindows {
    /// The window on `segment`, if the train reaches it.
    pub fn on(&self, segment: PhysicalSegment) -> Option<&OccupancyWindow> {
        self.windows.iter().find(|w| w.segment == segment)
    }
}

/// Derive a train's occupancy windows from its propagated times.
///
/// Windows stop where the time table stops, so a partial table yields only
/// the windows of the reachable prefix.
pub fn occupancy_windows(topology: &Topology, train: &Train, times: &TrainTimes) -> TrainWindows {
    let windows = times
        .arrivals()
        .windows(2)
        .map(|pair| {
            let (u, arr_u) = pair[0];
            let (v, arr_v) = pair[1];
            OccupancyWindow {
                segment: PhysicalSegment::new(u, v),
                from: u,
                to: v,
                span: Interval::new(arr_u + train.dwell_at(topology.name(u)), arr_v),
            }
        })
        .collect();

    TrainWindows {
        train: train.id.clone(),
        direction: train.direction,
        windows,
    }
}

/// A violated separation rule between two trains on one segment.
///
/// For same-direction conflicts `first` is the leader (earlier trimmed
/// entry, then earlier exit). For opposite-direction conflicts the pair
/// follows input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub first: TrainId,
    pub second: TrainId,
    pub segment: PhysicalSegment,
    /// Overlap of the trimmed windows: latest start to earliest end. Inverted
    /// when the windows are disjoint but too close.
    pub interval: Interval,
    pub same_direction: bool,
    /// Trimmed window of `first`.
    pub first_window: Interval,
    /// Trimmed window of `second`.
    pub second_window: Interval,
}

impl Conflict {
    /// Whether `train` is one of the two trains.
    pub fn involves(&self, train: &TrainId) -> bool {
        &self.first == train || &self.second == train
    }

    /// Render the conflict with station names.
    pub fn describe(&self, topology: &Topology) -> String {
        let kind = if self.same_direction {
            "same direction"
        } else {
            "opposite direction"
        };
        format!(
            "{} x {} on {} [{}] {kind}",
            self.first,
            self.second,
            topology.describe(self.segment),
            self.interval
        )
    }
}

/// Compare every window of `a` with every window of `b` on the same segment.
pub fn detect_pair(a: &TrainWindows, b: &TrainWindows, rules: &ConflictRules) -> Vec<Conflict> {
    let same = a.direction == b.direction;
    let slack = rules.station_slack_mins;
    let mut out = Vec::new();

    for wa in &a.windows {
        for wb in b.windows.iter().filter(|wb| wb.segment == wa.segment) {
            let ca = wa.span.trimmed(slack);
            let cb = wb.span.trimmed(slack);
            if ca.is_degenerate() || cb.is_degenerate() {
                continue;
            }
            let interval = Interval::new(ca.start.max(cb.start), ca.end.min(cb.end));

            if same {
                // Equal entries: the earlier exit leads.
                let b_leads = (cb.start, cb.end) < (ca.start, ca.end);
                let ((lead, lw), (follow, fw)) = if b_leads {
                    ((&b.train, cb), (&a.train, ca))
                } else {
                    ((&a.train, ca), (&b.train, cb))
                };
                let enter_ok = fw.start - lw.start >= rules.headway_mins;
                let exit_ok = fw.end - lw.end >= rules.headway_mins;
                if !(enter_ok && exit_ok) {
                    out.push(Conflict {
                        first: lead.clone(),
                        second: follow.clone(),
                        segment: wa.segment,
                        interval,
                        same_direction: true,
                        first_window: lw,
                        second_window: fw,
                    });
                }
            } else {
                let separated = ca.end + rules.clearance_mins <= cb.start
                    || cb.end + rules.clearance_mins <= ca.start;
                if !separated {
                    out.push(Conflict {
                        first: a.train.clone(),
                        second: b.train.clone(),
                        segment: wa.segment,
                        interval,
                        same_direction: false,
                        first_window: ca,
                        second_window: cb,
                    });
                }
            }
        }
    }
    out
}

/// Detect conflicts over every unordered pair of trains.
pub fn detect_conflicts(trains: &[TrainWindows], rules: &ConflictRules) -> Vec<Conflict> {
    let mut out = Vec::new();
    for (i, a) in trains.iter().enumerate() {
        for b in &trains[i + 1..] {
            out.extend(detect_pair(a, b, rules));
        }
    }
    debug!(trains = trains.len(), conflicts = out.len(), "detected conflicts");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Station;

    fn seg() -> PhysicalSegment {
        PhysicalSegment::new(StationIdx(0), StationIdx(1))
    }

    fn windows(id: &str, direction: Direction, spans: &[(Minutes, Minutes)]) -> TrainWindows {
        let (from, to) = match direction {
            Direction::Up => (StationIdx(0), StationIdx(1)),
            Direction::Down => (StationIdx(1), StationIdx(0)),
        };
        TrainWindows {
            train: TrainId::new(id).unwrap(),
            direction,
            windows: spans
                .iter()
                .map(|&(s, e)| OccupancyWindow {
                    segment: seg(),
                    from,
                    to,
                    span: Interval::new(s, e),
                })
                .collect(),
        }
    }

    fn no_slack(headway: Minutes, clearance: Minutes) -> ConflictRules {
        ConflictRules::new(headway, clearance, 0)
    }

    #[test]
    fn identical_same_direction_trains_conflict() {
        let a = windows("A", Direction::Up, &[(0, 60)]);
        let b = windows("B", Direction::Up, &[(0, 60)]);

        let found = detect_pair(&a, &b, &no_slack(5, 3));

        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert!(c.same_direction);
        assert_eq!(c.interval, Interval::new(0, 60));
        assert_eq!(c.first.as_str(), "A");
        assert_eq!(c.second.as_str(), "B");
    }

    #[test]
    fn same_direction_pair_is_reported_lead_first() {
        let a = windows("A", Direction::Up, &[(2, 62)]);
        let b = windows("B", Direction::Up, &[(0, 60)]);

        let found = detect_pair(&a, &b, &no_slack(5, 3));

        assert_eq!(found[0].first.as_str(), "B");
        assert_eq!(found[0].second.as_str(), "A");
        assert_eq!(found[0].first_window, Interval::new(0, 60));
    }

    #[test]
    fn headway_met_exactly_is_clear() {
        let a = windows("A", Direction::Up, &[(0, 60)]);
        let b = windows("B", Direction::Up, &[(5, 65)]);
        assert!(detect_pair(&a, &b, &no_slack(5, 3)).is_empty());
    }

    #[test]
    fn overtaking_fails_on_exit_gap() {
        let slow = windows("S", Direction::Up, &[(0, 60)]);
        let fast = windows("F", Direction::Up, &[(10, 40)]);
        let found = detect_pair(&slow, &fast, &no_slack(5, 3));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first.as_str(), "S");
    }

    #[test]
    fn opposite_direction_clearance() {
        let a = windows("A", Direction::Up, &[(0, 60)]);
        let clear = windows("B", Direction::Down, &[(65, 125)]);
        assert!(detect_pair(&a, &clear, &no_slack(5, 3)).is_empty());

        let tight = windows("B", Direction::Down, &[(62, 120)]);
        let found = detect_pair(&a, &tight, &no_slack(5, 3));
        assert_eq!(found.len(), 1);
        assert!(!found[0].same_direction);
        assert_eq!(found[0].interval, Interval::new(62, 60));
    }

    #[test]
    fn clearance_met_exactly_is_clear() {
        let a = windows("A", Direction::Up, &[(0, 60)]);
        let b = windows("B", Direction::Down, &[(63, 120)]);
        assert!(detect_pair(&a, &b, &no_slack(5, 3)).is_empty());
    }

    #[test]
    fn slack_trims_both_windows() {
        let a = windows("A", Direction::Up, &[(0, 60)]);
        let b = windows("B", Direction::Down, &[(61, 120)]);
        assert_eq!(detect_pair(&a, &b, &no_slack(5, 3)).len(), 1);
        // 59 + 3 <= 62 once both ends are trimmed by one minute.
        assert!(detect_pair(&a, &b, &ConflictRules::new(5, 3, 1)).is_empty());
    }

    #[test]
    fn degenerate_windows_are_skipped() {
        let a = windows("A", Direction::Up, &[(0, 2)]);
        let b = windows("B", Direction::Up, &[(0, 60)]);
        assert!(detect_pair(&a, &b, &ConflictRules::new(5, 3, 1)).is_empty());
    }

    #[test]
    fn other_segments_never_compare() {
        let a = windows("A", Direction::Up, &[(0, 60)]);
        let mut b = windows("B", Direction::Up, &[(0, 60)]);
        b.windows[0].segment = PhysicalSegment::new(StationIdx(1), StationIdx(2));
        assert!(detect_pair(&a, &b, &no_slack(5, 3)).is_empty());
    }

    #[test]
    fn detect_conflicts_covers_all_pairs() {
        let trains = [
            windows("A", Direction::Up, &[(0, 60)]),
            windows("B", Direction::Up, &[(1, 61)]),
            windows("C", Direction::Down, &[(30, 90)]),
        ];
        let found = detect_conflicts(&trains, &no_slack(5, 3));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn describe_uses_station_names() {
        let topo = Topology::new([Station::new("A", 0.0), Station::new("B", 50.0)]).unwrap();
        let a = windows("T1", Direction::Up, &[(0, 60)]);
        let b = windows("T2", Direction::Up, &[(0, 60)]);
        let c = &detect_pair(&a, &b, &no_slack(5, 3))[0];
        assert_eq!(c.describe(&topo), "T1 x T2 on A-B [00:00-01:00] same direction");
    }
}
