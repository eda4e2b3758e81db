use crate::config::{Config, PathfindingType};
use crate::cost::ModeWeights;
use crate::enumerator::Enumerator;
use crate::error::{PathfindingError, PathfindingResult};
use crate::finalizer::finalize;
use crate::labeler::Labeler;
use crate::network::{Network, StopIndex, SupplyModeIndex, Timestamp, TripIndex, ZoneIndex};
use crate::path::Pathset;
use crate::weights::WeightBook;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimeTarget {
    Arrival,
    Departure,
}

// One person-trip to route.
#[derive(Clone, Debug)]
pub struct Request {
    pub person_id: Box<str>,
    pub person_trip_id: Box<str>,
    pub origin: ZoneIndex,
    pub destination: ZoneIndex,
    pub preferred_time: Timestamp,
    pub time_target: TimeTarget,
    // Dollars per hour; converts fares into equivalent minutes.
    pub value_of_time: f64,
    pub user_class: Box<str>,
    pub purpose: Box<str>,
    pub access_modes: Vec<Box<str>>,
    pub transit_mode: Box<str>,
    pub egress_modes: Vec<Box<str>>,
    pub pnr_ids: Vec<Box<str>>,
    pub trace: bool,
    // Soft deadlines; the search returns whatever labels exist on expiry.
    pub label_budget: Option<u64>,
    pub time_budget: Option<Duration>,
}

impl Request {
    fn validate(&self, network: &Network) -> PathfindingResult<()> {
        if !(self.value_of_time > 0.0) {
            return Err(PathfindingError::InvariantViolation(format!(
                "request {} has non-positive value of time",
                self.person_trip_id
            )));
        }
        if self.origin as usize >= network.zones.len()
            || self.destination as usize >= network.zones.len()
        {
            return Err(PathfindingError::InvariantViolation(format!(
                "request {} references an unknown zone",
                self.person_trip_id
            )));
        }
        Ok(())
    }
}

// Capacity feedback from the outer assignment loop: boarding thresholds for
// (trip, stop) pairs that bumped passengers, keyed by trip or by supply mode.
// Snapshotted at request start and never mutated by the core.
#[derive(Clone, Debug, Default)]
pub struct CapacityState {
    trip_stop: HashMap<(TripIndex, StopIndex), Timestamp>,
    mode_stop: HashMap<(SupplyModeIndex, StopIndex), Timestamp>,
}

impl CapacityState {
    pub fn mark_trip_stop(&mut self, trip: TripIndex, stop: StopIndex, bumped_at: Timestamp) {
        let entry = self.trip_stop.entry((trip, stop)).or_insert(bumped_at);
        *entry = (*entry).max(bumped_at);
    }

    pub fn mark_mode_stop(&mut self, mode: SupplyModeIndex, stop: StopIndex, bumped_at: Timestamp) {
        let entry = self.mode_stop.entry((mode, stop)).or_insert(bumped_at);
        *entry = (*entry).max(bumped_at);
    }

    // The most restrictive threshold applying to this boarding, if any.
    pub fn bump_time(
        &self,
        trip: TripIndex,
        mode: SupplyModeIndex,
        stop: StopIndex,
    ) -> Option<Timestamp> {
        let by_trip = self.trip_stop.get(&(trip, stop)).copied();
        let by_mode = self.mode_stop.get(&(mode, stop)).copied();
        match (by_trip, by_mode) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trip_stop.is_empty() && self.mode_stop.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    pub label_iterations: u64,
    pub max_process_count: u32,
    pub num_sampled: usize,
    pub elapsed: Duration,
    pub trace: Vec<String>,
}

#[derive(Debug)]
pub struct PathsetResult {
    pub pathset: Pathset,
    pub chosen_index: usize,
    // True when a soft deadline expired and the pathset was sampled from a
    // partial hyperpath.
    pub incomplete: bool,
    pub diagnostics: Diagnostics,
}

// Deterministic per-request RNG stream from (person-trip id, iteration).
pub fn seeded_rng(person_trip_id: &str, iteration: u32) -> fastrand::Rng {
    // FNV-1a over the id, folded with the iteration.
    let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in person_trip_id.bytes() {
        seed ^= byte as u64;
        seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
    }
    seed ^= iteration as u64;
    seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
    fastrand::Rng::with_seed(seed)
}

// The core's public entry point: one request, one pathfinding iteration.
pub fn find_paths(
    network: &Network,
    weights: &WeightBook,
    config: &Config,
    request: &Request,
    capacity: &CapacityState,
    rng: &mut fastrand::Rng,
) -> PathfindingResult<PathsetResult> {
    config.validate()?;
    request.validate(network)?;
    if config.pathfinding_type == PathfindingType::File {
        return Err(PathfindingError::InvariantViolation(
            "pathfinding_type `file` is handled outside the core".to_owned(),
        ));
    }
    let stochastic = config.pathfinding_type == PathfindingType::Stochastic;
    let started = Instant::now();

    let labels = Labeler::new(network, weights, config, request, capacity, stochastic).run()?;
    let mut modes = ModeWeights::new(weights, request);
    let sampled = Enumerator::new(network, config, request, &labels).enumerate(&mut modes, rng)?;
    let num_sampled = sampled.len();
    let (pathset, chosen_index) = finalize(network, config, request, &mut modes, sampled, rng)?;

    Ok(PathsetResult {
        pathset,
        chosen_index,
        incomplete: labels.incomplete,
        diagnostics: Diagnostics {
            label_iterations: labels.label_iterations,
            max_process_count: labels.max_process_count,
            num_sampled,
            elapsed: started.elapsed(),
            trace: labels.trace,
        },
    })
}

pub struct IterationOutcome {
    pub results: Vec<PathfindingResult<PathsetResult>>,
    // Indices of requests that found no path this iteration; bookkeeping for
    // the outer loop, not retried here.
    pub failed: Vec<usize>,
}

// Runs every request of one pathfinding iteration. The outer loop decides
// which requests need re-pathing; the core makes no assumptions about the
// iteration count.
pub fn run_iteration(
    network: &Network,
    weights: &WeightBook,
    config: &Config,
    requests: &[Request],
    capacity: &CapacityState,
    iteration: u32,
) -> IterationOutcome {
    let mut results = Vec::with_capacity(requests.len());
    let mut failed = Vec::new();
    for (idx, request) in requests.iter().enumerate() {
        let mut rng = seeded_rng(&request.person_trip_id, iteration);
        let result = find_paths(network, weights, config, request, capacity, &mut rng);
        if let Err(error) = &result {
            log::warn!(
                "Request {} failed in iteration {iteration}: {error}",
                request.person_trip_id
            );
            failed.push(idx);
        }
        results.push(result);
    }
    IterationOutcome { results, failed }
}
