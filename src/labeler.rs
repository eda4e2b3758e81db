use crate::config::Config;
use crate::cost::{estimated_transit_fare, CostEngine, ModeWeights};
use crate::dispatcher::{CapacityState, Request, TimeTarget};
use crate::error::{PathfindingError, PathfindingResult};
use crate::network::{
    Cost, FarePeriodIndex, Network, StopIndex, SupplyModeIndex, Timestamp, TripIndex, MAX_COST,
};
use crate::utils;
use crate::weights::WeightBook;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

// Anchored at the destination (searching backward in time) or at the origin
// (forward). Derived from the request's time target.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SearchDirection {
    Outbound,
    Inbound,
}

impl SearchDirection {
    pub fn from_time_target(target: TimeTarget) -> Self {
        match target {
            TimeTarget::Arrival => SearchDirection::Outbound,
            TimeTarget::Departure => SearchDirection::Inbound,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LabelMode {
    Access { supply: SupplyModeIndex },
    Egress { supply: SupplyModeIndex },
    Transfer,
    Trip {
        trip: TripIndex,
        board_seq: u32,
        alight_seq: u32,
    },
}

impl LabelMode {
    pub fn is_trip(&self) -> bool {
        matches!(self, LabelMode::Trip { .. })
    }

    pub fn is_walk(&self) -> bool {
        !self.is_trip()
    }
}

// A candidate sub-path from this node to the search anchor. `deparr_time` is
// the clock at this node (departure for outbound, arrival for inbound);
// `arrdep_time` is the clock at the other end of the link.
#[derive(Clone, Copy, Debug)]
pub struct StopLabel {
    pub cost: Cost,
    pub deparr_time: Timestamp,
    pub arrdep_time: Timestamp,
    pub mode: LabelMode,
    // Next stop toward the anchor; None once the link reaches the anchor zone.
    pub succ: Option<StopIndex>,
    pub link_time: i32,
    pub link_cost: Cost,
    pub link_dist: f64,
    pub fare: f64,
    pub fare_period: Option<FarePeriodIndex>,
    pub iteration: u64,
}

// The label collection at one stop. In stochastic search its cost is the
// log-sum over all labels; deterministic search keeps a single label.
#[derive(Clone, Debug)]
pub struct Hyperlink {
    pub labels: Vec<StopLabel>,
    pub cost: Cost,
    exp_sum: f64,
    nonwalk_exp_sum: f64,
    // Latest departure across labels for outbound, earliest arrival for
    // inbound; the effective anchor when this stop is processed.
    pub time_anchor: Timestamp,
    pub process_count: u32,
    done: bool,
}

impl Hyperlink {
    fn new() -> Self {
        Self {
            labels: Vec::new(),
            cost: MAX_COST,
            exp_sum: 0.0,
            nonwalk_exp_sum: 0.0,
            time_anchor: 0,
            process_count: 0,
            done: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn has_trip_labels(&self) -> bool {
        self.labels.iter().any(|l| l.mode.is_trip())
    }

    // Log-sum over the transit labels only; walking may not chain onto
    // another walk, so transfers and access links combine over this.
    pub fn nonwalk_cost(&self, theta: f64) -> Option<Cost> {
        if self.nonwalk_exp_sum > 0.0 {
            Some(-self.nonwalk_exp_sum.ln() / theta)
        } else {
            None
        }
    }

    fn rebuild(&mut self, theta: f64, dir: SearchDirection) {
        self.exp_sum = 0.0;
        self.nonwalk_exp_sum = 0.0;
        self.time_anchor = match dir {
            SearchDirection::Outbound => Timestamp::MIN,
            SearchDirection::Inbound => Timestamp::MAX,
        };
        for label in &self.labels {
            let mass = (-theta * label.cost).exp();
            self.exp_sum += mass;
            if label.mode.is_trip() {
                self.nonwalk_exp_sum += mass;
            }
            self.time_anchor = match dir {
                SearchDirection::Outbound => self.time_anchor.max(label.deparr_time),
                SearchDirection::Inbound => self.time_anchor.min(label.deparr_time),
            };
        }
        self.cost = -self.exp_sum.ln() / theta;
    }
}

// The labeled hypergraph handed to the enumerator.
pub struct Labels {
    pub dir: SearchDirection,
    pub hyperlinks: Vec<Hyperlink>,
    // Labels at the non-anchor zone: one per usable access (outbound) or
    // egress (inbound) link, already combined with the stop costs.
    pub zone_labels: Vec<StopLabel>,
    pub label_iterations: u64,
    pub max_process_count: u32,
    pub incomplete: bool,
    pub trace: Vec<String>,
}

struct QueueEntry {
    cost: Cost,
    seq: u64,
    stop: StopIndex,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Min-priority by cost with FIFO tie-breaks, which makes deterministic
    // search bit-reproducible.
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then(self.seq.cmp(&other.seq))
            .then(self.stop.cmp(&other.stop))
    }
}

// Snapshot of the stop being processed, taken before relaxation mutates the
// label arrays.
struct SourceState {
    anchor: Timestamp,
    // Basis cost for extending by a trip: the single label cost
    // (deterministic) or the full hyperlink log-sum (stochastic).
    trip_basis: Cost,
    // Basis for extending by a transfer: only transit labels may feed a walk.
    transfer_basis: Option<Cost>,
    // Whether a boarding here chains directly onto another trip.
    zero_walk_transfer: bool,
    // Fare period approximated from the downstream transit labels.
    downstream_fare_period: Option<FarePeriodIndex>,
}

pub struct Labeler<'a> {
    network: &'a Network,
    config: &'a Config,
    request: &'a Request,
    capacity: &'a CapacityState,
    engine: CostEngine,
    modes: ModeWeights<'a>,
    pub dir: SearchDirection,
    stochastic: bool,
    hyperlinks: Vec<Hyperlink>,
    queue: BinaryHeap<std::cmp::Reverse<QueueEntry>>,
    queue_seq: u64,
    label_iterations: u64,
    max_process_count: u32,
    incomplete: bool,
    trace: Vec<String>,
}

impl<'a> Labeler<'a> {
    pub fn new(
        network: &'a Network,
        weights: &'a WeightBook,
        config: &'a Config,
        request: &'a Request,
        capacity: &'a CapacityState,
        stochastic: bool,
    ) -> Self {
        Self {
            network,
            config,
            request,
            capacity,
            engine: CostEngine::new(config),
            modes: ModeWeights::new(weights, request),
            dir: SearchDirection::from_time_target(request.time_target),
            stochastic,
            hyperlinks: (0..network.num_stops()).map(|_| Hyperlink::new()).collect(),
            queue: BinaryHeap::new(),
            queue_seq: 0,
            label_iterations: 0,
            max_process_count: 0,
            incomplete: false,
            trace: Vec::new(),
        }
    }

    pub fn run(mut self) -> PathfindingResult<Labels> {
        let started = Instant::now();
        self.seed_anchor()?;

        let max_process = self.config.stochastic_max_stop_process_count;
        while let Some(std::cmp::Reverse(entry)) = self.queue.pop() {
            self.label_iterations += 1;
            if let Some(budget) = self.request.label_budget {
                if self.label_iterations > budget {
                    self.incomplete = true;
                    break;
                }
            }
            if let Some(deadline) = self.request.time_budget {
                if started.elapsed() > deadline {
                    self.incomplete = true;
                    break;
                }
            }

            let stop = entry.stop as usize;
            if self.hyperlinks[stop].is_empty() {
                continue;
            }
            if !self.stochastic {
                if self.hyperlinks[stop].done
                    || entry.cost > self.hyperlinks[stop].cost + f64::EPSILON
                {
                    continue;
                }
                self.hyperlinks[stop].done = true;
            } else {
                if max_process >= 0 && self.hyperlinks[stop].process_count >= max_process as u32 {
                    continue;
                }
                self.hyperlinks[stop].process_count += 1;
                self.max_process_count =
                    self.max_process_count.max(self.hyperlinks[stop].process_count);
            }

            let state = self.source_state(stop);
            self.expand_transfers(entry.stop, &state)?;
            self.expand_trips(entry.stop, &state)?;
        }

        if self.request.trace {
            self.trace.push(format!(
                "labeling finished after {} iterations ({} stops labeled, incomplete: {})",
                self.label_iterations,
                self.hyperlinks.iter().filter(|h| !h.is_empty()).count(),
                self.incomplete,
            ));
        }
        log::debug!(
            "Labeled {} stops in {} iterations for {}.",
            self.hyperlinks.iter().filter(|h| !h.is_empty()).count(),
            self.label_iterations,
            self.request.person_trip_id,
        );

        self.close_zone()
    }

    // -- seeding ------------------------------------------------------------

    fn seed_anchor(&mut self) -> PathfindingResult<()> {
        let network = self.network;
        let preferred = self.request.preferred_time;
        let mut seeded = 0usize;
        match self.dir {
            SearchDirection::Outbound => {
                for link in network.egress_links(self.request.destination) {
                    let Some(handle) = self.modes.access(network, link.supply_mode, true)? else {
                        continue;
                    };
                    let link_cost =
                        self.engine
                            .walk_cost(&handle, link.time as f64 / 60.0, link.dist, &[])?;
                    self.check_positive(link_cost, link.stop)?;
                    let label = StopLabel {
                        cost: link_cost,
                        deparr_time: preferred - link.time,
                        arrdep_time: preferred,
                        mode: LabelMode::Egress {
                            supply: link.supply_mode,
                        },
                        succ: None,
                        link_time: link.time,
                        link_cost,
                        link_dist: link.dist,
                        fare: 0.0,
                        fare_period: None,
                        iteration: 0,
                    };
                    self.update(link.stop, label);
                    seeded += 1;
                    if self.request.trace {
                        self.trace.push(format!(
                            "seed egress {} at {} (cost {:.4})",
                            network.stops[link.stop as usize].id,
                            utils::time_str(preferred - link.time),
                            link_cost,
                        ));
                    }
                }
            }
            SearchDirection::Inbound => {
                for link in network.access_links(self.request.origin) {
                    let Some(handle) = self.modes.access(network, link.supply_mode, false)? else {
                        continue;
                    };
                    let link_cost =
                        self.engine
                            .walk_cost(&handle, link.time as f64 / 60.0, link.dist, &[])?;
                    self.check_positive(link_cost, link.stop)?;
                    let label = StopLabel {
                        cost: link_cost,
                        deparr_time: preferred + link.time,
                        arrdep_time: preferred,
                        mode: LabelMode::Access {
                            supply: link.supply_mode,
                        },
                        succ: None,
                        link_time: link.time,
                        link_cost,
                        link_dist: link.dist,
                        fare: 0.0,
                        fare_period: None,
                        iteration: 0,
                    };
                    self.update(link.stop, label);
                    seeded += 1;
                    if self.request.trace {
                        self.trace.push(format!(
                            "seed access {} at {} (cost {:.4})",
                            network.stops[link.stop as usize].id,
                            utils::time_str(preferred + link.time),
                            link_cost,
                        ));
                    }
                }
            }
        }
        if seeded == 0 {
            return Err(PathfindingError::NoPathFound);
        }
        Ok(())
    }

    // -- relaxation ---------------------------------------------------------

    fn source_state(&self, stop: usize) -> SourceState {
        let hl = &self.hyperlinks[stop];
        let theta = self.engine.theta;
        if self.stochastic {
            let downstream_fare_period = hl
                .labels
                .iter()
                .filter(|l| l.mode.is_trip())
                .min_by(|a, b| a.cost.total_cmp(&b.cost))
                .and_then(|l| l.fare_period);
            SourceState {
                anchor: hl.time_anchor,
                trip_basis: hl.cost,
                transfer_basis: hl.nonwalk_cost(theta),
                zero_walk_transfer: hl.has_trip_labels(),
                downstream_fare_period,
            }
        } else {
            let label = &hl.labels[0];
            SourceState {
                anchor: hl.time_anchor,
                trip_basis: label.cost,
                transfer_basis: label.mode.is_trip().then_some(label.cost),
                zero_walk_transfer: label.mode.is_trip(),
                downstream_fare_period: label.mode.is_trip().then_some(label.fare_period).flatten(),
            }
        }
    }

    fn expand_transfers(&mut self, stop: StopIndex, state: &SourceState) -> PathfindingResult<()> {
        // Only transit labels may feed a walk; this forbids chained walks.
        let Some(basis) = state.transfer_basis else {
            return Ok(());
        };
        let network = self.network;
        let handle = self.modes.transfer(network)?;
        for transfer in network.transfers_from(stop) {
            let link_cost =
                self.engine
                    .transfer_cost(&handle, transfer.time as f64 / 60.0, transfer.dist)?;
            let cost = basis + link_cost;
            self.check_positive(cost, transfer.to_stop)?;
            let (deparr, arrdep) = match self.dir {
                SearchDirection::Outbound => {
                    (state.anchor - transfer.time, state.anchor)
                }
                SearchDirection::Inbound => (state.anchor + transfer.time, state.anchor),
            };
            let label = StopLabel {
                cost,
                deparr_time: deparr,
                arrdep_time: arrdep,
                mode: LabelMode::Transfer,
                succ: Some(stop),
                link_time: transfer.time,
                link_cost,
                link_dist: transfer.dist,
                fare: 0.0,
                fare_period: None,
                iteration: self.label_iterations,
            };
            self.update(transfer.to_stop, label);
        }
        Ok(())
    }

    fn expand_trips(&mut self, stop: StopIndex, state: &SourceState) -> PathfindingResult<()> {
        let network = self.network;
        let window = self.config.time_window_secs();
        let bump_buffer = self.config.bump_buffer_secs();
        let symmetry = self.config.fare_zone_symmetry;
        let outbound = self.dir == SearchDirection::Outbound;
        let visits = match self.dir {
            SearchDirection::Outbound => {
                network.trips_arriving_within(stop, state.anchor, window)
            }
            SearchDirection::Inbound => {
                network.trips_departing_within(stop, state.anchor, window)
            }
        };
        for visit in visits {
            let trip = visit.trip;
            let route = network.trips[trip as usize].route;
            let route_mode = network.routes[route as usize].mode;
            let handle = self.modes.transit(network, route_mode)?;
            let penalty = if state.zero_walk_transfer {
                let transfer_handle = self.modes.transfer(network)?;
                self.engine.transfer_penalty(&transfer_handle)
            } else {
                0.0
            };
            let wait_min = match self.dir {
                SearchDirection::Outbound => (state.anchor - visit.arrival_time) as f64 / 60.0,
                SearchDirection::Inbound => (visit.departure_time - state.anchor) as f64 / 60.0,
            };
            let stop_times = network.trip_stop_times(trip);
            let trip_stops = network.trip_stop_seq(trip);
            let positions: std::ops::Range<u32> = if outbound {
                0..visit.seq
            } else {
                (visit.seq + 1)..trip_stops.len() as u32
            };
            for other_seq in positions {
                let (board_seq, alight_seq) = if outbound {
                    (other_seq, visit.seq)
                } else {
                    (visit.seq, other_seq)
                };
                let board_stop = trip_stops[board_seq as usize];
                let alight_stop = trip_stops[alight_seq as usize];
                let target_stop = if outbound { board_stop } else { alight_stop };
                let depart = stop_times[board_seq as usize].departure_time;
                let arrive = stop_times[alight_seq as usize].arrival_time;

                // A boarding blocked by capacity feedback may not happen
                // earlier than the bumped threshold plus the buffer.
                if let Some(bump) = self.capacity.bump_time(trip, route_mode, board_stop) {
                    if depart < bump + bump_buffer {
                        continue;
                    }
                }

                let fare_period = network.fare_period(
                    route,
                    network.stop_fare_zone(board_stop),
                    network.stop_fare_zone(alight_stop),
                    depart,
                    symmetry,
                );
                let fare = if self.config.transfer_fare_ignore_pathfinding {
                    fare_period
                        .map(|p| network.fare_periods[p as usize].price)
                        .unwrap_or(0.0)
                } else {
                    estimated_transit_fare(
                        network,
                        fare_period,
                        state.downstream_fare_period,
                        outbound,
                    )
                };

                let in_vehicle_min = (arrive - depart) as f64 / 60.0;
                let link_cost = self.engine.transit_cost(&handle, in_vehicle_min, wait_min)?
                    + self.engine.fare_cost(fare, self.request.value_of_time)
                    + penalty;
                let cost = state.trip_basis + link_cost;
                self.check_positive(cost, target_stop)?;
                let (deparr, arrdep) = if outbound {
                    (depart, arrive)
                } else {
                    (arrive, depart)
                };
                let label = StopLabel {
                    cost,
                    deparr_time: deparr,
                    arrdep_time: arrdep,
                    mode: LabelMode::Trip {
                        trip,
                        board_seq,
                        alight_seq,
                    },
                    succ: Some(stop),
                    link_time: arrive - depart,
                    link_cost,
                    link_dist: stop_times[alight_seq as usize].shape_dist
                        - stop_times[board_seq as usize].shape_dist,
                    fare,
                    fare_period,
                    iteration: self.label_iterations,
                };
                self.update(target_stop, label);
            }
        }
        Ok(())
    }

    // Merge a candidate label into a stop's hyperlink per the update rule.
    fn update(&mut self, stop: StopIndex, label: StopLabel) {
        if label.cost >= MAX_COST {
            return;
        }
        let theta = self.engine.theta;
        let dir = self.dir;
        let hl = &mut self.hyperlinks[stop as usize];
        let push_cost;
        if !self.stochastic {
            if let Some(existing) = hl.labels.first() {
                if existing.cost <= label.cost {
                    return;
                }
            }
            hl.labels.clear();
            hl.labels.push(label);
            hl.cost = label.cost;
            hl.time_anchor = label.deparr_time;
            // A cheaper label may arrive after finalization; reopen the stop.
            hl.done = false;
            push_cost = label.cost;
        } else {
            // An identical alternative replaces its previous version instead
            // of double-counting mass in the log-sum.
            if let Some(pos) = hl
                .labels
                .iter()
                .position(|l| l.mode == label.mode && l.succ == label.succ)
            {
                if (hl.labels[pos].cost - label.cost).abs() < 1e-9 {
                    return;
                }
                hl.labels[pos] = label;
                hl.rebuild(theta, dir);
            } else {
                let mass = (-theta * label.cost).exp();
                if hl.labels.is_empty() {
                    hl.time_anchor = label.deparr_time;
                } else {
                    hl.time_anchor = match dir {
                        SearchDirection::Outbound => hl.time_anchor.max(label.deparr_time),
                        SearchDirection::Inbound => hl.time_anchor.min(label.deparr_time),
                    };
                }
                hl.labels.push(label);
                hl.exp_sum += mass;
                if label.mode.is_trip() {
                    hl.nonwalk_exp_sum += mass;
                }
                hl.cost = -hl.exp_sum.ln() / theta;
            }
            if !(hl.cost > 0.0 && hl.cost < MAX_COST) {
                return;
            }
            push_cost = hl.cost;
        }
        self.queue_seq += 1;
        let seq = self.queue_seq;
        self.queue.push(std::cmp::Reverse(QueueEntry {
            cost: push_cost,
            seq,
            stop,
        }));
    }

    // -- closing the non-anchor zone ----------------------------------------

    fn close_zone(mut self) -> PathfindingResult<Labels> {
        let network = self.network;
        let theta = self.engine.theta;
        let outbound = self.dir == SearchDirection::Outbound;
        let (zone, egress) = if outbound {
            (self.request.origin, false)
        } else {
            (self.request.destination, true)
        };
        let mut zone_labels = Vec::new();
        for link in network.access_links(zone) {
            let Some(handle) = self.modes.access(network, link.supply_mode, egress)? else {
                continue;
            };
            let hl = &self.hyperlinks[link.stop as usize];
            if hl.is_empty() {
                continue;
            }
            // The first boarding must follow the walk directly.
            let basis = if self.stochastic {
                match hl.nonwalk_cost(theta) {
                    Some(cost) => cost,
                    None => continue,
                }
            } else if hl.labels[0].mode.is_trip() {
                hl.labels[0].cost
            } else {
                continue;
            };
            let link_cost =
                self.engine
                    .walk_cost(&handle, link.time as f64 / 60.0, link.dist, &[])?;
            let cost = basis + link_cost;
            self.check_positive(cost, link.stop)?;
            if cost >= MAX_COST {
                continue;
            }
            let mode = if outbound {
                LabelMode::Access {
                    supply: link.supply_mode,
                }
            } else {
                LabelMode::Egress {
                    supply: link.supply_mode,
                }
            };
            let (deparr, arrdep) = if outbound {
                (hl.time_anchor - link.time, hl.time_anchor)
            } else {
                (hl.time_anchor + link.time, hl.time_anchor)
            };
            zone_labels.push(StopLabel {
                cost,
                deparr_time: deparr,
                arrdep_time: arrdep,
                mode,
                succ: Some(link.stop),
                link_time: link.time,
                link_cost,
                link_dist: link.dist,
                fare: 0.0,
                fare_period: None,
                iteration: self.label_iterations,
            });
        }

        if zone_labels.is_empty() {
            return Err(if self.incomplete {
                PathfindingError::BudgetExceeded
            } else {
                PathfindingError::NoPathFound
            });
        }
        if self.request.trace {
            self.trace.push(format!(
                "{} labeled with {} zone labels",
                if outbound { "origin" } else { "destination" },
                zone_labels.len(),
            ));
        }

        Ok(Labels {
            dir: self.dir,
            hyperlinks: self.hyperlinks,
            zone_labels,
            label_iterations: self.label_iterations,
            max_process_count: self.max_process_count,
            incomplete: self.incomplete,
            trace: self.trace,
        })
    }

    fn check_positive(&self, cost: Cost, stop: StopIndex) -> PathfindingResult<()> {
        if cost <= 0.0 {
            return Err(PathfindingError::NegativeUtilityDetected {
                stop_id: self.network.stops[stop as usize].id.to_string(),
                cost,
            });
        }
        Ok(())
    }
}
