use crate::config::{Config, PathfindingType};
use crate::cost::{estimated_transit_fare, price_path, CostEngine, FareTracker, ModeWeights};
use crate::dispatcher::Request;
use crate::error::{PathfindingError, PathfindingResult};
use crate::labeler::{LabelMode, Labels, SearchDirection, StopLabel};
use crate::network::{Cost, FarePeriodIndex, Network, Timestamp};
use crate::path::{LinkKind, Path, PathLink, PathNode};

// Failed path draws tolerated across one request before enumeration gives up.
pub const MAX_HYPERPATH_ASSIGN_ATTEMPTS: u32 = 1000;

// Prevent infinite loops on degenerate timetables (zero-length links).
const MAX_LEGS: usize = 100;

// One sampled label together with the node it was found at, in traversal
// order (journey order for outbound, reverse journey order for inbound).
#[derive(Clone, Copy)]
struct ChainEntry {
    at: PathNode,
    label: StopLabel,
}

pub struct Enumerator<'a> {
    network: &'a Network,
    config: &'a Config,
    request: &'a Request,
    engine: CostEngine,
    labels: &'a Labels,
}

impl<'a> Enumerator<'a> {
    pub fn new(
        network: &'a Network,
        config: &'a Config,
        request: &'a Request,
        labels: &'a Labels,
    ) -> Self {
        Self {
            network,
            config,
            request,
            engine: CostEngine::new(config),
            labels,
        }
    }

    // Samples the pathset. Duplicate paths are retained; their frequency is
    // the unnormalized empirical probability.
    pub fn enumerate(
        &self,
        modes: &mut ModeWeights,
        rng: &mut fastrand::Rng,
    ) -> PathfindingResult<Vec<Path>> {
        if self.config.pathfinding_type == PathfindingType::Deterministic {
            let chain = self.deterministic_chain()?;
            return Ok(vec![self.assemble(modes, &chain)?]);
        }

        let mut paths = Vec::with_capacity(self.config.stochastic_pathset_size as usize);
        let mut failed = 0u32;
        'samples: for _ in 0..self.config.stochastic_pathset_size {
            loop {
                match self.sample_chain(rng) {
                    Some(chain) => {
                        paths.push(self.assemble(modes, &chain)?);
                        break;
                    }
                    None => {
                        failed += 1;
                        if failed >= MAX_HYPERPATH_ASSIGN_ATTEMPTS {
                            log::warn!(
                                "Gave up enumerating for {} after {} dead ends.",
                                self.request.person_trip_id,
                                failed
                            );
                            break 'samples;
                        }
                    }
                }
            }
        }
        if paths.is_empty() {
            return Err(PathfindingError::NoPathFound);
        }
        Ok(paths)
    }

    // -- deterministic ------------------------------------------------------

    fn deterministic_chain(&self) -> PathfindingResult<Vec<ChainEntry>> {
        let zone_node = self.start_zone_node();
        let best = self
            .labels
            .zone_labels
            .iter()
            .min_by(|a, b| a.cost.total_cmp(&b.cost))
            .ok_or(PathfindingError::NoPathFound)?;
        let mut chain = vec![ChainEntry {
            at: zone_node,
            label: *best,
        }];
        let mut current = best.succ;
        while let Some(stop) = current {
            if chain.len() > MAX_LEGS {
                return Err(PathfindingError::InvariantViolation(
                    "path reconstruction exceeded the leg limit".to_owned(),
                ));
            }
            let hl = &self.labels.hyperlinks[stop as usize];
            let label = hl.labels.first().ok_or(PathfindingError::NoPathFound)?;
            chain.push(ChainEntry {
                at: PathNode::Stop(stop),
                label: *label,
            });
            current = label.succ;
        }
        self.orient(&mut chain);
        Ok(chain)
    }

    // -- stochastic sampling ------------------------------------------------

    fn start_zone_node(&self) -> PathNode {
        match self.labels.dir {
            SearchDirection::Outbound => PathNode::Zone(self.request.origin),
            SearchDirection::Inbound => PathNode::Zone(self.request.destination),
        }
    }

    // Draw one chain by forward traversal of the hyperpath, or None on a
    // dead end.
    fn sample_chain(&self, rng: &mut fastrand::Rng) -> Option<Vec<ChainEntry>> {
        let outbound = self.labels.dir == SearchDirection::Outbound;
        let apply_rules = !self.config.transfer_fare_ignore_pathenum;
        let fare_factor = self.engine.fare_cost(1.0, self.request.value_of_time);

        let costs: Vec<Cost> = self.labels.zone_labels.iter().map(|l| l.cost).collect();
        let first = self.sample_index(rng, &costs)?;
        let first_label = self.labels.zone_labels[first];
        let mut chain = vec![ChainEntry {
            at: self.start_zone_node(),
            label: first_label,
        }];

        // Outbound: the clock is the arrival time at the current stop, fixed
        // once the first boarding is drawn. Inbound traversal runs backward
        // through the day, so the clock is the latest permitted arrival.
        let mut clock: Option<Timestamp> = None;
        let mut prev_walk = true;
        let mut current = first_label.succ;
        // Live fare state: the boardings drawn so far (outbound), or the
        // fare period of the following leg (inbound).
        let mut tracker = FareTracker::new();
        let mut later_period: Option<FarePeriodIndex> = None;

        while let Some(stop) = current {
            if chain.len() > MAX_LEGS {
                return None;
            }
            let hl = &self.labels.hyperlinks[stop as usize];
            let mut candidates: Vec<(usize, Cost)> = Vec::with_capacity(hl.labels.len());
            for (idx, label) in hl.labels.iter().enumerate() {
                if prev_walk && !label.mode.is_trip() {
                    continue;
                }
                let feasible = match label.mode {
                    LabelMode::Trip { .. } => match clock {
                        Some(t) => {
                            if outbound {
                                label.deparr_time >= t
                            } else {
                                label.deparr_time <= t
                            }
                        }
                        None => true,
                    },
                    // Walks start whenever needed; feasibility surfaces at
                    // the next stop.
                    LabelMode::Transfer => true,
                    LabelMode::Egress { .. } => outbound,
                    LabelMode::Access { .. } => {
                        // Inbound seeds pin the origin departure.
                        !outbound
                            && match clock {
                                Some(t) => label.deparr_time <= t,
                                None => true,
                            }
                    }
                };
                if !feasible {
                    continue;
                }
                let mut cost = label.cost;
                if apply_rules && label.mode.is_trip() {
                    // Re-price the candidate's fare against the sequence
                    // actually drawn so far and shift its cost accordingly.
                    let live_fare = if outbound {
                        tracker.peek(self.network, label.fare_period, label.deparr_time, true)
                    } else {
                        estimated_transit_fare(
                            self.network,
                            label.fare_period,
                            later_period,
                            true,
                        )
                    };
                    cost += (live_fare - label.fare) * fare_factor;
                }
                candidates.push((idx, cost));
            }

            let costs: Vec<Cost> = candidates.iter().map(|&(_, c)| c).collect();
            let pick = self.sample_index(rng, &costs)?;
            let label = hl.labels[candidates[pick].0];

            match label.mode {
                LabelMode::Trip { .. } => {
                    if outbound {
                        tracker.commit(self.network, label.fare_period, label.deparr_time, true);
                        clock = Some(label.arrdep_time);
                    } else {
                        later_period = label.fare_period;
                        clock = Some(label.arrdep_time);
                    }
                    prev_walk = false;
                }
                LabelMode::Transfer => {
                    clock = clock.map(|t| {
                        if outbound {
                            t + label.link_time
                        } else {
                            t - label.link_time
                        }
                    });
                    prev_walk = true;
                }
                LabelMode::Access { .. } | LabelMode::Egress { .. } => {
                    prev_walk = true;
                }
            }

            chain.push(ChainEntry {
                at: PathNode::Stop(stop),
                label,
            });
            current = label.succ;
        }

        self.orient(&mut chain);
        Some(chain)
    }

    // Multinomial draw over exp(-theta * cost), None when empty.
    fn sample_index(&self, rng: &mut fastrand::Rng, costs: &[Cost]) -> Option<usize> {
        if costs.is_empty() {
            return None;
        }
        let theta = self.engine.theta;
        let min = costs.iter().copied().fold(f64::INFINITY, f64::min);
        let weights: Vec<f64> = costs.iter().map(|c| (-theta * (c - min)).exp()).collect();
        let total: f64 = weights.iter().sum();
        let mut draw = rng.f64() * total;
        for (idx, w) in weights.iter().enumerate() {
            draw -= w;
            if draw <= 0.0 {
                return Some(idx);
            }
        }
        Some(costs.len() - 1)
    }

    // Put a sampled chain into journey order.
    fn orient(&self, chain: &mut [ChainEntry]) {
        if self.labels.dir == SearchDirection::Inbound {
            chain.reverse();
        }
    }

    // -- assembly -----------------------------------------------------------

    // Lay actual clock times over the chain and price it. Times respect the
    // schedule everywhere: boardings happen at scheduled departures, walks
    // start as soon as the traveler is there, and the outbound access walk
    // is timed to meet the first boarding.
    fn assemble(&self, modes: &mut ModeWeights, chain: &[ChainEntry]) -> PathfindingResult<Path> {
        let network = self.network;
        let outbound = self.labels.dir == SearchDirection::Outbound;
        let transfer_mode = network
            .supply_mode_idx("transfer")
            .unwrap_or_default();
        let mut links: Vec<PathLink> = Vec::with_capacity(chain.len());

        let mut clock: Option<Timestamp> = (!outbound).then_some(self.request.preferred_time);
        let mut from = PathNode::Zone(self.request.origin);
        for entry in chain {
            let label = entry.label;
            let to = match (outbound, label.succ) {
                (true, Some(stop)) => PathNode::Stop(stop),
                (true, None) => PathNode::Zone(self.request.destination),
                (false, _) => entry.at,
            };
            match label.mode {
                LabelMode::Access { supply } | LabelMode::Egress { supply } => {
                    let kind = if matches!(label.mode, LabelMode::Access { .. }) {
                        LinkKind::Access
                    } else {
                        LinkKind::Egress
                    };
                    let (depart, arrive) = match clock {
                        Some(t) => (t, t + label.link_time),
                        // Outbound access; back-filled at the first boarding.
                        None => (0, 0),
                    };
                    if clock.is_some() {
                        clock = Some(arrive);
                    }
                    links.push(PathLink {
                        kind,
                        from,
                        to,
                        trip: None,
                        board_seq: 0,
                        alight_seq: 0,
                        supply_mode: supply,
                        depart_time: depart,
                        arrive_time: arrive,
                        wait_min: 0.0,
                        time_min: label.link_time as f64 / 60.0,
                        dist: label.link_dist,
                        fare: 0.0,
                        fare_period: None,
                        cost: 0.0,
                    });
                }
                LabelMode::Transfer => {
                    let t = clock.ok_or_else(|| {
                        PathfindingError::InvariantViolation(
                            "transfer before any boarding".to_owned(),
                        )
                    })?;
                    links.push(PathLink {
                        kind: LinkKind::Transfer,
                        from,
                        to,
                        trip: None,
                        board_seq: 0,
                        alight_seq: 0,
                        supply_mode: transfer_mode,
                        depart_time: t,
                        arrive_time: t + label.link_time,
                        wait_min: 0.0,
                        time_min: label.link_time as f64 / 60.0,
                        dist: label.link_dist,
                        fare: 0.0,
                        fare_period: None,
                        cost: 0.0,
                    });
                    clock = Some(t + label.link_time);
                }
                LabelMode::Trip {
                    trip,
                    board_seq,
                    alight_seq,
                } => {
                    let times = network.trip_stop_times(trip);
                    let depart = times[board_seq as usize].departure_time;
                    let arrive = times[alight_seq as usize].arrival_time;
                    let wait_min = match clock {
                        Some(t) => {
                            if depart < t {
                                // The sample drifted off the schedule.
                                return Err(PathfindingError::InvariantViolation(format!(
                                    "boarding {} before arriving at the stop",
                                    network.trips[trip as usize].id
                                )));
                            }
                            (depart - t) as f64 / 60.0
                        }
                        None => {
                            // First boarding: time the access walk to meet it.
                            if let Some(access) = links.first_mut() {
                                access.arrive_time = depart;
                                access.depart_time = depart - (access.time_min * 60.0) as i32;
                            }
                            0.0
                        }
                    };
                    links.push(PathLink {
                        kind: LinkKind::Transit,
                        from,
                        to,
                        trip: Some(trip),
                        board_seq,
                        alight_seq,
                        supply_mode: network.route_mode(trip),
                        depart_time: depart,
                        arrive_time: arrive,
                        wait_min,
                        time_min: (arrive - depart) as f64 / 60.0,
                        dist: label.link_dist,
                        fare: 0.0,
                        fare_period: label.fare_period,
                        cost: 0.0,
                    });
                    clock = Some(arrive);
                }
            }
            from = to;
        }

        let mut path = Path {
            links,
            cost: 0.0,
        };
        let apply_rules = !self.config.transfer_fare_ignore_pathenum;
        path.cost = price_path(
            network,
            &self.engine,
            modes,
            self.request,
            &mut path.links,
            apply_rules,
        )?;
        Ok(path)
    }
}
