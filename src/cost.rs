use crate::config::{Config, OverlapVariable};
use crate::dispatcher::{Request, TimeTarget};
use crate::error::{PathfindingError, PathfindingResult};
use crate::network::{
    Cost, FarePeriodIndex, FareTransferType, Network, SupplyModeIndex, Timestamp,
};
use crate::path::{LinkKind, Path, PathLink};
use crate::weights::{DemandModeType, WeightBook, WeightHandle};
use std::collections::HashMap;

// Scalars applied to every utility.
#[derive(Clone, Copy, Debug)]
pub struct CostEngine {
    pub theta: f64,
    pub utils_factor: f64,
}

impl CostEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            theta: config.stochastic_dispersion,
            utils_factor: config.utils_conversion_factor,
        }
    }

    // Access and egress links. `extra` carries schedule-gap attributes such
    // as arrive_early_min, priced only when a weight row names them.
    pub fn walk_cost(
        &self,
        handle: &WeightHandle,
        time_min: f64,
        dist: f64,
        extra: &[(&str, f64)],
    ) -> PathfindingResult<Cost> {
        let mut cost = handle.required("time_min")?.apply(time_min) + handle.weighted("dist", dist);
        for &(name, x) in extra {
            cost += handle.weighted(name, x);
        }
        Ok(cost * self.utils_factor)
    }

    pub fn transfer_cost(
        &self,
        handle: &WeightHandle,
        time_min: f64,
        dist: f64,
    ) -> PathfindingResult<Cost> {
        let cost = handle.required("time_min")?.apply(time_min)
            + handle.weighted("dist", dist)
            + handle.weighted("transfer_penalty", 1.0);
        Ok(cost * self.utils_factor)
    }

    pub fn transit_cost(
        &self,
        handle: &WeightHandle,
        in_vehicle_min: f64,
        wait_min: f64,
    ) -> PathfindingResult<Cost> {
        let cost = handle.required("in_vehicle_time_min")?.apply(in_vehicle_min)
            + handle.required("wait_time_min")?.apply(wait_min);
        Ok(cost * self.utils_factor)
    }

    // Penalty charged on a boarding that follows another transit leg with no
    // walk between them (the implicit same-stop transfer).
    pub fn transfer_penalty(&self, transfer_handle: &WeightHandle) -> Cost {
        transfer_handle.weighted("transfer_penalty", 1.0) * self.utils_factor
    }

    // Monetary fare converted to time units.
    pub fn fare_cost(&self, fare: f64, value_of_time: f64) -> Cost {
        fare * 60.0 / value_of_time * self.utils_factor
    }
}

pub fn apply_fare_rule(rule: FareTransferType, amount: f64, base: f64) -> f64 {
    match rule {
        FareTransferType::Discount => (base - amount).max(0.0),
        FareTransferType::Free => 0.0,
        FareTransferType::Fixed => amount,
    }
}

// Fare estimate for a transit link added during labeling, when only one
// neighboring leg of the journey is known. When the neighbor is the later
// leg (outbound search grows the path backward in time), the rule rewrites
// the neighbor's fare, so its delta is credited to the new link; the estimate
// may therefore move in either direction.
pub fn estimated_transit_fare(
    network: &Network,
    new_period: Option<FarePeriodIndex>,
    neighbor_period: Option<FarePeriodIndex>,
    neighbor_is_later: bool,
) -> f64 {
    let Some(new_period) = new_period else {
        return 0.0;
    };
    let base = network.fare_periods[new_period as usize].price;
    let Some(neighbor) = neighbor_period else {
        return base;
    };
    if neighbor_is_later {
        match network.fare_transfer_rule(new_period, neighbor) {
            Some((rule, amount)) => {
                let neighbor_base = network.fare_periods[neighbor as usize].price;
                (base + apply_fare_rule(rule, amount, neighbor_base) - neighbor_base).max(0.0)
            }
            None => base,
        }
    } else {
        match network.fare_transfer_rule(neighbor, new_period) {
            Some((rule, amount)) => apply_fare_rule(rule, amount, base),
            None => base,
        }
    }
}

// Walks a path's boardings in journey order and produces the exact fare of
// each: transfer rules against the previous boarding's period first, then the
// in-period free-transfer allowance, which overrides the rules and does not
// require back-to-back periods.
#[derive(Clone, Debug, Default)]
pub struct FareTracker {
    last_period: Option<FarePeriodIndex>,
    first_board: HashMap<FarePeriodIndex, (Timestamp, u32)>,
}

impl FareTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn fare_for(
        &self,
        network: &Network,
        period: Option<FarePeriodIndex>,
        board_time: Timestamp,
        apply_rules: bool,
    ) -> f64 {
        let Some(period) = period else {
            return 0.0;
        };
        let info = &network.fare_periods[period as usize];
        let mut fare = info.price;
        if apply_rules {
            if let Some(prev) = self.last_period {
                if let Some((rule, amount)) = network.fare_transfer_rule(prev, period) {
                    fare = apply_fare_rule(rule, amount, fare);
                }
            }
        }
        if let Some(&(first, used)) = self.first_board.get(&period) {
            if used < info.free_transfers && board_time - first <= info.transfer_duration {
                fare = 0.0;
            }
        }
        fare
    }

    pub fn peek(
        &self,
        network: &Network,
        period: Option<FarePeriodIndex>,
        board_time: Timestamp,
        apply_rules: bool,
    ) -> f64 {
        self.fare_for(network, period, board_time, apply_rules)
    }

    pub fn commit(
        &mut self,
        network: &Network,
        period: Option<FarePeriodIndex>,
        board_time: Timestamp,
        apply_rules: bool,
    ) -> f64 {
        let fare = self.fare_for(network, period, board_time, apply_rules);
        self.last_period = period;
        if let Some(period) = period {
            let info = &network.fare_periods[period as usize];
            match self.first_board.get_mut(&period) {
                Some((first, used)) => {
                    if *used < info.free_transfers && board_time - *first <= info.transfer_duration
                    {
                        *used += 1;
                    } else {
                        // Allowance window exhausted; a fresh window starts here.
                        *first = board_time;
                        *used = 0;
                    }
                }
                None => {
                    self.first_board.insert(period, (board_time, 0));
                }
            }
        }
        fare
    }
}

// Lazily resolved weight maps for one request. Transit maps are keyed by the
// route's supply mode under the request's transit demand mode; access and
// egress links are permitted when a requested demand mode matches the link's
// "<demand>_access" / "<demand>_egress" supply mode.
pub struct ModeWeights<'a> {
    book: &'a WeightBook,
    user_class: &'a str,
    purpose: &'a str,
    transit_mode: &'a str,
    access_modes: &'a [Box<str>],
    egress_modes: &'a [Box<str>],
    cache: HashMap<(DemandModeType, SupplyModeIndex), WeightHandle<'a>>,
}

impl<'a> ModeWeights<'a> {
    pub fn new(book: &'a WeightBook, request: &'a Request) -> Self {
        Self {
            book,
            user_class: &request.user_class,
            purpose: &request.purpose,
            transit_mode: &request.transit_mode,
            access_modes: &request.access_modes,
            egress_modes: &request.egress_modes,
            cache: HashMap::new(),
        }
    }

    pub fn transit(
        &mut self,
        network: &Network,
        supply: SupplyModeIndex,
    ) -> PathfindingResult<WeightHandle<'a>> {
        if let Some(&handle) = self.cache.get(&(DemandModeType::Transit, supply)) {
            return Ok(handle);
        }
        let handle = self.book.lookup(
            self.user_class,
            self.purpose,
            DemandModeType::Transit,
            self.transit_mode,
            network.supply_mode_name(supply),
        )?;
        self.cache.insert((DemandModeType::Transit, supply), handle);
        Ok(handle)
    }

    pub fn transfer(&mut self, network: &Network) -> PathfindingResult<WeightHandle<'a>> {
        let supply = network.supply_mode_idx("transfer").unwrap_or(u32::MAX);
        if let Some(&handle) = self.cache.get(&(DemandModeType::Transfer, supply)) {
            return Ok(handle);
        }
        let handle = self.book.lookup(
            self.user_class,
            self.purpose,
            DemandModeType::Transfer,
            "transfer",
            "transfer",
        )?;
        self.cache
            .insert((DemandModeType::Transfer, supply), handle);
        Ok(handle)
    }

    // None when no permitted demand mode matches the link's supply mode; the
    // link is simply not usable by this request.
    pub fn access(
        &mut self,
        network: &Network,
        supply: SupplyModeIndex,
        egress: bool,
    ) -> PathfindingResult<Option<WeightHandle<'a>>> {
        let (mode_type, demand_modes, suffix) = if egress {
            (DemandModeType::Egress, self.egress_modes, "_egress")
        } else {
            (DemandModeType::Access, self.access_modes, "_access")
        };
        if let Some(&handle) = self.cache.get(&(mode_type, supply)) {
            return Ok(Some(handle));
        }
        // Zone links are stored once and serve both directions, so a
        // "walk_access" link reads "walk_egress" weights when walked as
        // egress.
        let supply_name = network.supply_mode_name(supply);
        let Some(base) = supply_name
            .strip_suffix("_access")
            .or_else(|| supply_name.strip_suffix("_egress"))
        else {
            return Ok(None);
        };
        if !demand_modes.iter().any(|dm| &**dm == base) {
            return Ok(None);
        }
        let handle = self.book.lookup(
            self.user_class,
            self.purpose,
            mode_type,
            base,
            &format!("{base}{suffix}"),
        )?;
        self.cache.insert((mode_type, supply), handle);
        Ok(Some(handle))
    }
}

// Exact pricing of an assembled path: recomputes every link's cost and fare
// from its actual times. Used by the enumerator for the pre-overlap pathset
// cost and by the finalizer for the definitive one, so the two agree by
// construction whenever their fare-rule switches agree.
pub fn price_path(
    network: &Network,
    engine: &CostEngine,
    modes: &mut ModeWeights,
    request: &Request,
    links: &mut [PathLink],
    apply_fare_rules: bool,
) -> PathfindingResult<Cost> {
    let mut tracker = FareTracker::new();
    let mut total = 0.0;
    let mut prev_kind: Option<LinkKind> = None;
    for i in 0..links.len() {
        let link_cost = match links[i].kind {
            LinkKind::Access | LinkKind::Egress => {
                let egress = links[i].kind == LinkKind::Egress;
                let handle = modes
                    .access(network, links[i].supply_mode, egress)?
                    .ok_or_else(|| PathfindingError::WeightLookupMissing {
                        user_class: request.user_class.to_string(),
                        purpose: request.purpose.to_string(),
                        mode_type: if egress {
                            DemandModeType::Egress
                        } else {
                            DemandModeType::Access
                        },
                        demand_mode: String::new(),
                        supply_mode: network.supply_mode_name(links[i].supply_mode).to_owned(),
                        weight_name: String::new(),
                    })?;
                let mut extra: Vec<(&str, f64)> = Vec::new();
                match request.time_target {
                    TimeTarget::Arrival if egress => {
                        let gap = (request.preferred_time - links[i].arrive_time).max(0) as f64;
                        extra.push(("arrive_early_min", gap / 60.0));
                    }
                    TimeTarget::Departure if !egress => {
                        let gap = (links[i].depart_time - request.preferred_time).max(0) as f64;
                        extra.push(("depart_late_min", gap / 60.0));
                    }
                    _ => {}
                }
                engine.walk_cost(&handle, links[i].time_min, links[i].dist, &extra)?
            }
            LinkKind::Transfer => {
                let handle = modes.transfer(network)?;
                engine.transfer_cost(&handle, links[i].time_min, links[i].dist)?
            }
            LinkKind::Transit => {
                let trip = links[i]
                    .trip
                    .expect("transit link without a trip");
                let handle = modes.transit(network, network.route_mode(trip))?;
                let fare = tracker.commit(
                    network,
                    links[i].fare_period,
                    links[i].depart_time,
                    apply_fare_rules,
                );
                links[i].fare = fare;
                let mut cost =
                    engine.transit_cost(&handle, links[i].time_min, links[i].wait_min)?
                        + engine.fare_cost(fare, request.value_of_time);
                if prev_kind == Some(LinkKind::Transit) {
                    let transfer_handle = modes.transfer(network)?;
                    cost += engine.transfer_penalty(&transfer_handle);
                }
                cost
            }
        };
        links[i].cost = link_cost;
        total += link_cost;
        prev_kind = Some(links[i].kind);
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Path-size overlap.
// ---------------------------------------------------------------------------

type LegKey = (u8, u32, u32);

fn path_legs(
    network: &Network,
    path: &Path,
    variable: OverlapVariable,
    split_transit: bool,
) -> Vec<(LegKey, f64)> {
    let mut legs = Vec::with_capacity(path.links.len());
    for link in &path.links {
        match link.kind {
            LinkKind::Transit if split_transit => {
                let trip = link.trip.expect("transit link without a trip");
                let stops = network.trip_stop_seq(trip);
                let times = network.trip_stop_times(trip);
                for seq in link.board_seq..link.alight_seq {
                    let (a, b) = (seq as usize, seq as usize + 1);
                    let len = match variable {
                        OverlapVariable::Count => 1.0,
                        OverlapVariable::Distance => times[b].shape_dist - times[a].shape_dist,
                        OverlapVariable::Time => {
                            (times[b].arrival_time - times[a].departure_time) as f64 / 60.0
                        }
                    };
                    legs.push(((1, stops[a], stops[b]), len));
                }
            }
            LinkKind::Transit => {
                let len = match variable {
                    OverlapVariable::Count => 1.0,
                    OverlapVariable::Distance => link.dist,
                    OverlapVariable::Time => link.time_min,
                };
                legs.push(((1, link.from.encode(), link.to.encode()), len));
            }
            LinkKind::Access | LinkKind::Egress | LinkKind::Transfer => {
                let len = match variable {
                    OverlapVariable::Count => 1.0,
                    OverlapVariable::Distance => link.dist,
                    OverlapVariable::Time => link.time_min,
                };
                legs.push(((0, link.from.encode(), link.to.encode()), len));
            }
        }
    }
    legs
}

// Ramming / Hoogendoorn-Lanser path-size factor for each path against the
// whole set. PS = 1 for a path disjoint from all others.
pub fn path_sizes(
    network: &Network,
    paths: &[&Path],
    variable: OverlapVariable,
    gamma: f64,
    split_transit: bool,
) -> Vec<f64> {
    let legs: Vec<Vec<(LegKey, f64)>> = paths
        .iter()
        .map(|p| path_legs(network, p, variable, split_transit))
        .collect();
    let lengths: Vec<f64> = legs
        .iter()
        .map(|l| l.iter().map(|(_, len)| len).sum())
        .collect();

    let mut membership: HashMap<LegKey, Vec<usize>> = HashMap::new();
    for (i, path_legs) in legs.iter().enumerate() {
        for (key, _) in path_legs {
            let members = membership.entry(*key).or_default();
            if members.last() != Some(&i) {
                members.push(i);
            }
        }
    }

    let mut sizes = Vec::with_capacity(paths.len());
    for (i, path_legs) in legs.iter().enumerate() {
        let total = lengths[i];
        if total <= 0.0 {
            log::warn!("Path {i} has zero length on the overlap variable; PS set to 1.");
            sizes.push(1.0);
            continue;
        }
        let mut ps = 0.0;
        for (key, len) in path_legs {
            let denominator: f64 = membership[key]
                .iter()
                .map(|&j| (total / lengths[j]).powf(gamma))
                .sum();
            ps += (len / total) / denominator;
        }
        sizes.push(ps);
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::utils::parse_time;

    #[test]
    fn fare_cost_converts_via_value_of_time() {
        let engine = CostEngine {
            theta: 1.0,
            utils_factor: 1.0,
        };
        // $2 at $12/hr is 10 equivalent minutes.
        assert!((engine.fare_cost(2.0, 12.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn fare_tracker_discount_and_allowance() {
        let network = fixtures::fare_network();
        let period_a = network
            .fare_periods
            .iter()
            .position(|p| &*p.id == "period_a")
            .unwrap() as u32;
        let period_b = network
            .fare_periods
            .iter()
            .position(|p| &*p.id == "period_b")
            .unwrap() as u32;
        let t0 = parse_time("09:00:00").unwrap();

        let mut tracker = FareTracker::new();
        let f1 = tracker.commit(&network, Some(period_a), t0, true);
        let f2 = tracker.commit(&network, Some(period_a), t0 + 600, true);
        let f3 = tracker.commit(&network, Some(period_b), t0 + 1200, true);
        assert!((f1 - 1.0).abs() < 1e-12);
        // Second boarding in period A is covered by the allowance.
        assert!(f2.abs() < 1e-12);
        // Period B discounts $0.50 off its $2.00 base after period A.
        assert!((f3 - 1.5).abs() < 1e-12);
    }

    #[test]
    fn fare_tracker_allowance_overrides_rules() {
        let network = fixtures::fare_network();
        let period_a = network
            .fare_periods
            .iter()
            .position(|p| &*p.id == "period_a")
            .unwrap() as u32;
        let t0 = parse_time("09:00:00").unwrap();
        let mut with_rules = FareTracker::new();
        let mut without = FareTracker::new();
        with_rules.commit(&network, Some(period_a), t0, true);
        without.commit(&network, Some(period_a), t0, false);
        // Either way the second in-period boarding is free.
        assert_eq!(
            with_rules.commit(&network, Some(period_a), t0 + 60, true),
            without.commit(&network, Some(period_a), t0 + 60, false)
        );
    }

    #[test]
    fn estimated_fare_credits_later_leg_discount() {
        let network = fixtures::fare_network();
        let period_a = network
            .fare_periods
            .iter()
            .position(|p| &*p.id == "period_a")
            .unwrap() as u32;
        let period_b = network
            .fare_periods
            .iter()
            .position(|p| &*p.id == "period_b")
            .unwrap() as u32;
        // Outbound labeling adds period A knowing period B follows: the $0.50
        // discount on B is credited to the new leg.
        let est = estimated_transit_fare(&network, Some(period_a), Some(period_b), true);
        assert!((est - 0.5).abs() < 1e-12);
        // Inbound labeling adds period B knowing period A precedes it.
        let est = estimated_transit_fare(&network, Some(period_b), Some(period_a), false);
        assert!((est - 1.5).abs() < 1e-12);
    }

    #[test]
    fn identical_paths_halve_path_size() {
        let network = fixtures::five_zone_network();
        let path = fixtures::walk_bus_walk_path(&network);
        let sizes = path_sizes(
            &network,
            &[&path, &path],
            OverlapVariable::Count,
            1.0,
            false,
        );
        assert!((sizes[0] - 0.5).abs() < 1e-12);
        assert!((sizes[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn disjoint_path_has_unit_path_size() {
        let network = fixtures::five_zone_network();
        let path = fixtures::walk_bus_walk_path(&network);
        let sizes = path_sizes(&network, &[&path], OverlapVariable::Count, 1.0, true);
        assert!((sizes[0] - 1.0).abs() < 1e-12);
    }
}
