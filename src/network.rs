use crate::error::{PathfindingError, PathfindingResult};
use std::collections::HashMap;

// Timestamp is seconds from the assignment-day epoch (may exceed 24h for
// service past midnight, or go negative for pre-dawn access walks).
pub type Timestamp = i32;
pub type StopIndex = u32;
pub type RouteIndex = u32;
pub type TripIndex = u32;
pub type ZoneIndex = u32;
pub type SupplyModeIndex = u32;
pub type FareZoneIndex = u32;
pub type FarePeriodIndex = u32;
pub type Cost = f64;

// Labels at or above this cost are treated as unreachable.
pub const MAX_COST: Cost = 999_999.0;

// ---------------------------------------------------------------------------
// Input records. These are the in-memory tables handed over by the parsing
// collaborator; the core never touches file formats.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StopRecord {
    pub id: String,
    // Fare zone the stop belongs to, if the fare system is zonal.
    pub fare_zone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub id: String,
    // Transit supply mode, e.g. "local_bus" or "commuter_rail". Must match
    // the supply_mode column of the weight table.
    pub mode: String,
}

#[derive(Debug, Clone)]
pub struct StopTimeRecord {
    pub stop_id: String,
    pub arrival_time: Timestamp,
    pub departure_time: Timestamp,
    // Cumulative distance along the trip shape, used by overlap splitting.
    pub shape_dist: f64,
}

#[derive(Debug, Clone)]
pub struct TripRecord {
    pub id: String,
    pub route_id: String,
    pub capacity: u32,
    // In stop-sequence order; the 1-indexed contiguous sequence numbers of
    // the interchange standard are implicit in the ordering here.
    pub stop_times: Vec<StopTimeRecord>,
}

#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub from_stop: String,
    pub to_stop: String,
    pub dist: f64,
    pub time: i32,
}

#[derive(Debug, Clone)]
pub struct AccessLinkRecord {
    pub stop_id: String,
    // e.g. "walk_access", "bike_access", "pnr_access". The same link serves
    // egress under the matching "_egress" demand mode.
    pub supply_mode: String,
    pub dist: f64,
    pub time: i32,
}

#[derive(Debug, Clone)]
pub struct ZoneRecord {
    pub id: String,
    pub access: Vec<AccessLinkRecord>,
}

#[derive(Debug, Clone)]
pub struct FarePeriodRecord {
    pub id: String,
    pub route_id: Option<String>,
    // Both zones or neither; a half-specified zone pair is rejected.
    pub origin_zone: Option<String>,
    pub destination_zone: Option<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub price: f64,
    // In-period allowance: this many boardings after the first are free when
    // made within transfer_duration seconds of the first boarding.
    pub free_transfers: u32,
    pub transfer_duration: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FareTransferType {
    Discount,
    Free,
    Fixed,
}

#[derive(Debug, Clone)]
pub struct FareTransferRuleRecord {
    pub from_period: String,
    pub to_period: String,
    pub rule: FareTransferType,
    pub amount: f64,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkTables {
    pub stops: Vec<StopRecord>,
    pub routes: Vec<RouteRecord>,
    pub trips: Vec<TripRecord>,
    pub transfers: Vec<TransferRecord>,
    pub zones: Vec<ZoneRecord>,
    pub fare_periods: Vec<FarePeriodRecord>,
    pub fare_transfer_rules: Vec<FareTransferRuleRecord>,
}

// ---------------------------------------------------------------------------
// Arenas. Cross-references are integer indices; the Network owns everything.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct StopTime {
    pub arrival_time: Timestamp,
    pub departure_time: Timestamp,
    pub shape_dist: f64,
}

#[derive(Debug)]
pub struct Trip {
    pub id: Box<str>,
    pub route: RouteIndex,
    pub capacity: u32,
    pub stop_times_idx: usize,
    pub num_stops: u32,
}

impl Trip {
    pub fn seq_range(&self) -> std::ops::Range<usize> {
        self.stop_times_idx..(self.stop_times_idx + self.num_stops as usize)
    }
}

#[derive(Debug)]
pub struct Route {
    pub id: Box<str>,
    pub mode: SupplyModeIndex,
}

#[derive(Debug)]
pub struct Stop {
    pub id: Box<str>,
    pub fare_zone: Option<FareZoneIndex>,
    pub transfers_idx: usize,
    pub num_transfers: usize,
    pub trip_times_idx: usize,
    pub num_trip_times: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Transfer {
    pub to_stop: StopIndex,
    pub dist: f64,
    pub time: i32,
}

// One scheduled visit of a trip to a stop. `seq` is the 0-based position
// within the trip.
#[derive(Debug, Clone, Copy)]
pub struct TripStopTime {
    pub trip: TripIndex,
    pub seq: u32,
    pub arrival_time: Timestamp,
    pub departure_time: Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct AccessLink {
    pub stop: StopIndex,
    pub supply_mode: SupplyModeIndex,
    pub dist: f64,
    pub time: i32,
}

#[derive(Debug)]
pub struct Zone {
    pub id: Box<str>,
    pub access_idx: usize,
    pub num_access: usize,
}

#[derive(Debug)]
pub struct FarePeriod {
    pub id: Box<str>,
    pub route: Option<RouteIndex>,
    pub origin_zone: Option<FareZoneIndex>,
    pub destination_zone: Option<FareZoneIndex>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub price: f64,
    pub free_transfers: u32,
    pub transfer_duration: i32,
}

impl FarePeriod {
    fn covers(&self, time: Timestamp) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

#[derive(Debug)]
pub struct Network {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub zones: Vec<Zone>,
    // The stop times for each trip (indexed by trip.seq_range()).
    pub stop_times: Vec<StopTime>,
    // The stop at each position of each trip (parallel to stop_times).
    pub trip_stops: Vec<StopIndex>,
    // Symmetric transfer adjacency (indexed by stop.transfers_idx..).
    pub transfers: Vec<Transfer>,
    // Access links for each zone (indexed by zone.access_idx..).
    pub access_links: Vec<AccessLink>,
    // Per-stop trip visits sorted by arrival time (indexed by stop.trip_times_idx..).
    stop_arrivals: Vec<TripStopTime>,
    // The same visits sorted by departure time, sharing the per-stop windows.
    stop_departures: Vec<TripStopTime>,
    pub supply_modes: Vec<Box<str>>,
    pub fare_zones: Vec<Box<str>>,
    pub fare_periods: Vec<FarePeriod>,
    fare_exact: HashMap<(RouteIndex, FareZoneIndex, FareZoneIndex), Vec<FarePeriodIndex>>,
    fare_by_route: HashMap<RouteIndex, Vec<FarePeriodIndex>>,
    fare_by_zones: HashMap<(FareZoneIndex, FareZoneIndex), Vec<FarePeriodIndex>>,
    fare_default: Vec<FarePeriodIndex>,
    fare_transfer_rules: HashMap<(FarePeriodIndex, FarePeriodIndex), (FareTransferType, f64)>,
    stop_index: HashMap<String, StopIndex>,
    zone_index: HashMap<String, ZoneIndex>,
    trip_index: HashMap<String, TripIndex>,
    supply_mode_index: HashMap<String, SupplyModeIndex>,
}

impl Network {
    pub fn new(tables: NetworkTables) -> PathfindingResult<Self> {
        let mut supply_modes: Vec<Box<str>> = Vec::new();
        let mut supply_mode_index = HashMap::new();
        let intern_mode = |name: &str,
                               supply_modes: &mut Vec<Box<str>>,
                               supply_mode_index: &mut HashMap<String, SupplyModeIndex>|
         -> SupplyModeIndex {
            match supply_mode_index.get(name) {
                Some(&idx) => idx,
                None => {
                    let idx = supply_modes.len() as SupplyModeIndex;
                    supply_modes.push(name.into());
                    supply_mode_index.insert(name.to_owned(), idx);
                    idx
                }
            }
        };

        let mut fare_zones: Vec<Box<str>> = Vec::new();
        let mut fare_zone_index: HashMap<String, FareZoneIndex> = HashMap::new();
        let intern_fare_zone = |name: &str,
                                    fare_zones: &mut Vec<Box<str>>,
                                    fare_zone_index: &mut HashMap<String, FareZoneIndex>|
         -> FareZoneIndex {
            match fare_zone_index.get(name) {
                Some(&idx) => idx,
                None => {
                    let idx = fare_zones.len() as FareZoneIndex;
                    fare_zones.push(name.into());
                    fare_zone_index.insert(name.to_owned(), idx);
                    idx
                }
            }
        };

        // Stops.
        let mut stop_index = HashMap::with_capacity(tables.stops.len());
        let mut stops = Vec::with_capacity(tables.stops.len());
        for record in &tables.stops {
            if stop_index.contains_key(&record.id) {
                return Err(PathfindingError::InvariantViolation(format!(
                    "duplicate stop id {}",
                    record.id
                )));
            }
            stop_index.insert(record.id.clone(), stops.len() as StopIndex);
            stops.push(Stop {
                id: record.id.as_str().into(),
                fare_zone: record
                    .fare_zone
                    .as_deref()
                    .map(|z| intern_fare_zone(z, &mut fare_zones, &mut fare_zone_index)),
                transfers_idx: 0,
                num_transfers: 0,
                trip_times_idx: 0,
                num_trip_times: 0,
            });
        }

        // Routes.
        let mut route_index = HashMap::with_capacity(tables.routes.len());
        let mut routes = Vec::with_capacity(tables.routes.len());
        for record in &tables.routes {
            if route_index.contains_key(&record.id) {
                return Err(PathfindingError::InvariantViolation(format!(
                    "duplicate route id {}",
                    record.id
                )));
            }
            route_index.insert(record.id.clone(), routes.len() as RouteIndex);
            routes.push(Route {
                id: record.id.as_str().into(),
                mode: intern_mode(&record.mode, &mut supply_modes, &mut supply_mode_index),
            });
        }

        // Trips and stop times.
        let mut trip_index = HashMap::with_capacity(tables.trips.len());
        let mut trips = Vec::with_capacity(tables.trips.len());
        let mut stop_times = Vec::new();
        let mut trip_stops = Vec::new();
        for record in &tables.trips {
            let route = *route_index.get(&record.route_id).ok_or_else(|| {
                PathfindingError::InvariantViolation(format!(
                    "trip {} references unknown route {}",
                    record.id, record.route_id
                ))
            })?;
            if record.stop_times.is_empty() {
                return Err(PathfindingError::InvariantViolation(format!(
                    "trip {} has no stop times",
                    record.id
                )));
            }
            if trip_index.contains_key(&record.id) {
                return Err(PathfindingError::InvariantViolation(format!(
                    "duplicate trip id {}",
                    record.id
                )));
            }
            let stop_times_idx = stop_times.len();
            let mut prev_departure = Timestamp::MIN;
            for st in &record.stop_times {
                let stop = *stop_index.get(&st.stop_id).ok_or_else(|| {
                    PathfindingError::InvariantViolation(format!(
                        "trip {} references unknown stop {}",
                        record.id, st.stop_id
                    ))
                })?;
                if st.departure_time < st.arrival_time {
                    return Err(PathfindingError::InvariantViolation(format!(
                        "trip {} departs stop {} before arriving",
                        record.id, st.stop_id
                    )));
                }
                if st.arrival_time < prev_departure {
                    return Err(PathfindingError::InvariantViolation(format!(
                        "trip {} stop times are not sorted at stop {}",
                        record.id, st.stop_id
                    )));
                }
                prev_departure = st.departure_time;
                trip_stops.push(stop);
                stop_times.push(StopTime {
                    arrival_time: st.arrival_time,
                    departure_time: st.departure_time,
                    shape_dist: st.shape_dist,
                });
            }
            trip_index.insert(record.id.clone(), trips.len() as TripIndex);
            trips.push(Trip {
                id: record.id.as_str().into(),
                route,
                capacity: record.capacity,
                stop_times_idx,
                num_stops: record.stop_times.len() as u32,
            });
        }

        // The transfer supply mode always exists so transfer links and their
        // weight maps resolve even on networks whose tables never name it.
        intern_mode("transfer", &mut supply_modes, &mut supply_mode_index);

        // Symmetric transfer adjacency: a listed walk is usable both ways.
        let mut transfer_map: HashMap<(StopIndex, StopIndex), Transfer> = HashMap::new();
        for record in &tables.transfers {
            let from = *stop_index.get(&record.from_stop).ok_or_else(|| {
                PathfindingError::InvariantViolation(format!(
                    "transfer references unknown stop {}",
                    record.from_stop
                ))
            })?;
            let to = *stop_index.get(&record.to_stop).ok_or_else(|| {
                PathfindingError::InvariantViolation(format!(
                    "transfer references unknown stop {}",
                    record.to_stop
                ))
            })?;
            if record.time < 0 {
                return Err(PathfindingError::InvariantViolation(format!(
                    "negative transfer time between {} and {}",
                    record.from_stop, record.to_stop
                )));
            }
            for (a, b) in [(from, to), (to, from)] {
                transfer_map.entry((a, b)).or_insert(Transfer {
                    to_stop: b,
                    dist: record.dist,
                    time: record.time,
                });
            }
        }
        let mut transfer_lists: Vec<Vec<Transfer>> = vec![Vec::new(); stops.len()];
        for ((from, _), transfer) in transfer_map {
            transfer_lists[from as usize].push(transfer);
        }
        let mut transfers = Vec::new();
        for (stop_idx, stop) in stops.iter_mut().enumerate() {
            let mut list = std::mem::take(&mut transfer_lists[stop_idx]);
            list.sort_unstable_by_key(|t| t.to_stop);
            stop.transfers_idx = transfers.len();
            stop.num_transfers = list.len();
            transfers.extend(list);
        }

        // Zones and access links.
        let mut zone_index = HashMap::with_capacity(tables.zones.len());
        let mut zones = Vec::with_capacity(tables.zones.len());
        let mut access_links = Vec::new();
        for record in &tables.zones {
            if zone_index.contains_key(&record.id) {
                return Err(PathfindingError::InvariantViolation(format!(
                    "duplicate zone id {}",
                    record.id
                )));
            }
            let access_idx = access_links.len();
            for link in &record.access {
                let stop = *stop_index.get(&link.stop_id).ok_or_else(|| {
                    PathfindingError::InvariantViolation(format!(
                        "zone {} access link references unknown stop {}",
                        record.id, link.stop_id
                    ))
                })?;
                access_links.push(AccessLink {
                    stop,
                    supply_mode: intern_mode(
                        &link.supply_mode,
                        &mut supply_modes,
                        &mut supply_mode_index,
                    ),
                    dist: link.dist,
                    time: link.time,
                });
            }
            zone_index.insert(record.id.clone(), zones.len() as ZoneIndex);
            zones.push(Zone {
                id: record.id.as_str().into(),
                access_idx,
                num_access: record.access.len(),
            });
        }

        // Per-stop trip visit indices, one copy sorted by arrival and one by
        // departure, sharing the per-stop windows.
        let mut visit_lists: Vec<Vec<TripStopTime>> = vec![Vec::new(); stops.len()];
        for (trip_idx, trip) in trips.iter().enumerate() {
            for (seq, pos) in trip.seq_range().enumerate() {
                visit_lists[trip_stops[pos] as usize].push(TripStopTime {
                    trip: trip_idx as TripIndex,
                    seq: seq as u32,
                    arrival_time: stop_times[pos].arrival_time,
                    departure_time: stop_times[pos].departure_time,
                });
            }
        }
        let mut stop_arrivals = Vec::new();
        let mut stop_departures = Vec::new();
        for (stop_idx, stop) in stops.iter_mut().enumerate() {
            let mut list = std::mem::take(&mut visit_lists[stop_idx]);
            stop.trip_times_idx = stop_arrivals.len();
            stop.num_trip_times = list.len();
            list.sort_unstable_by_key(|v| (v.arrival_time, v.trip, v.seq));
            stop_arrivals.extend(list.iter().copied());
            list.sort_unstable_by_key(|v| (v.departure_time, v.trip, v.seq));
            stop_departures.extend(list);
        }

        // Fare periods, compiled into the lookup cascade.
        let mut fare_period_index: HashMap<String, FarePeriodIndex> = HashMap::new();
        let mut fare_periods = Vec::with_capacity(tables.fare_periods.len());
        let mut fare_exact: HashMap<(RouteIndex, FareZoneIndex, FareZoneIndex), Vec<FarePeriodIndex>> =
            HashMap::new();
        let mut fare_by_route: HashMap<RouteIndex, Vec<FarePeriodIndex>> = HashMap::new();
        let mut fare_by_zones: HashMap<(FareZoneIndex, FareZoneIndex), Vec<FarePeriodIndex>> =
            HashMap::new();
        let mut fare_default = Vec::new();
        for record in &tables.fare_periods {
            if record.start_time >= record.end_time {
                return Err(PathfindingError::InvariantViolation(format!(
                    "fare period {} has an empty time window",
                    record.id
                )));
            }
            if record.price < 0.0 {
                return Err(PathfindingError::InvariantViolation(format!(
                    "fare period {} has a negative price",
                    record.id
                )));
            }
            let route = match &record.route_id {
                Some(id) => Some(*route_index.get(id).ok_or_else(|| {
                    PathfindingError::InvariantViolation(format!(
                        "fare period {} references unknown route {}",
                        record.id, id
                    ))
                })?),
                None => None,
            };
            let zones_pair = match (&record.origin_zone, &record.destination_zone) {
                (Some(o), Some(d)) => Some((
                    intern_fare_zone(o, &mut fare_zones, &mut fare_zone_index),
                    intern_fare_zone(d, &mut fare_zones, &mut fare_zone_index),
                )),
                (None, None) => None,
                _ => {
                    return Err(PathfindingError::InvariantViolation(format!(
                        "fare period {} must name both zones or neither",
                        record.id
                    )))
                }
            };
            let idx = fare_periods.len() as FarePeriodIndex;
            if fare_period_index.contains_key(&record.id) {
                return Err(PathfindingError::InvariantViolation(format!(
                    "duplicate fare period id {}",
                    record.id
                )));
            }
            fare_period_index.insert(record.id.clone(), idx);
            match (route, zones_pair) {
                (Some(r), Some((o, d))) => fare_exact.entry((r, o, d)).or_default().push(idx),
                (Some(r), None) => fare_by_route.entry(r).or_default().push(idx),
                (None, Some((o, d))) => fare_by_zones.entry((o, d)).or_default().push(idx),
                (None, None) => fare_default.push(idx),
            }
            fare_periods.push(FarePeriod {
                id: record.id.as_str().into(),
                route,
                origin_zone: zones_pair.map(|(o, _)| o),
                destination_zone: zones_pair.map(|(_, d)| d),
                start_time: record.start_time,
                end_time: record.end_time,
                price: record.price,
                free_transfers: record.free_transfers,
                transfer_duration: record.transfer_duration,
            });
        }

        let mut fare_transfer_rules = HashMap::new();
        for record in &tables.fare_transfer_rules {
            let from = *fare_period_index.get(&record.from_period).ok_or_else(|| {
                PathfindingError::InvariantViolation(format!(
                    "fare transfer rule references unknown period {}",
                    record.from_period
                ))
            })?;
            let to = *fare_period_index.get(&record.to_period).ok_or_else(|| {
                PathfindingError::InvariantViolation(format!(
                    "fare transfer rule references unknown period {}",
                    record.to_period
                ))
            })?;
            fare_transfer_rules.insert((from, to), (record.rule, record.amount));
        }

        let network = Self {
            stops,
            routes,
            trips,
            zones,
            stop_times,
            trip_stops,
            transfers,
            access_links,
            stop_arrivals,
            stop_departures,
            supply_modes,
            fare_zones,
            fare_periods,
            fare_exact,
            fare_by_route,
            fare_by_zones,
            fare_default,
            fare_transfer_rules,
            stop_index,
            zone_index,
            trip_index,
            supply_mode_index,
        };
        network.print_stats();
        Ok(network)
    }

    // -- topology queries ---------------------------------------------------

    pub fn transfers_from(&self, stop: StopIndex) -> &[Transfer] {
        let stop = &self.stops[stop as usize];
        &self.transfers[stop.transfers_idx..(stop.transfers_idx + stop.num_transfers)]
    }

    fn stop_visits<'a>(&self, list: &'a [TripStopTime], stop: StopIndex) -> &'a [TripStopTime] {
        let stop = &self.stops[stop as usize];
        &list[stop.trip_times_idx..(stop.trip_times_idx + stop.num_trip_times)]
    }

    // Trip visits arriving at `stop` in (latest_arrival - window, latest_arrival].
    pub fn trips_arriving_within(
        &self,
        stop: StopIndex,
        latest_arrival: Timestamp,
        window: i32,
    ) -> &[TripStopTime] {
        let visits = self.stop_visits(&self.stop_arrivals, stop);
        let lo = visits.partition_point(|v| v.arrival_time <= latest_arrival - window);
        let hi = visits.partition_point(|v| v.arrival_time <= latest_arrival);
        &visits[lo..hi]
    }

    // Trip visits departing from `stop` in [earliest_departure, earliest_departure + window).
    pub fn trips_departing_within(
        &self,
        stop: StopIndex,
        earliest_departure: Timestamp,
        window: i32,
    ) -> &[TripStopTime] {
        let visits = self.stop_visits(&self.stop_departures, stop);
        let lo = visits.partition_point(|v| v.departure_time < earliest_departure);
        let hi = visits.partition_point(|v| v.departure_time < earliest_departure + window);
        &visits[lo..hi]
    }

    pub fn trip_stop_times(&self, trip: TripIndex) -> &[StopTime] {
        &self.stop_times[self.trips[trip as usize].seq_range()]
    }

    pub fn trip_stop_seq(&self, trip: TripIndex) -> &[StopIndex] {
        &self.trip_stops[self.trips[trip as usize].seq_range()]
    }

    pub fn trip_stop(&self, trip: TripIndex, seq: u32) -> StopIndex {
        self.trip_stop_seq(trip)[seq as usize]
    }

    pub fn access_links(&self, zone: ZoneIndex) -> &[AccessLink] {
        let zone = &self.zones[zone as usize];
        &self.access_links[zone.access_idx..(zone.access_idx + zone.num_access)]
    }

    // Egress links are the access links read in the other direction.
    pub fn egress_links(&self, zone: ZoneIndex) -> &[AccessLink] {
        self.access_links(zone)
    }

    pub fn stop_fare_zone(&self, stop: StopIndex) -> Option<FareZoneIndex> {
        self.stops[stop as usize].fare_zone
    }

    // -- fares --------------------------------------------------------------

    // Rule cascade: exact (route, origin, destination), then route-only, then
    // zone-pair-only, then default; within each layer the period must cover
    // the boarding time. With `zone_symmetry`, a reversed zone pair matches
    // when the directed pair has no period (an exact directed match wins).
    pub fn fare_period(
        &self,
        route: RouteIndex,
        board_zone: Option<FareZoneIndex>,
        alight_zone: Option<FareZoneIndex>,
        time: Timestamp,
        zone_symmetry: bool,
    ) -> Option<FarePeriodIndex> {
        let covering = |candidates: Option<&Vec<FarePeriodIndex>>| -> Option<FarePeriodIndex> {
            candidates?
                .iter()
                .copied()
                .find(|&idx| self.fare_periods[idx as usize].covers(time))
        };
        if let (Some(o), Some(d)) = (board_zone, alight_zone) {
            if let Some(idx) = covering(self.fare_exact.get(&(route, o, d))) {
                return Some(idx);
            }
            if zone_symmetry {
                if let Some(idx) = covering(self.fare_exact.get(&(route, d, o))) {
                    return Some(idx);
                }
            }
        }
        if let Some(idx) = covering(self.fare_by_route.get(&route)) {
            return Some(idx);
        }
        if let (Some(o), Some(d)) = (board_zone, alight_zone) {
            if let Some(idx) = covering(self.fare_by_zones.get(&(o, d))) {
                return Some(idx);
            }
            if zone_symmetry {
                if let Some(idx) = covering(self.fare_by_zones.get(&(d, o))) {
                    return Some(idx);
                }
            }
        }
        covering(Some(&self.fare_default))
    }

    pub fn fare_transfer_rule(
        &self,
        from: FarePeriodIndex,
        to: FarePeriodIndex,
    ) -> Option<(FareTransferType, f64)> {
        self.fare_transfer_rules.get(&(from, to)).copied()
    }

    // -- id lookups ---------------------------------------------------------

    pub fn stop_idx(&self, stop_id: &str) -> Option<StopIndex> {
        self.stop_index.get(stop_id).copied()
    }

    pub fn zone_idx(&self, zone_id: &str) -> Option<ZoneIndex> {
        self.zone_index.get(zone_id).copied()
    }

    pub fn trip_idx(&self, trip_id: &str) -> Option<TripIndex> {
        self.trip_index.get(trip_id).copied()
    }

    pub fn supply_mode_idx(&self, name: &str) -> Option<SupplyModeIndex> {
        self.supply_mode_index.get(name).copied()
    }

    pub fn supply_mode_name(&self, mode: SupplyModeIndex) -> &str {
        &self.supply_modes[mode as usize]
    }

    pub fn route_mode(&self, trip: TripIndex) -> SupplyModeIndex {
        self.routes[self.trips[trip as usize].route as usize].mode
    }

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn print_stats(&self) {
        log::info!(
            "Network has {} stops, {} routes, {} trips, {} transfers, {} zones and {} fare periods.",
            self.stops.len(),
            self.routes.len(),
            self.trips.len(),
            self.transfers.len(),
            self.zones.len(),
            self.fare_periods.len()
        );
    }
}
