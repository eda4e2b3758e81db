//! Shared test networks, modeled on the reference five-zone example.

use crate::config::Config;
use crate::dispatcher::{Request, TimeTarget};
use crate::network::{
    AccessLinkRecord, FarePeriodRecord, FareTransferRuleRecord, FareTransferType, Network,
    NetworkTables, RouteRecord, StopRecord, StopTimeRecord, TransferRecord, TripRecord, ZoneRecord,
};
use crate::path::{LinkKind, Path, PathLink, PathNode};
use crate::utils::parse_time;
use crate::weights::{WeightBook, WeightRow};

pub fn weight_row(
    user_class: &str,
    purpose: &str,
    demand_mode_type: &str,
    demand_mode: &str,
    supply_mode: &str,
    weight_name: &str,
    value: f64,
) -> WeightRow {
    WeightRow {
        user_class: user_class.to_owned(),
        purpose: purpose.to_owned(),
        demand_mode_type: demand_mode_type.to_owned(),
        demand_mode: demand_mode.to_owned(),
        supply_mode: supply_mode.to_owned(),
        weight_name: weight_name.to_owned(),
        value,
    }
}

fn t(hms: &str) -> i32 {
    parse_time(hms).unwrap()
}

fn stop(id: &str) -> StopRecord {
    StopRecord {
        id: id.to_owned(),
        fare_zone: None,
    }
}

fn fare_stop(id: &str, zone: &str) -> StopRecord {
    StopRecord {
        id: id.to_owned(),
        fare_zone: Some(zone.to_owned()),
    }
}

fn stop_time(stop: &str, arrival: &str, departure: &str, shape_dist: f64) -> StopTimeRecord {
    StopTimeRecord {
        stop_id: stop.to_owned(),
        arrival_time: t(arrival),
        departure_time: t(departure),
        shape_dist,
    }
}

fn walk_link(stop: &str, time: i32, dist: f64) -> AccessLinkRecord {
    AccessLinkRecord {
        stop_id: stop.to_owned(),
        supply_mode: "walk_access".to_owned(),
        dist,
        time,
    }
}

fn zone(id: &str, access: Vec<AccessLinkRecord>) -> ZoneRecord {
    ZoneRecord {
        id: id.to_owned(),
        access,
    }
}

fn base_weight_rows() -> Vec<WeightRow> {
    vec![
        weight_row("all", "work", "access", "walk", "walk_access", "time_min", 2.0),
        weight_row("all", "work", "egress", "walk", "walk_egress", "time_min", 2.0),
        weight_row("all", "work", "transit", "transit", "local_bus", "wait_time_min", 2.0),
        weight_row("all", "work", "transit", "transit", "local_bus", "in_vehicle_time_min", 1.0),
        weight_row("all", "work", "transfer", "transfer", "transfer", "time_min", 2.0),
        weight_row("all", "work", "transfer", "transfer", "transfer", "transfer_penalty", 1.0),
    ]
}

fn request(
    network: &Network,
    origin: &str,
    destination: &str,
    preferred: &str,
    time_target: TimeTarget,
) -> Request {
    Request {
        person_id: "person-1".into(),
        person_trip_id: "trip-1".into(),
        origin: network.zone_idx(origin).unwrap(),
        destination: network.zone_idx(destination).unwrap(),
        preferred_time: t(preferred),
        time_target,
        value_of_time: 10.0,
        user_class: "all".into(),
        purpose: "work".into(),
        access_modes: vec!["walk".into()],
        transit_mode: "transit".into(),
        egress_modes: vec!["walk".into()],
        pnr_ids: Vec::new(),
        trace: false,
        label_budget: None,
        time_budget: None,
    }
}

// ---------------------------------------------------------------------------
// Five-zone network: one direct local_bus corridor plus a side route and
// transfers, enough to exercise every link type.
// ---------------------------------------------------------------------------

pub fn five_zone_tables() -> NetworkTables {
    NetworkTables {
        stops: vec![stop("A"), stop("B"), stop("C"), stop("D"), stop("E")],
        routes: vec![
            RouteRecord {
                id: "blue".to_owned(),
                mode: "local_bus".to_owned(),
            },
            RouteRecord {
                id: "green".to_owned(),
                mode: "local_bus".to_owned(),
            },
        ],
        trips: vec![
            TripRecord {
                id: "bus1".to_owned(),
                route_id: "blue".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("A", "08:08:00", "08:10:00", 0.0),
                    stop_time("B", "08:20:00", "08:21:00", 5.0),
                ],
            },
            TripRecord {
                id: "bus2".to_owned(),
                route_id: "blue".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("A", "08:20:00", "08:22:00", 0.0),
                    stop_time("B", "08:32:00", "08:33:00", 5.0),
                ],
            },
            TripRecord {
                id: "bus3".to_owned(),
                route_id: "green".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("D", "07:58:00", "08:00:00", 0.0),
                    stop_time("C", "08:06:00", "08:07:00", 3.0),
                ],
            },
        ],
        transfers: vec![
            TransferRecord {
                from_stop: "B".to_owned(),
                to_stop: "C".to_owned(),
                dist: 0.15,
                time: 120,
            },
            TransferRecord {
                from_stop: "A".to_owned(),
                to_stop: "C".to_owned(),
                dist: 0.2,
                time: 180,
            },
        ],
        zones: vec![
            zone("Z1", vec![walk_link("A", 120, 0.15)]),
            zone("Z2", vec![walk_link("B", 120, 0.12)]),
            zone("Z3", vec![walk_link("C", 120, 0.1)]),
            zone("Z4", vec![walk_link("D", 120, 0.1)]),
            zone("Z5", vec![walk_link("E", 120, 0.1)]),
        ],
        fare_periods: Vec::new(),
        fare_transfer_rules: Vec::new(),
    }
}

pub fn five_zone_network() -> Network {
    Network::new(five_zone_tables()).unwrap()
}

pub fn five_zone_scenario() -> (Network, WeightBook, Config) {
    let config = Config::default();
    let weights = WeightBook::from_rows(&base_weight_rows(), config.min_transfer_penalty).unwrap();
    (five_zone_network(), weights, config)
}

pub fn arrival_request(network: &Network, preferred: &str) -> Request {
    request(network, "Z1", "Z2", preferred, TimeTarget::Arrival)
}

pub fn departure_request(network: &Network, preferred: &str) -> Request {
    request(network, "Z1", "Z2", preferred, TimeTarget::Departure)
}

// The direct corridor path by hand: walk, bus1, walk.
pub fn walk_bus_walk_path(network: &Network) -> Path {
    let stop_a = network.stop_idx("A").unwrap();
    let stop_b = network.stop_idx("B").unwrap();
    let trip = network.trip_idx("bus1").unwrap();
    let z1 = network.zone_idx("Z1").unwrap();
    let z2 = network.zone_idx("Z2").unwrap();
    let walk_mode = network.supply_mode_idx("walk_access").unwrap();
    Path {
        links: vec![
            PathLink {
                kind: LinkKind::Access,
                from: PathNode::Zone(z1),
                to: PathNode::Stop(stop_a),
                trip: None,
                board_seq: 0,
                alight_seq: 0,
                supply_mode: walk_mode,
                depart_time: t("08:08:00"),
                arrive_time: t("08:10:00"),
                wait_min: 0.0,
                time_min: 2.0,
                dist: 0.15,
                fare: 0.0,
                fare_period: None,
                cost: 0.0,
            },
            PathLink {
                kind: LinkKind::Transit,
                from: PathNode::Stop(stop_a),
                to: PathNode::Stop(stop_b),
                trip: Some(trip),
                board_seq: 0,
                alight_seq: 1,
                supply_mode: network.route_mode(trip),
                depart_time: t("08:10:00"),
                arrive_time: t("08:20:00"),
                wait_min: 0.0,
                time_min: 10.0,
                dist: 5.0,
                fare: 0.0,
                fare_period: None,
                cost: 0.0,
            },
            PathLink {
                kind: LinkKind::Egress,
                from: PathNode::Stop(stop_b),
                to: PathNode::Zone(z2),
                trip: None,
                board_seq: 0,
                alight_seq: 0,
                supply_mode: walk_mode,
                depart_time: t("08:20:00"),
                arrive_time: t("08:22:00"),
                wait_min: 0.0,
                time_min: 2.0,
                dist: 0.12,
                fare: 0.0,
                fare_period: None,
                cost: 0.0,
            },
        ],
        cost: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Overlap network: two routes sharing the M1-M2 segment. The transfer
// penalty is prohibitive, so sampling only ever produces the two
// single-boarding paths.
// ---------------------------------------------------------------------------

pub const OVERLAP_SHARED_DIST: f64 = 2.0;

pub fn overlap_scenario() -> (Network, WeightBook, Config) {
    let tables = NetworkTables {
        stops: vec![stop("P"), stop("Q"), stop("M1"), stop("M2"), stop("R"), stop("S")],
        routes: vec![
            RouteRecord {
                id: "red".to_owned(),
                mode: "local_bus".to_owned(),
            },
            RouteRecord {
                id: "grey".to_owned(),
                mode: "local_bus".to_owned(),
            },
        ],
        trips: vec![
            TripRecord {
                id: "red1".to_owned(),
                route_id: "red".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("P", "09:00:00", "09:00:00", 0.0),
                    stop_time("M1", "09:05:00", "09:05:00", 2.0),
                    stop_time("M2", "09:10:00", "09:10:00", 4.0),
                    stop_time("R", "09:15:00", "09:15:00", 6.0),
                ],
            },
            TripRecord {
                id: "grey1".to_owned(),
                route_id: "grey".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("Q", "09:01:00", "09:01:00", 0.0),
                    stop_time("M1", "09:06:00", "09:06:00", 2.0),
                    stop_time("M2", "09:11:00", "09:11:00", 4.0),
                    stop_time("S", "09:16:00", "09:16:00", 6.0),
                ],
            },
        ],
        transfers: Vec::new(),
        zones: vec![
            zone(
                "OZ",
                vec![walk_link("P", 120, 0.1), walk_link("Q", 120, 0.1)],
            ),
            zone(
                "DZ",
                vec![walk_link("R", 120, 0.1), walk_link("S", 120, 0.1)],
            ),
        ],
        fare_periods: Vec::new(),
        fare_transfer_rules: Vec::new(),
    };
    let mut rows = base_weight_rows();
    // Chained boardings cost enough to keep the choice set at the two
    // single-seat rides.
    for row in rows.iter_mut() {
        if row.weight_name == "transfer_penalty" {
            row.value = 50.0;
        }
    }
    let config = Config::default();
    let weights = WeightBook::from_rows(&rows, config.min_transfer_penalty).unwrap();
    (Network::new(tables).unwrap(), weights, config)
}

pub fn overlap_request(network: &Network) -> Request {
    request(network, "OZ", "DZ", "09:20:00", TimeTarget::Arrival)
}

// ---------------------------------------------------------------------------
// Competing modes: commuter rail beats a slower bus for a rail demand mode
// whose weights penalize bus in-vehicle time.
// ---------------------------------------------------------------------------

pub fn competing_modes_scenario() -> (Network, WeightBook, Config) {
    let tables = NetworkTables {
        stops: vec![stop("RL1"), stop("RL2"), stop("BS1"), stop("BS2")],
        routes: vec![
            RouteRecord {
                id: "rail".to_owned(),
                mode: "commuter_rail".to_owned(),
            },
            RouteRecord {
                id: "bus".to_owned(),
                mode: "local_bus".to_owned(),
            },
        ],
        trips: vec![
            TripRecord {
                id: "rail1".to_owned(),
                route_id: "rail".to_owned(),
                capacity: 200,
                stop_times: vec![
                    stop_time("RL1", "08:58:00", "09:00:00", 0.0),
                    stop_time("RL2", "09:20:00", "09:21:00", 15.0),
                ],
            },
            TripRecord {
                id: "busX".to_owned(),
                route_id: "bus".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("BS1", "08:58:00", "09:00:00", 0.0),
                    stop_time("BS2", "09:25:00", "09:26:00", 14.0),
                ],
            },
        ],
        transfers: Vec::new(),
        zones: vec![
            zone(
                "RO",
                vec![walk_link("RL1", 120, 0.1), walk_link("BS1", 120, 0.1)],
            ),
            zone(
                "RD",
                vec![walk_link("RL2", 120, 0.1), walk_link("BS2", 120, 0.1)],
            ),
        ],
        fare_periods: Vec::new(),
        fare_transfer_rules: Vec::new(),
    };
    let rows = vec![
        weight_row("all", "work", "access", "walk", "walk_access", "time_min", 2.0),
        weight_row("all", "work", "egress", "walk", "walk_egress", "time_min", 2.0),
        weight_row("all", "work", "transit", "commuter_rail", "commuter_rail", "wait_time_min", 2.0),
        weight_row("all", "work", "transit", "commuter_rail", "commuter_rail", "in_vehicle_time_min", 1.0),
        weight_row("all", "work", "transit", "commuter_rail", "local_bus", "wait_time_min", 2.0),
        weight_row("all", "work", "transit", "commuter_rail", "local_bus", "in_vehicle_time_min", 1.5),
        weight_row("all", "work", "transfer", "transfer", "transfer", "time_min", 2.0),
        weight_row("all", "work", "transfer", "transfer", "transfer", "transfer_penalty", 1.0),
    ];
    let config = Config::default();
    let weights = WeightBook::from_rows(&rows, config.min_transfer_penalty).unwrap();
    (Network::new(tables).unwrap(), weights, config)
}

pub fn rail_request(network: &Network) -> Request {
    let mut req = request(network, "RO", "RD", "09:30:00", TimeTarget::Arrival);
    req.transit_mode = "commuter_rail".into();
    req
}

// ---------------------------------------------------------------------------
// Fare networks.
// ---------------------------------------------------------------------------

// Small network for fare lookup and tracker unit tests: an exact-match
// period between z1 and z2 and a follow-on period with a discount rule.
pub fn fare_network() -> Network {
    let tables = NetworkTables {
        stops: vec![
            fare_stop("F1", "z1"),
            fare_stop("F2", "z2"),
            fare_stop("F3", "z3"),
        ],
        routes: vec![RouteRecord {
            id: "fr".to_owned(),
            mode: "local_bus".to_owned(),
        }],
        trips: vec![TripRecord {
            id: "a1".to_owned(),
            route_id: "fr".to_owned(),
            capacity: 40,
            stop_times: vec![
                stop_time("F1", "09:00:00", "09:00:00", 0.0),
                stop_time("F2", "09:10:00", "09:10:00", 2.0),
                stop_time("F3", "09:20:00", "09:20:00", 4.0),
            ],
        }],
        transfers: Vec::new(),
        zones: vec![zone("FZ1", vec![walk_link("F1", 120, 0.1)])],
        fare_periods: vec![
            FarePeriodRecord {
                id: "period_a".to_owned(),
                route_id: Some("fr".to_owned()),
                origin_zone: Some("z1".to_owned()),
                destination_zone: Some("z2".to_owned()),
                start_time: t("00:00:00"),
                end_time: t("24:00:00"),
                price: 1.0,
                free_transfers: 1,
                transfer_duration: 3600,
            },
            FarePeriodRecord {
                id: "period_b".to_owned(),
                route_id: Some("fr".to_owned()),
                origin_zone: Some("z2".to_owned()),
                destination_zone: Some("z3".to_owned()),
                start_time: t("00:00:00"),
                end_time: t("24:00:00"),
                price: 2.0,
                free_transfers: 0,
                transfer_duration: 0,
            },
        ],
        fare_transfer_rules: vec![FareTransferRuleRecord {
            from_period: "period_a".to_owned(),
            to_period: "period_b".to_owned(),
            rule: FareTransferType::Discount,
            amount: 0.5,
        }],
    };
    Network::new(tables).unwrap()
}

// End-to-end fare chain: three boardings priced A, A, B, with a free
// transfer inside A and a discount from A to B.
pub fn fare_scenario() -> (Network, WeightBook, Config) {
    let tables = NetworkTables {
        stops: vec![
            fare_stop("G1", "inner"),
            fare_stop("G2", "inner"),
            fare_stop("G3", "inner"),
            fare_stop("G4", "outer"),
        ],
        routes: vec![
            RouteRecord {
                id: "leg_a".to_owned(),
                mode: "local_bus".to_owned(),
            },
            RouteRecord {
                id: "leg_b".to_owned(),
                mode: "local_bus".to_owned(),
            },
            RouteRecord {
                id: "leg_c".to_owned(),
                mode: "local_bus".to_owned(),
            },
        ],
        trips: vec![
            TripRecord {
                id: "ta".to_owned(),
                route_id: "leg_a".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("G1", "09:00:00", "09:00:00", 0.0),
                    stop_time("G2", "09:10:00", "09:10:00", 2.0),
                ],
            },
            TripRecord {
                id: "tb".to_owned(),
                route_id: "leg_b".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("G2", "09:14:00", "09:15:00", 0.0),
                    stop_time("G3", "09:25:00", "09:25:00", 2.0),
                ],
            },
            TripRecord {
                id: "tc".to_owned(),
                route_id: "leg_c".to_owned(),
                capacity: 40,
                stop_times: vec![
                    stop_time("G3", "09:29:00", "09:30:00", 0.0),
                    stop_time("G4", "09:40:00", "09:40:00", 2.0),
                ],
            },
        ],
        transfers: Vec::new(),
        zones: vec![
            zone("FZ1", vec![walk_link("G1", 120, 0.1)]),
            zone("FZ2", vec![walk_link("G4", 120, 0.1)]),
        ],
        fare_periods: vec![
            FarePeriodRecord {
                id: "fare_a".to_owned(),
                route_id: None,
                origin_zone: Some("inner".to_owned()),
                destination_zone: Some("inner".to_owned()),
                start_time: t("00:00:00"),
                end_time: t("24:00:00"),
                price: 1.0,
                free_transfers: 1,
                transfer_duration: 3600,
            },
            FarePeriodRecord {
                id: "fare_b".to_owned(),
                route_id: None,
                origin_zone: Some("inner".to_owned()),
                destination_zone: Some("outer".to_owned()),
                start_time: t("00:00:00"),
                end_time: t("24:00:00"),
                price: 2.0,
                free_transfers: 0,
                transfer_duration: 0,
            },
        ],
        fare_transfer_rules: vec![FareTransferRuleRecord {
            from_period: "fare_a".to_owned(),
            to_period: "fare_b".to_owned(),
            rule: FareTransferType::Discount,
            amount: 0.5,
        }],
    };
    let config = Config::default();
    let weights = WeightBook::from_rows(&base_weight_rows(), config.min_transfer_penalty).unwrap();
    (Network::new(tables).unwrap(), weights, config)
}

pub fn fare_request(network: &Network) -> Request {
    let mut req = request(network, "FZ1", "FZ2", "09:45:00", TimeTarget::Arrival);
    req.value_of_time = 60.0;
    req
}
