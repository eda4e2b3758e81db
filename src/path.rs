use crate::network::{
    Cost, FarePeriodIndex, Network, StopIndex, SupplyModeIndex, Timestamp, TripIndex, ZoneIndex,
};
use crate::utils;
use std::fmt::Display;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PathNode {
    Zone(ZoneIndex),
    Stop(StopIndex),
}

impl PathNode {
    // Compact encoding for signatures and overlap leg keys.
    pub(crate) fn encode(self) -> u32 {
        match self {
            PathNode::Stop(s) => s,
            PathNode::Zone(z) => 0x8000_0000 | z,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LinkKind {
    Access,
    Transit,
    Transfer,
    Egress,
}

// One leg of a concrete path. Times are actual clock times; wait_min is the
// dwell at the boarding stop before a transit leg.
#[derive(Clone, Debug)]
pub struct PathLink {
    pub kind: LinkKind,
    pub from: PathNode,
    pub to: PathNode,
    pub trip: Option<TripIndex>,
    pub board_seq: u32,
    pub alight_seq: u32,
    pub supply_mode: SupplyModeIndex,
    pub depart_time: Timestamp,
    pub arrive_time: Timestamp,
    pub wait_min: f64,
    pub time_min: f64,
    pub dist: f64,
    pub fare: f64,
    pub fare_period: Option<FarePeriodIndex>,
    pub cost: Cost,
}

pub type PathSignature = Vec<(u8, u32, u32, u32)>;

#[derive(Clone, Debug, Default)]
pub struct Path {
    pub links: Vec<PathLink>,
    // Generalized cost before the overlap correction.
    pub cost: Cost,
}

impl Path {
    // Identity for dedup: the link sequence with trips and board/alight stops,
    // ignoring costs and fares.
    pub fn signature(&self) -> PathSignature {
        self.links
            .iter()
            .map(|link| {
                (
                    match link.kind {
                        LinkKind::Access => 0u8,
                        LinkKind::Transit => 1,
                        LinkKind::Transfer => 2,
                        LinkKind::Egress => 3,
                    },
                    link.from.encode(),
                    link.to.encode(),
                    link.trip.map(|t| t + 1).unwrap_or(0),
                )
            })
            .collect()
    }

    pub fn depart_time(&self) -> Option<Timestamp> {
        self.links.first().map(|l| l.depart_time)
    }

    pub fn arrive_time(&self) -> Option<Timestamp> {
        self.links.last().map(|l| l.arrive_time)
    }

    pub fn num_boardings(&self) -> u32 {
        self.links
            .iter()
            .filter(|l| l.kind == LinkKind::Transit)
            .count() as u32
    }

    pub fn total_fare(&self) -> f64 {
        self.links.iter().map(|l| l.fare).sum()
    }

    pub fn display<'a>(&'a self, network: &'a Network) -> PathDisplay<'a> {
        PathDisplay {
            path: self,
            network,
        }
    }
}

pub struct PathDisplay<'a> {
    path: &'a Path,
    network: &'a Network,
}

impl Display for PathDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node_name = |node: PathNode| -> &str {
            match node {
                PathNode::Stop(s) => &self.network.stops[s as usize].id,
                PathNode::Zone(z) => &self.network.zones[z as usize].id,
            }
        };
        for link in self.path.links.iter() {
            match link.kind {
                LinkKind::Transit => {
                    let trip = &self.network.trips[link.trip.unwrap_or(0) as usize];
                    writeln!(
                        f,
                        "Board {} at {} at {}, alight at {} at {}.",
                        trip.id,
                        node_name(link.from),
                        utils::time_str(link.depart_time),
                        node_name(link.to),
                        utils::time_str(link.arrive_time),
                    )?;
                }
                LinkKind::Access | LinkKind::Egress | LinkKind::Transfer => {
                    writeln!(
                        f,
                        "{} from {} at {} to {} at {}.",
                        self.network.supply_mode_name(link.supply_mode),
                        node_name(link.from),
                        utils::time_str(link.depart_time),
                        node_name(link.to),
                        utils::time_str(link.arrive_time),
                    )?;
                }
            }
        }
        if let (Some(dep), Some(arr)) = (self.path.depart_time(), self.path.arrive_time()) {
            writeln!(f, "Total journey time: {} minutes.", (arr - dep) / 60)?;
        }
        Ok(())
    }
}

// A scored member of a pathset. `count` is the sampling frequency from the
// enumerator; duplicates collapse into it.
#[derive(Clone, Debug)]
pub struct PathsetEntry {
    pub path: Path,
    pub count: u32,
    pub cost: Cost,
    pub path_size: f64,
    pub probability: f64,
    pub chosen: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Pathset {
    pub entries: Vec<PathsetEntry>,
}

impl Pathset {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chosen(&self) -> Option<&PathsetEntry> {
        self.entries.iter().find(|e| e.chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk_link(kind: LinkKind, from: PathNode, to: PathNode) -> PathLink {
        PathLink {
            kind,
            from,
            to,
            trip: None,
            board_seq: 0,
            alight_seq: 0,
            supply_mode: 0,
            depart_time: 0,
            arrive_time: 60,
            wait_min: 0.0,
            time_min: 1.0,
            dist: 0.1,
            fare: 0.0,
            fare_period: None,
            cost: 2.0,
        }
    }

    #[test]
    fn signature_distinguishes_trips() {
        let mut a = Path::default();
        a.links.push(walk_link(
            LinkKind::Access,
            PathNode::Zone(0),
            PathNode::Stop(1),
        ));
        let mut b = a.clone();
        assert_eq!(a.signature(), b.signature());

        let mut transit = walk_link(LinkKind::Transit, PathNode::Stop(1), PathNode::Stop(2));
        transit.trip = Some(7);
        a.links.push(transit.clone());
        transit.trip = Some(8);
        b.links.push(transit);
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn zone_and_stop_nodes_never_collide() {
        assert_ne!(PathNode::Zone(3).encode(), PathNode::Stop(3).encode());
    }
}
