use crate::error::{PathfindingError, PathfindingResult};
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DemandModeType {
    Access,
    Egress,
    Transit,
    Transfer,
}

impl DemandModeType {
    pub fn parse(s: &str) -> PathfindingResult<Self> {
        match s {
            "access" => Ok(Self::Access),
            "egress" => Ok(Self::Egress),
            "transit" => Ok(Self::Transit),
            "transfer" => Ok(Self::Transfer),
            other => Err(PathfindingError::InvariantViolation(format!(
                "unknown demand mode type {other}"
            ))),
        }
    }
}

// A single weight formula. The raw attribute value `x` is mapped through the
// qualifier; rows without a qualifier suffix are constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Weight {
    Constant { weight: f64 },
    Exponential { weight: f64 },
    Logarithmic { weight: f64, base: f64 },
    Logistic { weight: f64, max: f64, mid: f64 },
}

impl Weight {
    pub fn apply(&self, x: f64) -> f64 {
        match *self {
            Weight::Constant { weight } => weight * x,
            Weight::Exponential { weight } => (1.0 + weight).powf(x),
            Weight::Logarithmic { weight, base } => weight * x.log(base),
            Weight::Logistic { weight, max, mid } => max / (1.0 + (-weight * (x - mid)).exp()),
        }
    }

    pub fn multiplier(&self) -> f64 {
        match *self {
            Weight::Constant { weight }
            | Weight::Exponential { weight }
            | Weight::Logarithmic { weight, .. }
            | Weight::Logistic { weight, .. } => weight,
        }
    }

    fn floor_multiplier(&mut self, floor: f64) {
        match self {
            Weight::Constant { weight }
            | Weight::Exponential { weight }
            | Weight::Logarithmic { weight, .. }
            | Weight::Logistic { weight, .. } => *weight = weight.max(floor),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct WeightKey {
    pub user_class: Box<str>,
    pub purpose: Box<str>,
    pub mode_type: DemandModeType,
    pub demand_mode: Box<str>,
    pub supply_mode: Box<str>,
}

pub type WeightMap = HashMap<Box<str>, Weight>;

// A resolved weight map together with the key it was found under, so cost
// functions can surface the full key on a missing row.
#[derive(Clone, Copy, Debug)]
pub struct WeightHandle<'a> {
    pub key: &'a WeightKey,
    pub map: &'a WeightMap,
}

impl WeightHandle<'_> {
    pub fn required(&self, name: &str) -> PathfindingResult<Weight> {
        self.map.get(name).copied().ok_or_else(|| self.missing(name))
    }

    pub fn optional(&self, name: &str) -> Option<Weight> {
        self.map.get(name).copied()
    }

    // Weighted value of an optional attribute; attributes nobody weighted
    // cost nothing.
    pub fn weighted(&self, name: &str, x: f64) -> f64 {
        match self.map.get(name) {
            Some(weight) => weight.apply(x),
            None => 0.0,
        }
    }

    pub fn missing(&self, name: &str) -> PathfindingError {
        PathfindingError::WeightLookupMissing {
            user_class: self.key.user_class.to_string(),
            purpose: self.key.purpose.to_string(),
            mode_type: self.key.mode_type,
            demand_mode: self.key.demand_mode.to_string(),
            supply_mode: self.key.supply_mode.to_string(),
            weight_name: name.to_owned(),
        }
    }
}

// One row of the weight table. `weight_name` may carry a dot-suffixed
// qualifier ("fare.logistic") and qualifier rows may in turn carry a
// modifier naming a parameter ("fare.logistic.logistic_mid").
#[derive(Debug, Clone)]
pub struct WeightRow {
    pub user_class: String,
    pub purpose: String,
    pub demand_mode_type: String,
    pub demand_mode: String,
    pub supply_mode: String,
    pub weight_name: String,
    pub value: f64,
}

pub struct WeightBook {
    maps: HashMap<WeightKey, WeightMap>,
}

impl WeightBook {
    // `min_transfer_penalty` floors the transfer-penalty weight multiplier on
    // every transfer map, inserting the floor when the row is absent.
    pub fn from_rows(rows: &[WeightRow], min_transfer_penalty: f64) -> PathfindingResult<Self> {
        struct PendingWeight {
            qualifier: Option<String>,
            weight: f64,
            params: HashMap<String, f64>,
        }

        let mut pending: HashMap<WeightKey, HashMap<String, PendingWeight>> = HashMap::new();
        // Parameter rows can precede their base row; hold them back.
        let mut deferred_params: Vec<(WeightKey, String, String, String, f64)> = Vec::new();

        for row in rows {
            let key = WeightKey {
                user_class: row.user_class.as_str().into(),
                purpose: row.purpose.as_str().into(),
                mode_type: DemandModeType::parse(&row.demand_mode_type)?,
                demand_mode: row.demand_mode.as_str().into(),
                supply_mode: row.supply_mode.as_str().into(),
            };
            let mut parts = row.weight_name.split('.');
            let name = parts.next().unwrap_or_default().to_owned();
            if name.is_empty() {
                return Err(PathfindingError::InvariantViolation(format!(
                    "empty weight name for supply mode {}",
                    row.supply_mode
                )));
            }
            let qualifier = parts.next().map(str::to_owned);
            let modifier = parts.next().map(str::to_owned);
            if parts.next().is_some() {
                return Err(PathfindingError::InvariantViolation(format!(
                    "weight name {} has too many suffixes",
                    row.weight_name
                )));
            }
            match (qualifier, modifier) {
                (qualifier, None) => {
                    pending.entry(key).or_default().insert(
                        name,
                        PendingWeight {
                            qualifier,
                            weight: row.value,
                            params: HashMap::new(),
                        },
                    );
                }
                (Some(qualifier), Some(modifier)) => {
                    deferred_params.push((key, name, qualifier, modifier, row.value));
                }
                (None, Some(_)) => unreachable!("modifier implies qualifier"),
            }
        }

        for (key, name, qualifier, modifier, value) in deferred_params {
            let entry = pending
                .get_mut(&key)
                .and_then(|m| m.get_mut(&name))
                .ok_or_else(|| {
                    PathfindingError::InvariantViolation(format!(
                        "parameter row {name}.{qualifier}.{modifier} has no base weight row"
                    ))
                })?;
            if entry.qualifier.as_deref() != Some(qualifier.as_str()) {
                return Err(PathfindingError::InvariantViolation(format!(
                    "parameter row {name}.{qualifier}.{modifier} does not match the base qualifier"
                )));
            }
            entry.params.insert(modifier, value);
        }

        let mut maps = HashMap::with_capacity(pending.len());
        for (key, named) in pending {
            let mut map = WeightMap::with_capacity(named.len());
            for (name, pw) in named {
                let param = |params: &HashMap<String, f64>, p: &str| -> PathfindingResult<f64> {
                    params.get(p).copied().ok_or_else(|| {
                        PathfindingError::InvariantViolation(format!(
                            "weight {name} qualifier {} is missing parameter {p}",
                            pw.qualifier.as_deref().unwrap_or_default()
                        ))
                    })
                };
                let weight = match pw.qualifier.as_deref() {
                    None | Some("constant") => Weight::Constant { weight: pw.weight },
                    Some("exponential") => Weight::Exponential { weight: pw.weight },
                    Some("logarithmic") => Weight::Logarithmic {
                        weight: pw.weight,
                        base: param(&pw.params, "log_base")?,
                    },
                    Some("logistic") => Weight::Logistic {
                        weight: pw.weight,
                        max: param(&pw.params, "logistic_max")?,
                        mid: param(&pw.params, "logistic_mid")?,
                    },
                    Some(other) => {
                        return Err(PathfindingError::InvariantViolation(format!(
                            "unknown weight qualifier {other} on {name}"
                        )))
                    }
                };
                map.insert(name.into(), weight);
            }
            if key.mode_type == DemandModeType::Transfer && min_transfer_penalty > 0.0 {
                map.entry("transfer_penalty".into())
                    .and_modify(|w| w.floor_multiplier(min_transfer_penalty))
                    .or_insert(Weight::Constant {
                        weight: min_transfer_penalty,
                    });
            }
            maps.insert(key, map);
        }

        Ok(Self { maps })
    }

    pub fn lookup(
        &self,
        user_class: &str,
        purpose: &str,
        mode_type: DemandModeType,
        demand_mode: &str,
        supply_mode: &str,
    ) -> PathfindingResult<WeightHandle<'_>> {
        let probe = WeightKey {
            user_class: user_class.into(),
            purpose: purpose.into(),
            mode_type,
            demand_mode: demand_mode.into(),
            supply_mode: supply_mode.into(),
        };
        match self.maps.get_key_value(&probe) {
            Some((key, map)) => Ok(WeightHandle { key, map }),
            None => Err(PathfindingError::WeightLookupMissing {
                user_class: user_class.to_owned(),
                purpose: purpose.to_owned(),
                mode_type,
                demand_mode: demand_mode.to_owned(),
                supply_mode: supply_mode.to_owned(),
                weight_name: String::new(),
            }),
        }
    }

    pub fn contains(
        &self,
        user_class: &str,
        purpose: &str,
        mode_type: DemandModeType,
        demand_mode: &str,
        supply_mode: &str,
    ) -> bool {
        self.lookup(user_class, purpose, mode_type, demand_mode, supply_mode)
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn row(mode_type: &str, demand: &str, supply: &str, name: &str, value: f64) -> WeightRow {
        fixtures::weight_row("all", "work", mode_type, demand, supply, name, value)
    }

    #[test]
    fn qualifier_math() {
        assert_eq!(Weight::Constant { weight: 2.0 }.apply(3.0), 6.0);
        assert!((Weight::Exponential { weight: 0.5 }.apply(2.0) - 2.25).abs() < 1e-12);
        let log = Weight::Logarithmic {
            weight: 3.0,
            base: 10.0,
        };
        assert!((log.apply(100.0) - 6.0).abs() < 1e-12);
        let logistic = Weight::Logistic {
            weight: 1.0,
            max: 4.0,
            mid: 0.0,
        };
        assert!((logistic.apply(0.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn dot_suffix_rows_build_variants() {
        let rows = vec![
            row("transit", "transit", "local_bus", "in_vehicle_time_min", 1.0),
            row("transit", "transit", "local_bus", "wait_time_min.logarithmic", 2.0),
            row(
                "transit",
                "transit",
                "local_bus",
                "wait_time_min.logarithmic.log_base",
                2.0,
            ),
        ];
        let book = WeightBook::from_rows(&rows, 0.0).unwrap();
        let handle = book
            .lookup("all", "work", DemandModeType::Transit, "transit", "local_bus")
            .unwrap();
        assert_eq!(
            handle.required("wait_time_min").unwrap(),
            Weight::Logarithmic {
                weight: 2.0,
                base: 2.0
            }
        );
        assert_eq!(
            handle.required("in_vehicle_time_min").unwrap(),
            Weight::Constant { weight: 1.0 }
        );
    }

    #[test]
    fn missing_logistic_parameter_rejected() {
        let rows = vec![row("transit", "transit", "local_bus", "crowding.logistic", 1.0)];
        assert!(matches!(
            WeightBook::from_rows(&rows, 0.0),
            Err(PathfindingError::InvariantViolation(_))
        ));
    }

    #[test]
    fn transfer_penalty_floored() {
        let rows = vec![
            row("transfer", "transfer", "transfer", "time_min", 2.0),
            row("transfer", "transfer", "transfer", "transfer_penalty", 0.01),
        ];
        let book = WeightBook::from_rows(&rows, 0.5).unwrap();
        let handle = book
            .lookup("all", "work", DemandModeType::Transfer, "transfer", "transfer")
            .unwrap();
        assert_eq!(
            handle.required("transfer_penalty").unwrap().multiplier(),
            0.5
        );
    }

    #[test]
    fn transfer_penalty_inserted_when_absent() {
        let rows = vec![row("transfer", "transfer", "transfer", "time_min", 2.0)];
        let book = WeightBook::from_rows(&rows, 0.3).unwrap();
        let handle = book
            .lookup("all", "work", DemandModeType::Transfer, "transfer", "transfer")
            .unwrap();
        assert_eq!(
            handle.required("transfer_penalty").unwrap(),
            Weight::Constant { weight: 0.3 }
        );
    }

    #[test]
    fn lookup_miss_carries_full_key() {
        let book = WeightBook::from_rows(&[], 0.0).unwrap();
        let err = book
            .lookup("all", "work", DemandModeType::Transit, "transit", "ferry")
            .unwrap_err();
        match err {
            PathfindingError::WeightLookupMissing {
                supply_mode,
                mode_type,
                ..
            } => {
                assert_eq!(supply_mode, "ferry");
                assert_eq!(mode_type, DemandModeType::Transit);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
