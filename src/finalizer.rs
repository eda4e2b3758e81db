use crate::config::Config;
use crate::cost::{path_sizes, price_path, CostEngine, ModeWeights};
use crate::dispatcher::Request;
use crate::error::{PathfindingError, PathfindingResult};
use crate::network::Network;
use crate::path::{Path, PathSignature, Pathset, PathsetEntry};
use std::collections::HashMap;

// Scores the sampled pathset: exact costs, dedup, overlap correction, logit
// probabilities, pruning, and the chosen draw.
pub fn finalize(
    network: &Network,
    config: &Config,
    request: &Request,
    modes: &mut ModeWeights,
    sampled: Vec<Path>,
    rng: &mut fastrand::Rng,
) -> PathfindingResult<(Pathset, usize)> {
    let engine = CostEngine::new(config);
    let theta = engine.theta;

    // Exact per-link costs with the now-certain fare sequence, then collapse
    // duplicates. Identical link sequences imply identical schedules, so the
    // first instance stands for all of them.
    let mut entries: Vec<PathsetEntry> = Vec::new();
    let mut seen: HashMap<PathSignature, usize> = HashMap::new();
    for mut path in sampled {
        let signature = path.signature();
        if let Some(&idx) = seen.get(&signature) {
            entries[idx].count += 1;
            continue;
        }
        path.cost = price_path(network, &engine, modes, request, &mut path.links, true)?;
        seen.insert(signature, entries.len());
        entries.push(PathsetEntry {
            cost: path.cost,
            path,
            count: 1,
            path_size: 1.0,
            probability: 0.0,
            chosen: false,
        });
    }
    if entries.is_empty() {
        return Err(PathfindingError::NoPathFound);
    }

    let paths: Vec<&Path> = entries.iter().map(|e| &e.path).collect();
    let sizes = path_sizes(
        network,
        &paths,
        config.overlap_variable,
        config.overlap_scale_parameter,
        config.overlap_split_transit,
    );
    for (entry, size) in entries.iter_mut().zip(sizes) {
        entry.path_size = size;
    }

    assign_probabilities(&mut entries, theta);

    // Prune the cheapest-probability paths while over the cap, then
    // renormalize over the survivors.
    if config.max_num_paths >= 0 {
        let cap = (config.max_num_paths as usize).max(1);
        while entries.len() > cap {
            let weakest = entries
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.probability.total_cmp(&b.probability))
                .map(|(i, e)| (i, e.probability));
            match weakest {
                Some((idx, p)) if p < config.min_path_probability => {
                    entries.remove(idx);
                }
                _ => break,
            }
        }
        assign_probabilities(&mut entries, theta);
    }

    // The chosen path is a second draw over the final probabilities.
    let chosen = draw(&entries, rng.f64());
    entries[chosen].chosen = true;

    log::debug!(
        "Finalized {} unique paths for {} (chosen cost {:.4}).",
        entries.len(),
        request.person_trip_id,
        entries[chosen].cost,
    );
    Ok((Pathset { entries }, chosen))
}

// Multinomial logit over U = -cost + ln(PS), shifted for stability.
fn assign_probabilities(entries: &mut [PathsetEntry], theta: f64) {
    let utilities: Vec<f64> = entries
        .iter()
        .map(|e| -e.cost + e.path_size.ln())
        .collect();
    let max_utility = utilities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let masses: Vec<f64> = utilities
        .iter()
        .map(|u| (theta * (u - max_utility)).exp())
        .collect();
    let total: f64 = masses.iter().sum();
    for (entry, mass) in entries.iter_mut().zip(masses) {
        entry.probability = mass / total;
    }
}

fn draw(entries: &[PathsetEntry], unit: f64) -> usize {
    let mut remaining = unit;
    for (idx, entry) in entries.iter().enumerate() {
        remaining -= entry.probability;
        if remaining <= 0.0 {
            return idx;
        }
    }
    entries.len() - 1
}
