//! Fuel-economy candidate selection
//!
//! A year/make/model search lists every engine/transmission variant, but the
//! candidates only carry a free-text description ("Auto (S9), 6 cyl, 3.2 L").
//! Engine attributes are matched against that text. Each filter that would
//! leave nothing is skipped, and the first survivor in registry order wins.

use crate::models::FuelEconomyCandidate;
use regex::Regex;
use std::sync::OnceLock;

/// Displacements within this many liters are the same engine
const DISPLACEMENT_TOLERANCE: f64 = 0.05;

fn cylinder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // "6 cyl", "6-cyl", "V6", "I4", "H4", "W12"
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})\s*-?\s*cyl|\b[VIHW](\d{1,2})\b").expect("static pattern")
    })
}

fn displacement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*L\b").expect("static pattern"))
}

/// Cylinder counts mentioned in a description
fn cylinders_in(description: &str) -> Vec<u32> {
    cylinder_pattern()
        .captures_iter(description)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Displacements (liters) mentioned in a description
fn displacements_in(description: &str) -> Vec<f64> {
    displacement_pattern()
        .captures_iter(description)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

pub fn matches_cylinders(description: &str, cylinders: u32) -> bool {
    cylinders_in(description).contains(&cylinders)
}

pub fn matches_displacement(description: &str, liters: f64) -> bool {
    displacements_in(description)
        .iter()
        .any(|found| (found - liters).abs() < DISPLACEMENT_TOLERANCE)
}

/// Keep the candidates accepted by `keep`, or all of them if none are
fn narrow<'a, F>(candidates: Vec<&'a FuelEconomyCandidate>, keep: F) -> Vec<&'a FuelEconomyCandidate>
where
    F: Fn(&FuelEconomyCandidate) -> bool,
{
    let narrowed: Vec<_> = candidates.iter().copied().filter(|c| keep(*c)).collect();
    if narrowed.is_empty() {
        candidates
    } else {
        narrowed
    }
}

/// Pick one candidate using optional engine attributes
///
/// `None` only when `candidates` is empty. The cylinder filter runs first,
/// then the displacement filter on whatever it left.
pub fn select_candidate(
    candidates: &[FuelEconomyCandidate],
    cylinders: Option<u32>,
    displacement_liters: Option<f64>,
) -> Option<&FuelEconomyCandidate> {
    if candidates.is_empty() {
        return None;
    }

    let mut pool: Vec<&FuelEconomyCandidate> = candidates.iter().collect();

    if let Some(cylinders) = cylinders {
        pool = narrow(pool, |c| matches_cylinders(&c.description, cylinders));
    }

    if let Some(liters) = displacement_liters {
        pool = narrow(pool, |c| matches_displacement(&c.description, liters));
    }

    pool.first().copied()
}
