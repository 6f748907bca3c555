// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Grid Size Suggestions
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Work estimation for the multigrid stride schedule and the search for
//! nearby grid dimensions that factor into many small primes.
//!
//! A relaxation stage starting from a lattice expanded by a factor e must
//! smooth features up to e cells wide, so it is charged
//! (active nodes) x e^2 sweeps; the initial coarse solve is charged its
//! full diameter squared. Coprime dimensions collapse the schedule to a
//! single full-resolution stage, which is what makes them pathological.

use crate::factor::{gcd_euclid, prime_factors};

/// A candidate pair of cell counts and its estimated speedup relative to
/// the dimensions it was suggested for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeSuggestion {
    /// Suggested number of cells (nodes - 1) in x.
    pub n_x_cells: usize,
    /// Suggested number of cells (nodes - 1) in y.
    pub n_y_cells: usize,
    /// work(requested) / work(suggested); > 1 means faster.
    pub factor: f64,
}

/// Minimum nodes per side at any stride.
const MIN_NODES: usize = 4;

/// Estimated relaxation work for gridding `n_x_cells` x `n_y_cells`
/// cells, in arbitrary units proportional to node-sweeps.
pub fn estimate_work(n_x_cells: usize, n_y_cells: usize) -> f64 {
    let nodes = |stride: usize| ((n_x_cells / stride + 1) * (n_y_cells / stride + 1)) as f64;
    let side = |stride: usize| (n_x_cells / stride + 1).max(n_y_cells / stride + 1) as f64;

    let gcd = gcd_euclid(n_x_cells, n_y_cells);
    let mut factors = prime_factors(gcd);
    let mut stride = gcd;
    while stride > 1 && (n_x_cells / stride + 1 < MIN_NODES || n_y_cells / stride + 1 < MIN_NODES)
    {
        stride /= factors.pop().expect("stride > 1 implies remaining factors");
    }

    // Coarsest stage: convergence cost scales with the squared diameter.
    let mut work = nodes(stride) * side(stride) * side(stride);
    let mut previous = stride;
    while stride > 1 {
        stride /= factors.pop().expect("stride > 1 implies remaining factors");
        let expand = (previous / stride) as f64;
        work += nodes(stride) * expand * expand;
        previous = stride;
    }
    work
}

/// Cell counts of the form c * 2^a * 3^b * 5^d, c in {1,3,5,7,9,11},
/// within [lo, hi], ascending.
fn composite_cell_counts(lo: usize, hi: usize) -> Vec<usize> {
    let mut counts = Vec::new();
    for c in [1usize, 3, 5, 7, 9, 11] {
        let mut p2 = c;
        while p2 <= hi {
            let mut p3 = p2;
            while p3 <= hi {
                let mut p5 = p3;
                while p5 <= hi {
                    if p5 >= lo {
                        counts.push(p5);
                    }
                    match p5.checked_mul(5) {
                        Some(v) => p5 = v,
                        None => break,
                    }
                }
                match p3.checked_mul(3) {
                    Some(v) => p3 = v,
                    None => break,
                }
            }
            match p2.checked_mul(2) {
                Some(v) => p2 = v,
                None => break,
            }
        }
    }
    counts.sort_unstable();
    counts.dedup();
    counts
}

/// Search for cell counts at or above the requested ones whose stride
/// schedules are estimated to converge faster. Returns up to ten
/// suggestions, best first; empty when nothing beats the request by at
/// least a few percent.
pub fn suggest_dimensions(n_x_cells: usize, n_y_cells: usize) -> Vec<SizeSuggestion> {
    let slack = |n: usize| n + (n / 10).max(8);
    let x_candidates = composite_cell_counts(n_x_cells, slack(n_x_cells));
    let y_candidates = composite_cell_counts(n_y_cells, slack(n_y_cells));

    let work_now = estimate_work(n_x_cells, n_y_cells);
    let mut suggestions = Vec::new();
    for &cx in &x_candidates {
        for &cy in &y_candidates {
            let factor = work_now / estimate_work(cx, cy);
            if factor > 1.02 {
                suggestions.push(SizeSuggestion { n_x_cells: cx, n_y_cells: cy, factor });
            }
        }
    }
    suggestions.sort_by(|a, b| b.factor.total_cmp(&a.factor));
    suggestions.truncate(10);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_counts_window() {
        let counts = composite_cell_counts(90, 110);
        // 90 = 2*3^2*5, 96 = 2^5*3, 100 = 2^2*5^2, 108 = 2^2*3^3
        for expected in [90, 96, 100, 108] {
            assert!(counts.contains(&expected), "missing {expected} in {counts:?}");
        }
        // 97 is prime and 11*9=99 is fine but 101/103 must not appear
        assert!(!counts.contains(&97));
        assert!(!counts.contains(&101));
        assert!(counts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_prime_cells_cost_more_than_composite() {
        // 97 cells are coprime against anything; 96 = 2^5 * 3 gives a rich
        // schedule of intermediate strides.
        assert!(estimate_work(96, 96) < estimate_work(97, 97) / 10.0);
    }

    #[test]
    fn test_estimate_work_single_factor_between() {
        // 2 * prime: one coarsening step, better than prime but worse
        // than highly composite.
        let prime = estimate_work(97, 97);
        let twice_prime = estimate_work(194, 194);
        let composite = estimate_work(192, 192);
        assert!(composite < twice_prime);
        assert!(twice_prime < prime * 16.0); // more nodes, but far better scheduled
    }

    #[test]
    fn test_suggest_for_prime_dimensions() {
        let suggestions = suggest_dimensions(97, 97);
        assert!(!suggestions.is_empty());
        let best = suggestions[0];
        assert!(best.factor > 1.0);
        assert!(best.n_x_cells >= 97 && best.n_y_cells >= 97);
        // Best first
        for pair in suggestions.windows(2) {
            assert!(pair[0].factor >= pair[1].factor);
        }
    }

    #[test]
    fn test_no_suggestions_for_already_good_dimensions() {
        // 96x96 cells: 2^5*3 on both axes; nothing nearby is meaningfully
        // better.
        let suggestions = suggest_dimensions(96, 96);
        for s in &suggestions {
            assert!(s.factor < 2.0, "implausible speedup over 96x96: {s:?}");
        }
    }
}
