// ─────────────────────────────────────────────────────────────────────
// Surfgrid — Prime Factors
// License: GNU LGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Greatest common divisor and prime factorization, driving the multigrid
//! stride schedule: the coarsest stride is gcd(n_columns-1, n_rows-1) and
//! each refinement divides by the largest remaining prime factor.

/// Greatest common divisor by the Euclidean algorithm.
pub fn gcd_euclid(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Prime factors of n with multiplicity, ascending. `prime_factors(1)` is
/// empty.
pub fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += if p == 2 { 1 } else { 2 };
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}
