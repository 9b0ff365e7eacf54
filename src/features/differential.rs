//! Normalized differentials between a fighter's value and the opponent's
//!
//! All functions are total: a zero denominator yields 0.0.

/// `(a - b) / (a + b)`, or 0.0 when `a + b == 0`
pub fn differential(a: f64, b: f64) -> f64 {
    let denominator = a + b;
    if denominator == 0.0 {
        0.0
    } else {
        (a - b) / denominator
    }
}

/// Strikes received: the opponent's landed count
pub fn absorbed(opponent_landed: f64) -> f64 {
    opponent_landed
}

/// Opponent attempts that missed, clamped at zero for inconsistent rows
pub fn defended(opponent_attempted: f64, opponent_landed: f64) -> f64 {
    (opponent_attempted - opponent_landed).max(0.0)
}

/// Differential of defended against absorbed
pub fn defended_diff(defended: f64, absorbed: f64) -> f64 {
    differential(defended, absorbed)
}

/// Negation of [`defended_diff`] for the same arguments, without producing `-0.0`
pub fn absorbed_diff(defended: f64, absorbed: f64) -> f64 {
    differential(absorbed, defended)
}
