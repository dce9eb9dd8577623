//! American-odds payout arithmetic.
//!
//! All amounts are whole dollars (i64), matching the store. Payouts use
//! floor division, so the book keeps the fractional dollar on every winning
//! ticket.

/// Total returned to the bettor for a winning ticket: stake plus profit.
///
/// Positive odds quote profit per $100 staked; negative odds quote the stake
/// required to profit $100.
pub fn payout(wager: i64, odds: i64) -> i64 {
    wager + profit(wager, odds)
}

/// Profit portion only (payout minus returned stake).
pub fn profit(wager: i64, odds: i64) -> i64 {
    if odds > 0 {
        // floor(wager * odds / 100) — i64 division truncates toward zero,
        // which equals floor for non-negative operands.
        wager * odds / 100
    } else {
        wager * 100 / odds.abs()
    }
}

/// The win probability implied by an American price, ignoring vig.
pub fn implied_probability(odds: i64) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        let o = odds.abs() as f64;
        o / (o + 100.0)
    }
}

/// A price of zero is meaningless in American notation; both ±100 are even
/// money. Validation boundary for line upserts.
pub fn is_valid_price(odds: i64) -> bool {
    odds >= 100 || odds <= -100
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
