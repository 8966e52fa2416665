//! Deterministic synthetic observation histories.
//!
//! Used for offline experiments, tests and benchmarks. The same
//! `(rows, seed)` always yields the same history.

use chrono::{DateTime, Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Observation;

/// 2024-01-01T00:00:00Z.
const DEFAULT_START_SECS: i64 = 1_704_067_200;

pub fn default_start() -> NaiveDateTime {
    DateTime::from_timestamp(DEFAULT_START_SECS, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

/// Random-walk history of `rows` observations one minute apart.
pub fn generate_history(rows: usize, seed: u64) -> Vec<Observation> {
    generate_history_from(default_start(), rows, seed)
}

pub fn generate_history_from(start: NaiveDateTime, rows: usize, seed: u64) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 60_000.0_f64;
    let mut dxy = 104.0_f64;
    let mut fng: i64 = 50;
    let fed_rate = 5.33;

    (0..rows)
        .map(|i| {
            let open = price;
            let close = open * (1.0 + rng.gen_range(-0.002..0.002));
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.001));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.001));
            let mid = 0.5 * (open + close);

            let volume = rng.gen_range(0.5..20.0);
            let taker_share = rng.gen_range(0.3..0.7);
            dxy += rng.gen_range(-0.02..0.02);
            fng = (fng + rng.gen_range(-2..=2)).clamp(0, 100);

            price = close;
            Observation {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                volume,
                quote_asset_volume: volume * mid,
                number_of_trades: rng.gen_range(50..2_000),
                taker_buy_base_asset_volume: volume * taker_share,
                taker_buy_quote_asset_volume: volume * taker_share * mid,
                open_dxy: dxy,
                fng,
                fed_rate,
            }
        })
        .collect()
}

/// Strictly increasing history: every candle closes above its open and
/// above the previous close.
pub fn rising_history(rows: usize) -> Vec<Observation> {
    let start = default_start();
    (0..rows)
        .map(|i| {
            let step = i as f64;
            let open = 100.0 + step;
            let close = open + 1.0;
            Observation {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: close + 1.0,
                low: open - 1.0,
                close,
                volume: 1_000.0 + 100.0 * step,
                quote_asset_volume: (1_000.0 + 100.0 * step) * (open + 0.5),
                number_of_trades: 100 + i as u64,
                taker_buy_base_asset_volume: 500.0 + 40.0 * step,
                taker_buy_quote_asset_volume: (500.0 + 40.0 * step) * (open + 0.5),
                open_dxy: 103.0 + 0.01 * step,
                fng: (40 + i as i64).min(100),
                fed_rate: 5.33,
            }
        })
        .collect()
}
