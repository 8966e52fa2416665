//! Property tests for the field merge.

use chrono::{DateTime, Timelike};
use proptest::prelude::*;
use tickcast_core::domain::{FearGreed, Kline, MacroIndex, PolicyRate};
use tickcast_core::observe::merge::{merge_records, MergeError};

fn arb_kline() -> impl Strategy<Value = Kline> {
    // 2020-01-01 .. 2030-01-01, millisecond resolution.
    (1_577_836_800_000i64..1_893_456_000_000, 1.0..100_000.0_f64, 0u64..10_000).prop_map(
        |(millis, price, trades)| Kline {
            timestamp: DateTime::from_timestamp_millis(millis)
                .unwrap()
                .naive_utc(),
            open: price,
            high: price * 1.01,
            low: price * 0.99,
            close: price * 1.001,
            volume: 2.0,
            quote_asset_volume: 2.0 * price,
            number_of_trades: trades,
            taker_buy_base_asset_volume: 1.0,
            taker_buy_quote_asset_volume: price,
        },
    )
}

proptest! {
    /// The observation carries the closed candle's fields with its open time
    /// truncated to the minute.
    #[test]
    fn merged_observation_is_minute_aligned(
        closed in arb_kline(),
        current in arb_kline(),
        dxy in 90.0..120.0_f64,
        fng in 0i64..=100,
        rate in 0.0..10.0_f64,
    ) {
        let obs = merge_records(
            vec![closed.clone(), current],
            MacroIndex { open_dxy: dxy },
            FearGreed { fng },
            PolicyRate { fed_rate: rate },
        )
        .unwrap();

        prop_assert_eq!(obs.timestamp.second(), 0);
        prop_assert_eq!(obs.timestamp.nanosecond(), 0);
        prop_assert_eq!(obs.timestamp.hour(), closed.timestamp.hour());
        prop_assert_eq!(obs.timestamp.minute(), closed.timestamp.minute());
        prop_assert!(closed.timestamp - obs.timestamp < chrono::Duration::minutes(1));
        prop_assert_eq!(obs.close, closed.close);
        prop_assert_eq!(obs.number_of_trades, closed.number_of_trades);
        prop_assert_eq!(obs.open_dxy, dxy);
        prop_assert_eq!(obs.fng, fng);
        prop_assert_eq!(obs.fed_rate, rate);
    }

    /// Fewer than two candles never yields an observation.
    #[test]
    fn lone_candle_never_merges(candle in prop::option::of(arb_kline())) {
        let candles: Vec<Kline> = candle.into_iter().collect();
        let received = candles.len();
        let err = merge_records(
            candles,
            MacroIndex { open_dxy: 100.0 },
            FearGreed { fng: 50 },
            PolicyRate { fed_rate: 5.0 },
        )
        .unwrap_err();
        prop_assert_eq!(err, MergeError::NoClosedCandle { received });
    }
}
