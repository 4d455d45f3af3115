//! Proximity detectors for the short strategies.

use super::{Reading, Recent, Tally, estimate_days, volume_steps_up};
use crate::domain::strategy::conditions::divergence_rate;

pub(super) fn pullback_short(recent: &Recent<'_>) -> Option<Reading> {
    let mut tally = Tally::default();
    let price = recent.close();

    recent.sma(200)?;
    let long_down = recent.sma_delta(200).is_some_and(|d| d < 0.0);
    let mid_down = recent.sma_delta(75).is_some_and(|d| d < 0.0);
    match (long_down, mid_down) {
        (true, true) => tally.met("長期下降トレンド"),
        (true, false) | (false, true) => tally.pending("トレンド確認中"),
        (false, false) => return None,
    }

    if let Some(d) = recent.sma(5).and_then(|ma| divergence_rate(price, ma)) {
        if (3.0..=5.0).contains(&d) {
            tally.met(format!("5日MA乖離+{d:.1}%（適正範囲）"));
        } else if d > 0.0 && d < 3.0 {
            tally.pending(format!("5日MA乖離+{d:.1}%（更に上昇待ち）"));
        } else {
            return None;
        }
    }

    Some(tally.finish(5))
}

pub(super) fn breakout_new_low(recent: &Recent<'_>) -> Option<Reading> {
    let mut tally = Tally::default();
    let bar = recent.bar();

    let trough = recent.lowest_trough()?;
    let distance = (bar.close - trough) / trough * 100.0;
    match distance {
        d if d > 0.0 && d <= 5.0 => tally.met(format!("安値まで{d:.1}%")),
        d if d > 5.0 && d <= 10.0 => tally.pending(format!("安値まで{d:.1}%（目標: 5%以内）")),
        _ => return None,
    }

    if bar.is_bearish() {
        tally.met("当日陰線");
    } else {
        tally.pending("陰線待ち");
    }

    if let [prev, today] = recent.tail(2) {
        if today.volume > prev.volume {
            tally.met("出来高増加");
        } else {
            tally.pending("出来高増加待ち");
        }
    }

    let days = estimate_days(distance, tally.score());
    Some(tally.finish(days))
}

pub(super) fn trend_reversal_down(recent: &Recent<'_>) -> Option<Reading> {
    let mut tally = Tally::default();

    match recent.short_ma_gap()? {
        gap if gap < 0.0 => tally.met("デッドクロス済み"),
        gap if gap <= 1.0 => tally.met(format!("DC間近（差{gap:.1}%）")),
        gap if gap <= 3.0 => tally.pending(format!("DC接近中（差{gap:.1}%）")),
        _ => return None,
    }

    let rci = recent.rci_tail(9, 5);
    if let [.., prev, now] = rci[..] {
        if now < prev {
            tally.met(format!("RCI下降傾向（{now:.0}）"));
        } else {
            tally.pending("RCI下降待ち");
        }
    }

    let last10 = recent.tail(10);
    let bearish = last10.iter().filter(|b| b.is_bearish()).count();
    if bearish >= 6 {
        tally.met(format!("陰線{bearish}/10日"));
    } else if bearish >= 4 {
        tally.pending(format!("陰線{bearish}/10日（目標: 6以上）"));
    } else {
        tally.pending(format!("陰線{bearish}/10日"));
    }

    let (ups, bearish_days) = volume_steps_up(last10, |b| b.is_bearish());
    if bearish_days > 0 {
        if ups as f64 >= bearish_days as f64 * 0.5 {
            tally.met("陰線時出来高増加");
        } else {
            tally.pending("陰線時出来高増加待ち");
        }
    }

    let days = if tally.score() >= 70.0 { 3 } else { 5 };
    Some(tally.finish(days))
}

pub(super) fn momentum_short(recent: &Recent<'_>) -> Option<Reading> {
    let mut tally = Tally::default();
    let price = recent.close();

    let sma200 = recent.sma(200)?;
    let sma75 = recent.sma(75)?;
    let sma25 = recent.sma(25)?;
    let sma5 = recent.sma(5)?;
    if sma200 > sma75 && sma75 > sma25 && sma25 > sma5 {
        tally.met("MA完全下降配列（200>75>25>5）");
    } else if sma75 > sma25 && sma25 > sma5 {
        tally.met("MA下降配列（75>25>5）");
    } else if sma25 > sma5 {
        tally.pending("短期MA下位（25>5）、長期確認中");
    } else {
        return None;
    }

    if price < sma5 {
        tally.met("5日MA下抜け済み");
    } else if price <= sma5 * 1.02 {
        tally.met("5日MA下抜け間近");
    } else {
        tally.pending("5日MA下抜けまで距離あり");
    }

    let days = if tally.score() >= 70.0 { 3 } else { 7 };
    Some(tally.finish(days))
}

#[cfg(test)]
mod tests {
    use super::super::SignalDetector;
    use crate::domain::strategy::test_support::{stock_from, stock_from_closes};

    fn downtrend_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1000.0 - 2.0 * i as f64).collect()
    }

    #[test]
    fn pullback_short_on_bounce_in_downtrend() {
        let mut closes = downtrend_closes(250);
        closes.extend([512.0, 522.0, 532.0, 542.0, 552.0]);
        let data = stock_from_closes(&closes);
        let est = SignalDetector::default()
            .detect(&data, "pullback_short")
            .unwrap();

        assert_eq!(
            est.conditions_met,
            vec!["長期下降トレンド", "5日MA乖離+3.8%（適正範囲）"]
        );
        assert_eq!(est.score, 100.0);
        assert_eq!(est.estimated_days, Some(5));
    }

    #[test]
    fn pullback_short_needs_price_above_average() {
        let data = stock_from_closes(&downtrend_closes(250));
        assert!(
            SignalDetector::default()
                .detect(&data, "pullback_short")
                .is_none()
        );
    }

    #[test]
    fn new_low_approach_on_bearish_volume() {
        let mut rows: Vec<_> = downtrend_closes(250)
            .into_iter()
            .map(|c| (c + 1.0, c + 2.0, c - 1.0, c, 200_000))
            .collect();
        rows.push((520.0, 521.0, 512.0, 515.0, 300_000));
        let data = stock_from(&rows);
        let est = SignalDetector::default()
            .detect(&data, "breakout_new_low_short")
            .unwrap();

        assert_eq!(
            est.conditions_met,
            vec!["安値まで2.8%", "当日陰線", "出来高増加"]
        );
        assert_eq!(est.estimated_days, Some(1));
    }

    #[test]
    fn reversal_down_at_flat_top() {
        let rows = vec![(1005.0, 1010.0, 995.0, 1000.0, 200_000); 60];
        let data = stock_from(&rows);
        let est = SignalDetector::default()
            .detect(&data, "trend_reversal_down_short")
            .unwrap();

        assert_eq!(est.conditions_met, vec!["DC間近（差0.0%）", "陰線10/10日"]);
        assert_eq!(est.conditions_pending, vec!["RCI下降待ち", "陰線時出来高増加待ち"]);
        assert_eq!(est.score, 50.0);
        assert_eq!(est.estimated_days, Some(5));
    }

    #[test]
    fn reversal_down_out_of_range_in_steep_rise() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 10.0 * i as f64).collect();
        let data = stock_from_closes(&closes);
        assert!(
            SignalDetector::default()
                .detect(&data, "trend_reversal_down_short")
                .is_none()
        );
    }

    #[test]
    fn momentum_short_in_full_downtrend() {
        let data = stock_from_closes(&downtrend_closes(250));
        let est = SignalDetector::default()
            .detect(&data, "momentum_short")
            .unwrap();

        assert_eq!(
            est.conditions_met,
            vec!["MA完全下降配列（200>75>25>5）", "5日MA下抜け済み"]
        );
        assert_eq!(est.estimated_days, Some(3));
    }

    #[test]
    fn momentum_short_needs_history() {
        let data = stock_from_closes(&downtrend_closes(100));
        assert!(
            SignalDetector::default()
                .detect(&data, "momentum_short")
                .is_none()
        );
    }
}
