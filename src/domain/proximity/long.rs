//! Proximity detectors for the long strategies.

use super::{Reading, Recent, Tally, estimate_days, mean_volume, volume_steps_up};
use crate::domain::strategy::conditions::divergence_rate;

/// Bars averaged for the baseline volume.
const VOLUME_BASELINE_BARS: usize = 60;

pub(super) fn breakout_new_high(recent: &Recent<'_>) -> Option<Reading> {
    let mut tally = Tally::default();
    let price = recent.close();

    let peak = recent.highest_peak()?;
    let distance = (peak - price) / peak * 100.0;
    match distance {
        d if d > 0.0 && d <= 5.0 => tally.met(format!("高値まで{d:.1}%")),
        d if d > 5.0 && d <= 10.0 => tally.pending(format!("高値まで{d:.1}%（目標: 5%以内）")),
        _ => return None,
    }

    let sma5 = recent.sma(5);
    match sma5.and_then(|ma| divergence_rate(price, ma)).map(f64::abs) {
        Some(d) if d <= 3.0 => tally.met(format!("5日MA乖離{d:.1}%")),
        Some(d) => tally.pending(format!("5日MA乖離{d:.1}%（目標: 3%以内）")),
        None => tally.pending("5日MA算出不可"),
    }

    let baseline = mean_volume(recent.full_tail(VOLUME_BASELINE_BARS));
    let last5 = recent.tail(5);
    let recent_volume = mean_volume(last5);
    let rising_run = last5.windows(2).all(|w| w[0].volume <= w[1].volume);
    let tail2 = recent.tail(2);
    let rising_today = tail2.len() == 2 && tail2[1].volume > tail2[0].volume;
    let increasing = rising_run || rising_today;
    if increasing && recent_volume >= baseline * 1.2 {
        tally.met("出来高増加傾向かつ平均1.2倍以上");
    } else if increasing || recent_volume >= baseline {
        tally.pending("出来高条件部分達成");
    } else {
        tally.pending("出来高増加が必要");
    }

    if let Some(ma) = sma5 {
        if price > ma {
            tally.met("5日MA上抜け済み");
        } else if price >= ma * 0.98 {
            tally.met("5日MA上抜け間近");
        } else {
            tally.pending("5日MA上抜けまで距離あり");
        }
    }

    let days = estimate_days(distance, tally.score());
    Some(tally.finish(days))
}

pub(super) fn pullback_buy(recent: &Recent<'_>) -> Option<Reading> {
    let mut tally = Tally::default();
    let price = recent.close();

    recent.sma(200)?;
    let long_up = recent.sma_delta(200).is_some_and(|d| d > 0.0);
    let mid_up = recent.sma_delta(75).is_some_and(|d| d > 0.0);
    match (long_up, mid_up) {
        (true, true) => tally.met("長期上昇トレンド"),
        (true, false) | (false, true) => tally.pending("トレンド確認中"),
        (false, false) => return None,
    }

    if let Some(d) = recent.sma(5).and_then(|ma| divergence_rate(price, ma)) {
        if (-5.0..=-3.0).contains(&d) {
            tally.met(format!("5日MA乖離{d:.1}%（適正範囲）"));
        } else if (-7.0..-3.0).contains(&d) {
            tally.met(format!("5日MA乖離{d:.1}%"));
        } else if d > -3.0 && d <= 0.0 {
            tally.pending(format!("5日MA乖離{d:.1}%（更に下落待ち）"));
        } else {
            return None;
        }
    }

    if let Some(rci) = recent.data.indicators.rci(9, recent.last) {
        if (-80.0..=-50.0).contains(&rci) {
            tally.met(format!("RCI {rci:.0}（売られすぎ圏）"));
        } else if rci > -50.0 && rci <= -30.0 {
            tally.pending(format!("RCI {rci:.0}（売られすぎ接近）"));
        } else if rci < -80.0 {
            tally.met(format!("RCI {rci:.0}（極度売られすぎ）"));
        } else {
            tally.pending(format!("RCI {rci:.0}（まだ高い）"));
        }
    }

    let days = if tally.score() >= 60.0 { 3 } else { 7 };
    Some(tally.finish(days))
}

pub(super) fn retry_new_high(recent: &Recent<'_>) -> Option<Reading> {
    let mut tally = Tally::default();
    let price = recent.close();

    let peak = recent.highest_peak()?;
    let distance = (peak - price) / peak * 100.0;
    match distance {
        d if d > 0.0 && d <= 10.0 => tally.met(format!("高値まで{d:.1}%")),
        d if d > 10.0 && d <= 15.0 => {
            tally.pending(format!("高値まで{d:.1}%（目標: 10%以内）"))
        }
        _ => return None,
    }

    if let Some(gap) = recent.short_ma_gap() {
        if gap > 0.0 {
            tally.met("ゴールデンクロス済み");
        } else if gap >= -2.0 {
            tally.met(format!("GC間近（差{gap:.1}%）"));
        } else {
            tally.pending(format!("5日MAと25日MAの差{gap:.1}%"));
        }
    }

    let days = estimate_days(distance, tally.score());
    Some(tally.finish(days))
}

pub(super) fn trend_reversal_up(recent: &Recent<'_>) -> Option<Reading> {
    let mut tally = Tally::default();

    match recent.short_ma_gap()? {
        gap if gap > 0.0 => tally.met("ゴールデンクロス済み"),
        gap if gap >= -1.0 => tally.met(format!("GC間近（差{gap:.1}%）")),
        gap if gap >= -3.0 => tally.pending(format!("GC接近中（差{gap:.1}%）")),
        _ => return None,
    }

    let rci = recent.rci_tail(9, 5);
    if let [.., prev, now] = rci[..] {
        if now > prev {
            tally.met(format!("RCI上昇傾向（{now:.0}）"));
        } else {
            tally.pending("RCI上昇待ち");
        }
    }

    let last10 = recent.tail(10);
    let bullish = last10.iter().filter(|b| b.is_bullish()).count();
    if bullish >= 6 {
        tally.met(format!("陽線{bullish}/10日"));
    } else if bullish >= 4 {
        tally.pending(format!("陽線{bullish}/10日（目標: 6以上）"));
    } else {
        tally.pending(format!("陽線{bullish}/10日"));
    }

    let (ups, bullish_days) = volume_steps_up(last10, |b| b.is_bullish());
    if bullish_days > 0 {
        if ups as f64 >= bullish_days as f64 * 0.5 {
            tally.met("陽線時出来高増加");
        } else {
            tally.pending("陽線時出来高増加待ち");
        }
    }

    let days = if tally.score() >= 70.0 { 3 } else { 5 };
    Some(tally.finish(days))
}
