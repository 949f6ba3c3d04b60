//! Sticker choice for the daily notification.
//!
//! The dominant condition of the day picks a base group. Strong wind, heat or
//! frost during the day add extra groups. One group is then drawn at random,
//! and one sticker within it.

use rand::Rng;
use rand::seq::SliceRandom;

use weatherbell_common::types::DayForecast;

const WINDY_ABOVE: f64 = 4.0;
const HOT_ABOVE: f64 = 20.0;
const COLD_BELOW: f64 = -3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickerGroup {
    Sunny,
    Cloudy,
    Rain,
    Snow,
    Windy,
    Hot,
    Cold,
}

impl StickerGroup {
    /// Group for a condition code, if it has one.
    pub fn for_condition(condition_id: u16) -> Option<Self> {
        if condition_id == 800 {
            return Some(StickerGroup::Sunny);
        }
        match condition_id / 100 {
            2 | 3 | 5 => Some(StickerGroup::Rain),
            6 => Some(StickerGroup::Snow),
            7 | 8 => Some(StickerGroup::Cloudy),
            _ => None,
        }
    }

    /// Telegram file ids.
    pub fn stickers(&self) -> &'static [&'static str] {
        match self {
            StickerGroup::Sunny => &[
                "CAACAgIAAxkBAAEGDm1jRSTohtnDBEFuN2lsWPGmHhZMJAACxxkAAnm5qUqJP-wzIPZ3DyoE",
                "CAACAgIAAxkBAAEN6xBnwfJ3-wlYeo1exStPZBFMJ7Ik3wACMFwAAv_mAUu0FDSk5qX5AAE2BA",
                "CAACAgIAAxkBAAEN6xZnwfLiJLaA2Llkz4YRaq33vSxHIwACRmkAAtJxgEpsLEc53u07GjYE",
            ],
            StickerGroup::Cloudy => &[
                "CAACAgIAAxkBAAEGDl1jRR9BzBWweHPfV6fXrWW6uxLeWQACaRsAAnn7WEpAX5kHnzpXGioE",
                "CAACAgIAAxkBAAEOH9tn3CH0ntcSUTziOyB0A1aETxD7JgACCWoAAoYCKUjPeHp1U7SP3DYE",
            ],
            StickerGroup::Rain => &[
                "CAACAgIAAxkBAAEGDmNjRSEnXTCCj4lXenCdHwHBNGvWRAACsBUAApWOQEgeOJ174sOmxSoE",
                "CAACAgIAAxkBAAEN6xRnwfKqPgRBCm9y-lnP5XzU-3FyagAC3E8AAjJ7OUhVF81S6WL2lDYE",
                "CAACAgIAAxkBAAEN6xpnwfMhjDIxoVfBMr7DyhbRXCghqQACzRoAAq8auUkq3NXKwblCFjYE",
            ],
            StickerGroup::Snow => &[
                "CAACAgIAAxkBAAEGDmFjRSCyS4-BYboqYPMU-esJZIQsyAACrBQAAsQu2UssNI82XHFI0ioE",
                "CAACAgIAAxkBAAEGDmdjRSH0d85-ZzzPlngnv5nZX-k9kwACJBYAAts0yEujzSapZ8-iYyoE",
            ],
            StickerGroup::Windy => &[
                "CAACAgIAAxkBAAEGDlFjRR3GKjAV6PxowHoXWJ8ZEC94qAACfRgAAsGAYUrNl1eKlj7diyoE",
            ],
            StickerGroup::Hot => &[
                "CAACAgIAAxkBAAEGDp5jRSj0EujFDiRZTSFj8fUFaelkqgAC4RUAAgP1YEovHkwXccq2ESoE",
                "CAACAgIAAxkBAAEN6yBnwfQY4HlsTcxIgIY4AvYzV6GCDQAChBgAAvxNMUkp9tvuLH1wmjYE",
            ],
            StickerGroup::Cold => &[
                "CAACAgIAAxkBAAEGDmVjRSGcWTq4xQg6VU78pndFP1mDMgACrxUAAqulyUtZecNIn_jluyoE",
                "CAACAgIAAxkBAAEN6xxnwfNCnsGVlg4CDoJISbzlqsGeLAAC-BoAAp8HuUkNd4LjiYDilzYE",
            ],
        }
    }
}

/// Group of the most frequent condition across the day's segments.
///
/// Ties go to the earliest segment.
pub fn dominant_group(day: &DayForecast) -> Option<StickerGroup> {
    let ids: Vec<u16> = day
        .segments()
        .map(|(_, s)| s.condition_id)
        .filter(|id| *id != 0)
        .collect();

    let mut best: Option<(u16, usize)> = None;
    for id in &ids {
        let count = ids.iter().filter(|other| *other == id).count();
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((*id, count));
        }
    }
    best.and_then(|(id, _)| StickerGroup::for_condition(id))
}

/// Every group the day qualifies for. Empty when no base group applies.
pub fn candidate_groups(day: &DayForecast) -> Vec<StickerGroup> {
    let Some(base) = dominant_group(day) else {
        return Vec::new();
    };

    let mut groups = vec![base];
    if let Some(daytime) = &day.day {
        if daytime.wind_speed > WINDY_ABOVE {
            groups.push(StickerGroup::Windy);
        }
        if daytime.temperature > HOT_ABOVE {
            groups.push(StickerGroup::Hot);
        }
        if daytime.temperature < COLD_BELOW {
            groups.push(StickerGroup::Cold);
        }
    }
    groups
}

pub fn choose_sticker<R: Rng + ?Sized>(day: &DayForecast, rng: &mut R) -> Option<&'static str> {
    let groups = candidate_groups(day);
    let group = groups.choose(rng)?;
    group.stickers().choose(rng).copied()
}

/// [`choose_sticker`] with the thread-local RNG.
pub fn pick_sticker(day: &DayForecast) -> Option<&'static str> {
    choose_sticker(day, &mut rand::thread_rng())
}
