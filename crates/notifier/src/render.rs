//! HTML message bodies for forecasts.

use weatherbell_common::types::{DayForecast, DaySegment, DaySummary, SegmentForecast};

/// Emoji for an OpenWeather condition code, grouped by hundreds.
pub fn condition_emoji(condition_id: u16) -> &'static str {
    if condition_id == 800 {
        return "☀️";
    }
    match condition_id / 100 {
        2 => "⛈",
        3 => "🌦",
        5 => "🌧",
        6 => "❄️",
        7 => "🌫",
        8 => "☁️",
        _ => "",
    }
}

fn segment_heading(segment: DaySegment) -> (&'static str, &'static str) {
    match segment {
        DaySegment::Morning => ("🥱", "Morning"),
        DaySegment::Day => ("🌞", "Day"),
        DaySegment::Evening => ("🌚", "Evening"),
        DaySegment::Night => ("🌙", "Night"),
    }
}

fn segment_line(segment: DaySegment, forecast: &SegmentForecast) -> String {
    let (icon, label) = segment_heading(segment);
    format!(
        "{} <b>{}:</b> {:.0}°C, feels like {:.1}°C, {} {}",
        icon,
        label,
        forecast.temperature,
        forecast.feels_like,
        forecast.condition,
        condition_emoji(forecast.condition_id)
    )
    .trim_end()
    .to_string()
}

/// Today's forecast, one line per part of the day that has data.
pub fn daily_forecast(city: &str, day: &DayForecast) -> String {
    let mut lines = vec![format!("🌤 <b>Today's forecast ({}):</b>", escape(city))];
    lines.extend(day.segments().map(|(segment, f)| segment_line(segment, f)));
    lines.join("\n")
}

/// Compact multi-day outlook, one line per date.
pub fn five_day_forecast(city: &str, days: &[DaySummary]) -> String {
    let mut lines = vec![format!("🌤 <b>5-day forecast ({}):</b>", escape(city))];
    lines.extend(days.iter().map(|d| {
        format!(
            "🗓 <b>{}:</b> {:.0}°C, {} {}",
            d.date.format("%a %d.%m"),
            d.temperature,
            d.condition,
            condition_emoji(d.condition_id)
        )
        .trim_end()
        .to_string()
    }));
    lines.join("\n")
}

/// Escape text for Telegram's HTML parse mode.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
