//! OpenWeather 5 day / 3 hour forecast client.
//!
//! Raw slots are grouped by UTC calendar date and averaged into parts of the
//! day. The night of a date is taken from the early slots of the following
//! date. The condition of each part is the most frequent one, with ties going
//! to the more severe condition.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike};
use serde::Deserialize;

use weatherbell_common::types::{DayForecast, DaySummary, SegmentForecast, WeatherForecast};

use crate::provider::{ForecastProvider, ProviderError};

const API_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const MORNING_HOURS: &[u32] = &[6, 9, 12];
const DAY_HOURS: &[u32] = &[12, 15, 18];
const EVENING_HOURS: &[u32] = &[18, 21];
const NIGHT_HOURS: &[u32] = &[0, 3, 6];

/// Dates kept in the multi-day summary.
const SUMMARY_DAYS: usize = 5;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<Slot>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Slot {
    dt: i64,
    main: SlotMain,
    #[serde(default)]
    weather: Vec<SlotCondition>,
    #[serde(default)]
    wind: SlotWind,
}

#[derive(Debug, Clone, Deserialize)]
struct SlotMain {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct SlotCondition {
    id: u16,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SlotWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: reqwest::Client,
    api_key: String,
    lang: String,
    base_url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            lang: "en".to_string(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Language of condition descriptions.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    async fn fetch(&self, city_id: i64) -> Result<WeatherForecast, ProviderError> {
        let response = self
            .client
            .get(format!("{}/forecast", self.base_url))
            .query(&[
                ("id", city_id.to_string()),
                ("units", "metric".to_string()),
                ("lang", self.lang.clone()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ForecastResponse = response.json().await?;
        tracing::debug!(city_id, slots = body.list.len(), "Forecast slots received");
        aggregate(city_id, &body.list)
    }
}

/// Severity rank used to break frequency ties.
fn priority(condition_id: u16) -> u8 {
    match condition_id {
        800 => 1,
        801..=804 => 2,
        _ => match condition_id / 100 {
            2 => 6,
            3 => 5,
            5 => 4,
            6 => 3,
            7 => 2,
            _ => 0,
        },
    }
}

/// Most frequent condition among `slots`, ties broken by severity, then by
/// first appearance.
fn dominant_condition<'a>(slots: impl Iterator<Item = &'a Slot>) -> Option<(u16, String)> {
    let mut tally: Vec<(u16, &str, usize)> = Vec::new();
    for condition in slots.filter_map(|s| s.weather.first()) {
        match tally.iter_mut().find(|(id, _, _)| *id == condition.id) {
            Some((_, _, count)) => *count += 1,
            None => tally.push((condition.id, condition.description.as_str(), 1)),
        }
    }

    let mut best: Option<(u16, &str, usize)> = None;
    for entry in tally {
        let better = match best {
            None => true,
            Some((id, _, count)) => {
                entry.2 > count || (entry.2 == count && priority(entry.0) > priority(id))
            }
        };
        if better {
            best = Some(entry);
        }
    }
    best.map(|(id, description, _)| (id, description.to_string()))
}

fn slot_hour(slot: &Slot) -> Option<u32> {
    DateTime::from_timestamp(slot.dt, 0).map(|t| t.hour())
}

fn segment(slots: &[Slot], hours: &[u32]) -> Option<SegmentForecast> {
    let matching: Vec<&Slot> = slots
        .iter()
        .filter(|s| slot_hour(s).is_some_and(|h| hours.contains(&h)))
        .collect();
    if matching.is_empty() {
        return None;
    }

    let n = matching.len() as f64;
    let (condition_id, condition) = dominant_condition(matching.iter().copied()).unwrap_or_default();
    Some(SegmentForecast {
        temperature: matching.iter().map(|s| s.main.temp).sum::<f64>() / n,
        feels_like: matching.iter().map(|s| s.main.feels_like).sum::<f64>() / n,
        wind_speed: matching.iter().map(|s| s.wind.speed).sum::<f64>() / n,
        condition,
        condition_id,
    })
}

fn summary(date: NaiveDate, slots: &[Slot]) -> Option<DaySummary> {
    if slots.is_empty() {
        return None;
    }
    let (condition_id, condition) = dominant_condition(slots.iter()).unwrap_or_default();
    Some(DaySummary {
        date,
        temperature: slots.iter().map(|s| s.main.temp).sum::<f64>() / slots.len() as f64,
        condition,
        condition_id,
    })
}

/// Fold raw 3-hour slots into a [`WeatherForecast`].
pub(crate) fn aggregate(city_id: i64, slots: &[Slot]) -> Result<WeatherForecast, ProviderError> {
    let mut by_date: BTreeMap<NaiveDate, Vec<Slot>> = BTreeMap::new();
    for slot in slots {
        if let Some(at) = DateTime::from_timestamp(slot.dt, 0) {
            by_date.entry(at.date_naive()).or_default().push(slot.clone());
        }
    }
    if by_date.is_empty() {
        return Err(ProviderError::Empty(city_id));
    }

    let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
    let mut full_day = BTreeMap::new();
    let mut short_days = Vec::new();

    for (i, date) in dates.iter().enumerate() {
        let day_slots = &by_date[date];
        let night = dates
            .get(i + 1)
            .and_then(|next| segment(&by_date[next], NIGHT_HOURS));

        full_day.insert(
            *date,
            DayForecast {
                morning: segment(day_slots, MORNING_HOURS),
                day: segment(day_slots, DAY_HOURS),
                evening: segment(day_slots, EVENING_HOURS),
                night,
            },
        );

        if short_days.len() < SUMMARY_DAYS {
            short_days.extend(summary(*date, day_slots));
        }
    }

    Ok(WeatherForecast {
        city_id,
        full_day,
        short_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn slot(date: (i32, u32, u32), hour: u32, temp: f64, condition_id: u16) -> Slot {
        let dt = Utc
            .with_ymd_and_hms(date.0, date.1, date.2, hour, 0, 0)
            .unwrap()
            .timestamp();
        Slot {
            dt,
            main: SlotMain {
                temp,
                feels_like: temp - 1.0,
            },
            weather: vec![SlotCondition {
                id: condition_id,
                description: format!("condition {}", condition_id),
            }],
            wind: SlotWind { speed: 3.0 },
        }
    }

    #[test]
    fn test_priority_ranks_severity() {
        assert!(priority(211) > priority(301));
        assert!(priority(301) > priority(500));
        assert!(priority(500) > priority(600));
        assert!(priority(600) > priority(804));
        assert!(priority(804) > priority(800));
    }

    #[test]
    fn test_dominant_by_count_then_priority() {
        let slots = vec![
            slot((2024, 1, 2), 6, 0.0, 800),
            slot((2024, 1, 2), 9, 0.0, 800),
            slot((2024, 1, 2), 12, 0.0, 500),
        ];
        assert_eq!(dominant_condition(slots.iter()).unwrap().0, 800);

        let tied = vec![
            slot((2024, 1, 2), 6, 0.0, 800),
            slot((2024, 1, 2), 9, 0.0, 500),
        ];
        assert_eq!(dominant_condition(tied.iter()).unwrap().0, 500);
    }

    #[test]
    fn test_segments_and_night_from_next_date() {
        let slots = vec![
            slot((2024, 1, 2), 6, -6.0, 600),
            slot((2024, 1, 2), 9, -4.0, 600),
            slot((2024, 1, 2), 12, -2.0, 804),
            slot((2024, 1, 2), 15, 0.0, 804),
            slot((2024, 1, 2), 18, -1.0, 804),
            slot((2024, 1, 2), 21, -3.0, 800),
            slot((2024, 1, 3), 0, -8.0, 800),
            slot((2024, 1, 3), 3, -10.0, 800),
        ];
        let forecast = aggregate(42, &slots).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let day = forecast.for_date(date).unwrap();

        let morning = day.morning.as_ref().unwrap();
        assert_eq!(morning.temperature, -4.0);
        assert_eq!(morning.condition_id, 600);

        let daytime = day.day.as_ref().unwrap();
        assert_eq!(daytime.temperature, -1.0);
        assert_eq!(daytime.condition_id, 804);

        let evening = day.evening.as_ref().unwrap();
        assert_eq!(evening.temperature, -2.0);

        let night = day.night.as_ref().unwrap();
        assert_eq!(night.temperature, -9.0);
        assert_eq!(night.condition_id, 800);

        // The last date has no following date to take its night from.
        let last = forecast
            .for_date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
            .unwrap();
        assert!(last.night.is_none());
        assert!(last.morning.is_none());

        assert_eq!(forecast.short_days.len(), 2);
        assert_eq!(forecast.short_days[0].date, date);
    }

    #[test]
    fn test_summary_is_capped_at_five_days() {
        let slots: Vec<Slot> = (1..=6).map(|d| slot((2024, 1, d), 12, 1.0, 800)).collect();
        let forecast = aggregate(1, &slots).unwrap();
        assert_eq!(forecast.full_day.len(), 6);
        assert_eq!(forecast.short_days.len(), SUMMARY_DAYS);
    }

    #[test]
    fn test_no_slots_is_an_error() {
        assert!(matches!(aggregate(9, &[]), Err(ProviderError::Empty(9))));
    }

    #[test]
    fn test_response_deserializes() {
        let body: ForecastResponse = serde_json::from_value(serde_json::json!({
            "cod": "200",
            "list": [{
                "dt": 1704175200,
                "main": { "temp": -3.2, "feels_like": -7.9, "humidity": 80 },
                "weather": [{ "id": 601, "main": "Snow", "description": "snow" }],
                "wind": { "speed": 4.1, "deg": 200 }
            }]
        }))
        .unwrap();
        assert_eq!(body.list.len(), 1);
        assert_eq!(body.list[0].weather[0].id, 601);
    }
}
