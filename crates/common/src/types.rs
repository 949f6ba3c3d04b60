use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A gazetteer entry. Identified by the external gazetteer's stable integer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct City {
    pub id: i64,
    #[serde(alias = "city")]
    pub name: String,
    #[serde(default)]
    pub federal_district: String,
    #[serde(alias = "region_with_type")]
    pub region: String,
    /// District, only used to tell same-named cities apart in listings.
    #[serde(default, alias = "city_district_with_type")]
    pub city_district: Option<String>,
    #[serde(default, alias = "street_with_type")]
    pub street: Option<String>,
}

/// A bot user, keyed by Telegram id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub tg_id: i64,
    /// Delivery address. May differ from `tg_id`.
    pub chat_id: i64,
    pub name: String,
    pub city: Option<String>,
    pub city_id: Option<i64>,
    pub region: Option<String>,
    pub state: ConversationState,
    pub sticker: bool,
}

impl User {
    pub fn new(tg_id: i64, chat_id: i64, name: impl Into<String>) -> Self {
        Self {
            tg_id,
            chat_id,
            name: name.into(),
            city: None,
            city_id: None,
            region: None,
            state: ConversationState::Idle,
            sticker: false,
        }
    }

    /// Point the user at `city`, denormalizing name and region.
    pub fn select_city(&mut self, city: &City) {
        self.city = Some(city.name.clone());
        self.city_id = Some(city.id);
        self.region = Some(city.region.clone());
    }
}

/// Where a user currently is in the dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingCityInput,
    AwaitingCitySelection,
    AwaitingTimeInput,
}

/// Inputs that move a conversation between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogEvent {
    Start,
    ChangeCity,
    /// The typed name matched exactly one city.
    CityMatched,
    /// The typed name matched several cities; the user must pick one.
    CityAmbiguous,
    CitySelected,
    /// The selection was rejected or the user asked to type the name again.
    ReenterCity,
    EditNotifications,
    /// A notification time was accepted, removed, or the edit was cancelled.
    NotificationsDone,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event {event:?} is not valid in state {from}")]
pub struct InvalidTransition {
    pub from: ConversationState,
    pub event: DialogEvent,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::AwaitingCityInput => "awaiting_city_input",
            ConversationState::AwaitingCitySelection => "awaiting_city_selection",
            ConversationState::AwaitingTimeInput => "awaiting_time_input",
        }
    }

    /// Parse a stored tag. Unknown or legacy tags restart the dialog from `Idle`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "awaiting_city_input" => ConversationState::AwaitingCityInput,
            "awaiting_city_selection" => ConversationState::AwaitingCitySelection,
            "awaiting_time_input" => ConversationState::AwaitingTimeInput,
            _ => ConversationState::Idle,
        }
    }

    /// Transition table for the dialog.
    pub fn apply(self, event: DialogEvent) -> Result<ConversationState, InvalidTransition> {
        use ConversationState::*;
        use DialogEvent::*;

        let next = match (self, event) {
            (_, Start) => AwaitingCityInput,
            (_, Reset) => Idle,
            (Idle, ChangeCity) => AwaitingCityInput,
            (Idle, EditNotifications) => AwaitingTimeInput,
            (AwaitingCityInput, CityMatched) => Idle,
            (AwaitingCityInput, CityAmbiguous) => AwaitingCitySelection,
            (AwaitingCitySelection, CitySelected) => Idle,
            (AwaitingCitySelection, ReenterCity) => AwaitingCityInput,
            (AwaitingTimeInput, NotificationsDone) => Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Averaged conditions over one part of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentForecast {
    pub temperature: f64,
    pub feels_like: f64,
    pub wind_speed: f64,
    pub condition: String,
    pub condition_id: u16,
}

/// Detailed forecast for one calendar date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub morning: Option<SegmentForecast>,
    pub day: Option<SegmentForecast>,
    pub evening: Option<SegmentForecast>,
    pub night: Option<SegmentForecast>,
}

impl DayForecast {
    /// Segments in chronological order, skipping empty ones.
    pub fn segments(&self) -> impl Iterator<Item = (DaySegment, &SegmentForecast)> {
        [
            (DaySegment::Morning, self.morning.as_ref()),
            (DaySegment::Day, self.day.as_ref()),
            (DaySegment::Evening, self.evening.as_ref()),
            (DaySegment::Night, self.night.as_ref()),
        ]
        .into_iter()
        .filter_map(|(segment, forecast)| forecast.map(|f| (segment, f)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySegment {
    Morning,
    Day,
    Evening,
    Night,
}

/// One line of the compact multi-day summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub temperature: f64,
    pub condition: String,
    pub condition_id: u16,
}

/// A city's processed forecast. Always replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub city_id: i64,
    pub full_day: BTreeMap<NaiveDate, DayForecast>,
    pub short_days: Vec<DaySummary>,
}

impl WeatherForecast {
    pub fn for_date(&self, date: NaiveDate) -> Option<&DayForecast> {
        self.full_day.get(&date)
    }
}
