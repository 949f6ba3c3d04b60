//! Outbound side of the bot: turning forecasts into messages and delivering them.
//!
//! [`sink::DeliverySink`] is the delivery contract the notification scheduler
//! depends on. [`telegram::TelegramSink`] implements it over the Bot API.

pub mod render;
pub mod sink;
pub mod sticker;
pub mod telegram;

pub use sink::{DeliveryError, DeliverySink, Message};
pub use telegram::TelegramSink;
