//! Google Calendar integration

pub mod client;
pub mod oauth;

pub use client::{GoogleCalendarAuth, GoogleCalendarClient};
pub use oauth::{ExchangedTokens, GoogleOAuthFlow};
