//! Domain services.

pub mod aggregation;
pub mod notification_feed;
pub mod two_factor;
pub mod views;
