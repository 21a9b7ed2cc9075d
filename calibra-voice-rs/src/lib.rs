//! calibra-voice-rs: spoken calibration due-date alerts for laboratory equipment.
//!
//! Classifies equipment by days until its calibration certificate expires,
//! composes a Portuguese spoken report of the most urgent items and hands it
//! to a speech engine at most once per period of the day.

pub mod api;
pub mod clock;
pub mod config;
pub mod models;
pub mod narration;
pub mod narrator;
pub mod speech;
pub mod status;
pub mod throttle;
