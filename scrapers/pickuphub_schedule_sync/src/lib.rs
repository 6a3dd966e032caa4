pub mod calendar;
pub mod calendar_sync;
pub mod config;
pub mod duplicate_guard;
pub mod error;
pub mod html;
pub mod pipeline;
pub mod record_parser;
pub mod schedule_extractor;
pub mod session;
pub mod types;
