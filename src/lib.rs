//! Brand Monitor: sentiment classification and monthly aggregation of
//! customer reviews.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sentiment;
