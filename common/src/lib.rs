pub mod aggregate;
pub mod chart;
pub mod config;
pub mod dataset;
pub mod error;
pub mod plot;
pub mod series;
pub mod util;
