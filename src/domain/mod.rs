// Domain layer - records, metric reshaping, upstream dashboard shapes
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod record;
