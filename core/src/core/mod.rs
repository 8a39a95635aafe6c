pub mod deleter;
pub mod engine;
pub mod fetcher;
pub mod filter;
pub mod model;
pub mod result_aggregator;
pub mod throttle;
