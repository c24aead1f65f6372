//! Adapters for services reached over the network.

pub mod http_fetch;
pub mod rapidapi;

pub use http_fetch::HttpFetcher;
pub use rapidapi::RapidApiResolver;
