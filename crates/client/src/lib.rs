//! Client code for showbell.
//!
//! This crate provides the HTTP fetch pipeline, the show metadata client,
//! the cache manager and the worker lifecycle controller.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod metadata;

pub use cache::{CacheManager, CacheResponse, Policy, ResponseSource, RouteTable, WarmReport};
pub use fetch::{Destination, FetchClient, FetchConfig, FetchResponse, Network, RequestMode, ResourceRequest};
pub use lifecycle::{ActivateReport, InstallReport, Lifecycle, Phase};
pub use metadata::{MetadataClient, MetadataConfig, MetadataError};
