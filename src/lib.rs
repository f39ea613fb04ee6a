//! Looker usage-audit library.
//!
//! Queries a Looker instance's REST API to report on how its semantic layer
//! is actually used — which projects, models, explores, joins and fields are
//! queried, and which are dead weight safe to clean up.
//!
//! ## Architecture
//!
//! - [`client`] - authenticated API gateway ([`client::ApiGateway`] trait +
//!   reqwest implementation)
//! - [`fetcher`] - the usage aggregator: reconciles declared metadata
//!   against usage-log query results into per-entity counts
//! - [`commands`] - report builders for `analyze`, `vacuum` and `pulse`
//! - [`output`] - generic sort/limit/CSV/table post-processing over typed
//!   report rows
//! - [`config`] - credentials file with named host entries
//! - [`error`] - typed error taxonomy (not-found vs validation vs fatal)
//!
//! A report invocation wires these together once: resolve credentials,
//! connect a [`client::LookerClient`], build a fresh [`fetcher::Fetcher`]
//! with the requested timeframe and query threshold, run one report builder,
//! post-process, print/export. Nothing is cached or persisted between runs
//! beyond the optional CSV export.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod output;
pub mod progress;

pub use client::{ApiGateway, LookerClient};
pub use error::{Error, Result};
pub use fetcher::Fetcher;
