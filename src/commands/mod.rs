//! Report builders: one module per top-level subcommand.
//!
//! Each builder asks the [`crate::fetcher::Fetcher`] for objects and usage
//! data, shapes them into that report's typed row structs, and leaves
//! sorting/limiting/exporting to [`crate::output`].

pub mod analyze;
pub mod pulse;
pub mod vacuum;
