// Library interface for rust_anime_scraper
// Source adapters return Envelopes; the binary and tests both build on this.

pub mod browser_client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod grouping;
pub mod helpers;
pub mod http_client;
pub mod models;
pub mod pagination;
pub mod resolver;
pub mod sources;
pub mod streaming;

pub use envelope::{Envelope, Status};
pub use error::{Result, ScrapeError};
pub use fetch::{Cancellation, PageFetcher, PageRequest, SourceFetcher};
pub use sources::{Registry, SourceAdapter};
