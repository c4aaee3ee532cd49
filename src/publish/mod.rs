//! Video hosting adapters.

pub mod youtube;

pub use youtube::YouTubePublisher;
