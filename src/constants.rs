//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Throttle/retry constants
pub mod throttle {
    /// Wait used when upstream throttles without saying for how long (seconds)
    pub const DEFAULT_WAIT_SECS: u64 = 10;

    /// Added on top of the upstream `retry_after` hint (seconds)
    pub const RETRY_AFTER_PADDING_SECS: u64 = 1;
}

/// Image generation constants
pub mod image {
    /// Aspect ratio requested from image providers
    pub const ASPECT_RATIO: &str = "1:1";

    /// Output format requested from image providers
    pub const OUTPUT_FORMAT: &str = "jpg";

    /// MIME type assumed when a fetched image has no content type
    pub const DEFAULT_MIME: &str = "image/jpeg";

    /// Interval between prediction status polls (milliseconds)
    pub const POLL_INTERVAL_MS: u64 = 1000;

    /// Maximum number of prediction status polls
    pub const MAX_POLLS: u32 = 120;
}

/// Snapshot cache constants
pub mod cache {
    /// Key holding the serialized results map
    pub const RESULTS_KEY: &str = "benchmark_results";

    /// Key holding the snapshot timestamp
    pub const TIMESTAMP_KEY: &str = "benchmark_timestamp";

    /// Default sqlite cache file
    pub const DEFAULT_SQLITE_PATH: &str = ".modelarena/cache.db";
}

/// HTTP/Network constants
pub mod network {
    /// Default provider request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Default API server bind address
    pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
}
