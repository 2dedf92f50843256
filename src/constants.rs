// Constants module - centralized default values for configuration
//
// Option defaults here are compatibility contracts: clients rely on them
// when they omit an argument.

// =============================================================================
// Option defaults
// =============================================================================

pub const DEFAULT_MODE: &str = "crop";
pub const DEFAULT_FILTER: &str = "antialias";
pub const DEFAULT_POSITION: &str = "center";
pub const DEFAULT_BACKGROUND: &str = "fff";
pub const DEFAULT_QUALITY: u8 = 90;
pub const DEFAULT_RETAIN: u8 = 75;

/// Literal accepted for `q` meaning "reuse the source encoder quality"
pub const QUALITY_KEEP: &str = "keep";

/// Literal accepted for `deg` meaning "derive rotation from EXIF"
pub const DEGREE_AUTO: &str = "auto";

// =============================================================================
// Operation defaults
// =============================================================================

pub const DEFAULT_OPERATION: &str = "resize";

/// Default maximum number of operations in one chain
pub const DEFAULT_MAX_OPERATIONS: usize = 10;

// =============================================================================
// Fetch defaults
// =============================================================================

/// Default source fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default maximum concurrent source fetches
pub const DEFAULT_MAX_REQUESTS: usize = 40;

/// Upstream headers forwarded to the client on success
pub const FORWARDED_HEADERS: [&str; 3] = ["cache-control", "expires", "last-modified"];

// =============================================================================
// Logging defaults
// =============================================================================

pub const DEFAULT_LOG_LEVEL: &str = "info";
