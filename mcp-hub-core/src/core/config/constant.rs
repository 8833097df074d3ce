// default app settings
pub const HUB_CONFIG_VERSION: &str = "v1";
pub const DEFAULT_APP_NAME: &str = "gmp-mcp-hub";
pub const APP_NAME_ENV_KEY: &str = "MCP_HUB_APP_NAME";
pub const CONF_FILE_PATH_ENV_KEY: &str = "MCP_HUB_CONFIG_FILE_PATH";
pub const CONFIG_FILENAME: &str = "USE_DEFAULT_CONFIGURATION";

// default circuit breaker settings
pub const BREAKER_FAILURE_THRESHOLD: u32 = 5;
pub const BREAKER_WINDOW_MS: u64 = 60_000;
pub const BREAKER_OPEN_DURATION_MS: u64 = 30_000;
pub const BREAKER_HALF_OPEN_TRIALS: u32 = 1;

// default dispatcher settings
pub const DISPATCHER_POOL_SIZE: usize = 16;
pub const DISPATCHER_QUEUE_CAPACITY: usize = 256;
pub const DISPATCHER_CALL_TIMEOUT_MS: u64 = 5_000;

// default statistic settings
pub const RECORDER_RING_CAPACITY: usize = 1_000;
pub const ERROR_LOG_CAPACITY: usize = 500;
pub const RECENT_ERRORS_LIMIT: usize = 50;
pub const RECENT_CALLS_LIMIT: usize = 100;
pub const HEALTH_DEGRADED_PCT: f64 = 2.0;
pub const HEALTH_UNHEALTHY_PCT: f64 = 10.0;

// default cache settings
pub const CACHE_TTL_MS: u64 = 5_000;
pub const CACHE_CAPACITY: usize = 64;

// default report settings, 7 days of one snapshot per minute
pub const SNAPSHOT_INTERVAL_MS: u64 = 60_000;
pub const SNAPSHOT_RETENTION: usize = 10_080;

// default endpoints
pub const DASHBOARD_ADDR: &str = "127.0.0.1:8088";
pub const EXPORTER_ADDR: &str = "127.0.0.1:9091";
pub const EXPORTER_METRICS_PATH: &str = "/metrics";

// default log settings
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const LOG_CONFIG_FILE: &str = "testdata/config/log4rs.yaml";
