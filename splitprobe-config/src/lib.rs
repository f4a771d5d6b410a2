//! Domain-driven configuration for splitprobe
//!
//! Configuration is split by functional domain (HTTP client, admin API,
//! router, mock origins, test topology, scenarios, logging), with defaults,
//! validation and `SPLITPROBE_*` environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    admin::{AdminConfig, ReadinessConfig},
    http::HttpConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    origins::OriginsConfig,
    router::RouterConfig,
    scenarios::{
        MultiPathConfig, OriginOutageConfig, RoundRobinConfig, ScenariosConfig,
        StickySessionConfig, WeightedSplitConfig,
    },
    topology::{OriginSpec, TestConfig, TopologyConfig, VariantConfig},
    ProbeConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
