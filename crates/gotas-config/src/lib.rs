pub mod error;
pub mod settings;
pub mod tool_config;

// Re-export commonly used types
pub use error::{ConfigError, ConfigResult};
pub use settings::{BackendKind, FileFormat, GatewaySettings};
pub use tool_config::{
    decode_config_blob, resolve_tool_config, ConfigProvider, EnvConfigProvider,
    StaticConfigProvider, ToolConfig, API_KEY, BASE_URL,
};
