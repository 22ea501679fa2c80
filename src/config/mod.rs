mod settings;

pub use settings::{DispatchSettings, LogConfig, OtelConfig, ServerConfig, Settings};
