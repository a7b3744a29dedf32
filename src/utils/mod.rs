/// TOML configuration, presets and the configuration manager.
pub mod toml_config;
