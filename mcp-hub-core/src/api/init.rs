//! Initialization resolves the hub configuration and the global logger:
//! 1. override the config, from a manual entity or a yaml file or env variables
//! 2. initialize the global logger
//!
//! The resolved entity is returned to the caller, who builds the `Hub` from it.

use crate::config::{self, ConfigEntity};
use crate::Result;

/// `init_default` resolves the configuration from the system
/// environment and the default values.
#[inline]
pub fn init_default() -> Result<ConfigEntity> {
    init_with_config_file("")
}

/// `init_with_config` validates the given entity and lets the environment override it.
#[inline]
pub fn init_with_config(mut config_entity: ConfigEntity) -> Result<ConfigEntity> {
    config_entity.check()?;
    config::override_items_from_system_env(&mut config_entity)?;
    config::init_log(&config_entity);
    Ok(config_entity)
}

/// `init_with_config_file` loads the configuration from the given YAML file.
/// A blank path falls back to `MCP_HUB_CONFIG_FILE_PATH`, then to the defaults.
#[inline]
pub fn init_with_config_file(config_path: &str) -> Result<ConfigEntity> {
    let entity = config::load_config_with_yaml(config_path)?;
    config::init_log(&entity);
    Ok(entity)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn init_with_valid_entity() {
        let mut entity = ConfigEntity::new();
        entity.config.breaker.failure_threshold = 7;
        let entity = init_with_config(entity).unwrap();
        assert_eq!(entity.config.breaker.failure_threshold, 7);
    }

    #[test]
    fn init_with_invalid_entity() {
        let mut entity = ConfigEntity::new();
        entity.version = String::new();
        assert!(init_with_config(entity).is_err());
    }
}
