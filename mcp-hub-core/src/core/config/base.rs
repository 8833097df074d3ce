use super::{constant::*, ConfigEntity};
use crate::{logging, utils, Error, Result};
use std::env;
use std::fs;
use std::path::Path;

// load_config_with_yaml resolves the hub configuration.
// Priority: system environment > YAML file > default config
pub fn load_config_with_yaml(config_path: &str) -> Result<ConfigEntity> {
    let mut entity = load_config_from_yaml_file(&resolve_config_path(config_path))?;
    override_items_from_system_env(&mut entity)?;
    Ok(entity)
}

// If the config file path is absent, the hub tries to resolve it from the system env.
fn resolve_config_path(config_path: &str) -> String {
    if utils::is_blank(config_path) {
        env::var(CONF_FILE_PATH_ENV_KEY).unwrap_or_else(|_| CONFIG_FILENAME.into())
    } else {
        config_path.to_owned()
    }
}

fn load_config_from_yaml_file(path_str: &str) -> Result<ConfigEntity> {
    if path_str == CONFIG_FILENAME {
        return Ok(ConfigEntity::default());
    }
    let path = Path::new(path_str);
    if !path.exists() {
        return Err(Error::msg(format!(
            "hub YAML configuration file does not exist: {}",
            path_str
        )));
    }
    let content = fs::read_to_string(path)?;
    let entity: ConfigEntity = serde_yaml::from_str(&content)?;
    entity.check()?;
    logging::info!("[Config] Resolving hub config from file, file {}", path_str);
    Ok(entity)
}

// override_items_from_system_env lets the environment win over the file.
pub fn override_items_from_system_env(entity: &mut ConfigEntity) -> Result<()> {
    if let Ok(app_name) = env::var(APP_NAME_ENV_KEY) {
        if !utils::is_blank(&app_name) {
            entity.config.app.app_name = app_name;
        }
    }
    entity.check()
}

pub fn init_log(entity: &ConfigEntity) {
    logging::logger_init(Some(entity.config.log.config_file.clone()));
    logging::info!(
        "[Config] App name resolved, appName {}",
        entity.config.app.app_name
    );
    logging::info!(
        "[Config] Print effective hub config, config {:?}",
        entity
    );
}
