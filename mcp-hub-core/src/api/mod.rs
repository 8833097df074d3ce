//! Hub API
//!
//! There are three ways to initialize the configuration:
//!
//! - `init_default()`: from system environment variables, defaults elsewhere
//! - `init_with_config_file(config_path: &str)`: from a YAML file
//! - `init_with_config(config_entity: ConfigEntity)`: from a hand-crafted entity
//!
//! The resulting `ConfigEntity` builds a `Hub`. Subsystem clients are wrapped into
//! `ClientFacade`s bound to the hub, and may be exposed by name through the `ToolRegistry`.

mod facade;
mod fallback;
mod hub;
mod init;
mod tools;

pub use facade::*;
pub use fallback::*;
pub use hub::*;
pub use init::*;
pub use tools::*;
