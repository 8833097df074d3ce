use cfg_if::cfg_if;
pub use log::{debug, error, info, trace, warn};

cfg_if! {
    if #[cfg(feature = "logger_env")] {
        use crate::config::DEFAULT_LOG_LEVEL;
        fn init_env_logger() {
            // `try_init` so that tests and embedding binaries may initialize twice
            let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_LEVEL))
                .try_init();
        }
        pub fn logger_init(_: Option<String>) {
            init_env_logger();
        }
    }
    else if #[cfg(feature = "logger_log4rs")] {
        use std::path::Path;
        fn init_log4rs(file_name: Option<String>) {
            let file_name = match file_name {
                Some(file_name) => file_name,
                None => return,
            };
            let path = Path::new(&file_name);
            if path.exists() {
                if let Err(err) = log4rs::init_file(path, Default::default()) {
                    eprintln!("[Logging] Failed to initialize log4rs from {}: {:?}", file_name, err);
                }
            }
        }
        pub fn logger_init(file_name: Option<String>) {
            init_log4rs(file_name);
        }
    } else {
        pub fn logger_init(_: Option<String>) {}
    }
}
