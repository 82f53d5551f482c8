use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Consumer settings, read from the environment with the `APP_` prefix
/// over built-in defaults.
#[derive(Debug, Serialize, Deserialize)]
pub struct Configuration {
    pub delete_payloads: bool,
    pub max_concurrent_deletes: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            delete_payloads: false,
            max_concurrent_deletes: 4,
        }
    }
}

impl Configuration {
    pub fn load() -> Self {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            // .merge overrides defaults with any values from the environment
            .merge(Env::prefixed("APP_"))
            .extract();

        match config {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to load configuration: {:?}", e);
                Configuration::default()
            }
        }
    }
}
