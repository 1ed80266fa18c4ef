use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

pub mod database;
pub mod error;
pub mod messages;
pub mod receipts;
pub mod rooms;
pub mod unread;
pub mod users;

use crate::init_tracing;
use database::Database;
use error::{BackchannelError, Result};

#[derive(Clone, Debug)]
pub struct BackchannelConfig {
    /// Directory for application data
    pub data_dir: PathBuf,

    /// Directory for application logs
    pub logs_dir: PathBuf,
}

impl BackchannelConfig {
    pub fn new(data_dir: &Path, logs_dir: &Path) -> Self {
        let env_suffix = if cfg!(debug_assertions) {
            "dev"
        } else {
            "release"
        };

        Self {
            data_dir: data_dir.join(env_suffix),
            logs_dir: logs_dir.join(env_suffix),
        }
    }
}

/// The library façade. Owns the database handle; every operation takes the
/// acting user id explicitly — there is no ambient current-user context.
pub struct Backchannel {
    pub config: BackchannelConfig,
    pub(crate) database: Arc<Database>,
}

impl Backchannel {
    /// Initializes the library with the provided configuration.
    ///
    /// Creates the data and log directories, sets up logging, and opens
    /// (creating and migrating if needed) the SQLite database.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created or the database
    /// cannot be opened or migrated.
    pub async fn initialize(config: BackchannelConfig) -> Result<Self> {
        let data_dir = &config.data_dir;
        let logs_dir = &config.logs_dir;

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))
            .map_err(BackchannelError::from)?;
        std::fs::create_dir_all(logs_dir)
            .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))
            .map_err(BackchannelError::from)?;

        init_tracing(logs_dir);

        tracing::debug!(
            target: "backchannel::initialize",
            "Logging initialized in directory: {:?}",
            logs_dir
        );

        let database = Arc::new(Database::new(data_dir.join("backchannel.sqlite")).await?);

        Ok(Self { config, database })
    }
}

impl std::fmt::Debug for Backchannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backchannel")
            .field("config", &self.config)
            .field("database", &"<REDACTED>")
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config() -> (BackchannelConfig, TempDir, TempDir) {
        let data_temp_dir = TempDir::new().expect("Failed to create temp data dir");
        let logs_temp_dir = TempDir::new().expect("Failed to create temp logs dir");

        let config = BackchannelConfig::new(data_temp_dir.path(), logs_temp_dir.path());

        (config, data_temp_dir, logs_temp_dir)
    }

    #[test]
    fn test_config_new_appends_env_suffix() {
        let data_dir = Path::new("/test/data");
        let logs_dir = Path::new("/test/logs");

        let config = BackchannelConfig::new(data_dir, logs_dir);

        if cfg!(debug_assertions) {
            assert_eq!(config.data_dir, data_dir.join("dev"));
            assert_eq!(config.logs_dir, logs_dir.join("dev"));
        } else {
            assert_eq!(config.data_dir, data_dir.join("release"));
            assert_eq!(config.logs_dir, logs_dir.join("release"));
        }
    }

    #[tokio::test]
    async fn test_initialize_creates_directories_and_database() {
        let (config, _data_temp, _logs_temp) = create_test_config();

        let backchannel = Backchannel::initialize(config.clone()).await.unwrap();

        assert_eq!(backchannel.config.data_dir, config.data_dir);
        assert!(config.data_dir.exists());
        assert!(config.logs_dir.exists());
        assert!(config.data_dir.join("backchannel.sqlite").exists());
    }

    #[tokio::test]
    async fn test_initialize_twice_with_same_config() {
        let (config, _data_temp, _logs_temp) = create_test_config();

        Backchannel::initialize(config.clone()).await.unwrap();
        let second = Backchannel::initialize(config).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_debug_format_redacts_database() {
        let backchannel = test_utils::test_backchannel().await;

        let debug_str = format!("{:?}", backchannel);
        assert!(debug_str.contains("Backchannel"));
        assert!(debug_str.contains("<REDACTED>"));
    }
}
