// Migration orchestrator
// Migrations are embedded in the binary and applied on startup unless disabled

pub mod diesel;

use std::error::Error;
use tracing::{error, info};

use crate::app_config::AppConfig;

/// Configuration for migration execution
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub database_url: String,
    pub environment: String,
}

impl From<&AppConfig> for MigrationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            database_url: config.database.url.clone(),
            environment: config.environment.to_string(),
        }
    }
}

/// Apply every pending schema migration
pub async fn run_all_migrations(
    config: MigrationConfig,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!(
        "[MIGRATIONS] Starting migration process for environment: {}",
        config.environment
    );

    match diesel::run_migrations(config.database_url).await {
        Ok(0) => info!("[MIGRATIONS] Diesel migrations up to date"),
        Ok(applied_count) => info!("[MIGRATIONS] Applied {} Diesel migrations", applied_count),
        Err(e) => {
            error!("[MIGRATIONS] Diesel migration failed: {}", e);
            return Err(format!("Diesel migration failed: {}", e).into());
        },
    }

    Ok(())
}

/// Embedded migrations run unless DISABLE_EMBEDDED_MIGRATIONS is set
pub fn should_run_migrations(config: &AppConfig) -> bool {
    !config.features.disable_embedded_migrations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_config_skips_migrations() {
        let config = AppConfig::for_test();
        assert!(!should_run_migrations(&config));

        let migration_config = MigrationConfig::from(&config);
        assert_eq!(migration_config.environment, config.environment.to_string());
    }
}
