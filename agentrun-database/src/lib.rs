use std::sync::Arc;

use agentrun_models::errors::SendableError;
use interfaces::DatabaseImpl;
use log::info;

pub mod interfaces;
pub mod mappers;
pub mod postgres;
pub mod sqlite;

pub async fn initialize_database(
    pool: &Arc<impl DatabaseImpl>,
    scripts: &[String],
) -> Result<(), SendableError> {
    info!("Run init scripts");
    pool.run_init_scripts(scripts).await?;
    Ok(())
}
