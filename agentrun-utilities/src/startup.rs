use std::env;
use log::info;
use agentrun_models::errors::SendableError;
use crate::logger::{self, LogSettings, print_env};

pub fn startup(name: &str, log_settings: &LogSettings) -> Result<(), SendableError> {
    if env::var_os("RUST_BACKTRACE").is_none() {
        unsafe {
            env::set_var("RUST_BACKTRACE", "1");
        }
    }
    logger::setup_logger(log_settings)?;
    log_panics::init();

    info!("--- {} ---", name);
    print_env()?;

    Ok(())
}
