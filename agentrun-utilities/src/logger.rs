use std::{env, path::PathBuf, time::SystemTime};
use log::{LevelFilter, info};
use agentrun_models::errors::SendableError;

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// Also write to this file when set.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file: Some(PathBuf::from("agentrun.log")),
        }
    }
}

fn dispatch(settings: &LogSettings) -> fern::Dispatch {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(settings.level)
        // connection chatter from the HTTP stack
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
}

pub fn setup_logger(settings: &LogSettings) -> Result<(), SendableError> {
    let mut dispatch = dispatch(settings).chain(std::io::stdout());
    if let Some(path) = &settings.file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }
    dispatch.apply()?;
    Ok(())
}

pub fn print_env() -> std::io::Result<()> {
    let path = env::current_dir()?;
    info!("The current directory is {}", path.display());
    Ok(())
}
