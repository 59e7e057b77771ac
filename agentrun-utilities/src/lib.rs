pub mod logger;
pub mod startup;

pub use logger::LogSettings;
pub use startup::startup;
