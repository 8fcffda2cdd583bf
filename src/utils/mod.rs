pub mod run_logger;

pub use run_logger::RunLogger;
