pub mod orchestrator;
pub mod throttle;
pub mod window;

pub use orchestrator::WeatherEtl;
pub use throttle::FixedDelay;
pub use window::{yesterday, RunWindow};
