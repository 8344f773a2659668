pub mod app;
pub mod export;
pub mod telemetry;

pub use app::run as run_app;
