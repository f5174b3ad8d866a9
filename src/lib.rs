pub mod api;
pub mod config;
pub mod database_ops;
pub mod error;
pub mod providers;
pub mod refresh;
pub mod telemetry;

pub mod util {
    pub mod env;
}
