pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod permit;
pub mod relay;
pub mod resolver;
pub mod server;
pub mod streaming;

// Convenient re-exports
pub use models::{AddressQuery, LocationResult, PermitInfoState, PermitQuery};
pub use orchestrator::PermitClient;
pub use permit::PermitQueryStreamer;
pub use resolver::AddressResolver;
pub use server::{build_router, AppState};
