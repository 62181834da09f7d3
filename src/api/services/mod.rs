pub mod detect;
pub mod frontend;
pub mod health;

pub use detect::{DetectResponse, DetectService, detect_routes};
pub use frontend::{FrontendService, frontend_routes};
pub use health::{AppStartTime, HealthService, health_routes};
