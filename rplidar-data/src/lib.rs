pub mod device_info;
pub mod health;
pub mod scan;

pub use device_info::DeviceInfo;
pub use health::{HealthState, HealthStatus};
pub use scan::{Revolution, ScanSample};
