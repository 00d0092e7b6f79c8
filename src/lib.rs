pub mod backend;
pub mod config;
pub mod error;
pub mod relay;
pub mod routes;

pub use config::{AppConfig, HttpConfig, Polarity, RelayConfig, Topology};
pub use error::{AppError, HardwareFault};
pub use relay::{GpioBackend, RelayDriver, RelayState};
pub use routes::AppState;

#[cfg(feature = "hardware-gpio")]
pub use backend::LibgpiodBackend;
pub use backend::MockGpioBackend;
