use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use log::info;

use relayd::{AppConfig, AppState, RelayDriver};

#[cfg(feature = "hardware-gpio")]
use relayd::LibgpiodBackend;
#[cfg(not(feature = "hardware-gpio"))]
use relayd::MockGpioBackend;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = AppConfig::from_env().unwrap_or_else(|e| panic!("Failed to load config: {e}"));

    let backend = {
        #[cfg(feature = "hardware-gpio")]
        {
            Arc::new(
                LibgpiodBackend::new(&config.relay.chip, config.relay.line)
                    .unwrap_or_else(|e| panic!("Failed to init libgpiod backend: {e}")),
            )
        }
        #[cfg(not(feature = "hardware-gpio"))]
        {
            Arc::new(MockGpioBackend::default())
        }
    };

    let driver = Arc::new(RelayDriver::new(
        config.relay.topology,
        config.relay.polarity,
        backend,
    ));
    driver
        .init_safe()
        .unwrap_or_else(|e| panic!("Failed to force relay off at startup: {e}"));

    let app_state = AppState {
        driver: Arc::clone(&driver),
    };
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .service(app_state.api_scope())
    });

    let bind_addr = format!("{}:{}", config.http.host, config.http.port);
    info!(
        "Relay API listening on {bind_addr} | chip={} line={} topology={:?} polarity={:?}",
        config.relay.chip, config.relay.line, config.relay.topology, config.relay.polarity
    );

    let result = server.bind(&bind_addr)?.run().await;

    // run() returns once actix has drained SIGINT/SIGTERM, so the line is
    // forced off and released on every orderly exit path
    driver.shutdown();

    result
}
