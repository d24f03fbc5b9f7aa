use std::net::TcpListener;

use locate_this::configuration::get_configuration;
use locate_this::database;
use locate_this::startup::run;
use locate_this::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read configuration");
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let pool = database::connect(&configuration.database)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create connection pool");
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    database::migrate(&pool).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to migrate database");
        std::io::Error::new(std::io::ErrorKind::Other, "Database migration error")
    })?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    let server = run(listener, pool, &configuration)?;
    server.await
}
