use std::time::Duration;

use crate::{
    backend::AppointmentBackend, booking_service::BookingService, configuration::Configuration,
    configuration_handler::ConfigurationHandler, contact::ContactService,
    database_interface::DatabaseInterface, http::create_app, local_appointments::LocalAppointments,
};
use anyhow::Context;
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod backend;
mod booking_service;
mod clock;
mod configuration;
mod configuration_handler;
mod contact;
mod database_interface;
mod error;
mod http;
mod local_appointments;
mod messages;
mod notifier;
mod schema;
mod slot_generator;
mod staff_directory;
#[cfg(test)]
mod testutils;
mod types;

#[derive(Clone)]
pub struct AppState<B: AppointmentBackend> {
    pub booking_service: BookingService<B>,
    pub contact_service: ContactService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appointment_manager=info,tower_http=info".into()),
        )
        .init();

    let configuration = ConfigurationHandler::parse_arguments();
    info!(site = %configuration.site_name(), "Starting appointment manager");

    let address = format!("{}:{}", configuration.host(), configuration.port());
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {address}"))?;
    info!("Accessible at {address}");

    let app = if let Some(database_url) = configuration.database_url() {
        let backend = loop {
            match DatabaseInterface::new(&database_url) {
                Ok(backend) => {
                    info!("Successfully connected to database");
                    break backend;
                }
                Err(err) => {
                    error!(%err, "Failed to set up the appointment database. Retry in 1 sec.");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        };
        create_app(backend, &configuration)
    } else {
        warn!("DATABASE_URL not set, appointments are kept in memory only");
        create_app(LocalAppointments::default(), &configuration)
    };
    let app = app.context("Failed to configure email delivery")?;

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;
    Ok(())
}
