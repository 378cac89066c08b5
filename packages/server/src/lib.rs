#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the unit map application.
//!
//! Serves the units REST API backed by a `SQLite` database, plus the
//! static dashboard files. Reads are open; writes require the admin
//! bearer token when one is configured.

mod handlers;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use std::path::Path;
use std::sync::Arc;
use switchy_database::Database;
use unit_map_database::{DEFAULT_DB_PATH, open_db};

/// Shared application state.
pub struct AppState {
    /// Database connection.
    pub db: Arc<dyn Database>,
    /// Bearer token required for write endpoints. `None` leaves writes
    /// open, matching deployments without a configured token.
    pub admin_token: Option<String>,
}

/// Starts the unit map API server.
///
/// Opens (creating if needed) the units `SQLite` database and starts the
/// Actix-Web HTTP server. This is a regular async function — the caller
/// is responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
///
/// # Panics
///
/// Panics if the database cannot be opened.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let db_path = std::env::var("UNIT_MAP_DB").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    log::info!("Opening units database at {db_path}...");
    let db_conn = open_db(Path::new(&db_path))
        .await
        .expect("Failed to open units database");

    let admin_token = std::env::var("UNIT_MAP_ADMIN_TOKEN")
        .ok()
        .filter(|t| !t.is_empty());
    if admin_token.is_none() {
        log::warn!("UNIT_MAP_ADMIN_TOKEN not set; write endpoints are open");
    }

    let state = web::Data::new(AppState {
        db: Arc::from(db_conn),
        admin_token,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/units", web::get().to(handlers::list_units))
                    .route("/units", web::post().to(handlers::create_unit))
                    .route("/units/bulk", web::post().to(handlers::bulk_upsert))
                    .route("/units/{id}", web::put().to(handlers::update_unit))
                    .route("/units/{id}", web::delete().to(handlers::delete_unit)),
            )
            // Serve the dashboard static files (production)
            .service(Files::new("/", "public").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
