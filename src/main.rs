mod audit;
mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod permissions;
mod state;
mod utils;

use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use log::{info, warn};
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::memory::MemoryStore;
use crate::db::postgres::PgStore;
use crate::db::seed::{apply_seed, ensure_admin, load_seed};
use crate::db::RecordStore;
use crate::state::AppState;

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

async fn open_store(config: &Config) -> io::Result<Arc<dyn RecordStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await.map_err(startup_error)?;
            let store = PgStore::connect(pool).await.map_err(startup_error)?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, records are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Seeds an empty store and makes sure the bootstrap admin exists.
async fn prepare_store(store: &dyn RecordStore, config: &Config) -> io::Result<()> {
    if let Some(path) = &config.seed_path {
        if store.is_empty().await.map_err(startup_error)? {
            if let Some(seed) = load_seed(Path::new(path)) {
                let inserted = apply_seed(store, seed).await.map_err(startup_error)?;
                info!("Seeded {} records from {}", inserted, path);
            }
        }
    }
    if let Some(admin) = &config.admin {
        ensure_admin(store, admin).await.map_err(startup_error)?;
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(startup_error)?;
    let store = open_store(&config).await?;
    prepare_store(store.as_ref(), &config).await?;

    let (host, port) = config.bind_address();
    info!("Starting server at {}:{} ({} store)", host, port, store.backend_name());

    let state = web::Data::new(AppState::new(store, config));

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
