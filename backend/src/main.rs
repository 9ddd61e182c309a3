mod classifier;
mod config;
mod routes;

use actix_web::{middleware::Logger, web, App, HttpServer};
use classifier::{Predictor, Preprocessor, TorchModel};
use config::ServiceConfig;
use routes::{configure_routes, cors_policy, UploadLimit};
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = ServiceConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration failed: {}", e))
    })?;

    log::info!(
        "Loading model {} ({:?}, {:?} output, {:?} layout, {:?} scaling)",
        config.model.path.display(),
        config.model.device,
        config.model.output,
        config.image.layout,
        config.image.preprocessing.pixel_scaling
    );
    let model = TorchModel::load(&config.model, config.image.layout).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;
    log::info!("Model loaded on {:?}", model.device());

    let predictor = Predictor::new(Arc::new(model), Preprocessor::from_config(&config.image));
    predictor.warm_up().map_err(|e| {
        log::error!("Model failed the startup probe: {}", e);
        std::io::Error::other(format!("Model probe failed: {}", e))
    })?;

    let predictor = web::Data::new(predictor);
    let upload_limit = web::Data::new(UploadLimit::new(config.server.max_upload_bytes));

    let static_dir = config.server.static_dir.clone().filter(|dir| {
        let exists = dir.is_dir();
        if !exists {
            log::warn!("Static directory {} not found, web client disabled", dir.display());
        }
        exists
    });

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors_policy())
            .app_data(predictor.clone())
            .app_data(upload_limit.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
