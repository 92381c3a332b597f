use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use lensforge::config::AppConfig;
use lensforge::routes::{configure_routes, json_config};
use lensforge::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let state = AppState::from_config(&config).map_err(|e| {
        log::error!("Failed to assemble pipeline: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    if config.preload_models {
        if let Err(e) = state.warm_up() {
            log::error!("Failed to preload models at startup: {}", e);
            return Err(std::io::Error::other(format!("Model loading failed: {}", e)));
        }
    } else {
        log::info!("Model preloading disabled; models load on first request");
    }

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let body_limit = config.server.max_body_bytes;

    log::info!(
        "LensForge listening on {} (device={}, batch max={})",
        bind_address, config.device, config.batch.max_items
    );

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(["GET", "POST"])
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(web::Data::new(state.clone()))
            .app_data(json_config(body_limit))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
