pub mod config;
pub mod errors;
pub mod http;
pub mod metrics_defs;
pub mod service;

use errors::SiteError;
use service::SiteService;
use shared::admin_service::{AdminService, Readiness};
use shared::http::run_http_service;

/// Serves the site and the admin listener until either fails.
pub async fn run(config: config::Config) -> Result<(), SiteError> {
    let site_service = SiteService::from_config(&config)?;
    let readiness = Readiness::new();
    let admin_service = AdminService::new(readiness.clone());

    let site_task = run_http_service::<_, _, SiteError>(
        &config.listener.host,
        config.listener.port,
        site_service,
    );
    let admin_task = run_http_service::<_, _, SiteError>(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tracing::info!(
        renderer = %config.renderer.url,
        environment = config.environment.as_str(),
        "starting site"
    );
    readiness.mark_ready();
    tokio::try_join!(site_task, admin_task)?;

    Ok(())
}
