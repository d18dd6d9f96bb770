use std::sync::Arc;

use sweetshop_infra::ShopConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sweetshop_observability::init();

    let config = ShopConfig::from_env()?;
    let services = sweetshop_api::app::services::build_services(&config).await?;
    let app = sweetshop_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
