/// EasyDash Server
///
/// Loads the Superstore workbook and the purchase CSV once, then serves the
/// dashboard UI, the JSON API and the WebSocket endpoint.

use easydash::config::DashConfig;
use easydash::server::run_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = DashConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    run_server(config).await
}
