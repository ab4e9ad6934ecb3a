use std::time::Duration;

use blog_api::{
    App,
    config::{Env, ServerConfig},
    router,
};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
};
use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    // logging comes up before the config so missing variables get reported
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("blog_api=debug,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match Env::from_env() {
        Env::Production => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        Env::Dev | Env::Staging => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    let config = ServerConfig::new_from_env();

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let diesel = Pool::builder(manager)
        .max_size(10)
        .runtime(deadpool_runtime::Runtime::Tokio1)
        .wait_timeout(Some(Duration::from_secs(10)))
        .recycle_timeout(Some(Duration::from_secs(120)))
        .build()?;

    let listen_addr = config.listen_addr;
    let app = router(App::new(config, diesel));

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
