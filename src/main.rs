use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tribe_backend::{
    AppState,
    accounts::PgAccountStore,
    config::{ActivityBackend, Config},
    middleware::RateLimiter,
    router::create_router,
    session::{ActivityThrottle, MemoryActivityThrottle, RedisActivityThrottle},
    token::SystemClock,
};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Arc::new(Config::from_env().expect("Failed to load configuration"));

    if config.debug {
        tracing::warn!("APP_DEBUG is set: session cookies are sent without Secure, CORS is permissive");
    }

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'tribe_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // 设置 Redis 客户端
    let redis = Arc::new(
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client"),
    );

    // 最后活跃时间节流，默认进程内存
    let throttle: Arc<dyn ActivityThrottle> = match config.last_seen_backend {
        ActivityBackend::Memory => {
            Arc::new(MemoryActivityThrottle::new(config.last_seen_throttle_secs))
        }
        ActivityBackend::Redis => Arc::new(RedisActivityThrottle::new(
            redis.clone(),
            config.last_seen_throttle_secs,
        )),
    };

    // 设置应用状态
    let state = AppState::new(
        config.clone(),
        Arc::new(PgAccountStore::new(pool)),
        throttle,
        Arc::new(SystemClock),
    )
    .expect("Failed to build application state");

    // 设置限流器
    let rate_limiter = Arc::new(RateLimiter::new(redis, config.clone()));

    let router = create_router(state, Some(rate_limiter));

    // 调试模式下允许跨域
    let app = if config.debug {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
    } else {
        router
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
