use axum::{routing::{get, post}, Router};
use catalog_match_rust::{
    api, create_pool, ensure_schema, AppConfig, MatchingEngine, PgCatalogRepository,
    PgLineUpdateSink,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池并建表
    let pool = create_pool(&config.database).await?;
    ensure_schema(&pool).await?;
    info!("Database pool created");

    let engine = MatchingEngine::new(
        Arc::new(PgCatalogRepository::new(pool.clone())),
        Arc::new(PgLineUpdateSink::new(pool)),
        config.matching.clone(),
    );
    let state = api::AppState {
        engine: Arc::new(engine),
    };

    // 构建路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route(
            "/api/tenants/:tenant_id/invoices/import",
            post(api::import_invoices),
        )
        .route(
            "/api/tenants/:tenant_id/catalog/similar",
            post(api::similar_products),
        )
        .route(
            "/api/tenants/:tenant_id/catalog/duplicates",
            get(api::duplicate_groups),
        )
        .with_state(state)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/tenants/:tenant_id/invoices/import   - 导入发票并匹配");
    info!("  POST /api/tenants/:tenant_id/catalog/similar   - 相似商品查询");
    info!("  GET  /api/tenants/:tenant_id/catalog/duplicates - 疑似重复条目");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
