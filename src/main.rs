use flight_booking_saga::adapter::driven::{
    HttpInventoryGateway, MySqlBookingRepository, MySqlFlightInventory, SystemClock,
};
use flight_booking_saga::adapter::driver::inventory_api::{create_inventory_router, InventoryState};
use flight_booking_saga::adapter::driver::rest_api::{create_router, AppState};
use flight_booking_saga::adapter::{DatabaseConfig, DatabaseMigration, InventoryMode, ServiceConfig};
use flight_booking_saga::application::service::{BookingSagaCoordinator, TicketQueryService};
use flight_booking_saga::domain::cancellation::CancellationPolicy;
use flight_booking_saga::domain::port::{BookingRepository, InventoryGateway};

use axum::Router;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== 航空券予約サービス REST API ===");

    let service_config = ServiceConfig::from_env()?;
    let config = DatabaseConfig::from_env()?;
    info!(
        host = %config.host,
        port = config.port,
        url_override = config.url.is_some(),
        "データベース設定を読み込みました"
    );

    // 接続プールを作成
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.connection_string())
        .await?;

    // マイグレーションを実行
    DatabaseMigration::new(pool.clone()).run().await?;
    info!("データベースマイグレーションを実行しました");

    let booking_repository: Arc<dyn BookingRepository> =
        Arc::new(MySqlBookingRepository::new(pool.clone()));

    // 座席在庫の配置に応じてゲートウェイを選ぶ
    // ローカルの場合は座席在庫APIも同じサーバーで提供する
    let (inventory, inventory_router): (Arc<dyn InventoryGateway>, Option<Router>) =
        match &service_config.inventory_mode {
            InventoryMode::Local => {
                let local = Arc::new(MySqlFlightInventory::new(pool.clone()));
                let router = create_inventory_router().with_state(InventoryState {
                    inventory: local.clone(),
                    clock: Arc::new(SystemClock),
                });
                info!("座席在庫: ローカル（同一データベース）");
                let gateway: Arc<dyn InventoryGateway> = local;
                (gateway, Some(router))
            }
            InventoryMode::Remote { base_url } => {
                let remote =
                    HttpInventoryGateway::new(base_url, service_config.inventory_timeout)?;
                info!(url = %base_url, "座席在庫: リモート");
                let gateway: Arc<dyn InventoryGateway> = Arc::new(remote);
                (gateway, None)
            }
        };

    let policy = CancellationPolicy::new(service_config.cancellation_window_hours)?;
    let coordinator = BookingSagaCoordinator::new(
        booking_repository.clone(),
        inventory.clone(),
        Arc::new(SystemClock),
        policy,
    );
    let tickets = TicketQueryService::new(booking_repository, inventory);

    // アプリケーション状態を作成
    let app_state = AppState {
        coordinator: Arc::new(coordinator),
        tickets: Arc::new(tickets),
    };

    // REST APIルーターを作成
    let mut app = create_router().with_state(app_state);
    if let Some(router) = inventory_router {
        app = app.merge(router);
    }
    let app = app.layer(CorsLayer::permissive());

    // サーバーを起動
    let address = format!("0.0.0.0:{}", service_config.server_port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, window_hours = policy.window_hours(), "REST APIサーバーが起動しました");

    axum::serve(listener, app).await?;

    Ok(())
}
