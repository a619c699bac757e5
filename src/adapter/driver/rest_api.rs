use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::adapter::driver::request_dto::{CancelBookingRequest, CreateBookingRequest};
use crate::adapter::driver::response_dto::{
    BookingConfirmationResponse, BookingSummaryResponse, CancellationResponse, TicketResponse,
};
use crate::application::service::{BookingSagaCoordinator, TicketQueryService};
use crate::application::{ApplicationError, ErrorKind};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    /// 座席が確保できなかった場合の対象座席
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_seats: Option<Vec<String>>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BookingSagaCoordinator>,
    pub tickets: Arc<TicketQueryService>,
}

// 予約APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/bookings", post(create_booking))
        .route("/bookings/history/:email", get(booking_history))
        .route("/bookings/:reference", get(get_ticket))
        .route("/bookings/:reference/cancel", post(cancel_booking))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "flight-booking-saga",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// 予約作成エンドポイント
async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingConfirmationResponse>), (StatusCode, Json<ApiError>)> {
    let request = request.into_booking_request().map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: err.to_string(),
                code: "INVALID_REQUEST".to_string(),
                unavailable_seats: None,
            }),
        )
    })?;

    match state.coordinator.create_booking(request).await {
        Ok(confirmation) => Ok((
            StatusCode::CREATED,
            Json(BookingConfirmationResponse::from_confirmation(&confirmation)),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// チケット取得エンドポイント
async fn get_ticket(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<TicketResponse> {
    match state.tickets.get_ticket(&reference).await {
        Ok(ticket) => Ok(Json(TicketResponse::from_ticket(&ticket))),
        Err(err) => Err(map_application_error(err)),
    }
}

// 予約キャンセルエンドポイント
// ボディは省略できる
async fn cancel_booking(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    request: Option<Json<CancelBookingRequest>>,
) -> ApiResult<CancellationResponse> {
    let reason = request.and_then(|Json(body)| body.reason);

    match state.coordinator.cancel_booking(&reference, reason).await {
        Ok(receipt) => Ok(Json(CancellationResponse::from_receipt(&receipt))),
        Err(err) => Err(map_application_error(err)),
    }
}

// 予約履歴取得エンドポイント
async fn booking_history(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Vec<BookingSummaryResponse>> {
    match state.tickets.booking_history(&email).await {
        Ok(history) => Ok(Json(
            history.iter().map(BookingSummaryResponse::from_summary).collect(),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// エラー種別をHTTPステータスコードとエラーコードにマッピング
fn status_and_code(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
        ErrorKind::InvalidRequest => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        ErrorKind::InvalidCancellation => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_CANCELLATION")
        }
        ErrorKind::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

// アプリケーションエラーをHTTPエラーにマッピング
fn map_application_error(err: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = status_and_code(err.kind());
    if status.is_server_error() {
        error!(code, error = %err, "予約APIの処理に失敗しました");
    }
    (
        status,
        Json(ApiError {
            error: err.to_string(),
            code: code.to_string(),
            unavailable_seats: err.unavailable_seats().map(<[String]>::to_vec),
        }),
    )
}
