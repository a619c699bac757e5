use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::adapter::driver::request_dto::{CreateFlightRequest, FlightSearchRequest};
use crate::adapter::driver::response_dto::{error_code, ApiEnvelope, FlightResponse};
use crate::domain::model::{Flight, FlightId, SeatNumber};
use crate::domain::port::{Clock, FlightInventory, InventoryError};

type EnvelopeResult<T> = (StatusCode, Json<ApiEnvelope<T>>);

/// 座席在庫APIの状態
#[derive(Clone)]
pub struct InventoryState {
    pub inventory: Arc<dyn FlightInventory>,
    pub clock: Arc<dyn Clock>,
}

// 座席在庫APIルーターを作成
pub fn create_inventory_router() -> Router<InventoryState> {
    Router::new()
        .route("/flights", post(create_flight))
        .route("/flights/search", post(search_flights))
        .route("/flights/:flight_id", get(get_flight))
        .route("/flights/:flight_id/seats/reserve", put(reserve_seats))
        .route("/flights/:flight_id/seats/release", put(release_seats))
}

// 便取得エンドポイント
async fn get_flight(
    State(state): State<InventoryState>,
    Path(flight_id): Path<String>,
) -> EnvelopeResult<FlightResponse> {
    let flight_id = match parse_flight_id(&flight_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.inventory.get_snapshot(flight_id).await {
        Ok(snapshot) => ok(StatusCode::OK, FlightResponse::from_snapshot(&snapshot)),
        Err(err) => map_inventory_error(err),
    }
}

// 座席確保エンドポイント（ボディは座席番号の配列）
async fn reserve_seats(
    State(state): State<InventoryState>,
    Path(flight_id): Path<String>,
    Json(seats): Json<Vec<String>>,
) -> EnvelopeResult<FlightResponse> {
    update_seats(state, flight_id, seats, true).await
}

// 座席解放エンドポイント（ボディは座席番号の配列）
async fn release_seats(
    State(state): State<InventoryState>,
    Path(flight_id): Path<String>,
    Json(seats): Json<Vec<String>>,
) -> EnvelopeResult<FlightResponse> {
    update_seats(state, flight_id, seats, false).await
}

async fn update_seats(
    state: InventoryState,
    flight_id: String,
    seats: Vec<String>,
    reserve: bool,
) -> EnvelopeResult<FlightResponse> {
    let flight_id = match parse_flight_id(&flight_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let seat_numbers = match seats
        .iter()
        .map(|seat| SeatNumber::parse(seat))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(numbers) if !numbers.is_empty() => numbers,
        Ok(_) => return invalid_request("座席番号を1つ以上指定してください".to_string()),
        Err(err) => return invalid_request(err.to_string()),
    };

    let result = if reserve {
        state.inventory.reserve(flight_id, &seat_numbers).await
    } else {
        state.inventory.release(flight_id, &seat_numbers).await
    };
    if let Err(err) = result {
        return map_inventory_error(err);
    }

    match state.inventory.get_snapshot(flight_id).await {
        Ok(snapshot) => ok(StatusCode::OK, FlightResponse::from_snapshot(&snapshot)),
        Err(err) => map_inventory_error(err),
    }
}

// 便登録エンドポイント（テスト・管理用）
// 座席表は総座席数から生成する
async fn create_flight(
    State(state): State<InventoryState>,
    Json(request): Json<CreateFlightRequest>,
) -> EnvelopeResult<FlightResponse> {
    let flight = match request
        .into_schedule()
        .and_then(|(id, schedule)| Flight::schedule(id, schedule))
    {
        Ok(flight) => flight,
        Err(err) => return invalid_request(err.to_string()),
    };

    match state.inventory.add_flight(flight).await {
        Ok(snapshot) => {
            info!(
                flight_id = %snapshot.flight_id,
                flight_number = %snapshot.flight_number,
                seats = snapshot.total_seats,
                "便を登録しました"
            );
            ok(StatusCode::CREATED, FlightResponse::from_snapshot(&snapshot))
        }
        Err(err) => map_inventory_error(err),
    }
}

// 便検索エンドポイント
// 座席表は含めず、便単位の情報だけを返す
async fn search_flights(
    State(state): State<InventoryState>,
    Json(request): Json<FlightSearchRequest>,
) -> EnvelopeResult<Vec<FlightResponse>> {
    let today = state.clock.now().date_naive();
    let criteria = match request.into_criteria(today) {
        Ok(criteria) => criteria,
        Err(err) => return invalid_request(err.to_string()),
    };

    match state.inventory.search(&criteria).await {
        Ok(found) if found.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(ApiEnvelope::error(
                error_code::NOT_FOUND,
                "条件に合う便が見つかりません".to_string(),
            )),
        ),
        Ok(found) => {
            info!(route = %criteria.route(), found = found.len(), "便を検索しました");
            let flights = found
                .iter()
                .map(|snapshot| FlightResponse {
                    seats: None,
                    ..FlightResponse::from_snapshot(snapshot)
                })
                .collect();
            ok(StatusCode::OK, flights)
        }
        Err(err) => map_inventory_error(err),
    }
}

fn ok<T>(status: StatusCode, data: T) -> EnvelopeResult<T> {
    (status, Json(ApiEnvelope::ok(data)))
}

fn invalid_request<T>(message: String) -> EnvelopeResult<T> {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiEnvelope::error(error_code::INVALID_REQUEST, message)),
    )
}

fn parse_flight_id<T>(value: &str) -> Result<FlightId, EnvelopeResult<T>> {
    FlightId::from_string(value)
        .map_err(|_| invalid_request(format!("無効な便ID形式です: {}", value)))
}

// 在庫エラーを共通レスポンスにマッピング
fn map_inventory_error<T>(err: InventoryError) -> EnvelopeResult<T> {
    let message = err.to_string();
    match err {
        InventoryError::FlightNotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiEnvelope::error(error_code::NOT_FOUND, message)),
        ),
        InventoryError::SeatsUnavailable(seats) => (
            StatusCode::CONFLICT,
            Json(ApiEnvelope::seats_unavailable(message, seats)),
        ),
        InventoryError::InvalidRequest(_) => invalid_request(message),
        InventoryError::Unavailable(_) | InventoryError::Storage(_) => {
            error!(error = %message, "座席在庫の操作に失敗しました");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiEnvelope::error(error_code::SERVICE_UNAVAILABLE, message)),
            )
        }
    }
}
