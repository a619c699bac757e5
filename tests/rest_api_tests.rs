use flight_booking_saga::adapter::driven::{
    FixedClock, HttpInventoryGateway, InMemoryBookingRepository, InMemoryFlightInventory,
};
use flight_booking_saga::adapter::driver::inventory_api::{create_inventory_router, InventoryState};
use flight_booking_saga::adapter::driver::response_dto::{
    ApiEnvelope, BookingConfirmationResponse, BookingSummaryResponse, CancellationResponse,
    FlightResponse, TicketResponse,
};
use flight_booking_saga::adapter::driver::rest_api::{create_router, ApiError, AppState};
use flight_booking_saga::application::service::{BookingSagaCoordinator, TicketQueryService};
use flight_booking_saga::domain::cancellation::CancellationPolicy;
use flight_booking_saga::domain::model::{FlightId, SeatNumber};
use flight_booking_saga::domain::port::{Clock, InventoryError, InventoryGateway};
use flight_booking_saga::domain::reference::ReferenceGenerator;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use axum_test::{TestResponse, TestServer};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn departure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 4, 20, 7, 15, 0).unwrap()
}

fn flight_body(total_seats: u32) -> Value {
    json!({
        "flight_number": "ai 865",
        "airline_name": "Air India",
        "aircraft_type": "A320neo",
        "origin": "DEL",
        "destination": "BOM",
        "departure": departure(),
        "arrival": departure() + Duration::minutes(135),
        "total_seats": total_seats,
        "base_fare": 1000
    })
}

fn booking_body(flight_id: FlightId, seats: &[&str]) -> Value {
    let passengers: Vec<Value> = seats
        .iter()
        .map(|seat| {
            json!({
                "name": format!("Passenger {}", seat),
                "gender": "male",
                "age": 41,
                "seat_number": seat,
                "meal_preference": "non_veg"
            })
        })
        .collect();
    json!({
        "flight_id": flight_id,
        "contact_name": "Arjun Rao",
        "contact_email": "Arjun@Example.com",
        "passengers": passengers,
        "seat_numbers": seats
    })
}

// 予約APIと座席在庫APIを同じサーバーで提供するアプリケーション
fn app(inventory: Arc<InMemoryFlightInventory>, clock: Arc<FixedClock>) -> Router {
    let repository = Arc::new(InMemoryBookingRepository::new());
    let coordinator = BookingSagaCoordinator::with_reference_generator(
        repository.clone(),
        inventory.clone(),
        clock.clone(),
        CancellationPolicy::default(),
        ReferenceGenerator::seeded(7),
    );
    let tickets = TicketQueryService::new(repository, inventory.clone());

    create_router()
        .with_state(AppState {
            coordinator: Arc::new(coordinator),
            tickets: Arc::new(tickets),
        })
        .merge(create_inventory_router().with_state(InventoryState { inventory, clock }))
}

fn test_server() -> (TestServer, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(departure() - Duration::days(10)));
    let server = TestServer::new(app(Arc::new(InMemoryFlightInventory::new()), clock.clone()))
        .unwrap();
    (server, clock)
}

async fn register_flight(server: &TestServer, total_seats: u32) -> FlightId {
    let response = server.post("/flights").json(&flight_body(total_seats)).await;
    response.assert_status(StatusCode::CREATED);
    let envelope: ApiEnvelope<FlightResponse> = response.json();
    assert!(envelope.success);
    envelope.data.unwrap().flight_id
}

#[tokio::test]
async fn test_health_check() {
    let clock = Arc::new(FixedClock::new(departure()));
    let app = app(Arc::new(InMemoryFlightInventory::new()), clock);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_register_and_get_flight() {
    let (server, _) = test_server();
    let flight_id = register_flight(&server, 12).await;

    let response = server.get(&format!("/flights/{}", flight_id)).await;
    response.assert_status_ok();
    let flight = response.json::<ApiEnvelope<FlightResponse>>().data.unwrap();

    assert_eq!(flight.flight_number, "AI 865");
    assert_eq!(flight.total_seats, 12);
    assert_eq!(flight.available_seats, 12);
    assert_eq!(flight.duration, "2h 15m");
    assert_eq!(flight.currency, "INR");
    assert_eq!(flight.seats.unwrap().len(), 12);
}

#[tokio::test]
async fn test_inventory_api_errors() {
    let (server, _) = test_server();
    let flight_id = register_flight(&server, 6).await;

    let response = server
        .put(&format!("/flights/{}/seats/reserve", flight_id))
        .json(&json!(["1A"]))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<ApiEnvelope<FlightResponse>>().data.unwrap().available_seats,
        5
    );

    // 確保済みの座席
    let response = server
        .put(&format!("/flights/{}/seats/reserve", flight_id))
        .json(&json!(["1A", "1B"]))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let envelope: ApiEnvelope<FlightResponse> = response.json();
    assert!(!envelope.success);
    assert_eq!(envelope.error_code.as_deref(), Some("SEATS_UNAVAILABLE"));
    assert_eq!(envelope.unavailable_seats, Some(vec!["1A".to_string()]));

    // 空の座席一覧
    let response = server
        .put(&format!("/flights/{}/seats/release", flight_id))
        .json(&json!([]))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let envelope: ApiEnvelope<FlightResponse> = response.json();
    assert_eq!(envelope.error_code.as_deref(), Some("INVALID_REQUEST"));

    // 存在しない便と不正な便ID
    let response = server.get(&format!("/flights/{}", FlightId::new())).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let envelope: ApiEnvelope<FlightResponse> = response.json();
    assert_eq!(envelope.error_code.as_deref(), Some("NOT_FOUND"));

    let response = server.get("/flights/not-a-flight").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

async fn search(server: &TestServer, body: Value) -> TestResponse {
    server.post("/flights/search").json(&body).await
}

#[tokio::test]
async fn test_search_flights() {
    let (server, _) = test_server();
    let flight_id = register_flight(&server, 12).await;

    let response = search(&server, json!({
        "origin": "del",
        "destination": "BOM",
        "departure_date": "2030-04-20",
        "passengers": 2
    }))
    .await;
    response.assert_status_ok();
    let found = response.json::<ApiEnvelope<Vec<FlightResponse>>>().data.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].flight_id, flight_id);
    assert_eq!(found[0].available_seats, 12);
    assert!(found[0].seats.is_none());

    // 別の日は該当なし
    let response = search(&server, json!({
        "origin": "DEL", "destination": "BOM", "departure_date": "2030-04-21"
    }))
    .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let envelope: ApiEnvelope<Vec<FlightResponse>> = response.json();
    assert_eq!(envelope.error_code.as_deref(), Some("NOT_FOUND"));

    // 12席はすべてビジネスクラス
    let response = search(&server, json!({
        "origin": "DEL", "destination": "BOM", "departure_date": "2030-04-20",
        "cabin_class": "economy"
    }))
    .await;
    response.assert_status(StatusCode::NOT_FOUND);

    // 過去の日付、同じ空港、人数の範囲外
    for body in [
        json!({"origin": "DEL", "destination": "BOM", "departure_date": "2030-04-01"}),
        json!({"origin": "DEL", "destination": "del", "departure_date": "2030-04-20"}),
        json!({"origin": "DEL", "destination": "BOM", "departure_date": "2030-04-20", "passengers": 10}),
    ] {
        let response = search(&server, body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let envelope: ApiEnvelope<Vec<FlightResponse>> = response.json();
        assert_eq!(envelope.error_code.as_deref(), Some("INVALID_REQUEST"));
    }
}

#[tokio::test]
async fn test_register_flight_rejects_out_of_range_fare() {
    let (server, _) = test_server();
    let mut body = flight_body(12);
    body["base_fare"] = json!(i64::MAX / 50);

    let response = server.post("/flights").json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let envelope: ApiEnvelope<FlightResponse> = response.json();
    assert_eq!(envelope.error_code.as_deref(), Some("INVALID_REQUEST"));
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let (server, clock) = test_server();
    let flight_id = register_flight(&server, 30).await;

    // 4B はエコノミー中央席で追加料金なし、4A は窓側で +200
    let response = server
        .post("/bookings")
        .json(&booking_body(flight_id, &["4A", "4B"]))
        .await;
    response.assert_status(StatusCode::CREATED);
    let confirmation: BookingConfirmationResponse = response.json();
    assert_eq!(confirmation.status, "CONFIRMED");
    assert_eq!(confirmation.total_fare, 2200);
    assert_eq!(confirmation.currency, "INR");
    assert!(!confirmation.fare_estimated);
    assert_eq!(confirmation.passengers.len(), 2);
    assert_eq!(confirmation.passengers[0].meal_preference, "NON_VEG");

    // 同じ座席の予約は競合
    let response = server
        .post("/bookings")
        .json(&booking_body(flight_id, &["4B"]))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let error: ApiError = response.json();
    assert_eq!(error.code, "CONFLICT");
    assert_eq!(error.unavailable_seats, Some(vec!["4B".to_string()]));

    // チケット
    let response = server
        .get(&format!("/bookings/{}", confirmation.reference))
        .await;
    response.assert_status_ok();
    let ticket: TicketResponse = response.json();
    assert_eq!(ticket.status, "CONFIRMED");
    assert_eq!(ticket.booking.contact_email, "arjun@example.com");
    assert_eq!(ticket.fare.base_fare, 2000);
    assert_eq!(ticket.fare.seat_charges, 200);
    assert_eq!(ticket.flight.unwrap().origin, "DEL");

    // 予約履歴（メールアドレスは大文字小文字を区別しない）
    let response = server.get("/bookings/history/ARJUN@example.com").await;
    response.assert_status_ok();
    let history: Vec<BookingSummaryResponse> = response.json();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].seat_numbers, vec!["4A".to_string(), "4B".to_string()]);

    // 出発10日前のキャンセルは全額払い戻し
    let response = server
        .post(&format!("/bookings/{}/cancel", confirmation.reference))
        .json(&json!({ "reason": "meeting moved" }))
        .await;
    response.assert_status_ok();
    let cancellation: CancellationResponse = response.json();
    assert_eq!(cancellation.refund_amount, 2200);
    assert_eq!(cancellation.refund_percentage, 100);
    assert_eq!(cancellation.reason, "meeting moved");
    assert_eq!(cancellation.cancelled_at, clock.now());

    let response = server.get(&format!("/flights/{}", flight_id)).await;
    assert_eq!(
        response.json::<ApiEnvelope<FlightResponse>>().data.unwrap().available_seats,
        30
    );

    // 2回目のキャンセル
    let response = server
        .post(&format!("/bookings/{}/cancel", confirmation.reference))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let error: ApiError = response.json();
    assert_eq!(error.code, "INVALID_CANCELLATION");
}

#[tokio::test]
async fn test_late_cancellation_is_rejected() {
    let (server, clock) = test_server();
    let flight_id = register_flight(&server, 12).await;
    let confirmation: BookingConfirmationResponse = server
        .post("/bookings")
        .json(&booking_body(flight_id, &["2C"]))
        .await
        .json();

    clock.set(departure() - Duration::hours(10));
    let response = server
        .post(&format!("/bookings/{}/cancel", confirmation.reference))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let ticket: TicketResponse = server
        .get(&format!("/bookings/{}", confirmation.reference))
        .await
        .json();
    assert_eq!(ticket.status, "CONFIRMED");
}

#[tokio::test]
async fn test_booking_request_errors() {
    let (server, _) = test_server();
    let flight_id = register_flight(&server, 12).await;

    // 不正な座席番号
    let response = server
        .post("/bookings")
        .json(&booking_body(flight_id, &["Z9"]))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ApiError>().code, "INVALID_REQUEST");

    // 範囲外の年齢
    let mut body = booking_body(flight_id, &["1A"]);
    body["passengers"][0]["age"] = json!(150);
    let response = server.post("/bookings").json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // 存在しない便
    let response = server
        .post("/bookings")
        .json(&booking_body(FlightId::new(), &["1A"]))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    // 存在しない予約番号
    let response = server.get("/bookings/PNRZZZZZZ").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let response = server.post("/bookings/garbage/cancel").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

// 座席在庫APIを実際のポートで起動し、HTTPゲートウェイから操作する
async fn spawn_inventory_service() -> String {
    let inventory = Arc::new(InMemoryFlightInventory::new());
    let clock = Arc::new(FixedClock::new(departure() - Duration::days(3)));
    let router = create_inventory_router().with_state(InventoryState { inventory, clock });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", address)
}

async fn register_remote_flight(base_url: &str, total_seats: u32) -> FlightId {
    let response = reqwest::Client::new()
        .post(format!("{}flights", base_url))
        .json(&flight_body(total_seats))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let envelope: ApiEnvelope<FlightResponse> = response.json().await.unwrap();
    envelope.data.unwrap().flight_id
}

fn seats(numbers: &[&str]) -> Vec<SeatNumber> {
    numbers.iter().map(|n| SeatNumber::parse(n).unwrap()).collect()
}

#[tokio::test]
async fn test_http_gateway_against_inventory_service() {
    let base_url = spawn_inventory_service().await;
    let flight_id = register_remote_flight(&base_url, 12).await;
    let gateway = HttpInventoryGateway::new(&base_url, std::time::Duration::from_secs(5)).unwrap();

    let snapshot = gateway.get_snapshot(flight_id).await.unwrap();
    assert_eq!(snapshot.available_seats, 12);
    assert!(snapshot.has_seat_detail());
    assert_eq!(snapshot.route.to_string(), "DEL-BOM");

    gateway.reserve(flight_id, &seats(&["1A", "1B"])).await.unwrap();
    assert_eq!(
        gateway.reserve(flight_id, &seats(&["1B", "1C"])).await,
        Err(InventoryError::SeatsUnavailable(vec!["1B".to_string()]))
    );
    assert_eq!(gateway.get_snapshot(flight_id).await.unwrap().available_seats, 10);

    gateway.release(flight_id, &seats(&["1A"])).await.unwrap();
    assert_eq!(gateway.get_snapshot(flight_id).await.unwrap().available_seats, 11);

    let unknown = FlightId::new();
    assert_eq!(
        gateway.get_snapshot(unknown).await,
        Err(InventoryError::FlightNotFound(unknown))
    );
}

#[tokio::test]
async fn test_booking_saga_with_remote_inventory() {
    let base_url = spawn_inventory_service().await;
    let flight_id = register_remote_flight(&base_url, 12).await;
    let gateway: Arc<dyn InventoryGateway> = Arc::new(
        HttpInventoryGateway::new(&base_url, std::time::Duration::from_secs(5)).unwrap(),
    );

    let repository = Arc::new(InMemoryBookingRepository::new());
    let clock = Arc::new(FixedClock::new(departure() - Duration::days(3)));
    let coordinator = BookingSagaCoordinator::new(
        repository.clone(),
        gateway.clone(),
        clock,
        CancellationPolicy::default(),
    );
    let server = TestServer::new(create_router().with_state(AppState {
        coordinator: Arc::new(coordinator),
        tickets: Arc::new(TicketQueryService::new(repository, gateway.clone())),
    }))
    .unwrap();

    let response = server
        .post("/bookings")
        .json(&booking_body(flight_id, &["2B"]))
        .await;
    response.assert_status(StatusCode::CREATED);
    let confirmation: BookingConfirmationResponse = response.json();
    assert_eq!(gateway.get_snapshot(flight_id).await.unwrap().available_seats, 11);

    let response = server
        .post(&format!("/bookings/{}/cancel", confirmation.reference))
        .await;
    response.assert_status_ok();
    // 出発72時間前は全額払い戻し
    assert_eq!(response.json::<CancellationResponse>().refund_percentage, 100);
    assert_eq!(gateway.get_snapshot(flight_id).await.unwrap().available_seats, 12);
}
