use crate::adapter::driver::response_dto::{error_code, ApiEnvelope, FlightResponse};
use crate::domain::model::{FlightId, FlightSnapshot, SeatNumber};
use crate::domain::port::{InventoryError, InventoryGateway};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// 別サービスの座席在庫にHTTPで接続するゲートウェイ
///
/// 通信形式:
/// - `GET /flights/{id}`
/// - `PUT /flights/{id}/seats/reserve`（ボディは座席番号のJSON配列）
/// - `PUT /flights/{id}/seats/release`（同上）
///
/// 接続できない場合やタイムアウトは `InventoryError::Unavailable` として返し、再試行はしない
pub struct HttpInventoryGateway {
    client: Client,
    base_url: String,
}

impl HttpInventoryGateway {
    /// 新しいHTTP在庫ゲートウェイを作成
    ///
    /// # Arguments
    /// * `base_url` - 在庫サービスのURL（例: "http://inventory:3001"）
    /// * `timeout` - 1リクエストあたりのタイムアウト
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InventoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::InvalidRequest(format!("HTTPクライアントを作成できません: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn flight_url(&self, flight_id: FlightId) -> String {
        format!("{}/flights/{}", self.base_url, flight_id)
    }

    /// リクエストを送信してレスポンスの共通形式を解釈する
    async fn call<T: DeserializeOwned>(
        &self,
        flight_id: FlightId,
        request: RequestBuilder,
    ) -> Result<Option<T>, InventoryError> {
        let response = request.send().await.map_err(|e| {
            warn!(flight_id = %flight_id, error = %e, "在庫サービスに接続できません");
            InventoryError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        let envelope: ApiEnvelope<T> = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) if status.is_server_error() => {
                return Err(InventoryError::Unavailable(format!("HTTP {}: {}", status, e)))
            }
            Err(e) if e.is_timeout() => return Err(InventoryError::Unavailable(e.to_string())),
            Err(e) => {
                return Err(InventoryError::Storage(format!(
                    "在庫サービスの応答を解析できません (HTTP {}): {}",
                    status, e
                )))
            }
        };

        debug!(flight_id = %flight_id, %status, success = envelope.success, "在庫サービスの応答");
        into_result(flight_id, status, envelope)
    }
}

/// レスポンスの共通形式を在庫操作の結果に変換する
fn into_result<T>(
    flight_id: FlightId,
    status: StatusCode,
    envelope: ApiEnvelope<T>,
) -> Result<Option<T>, InventoryError> {
    if envelope.success {
        return Ok(envelope.data);
    }

    let message = envelope
        .message
        .unwrap_or_else(|| format!("HTTP {}", status));
    match envelope.error_code.as_deref() {
        Some(error_code::NOT_FOUND) => Err(InventoryError::FlightNotFound(flight_id)),
        Some(error_code::SEATS_UNAVAILABLE) => Err(InventoryError::SeatsUnavailable(
            envelope.unavailable_seats.unwrap_or_default(),
        )),
        Some(error_code::SERVICE_UNAVAILABLE) => Err(InventoryError::Unavailable(message)),
        Some(error_code::INVALID_REQUEST) => Err(InventoryError::InvalidRequest(message)),
        _ if status.is_server_error() => Err(InventoryError::Unavailable(message)),
        _ => Err(InventoryError::Storage(message)),
    }
}

fn seat_body(seat_numbers: &[SeatNumber]) -> Vec<&str> {
    seat_numbers.iter().map(SeatNumber::as_str).collect()
}

#[async_trait]
impl InventoryGateway for HttpInventoryGateway {
    async fn get_snapshot(&self, flight_id: FlightId) -> Result<FlightSnapshot, InventoryError> {
        let request = self.client.get(self.flight_url(flight_id));
        let flight: FlightResponse = self
            .call(flight_id, request)
            .await?
            .ok_or_else(|| InventoryError::Storage("便の情報が応答に含まれていません".to_string()))?;

        flight
            .into_snapshot()
            .map_err(|e| InventoryError::Storage(format!("便の情報を解析できません: {}", e)))
    }

    async fn reserve(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
    ) -> Result<(), InventoryError> {
        let request = self
            .client
            .put(format!("{}/seats/reserve", self.flight_url(flight_id)))
            .json(&seat_body(seat_numbers));
        self.call::<serde_json::Value>(flight_id, request).await?;
        Ok(())
    }

    async fn release(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
    ) -> Result<(), InventoryError> {
        let request = self
            .client
            .put(format!("{}/seats/release", self.flight_url(flight_id)))
            .json(&seat_body(seat_numbers));
        self.call::<serde_json::Value>(flight_id, request).await?;
        Ok(())
    }
}
