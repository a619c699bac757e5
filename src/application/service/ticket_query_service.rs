use crate::application::ApplicationError;
use crate::domain::fare::FareBreakdown;
use crate::domain::model::{
    Booking, BookingStatus, Cancellation, FlightId, FlightSnapshot, Money, Passenger,
};
use crate::domain::port::{BookingRepository, InventoryGateway};
use crate::domain::reference::BookingReference;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

/// チケットに表示する便の概要
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSummary {
    pub flight_number: String,
    pub airline_name: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    /// 所要時間（"2h 15m" 形式）
    pub duration: String,
    pub aircraft_type: String,
}

impl From<&FlightSnapshot> for FlightSummary {
    fn from(snapshot: &FlightSnapshot) -> Self {
        Self {
            flight_number: snapshot.flight_number.clone(),
            airline_name: snapshot.airline_name.clone(),
            origin: snapshot.route.origin().to_string(),
            destination: snapshot.route.destination().to_string(),
            departure: snapshot.departure,
            arrival: snapshot.arrival,
            duration: snapshot.duration_label(),
            aircraft_type: snapshot.aircraft_type.clone(),
        }
    }
}

/// 予約の概要
#[derive(Debug, Clone, PartialEq)]
pub struct BookingSummary {
    pub reference: BookingReference,
    pub status: BookingStatus,
    pub flight_id: FlightId,
    pub flight_number: String,
    pub route: String,
    pub journey_date: DateTime<Utc>,
    pub booked_at: DateTime<Utc>,
    pub contact_name: String,
    pub contact_email: String,
    pub seat_numbers: Vec<String>,
    pub total_fare: Money,
    pub fare_estimated: bool,
    pub cancellation: Option<Cancellation>,
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            reference: booking.reference().clone(),
            status: booking.status(),
            flight_id: booking.flight_id(),
            flight_number: booking.flight_number().to_string(),
            route: booking.route().to_string(),
            journey_date: booking.journey_date(),
            booked_at: booking.booked_at(),
            contact_name: booking.contact().name().to_string(),
            contact_email: booking.contact().email().to_string(),
            seat_numbers: booking.seat_numbers().iter().map(|s| s.to_string()).collect(),
            total_fare: booking.total_fare(),
            fare_estimated: booking.is_fare_estimated(),
            cancellation: booking.cancellation().cloned(),
        }
    }
}

/// チケット表示
#[derive(Debug, Clone, PartialEq)]
pub struct TicketView {
    pub reference: BookingReference,
    pub status: BookingStatus,
    /// 在庫サービスから便の情報が得られなかった場合は None
    pub flight: Option<FlightSummary>,
    pub booking: BookingSummary,
    pub passengers: Vec<Passenger>,
    pub fare: FareBreakdown,
}

/// チケット照会サービス
/// 読み取り専用の予約照会を提供する
pub struct TicketQueryService {
    booking_repository: Arc<dyn BookingRepository>,
    inventory: Arc<dyn InventoryGateway>,
}

impl TicketQueryService {
    /// 新しいチケット照会サービスを作成
    ///
    /// # Arguments
    /// * `booking_repository` - 予約リポジトリ
    /// * `inventory` - 便の情報を取得する在庫ゲートウェイ
    pub fn new(
        booking_repository: Arc<dyn BookingRepository>,
        inventory: Arc<dyn InventoryGateway>,
    ) -> Self {
        Self {
            booking_repository,
            inventory,
        }
    }

    /// 予約番号で予約を取得
    /// 予約番号は大文字小文字を区別しない
    pub async fn get_booking(&self, reference: &str) -> Result<Booking, ApplicationError> {
        let not_found =
            || ApplicationError::NotFound(format!("予約が見つかりません: {}", reference));
        let parsed = BookingReference::parse(reference).map_err(|_| not_found())?;
        self.booking_repository
            .find_by_reference(&parsed)
            .await?
            .ok_or_else(not_found)
    }

    /// 予約番号でチケットを取得
    /// 便の情報が取得できない場合も、便の概要と運賃内訳を省いて返す
    ///
    /// # Returns
    /// * `Ok(TicketView)` - チケット
    /// * `Err(ApplicationError::NotFound)` - 予約が存在しない
    pub async fn get_ticket(&self, reference: &str) -> Result<TicketView, ApplicationError> {
        let booking = self.get_booking(reference).await?;

        let snapshot = match self.inventory.get_snapshot(booking.flight_id()).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(
                    reference = %booking.reference(),
                    flight_id = %booking.flight_id(),
                    error = %err,
                    "便の情報を取得できないため、便の概要なしでチケットを返します"
                );
                None
            }
        };

        let fare = match &snapshot {
            Some(snapshot) if !booking.is_fare_estimated() => FareBreakdown::for_booking(
                booking.total_fare(),
                snapshot.base_fare,
                booking.passengers().len() as u32,
            ),
            _ => FareBreakdown::total_only(booking.total_fare()),
        };

        Ok(TicketView {
            reference: booking.reference().clone(),
            status: booking.status(),
            flight: snapshot.as_ref().map(FlightSummary::from),
            booking: BookingSummary::from(&booking),
            passengers: booking.passengers().to_vec(),
            fare,
        })
    }

    /// 連絡先メールアドレスで予約履歴を取得
    /// 予約日時の降順で並べて返す
    pub async fn booking_history(
        &self,
        email: &str,
    ) -> Result<Vec<BookingSummary>, ApplicationError> {
        let normalized = email.trim().to_lowercase();
        let bookings = self
            .booking_repository
            .find_by_contact_email(&normalized)
            .await?;
        Ok(bookings.iter().map(BookingSummary::from).collect())
    }
}
