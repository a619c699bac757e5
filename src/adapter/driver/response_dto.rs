use crate::application::service::{
    BookingConfirmation, BookingSummary, CancellationReceipt, FlightSummary, TicketView,
};
use crate::domain::error::DomainError;
use crate::domain::fare::FareBreakdown;
use crate::domain::model::{
    FlightId, FlightSnapshot, IataCode, Money, Passenger, Route, Seat, SeatClass, SeatNumber,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 在庫APIの共通レスポンス
/// 在庫サービスとリモート在庫ゲートウェイの間の通信形式
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_seats: Option<Vec<String>>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error_code: None,
            message: None,
            data: Some(data),
            unavailable_seats: None,
        }
    }

    pub fn error(code: &str, message: String) -> Self {
        Self {
            success: false,
            error_code: Some(code.to_string()),
            message: Some(message),
            data: None,
            unavailable_seats: None,
        }
    }

    pub fn seats_unavailable(message: String, seats: Vec<String>) -> Self {
        Self {
            unavailable_seats: Some(seats),
            ..Self::error(error_code::SEATS_UNAVAILABLE, message)
        }
    }
}

/// 在庫APIのエラーコード
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const SEATS_UNAVAILABLE: &str = "SEATS_UNAVAILABLE";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
}

/// 座席用のレスポンスDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatResponse {
    pub seat_number: String,
    pub seat_class: String,
    pub seat_type: String,
    pub available: bool,
    pub extra_charge: i64,
}

/// 便の在庫用のレスポンスDTO
/// seatsが省略された場合は便単位の情報のみを表す
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightResponse {
    pub flight_id: FlightId,
    pub flight_number: String,
    pub airline_name: String,
    pub aircraft_type: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub duration: String,
    pub total_seats: u32,
    pub available_seats: u32,
    pub base_fare: i64,
    pub currency: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<Vec<SeatResponse>>,
}

impl FlightResponse {
    /// スナップショットからFlightResponseを作成
    pub fn from_snapshot(snapshot: &FlightSnapshot) -> Self {
        Self {
            flight_id: snapshot.flight_id,
            flight_number: snapshot.flight_number.clone(),
            airline_name: snapshot.airline_name.clone(),
            aircraft_type: snapshot.aircraft_type.clone(),
            origin: snapshot.route.origin().to_string(),
            destination: snapshot.route.destination().to_string(),
            departure: snapshot.departure,
            arrival: snapshot.arrival,
            duration: snapshot.duration_label(),
            total_seats: snapshot.total_seats,
            available_seats: snapshot.available_seats,
            base_fare: snapshot.base_fare.amount(),
            currency: snapshot.base_fare.currency(),
            version: snapshot.version,
            seats: snapshot.seats.as_ref().map(|seats| {
                seats
                    .iter()
                    .map(|seat| SeatResponse {
                        seat_number: seat.number().to_string(),
                        seat_class: seat.class().to_string(),
                        seat_type: seat.seat_type().to_string(),
                        available: seat.is_available(),
                        extra_charge: seat.extra_charge().amount(),
                    })
                    .collect()
            }),
        }
    }

    /// 受信したレスポンスをスナップショットに戻す
    pub fn into_snapshot(self) -> Result<FlightSnapshot, DomainError> {
        let route = Route::new(IataCode::new(&self.origin)?, IataCode::new(&self.destination)?)?;
        let base_fare = Money::new(self.base_fare, self.currency.clone())?;
        let seats = match self.seats {
            Some(seats) => {
                let mut converted = Vec::with_capacity(seats.len());
                for seat in seats {
                    converted.push(Seat::new(
                        SeatNumber::parse(&seat.seat_number)?,
                        SeatClass::from_string(&seat.seat_class)?,
                        seat.available,
                        Money::new(seat.extra_charge, self.currency.clone())?,
                    ));
                }
                Some(converted)
            }
            None => None,
        };

        Ok(FlightSnapshot {
            flight_id: self.flight_id,
            flight_number: self.flight_number,
            airline_name: self.airline_name,
            aircraft_type: self.aircraft_type,
            route,
            departure: self.departure,
            arrival: self.arrival,
            total_seats: self.total_seats,
            available_seats: self.available_seats,
            base_fare,
            seats,
            version: self.version,
        })
    }
}

/// 搭乗者用のレスポンスDTO
#[derive(Debug, Serialize, Deserialize)]
pub struct PassengerResponse {
    pub name: String,
    pub gender: String,
    pub age: i32,
    pub seat_number: String,
    pub meal_preference: String,
}

impl PassengerResponse {
    pub fn from_passenger(passenger: &Passenger) -> Self {
        Self {
            name: passenger.name().to_string(),
            gender: passenger.gender().to_string(),
            age: passenger.age(),
            seat_number: passenger.seat_number().to_string(),
            meal_preference: passenger.meal_preference().to_string(),
        }
    }
}

/// 予約確定用のレスポンスDTO
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingConfirmationResponse {
    pub reference: String,
    pub status: String,
    pub total_fare: i64,
    pub currency: String,
    pub fare_estimated: bool,
    pub passengers: Vec<PassengerResponse>,
}

impl BookingConfirmationResponse {
    pub fn from_confirmation(confirmation: &BookingConfirmation) -> Self {
        Self {
            reference: confirmation.reference.to_string(),
            status: confirmation.status.to_string(),
            total_fare: confirmation.total_fare.amount(),
            currency: confirmation.total_fare.currency(),
            fare_estimated: confirmation.fare_estimated,
            passengers: confirmation
                .passengers
                .iter()
                .map(PassengerResponse::from_passenger)
                .collect(),
        }
    }
}

/// キャンセル受付用のレスポンスDTO
#[derive(Debug, Serialize, Deserialize)]
pub struct CancellationResponse {
    pub reference: String,
    pub refund_amount: i64,
    pub refund_percentage: u32,
    pub currency: String,
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
}

impl CancellationResponse {
    pub fn from_receipt(receipt: &CancellationReceipt) -> Self {
        Self {
            reference: receipt.reference.to_string(),
            refund_amount: receipt.refund_amount.amount(),
            refund_percentage: receipt.refund_percentage,
            currency: receipt.refund_amount.currency(),
            cancelled_at: receipt.cancelled_at,
            reason: receipt.reason.clone(),
        }
    }
}

/// 予約概要用のレスポンスDTO
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingSummaryResponse {
    pub reference: String,
    pub status: String,
    pub flight_id: String,
    pub flight_number: String,
    pub route: String,
    pub journey_date: DateTime<Utc>,
    pub booked_at: DateTime<Utc>,
    pub contact_name: String,
    pub contact_email: String,
    pub seat_numbers: Vec<String>,
    pub total_fare: i64,
    pub currency: String,
    pub fare_estimated: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refund_amount: Option<i64>,
}

impl BookingSummaryResponse {
    pub fn from_summary(summary: &BookingSummary) -> Self {
        let cancellation = summary.cancellation.as_ref();
        Self {
            reference: summary.reference.to_string(),
            status: summary.status.to_string(),
            flight_id: summary.flight_id.to_string(),
            flight_number: summary.flight_number.clone(),
            route: summary.route.clone(),
            journey_date: summary.journey_date,
            booked_at: summary.booked_at,
            contact_name: summary.contact_name.clone(),
            contact_email: summary.contact_email.clone(),
            seat_numbers: summary.seat_numbers.clone(),
            total_fare: summary.total_fare.amount(),
            currency: summary.total_fare.currency(),
            fare_estimated: summary.fare_estimated,
            cancelled_at: cancellation.map(|c| c.cancelled_at),
            cancellation_reason: cancellation.map(|c| c.reason.clone()),
            refund_amount: cancellation.map(|c| c.refund_amount.amount()),
        }
    }
}

/// チケットに載せる便の概要
#[derive(Debug, Serialize, Deserialize)]
pub struct FlightSummaryResponse {
    pub flight_number: String,
    pub airline_name: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub duration: String,
    pub aircraft_type: String,
}

impl FlightSummaryResponse {
    pub fn from_summary(summary: &FlightSummary) -> Self {
        Self {
            flight_number: summary.flight_number.clone(),
            airline_name: summary.airline_name.clone(),
            origin: summary.origin.clone(),
            destination: summary.destination.clone(),
            departure: summary.departure,
            arrival: summary.arrival,
            duration: summary.duration.clone(),
            aircraft_type: summary.aircraft_type.clone(),
        }
    }
}

/// 運賃内訳用のレスポンスDTO
#[derive(Debug, Serialize, Deserialize)]
pub struct FareBreakdownResponse {
    pub base_fare: i64,
    pub taxes: i64,
    pub seat_charges: i64,
    pub meal_charges: i64,
    pub total_fare: i64,
    pub currency: String,
}

impl FareBreakdownResponse {
    pub fn from_breakdown(fare: &FareBreakdown) -> Self {
        Self {
            base_fare: fare.base_fare.amount(),
            taxes: fare.taxes.amount(),
            seat_charges: fare.seat_charges.amount(),
            meal_charges: fare.meal_charges.amount(),
            total_fare: fare.total_fare.amount(),
            currency: fare.total_fare.currency(),
        }
    }
}

/// チケット用のレスポンスDTO
#[derive(Debug, Serialize, Deserialize)]
pub struct TicketResponse {
    pub reference: String,
    pub status: String,
    pub flight: Option<FlightSummaryResponse>,
    pub booking: BookingSummaryResponse,
    pub passengers: Vec<PassengerResponse>,
    pub fare: FareBreakdownResponse,
}

impl TicketResponse {
    pub fn from_ticket(ticket: &TicketView) -> Self {
        Self {
            reference: ticket.reference.to_string(),
            status: ticket.status.to_string(),
            flight: ticket.flight.as_ref().map(FlightSummaryResponse::from_summary),
            booking: BookingSummaryResponse::from_summary(&ticket.booking),
            passengers: ticket
                .passengers
                .iter()
                .map(PassengerResponse::from_passenger)
                .collect(),
            fare: FareBreakdownResponse::from_breakdown(&ticket.fare),
        }
    }
}
