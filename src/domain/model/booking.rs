use crate::domain::error::DomainError;
use crate::domain::model::{
    BookingId, BookingStatus, FlightId, MealPreference, Money, SeatNumber,
};
use crate::domain::reference::BookingReference;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// 搭乗者
#[derive(Debug, Clone, PartialEq)]
pub struct Passenger {
    name: String,
    gender: String,
    age: i32,
    seat_number: SeatNumber,
    meal_preference: MealPreference,
}

impl Passenger {
    /// 搭乗者を作成
    pub fn new(
        name: String,
        gender: String,
        age: i32,
        seat_number: SeatNumber,
        meal_preference: MealPreference,
    ) -> Self {
        Self {
            name,
            gender,
            age,
            seat_number,
            meal_preference,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }

    pub fn age(&self) -> i32 {
        self.age
    }

    pub fn seat_number(&self) -> &SeatNumber {
        &self.seat_number
    }

    pub fn meal_preference(&self) -> MealPreference {
        self.meal_preference
    }
}

/// 予約者の連絡先
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    name: String,
    email: String,
}

impl Contact {
    /// 連絡先を作成
    /// メールアドレスは小文字に正規化する
    pub fn new(name: String, email: String) -> Self {
        Self {
            name,
            email: email.trim().to_lowercase(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// キャンセル情報
#[derive(Debug, Clone, PartialEq)]
pub struct Cancellation {
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
    pub refund_amount: Money,
}

/// 予約の作成時に便から写し取る情報
/// 便の情報が後で変わっても過去の予約を読めるように予約側に保持する
#[derive(Debug, Clone, PartialEq)]
pub struct FlightReference {
    pub flight_id: FlightId,
    pub flight_number: String,
    pub route: String,
    pub journey_date: DateTime<Utc>,
}

/// 予約集約
/// 作成時はCONFIRMED。CONFIRMED→CANCELLEDの遷移が一度だけ起こりうる
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    id: BookingId,
    reference: BookingReference,
    flight: FlightReference,
    contact: Contact,
    passengers: Vec<Passenger>,
    seat_numbers: Vec<SeatNumber>,
    total_fare: Money,
    fare_estimated: bool,
    status: BookingStatus,
    booked_at: DateTime<Utc>,
    cancellation: Option<Cancellation>,
}

impl Booking {
    /// 座席確保済みの予約を作成
    /// 不変条件:
    /// - 搭乗者数と座席数が一致する
    /// - 座席番号が予約内で重複しない
    #[allow(clippy::too_many_arguments)]
    pub fn confirmed(
        id: BookingId,
        reference: BookingReference,
        flight: FlightReference,
        contact: Contact,
        passengers: Vec<Passenger>,
        seat_numbers: Vec<SeatNumber>,
        total_fare: Money,
        fare_estimated: bool,
        booked_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::check_invariants(&passengers, &seat_numbers)?;
        Ok(Self {
            id,
            reference,
            flight,
            contact,
            passengers,
            seat_numbers,
            total_fare,
            fare_estimated,
            status: BookingStatus::Confirmed,
            booked_at,
            cancellation: None,
        })
    }

    /// データベースから取得したデータで予約を再構築
    /// リポジトリでの使用を想定
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: BookingId,
        reference: BookingReference,
        flight: FlightReference,
        contact: Contact,
        passengers: Vec<Passenger>,
        seat_numbers: Vec<SeatNumber>,
        total_fare: Money,
        fare_estimated: bool,
        status: BookingStatus,
        booked_at: DateTime<Utc>,
        cancellation: Option<Cancellation>,
    ) -> Result<Self, DomainError> {
        Self::check_invariants(&passengers, &seat_numbers)?;
        if (status == BookingStatus::Cancelled) != cancellation.is_some() {
            return Err(DomainError::InvalidBookingState(
                "キャンセル情報とステータスが一致しません".to_string(),
            ));
        }
        Ok(Self {
            id,
            reference,
            flight,
            contact,
            passengers,
            seat_numbers,
            total_fare,
            fare_estimated,
            status,
            booked_at,
            cancellation,
        })
    }

    fn check_invariants(
        passengers: &[Passenger],
        seat_numbers: &[SeatNumber],
    ) -> Result<(), DomainError> {
        if passengers.len() != seat_numbers.len() {
            return Err(DomainError::BookingValidation(format!(
                "搭乗者数({})と座席数({})が一致しません",
                passengers.len(),
                seat_numbers.len()
            )));
        }
        let distinct: HashSet<&SeatNumber> = seat_numbers.iter().collect();
        if distinct.len() != seat_numbers.len() {
            return Err(DomainError::BookingValidation(
                "座席番号が重複しています".to_string(),
            ));
        }
        Ok(())
    }

    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn reference(&self) -> &BookingReference {
        &self.reference
    }

    pub fn flight_id(&self) -> FlightId {
        self.flight.flight_id
    }

    pub fn flight_number(&self) -> &str {
        &self.flight.flight_number
    }

    pub fn route(&self) -> &str {
        &self.flight.route
    }

    /// 予約時点で便から写し取った出発日時
    pub fn journey_date(&self) -> DateTime<Utc> {
        self.flight.journey_date
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    pub fn seat_numbers(&self) -> &[SeatNumber] {
        &self.seat_numbers
    }

    pub fn total_fare(&self) -> Money {
        self.total_fare
    }

    /// 座席単位の料金が得られず概算で計算された運賃かどうか
    pub fn is_fare_estimated(&self) -> bool {
        self.fare_estimated
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn booked_at(&self) -> DateTime<Utc> {
        self.booked_at
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    /// 予約をキャンセル
    /// 事前条件:
    /// - ステータスがConfirmed
    pub fn cancel(
        &mut self,
        cancelled_at: DateTime<Utc>,
        reason: String,
        refund_amount: Money,
    ) -> Result<(), DomainError> {
        match self.status {
            BookingStatus::Confirmed => {}
            BookingStatus::Cancelled => {
                return Err(DomainError::InvalidBookingState(
                    "既にキャンセル済みの予約です".to_string(),
                ));
            }
            BookingStatus::Pending => {
                return Err(DomainError::InvalidBookingState(
                    "確定していない予約はキャンセルできません".to_string(),
                ));
            }
        }

        self.status = BookingStatus::Cancelled;
        self.cancellation = Some(Cancellation {
            cancelled_at,
            reason,
            refund_amount,
        });

        Ok(())
    }
}
