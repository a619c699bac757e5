use crate::domain::model::{FlightId, FlightSnapshot, MealPreference, SeatNumber};
use std::collections::HashSet;

/// 搭乗者の入力内容
#[derive(Debug, Clone, PartialEq)]
pub struct PassengerDetails {
    pub name: String,
    pub gender: String,
    pub age: i32,
    pub seat_number: SeatNumber,
    pub meal_preference: MealPreference,
}

/// 予約作成の要求
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub flight_id: FlightId,
    pub contact_name: String,
    pub contact_email: String,
    pub passengers: Vec<PassengerDetails>,
    pub seat_numbers: Vec<SeatNumber>,
}

/// 予約要求の検証エラー
/// どの規則に違反したかを区別する
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("搭乗者が指定されていません")]
    NoPassengers,

    #[error("搭乗者数({passengers})と座席数({seats})が一致しません")]
    PassengerSeatCountMismatch { passengers: usize, seats: usize },

    #[error("座席番号が重複しています: {}", .0.join(", "))]
    DuplicateSeats(Vec<String>),

    #[error("搭乗者 {passenger} の座席 {seat} は予約対象の座席に含まれていません")]
    PassengerSeatNotRequested { passenger: String, seat: String },

    #[error("座席が利用できません: {}", .0.join(", "))]
    SeatsUnavailable(Vec<String>),

    #[error("空席が不足しています（要求 {requested}、空席 {available}）")]
    InsufficientSeats { requested: u32, available: u32 },

    #[error("搭乗者 {passenger} の年齢が範囲外です: {age}")]
    InvalidAge { passenger: String, age: i32 },
}

impl ValidationError {
    /// 座席在庫との競合による失敗か（要求の形式誤りではない）
    pub fn is_seat_conflict(&self) -> bool {
        matches!(
            self,
            ValidationError::SeatsUnavailable(_) | ValidationError::InsufficientSeats { .. }
        )
    }
}

/// 予約要求を在庫スナップショットに対して検証する
pub struct BookingValidator;

impl BookingValidator {
    pub const MIN_AGE: i32 = 0;
    pub const MAX_AGE: i32 = 120;

    /// 予約要求を検証
    /// 次の順で検査し、最初に違反した規則を返す
    /// 1. 搭乗者数と座席数の一致
    /// 2. 座席番号の重複なし
    /// 3. 各搭乗者の座席が要求座席に含まれる
    /// 4. 全座席が存在し空席（座席単位の情報がある場合のみ）
    /// 5. 便の空席数が搭乗者数以上
    /// 6. 全搭乗者の年齢が0〜120
    pub fn validate(
        request: &BookingRequest,
        snapshot: &FlightSnapshot,
    ) -> Result<(), ValidationError> {
        let passengers = request.passengers.len();
        let seats = request.seat_numbers.len();
        if passengers != seats {
            return Err(ValidationError::PassengerSeatCountMismatch { passengers, seats });
        }
        if seats == 0 {
            return Err(ValidationError::NoPassengers);
        }

        let mut seen = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for number in &request.seat_numbers {
            if !seen.insert(number) && !duplicates.contains(&number.to_string()) {
                duplicates.push(number.to_string());
            }
        }
        if !duplicates.is_empty() {
            return Err(ValidationError::DuplicateSeats(duplicates));
        }

        if let Some(passenger) = request
            .passengers
            .iter()
            .find(|p| !seen.contains(&p.seat_number))
        {
            return Err(ValidationError::PassengerSeatNotRequested {
                passenger: passenger.name.clone(),
                seat: passenger.seat_number.to_string(),
            });
        }

        if snapshot.has_seat_detail() {
            let unavailable: Vec<String> = request
                .seat_numbers
                .iter()
                .filter(|number| {
                    !snapshot
                        .seat(number)
                        .map(|seat| seat.is_available())
                        .unwrap_or(false)
                })
                .map(|number| number.to_string())
                .collect();
            if !unavailable.is_empty() {
                return Err(ValidationError::SeatsUnavailable(unavailable));
            }
        }

        let requested = seats as u32;
        if snapshot.available_seats < requested {
            return Err(ValidationError::InsufficientSeats {
                requested,
                available: snapshot.available_seats,
            });
        }

        if let Some(passenger) = request
            .passengers
            .iter()
            .find(|p| !(Self::MIN_AGE..=Self::MAX_AGE).contains(&p.age))
        {
            return Err(ValidationError::InvalidAge {
                passenger: passenger.name.clone(),
                age: passenger.age,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Flight, FlightSchedule, IataCode, Money, Route};
    use chrono::{Duration, TimeZone, Utc};

    fn flight() -> Flight {
        let departure = Utc.with_ymd_and_hms(2030, 1, 10, 6, 0, 0).unwrap();
        Flight::schedule(
            FlightId::new(),
            FlightSchedule {
                flight_number: "AI101".to_string(),
                airline_name: "Air India".to_string(),
                aircraft_type: "A320".to_string(),
                route: Route::new(IataCode::new("DEL").unwrap(), IataCode::new("BOM").unwrap())
                    .unwrap(),
                departure,
                arrival: departure + Duration::hours(2),
                total_seats: 12,
                base_fare: Money::inr(1000),
            },
        )
        .unwrap()
    }

    fn seat(n: &str) -> SeatNumber {
        SeatNumber::parse(n).unwrap()
    }

    fn passenger(name: &str, seat_number: &str, age: i32) -> PassengerDetails {
        PassengerDetails {
            name: name.to_string(),
            gender: "MALE".to_string(),
            age,
            seat_number: seat(seat_number),
            meal_preference: MealPreference::None,
        }
    }

    fn request(passengers: Vec<PassengerDetails>, seats: &[&str]) -> BookingRequest {
        BookingRequest {
            flight_id: FlightId::new(),
            contact_name: "Ravi".to_string(),
            contact_email: "ravi@example.com".to_string(),
            passengers,
            seat_numbers: seats.iter().map(|n| seat(n)).collect(),
        }
    }

    #[test]
    fn test_valid_request() {
        let snapshot = flight().snapshot(0);
        let req = request(vec![passenger("A", "1A", 30), passenger("B", "1B", 0)], &["1A", "1B"]);
        assert_eq!(BookingValidator::validate(&req, &snapshot), Ok(()));
    }

    #[test]
    fn test_count_mismatch() {
        let snapshot = flight().snapshot(0);
        let req = request(vec![passenger("A", "1A", 30)], &["1A", "1B"]);
        assert_eq!(
            BookingValidator::validate(&req, &snapshot),
            Err(ValidationError::PassengerSeatCountMismatch { passengers: 1, seats: 2 })
        );
    }

    #[test]
    fn test_empty_request() {
        let snapshot = flight().snapshot(0);
        let req = request(vec![], &[]);
        assert_eq!(
            BookingValidator::validate(&req, &snapshot),
            Err(ValidationError::NoPassengers)
        );
    }

    #[test]
    fn test_duplicate_seats_checked_before_availability() {
        let mut flight = flight();
        flight.reserve_seats(&[seat("1A")]).unwrap();
        let snapshot = flight.snapshot(1);
        let req = request(vec![passenger("A", "1A", 30), passenger("B", "1A", 30)], &["1A", "1A"]);
        assert_eq!(
            BookingValidator::validate(&req, &snapshot),
            Err(ValidationError::DuplicateSeats(vec!["1A".to_string()]))
        );
    }

    #[test]
    fn test_passenger_seat_must_be_requested() {
        let snapshot = flight().snapshot(0);
        let req = request(vec![passenger("A", "2A", 30)], &["1A"]);
        assert!(matches!(
            BookingValidator::validate(&req, &snapshot),
            Err(ValidationError::PassengerSeatNotRequested { .. })
        ));
    }

    #[test]
    fn test_unavailable_seats_are_listed() {
        let mut flight = flight();
        flight.reserve_seats(&[seat("1A"), seat("1C")]).unwrap();
        let snapshot = flight.snapshot(1);
        let req = request(
            vec![passenger("A", "1A", 30), passenger("B", "1B", 30), passenger("C", "1C", 30)],
            &["1A", "1B", "1C"],
        );
        let err = BookingValidator::validate(&req, &snapshot).unwrap_err();
        assert_eq!(
            err,
            ValidationError::SeatsUnavailable(vec!["1A".to_string(), "1C".to_string()])
        );
        assert!(err.is_seat_conflict());
    }

    #[test]
    fn test_nonexistent_seat_is_unavailable() {
        let snapshot = flight().snapshot(0);
        let req = request(vec![passenger("A", "30A", 30)], &["30A"]);
        assert_eq!(
            BookingValidator::validate(&req, &snapshot),
            Err(ValidationError::SeatsUnavailable(vec!["30A".to_string()]))
        );
    }

    #[test]
    fn test_insufficient_seats_without_seat_detail() {
        let mut snapshot = flight().snapshot(0);
        snapshot.seats = None;
        snapshot.available_seats = 1;
        let req = request(vec![passenger("A", "1A", 30), passenger("B", "1B", 30)], &["1A", "1B"]);
        assert_eq!(
            BookingValidator::validate(&req, &snapshot),
            Err(ValidationError::InsufficientSeats { requested: 2, available: 1 })
        );
    }

    #[test]
    fn test_age_bounds() {
        let snapshot = flight().snapshot(0);
        let ok = request(vec![passenger("A", "1A", 120)], &["1A"]);
        assert!(BookingValidator::validate(&ok, &snapshot).is_ok());

        let too_old = request(vec![passenger("A", "1A", 121)], &["1A"]);
        assert_eq!(
            BookingValidator::validate(&too_old, &snapshot),
            Err(ValidationError::InvalidAge { passenger: "A".to_string(), age: 121 })
        );

        let negative = request(vec![passenger("A", "1A", -1)], &["1A"]);
        assert!(BookingValidator::validate(&negative, &snapshot).is_err());
    }
}
