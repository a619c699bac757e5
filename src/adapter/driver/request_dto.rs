use crate::domain::error::DomainError;
use crate::domain::model::{
    FlightId, FlightSchedule, IataCode, MealPreference, Money, Route, SeatClass, SeatNumber,
};
use crate::domain::search::FlightSearchCriteria;
use crate::domain::validator::{BookingRequest, PassengerDetails};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 搭乗者用のリクエストDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerRequest {
    pub name: String,
    pub gender: String,
    pub age: i32,
    pub seat_number: String,
    /// 省略時は VEG
    #[serde(default)]
    pub meal_preference: Option<String>,
}

/// 予約作成用のリクエストDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: FlightId,
    pub contact_name: String,
    pub contact_email: String,
    pub passengers: Vec<PassengerRequest>,
    pub seat_numbers: Vec<String>,
}

impl CreateBookingRequest {
    /// 予約リクエストに変換
    /// 座席番号や機内食の形式が不正な場合はエラー
    pub fn into_booking_request(self) -> Result<BookingRequest, DomainError> {
        let mut passengers = Vec::with_capacity(self.passengers.len());
        for passenger in self.passengers {
            let meal_preference = match passenger.meal_preference.as_deref() {
                Some(meal) => MealPreference::from_string(meal)?,
                None => MealPreference::Veg,
            };
            passengers.push(PassengerDetails {
                name: passenger.name,
                gender: passenger.gender,
                age: passenger.age,
                seat_number: SeatNumber::parse(&passenger.seat_number)?,
                meal_preference,
            });
        }

        let seat_numbers = self
            .seat_numbers
            .iter()
            .map(|seat| SeatNumber::parse(seat))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BookingRequest {
            flight_id: self.flight_id,
            contact_name: self.contact_name,
            contact_email: self.contact_email,
            passengers,
            seat_numbers,
        })
    }
}

/// キャンセル用のリクエストDTO
/// ボディ自体も省略できる
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelBookingRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// 便登録用のリクエストDTO（テスト・管理用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFlightRequest {
    pub flight_id: Option<FlightId>,
    pub flight_number: String,
    pub airline_name: String,
    pub aircraft_type: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub total_seats: u32,
    pub base_fare: i64,
    /// 省略時は INR
    #[serde(default)]
    pub currency: Option<String>,
}

impl CreateFlightRequest {
    /// 便の登録内容に変換
    pub fn into_schedule(self) -> Result<(FlightId, FlightSchedule), DomainError> {
        let route = Route::new(IataCode::new(&self.origin)?, IataCode::new(&self.destination)?)?;
        let currency = self.currency.unwrap_or_else(|| "INR".to_string());
        let schedule = FlightSchedule {
            flight_number: self.flight_number,
            airline_name: self.airline_name,
            aircraft_type: self.aircraft_type,
            route,
            departure: self.departure,
            arrival: self.arrival,
            total_seats: self.total_seats,
            base_fare: Money::new(self.base_fare, currency)?,
        };
        Ok((self.flight_id.unwrap_or_default(), schedule))
    }
}

fn one_passenger() -> u32 {
    1
}

/// 便検索用のリクエストDTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSearchRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    /// 省略時は1名
    #[serde(default = "one_passenger")]
    pub passengers: u32,
    /// ECONOMY / BUSINESS / FIRST_CLASS（省略時はクラスを問わない）
    #[serde(default)]
    pub cabin_class: Option<String>,
}

impl FlightSearchRequest {
    /// 検索条件に変換
    pub fn into_criteria(self, today: NaiveDate) -> Result<FlightSearchCriteria, DomainError> {
        let cabin_class = self
            .cabin_class
            .map(|class| SeatClass::from_string(&class.trim().to_ascii_uppercase()))
            .transpose()?;
        FlightSearchCriteria::new(
            IataCode::new(&self.origin)?,
            IataCode::new(&self.destination)?,
            self.departure_date,
            self.passengers,
            cabin_class,
            today,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passenger(seat: &str, meal: Option<&str>) -> PassengerRequest {
        PassengerRequest {
            name: "Asha".to_string(),
            gender: "F".to_string(),
            age: 30,
            seat_number: seat.to_string(),
            meal_preference: meal.map(str::to_string),
        }
    }

    #[test]
    fn test_into_booking_request_normalizes_seats() {
        let request = CreateBookingRequest {
            flight_id: FlightId::new(),
            contact_name: "Asha".to_string(),
            contact_email: "asha@example.com".to_string(),
            passengers: vec![passenger("1a", Some("non_veg"))],
            seat_numbers: vec![" 1a ".to_string()],
        };

        let booking = request.into_booking_request().unwrap();
        assert_eq!(booking.seat_numbers[0].as_str(), "1A");
        assert_eq!(booking.passengers[0].seat_number.as_str(), "1A");
        assert_eq!(booking.passengers[0].meal_preference, MealPreference::NonVeg);
    }

    #[test]
    fn test_meal_preference_defaults_to_veg() {
        let json = r#"{
            "flight_id": "6f1c2a58-3f7e-4c1e-9d3a-0b8f2f4c1a11",
            "contact_name": "Asha",
            "contact_email": "asha@example.com",
            "passengers": [{"name": "Asha", "gender": "F", "age": 30, "seat_number": "2C"}],
            "seat_numbers": ["2C"]
        }"#;
        let request: CreateBookingRequest = serde_json::from_str(json).unwrap();
        let booking = request.into_booking_request().unwrap();
        assert_eq!(booking.passengers[0].meal_preference, MealPreference::Veg);
    }

    #[test]
    fn test_invalid_seat_number_rejected() {
        let request = CreateBookingRequest {
            flight_id: FlightId::new(),
            contact_name: "Asha".to_string(),
            contact_email: "asha@example.com".to_string(),
            passengers: vec![passenger("Z9", None)],
            seat_numbers: vec!["Z9".to_string()],
        };
        assert!(request.into_booking_request().is_err());
    }

    #[test]
    fn test_search_request_defaults_and_cabin_class() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let request: FlightSearchRequest = serde_json::from_str(
            r#"{"origin": "del", "destination": "bom", "departure_date": "2030-01-10"}"#,
        )
        .unwrap();
        let criteria = request.into_criteria(today).unwrap();
        assert_eq!(criteria.passengers(), 1);
        assert_eq!(criteria.cabin_class(), None);
        assert_eq!(criteria.route().to_string(), "DEL-BOM");

        let request: FlightSearchRequest = serde_json::from_str(
            r#"{"origin": "DEL", "destination": "BOM", "departure_date": "2030-01-10",
                "passengers": 2, "cabin_class": "first_class"}"#,
        )
        .unwrap();
        assert_eq!(
            request.into_criteria(today).unwrap().cabin_class(),
            Some(SeatClass::First)
        );

        let request: FlightSearchRequest = serde_json::from_str(
            r#"{"origin": "DEL", "destination": "BOM", "departure_date": "2030-01-10",
                "cabin_class": "premium"}"#,
        )
        .unwrap();
        assert!(request.into_criteria(today).is_err());
    }
}
