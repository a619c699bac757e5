// 単体テスト用のデータ生成

use crate::domain::model::{
    Booking, BookingId, Contact, Flight, FlightId, FlightReference, FlightSchedule, IataCode,
    MealPreference, Money, Passenger, Route, SeatNumber,
};
use crate::domain::reference::BookingReference;
use chrono::{Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

static BOOKED_AT_OFFSET: AtomicI64 = AtomicI64::new(0);

/// DEL→BOM、2030-01-10 06:00 出発、所要2時間15分の便
pub fn sample_flight(total_seats: u32, base_fare: i64) -> Flight {
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
            arrival: departure + Duration::minutes(135),
            total_seats,
            base_fare: Money::inr(base_fare),
        },
    )
    .unwrap()
}

/// 指定した便の確定済み予約
/// 予約日時は呼び出すたびに1秒ずつ後になる
pub fn sample_booking_for(flight: &Flight, reference: &str, seats: &[&str], fare: i64) -> Booking {
    let seat_numbers: Vec<SeatNumber> = seats.iter().map(|s| SeatNumber::parse(s).unwrap()).collect();
    let passengers = seat_numbers
        .iter()
        .map(|seat| {
            Passenger::new(
                format!("Passenger {}", seat),
                "FEMALE".to_string(),
                30,
                seat.clone(),
                MealPreference::Veg,
            )
        })
        .collect();
    let offset = BOOKED_AT_OFFSET.fetch_add(1, Ordering::SeqCst);
    Booking::confirmed(
        BookingId::new(),
        BookingReference::parse(reference).unwrap(),
        FlightReference {
            flight_id: flight.id(),
            flight_number: flight.flight_number().to_string(),
            route: flight.route().to_string(),
            journey_date: flight.departure(),
        },
        Contact::new("Asha".to_string(), "asha@example.com".to_string()),
        passengers,
        seat_numbers,
        Money::inr(fare),
        false,
        Utc.with_ymd_and_hms(2029, 12, 1, 0, 0, 0).unwrap() + Duration::seconds(offset),
    )
    .unwrap()
}

/// 予約番号だけを指定した確定済み予約
pub fn sample_booking_with_reference(reference: BookingReference) -> Booking {
    let flight = sample_flight(6, 1000);
    sample_booking_for(&flight, reference.as_str(), &["1A"], 1000)
}
