// ドメインモデル（エンティティと値オブジェクト）

mod value_objects;
mod flight;
mod booking;

pub use value_objects::{
    FlightId, BookingId,
    Currency, Money,
    IataCode, Route,
    SeatNumber, SeatClass, SeatType,
    MealPreference,
    BookingStatus,
};

pub use flight::{
    Flight, FlightSchedule, FlightSnapshot, Seat, SeatMap, MAX_BASE_FARE, MAX_SEATS_PER_FLIGHT,
};
pub use booking::{Booking, Cancellation, Contact, FlightReference, Passenger};
