// 駆動される側アダプター（リポジトリ・座席在庫・時刻源の実装）

mod clock;
mod http_inventory_gateway;
mod in_memory_booking_repository;
mod in_memory_flight_inventory;
mod mysql_booking_repository;
mod mysql_flight_inventory;

pub use clock::{FixedClock, SystemClock};
pub use http_inventory_gateway::HttpInventoryGateway;
pub use in_memory_booking_repository::InMemoryBookingRepository;
pub use in_memory_flight_inventory::InMemoryFlightInventory;
pub use mysql_booking_repository::MySqlBookingRepository;
pub use mysql_flight_inventory::MySqlFlightInventory;
