use crate::domain::error::DomainError;
use crate::domain::model::{Flight, FlightId, FlightSnapshot, SeatNumber};
use crate::domain::port::{FlightInventory, InventoryError, InventoryGateway};
use crate::domain::search::FlightSearchCriteria;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

/// バージョン付きの便
/// 座席の状態が変わるたびにバージョンが1つ進む
struct VersionedFlight {
    flight: Arc<Flight>,
    version: u64,
}

/// インメモリの座席在庫
/// 便ごとにバージョンを持ち、楽観的な比較交換（CAS）で座席を更新する
///
/// 更新手順:
/// 1. 現在の便とバージョンを読む
/// 2. ロックの外で座席の確保・解放を計算する
/// 3. バージョンが変わっていなければ差し替え、変わっていれば1からやり直す
#[derive(Default)]
pub struct InMemoryFlightInventory {
    flights: RwLock<HashMap<FlightId, VersionedFlight>>,
    cas_conflicts: AtomicU64,
}

impl InMemoryFlightInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 比較交換が競合してやり直した回数
    pub fn cas_conflicts(&self) -> u64 {
        self.cas_conflicts.load(Ordering::Relaxed)
    }

    async fn read(&self, flight_id: FlightId) -> Result<(Arc<Flight>, u64), InventoryError> {
        let flights = self.flights.read().await;
        flights
            .get(&flight_id)
            .map(|entry| (entry.flight.clone(), entry.version))
            .ok_or(InventoryError::FlightNotFound(flight_id))
    }

    /// 便の座席を比較交換で更新する
    /// `apply` は読み取った便の複製に対して呼ばれ、失敗した場合は何も変更しない
    async fn update<F>(&self, flight_id: FlightId, apply: F) -> Result<(), InventoryError>
    where
        F: Fn(&mut Flight) -> Result<(), DomainError>,
    {
        loop {
            let (current, version) = self.read(flight_id).await?;

            let mut next = (*current).clone();
            apply(&mut next).map_err(to_inventory_error)?;

            let mut flights = self.flights.write().await;
            let entry = flights
                .get_mut(&flight_id)
                .ok_or(InventoryError::FlightNotFound(flight_id))?;
            if entry.version == version {
                entry.flight = Arc::new(next);
                entry.version = version + 1;
                return Ok(());
            }
            drop(flights);

            self.cas_conflicts.fetch_add(1, Ordering::Relaxed);
            trace!(flight_id = %flight_id, version, "座席在庫の更新が競合したため再試行");
        }
    }
}

fn to_inventory_error(err: DomainError) -> InventoryError {
    match err {
        DomainError::SeatsUnavailable(seats) => InventoryError::SeatsUnavailable(seats),
        other => InventoryError::InvalidRequest(other.to_string()),
    }
}

#[async_trait]
impl InventoryGateway for InMemoryFlightInventory {
    async fn get_snapshot(&self, flight_id: FlightId) -> Result<FlightSnapshot, InventoryError> {
        let (flight, version) = self.read(flight_id).await?;
        Ok(flight.snapshot(version))
    }

    async fn reserve(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
    ) -> Result<(), InventoryError> {
        self.update(flight_id, |flight| flight.reserve_seats(seat_numbers))
            .await
    }

    async fn release(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
    ) -> Result<(), InventoryError> {
        self.update(flight_id, |flight| flight.release_seats(seat_numbers))
            .await
    }
}

#[async_trait]
impl FlightInventory for InMemoryFlightInventory {
    async fn add_flight(&self, flight: Flight) -> Result<FlightSnapshot, InventoryError> {
        let mut flights = self.flights.write().await;
        if flights.contains_key(&flight.id()) {
            return Err(InventoryError::InvalidRequest(format!(
                "便は既に登録されています: {}",
                flight.id()
            )));
        }
        let snapshot = flight.snapshot(0);
        flights.insert(
            flight.id(),
            VersionedFlight {
                flight: Arc::new(flight),
                version: 0,
            },
        );
        Ok(snapshot)
    }

    async fn search(
        &self,
        criteria: &FlightSearchCriteria,
    ) -> Result<Vec<FlightSnapshot>, InventoryError> {
        let flights = self.flights.read().await;
        let mut found: Vec<FlightSnapshot> = flights
            .values()
            .map(|entry| entry.flight.snapshot(entry.version))
            .filter(|snapshot| criteria.matches(snapshot))
            .collect();
        found.sort_by_key(|snapshot| snapshot.departure);
        Ok(found)
    }
}
