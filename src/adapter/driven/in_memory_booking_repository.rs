use crate::domain::model::{Booking, BookingId, BookingStatus};
use crate::domain::port::{BookingRepository, CancellationClaim, RepositoryError};
use crate::domain::reference::BookingReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct BookingTable {
    by_id: HashMap<BookingId, Booking>,
    /// 予約番号の一意インデックス
    by_reference: HashMap<BookingReference, BookingId>,
    /// キャンセル処理中の予約と占有した時刻
    cancellation_claims: HashMap<BookingId, DateTime<Utc>>,
}

/// インメモリ予約リポジトリ
/// 予約番号の一意性をインデックスで保証する
#[derive(Default)]
pub struct InMemoryBookingRepository {
    table: Mutex<BookingTable>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存されている予約の件数
    pub async fn count(&self) -> usize {
        self.table.lock().await.by_id.len()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let mut table = self.table.lock().await;
        if table.by_reference.contains_key(booking.reference()) {
            return Err(RepositoryError::Conflict(format!(
                "予約番号が既に使われています: {}",
                booking.reference()
            )));
        }
        if table.by_id.contains_key(&booking.id()) {
            return Err(RepositoryError::Conflict(format!(
                "予約IDが既に使われています: {}",
                booking.id()
            )));
        }
        table
            .by_reference
            .insert(booking.reference().clone(), booking.id());
        table.by_id.insert(booking.id(), booking.clone());
        Ok(())
    }

    async fn find_by_reference(
        &self,
        reference: &BookingReference,
    ) -> Result<Option<Booking>, RepositoryError> {
        let table = self.table.lock().await;
        Ok(table
            .by_reference
            .get(reference)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn exists_by_reference(
        &self,
        reference: &BookingReference,
    ) -> Result<bool, RepositoryError> {
        Ok(self.table.lock().await.by_reference.contains_key(reference))
    }

    async fn find_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.table.lock().await.by_id.get(&booking_id).cloned())
    }

    async fn find_by_contact_email(&self, email: &str) -> Result<Vec<Booking>, RepositoryError> {
        let table = self.table.lock().await;
        let mut bookings: Vec<Booking> = table
            .by_id
            .values()
            .filter(|booking| booking.contact().email() == email)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booked_at().cmp(&a.booked_at()));
        Ok(bookings)
    }

    async fn claim_cancellation(
        &self,
        booking_id: BookingId,
        claimed_at: DateTime<Utc>,
    ) -> Result<CancellationClaim, RepositoryError> {
        let mut table = self.table.lock().await;
        let status = table
            .by_id
            .get(&booking_id)
            .map(Booking::status)
            .ok_or_else(|| RepositoryError::NotFound(format!("予約が見つかりません: {}", booking_id)))?;
        if status == BookingStatus::Cancelled {
            return Ok(CancellationClaim::AlreadyCancelled);
        }
        if table.cancellation_claims.contains_key(&booking_id) {
            return Ok(CancellationClaim::InProgress);
        }
        if status != BookingStatus::Confirmed {
            return Err(RepositoryError::Conflict(format!(
                "予約は{}です: {}",
                status, booking_id
            )));
        }
        table.cancellation_claims.insert(booking_id, claimed_at);
        Ok(CancellationClaim::Claimed)
    }

    async fn release_cancellation_claim(
        &self,
        booking_id: BookingId,
    ) -> Result<(), RepositoryError> {
        self.table.lock().await.cancellation_claims.remove(&booking_id);
        Ok(())
    }

    async fn mark_cancelled(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let mut table = self.table.lock().await;
        let stored = table.by_id.get_mut(&booking.id()).ok_or_else(|| {
            RepositoryError::NotFound(format!("予約が見つかりません: {}", booking.reference()))
        })?;
        if stored.status() != BookingStatus::Confirmed {
            return Err(RepositoryError::Conflict(format!(
                "予約は既に{}です: {}",
                stored.status(),
                booking.reference()
            )));
        }
        if booking.status() != BookingStatus::Cancelled {
            return Err(RepositoryError::OperationFailed(
                "キャンセル済みでない予約は保存できません".to_string(),
            ));
        }
        *stored = booking.clone();
        table.cancellation_claims.remove(&booking.id());
        Ok(())
    }

    fn next_identity(&self) -> BookingId {
        BookingId::new()
    }
}
