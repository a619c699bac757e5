mod reference_service;
mod ticket_query_service;

pub use reference_service::ReferenceService;
pub use ticket_query_service::{BookingSummary, FlightSummary, TicketQueryService, TicketView};

use crate::application::ApplicationError;
use crate::domain::cancellation::{CancellationPolicy, CancellationRejection};
use crate::domain::fare::{FareCalculator, FareQuote};
use crate::domain::model::{
    Booking, BookingStatus, Contact, FlightReference, FlightSnapshot, Money, Passenger, SeatNumber,
};
use crate::domain::port::{
    BookingRepository, CancellationClaim, Clock, InventoryGateway, RepositoryError,
};
use crate::domain::reference::{BookingReference, ReferenceGenerator};
use crate::domain::validator::{BookingRequest, BookingValidator};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, instrument, warn, Instrument};

/// 理由が指定されなかった場合のキャンセル理由
pub const DEFAULT_CANCELLATION_REASON: &str = "Cancelled by user";

/// 予約作成の結果
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub reference: BookingReference,
    pub status: BookingStatus,
    pub total_fare: Money,
    /// 座席追加料金を概算した運賃かどうか
    pub fare_estimated: bool,
    pub passengers: Vec<Passenger>,
}

impl From<&Booking> for BookingConfirmation {
    fn from(booking: &Booking) -> Self {
        Self {
            reference: booking.reference().clone(),
            status: booking.status(),
            total_fare: booking.total_fare(),
            fare_estimated: booking.is_fare_estimated(),
            passengers: booking.passengers().to_vec(),
        }
    }
}

/// キャンセルの結果
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationReceipt {
    pub reference: BookingReference,
    pub refund_amount: Money,
    pub refund_percentage: u32,
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
}

fn seat_labels(seats: &[SeatNumber]) -> Vec<String> {
    seats.iter().map(|seat| seat.to_string()).collect()
}

/// サガの各ステップが共有する依存関係
/// 座席の確保から保存（または補償）までは呼び出し元が途中で離脱しても
/// 完了させるため、別タスクに移して実行する
struct SagaContext {
    booking_repository: Arc<dyn BookingRepository>,
    inventory: Arc<dyn InventoryGateway>,
    references: ReferenceService,
    clock: Arc<dyn Clock>,
}

impl SagaContext {
    /// 座席を確保してから予約を保存する
    /// 保存に失敗した場合は同じ座席を解放し、保存時のエラーを返す
    async fn reserve_and_persist(
        &self,
        request: BookingRequest,
        snapshot: FlightSnapshot,
        quote: FareQuote,
    ) -> Result<BookingConfirmation, ApplicationError> {
        let flight_id = request.flight_id;

        if let Err(err) = self.inventory.reserve(flight_id, &request.seat_numbers).await {
            info!(error = %err, "座席を確保できませんでした");
            return Err(err.into());
        }
        info!(state = "SEATS_RESERVED", "座席を確保しました");

        match self.persist_booking(&request, &snapshot, quote).await {
            Ok(booking) => {
                info!(
                    state = "PERSISTED",
                    reference = %booking.reference(),
                    total_fare = booking.total_fare().amount(),
                    fare_estimated = booking.is_fare_estimated(),
                    "予約を確定しました"
                );
                Ok(BookingConfirmation::from(&booking))
            }
            Err(persist_error) => {
                warn!(error = %persist_error, "予約の保存に失敗したため座席を解放します");
                match self.inventory.release(flight_id, &request.seat_numbers).await {
                    Ok(()) => {
                        warn!(state = "SEATS_RELEASED", "補償として座席を解放しました");
                        Err(persist_error)
                    }
                    Err(release_error) => {
                        error!(
                            state = "RESERVATION_LEAKED",
                            persist_error = %persist_error,
                            release_error = %release_error,
                            "座席の解放に失敗しました。予約のない座席が確保されたままです"
                        );
                        Err(ApplicationError::ReservationLeaked {
                            flight_id: flight_id.to_string(),
                            seats: seat_labels(&request.seat_numbers),
                            persist_error: persist_error.to_string(),
                            release_error: release_error.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// 予約を組み立てて保存する
    /// 保存時に予約番号が衝突した場合は番号を生成し直して再度保存する
    async fn persist_booking(
        &self,
        request: &BookingRequest,
        snapshot: &FlightSnapshot,
        quote: FareQuote,
    ) -> Result<Booking, ApplicationError> {
        let passengers: Vec<Passenger> = request
            .passengers
            .iter()
            .map(|p| {
                Passenger::new(
                    p.name.trim().to_string(),
                    p.gender.trim().to_ascii_uppercase(),
                    p.age,
                    p.seat_number.clone(),
                    p.meal_preference,
                )
            })
            .collect();
        let flight = FlightReference {
            flight_id: snapshot.flight_id,
            flight_number: snapshot.flight_number.clone(),
            route: snapshot.route.to_string(),
            journey_date: snapshot.departure,
        };
        let contact = Contact::new(
            request.contact_name.trim().to_string(),
            request.contact_email.clone(),
        );
        let booked_at = self.clock.now();

        loop {
            let reference = self.references.next_unique().await?;
            let booking = Booking::confirmed(
                self.booking_repository.next_identity(),
                reference,
                flight.clone(),
                contact.clone(),
                passengers.clone(),
                request.seat_numbers.clone(),
                quote.total,
                quote.estimated,
                booked_at,
            )?;

            match self.booking_repository.insert(&booking).await {
                Ok(()) => return Ok(booking),
                Err(RepositoryError::Conflict(msg)) => {
                    debug!(
                        reference = %booking.reference(),
                        conflict = %msg,
                        "保存時に予約番号が衝突したため生成し直します"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// キャンセル処理を占有し、座席を解放してからキャンセルを保存する
    /// 占有できなかった場合は座席に触れない。解放に失敗した場合は占有を解除し、予約はCONFIRMEDのまま残る
    async fn release_and_persist(
        &self,
        cancelled: Booking,
        receipt: CancellationReceipt,
    ) -> Result<CancellationReceipt, ApplicationError> {
        let flight_id = cancelled.flight_id();
        let seats = cancelled.seat_numbers().to_vec();

        match self
            .booking_repository
            .claim_cancellation(cancelled.id(), receipt.cancelled_at)
            .await?
        {
            CancellationClaim::Claimed => debug!(state = "CLAIMED", "キャンセル処理を占有しました"),
            CancellationClaim::AlreadyCancelled => {
                info!("別の処理で既にキャンセルされていました");
                return Err(CancellationRejection::AlreadyCancelled.into());
            }
            CancellationClaim::InProgress => {
                info!("別の処理がキャンセル中です");
                return Err(CancellationRejection::InProgress.into());
            }
        }

        if let Err(err) = self.inventory.release(flight_id, &seats).await {
            warn!(error = %err, "座席の解放に失敗しました。予約はCONFIRMEDのままです");
            self.abandon_claim(&cancelled).await;
            return Err(err.into());
        }
        info!(state = "SEATS_RELEASED", "座席を解放しました");

        match self.booking_repository.mark_cancelled(&cancelled).await {
            Ok(()) => {
                info!(
                    state = "CANCELLED",
                    refund_amount = receipt.refund_amount.amount(),
                    refund_percentage = receipt.refund_percentage,
                    "予約をキャンセルしました"
                );
                Ok(receipt)
            }
            Err(RepositoryError::Conflict(msg)) => {
                warn!(conflict = %msg, "占有中の予約が既にCONFIRMEDではありませんでした");
                Err(CancellationRejection::AlreadyCancelled.into())
            }
            Err(persist_error) => {
                warn!(error = %persist_error, "キャンセルの保存に失敗したため座席を再確保します");
                match self.inventory.reserve(flight_id, &seats).await {
                    Ok(()) => {
                        warn!(state = "SEATS_RESERVED", "補償として座席を再確保しました");
                        self.abandon_claim(&cancelled).await;
                        Err(persist_error.into())
                    }
                    Err(reserve_error) => {
                        // 占有を保ったまま終える。解消されるまで再試行はInProgressになる
                        error!(
                            state = "CANCELLATION_LEAKED",
                            persist_error = %persist_error,
                            reserve_error = %reserve_error,
                            "座席の再確保に失敗しました。確定済みの予約の座席が解放されたままです"
                        );
                        Err(ApplicationError::CancellationLeaked {
                            reference: cancelled.reference().to_string(),
                            flight_id: flight_id.to_string(),
                            seats: seat_labels(&seats),
                            persist_error: persist_error.to_string(),
                            reserve_error: reserve_error.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// キャンセルを保存せずに終える場合に占有を解除する
    async fn abandon_claim(&self, booking: &Booking) {
        if let Err(err) = self
            .booking_repository
            .release_cancellation_claim(booking.id())
            .await
        {
            error!(
                state = "CLAIM_STUCK",
                error = %err,
                "キャンセル処理の占有を解除できませんでした。この予約は占有が解除されるまでキャンセルできません"
            );
        }
    }
}

/// 処理中のキャンセルの登録
/// 同じ予約番号のキャンセルを同時に1つだけに制限する
struct CancellationGuard {
    in_flight: Arc<Mutex<HashSet<BookingReference>>>,
    reference: BookingReference,
}

impl CancellationGuard {
    fn acquire(
        in_flight: Arc<Mutex<HashSet<BookingReference>>>,
        reference: BookingReference,
    ) -> Result<Self, CancellationRejection> {
        let inserted = in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(reference.clone());
        if !inserted {
            return Err(CancellationRejection::InProgress);
        }
        Ok(Self {
            in_flight,
            reference,
        })
    }
}

impl Drop for CancellationGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.reference);
    }
}

/// 予約サガのコーディネーター
/// 予約の作成（検証 → 座席確保 → 保存 → 失敗時は補償）と
/// キャンセル（可否判定 → 払い戻し計算 → 座席解放 → 保存）を調整する
pub struct BookingSagaCoordinator {
    context: Arc<SagaContext>,
    policy: CancellationPolicy,
    cancellations_in_flight: Arc<Mutex<HashSet<BookingReference>>>,
}

impl BookingSagaCoordinator {
    /// 新しいコーディネーターを作成
    ///
    /// # Arguments
    /// * `booking_repository` - 予約リポジトリ
    /// * `inventory` - 座席在庫ゲートウェイ
    /// * `clock` - 時刻源
    /// * `policy` - キャンセルポリシー
    pub fn new(
        booking_repository: Arc<dyn BookingRepository>,
        inventory: Arc<dyn InventoryGateway>,
        clock: Arc<dyn Clock>,
        policy: CancellationPolicy,
    ) -> Self {
        Self::with_reference_generator(
            booking_repository,
            inventory,
            clock,
            policy,
            ReferenceGenerator::new(),
        )
    }

    /// 予約番号の生成器を指定してコーディネーターを作成
    pub fn with_reference_generator(
        booking_repository: Arc<dyn BookingRepository>,
        inventory: Arc<dyn InventoryGateway>,
        clock: Arc<dyn Clock>,
        policy: CancellationPolicy,
        generator: ReferenceGenerator,
    ) -> Self {
        let references = ReferenceService::new(booking_repository.clone(), generator);
        Self {
            context: Arc::new(SagaContext {
                booking_repository,
                inventory,
                references,
                clock,
            }),
            policy,
            cancellations_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn policy(&self) -> CancellationPolicy {
        self.policy
    }

    /// 予約を作成
    /// 座席を確保してから予約を保存する。予約が保存されていれば座席は必ず確保済み
    ///
    /// # Arguments
    /// * `request` - 予約作成の要求
    ///
    /// # Returns
    /// * `Ok(BookingConfirmation)` - 作成成功
    /// * `Err(ApplicationError)` - 作成失敗（座席は確保されていない。ReservationLeakedを除く）
    #[instrument(
        skip_all,
        fields(flight_id = %request.flight_id, seats = ?seat_labels(&request.seat_numbers))
    )]
    pub async fn create_booking(
        &self,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, ApplicationError> {
        let snapshot = self.context.inventory.get_snapshot(request.flight_id).await?;

        if let Err(err) = BookingValidator::validate(&request, &snapshot) {
            info!(reason = %err, "予約要求の検証に失敗しました");
            return Err(err.into());
        }
        let quote = FareCalculator::total_fare(&snapshot, &request.seat_numbers)?;
        debug!(
            state = "VALIDATED",
            total_fare = quote.total.amount(),
            fare_estimated = quote.estimated,
            "予約要求を検証しました"
        );

        let context = self.context.clone();
        let saga = tokio::spawn(
            async move { context.reserve_and_persist(request, snapshot, quote).await }
                .in_current_span(),
        );
        saga.await
            .map_err(|e| ApplicationError::TaskAborted(e.to_string()))?
    }

    /// 予約をキャンセル
    ///
    /// # Arguments
    /// * `reference` - 予約番号（大文字小文字は区別しない）
    /// * `reason` - キャンセル理由（省略時は既定の理由）
    ///
    /// # Returns
    /// * `Ok(CancellationReceipt)` - キャンセル成功
    /// * `Err(ApplicationError)` - キャンセル失敗（予約はCONFIRMEDのまま。CancellationLeakedを除く）
    #[instrument(skip_all, fields(reference = %reference))]
    pub async fn cancel_booking(
        &self,
        reference: &str,
        reason: Option<String>,
    ) -> Result<CancellationReceipt, ApplicationError> {
        let reference = BookingReference::parse(reference).map_err(|_| {
            ApplicationError::NotFound(format!("予約が見つかりません: {}", reference))
        })?;
        let guard = CancellationGuard::acquire(self.cancellations_in_flight.clone(), reference.clone())?;

        let booking = self
            .context
            .booking_repository
            .find_by_reference(&reference)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("予約が見つかりません: {}", reference))
            })?;

        let now = self.context.clock.now();
        let quote = match self.policy.evaluate(&booking, now) {
            Ok(quote) => quote,
            Err(rejection) => {
                info!(reason = %rejection, "キャンセルを受け付けられません");
                return Err(rejection.into());
            }
        };

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_CANCELLATION_REASON.to_string());
        let mut cancelled = booking;
        cancelled.cancel(now, reason.clone(), quote.refund_amount)?;
        let receipt = CancellationReceipt {
            reference,
            refund_amount: quote.refund_amount,
            refund_percentage: quote.percentage,
            cancelled_at: now,
            reason,
        };

        let context = self.context.clone();
        let saga = tokio::spawn(
            async move {
                let _guard = guard;
                context.release_and_persist(cancelled, receipt).await
            }
            .in_current_span(),
        );
        saga.await
            .map_err(|e| ApplicationError::TaskAborted(e.to_string()))?
    }
}
