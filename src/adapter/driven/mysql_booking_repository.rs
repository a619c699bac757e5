use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    Booking, BookingId, BookingStatus, Cancellation, Contact, FlightId, FlightReference,
    MealPreference, Money, Passenger, SeatNumber,
};
use crate::domain::port::{BookingRepository, CancellationClaim, RepositoryError};
use crate::domain::reference::BookingReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// MySQL関連のインポート
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

const BOOKING_COLUMNS: &str = r#"
    id, reference, flight_id, flight_number, route, contact_name, contact_email,
    total_fare_amount, currency, fare_estimated, status, journey_date, booked_at,
    cancelled_at, cancellation_reason, refund_amount
"#;

/// MySQL予約リポジトリ
/// MySQLデータベースを使用して予約を永続化する
/// 予約番号の一意性は bookings.reference の一意キーで保証する
#[derive(Clone)]
pub struct MySqlBookingRepository {
    pool: Pool<MySql>,
}

fn fetch_error(what: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::FetchFailed(format!("{}の解析に失敗しました: {}", what, e))
}

fn column<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(name).map_err(|e| fetch_error(name, e))
}

/// 占有できなかった予約の状態から占有の結果を判定する
/// CONFIRMEDのままなら別の処理が占有している（または直前まで占有していた）
fn unclaimed_outcome(status: &str) -> Result<CancellationClaim, RepositoryError> {
    match BookingStatus::from_string(status).map_err(|e| fetch_error("予約状態", e))? {
        BookingStatus::Cancelled => Ok(CancellationClaim::AlreadyCancelled),
        BookingStatus::Confirmed => Ok(CancellationClaim::InProgress),
        BookingStatus::Pending => Err(RepositoryError::Conflict(
            "確定していない予約は占有できません".to_string(),
        )),
    }
}

impl MySqlBookingRepository {
    /// 新しいMySQL予約リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    ///
    /// # Returns
    /// * MySqlBookingRepositoryのインスタンス
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// 予約の搭乗者を登録順に取得する
    async fn load_passengers(&self, booking_id: &str) -> Result<Vec<Passenger>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT name, gender, age, seat_number, meal_preference
            FROM booking_passengers
            WHERE booking_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("搭乗者の取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        let mut passengers = Vec::with_capacity(rows.len());
        for row in &rows {
            let seat_number = SeatNumber::parse(&column::<String>(row, "seat_number")?)
                .map_err(|e| fetch_error("座席番号", e))?;
            let meal_preference =
                MealPreference::from_string(&column::<String>(row, "meal_preference")?)
                    .map_err(|e| fetch_error("機内食の希望", e))?;
            passengers.push(Passenger::new(
                column(row, "name")?,
                column(row, "gender")?,
                column(row, "age")?,
                seat_number,
                meal_preference,
            ));
        }
        Ok(passengers)
    }

    /// bookingsテーブルの行と搭乗者から予約集約を再構築する
    async fn build_booking(&self, row: &MySqlRow) -> Result<Booking, RepositoryError> {
        let id_str: String = column(row, "id")?;
        let id = BookingId::from_string(&id_str).map_err(|e| fetch_error("予約ID", e))?;
        let reference = BookingReference::parse(&column::<String>(row, "reference")?)
            .map_err(|e| fetch_error("予約番号", e))?;
        let flight_id = FlightId::from_string(&column::<String>(row, "flight_id")?)
            .map_err(|e| fetch_error("便ID", e))?;
        let currency: String = column(row, "currency")?;
        let total_fare = Money::new(column(row, "total_fare_amount")?, currency.clone())
            .map_err(|e| fetch_error("運賃", e))?;
        let status = BookingStatus::from_string(&column::<String>(row, "status")?)
            .map_err(|e| fetch_error("予約ステータス", e))?;

        let cancellation = match (
            column::<Option<DateTime<Utc>>>(row, "cancelled_at")?,
            column::<Option<String>>(row, "cancellation_reason")?,
            column::<Option<i64>>(row, "refund_amount")?,
        ) {
            (Some(cancelled_at), Some(reason), Some(refund)) => Some(Cancellation {
                cancelled_at,
                reason,
                refund_amount: Money::new(refund, currency)
                    .map_err(|e| fetch_error("払い戻し額", e))?,
            }),
            _ => None,
        };

        let passengers = self.load_passengers(&id_str).await?;
        let seat_numbers = passengers.iter().map(|p| p.seat_number().clone()).collect();

        Booking::reconstruct(
            id,
            reference,
            FlightReference {
                flight_id,
                flight_number: column(row, "flight_number")?,
                route: column(row, "route")?,
                journey_date: column(row, "journey_date")?,
            },
            Contact::new(column(row, "contact_name")?, column(row, "contact_email")?),
            passengers,
            seat_numbers,
            total_fare,
            column(row, "fare_estimated")?,
            status,
            column(row, "booked_at")?,
            cancellation,
        )
        .map_err(|e| fetch_error("予約集約", e))
    }

    async fn find_one(&self, condition: &str, value: String) -> Result<Option<Booking>, RepositoryError> {
        let sql = format!("SELECT {} FROM bookings WHERE {} = ?", BOOKING_COLUMNS, condition);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("予約の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) => Ok(Some(self.build_booking(&row).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl BookingRepository for MySqlBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクション開始に失敗しました", e))
            .map_err(RepositoryError::from)?;

        let cancellation = booking.cancellation();
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, reference, flight_id, flight_number, route, contact_name, contact_email,
                total_fare_amount, currency, fare_estimated, status, journey_date, booked_at,
                cancelled_at, cancellation_reason, refund_amount
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(booking.id().to_string())
        .bind(booking.reference().as_str())
        .bind(booking.flight_id().to_string())
        .bind(booking.flight_number())
        .bind(booking.route())
        .bind(booking.contact().name())
        .bind(booking.contact().email())
        .bind(booking.total_fare().amount())
        .bind(booking.total_fare().currency())
        .bind(booking.is_fare_estimated())
        .bind(booking.status().to_string())
        .bind(booking.journey_date())
        .bind(booking.booked_at())
        .bind(cancellation.map(|c| c.cancelled_at))
        .bind(cancellation.map(|c| c.reason.clone()))
        .bind(cancellation.map(|c| c.refund_amount.amount()))
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from_sqlx("予約の保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        for (position, passenger) in booking.passengers().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO booking_passengers (
                    booking_id, position, name, gender, age, seat_number, meal_preference
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(booking.id().to_string())
            .bind(position as u32)
            .bind(passenger.name())
            .bind(passenger.gender())
            .bind(passenger.age())
            .bind(passenger.seat_number().as_str())
            .bind(passenger.meal_preference().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::from_sqlx("搭乗者の保存に失敗しました", e))
            .map_err(RepositoryError::from)?;
        }

        // トランザクションをコミット
        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクションのコミットに失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_by_reference(
        &self,
        reference: &BookingReference,
    ) -> Result<Option<Booking>, RepositoryError> {
        self.find_one("reference", reference.as_str().to_string()).await
    }

    async fn exists_by_reference(
        &self,
        reference: &BookingReference,
    ) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT 1 FROM bookings WHERE reference = ? LIMIT 1")
            .bind(reference.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("予約番号の照合に失敗しました", e))
            .map_err(RepositoryError::from)?;
        Ok(row.is_some())
    }

    async fn find_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        self.find_one("id", booking_id.to_string()).await
    }

    async fn find_by_contact_email(&self, email: &str) -> Result<Vec<Booking>, RepositoryError> {
        // 予約日時の降順で並べる
        let sql = format!(
            "SELECT {} FROM bookings WHERE contact_email = ? ORDER BY booked_at DESC",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("予約履歴の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        let mut bookings = Vec::with_capacity(rows.len());
        for row in &rows {
            bookings.push(self.build_booking(row).await?);
        }
        Ok(bookings)
    }

    async fn claim_cancellation(
        &self,
        booking_id: BookingId,
        claimed_at: DateTime<Utc>,
    ) -> Result<CancellationClaim, RepositoryError> {
        // CONFIRMEDで未占有の場合のみ占有する
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET cancellation_claimed_at = ?
            WHERE id = ? AND status = ? AND cancellation_claimed_at IS NULL
            "#,
        )
        .bind(claimed_at)
        .bind(booking_id.to_string())
        .bind(BookingStatus::Confirmed.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("キャンセル処理の占有に失敗しました", e))
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 1 {
            return Ok(CancellationClaim::Claimed);
        }

        let row = sqlx::query("SELECT status FROM bookings WHERE id = ?")
            .bind(booking_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("予約状態の取得に失敗しました", e))
            .map_err(RepositoryError::from)?
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("予約が見つかりません: {}", booking_id))
            })?;
        unclaimed_outcome(&column::<String>(&row, "status")?)
    }

    async fn release_cancellation_claim(
        &self,
        booking_id: BookingId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bookings SET cancellation_claimed_at = NULL WHERE id = ?")
            .bind(booking_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_sqlx("キャンセル処理の占有解除に失敗しました", e))
            .map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn mark_cancelled(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let cancellation = booking.cancellation().ok_or_else(|| {
            RepositoryError::OperationFailed(
                "キャンセル済みでない予約は保存できません".to_string(),
            )
        })?;

        // CONFIRMEDの場合のみ更新する
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = ?, cancelled_at = ?, cancellation_reason = ?, refund_amount = ?,
                cancellation_claimed_at = NULL
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(BookingStatus::Cancelled.to_string())
        .bind(cancellation.cancelled_at)
        .bind(&cancellation.reason)
        .bind(cancellation.refund_amount.amount())
        .bind(booking.id().to_string())
        .bind(BookingStatus::Confirmed.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx("キャンセルの保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find_by_id(booking.id()).await? {
            Some(stored) => Err(RepositoryError::Conflict(format!(
                "予約は既に{}です: {}",
                stored.status(),
                stored.reference()
            ))),
            None => Err(RepositoryError::NotFound(format!(
                "予約が見つかりません: {}",
                booking.reference()
            ))),
        }
    }

    fn next_identity(&self) -> BookingId {
        BookingId::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclaimed_outcome() {
        assert_eq!(
            unclaimed_outcome("CANCELLED").unwrap(),
            CancellationClaim::AlreadyCancelled
        );
        assert_eq!(unclaimed_outcome("CONFIRMED").unwrap(), CancellationClaim::InProgress);
        assert!(matches!(
            unclaimed_outcome("PENDING"),
            Err(RepositoryError::Conflict(_))
        ));
        assert!(matches!(
            unclaimed_outcome("SHIPPED"),
            Err(RepositoryError::FetchFailed(_))
        ));
    }
}
