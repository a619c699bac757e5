use crate::adapter::database_error::DatabaseError;
use crate::domain::error::DomainError;
use crate::domain::model::{
    Flight, FlightId, FlightSnapshot, IataCode, Money, Route, Seat, SeatClass, SeatNumber,
};
use crate::domain::port::{FlightInventory, InventoryError, InventoryGateway};
use crate::domain::search::FlightSearchCriteria;
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlConnection, Pool, QueryBuilder, Row};
use tracing::debug;

/// MySQL座席在庫
/// flightsテーブルとseatsテーブルで便の座席在庫を管理する
///
/// 座席の確保・解放は便の行を `SELECT ... FOR UPDATE` でロックしたトランザクション内で行う
/// 同じ便への更新はデータベースで直列化され、別便への更新は互いに待たない
#[derive(Clone)]
pub struct MySqlFlightInventory {
    pool: Pool<MySql>,
}

fn storage_error(what: &str, e: impl std::fmt::Display) -> InventoryError {
    InventoryError::Storage(format!("{}の解析に失敗しました: {}", what, e))
}

fn column<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, InventoryError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(name).map_err(|e| storage_error(name, e))
}

fn to_inventory_error(err: DomainError) -> InventoryError {
    match err {
        DomainError::SeatsUnavailable(seats) => InventoryError::SeatsUnavailable(seats),
        other => InventoryError::InvalidRequest(other.to_string()),
    }
}

impl MySqlFlightInventory {
    /// 新しいMySQL座席在庫を作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// 便と座席を読み込んで便集約を再構築する
    /// `for_update` が真の場合は便の行をロックする
    async fn load(
        conn: &mut MySqlConnection,
        flight_id: FlightId,
        for_update: bool,
    ) -> Result<(Flight, u64), InventoryError> {
        let mut sql = String::from(
            r#"
            SELECT id, flight_number, airline_name, aircraft_type, origin, destination,
                   departure, arrival, base_fare_amount, currency, version
            FROM flights
            WHERE id = ?
            "#,
        );
        if for_update {
            sql.push_str(" FOR UPDATE");
        }

        let row = sqlx::query(&sql)
            .bind(flight_id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| DatabaseError::from_sqlx("便の取得に失敗しました", e))?
            .ok_or(InventoryError::FlightNotFound(flight_id))?;

        let currency: String = column(&row, "currency")?;
        let origin = IataCode::new(&column::<String>(&row, "origin")?)
            .map_err(|e| storage_error("出発地", e))?;
        let destination = IataCode::new(&column::<String>(&row, "destination")?)
            .map_err(|e| storage_error("到着地", e))?;
        let route = Route::new(origin, destination).map_err(|e| storage_error("路線", e))?;
        let base_fare = Money::new(column(&row, "base_fare_amount")?, currency.clone())
            .map_err(|e| storage_error("基本運賃", e))?;
        let version: u64 = column(&row, "version")?;

        let seat_rows = sqlx::query(
            r#"
            SELECT seat_number, seat_class, available, extra_charge_amount
            FROM seats
            WHERE flight_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(flight_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DatabaseError::from_sqlx("座席の取得に失敗しました", e))?;

        let mut seats = Vec::with_capacity(seat_rows.len());
        for seat_row in &seat_rows {
            let number = SeatNumber::parse(&column::<String>(seat_row, "seat_number")?)
                .map_err(|e| storage_error("座席番号", e))?;
            let class = SeatClass::from_string(&column::<String>(seat_row, "seat_class")?)
                .map_err(|e| storage_error("座席クラス", e))?;
            let extra_charge =
                Money::new(column(seat_row, "extra_charge_amount")?, currency.clone())
                    .map_err(|e| storage_error("座席料金", e))?;
            seats.push(Seat::new(
                number,
                class,
                column(seat_row, "available")?,
                extra_charge,
            ));
        }

        let flight = Flight::reconstruct(
            flight_id,
            column(&row, "flight_number")?,
            column(&row, "airline_name")?,
            column(&row, "aircraft_type")?,
            route,
            column(&row, "departure")?,
            column(&row, "arrival")?,
            base_fare,
            seats,
        )
        .map_err(|e| storage_error("便集約", e))?;

        Ok((flight, version))
    }

    /// 座席の空席フラグと便の空席数を書き戻し、バージョンを進める
    async fn store_seats(
        conn: &mut MySqlConnection,
        flight: &Flight,
        seat_numbers: &[SeatNumber],
        available: bool,
    ) -> Result<(), InventoryError> {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new("UPDATE seats SET available = ");
        builder.push_bind(available);
        builder.push(" WHERE flight_id = ");
        builder.push_bind(flight.id().to_string());
        builder.push(" AND seat_number IN (");
        let mut separated = builder.separated(", ");
        for number in seat_numbers {
            separated.push_bind(number.as_str().to_string());
        }
        separated.push_unseparated(")");

        builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| DatabaseError::from_sqlx("座席の更新に失敗しました", e))?;

        sqlx::query(
            r#"
            UPDATE flights
            SET available_seats = ?, version = version + 1
            WHERE id = ?
            "#,
        )
        .bind(flight.available_seats())
        .bind(flight.id().to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| DatabaseError::from_sqlx("空席数の更新に失敗しました", e))?;

        Ok(())
    }

    /// 便をロックして座席を更新する
    /// `apply` が失敗した場合はロールバックし、何も変更しない
    async fn update<F>(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
        available: bool,
        apply: F,
    ) -> Result<(), InventoryError>
    where
        F: FnOnce(&mut Flight) -> Result<(), DomainError>,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクション開始に失敗しました", e))?;

        let (mut flight, version) = Self::load(&mut *tx, flight_id, true).await?;
        if let Err(err) = apply(&mut flight) {
            // ロールバックはトランザクションのドロップ時に行われる
            debug!(flight_id = %flight_id, version, error = %err, "座席在庫の更新を中止");
            return Err(to_inventory_error(err));
        }

        if !seat_numbers.is_empty() {
            Self::store_seats(&mut *tx, &flight, seat_numbers, available).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクションのコミットに失敗しました", e))?;
        Ok(())
    }
}

#[async_trait]
impl InventoryGateway for MySqlFlightInventory {
    async fn get_snapshot(&self, flight_id: FlightId) -> Result<FlightSnapshot, InventoryError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DatabaseError::from_sqlx("接続の取得に失敗しました", e))?;
        let (flight, version) = Self::load(&mut *conn, flight_id, false).await?;
        Ok(flight.snapshot(version))
    }

    async fn reserve(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
    ) -> Result<(), InventoryError> {
        self.update(flight_id, seat_numbers, false, |flight| {
            flight.reserve_seats(seat_numbers)
        })
        .await
    }

    async fn release(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
    ) -> Result<(), InventoryError> {
        self.update(flight_id, seat_numbers, true, |flight| {
            flight.release_seats(seat_numbers)
        })
        .await
    }
}

#[async_trait]
impl FlightInventory for MySqlFlightInventory {
    async fn add_flight(&self, flight: Flight) -> Result<FlightSnapshot, InventoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクション開始に失敗しました", e))?;

        sqlx::query(
            r#"
            INSERT INTO flights (
                id, flight_number, airline_name, aircraft_type, origin, destination,
                departure, arrival, total_seats, available_seats, base_fare_amount, currency, version
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(flight.id().to_string())
        .bind(flight.flight_number())
        .bind(flight.airline_name())
        .bind(flight.aircraft_type())
        .bind(flight.route().origin().as_str())
        .bind(flight.route().destination().as_str())
        .bind(flight.departure())
        .bind(flight.arrival())
        .bind(flight.total_seats())
        .bind(flight.available_seats())
        .bind(flight.base_fare().amount())
        .bind(flight.base_fare().currency())
        .execute(&mut *tx)
        .await
        .map_err(|e| match DatabaseError::from_sqlx("便の登録に失敗しました", e) {
            DatabaseError::UniqueViolation(_) => {
                InventoryError::InvalidRequest(format!("便は既に登録されています: {}", flight.id()))
            }
            other => other.into(),
        })?;

        if !flight.seats().is_empty() {
            let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
                "INSERT INTO seats (flight_id, seat_number, position, seat_class, available, extra_charge_amount) ",
            );
            builder.push_values(flight.seats().iter().enumerate(), |mut b, (position, seat)| {
                b.push_bind(flight.id().to_string())
                    .push_bind(seat.number().as_str().to_string())
                    .push_bind(position as u32)
                    .push_bind(seat.class().to_string())
                    .push_bind(seat.is_available())
                    .push_bind(seat.extra_charge().amount());
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::from_sqlx("座席の登録に失敗しました", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_sqlx("トランザクションのコミットに失敗しました", e))?;

        Ok(flight.snapshot(0))
    }

    async fn search(
        &self,
        criteria: &FlightSearchCriteria,
    ) -> Result<Vec<FlightSnapshot>, InventoryError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DatabaseError::from_sqlx("接続の取得に失敗しました", e))?;

        // 路線・出発日・空席数で候補を絞り、座席クラスは座席を読んで判定する
        let (start, end) = criteria.departure_window();
        let rows = sqlx::query(
            r#"
            SELECT id
            FROM flights
            WHERE origin = ? AND destination = ?
              AND departure >= ? AND departure < ?
              AND available_seats >= ?
            ORDER BY departure ASC
            "#,
        )
        .bind(criteria.route().origin().as_str())
        .bind(criteria.route().destination().as_str())
        .bind(start)
        .bind(end)
        .bind(criteria.passengers())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DatabaseError::from_sqlx("便の検索に失敗しました", e))?;

        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = column(row, "id")?;
            let flight_id = FlightId::from_string(&id).map_err(|e| storage_error("便ID", e))?;
            let (flight, version) = Self::load(&mut *conn, flight_id, false).await?;
            let snapshot = flight.snapshot(version);
            if criteria.matches(&snapshot) {
                found.push(snapshot);
            }
        }
        debug!(
            route = %criteria.route(),
            date = %criteria.departure_date(),
            found = found.len(),
            "便を検索しました"
        );
        Ok(found)
    }
}
