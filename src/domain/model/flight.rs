use crate::domain::error::DomainError;
use crate::domain::model::{Currency, FlightId, Money, Route, SeatClass, SeatNumber, SeatType};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// 便あたりの最大座席数
pub const MAX_SEATS_PER_FLIGHT: u32 = 500;

/// 基本運賃の上限（通貨の最小単位）
pub const MAX_BASE_FARE: i64 = 100_000_000;

/// 座席
/// 座席番号は便の中で一意であり、生成後に振り直されることはない
#[derive(Debug, Clone, PartialEq)]
pub struct Seat {
    number: SeatNumber,
    class: SeatClass,
    available: bool,
    extra_charge: Money,
}

impl Seat {
    /// 座席を作成
    pub fn new(number: SeatNumber, class: SeatClass, available: bool, extra_charge: Money) -> Self {
        Self {
            number,
            class,
            available,
            extra_charge,
        }
    }

    /// 座席番号を取得
    pub fn number(&self) -> &SeatNumber {
        &self.number
    }

    /// 座席クラスを取得
    pub fn class(&self) -> SeatClass {
        self.class
    }

    /// 座席タイプを取得（座席記号から導出）
    pub fn seat_type(&self) -> SeatType {
        self.number.seat_type()
    }

    /// 空席かどうか
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// 座席の追加料金を取得
    pub fn extra_charge(&self) -> Money {
        self.extra_charge
    }
}

/// 座席表の生成
/// 1列6席（A〜F）。1〜3列目はビジネス、それ以降はエコノミー
pub struct SeatMap;

impl SeatMap {
    const BUSINESS_ROWS: u32 = 3;
    const BUSINESS_PREMIUM: i64 = 2000;
    const WINDOW_PREMIUM: i64 = 200;
    const AISLE_PREMIUM: i64 = 100;

    /// 総座席数から座席表を生成する
    pub fn generate(total_seats: u32, currency: Currency) -> Result<Vec<Seat>, DomainError> {
        if total_seats == 0 || total_seats > MAX_SEATS_PER_FLIGHT {
            return Err(DomainError::InvalidValue(format!(
                "総座席数は1〜{}の範囲である必要があります: {}",
                MAX_SEATS_PER_FLIGHT, total_seats
            )));
        }

        let letters = SeatNumber::LETTERS;
        let mut seats = Vec::with_capacity(total_seats as usize);
        let mut row = 1;
        while (seats.len() as u32) < total_seats {
            for letter in letters {
                if seats.len() as u32 >= total_seats {
                    break;
                }
                let number = SeatNumber::from_parts(row, letter)?;
                let class = if row <= Self::BUSINESS_ROWS {
                    SeatClass::Business
                } else {
                    SeatClass::Economy
                };
                let charge = Self::extra_charge(class, number.seat_type(), currency);
                seats.push(Seat::new(number, class, true, charge));
            }
            row += 1;
        }

        Ok(seats)
    }

    /// 座席クラスと座席タイプから追加料金を計算
    fn extra_charge(class: SeatClass, seat_type: SeatType, currency: Currency) -> Money {
        let mut charge = 0;
        if matches!(class, SeatClass::Business | SeatClass::First) {
            charge += Self::BUSINESS_PREMIUM;
        }
        match seat_type {
            SeatType::Window => charge += Self::WINDOW_PREMIUM,
            SeatType::Aisle => charge += Self::AISLE_PREMIUM,
            SeatType::Middle => {}
        }
        Money::of(charge, currency)
    }
}

/// 便の登録内容
#[derive(Debug, Clone)]
pub struct FlightSchedule {
    pub flight_number: String,
    pub airline_name: String,
    pub aircraft_type: String,
    pub route: Route,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub total_seats: u32,
    pub base_fare: Money,
}

/// 便集約
/// 座席在庫を保持し、座席の確保・解放のみを通じて変更される
/// 不変条件: available_seats == 空席の数
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    id: FlightId,
    flight_number: String,
    airline_name: String,
    aircraft_type: String,
    route: Route,
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
    base_fare: Money,
    seats: Vec<Seat>,
    available_seats: u32,
}

impl Flight {
    /// 新しい便を登録し、座席表を生成する
    /// 事前条件:
    /// - 到着時刻が出発時刻より後で、所要時間が24時間以内
    /// - 基本運賃が0〜MAX_BASE_FARE
    pub fn schedule(id: FlightId, schedule: FlightSchedule) -> Result<Self, DomainError> {
        if schedule.arrival <= schedule.departure {
            return Err(DomainError::InvalidValue(
                "到着時刻は出発時刻より後である必要があります".to_string(),
            ));
        }
        if schedule.arrival - schedule.departure > Duration::hours(24) {
            return Err(DomainError::InvalidValue(
                "所要時間は24時間以内である必要があります".to_string(),
            ));
        }
        if !(0..=MAX_BASE_FARE).contains(&schedule.base_fare.amount()) {
            return Err(DomainError::InvalidValue(format!(
                "基本運賃は0〜{}の範囲である必要があります: {}",
                MAX_BASE_FARE,
                schedule.base_fare.amount()
            )));
        }
        if schedule.flight_number.trim().is_empty() {
            return Err(DomainError::InvalidValue(
                "便名は空にできません".to_string(),
            ));
        }

        let seats = SeatMap::generate(schedule.total_seats, schedule.base_fare.currency_kind())?;
        let available_seats = seats.len() as u32;

        Ok(Self {
            id,
            flight_number: schedule.flight_number.trim().to_ascii_uppercase(),
            airline_name: schedule.airline_name,
            aircraft_type: schedule.aircraft_type,
            route: schedule.route,
            departure: schedule.departure,
            arrival: schedule.arrival,
            base_fare: schedule.base_fare,
            seats,
            available_seats,
        })
    }

    /// 永続化されたデータから便を再構築
    /// 空席数は座席の状態から再計算する
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: FlightId,
        flight_number: String,
        airline_name: String,
        aircraft_type: String,
        route: Route,
        departure: DateTime<Utc>,
        arrival: DateTime<Utc>,
        base_fare: Money,
        seats: Vec<Seat>,
    ) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        for seat in &seats {
            if !seen.insert(seat.number().clone()) {
                return Err(DomainError::InvalidValue(format!(
                    "座席番号が重複しています: {}",
                    seat.number()
                )));
            }
        }
        let available_seats = seats.iter().filter(|seat| seat.is_available()).count() as u32;

        Ok(Self {
            id,
            flight_number,
            airline_name,
            aircraft_type,
            route,
            departure,
            arrival,
            base_fare,
            seats,
            available_seats,
        })
    }

    pub fn id(&self) -> FlightId {
        self.id
    }

    pub fn flight_number(&self) -> &str {
        &self.flight_number
    }

    pub fn airline_name(&self) -> &str {
        &self.airline_name
    }

    pub fn aircraft_type(&self) -> &str {
        &self.aircraft_type
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn departure(&self) -> DateTime<Utc> {
        self.departure
    }

    pub fn arrival(&self) -> DateTime<Utc> {
        self.arrival
    }

    pub fn base_fare(&self) -> Money {
        self.base_fare
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn total_seats(&self) -> u32 {
        self.seats.len() as u32
    }

    pub fn available_seats(&self) -> u32 {
        self.available_seats
    }

    /// 座席番号で座席を検索
    pub fn seat(&self, number: &SeatNumber) -> Option<&Seat> {
        self.seats.iter().find(|seat| &seat.number == number)
    }

    /// 座席をまとめて確保する
    /// 全座席が空席の場合のみ確保し、1席でも確保できなければ何も変更しない
    ///
    /// # Returns
    /// * `Ok(())` - 確保成功
    /// * `Err(DomainError::SeatsUnavailable)` - 確保できない座席（存在しない座席を含む）の一覧
    pub fn reserve_seats(&mut self, numbers: &[SeatNumber]) -> Result<(), DomainError> {
        Self::ensure_distinct(numbers)?;

        let offending: Vec<String> = numbers
            .iter()
            .filter(|number| !self.seat(number).map(Seat::is_available).unwrap_or(false))
            .map(|number| number.to_string())
            .collect();
        if !offending.is_empty() {
            return Err(DomainError::SeatsUnavailable(offending));
        }

        for seat in self.seats.iter_mut().filter(|seat| numbers.contains(&seat.number)) {
            seat.available = false;
        }
        self.available_seats -= numbers.len() as u32;
        debug_assert_eq!(self.available_seats, self.count_available());

        Ok(())
    }

    /// 座席をまとめて解放する
    /// 既に空席の座席は何もしない（再試行しても空席数は二重に増えない）
    pub fn release_seats(&mut self, numbers: &[SeatNumber]) -> Result<(), DomainError> {
        Self::ensure_distinct(numbers)?;

        let unknown: Vec<String> = numbers
            .iter()
            .filter(|number| self.seat(number).is_none())
            .map(|number| number.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(DomainError::UnknownSeats(unknown));
        }

        for seat in self.seats.iter_mut().filter(|seat| numbers.contains(&seat.number)) {
            if !seat.available {
                seat.available = true;
                self.available_seats += 1;
            }
        }
        debug_assert_eq!(self.available_seats, self.count_available());

        Ok(())
    }

    fn ensure_distinct(numbers: &[SeatNumber]) -> Result<(), DomainError> {
        let distinct: HashSet<&SeatNumber> = numbers.iter().collect();
        if distinct.len() != numbers.len() {
            return Err(DomainError::BookingValidation(
                "同じ座席が複数回指定されています".to_string(),
            ));
        }
        Ok(())
    }

    fn count_available(&self) -> u32 {
        self.seats.iter().filter(|seat| seat.available).count() as u32
    }

    /// 座席在庫のスナップショットを作成
    pub fn snapshot(&self, version: u64) -> FlightSnapshot {
        FlightSnapshot {
            flight_id: self.id,
            flight_number: self.flight_number.clone(),
            airline_name: self.airline_name.clone(),
            aircraft_type: self.aircraft_type.clone(),
            route: self.route.clone(),
            departure: self.departure,
            arrival: self.arrival,
            total_seats: self.total_seats(),
            available_seats: self.available_seats,
            base_fare: self.base_fare,
            seats: Some(self.seats.clone()),
            version,
        }
    }
}

/// 便の座席在庫のある時点での読み取り結果
/// 予約の検証と運賃計算に使う。変更時点では古くなっている可能性がある
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSnapshot {
    pub flight_id: FlightId,
    pub flight_number: String,
    pub airline_name: String,
    pub aircraft_type: String,
    pub route: Route,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub total_seats: u32,
    pub available_seats: u32,
    pub base_fare: Money,
    /// 座席単位の情報（便単位の情報しか得られない場合は None）
    pub seats: Option<Vec<Seat>>,
    pub version: u64,
}

impl FlightSnapshot {
    /// 座席単位の情報を持っているか
    pub fn has_seat_detail(&self) -> bool {
        self.seats.is_some()
    }

    /// 座席番号で座席を検索
    pub fn seat(&self, number: &SeatNumber) -> Option<&Seat> {
        self.seats
            .as_ref()
            .and_then(|seats| seats.iter().find(|seat| seat.number() == number))
    }

    pub fn currency(&self) -> Currency {
        self.base_fare.currency_kind()
    }

    /// 所要時間を "2h 15m" 形式で取得
    pub fn duration_label(&self) -> String {
        let duration = self.arrival - self.departure;
        format!("{}h {}m", duration.num_hours(), duration.num_minutes() % 60)
    }
}
