use crate::domain::error::DomainError;
use crate::domain::model::{FlightSnapshot, IataCode, Route, SeatClass};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// 1回の検索で指定できる最大人数
pub const MAX_SEARCH_PASSENGERS: u32 = 9;

/// 便の検索条件
/// 出発地・到着地・出発日（UTC）が一致し、人数分の空席がある便を探す
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightSearchCriteria {
    route: Route,
    departure_date: NaiveDate,
    passengers: u32,
    cabin_class: Option<SeatClass>,
}

impl FlightSearchCriteria {
    /// 検索条件を作成
    /// 事前条件:
    /// - 出発地と到着地が異なる
    /// - 出発日が今日以降
    /// - 人数が1〜MAX_SEARCH_PASSENGERS
    pub fn new(
        origin: IataCode,
        destination: IataCode,
        departure_date: NaiveDate,
        passengers: u32,
        cabin_class: Option<SeatClass>,
        today: NaiveDate,
    ) -> Result<Self, DomainError> {
        let route = Route::new(origin, destination)?;
        if departure_date < today {
            return Err(DomainError::InvalidValue(format!(
                "過去の日付は検索できません: {}",
                departure_date
            )));
        }
        if !(1..=MAX_SEARCH_PASSENGERS).contains(&passengers) {
            return Err(DomainError::InvalidValue(format!(
                "人数は1〜{}である必要があります: {}",
                MAX_SEARCH_PASSENGERS, passengers
            )));
        }

        Ok(Self {
            route,
            departure_date,
            passengers,
            cabin_class,
        })
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn departure_date(&self) -> NaiveDate {
        self.departure_date
    }

    pub fn passengers(&self) -> u32 {
        self.passengers
    }

    pub fn cabin_class(&self) -> Option<SeatClass> {
        self.cabin_class
    }

    /// 出発日の範囲（開始を含み、終了を含まない）
    pub fn departure_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.from_utc_datetime(&self.departure_date.and_time(NaiveTime::MIN));
        (start, start + Duration::days(1))
    }

    /// スナップショットが検索条件を満たすか
    /// 座席クラスの指定は座席単位の情報がある場合のみ判定する
    pub fn matches(&self, snapshot: &FlightSnapshot) -> bool {
        let (start, end) = self.departure_window();
        snapshot.route == self.route
            && snapshot.departure >= start
            && snapshot.departure < end
            && snapshot.available_seats >= self.passengers
            && self.has_cabin_seats(snapshot)
    }

    fn has_cabin_seats(&self, snapshot: &FlightSnapshot) -> bool {
        match (self.cabin_class, snapshot.seats.as_ref()) {
            (Some(class), Some(seats)) => {
                let free = seats
                    .iter()
                    .filter(|seat| seat.class() == class && seat.is_available())
                    .count() as u32;
                free >= self.passengers
            }
            _ => true,
        }
    }
}
