use crate::domain::error::DomainError;
use crate::domain::model::{FlightSnapshot, Money, SeatNumber};

/// 運賃の計算結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FareQuote {
    /// 基本運賃 × 人数
    pub base_total: Money,
    /// 座席追加料金の合計
    pub seat_charges: Money,
    /// 合計運賃
    pub total: Money,
    /// 座席単位の情報がなく、座席追加料金を概算したかどうか
    pub estimated: bool,
}

/// 運賃の内訳（チケット表示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FareBreakdown {
    pub base_fare: Money,
    pub taxes: Money,
    pub seat_charges: Money,
    pub meal_charges: Money,
    pub total_fare: Money,
}

impl FareBreakdown {
    /// 合計のみの内訳（便の情報が得られない場合）
    pub fn total_only(total_fare: Money) -> Self {
        let zero = Money::zero(total_fare.currency_kind());
        Self {
            base_fare: zero,
            taxes: zero,
            seat_charges: zero,
            meal_charges: zero,
            total_fare,
        }
    }

    /// 予約済みの合計運賃と便の基本運賃から内訳を復元する
    /// 合計運賃は予約時点の値を正とし、基本運賃との差を座席追加料金とみなす
    pub fn for_booking(total_fare: Money, base_fare: Money, passenger_count: u32) -> Self {
        let split = base_fare.multiply(passenger_count).and_then(|base_total| {
            total_fare
                .subtract(&base_total)
                .map(|seat_charges| (base_total, seat_charges))
        });
        match split {
            Ok((base_total, seat_charges)) if seat_charges.amount() >= 0 => Self {
                base_fare: base_total,
                taxes: Money::zero(total_fare.currency_kind()),
                seat_charges,
                meal_charges: Money::zero(total_fare.currency_kind()),
                total_fare,
            },
            _ => Self::total_only(total_fare),
        }
    }
}

/// 運賃計算
pub struct FareCalculator;

impl FareCalculator {
    /// 座席単位の情報がない場合に1席あたりに加算する概算の追加料金
    pub const ESTIMATED_SEAT_CHARGE: i64 = 200;

    /// 合計運賃を計算
    /// 基本運賃 × 人数 + 選択された各座席の追加料金
    ///
    /// # Arguments
    /// * `snapshot` - 座席確保に使った在庫スナップショット
    /// * `seat_numbers` - 選択された座席
    ///
    /// # Returns
    /// * `Ok(FareQuote)` - 計算結果
    /// * `Err(DomainError::UnknownSeats)` - スナップショットに存在しない座席が含まれる
    /// * `Err(DomainError::InvalidValue)` - 運賃が金額の範囲を超える
    pub fn total_fare(
        snapshot: &FlightSnapshot,
        seat_numbers: &[SeatNumber],
    ) -> Result<FareQuote, DomainError> {
        let currency = snapshot.currency();
        let passenger_count = seat_numbers.len() as u32;
        let base_total = snapshot.base_fare.multiply(passenger_count)?;

        let (seat_charges, estimated) = if snapshot.has_seat_detail() {
            let mut charges = Money::zero(currency);
            let mut unknown = Vec::new();
            for number in seat_numbers {
                match snapshot.seat(number) {
                    Some(seat) => charges = charges.add(&seat.extra_charge())?,
                    None => unknown.push(number.to_string()),
                }
            }
            if !unknown.is_empty() {
                return Err(DomainError::UnknownSeats(unknown));
            }
            (charges, false)
        } else {
            (
                Money::of(Self::ESTIMATED_SEAT_CHARGE, currency).multiply(passenger_count)?,
                true,
            )
        };

        Ok(FareQuote {
            base_total,
            seat_charges,
            total: base_total.add(&seat_charges)?,
            estimated,
        })
    }
}
