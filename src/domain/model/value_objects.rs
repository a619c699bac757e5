use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// 便の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightId(Uuid);

impl FlightId {
    /// 新しい一意のFlightIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから FlightId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からFlightIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for FlightId {
    fn default() -> Self {
        Self::new()
    }
}

/// 予約の内部識別子（利用者向けの予約番号とは別物）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// 新しい一意のBookingIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから BookingId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からBookingIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

/// 通貨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Currency {
    /// インドルピー（既定）
    INR,
    /// 米ドル
    USD,
    /// ユーロ
    EUR,
    /// 英ポンド
    GBP,
    /// 日本円
    JPY,
}

impl Currency {
    /// ISO 4217 の通貨コード
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
        }
    }

    /// 通貨コードから作成（大文字小文字は区別しない）
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "JPY" => Ok(Currency::JPY),
            _ => Err(DomainError::InvalidValue(format!(
                "サポートされていない通貨: {}",
                code
            ))),
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::INR
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 金額を表す値オブジェクト
/// 金額は通貨の最小単位（パイサ、セントなど）の整数で保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// 金額と通貨コードから作成
    pub fn new(amount: i64, currency: String) -> Result<Self, DomainError> {
        let currency = Currency::from_code(&currency)?;
        Ok(Self { amount, currency })
    }

    /// 金額と通貨から作成
    pub fn of(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// インドルピーの金額を作成
    pub fn inr(amount: i64) -> Self {
        Self::of(amount, Currency::INR)
    }

    /// 指定通貨のゼロ
    pub fn zero(currency: Currency) -> Self {
        Self::of(0, currency)
    }

    /// 金額を取得
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// 通貨を文字列として取得
    pub fn currency(&self) -> String {
        self.currency.code().to_string()
    }

    /// 通貨を取得
    pub fn currency_kind(&self) -> Currency {
        self.currency
    }

    /// 金額を加算
    pub fn add(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch);
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| Self::overflow(self.amount, "+", other.amount))?;
        Ok(Money::of(amount, self.currency))
    }

    /// 金額を減算
    pub fn subtract(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch);
        }
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| Self::overflow(self.amount, "-", other.amount))?;
        Ok(Money::of(amount, self.currency))
    }

    /// 金額を乗算
    pub fn multiply(&self, factor: u32) -> Result<Money, DomainError> {
        let amount = self
            .amount
            .checked_mul(i64::from(factor))
            .ok_or_else(|| Self::overflow(self.amount, "×", i64::from(factor)))?;
        Ok(Money::of(amount, self.currency))
    }

    /// 百分率を適用（最小単位未満は切り捨て）
    /// 100を超える率は100%として扱うため、結果の絶対値は元の金額を超えない
    pub fn percentage(&self, percent: u32) -> Money {
        let applied = i128::from(self.amount) * i128::from(percent.min(100)) / 100;
        Money::of(applied as i64, self.currency)
    }

    fn overflow(lhs: i64, op: &str, rhs: i64) -> DomainError {
        DomainError::InvalidValue(format!("金額が表現できる範囲を超えました: {} {} {}", lhs, op, rhs))
    }
}

/// IATA形式の空港コード（英大文字3文字）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IataCode(String);

impl IataCode {
    /// 空港コードを作成
    /// 小文字は大文字に正規化する
    pub fn new(code: &str) -> Result<Self, DomainError> {
        let normalized = code.trim().to_ascii_uppercase();
        if normalized.len() != 3 || !normalized.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::InvalidValue(format!(
                "空港コードは英字3文字である必要があります: {}",
                code
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IataCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 路線（出発地と到着地）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    origin: IataCode,
    destination: IataCode,
}

impl Route {
    /// 路線を作成
    /// 出発地と到着地は異なる必要がある
    pub fn new(origin: IataCode, destination: IataCode) -> Result<Self, DomainError> {
        if origin == destination {
            return Err(DomainError::InvalidValue(
                "出発地と到着地が同じです".to_string(),
            ));
        }
        Ok(Self {
            origin,
            destination,
        })
    }

    /// 出発地を取得
    pub fn origin(&self) -> &IataCode {
        &self.origin
    }

    /// 到着地を取得
    pub fn destination(&self) -> &IataCode {
        &self.destination
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

/// 座席番号（列番号 + 座席記号、例: "12A"）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatNumber(String);

impl SeatNumber {
    /// 座席記号
    pub const LETTERS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];

    /// 座席番号を解析
    /// 形式: 1桁以上の列番号 + A〜Fの座席記号
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let normalized = value.trim().to_ascii_uppercase();
        if !Self::is_valid(&normalized) {
            return Err(DomainError::InvalidValue(format!(
                "無効な座席番号: {}",
                value
            )));
        }
        Ok(Self(normalized))
    }

    /// 列番号と座席記号から作成
    pub fn from_parts(row: u32, letter: char) -> Result<Self, DomainError> {
        Self::parse(&format!("{}{}", row, letter))
    }

    fn is_valid(value: &str) -> bool {
        let mut chars = value.chars();
        let letter = match chars.next_back() {
            Some(letter) => letter,
            None => return false,
        };
        let row = chars.as_str();
        Self::LETTERS.contains(&letter)
            && !row.is_empty()
            && row.chars().all(|c| c.is_ascii_digit())
            && row.parse::<u32>().map(|r| r > 0).unwrap_or(false)
    }

    /// 列番号を取得
    pub fn row(&self) -> u32 {
        self.0[..self.0.len() - 1].parse().unwrap_or(0)
    }

    /// 座席記号を取得
    pub fn letter(&self) -> char {
        self.0.chars().last().unwrap_or('A')
    }

    /// 座席記号から座席タイプを判定
    pub fn seat_type(&self) -> SeatType {
        SeatType::from_letter(self.letter())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 座席クラス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatClass {
    Economy,
    Business,
    First,
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class_str = match self {
            SeatClass::Economy => "ECONOMY",
            SeatClass::Business => "BUSINESS",
            SeatClass::First => "FIRST",
        };
        write!(f, "{}", class_str)
    }
}

impl SeatClass {
    /// 文字列からSeatClassを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "ECONOMY" => Ok(SeatClass::Economy),
            "BUSINESS" => Ok(SeatClass::Business),
            "FIRST" | "FIRST_CLASS" => Ok(SeatClass::First),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な座席クラス: {}",
                s
            ))),
        }
    }
}

/// 座席タイプ（座席記号の位置から決まる）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatType {
    Window,
    Aisle,
    Middle,
}

impl SeatType {
    /// 座席記号から座席タイプを判定
    /// A/F は窓側、C/D は通路側、それ以外は中央
    pub fn from_letter(letter: char) -> Self {
        match letter {
            'A' | 'F' => SeatType::Window,
            'C' | 'D' => SeatType::Aisle,
            _ => SeatType::Middle,
        }
    }
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_str = match self {
            SeatType::Window => "WINDOW",
            SeatType::Aisle => "AISLE",
            SeatType::Middle => "MIDDLE",
        };
        write!(f, "{}", type_str)
    }
}

/// 機内食の希望
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealPreference {
    Veg,
    NonVeg,
    None,
}

impl fmt::Display for MealPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meal_str = match self {
            MealPreference::Veg => "VEG",
            MealPreference::NonVeg => "NON_VEG",
            MealPreference::None => "NONE",
        };
        write!(f, "{}", meal_str)
    }
}

impl MealPreference {
    /// 文字列からMealPreferenceを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VEG" => Ok(MealPreference::Veg),
            "NON_VEG" => Ok(MealPreference::NonVeg),
            "NONE" | "" => Ok(MealPreference::None),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な機内食の希望: {}",
                s
            ))),
        }
    }
}

/// 予約のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    /// 保留中
    Pending,
    /// 確定済み（座席確保済み）
    Confirmed,
    /// キャンセル済み
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", status_str)
    }
}

impl BookingStatus {
    /// 文字列からBookingStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な予約ステータス: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_id_creation() {
        let id1 = FlightId::new();
        let id2 = FlightId::new();
        assert_ne!(id1, id2, "Each FlightId should be unique");
    }

    #[test]
    fn test_money_addition() {
        let money1 = Money::inr(1000);
        let money2 = Money::inr(500);
        let result = money1.add(&money2).unwrap();
        assert_eq!(result.amount(), 1500);
    }

    #[test]
    fn test_money_currency_mismatch() {
        let inr = Money::inr(1000);
        let usd = Money::of(1000, Currency::USD);
        assert_eq!(inr.add(&usd), Err(DomainError::CurrencyMismatch));
    }

    #[test]
    fn test_money_percentage_rounds_down() {
        assert_eq!(Money::inr(1000).percentage(75).amount(), 750);
        assert_eq!(Money::inr(1001).percentage(75).amount(), 750);
        assert_eq!(Money::inr(1000).percentage(0).amount(), 0);
        assert_eq!(Money::inr(1000).percentage(150).amount(), 1000);
    }

    #[test]
    fn test_money_arithmetic_overflow_is_an_error() {
        let large = Money::inr(i64::MAX / 50);
        assert!(matches!(large.multiply(51), Err(DomainError::InvalidValue(_))));
        assert_eq!(large.multiply(50).unwrap().amount(), i64::MAX / 50 * 50);
        assert!(matches!(
            Money::inr(i64::MAX).add(&Money::inr(1)),
            Err(DomainError::InvalidValue(_))
        ));
        assert!(matches!(
            Money::inr(i64::MIN).subtract(&Money::inr(1)),
            Err(DomainError::InvalidValue(_))
        ));

        // 百分率は中間結果が i64 を超えても正しく計算する
        let fare = large.amount();
        assert_eq!(large.percentage(75).amount(), fare / 100 * 75 + fare % 100 * 75 / 100);
        assert_eq!(Money::inr(i64::MAX).percentage(100).amount(), i64::MAX);
    }

    #[test]
    fn test_money_new_rejects_unknown_currency() {
        assert!(Money::new(100, "XYZ".to_string()).is_err());
        assert_eq!(Money::new(100, "usd".to_string()).unwrap().currency(), "USD");
    }

    #[test]
    fn test_iata_code_normalizes_case() {
        let code = IataCode::new("del").unwrap();
        assert_eq!(code.as_str(), "DEL");
    }

    #[test]
    fn test_iata_code_invalid() {
        assert!(IataCode::new("DE").is_err());
        assert!(IataCode::new("D3L").is_err());
    }

    #[test]
    fn test_route_display() {
        let route = Route::new(IataCode::new("DEL").unwrap(), IataCode::new("BOM").unwrap()).unwrap();
        assert_eq!(route.to_string(), "DEL-BOM");
    }

    #[test]
    fn test_route_same_airport_fails() {
        let del = IataCode::new("DEL").unwrap();
        assert!(Route::new(del.clone(), del).is_err());
    }

    #[test]
    fn test_seat_number_parse() {
        let seat = SeatNumber::parse("12a").unwrap();
        assert_eq!(seat.as_str(), "12A");
        assert_eq!(seat.row(), 12);
        assert_eq!(seat.letter(), 'A');
        assert_eq!(seat.seat_type(), SeatType::Window);
    }

    #[test]
    fn test_seat_number_invalid() {
        assert!(SeatNumber::parse("A12").is_err());
        assert!(SeatNumber::parse("12G").is_err());
        assert!(SeatNumber::parse("0A").is_err());
        assert!(SeatNumber::parse("").is_err());
        assert!(SeatNumber::parse("C").is_err());
    }

    #[test]
    fn test_seat_type_from_letter() {
        assert_eq!(SeatType::from_letter('F'), SeatType::Window);
        assert_eq!(SeatType::from_letter('C'), SeatType::Aisle);
        assert_eq!(SeatType::from_letter('D'), SeatType::Aisle);
        assert_eq!(SeatType::from_letter('B'), SeatType::Middle);
        assert_eq!(SeatType::from_letter('E'), SeatType::Middle);
    }

    #[test]
    fn test_booking_status_round_trip_through_string() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::from_string(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn test_meal_preference_from_string() {
        assert_eq!(MealPreference::from_string("non_veg").unwrap(), MealPreference::NonVeg);
        assert_eq!(MealPreference::from_string("").unwrap(), MealPreference::None);
        assert!(MealPreference::from_string("VEGAN").is_err());
    }
}
