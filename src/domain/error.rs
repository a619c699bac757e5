/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 無効な予約状態（例: キャンセル済みの予約を再度キャンセルしようとした）
    InvalidBookingState(String),
    /// 座席が利用できない（対象の座席番号を列挙する）
    SeatsUnavailable(Vec<String>),
    /// 便に存在しない座席
    UnknownSeats(Vec<String>),
    /// 予約の検証失敗（例: 乗客数と座席数の不一致）
    BookingValidation(String),
    /// 通貨の不一致
    CurrencyMismatch,
    /// 無効な値
    InvalidValue(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::InvalidBookingState(msg) => write!(f, "Invalid booking state: {}", msg),
            DomainError::SeatsUnavailable(seats) => {
                write!(f, "Seats not available: {}", seats.join(", "))
            }
            DomainError::UnknownSeats(seats) => {
                write!(f, "Seats do not exist on this flight: {}", seats.join(", "))
            }
            DomainError::BookingValidation(msg) => write!(f, "Booking validation failed: {}", msg),
            DomainError::CurrencyMismatch => write!(f, "Currency mismatch"),
            DomainError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
