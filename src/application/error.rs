use crate::domain::cancellation::CancellationRejection;
use crate::domain::error::DomainError;
use crate::domain::port::{InventoryError, RepositoryError};
use crate::domain::validator::ValidationError;

/// 呼び出し側が機械的に判別するためのエラー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidRequest,
    InvalidCancellation,
    ServiceUnavailable,
    Internal,
}

/// アプリケーション層のエラー型
/// ドメインエラー、リポジトリエラー、在庫エラーをラップする
#[derive(Debug)]
pub enum ApplicationError {
    /// ドメインエラー（ビジネスルール違反）
    DomainError(DomainError),
    /// リポジトリエラー（永続化の失敗）
    RepositoryError(RepositoryError),
    /// 予約要求の検証失敗
    Validation(ValidationError),
    /// 座席在庫の操作失敗
    Inventory(InventoryError),
    /// キャンセル不可
    Cancellation(CancellationRejection),
    /// エンティティが見つからない
    NotFound(String),
    /// 予約処理のタスクが異常終了した
    TaskAborted(String),
    /// 予約の保存に失敗し、座席の解放（補償）にも失敗した
    /// 予約のない座席が確保されたまま残っている
    ReservationLeaked {
        flight_id: String,
        seats: Vec<String>,
        persist_error: String,
        release_error: String,
    },
    /// 座席を解放した後にキャンセルの保存に失敗し、座席の再確保（補償）にも失敗した
    /// CONFIRMEDの予約に対応する座席が解放されたまま残っている
    CancellationLeaked {
        reference: String,
        flight_id: String,
        seats: Vec<String>,
        persist_error: String,
        reserve_error: String,
    },
}

impl ApplicationError {
    /// エラー種別を取得
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::DomainError(err) => match err {
                DomainError::SeatsUnavailable(_) => ErrorKind::Conflict,
                DomainError::InvalidBookingState(_) => ErrorKind::InvalidCancellation,
                _ => ErrorKind::InvalidRequest,
            },
            ApplicationError::RepositoryError(err) => match err {
                RepositoryError::Conflict(_) => ErrorKind::Conflict,
                RepositoryError::NotFound(_) => ErrorKind::NotFound,
                _ => ErrorKind::Internal,
            },
            ApplicationError::Validation(err) if err.is_seat_conflict() => ErrorKind::Conflict,
            ApplicationError::Validation(_) => ErrorKind::InvalidRequest,
            ApplicationError::Inventory(err) => match err {
                InventoryError::FlightNotFound(_) => ErrorKind::NotFound,
                InventoryError::SeatsUnavailable(_) => ErrorKind::Conflict,
                InventoryError::InvalidRequest(_) => ErrorKind::InvalidRequest,
                InventoryError::Unavailable(_) => ErrorKind::ServiceUnavailable,
                InventoryError::Storage(_) => ErrorKind::Internal,
            },
            ApplicationError::Cancellation(_) => ErrorKind::InvalidCancellation,
            ApplicationError::NotFound(_) => ErrorKind::NotFound,
            ApplicationError::TaskAborted(_) => ErrorKind::Internal,
            ApplicationError::ReservationLeaked { .. } => ErrorKind::Internal,
            ApplicationError::CancellationLeaked { .. } => ErrorKind::Internal,
        }
    }

    /// 座席が利用できないことによる失敗なら、その座席番号の一覧
    pub fn unavailable_seats(&self) -> Option<&[String]> {
        match self {
            ApplicationError::Validation(ValidationError::SeatsUnavailable(seats))
            | ApplicationError::Inventory(InventoryError::SeatsUnavailable(seats))
            | ApplicationError::DomainError(DomainError::SeatsUnavailable(seats)) => Some(seats),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationError::DomainError(err) => write!(f, "Domain error: {}", err),
            ApplicationError::RepositoryError(err) => write!(f, "Repository error: {}", err),
            ApplicationError::Validation(err) => write!(f, "Validation failed: {}", err),
            ApplicationError::Inventory(err) => write!(f, "Inventory error: {}", err),
            ApplicationError::Cancellation(err) => write!(f, "Cancellation rejected: {}", err),
            ApplicationError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApplicationError::TaskAborted(msg) => write!(f, "Saga task aborted: {}", msg),
            ApplicationError::ReservationLeaked {
                flight_id,
                seats,
                persist_error,
                release_error,
            } => write!(
                f,
                "Reservation leaked: seats [{}] on flight {} are held with no booking \
                 (persist failed: {}; release failed: {})",
                seats.join(", "),
                flight_id,
                persist_error,
                release_error
            ),
            ApplicationError::CancellationLeaked {
                reference,
                flight_id,
                seats,
                persist_error,
                reserve_error,
            } => write!(
                f,
                "Cancellation leaked: seats [{}] on flight {} were released but booking {} \
                 is still confirmed (persist failed: {}; re-reserve failed: {})",
                seats.join(", "),
                flight_id,
                reference,
                persist_error,
                reserve_error
            ),
        }
    }
}

impl std::error::Error for ApplicationError {}

// From実装でエラー変換を簡潔に
impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        ApplicationError::DomainError(err)
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        ApplicationError::RepositoryError(err)
    }
}

impl From<ValidationError> for ApplicationError {
    fn from(err: ValidationError) -> Self {
        ApplicationError::Validation(err)
    }
}

impl From<InventoryError> for ApplicationError {
    fn from(err: InventoryError) -> Self {
        ApplicationError::Inventory(err)
    }
}

impl From<CancellationRejection> for ApplicationError {
    fn from(err: CancellationRejection) -> Self {
        ApplicationError::Cancellation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::FlightId;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ApplicationError::from(InventoryError::Unavailable("down".to_string())).kind(),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(
            ApplicationError::from(InventoryError::FlightNotFound(FlightId::new())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ApplicationError::from(ValidationError::SeatsUnavailable(vec!["1A".to_string()]))
                .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ApplicationError::from(ValidationError::InvalidAge {
                passenger: "A".to_string(),
                age: 130
            })
            .kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            ApplicationError::from(CancellationRejection::PastJourney).kind(),
            ErrorKind::InvalidCancellation
        );
        assert_eq!(
            ApplicationError::from(RepositoryError::Conflict("dup".to_string())).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn test_unavailable_seats_enumerated() {
        let err = ApplicationError::from(InventoryError::SeatsUnavailable(vec![
            "1A".to_string(),
            "2B".to_string(),
        ]));
        assert_eq!(
            err.unavailable_seats(),
            Some(&["1A".to_string(), "2B".to_string()][..])
        );
        assert!(err.to_string().contains("1A, 2B"));
    }

    #[test]
    fn test_leak_is_internal_and_distinct() {
        let err = ApplicationError::ReservationLeaked {
            flight_id: "f".to_string(),
            seats: vec!["1A".to_string()],
            persist_error: "db down".to_string(),
            release_error: "inventory down".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().starts_with("Reservation leaked"));
    }
}
