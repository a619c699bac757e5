// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::model::{Booking, BookingId, Flight, FlightId, FlightSnapshot, SeatNumber};
use crate::domain::reference::BookingReference;
use crate::domain::search::FlightSearchCriteria;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    ConnectionFailed(String),
    /// 操作に失敗
    OperationFailed(String),
    /// データの取得に失敗
    FetchFailed(String),
    /// 一意制約違反、または条件付き更新の前提が崩れていた
    Conflict(String),
    /// 更新対象が存在しない
    NotFound(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RepositoryError::OperationFailed(msg) => write!(f, "Operation failed: {}", msg),
            RepositoryError::FetchFailed(msg) => write!(f, "Fetch failed: {}", msg),
            RepositoryError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            RepositoryError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// キャンセル処理の占有を試みた結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationClaim {
    /// 占有できた。座席の解放とキャンセルの保存はこの処理だけが行う
    Claimed,
    /// 既にキャンセル済み
    AlreadyCancelled,
    /// 別の処理が占有している
    InProgress,
}

/// 予約リポジトリトレイト
/// 予約集約の永続化を抽象化する
/// 予約番号の一意性はリポジトリ自身が保証する
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// 新しい予約を保存する
    ///
    /// # Arguments
    /// * `booking` - 保存する予約
    ///
    /// # Returns
    /// * `Ok(())` - 保存成功
    /// * `Err(RepositoryError::Conflict)` - 同じ予約番号（またはID）の予約が既に存在する
    /// * `Err(RepositoryError)` - 保存失敗
    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError>;

    /// 予約番号で予約を検索する
    ///
    /// # Returns
    /// * `Ok(Some(Booking))` - 予約が見つかった
    /// * `Ok(None)` - 予約が見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_reference(
        &self,
        reference: &BookingReference,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// 予約番号が既に使われているか
    async fn exists_by_reference(
        &self,
        reference: &BookingReference,
    ) -> Result<bool, RepositoryError>;

    /// 予約IDで予約を検索する
    async fn find_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, RepositoryError>;

    /// 連絡先メールアドレスで予約を検索する
    /// 予約日時の降順で並べて返す
    ///
    /// # Arguments
    /// * `email` - 連絡先メールアドレス（小文字に正規化済み）
    async fn find_by_contact_email(&self, email: &str) -> Result<Vec<Booking>, RepositoryError>;

    /// 予約のキャンセル処理を占有する
    /// CONFIRMEDで、かつ他の処理が占有していない場合のみ占有できる（条件付き更新）
    /// 座席を解放する前に呼び、複数のインスタンスが同じ予約の座席を解放しないようにする
    ///
    /// # Arguments
    /// * `booking_id` - 対象の予約ID
    /// * `claimed_at` - 占有した時刻
    ///
    /// # Returns
    /// * `Ok(CancellationClaim)` - 占有の結果
    /// * `Err(RepositoryError::NotFound)` - 予約が存在しない
    /// * `Err(RepositoryError)` - 更新失敗
    async fn claim_cancellation(
        &self,
        booking_id: BookingId,
        claimed_at: DateTime<Utc>,
    ) -> Result<CancellationClaim, RepositoryError>;

    /// キャンセル処理の占有を解除する
    /// キャンセルを保存せずに処理を終えた場合に呼ぶ
    async fn release_cancellation_claim(&self, booking_id: BookingId)
        -> Result<(), RepositoryError>;

    /// キャンセル済みの予約を保存する
    /// 保存されている予約がCONFIRMEDの場合のみ更新し、占有も解除する（条件付き更新）
    ///
    /// # Arguments
    /// * `booking` - キャンセル済みの状態の予約
    ///
    /// # Returns
    /// * `Ok(())` - 更新成功
    /// * `Err(RepositoryError::Conflict)` - 既にCONFIRMEDでなくなっていた
    /// * `Err(RepositoryError::NotFound)` - 予約が存在しない
    /// * `Err(RepositoryError)` - 更新失敗
    async fn mark_cancelled(&self, booking: &Booking) -> Result<(), RepositoryError>;

    /// 新しい一意の予約IDを生成する
    ///
    /// # Returns
    /// * 新しい予約ID
    fn next_identity(&self) -> BookingId;
}

/// 座席在庫のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("便が見つかりません: {0}")]
    FlightNotFound(FlightId),

    #[error("座席が利用できません: {}", .0.join(", "))]
    SeatsUnavailable(Vec<String>),

    #[error("無効な在庫操作: {0}")]
    InvalidRequest(String),

    #[error("在庫サービスを利用できません: {0}")]
    Unavailable(String),

    #[error("在庫の保存に失敗しました: {0}")]
    Storage(String),
}

/// 座席在庫ゲートウェイ
/// 在庫が予約と同じストアにあるか、別サービスにあるかを問わず
/// 予約処理はこのトレイトを通じて座席在庫を読み書きする
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// 便の在庫スナップショットを取得する
    ///
    /// # Returns
    /// * `Ok(FlightSnapshot)` - 取得成功
    /// * `Err(InventoryError::FlightNotFound)` - 便が存在しない
    /// * `Err(InventoryError::Unavailable)` - 在庫サービスに到達できない
    async fn get_snapshot(&self, flight_id: FlightId) -> Result<FlightSnapshot, InventoryError>;

    /// 座席をまとめて確保する
    /// 全座席を確保するか、1席も確保しないかのどちらか
    ///
    /// # Returns
    /// * `Ok(())` - 全座席を確保した
    /// * `Err(InventoryError::SeatsUnavailable)` - 確保できなかった座席の一覧（何も変更されていない）
    /// * `Err(InventoryError::Unavailable)` - 在庫サービスに到達できない
    async fn reserve(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
    ) -> Result<(), InventoryError>;

    /// 座席をまとめて解放する
    /// 既に空席の座席は何もしない
    async fn release(
        &self,
        flight_id: FlightId,
        seat_numbers: &[SeatNumber],
    ) -> Result<(), InventoryError>;
}

/// 便の登録もできる在庫（在庫を自身で保持する実装）
#[async_trait]
pub trait FlightInventory: InventoryGateway {
    /// 便を登録する
    ///
    /// # Returns
    /// * `Ok(FlightSnapshot)` - 登録された便のスナップショット
    /// * `Err(InventoryError)` - 登録失敗
    async fn add_flight(&self, flight: Flight) -> Result<FlightSnapshot, InventoryError>;

    /// 検索条件に合う便を出発時刻の昇順で返す
    /// 該当する便がなければ空の一覧を返す
    async fn search(
        &self,
        criteria: &FlightSearchCriteria,
    ) -> Result<Vec<FlightSnapshot>, InventoryError>;
}

/// 時刻源
/// キャンセル可否の判定など時刻に依存する処理のために注入する
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
