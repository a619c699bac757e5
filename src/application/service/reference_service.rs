use crate::domain::port::{BookingRepository, RepositoryError};
use crate::domain::reference::{BookingReference, ReferenceGenerator};
use std::sync::Arc;
use tracing::debug;

/// 予約番号サービス
/// 生成した予約番号をリポジトリで照合し、未使用のものを返す
pub struct ReferenceService {
    booking_repository: Arc<dyn BookingRepository>,
    generator: ReferenceGenerator,
}

impl ReferenceService {
    /// 新しい予約番号サービスを作成
    ///
    /// # Arguments
    /// * `booking_repository` - 予約番号の使用状況を照合するリポジトリ
    /// * `generator` - 予約番号の生成器
    pub fn new(booking_repository: Arc<dyn BookingRepository>, generator: ReferenceGenerator) -> Self {
        Self {
            booking_repository,
            generator,
        }
    }

    /// 未使用の予約番号を生成
    /// 使用済みの番号に当たった場合は回数の上限なく生成し直す
    ///
    /// 照合から保存までの間に他の要求が同じ番号を保存する可能性は残るため、
    /// 呼び出し側は保存時の `RepositoryError::Conflict` も再生成の契機として扱う
    pub async fn next_unique(&self) -> Result<BookingReference, RepositoryError> {
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            let candidate = self.generator.generate();
            if !self.booking_repository.exists_by_reference(&candidate).await? {
                if attempts > 1 {
                    debug!(reference = %candidate, attempts, "予約番号の衝突後に未使用の番号を取得");
                }
                return Ok(candidate);
            }
            debug!(reference = %candidate, attempts, "予約番号が使用済みのため再生成");
        }
    }
}
