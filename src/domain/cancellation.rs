use crate::domain::error::DomainError;
use crate::domain::model::{Booking, BookingStatus, Money};
use chrono::{DateTime, Utc};

/// キャンセルを受け付けられない理由
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CancellationRejection {
    #[error("既にキャンセル済みの予約です")]
    AlreadyCancelled,

    #[error("確定していない予約はキャンセルできません")]
    NotConfirmed,

    #[error("この予約は別のキャンセル処理が進行中です")]
    InProgress,

    #[error("出発日時を過ぎた予約はキャンセルできません")]
    PastJourney,

    #[error("出発の{window_hours}時間前を過ぎているためキャンセルできません（残り{hours_remaining}時間）")]
    TooLate {
        hours_remaining: i64,
        window_hours: i64,
    },
}

/// 払い戻しの見積もり
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundQuote {
    /// 出発までの時間（時間単位、切り捨て）
    pub hours_until_departure: i64,
    /// 払い戻し率（%）
    pub percentage: u32,
    pub refund_amount: Money,
}

/// キャンセルポリシー
/// 出発までの時間からキャンセル可否と払い戻し率を決める
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    window_hours: i64,
}

impl CancellationPolicy {
    /// 既定のキャンセル受付期限（出発の何時間前まで）
    pub const DEFAULT_WINDOW_HOURS: i64 = 24;

    /// キャンセルポリシーを作成
    ///
    /// # Arguments
    /// * `window_hours` - 出発の何時間前までキャンセルを受け付けるか（0以上）
    pub fn new(window_hours: i64) -> Result<Self, DomainError> {
        if window_hours < 0 {
            return Err(DomainError::InvalidValue(format!(
                "キャンセル受付期限は0以上である必要があります: {}",
                window_hours
            )));
        }
        Ok(Self { window_hours })
    }

    pub fn window_hours(&self) -> i64 {
        self.window_hours
    }

    /// 出発までの時間に応じた払い戻し率
    /// 48時間以上前: 100%、24〜48時間前: 75%、それ以外: 0%
    pub fn refund_percentage(hours_until_departure: i64) -> u32 {
        match hours_until_departure {
            h if h >= 48 => 100,
            h if h >= 24 => 75,
            _ => 0,
        }
    }

    /// 予約をキャンセルできるか判定し、払い戻し額を見積もる
    ///
    /// # Arguments
    /// * `booking` - 対象の予約
    /// * `now` - 判定時刻
    ///
    /// # Returns
    /// * `Ok(RefundQuote)` - キャンセル可能
    /// * `Err(CancellationRejection)` - キャンセル不可とその理由
    pub fn evaluate(
        &self,
        booking: &Booking,
        now: DateTime<Utc>,
    ) -> Result<RefundQuote, CancellationRejection> {
        match booking.status() {
            BookingStatus::Confirmed => {}
            BookingStatus::Cancelled => return Err(CancellationRejection::AlreadyCancelled),
            BookingStatus::Pending => return Err(CancellationRejection::NotConfirmed),
        }

        let journey = booking.journey_date();
        if journey < now {
            return Err(CancellationRejection::PastJourney);
        }

        let hours_until_departure = (journey - now).num_hours();
        if hours_until_departure < self.window_hours {
            return Err(CancellationRejection::TooLate {
                hours_remaining: hours_until_departure,
                window_hours: self.window_hours,
            });
        }

        let percentage = Self::refund_percentage(hours_until_departure);
        Ok(RefundQuote {
            hours_until_departure,
            percentage,
            refund_amount: booking.total_fare().percentage(percentage),
        })
    }
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            window_hours: Self::DEFAULT_WINDOW_HOURS,
        }
    }
}
