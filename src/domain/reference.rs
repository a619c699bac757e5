use crate::domain::error::DomainError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Mutex;

/// 予約番号（PNR）
/// 利用者向けの予約識別子。一度割り当てられたら変更されない
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookingReference(String);

impl BookingReference {
    /// 予約番号の接頭辞
    pub const PREFIX: &'static str = "PNR";
    /// 生成する符号部分の長さ
    pub const CODE_LENGTH: usize = 6;
    const ALPHABET: &'static [u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// 予約番号を生成
    /// 符号部分の各文字は36種の英数字から一様に選ぶ
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code: String = (0..Self::CODE_LENGTH)
            .map(|_| Self::ALPHABET[rng.gen_range(0..Self::ALPHABET.len())] as char)
            .collect();
        Self(format!("{}{}", Self::PREFIX, code))
    }

    /// 予約番号の形式として妥当か
    /// 接頭辞の後に6文字以上の英大文字・数字が続くものを受け付ける
    pub fn is_valid(code: &str) -> bool {
        match code.strip_prefix(Self::PREFIX) {
            Some(rest) => {
                rest.len() >= Self::CODE_LENGTH
                    && rest
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            }
            None => false,
        }
    }

    /// 利用者が入力した予約番号を解析
    /// 前後の空白を除き、大文字に正規化してから検証する
    pub fn parse(code: &str) -> Result<Self, DomainError> {
        let normalized = code.trim().to_ascii_uppercase();
        if !Self::is_valid(&normalized) {
            return Err(DomainError::InvalidValue(format!(
                "無効な予約番号: {}",
                code
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 予約番号の生成器
/// 乱数源を外から差し込めるようにし、テストでは固定シードを使う
pub struct ReferenceGenerator {
    rng: Mutex<StdRng>,
}

impl ReferenceGenerator {
    /// OSのエントロピーで初期化した生成器を作成
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// 指定した乱数源で生成器を作成
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// 固定シードの生成器を作成
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// 予約番号を1つ生成（一意性は保証しない）
    pub fn generate(&self) -> BookingReference {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        BookingReference::generate(&mut *rng)
    }
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
