// 便の座席予約サガ
// 予約レコードと座席在庫の整合性を、補償付きのサガで保つ

pub mod adapter;
pub mod application;
pub mod domain;

#[cfg(test)]
mod test_support;
