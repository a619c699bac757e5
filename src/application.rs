// アプリケーション層
// ユースケースを実装し、ドメイン層とアダプター層を仲介する

pub mod error;
pub mod service;

pub use error::{ApplicationError, ErrorKind};
