// ドメイン層
// ビジネスルールを表現し、外部技術に依存しない

pub mod cancellation;
pub mod error;
pub mod fare;
pub mod model;
pub mod port;
pub mod reference;
pub mod search;
pub mod validator;
