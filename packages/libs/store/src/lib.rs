//! tnt-store: 정책 엔진으로 보호되는 인메모리 데이터 접근 계층
//!
//! 모든 호출은 데이터에 접근하기 전에 `PrivacyEngine::authorize`를 거칩니다.
//!
//! - `store`: 엔티티별 테이블과 CRUD 작업
//! - `demo`: 멀티 테넌트 예제 정책
//! - `error`: Store 에러 타입

pub mod demo;
pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{CreateRequest, Row, Store};
