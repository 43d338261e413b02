//! Viewer 및 요청 컨텍스트
//!
//! # 개요
//!
//! 요청을 수행하는 주체(viewer)의 신원과 역할을 요청 단위 컨텍스트로 전달합니다.
//! 전역(ambient) 상태는 없으며, 모든 진입점은 `&Context`를 명시적으로 받습니다.
//!
//! # 모듈 구조
//!
//! - `identity`: Viewer, Role, TenantId
//! - `context`: 요청 컨텍스트 (copy-on-attach)

mod context;
mod identity;

pub use context::{CancelHandle, Context};
pub use identity::{Role, TenantId, Viewer};
