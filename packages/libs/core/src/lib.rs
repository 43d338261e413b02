//! tnt-core: 프라이버시 정책 엔진 핵심 라이브러리
//!
//! 이 크레이트는 store와 CLI가 공유하는 viewer 컨텍스트, 정책 규칙, 평가 엔진을 제공합니다.
//!
//! # 모듈 구조
//!
//! - `viewer`: 요청 주체(viewer)와 요청 컨텍스트
//! - `privacy`: 규칙, 정책 집합, 엔진, 정책 문서(YAML)
//! - `config`: 엔진 설정 (환경변수)
//! - `error`: 공통 에러 타입

pub mod config;
pub mod error;
pub mod privacy;
pub mod viewer;

pub use config::EngineConfig;
pub use error::{Error, Result};
