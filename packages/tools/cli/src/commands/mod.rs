//! CLI 명령어 구현

pub mod check;
pub mod config;
pub mod demo;
pub mod eval;
