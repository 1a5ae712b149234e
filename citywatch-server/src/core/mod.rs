//! 核心模块 - 服务器配置、状态和路由装配
//!
//! - [`Config`] - 服务器配置
//! - [`ServerState`] - 服务器状态
//! - [`Server`] - HTTP 服务器
//! - [`build_app`] - 带中间件和状态的完整路由

pub mod config;
pub mod server;
pub mod state;

pub use config::{Config, ConfigError};
pub use server::{Server, build_app};
pub use state::ServerState;
