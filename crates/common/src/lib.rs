//! common - 通用类型

pub mod scope;
pub mod types;

pub use scope::*;
pub use types::*;
