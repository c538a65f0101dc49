//! 基础设施层

pub mod metrics;
pub mod notifier;
pub mod persistence;
