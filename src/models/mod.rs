//! 数据模型模块
//! 组织、用户、成员关系、审计与会话

pub mod audit;
pub mod auth;
pub mod membership;
pub mod organization;
pub mod user;
