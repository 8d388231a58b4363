//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 登录与当前用户
//! - [`settings`] - 表单结构与回执模板
//! - [`records`] - 存储记录 (创建、入库、出库、导入导出)
//! - [`retailcrm`] - CRM 同步
//! - [`users`] - 用户管理

pub mod auth;
pub mod health;
pub mod records;
pub mod retailcrm;
pub mod settings;
pub mod users;
