//! Data models for OpenWrap ad requests and responses.

pub mod ad_request;
pub mod ad_response;
pub mod app_info;
pub mod configuration;
pub mod user_info;
