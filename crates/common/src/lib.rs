//! Common functionality for the OpenWrap video ad client.
//!
//! This crate provides the request/response models, the communicator that
//! talks to the OpenWrap server, and the ads loader used by host
//! applications, plus the DFP ad tag builder that hands OpenWrap targeting
//! to the IMA player.
//!
//! # Modules
//!
//! - [`ad_tag`]: DFP VAST ad tag URLs carrying OpenWrap targeting
//! - [`ads_loader`]: Host-facing ad loader and its delegate
//! - [`communicator`]: Single request/response bridge to the OpenWrap server
//! - [`error`]: Error types and error handling utilities
//! - [`models`]: Ad request, ad response, user, app and global configuration
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and mocks
//! - [`transport`]: HTTP client abstraction and the `ureq` implementation
//! - [`util`]: Response validation, hashing and query string helpers

pub mod ad_tag;
pub mod ads_loader;
pub mod communicator;
pub mod error;
pub mod models;
pub mod settings;
pub mod test_support;
pub mod transport;
pub mod util;
