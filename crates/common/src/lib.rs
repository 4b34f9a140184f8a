//! Common utilities and shared types for dealdrop.
//!
//! This crate provides foundational components used across all dealdrop crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Cryptography**: RSA key parsing for push-provider service accounts
//! - **ID Generation**: ULID-based identifiers via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use dealdrop_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} -> {id}", config.server.host);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod id;

pub use config::{Config, FanoutFailurePolicy, PushConfig};
pub use crypto::{RsaKeypair, generate_rsa_keypair};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
