//! SessionStone - Core
//!
//! Server-side HTTP sessions for hyper-based services.
//!
//! # Overview
//!
//! SessionStone issues an opaque random identifier to each client, keeps the
//! session data in a pluggable [`Store`](session::Store) under a keyed hash of
//! that identifier, and decides at the end of every request whether anything
//! has to be written:
//!
//! - untouched sessions cost nothing (no store call, no cookie)
//! - changed sessions are saved under their current identifier
//! - [`Session::rotate`](session::Session::rotate) issues a new identifier
//!   while the old one stays readable for a short grace period
//! - identifiers renew automatically after half their max age
//! - [`Session::destroy`](session::Session::destroy) deletes the record and
//!   clears the cookie
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sessionstone_core::prelude::*;
//!
//! let sessions = SessionMiddleware::new(
//!     SessionConfig::new().with_store(MemoryStore::new()).with_secret("change-me"),
//! )?;
//!
//! let resp = sessions
//!     .handle(req, |req| async move {
//!         let session = SessionHandle::from_request(&req).unwrap();
//!         session.with(|s| s.set("user_id", "alice"));
//!         Response::new(Full::new(Bytes::from("ok")))
//!     })
//!     .await;
//! ```
//!
//! # Architecture
//!
//! - [`session`] - ids, stores, the session entity and the middleware
//! - [`config`] - TOML file and environment configuration

pub mod config;
pub mod session;

pub mod prelude;

pub use config::SessionStoneConfig;
pub use session::{
    MemoryStore, Session, SessionConfig, SessionError, SessionHandle, SessionMiddleware, SqlStore,
    Store, StoreJanitor, Value,
};
