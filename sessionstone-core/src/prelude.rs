//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use sessionstone_core::prelude::*;
//! ```

// === Configuration ===
pub use crate::config::SessionStoneConfig;
pub use crate::session::{SameSitePolicy, SecureMode, SessionConfig};

// === Middleware and session access ===
pub use crate::session::{Flash, Mark, Session, SessionHandle, SessionMiddleware, Value};

// === Stores ===
pub use crate::session::{
    JanitorConfig, MemoryStore, SqlStore, Store, StoreJanitor, StoreOptions,
};

// === Errors ===
pub use crate::session::{Result, SessionError};
