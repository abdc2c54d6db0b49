//! Session middleware for HTTP requests
//!
//! Wraps a handler: loads the session named by the request cookie, attaches
//! it to the request, runs the handler and then commits whatever the handler
//! asked for (save, rotate, destroy). The commit runs even when the handler
//! panics; the panic is resumed afterwards.

use super::cookie::SessionCookie;
use super::data::{decode_payload, NEVER_RENEW};
use super::entity::{CookieAction, StoreOp};
use super::error::{Result, SessionError};
use super::id::IdCodec;
use super::store::{Store, StoreOptions};
use super::{Session, SessionConfig, SessionHandle, StoreCoder};
use chrono::Utc;
use futures::FutureExt;
use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue, Request, Response};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Session middleware
#[derive(Clone)]
pub struct SessionMiddleware {
    store: Arc<dyn Store>,
    coder: Arc<dyn StoreCoder>,
    ids: IdCodec,
    cookie: SessionCookie,
    config: SessionConfig,
}

impl SessionMiddleware {
    /// Create a new session middleware
    ///
    /// Fails when no store is configured, or when identifiers are hashed
    /// without a secret.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let store = config
            .store
            .clone()
            .ok_or_else(|| SessionError::Config("a session store is required".into()))?;

        if !config.disable_hash_id && config.secret.is_empty() {
            return Err(SessionError::Config(
                "a secret is required unless id hashing is disabled".into(),
            ));
        }

        let ids = IdCodec::new(config.entropy, config.secret.clone(), !config.disable_hash_id);
        let cookie = SessionCookie::new(config.cookie_config.clone());

        Ok(Self { store, coder: Arc::clone(&config.coder), ids, cookie, config })
    }

    /// Get the session store
    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run `next` with a session attached to the request
    pub async fn handle<B, R, F, Fut>(&self, mut req: Request<B>, next: F) -> Response<R>
    where
        F: FnOnce(Request<B>) -> Fut,
        Fut: Future<Output = Response<R>>,
    {
        let secure = self.cookie.is_secure(&req);
        let handle = SessionHandle::new(self.load(req.headers()).await);
        req.extensions_mut().insert(handle.clone());

        let outcome = AssertUnwindSafe(async move { next(req).await }).catch_unwind().await;
        let set_cookie = self.commit(&handle, secure).await;

        match outcome {
            Ok(mut resp) => {
                if let Some(value) = set_cookie {
                    resp.headers_mut().append(SET_COOKIE, value);
                }
                resp
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Load the session named by the cookie in `headers`
    ///
    /// Anything short of a decodable live record yields a fresh session.
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        let mut session = Session::new(self.config.max_age(), self.config.disable_renew);

        let Some(id) = self.cookie.extract_from_headers(headers) else {
            return session;
        };

        let opts = StoreOptions::new(self.config.max_age());
        let key = self.ids.storage_key(&id);
        match self.bounded(self.store.get(&key, &opts)).await {
            Ok(raw) => match decode_payload(self.coder.as_ref(), &raw) {
                Ok(data) => {
                    // retiring records keep their grace TTL
                    if self.config.rolling && data.renewed_at != Some(NEVER_RENEW) {
                        if let Err(e) = self.bounded(self.store.touch(&key, &opts)).await {
                            log::warn!("Failed to extend session expiry: {}", e);
                        }
                    }
                    session.restore(id, raw, data);
                }
                Err(e) => log::warn!("Discarding undecodable session payload: {}", e),
            },
            Err(e) if e.is_not_found() => {
                log::debug!("Session cookie does not name a live session");
            }
            Err(e) => log::warn!("Session lookup failed, starting fresh: {}", e),
        }

        session
    }

    /// Persist the session and return the Set-Cookie value to send, if any
    ///
    /// Store failures are logged; the response is never failed because of them.
    pub async fn commit(&self, handle: &SessionHandle, secure: bool) -> Option<HeaderValue> {
        let now = Utc::now().timestamp();
        let planned = handle.lock().plan_commit(
            &self.ids,
            self.coder.as_ref(),
            self.config.grace_period,
            now,
        );
        let plan = match planned {
            Ok(plan) => plan,
            Err(e) => {
                log::error!("Failed to encode session: {}", e);
                return None;
            }
        };

        for op in plan.ops {
            let result = match op {
                StoreOp::Set { key, value, ttl } => {
                    self.bounded(self.store.set(&key, value, &StoreOptions::new(ttl))).await
                }
                StoreOp::Del { key } => self.bounded(self.store.del(&key)).await,
            };
            if let Err(e) = result {
                log::error!("Failed to persist session: {}", e);
            }
        }

        let cookie = match plan.cookie {
            CookieAction::Keep => return None,
            CookieAction::Issue(id) => self.cookie.build_set_cookie(&id, secure),
            CookieAction::Clear => self.cookie.build_delete_cookie(secure),
        };
        match HeaderValue::from_str(&cookie) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Invalid session cookie header: {}", e);
                None
            }
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.store_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| SessionError::Timeout(limit))?,
            None => fut.await,
        }
    }
}
