//! Per-request session state and the end-of-request commit decision

use super::data::{encode_payload, SessionData, NEVER_RENEW};
use super::error::Result;
use super::flash::Flash;
use super::id::IdCodec;
use super::value::Value;
use super::StoreCoder;
use http::{Extensions, Request};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Action requested for the session at the end of the request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mark {
    /// Nothing requested
    #[default]
    None,
    /// Data changed and must be persisted
    Save,
    /// Issue a new identifier, retiring the old one after a grace window
    Rotate,
    /// Delete the record and clear the cookie
    Destroy,
}

/// One request's view of a session
///
/// Created by the middleware for every request and dropped afterwards. Only
/// the encoded [`SessionData`] outlives the request.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    old_id: Option<String>,
    pub(crate) data: SessionData,
    raw: Vec<u8>,
    mark: Mark,
    max_age: Duration,
    disable_renew: bool,
}

/// Store write produced by a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreOp {
    Set { key: String, value: Vec<u8>, ttl: Duration },
    Del { key: String },
}

/// What the response must carry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum CookieAction {
    #[default]
    Keep,
    Issue(String),
    Clear,
}

#[derive(Debug, Default)]
pub(crate) struct CommitPlan {
    pub cookie: CookieAction,
    pub ops: Vec<StoreOp>,
}

impl Session {
    /// Empty session with no identity
    pub fn new(max_age: Duration, disable_renew: bool) -> Self {
        Self {
            id: String::new(),
            old_id: None,
            data: SessionData::default(),
            raw: Vec::new(),
            mark: Mark::None,
            max_age,
            disable_renew,
        }
    }

    /// Adopt data loaded from the store for a cookie value
    pub(crate) fn restore(&mut self, id: String, raw: Vec<u8>, data: SessionData) {
        self.id = id;
        self.raw = raw;
        self.data = data;
    }

    /// True until the session has been persisted under an identifier
    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.values.insert(key.into(), value.into());
    }

    /// Remove a value, returning it if it was present
    pub fn del(&mut self, key: &str) -> Option<Value> {
        self.data.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.data.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.values.is_empty()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(Value::as_f32)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Read-once values for the next request
    pub fn flash(&mut self) -> Flash<'_> {
        Flash::new(&mut self.data.flash)
    }

    /// Request a new identifier for this session
    ///
    /// Use after a privilege change (e.g. login) to defeat session fixation.
    /// Overrides an earlier [`destroy`](Self::destroy) in the same request.
    pub fn rotate(&mut self) {
        self.mark = Mark::Rotate;
    }

    /// Request deletion of this session
    ///
    /// Overrides an earlier [`rotate`](Self::rotate) in the same request.
    pub fn destroy(&mut self) {
        self.mark = Mark::Destroy;
    }

    fn should_renew(&self, now: i64) -> bool {
        if self.disable_renew || self.max_age.is_zero() {
            return false;
        }
        match self.data.renewed_at {
            Some(NEVER_RENEW) => false,
            None | Some(0) => true,
            Some(ts) if ts < 0 => false,
            Some(ts) => {
                let elapsed = Duration::from_secs(u64::try_from(now - ts).unwrap_or(0));
                elapsed >= self.max_age / 2
            }
        }
    }

    /// Decide what the end of the request writes and whether a cookie is sent
    pub(crate) fn plan_commit(
        &mut self,
        ids: &IdCodec,
        coder: &dyn StoreCoder,
        grace_period: Duration,
        now: i64,
    ) -> Result<CommitPlan> {
        let mut plan = CommitPlan::default();

        if self.mark == Mark::Destroy {
            if !self.id.is_empty() {
                plan.ops.push(StoreOp::Del { key: ids.storage_key(&self.id) });
            }
            plan.cookie = CookieAction::Clear;
            return Ok(plan);
        }

        let encoded = encode_payload(coder, &self.data)?;
        let unchanged = encoded == self.raw;
        if unchanged && self.id.is_empty() {
            // never store sessions nobody wrote to
            return Ok(plan);
        }

        if !self.id.is_empty() && self.should_renew(now) {
            self.mark = Mark::Rotate;
        }

        match self.mark {
            Mark::Rotate => {
                if !self.id.is_empty() {
                    let old_id = std::mem::take(&mut self.id);
                    let key = ids.storage_key(&old_id);
                    if grace_period.is_zero() {
                        // no grace window: the old key goes away now
                        plan.ops.push(StoreOp::Del { key });
                    } else {
                        self.data.renewed_at = Some(NEVER_RENEW);
                        plan.ops.push(StoreOp::Set {
                            key,
                            value: encode_payload(coder, &self.data)?,
                            ttl: grace_period,
                        });
                    }
                    self.old_id = Some(old_id);
                }
            }
            Mark::None | Mark::Save if unchanged => return Ok(plan),
            Mark::None | Mark::Save => {
                self.mark = Mark::Save;
                if !self.id.is_empty() && matches!(self.data.renewed_at, None | Some(0)) {
                    self.data.renewed_at = Some(now);
                }
            }
            Mark::Destroy => unreachable!("destroy handled above"),
        }

        if self.id.is_empty() {
            self.id = ids.generate();
            self.data.renewed_at = Some(now);
            plan.cookie = CookieAction::Issue(self.id.clone());
        }

        let value = encode_payload(coder, &self.data)?;
        plan.ops.push(StoreOp::Set {
            key: ids.storage_key(&self.id),
            value: value.clone(),
            ttl: self.max_age,
        });
        self.raw = value;
        Ok(plan)
    }

    #[cfg(test)]
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    #[cfg(test)]
    pub(crate) fn old_id(&self) -> Option<&str> {
        self.old_id.as_deref()
    }
}

/// Shared handle attaching a [`Session`] to a request
///
/// The middleware inserts one into the request extensions; handlers retrieve
/// it with [`SessionHandle::from_request`]. Every clone refers to the same
/// session.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<Mutex<Session>>);

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// The session attached to `req`, if any
    pub fn from_request<B>(req: &Request<B>) -> Option<Self> {
        Self::from_extensions(req.extensions())
    }

    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        extensions.get::<Self>().cloned()
    }

    /// Lock the session; a panic in another holder does not poison it
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.lock())
    }
}
