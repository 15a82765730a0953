use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use lazy_static::lazy_static;
use uuid::Uuid;

/// An authenticated dashboard session
///
/// Sessions live only in process memory; a server restart logs everyone out,
/// which is acceptable for a single-instance internal dashboard.
#[derive(Debug, Clone)]
pub struct Session {
    /// Who the session belongs to: `"shared-key"` or an SSO email
    pub identity: String,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

lazy_static! {
    /// Global sessions storage, keyed by opaque cookie token
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "obdash_session";

const SESSION_DURATION: u64 = 12 * 60 * 60; // 12 hours in seconds

/// Compare a submitted access key against the configured shared secret
///
/// Attempts are unlimited; there is no lockout. Rejections are logged by the
/// caller so repeated failures still leave a trace.
pub fn verify_access_key(configured: &str, attempt: &str) -> bool {
    !configured.is_empty() && configured == attempt.trim()
}

/// Check an SSO-provided email against the configured organization domain
///
/// The configured domain may be written with or without a leading `@`.
pub fn domain_allowed(allowed_domain: &str, email: &str) -> bool {
    let allowed = allowed_domain.trim().trim_start_matches('@');
    if allowed.is_empty() {
        return false;
    }
    match email.trim().rsplit_once('@') {
        Some((_, domain)) => domain.eq_ignore_ascii_case(allowed),
        None => false,
    }
}

/// Create a session and return its cookie token
pub fn create_session(identity: &str) -> String {
    let token = Uuid::new_v4().to_string();
    let session = Session {
        identity: identity.to_string(),
        expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
    };
    SESSIONS.write().unwrap().insert(token.clone(), session);
    token
}

/// Resolve a cookie token to the session identity, if still valid
///
/// Expired sessions are purged on lookup.
pub fn session_identity(token: &str) -> Option<String> {
    let expired = {
        let sessions = SESSIONS.read().unwrap();
        match sessions.get(token) {
            Some(session) if session.expires_at > SystemTime::now() => {
                return Some(session.identity.clone());
            }
            Some(_) => true,
            None => false,
        }
    };
    if expired {
        SESSIONS.write().unwrap().remove(token);
    }
    None
}

/// Drop a session (logout)
pub fn destroy_session(token: &str) {
    SESSIONS.write().unwrap().remove(token);
}
