// ============================
// crates/gatehouse/src/gate/layer.rs
// ============================
//! Tower embedding of the login gate.
//!
//! [`LoginGateLayer`] wraps an inner service (the downstream being
//! protected) in a [`LoginGateService`], which resolves the caller's
//! session from the request cookie, threads it into
//! [`LoginGate::intercept`], and either forwards to the inner service or
//! answers with the gate's page. Fresh sessions get a `Set-Cookie` on
//! whatever response goes out; fatal gate errors become the canned 500
//! page.
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use tracing::error;

use crate::auth::PasswordChecker;
use crate::error::CannedResponse;
use crate::session::{MemorySessions, SESSION_COOKIE};

use super::{Intercept, LoginGate};

/// Layer that guards a service with a [`LoginGate`].
#[derive(Clone)]
pub struct LoginGateLayer {
    gate: Arc<LoginGate>,
    sessions: MemorySessions,
}

impl LoginGateLayer {
    /// Guard with a fresh gate and a private in-memory session broker.
    pub fn new(identifier: impl Into<String>, checker: Arc<dyn PasswordChecker>) -> Self {
        Self {
            gate: Arc::new(LoginGate::new(identifier, checker)),
            sessions: MemorySessions::new(),
        }
    }

    /// Use a shared session broker instead of a private one, so several
    /// gates (or test code) can see the same sessions.
    #[must_use]
    pub fn with_sessions(mut self, sessions: MemorySessions) -> Self {
        self.sessions = sessions;
        self
    }
}

impl<S> Layer<S> for LoginGateLayer {
    type Service = LoginGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoginGateService {
            gate: self.gate.clone(),
            sessions: self.sessions.clone(),
            inner,
        }
    }
}

/// The service produced by [`LoginGateLayer`].
#[derive(Clone)]
pub struct LoginGateService<S> {
    gate: Arc<LoginGate>,
    sessions: MemorySessions,
    inner: S,
}

impl<S> Service<Request<Body>> for LoginGateService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let sessions = self.sessions.clone();
        // Swap the ready inner service out, leaving a clone for the next
        // call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let presented = session_reference(&request);
            let (session, issued) = sessions.acquire(presented.as_deref());

            let mut response = match gate.intercept(session.as_ref(), request).await {
                Ok(Intercept::Forward(request)) => inner.call(request).await?,
                Ok(Intercept::Page(page)) => page,
                Err(err) => {
                    error!(
                        identifier = %gate.identifier(),
                        error = %err,
                        "login gate failed, aborting request"
                    );
                    CannedResponse::InternalServerError.into_response()
                }
            };

            if let Some(reference) = issued {
                issue_session_cookie(&mut response, &reference);
            }

            Ok(response)
        })
    }
}

/// Pull the session reference out of the request's `Cookie` header.
fn session_reference(request: &Request<Body>) -> Option<String> {
    let header = request.headers().get(header::COOKIE)?;
    let raw = header.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn issue_session_cookie(response: &mut Response, reference: &str) {
    let cookie = format!("{SESSION_COOKIE}={reference}; Path=/; HttpOnly");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_cookie(cookie: &str) -> Request<Body> {
        Request::builder()
            .uri("/")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn finds_the_session_cookie_among_others() {
        let request =
            request_with_cookie("theme=dark; gatehouse-session=abc-123; lang=en");
        assert_eq!(session_reference(&request), Some("abc-123".to_string()));
    }

    #[test]
    fn ignores_unrelated_cookies() {
        let request = request_with_cookie("theme=dark; lang=en");
        assert_eq!(session_reference(&request), None);
    }

    #[test]
    fn no_cookie_header_means_no_reference() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(session_reference(&request), None);
    }
}
