// ============================
// crates/gatehouse/src/gate/mod.rs
// ============================
//! The login gate: a request filter that forwards authenticated sessions
//! downstream and walks everyone else through a credential challenge.

mod form;
pub mod layer;

pub use layer::{LoginGateLayer, LoginGateService};

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::{Html, IntoResponse, Response},
};
use metrics::counter;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use gatehouse_common::{
    auth_flag_key, password_field, username_field, xsrf_field, MSG_BAD_REQUEST,
    MSG_INVALID_CREDENTIALS,
};

use crate::auth::{token, CredentialError, PasswordChecker};
use crate::error::GateError;
use crate::session::{SessionError, SessionStore, SessionValue};

/// Upper bound on a login form body. Anything larger is not a login form.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// What the gate decided to do with one request.
pub enum Intercept {
    /// The caller is (or just became) authenticated: hand the request to
    /// the downstream handler.
    Forward(Request<Body>),
    /// The caller is not authenticated: respond with this page instead.
    Page(Response),
}

/// The login state machine for one protected resource.
///
/// A gate is an identifier (which namespaces its session keys and form
/// fields, so several gates can share one session) plus a
/// [`PasswordChecker`] capability. The downstream being protected is
/// supplied where the gate is embedded — see [`LoginGateLayer`] for the
/// tower wiring.
///
/// The per-request protocol, in order: an authenticated session forwards
/// unconditionally; a session with no anti-forgery token gets a fresh
/// challenge; everything else is treated as a submission and validated
/// (parsable body, matching single-valued token, exactly one username and
/// password, credential check), with every failure re-rendering the
/// challenge under a freshly rotated token. The flag write on success and
/// the token rotation on every render are the only session mutations.
pub struct LoginGate {
    identifier: String,
    checker: Arc<dyn PasswordChecker>,
}

enum Submission {
    Accepted { username: String },
    Rejected(&'static str),
}

impl LoginGate {
    pub fn new(identifier: impl Into<String>, checker: Arc<dyn PasswordChecker>) -> Self {
        Self {
            identifier: identifier.into(),
            checker,
        }
    }

    /// The identifier namespacing this gate's session keys and fields.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Run one request through the state machine.
    ///
    /// `session` is the calling client's session, resolved by the
    /// embedder. Validation failures are handled internally and come back
    /// as [`Intercept::Page`]; an `Err` means infrastructure trouble and
    /// the request must be aborted with a generic error response.
    pub async fn intercept(
        &self,
        session: &dyn SessionStore,
        request: Request<Body>,
    ) -> Result<Intercept, GateError> {
        let auth_key = auth_flag_key(&self.identifier);

        match session.get_value(&auth_key).await {
            Ok(SessionValue::Bool(true)) => {
                debug!(identifier = %self.identifier, "passing authenticated request downstream");
                return Ok(Intercept::Forward(request));
            }
            Err(SessionError::NoSuchValue) => {}
            Ok(unexpected) => {
                // This gate only ever writes `true`; anything else means
                // the session entry was corrupted by something else.
                return Err(GateError::Internal(format!(
                    "unexpected value under {auth_key}: {unexpected:?}"
                )));
            }
            Err(err) => return Err(err.into()),
        }

        let xsrf_key = xsrf_field(&self.identifier);
        let stored_token = match session.get_value(&xsrf_key).await {
            Ok(SessionValue::Text(token)) => Some(token),
            Ok(unexpected) => {
                return Err(GateError::Internal(format!(
                    "unexpected value under {xsrf_key}: {unexpected:?}"
                )));
            }
            Err(SessionError::NoSuchValue) => {
                info!(identifier = %self.identifier, "first visit, rendering login challenge");
                None
            }
            Err(err) => return Err(err.into()),
        };

        let path = request.uri().path().to_string();
        let mut failure = None;

        if let Some(stored) = stored_token {
            let (request, fields) = buffer_form(request).await;
            match fields {
                Err(parse_error) => {
                    warn!(
                        identifier = %self.identifier,
                        error = %parse_error,
                        "malformed login form body"
                    );
                    failure = Some(MSG_BAD_REQUEST);
                }
                Ok(fields) => match self.evaluate(&stored, &fields).await? {
                    Submission::Accepted { username } => {
                        session
                            .set_value(&auth_key, SessionValue::Bool(true))
                            .await?;
                        info!(identifier = %self.identifier, %username, "login successful");
                        counter!("gatehouse.logins.accepted").increment(1);
                        return Ok(Intercept::Forward(request));
                    }
                    Submission::Rejected(message) => {
                        counter!("gatehouse.logins.rejected").increment(1);
                        failure = Some(message);
                    }
                },
            }
        }

        // Rotate the token before rendering: each challenge invalidates
        // the previous token, so a token is good for one submission.
        let next_token = token::xsrf_token().map_err(|_| GateError::Entropy)?;
        session
            .set_value(&xsrf_key, SessionValue::Text(next_token.clone()))
            .await?;

        Ok(Intercept::Page(self.challenge_page(
            &path,
            &next_token,
            failure,
        )))
    }

    /// Validate one submission against the stored token, in protocol
    /// order; the first failure wins. Only an unexpected checker error
    /// escapes as `Err`.
    async fn evaluate(
        &self,
        stored_token: &str,
        fields: &form::FieldMap,
    ) -> Result<Submission, GateError> {
        let Some(presented) = fields.get(&xsrf_field(&self.identifier)) else {
            info!(identifier = %self.identifier, "submission is missing the anti-forgery token");
            return Ok(Submission::Rejected(MSG_INVALID_CREDENTIALS));
        };
        // An absent, repeated, or mismatched token all read the same to
        // the client.
        if presented.len() != 1 || !tokens_match(stored_token, &presented[0]) {
            info!(identifier = %self.identifier, "submission carried a bad anti-forgery token");
            return Ok(Submission::Rejected(MSG_INVALID_CREDENTIALS));
        }

        let Some(usernames) = fields.get(&username_field(&self.identifier)) else {
            info!(identifier = %self.identifier, "submission is missing the username field");
            return Ok(Submission::Rejected(MSG_INVALID_CREDENTIALS));
        };
        let Some(passwords) = fields.get(&password_field(&self.identifier)) else {
            info!(identifier = %self.identifier, "submission is missing the password field");
            return Ok(Submission::Rejected(MSG_INVALID_CREDENTIALS));
        };
        if usernames.len() != 1 || passwords.len() != 1 {
            info!(identifier = %self.identifier, "submission repeats the username or password field");
            return Ok(Submission::Rejected(MSG_BAD_REQUEST));
        }

        match self
            .checker
            .check_password(&usernames[0], &passwords[0])
            .await
        {
            Ok(()) => Ok(Submission::Accepted {
                username: usernames[0].clone(),
            }),
            // Unknown identifier and wrong password are reported
            // identically.
            Err(CredentialError::NoSuchIdentifier) => {
                info!(identifier = %self.identifier, "submission named an unknown identifier");
                Ok(Submission::Rejected(MSG_INVALID_CREDENTIALS))
            }
            Err(CredentialError::BadPassword) => {
                info!(identifier = %self.identifier, "submission carried a wrong password");
                Ok(Submission::Rejected(MSG_INVALID_CREDENTIALS))
            }
            Err(unexpected) => Err(GateError::Credential(unexpected)),
        }
    }

    /// Render the login form. The field names, the hidden token field and
    /// the POST target are load-bearing: the next submission is validated
    /// against exactly this shape.
    fn challenge_page(&self, path: &str, token: &str, failure: Option<&str>) -> Response {
        let error_markup = failure
            .map(|message| format!("<label class=\"error\">{message}</label><br />"))
            .unwrap_or_default();

        let markup = format!(
            "<html><head><title>Gatehouse Login</title></head><body>\
             <form method=\"POST\" action=\"{path}\"><fieldset>\
             <legend>Gatehouse Login</legend>{error_markup}\
             <label for=\"username\">Username:</label>\
             <input type=\"text\" name=\"{username}\" id=\"username\" />\
             <label for=\"password\">Password:</label>\
             <input type=\"password\" name=\"{password}\" id=\"password\" />\
             <input type=\"hidden\" name=\"{xsrf}\" value=\"{token}\" />\
             <input type=\"submit\" value=\"Login\"/>\
             </fieldset></form></body></html>",
            username = username_field(&self.identifier),
            password = password_field(&self.identifier),
            xsrf = xsrf_field(&self.identifier),
        );

        Html(markup).into_response()
    }
}

fn tokens_match(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

fn is_form_submission(request: &Request<Body>) -> bool {
    request.method() == Method::POST
        && request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .split(';')
                    .next()
                    .unwrap_or("")
                    .trim()
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            })
            .unwrap_or(false)
}

/// Buffer and parse a form submission, handing back a request whose body
/// is intact so it can still be forwarded downstream. Non-submissions
/// (wrong method or content type) pass through untouched with an empty
/// field map, and fail the token check downstream of here.
async fn buffer_form(
    request: Request<Body>,
) -> (Request<Body>, Result<form::FieldMap, form::FormError>) {
    if !is_form_submission(&request) {
        return (request, Ok(form::FieldMap::new()));
    }

    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => {
            let fields = form::parse(&bytes);
            (Request::from_parts(parts, Body::from(bytes)), fields)
        }
        Err(_) => (
            Request::from_parts(parts, Body::empty()),
            Err(form::FormError::Unreadable),
        ),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::session::MemorySession;

    use super::*;

    struct AlwaysOk;

    #[async_trait]
    impl PasswordChecker for AlwaysOk {
        async fn check_password(&self, _: &str, _: &str) -> Result<(), CredentialError> {
            Ok(())
        }
    }

    struct AlwaysErr(fn() -> CredentialError);

    #[async_trait]
    impl PasswordChecker for AlwaysErr {
        async fn check_password(&self, _: &str, _: &str) -> Result<(), CredentialError> {
            Err(self.0())
        }
    }

    struct BrokenSession;

    #[async_trait]
    impl SessionStore for BrokenSession {
        async fn get_value(&self, _: &str) -> Result<SessionValue, SessionError> {
            Err(SessionError::Backend("session store is down".to_string()))
        }

        async fn set_value(&self, _: &str, _: SessionValue) -> Result<(), SessionError> {
            Err(SessionError::Backend("session store is down".to_string()))
        }
    }

    fn gate(checker: impl PasswordChecker + 'static) -> LoginGate {
        LoginGate::new("test", Arc::new(checker))
    }

    fn get_request() -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri("/private")
            .body(Body::empty())
            .unwrap()
    }

    fn post_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/private")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn page_text(intercept: Intercept) -> String {
        match intercept {
            Intercept::Page(response) => {
                let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap();
                String::from_utf8(bytes.to_vec()).unwrap()
            }
            Intercept::Forward(_) => panic!("expected a rendered page, got a forward"),
        }
    }

    #[tokio::test]
    async fn fresh_visit_renders_a_challenge_and_stores_a_token() {
        let session = MemorySession::default();
        let outcome = gate(AlwaysOk)
            .intercept(&session, get_request())
            .await
            .unwrap();

        let page = page_text(outcome).await;
        assert!(page.contains("name=\"xsrf-test\""));
        assert!(page.contains("action=\"/private\""));
        assert!(!page.contains(MSG_INVALID_CREDENTIALS));
        assert!(!page.contains(MSG_BAD_REQUEST));

        assert!(matches!(
            session.get_value("xsrf-test").await.unwrap(),
            SessionValue::Text(_)
        ));
    }

    #[tokio::test]
    async fn authenticated_session_forwards_without_validation() {
        let session = MemorySession::default();
        session
            .set_value("authenticated-test", SessionValue::Bool(true))
            .await
            .unwrap();

        // The checker would reject anything, but it must never be asked.
        let outcome = gate(AlwaysErr(|| CredentialError::BadPassword))
            .intercept(&session, get_request())
            .await
            .unwrap();
        assert!(matches!(outcome, Intercept::Forward(_)));
    }

    #[tokio::test]
    async fn correct_submission_sets_the_flag_and_forwards() {
        let session = MemorySession::default();
        session
            .set_value("xsrf-test", SessionValue::Text("tok".to_string()))
            .await
            .unwrap();

        let outcome = gate(AlwaysOk)
            .intercept(
                &session,
                post_request("xsrf-test=tok&username-test=alice&password-test=pw"),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, Intercept::Forward(_)));
        assert_eq!(
            session.get_value("authenticated-test").await.unwrap(),
            SessionValue::Bool(true)
        );
    }

    #[tokio::test]
    async fn wrong_token_is_rejected_and_rotates_the_token() {
        let session = MemorySession::default();
        session
            .set_value("xsrf-test", SessionValue::Text("tok".to_string()))
            .await
            .unwrap();

        let outcome = gate(AlwaysOk)
            .intercept(
                &session,
                post_request("xsrf-test=wrong&username-test=alice&password-test=pw"),
            )
            .await
            .unwrap();

        let page = page_text(outcome).await;
        assert!(page.contains(MSG_INVALID_CREDENTIALS));

        let rotated = session.get_value("xsrf-test").await.unwrap();
        assert_ne!(rotated, SessionValue::Text("tok".to_string()));
        assert!(session.get_value("authenticated-test").await.is_err());
    }

    #[tokio::test]
    async fn repeated_username_field_is_a_bad_request() {
        let session = MemorySession::default();
        session
            .set_value("xsrf-test", SessionValue::Text("tok".to_string()))
            .await
            .unwrap();

        let outcome = gate(AlwaysOk)
            .intercept(
                &session,
                post_request(
                    "xsrf-test=tok&username-test=alice&username-test=bob&password-test=pw",
                ),
            )
            .await
            .unwrap();

        assert!(page_text(outcome).await.contains(MSG_BAD_REQUEST));
    }

    #[tokio::test]
    async fn unparsable_body_is_a_bad_request() {
        let session = MemorySession::default();
        session
            .set_value("xsrf-test", SessionValue::Text("tok".to_string()))
            .await
            .unwrap();

        let outcome = gate(AlwaysOk)
            .intercept(&session, post_request("xsrf-test=%zz"))
            .await
            .unwrap();

        assert!(page_text(outcome).await.contains(MSG_BAD_REQUEST));
    }

    #[tokio::test]
    async fn get_with_a_stored_token_reads_as_a_missing_token() {
        let session = MemorySession::default();
        session
            .set_value("xsrf-test", SessionValue::Text("tok".to_string()))
            .await
            .unwrap();

        let outcome = gate(AlwaysOk)
            .intercept(&session, get_request())
            .await
            .unwrap();

        assert!(page_text(outcome).await.contains(MSG_INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn unexpected_checker_error_is_fatal() {
        let session = MemorySession::default();
        session
            .set_value("xsrf-test", SessionValue::Text("tok".to_string()))
            .await
            .unwrap();

        let result = gate(AlwaysErr(|| {
            CredentialError::Backend("database is down".to_string())
        }))
        .intercept(
            &session,
            post_request("xsrf-test=tok&username-test=alice&password-test=pw"),
        )
        .await;

        assert!(matches!(result, Err(GateError::Credential(_))));
    }

    #[tokio::test]
    async fn session_backend_failure_is_fatal() {
        let result = gate(AlwaysOk).intercept(&BrokenSession, get_request()).await;
        assert!(matches!(result, Err(GateError::Session(_))));
    }

    #[tokio::test]
    async fn foreign_auth_flag_value_is_fatal() {
        let session = MemorySession::default();
        session
            .set_value(
                "authenticated-test",
                SessionValue::Text("true".to_string()),
            )
            .await
            .unwrap();

        let result = gate(AlwaysOk).intercept(&session, get_request()).await;
        assert!(matches!(result, Err(GateError::Internal(_))));
    }
}
