//! Login orchestration over the resolution and OAuth steps.

use crate::config::CoreConfig;
use crate::identity::did::resolve_identity;
use crate::identity::error::{IdentityError, IdentityResult};
use crate::identity::http::HttpTransport;
use crate::identity::oauth::{
    authorize_url, discover_authorization_server, exchange_code, fetch_server_metadata,
    push_authorization_request, ParRequest,
};
use crate::identity::pkce::{generate_pkce, random_state};
use log::{info, warn};
use url::Url;

/// OAuth client registration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub plc_directory: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl From<&CoreConfig> for IdentityConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            plc_directory: config.plc_directory.clone(),
            client_id: config.oauth_client_id.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
            scope: config.oauth_scope.clone(),
        }
    }
}

/// Pending login between [`IdentityClient::begin_login`] and
/// [`IdentityClient::complete_login`].
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationSession {
    /// URL to open in the browser.
    pub authorize_url: String,
    pub state: String,
    pub code_verifier: String,
    pub did: String,
    pub handle: Option<String>,
    pub pds: String,
    pub issuer: String,
    pub token_endpoint: String,
    /// Seconds the pushed request stays valid, when the server says.
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for AuthorizationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationSession")
            .field("authorize_url", &self.authorize_url)
            .field("state", &"<redacted>")
            .field("code_verifier", &"<redacted>")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("pds", &self.pds)
            .field("issuer", &self.issuer)
            .field("token_endpoint", &self.token_endpoint)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Completed login.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub did: String,
    pub handle: Option<String>,
    pub pds: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

impl std::fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResult")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("pds", &self.pds)
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Identity client generic over the HTTP transport.
pub struct IdentityClient<H: HttpTransport> {
    http: H,
    config: IdentityConfig,
}

impl<H: HttpTransport> IdentityClient<H> {
    pub fn new(http: H, config: IdentityConfig) -> Self {
        Self { http, config }
    }

    /// Resolves the account, discovers its authorization server and pushes
    /// an authorization request.
    pub fn begin_login(&self, handle_or_did: &str) -> IdentityResult<AuthorizationSession> {
        let identity = resolve_identity(&self.http, &self.config.plc_directory, handle_or_did)?;
        let issuer = discover_authorization_server(&self.http, &identity.pds)?;
        let metadata = fetch_server_metadata(&self.http, &issuer)?;

        let pkce = generate_pkce()?;
        let state = random_state()?;
        let login_hint = identity.handle.as_deref().unwrap_or(identity.did.as_str());
        let par = push_authorization_request(
            &self.http,
            &metadata,
            &ParRequest {
                client_id: &self.config.client_id,
                redirect_uri: &self.config.redirect_uri,
                scope: &self.config.scope,
                state: &state,
                login_hint,
                code_challenge: &pkce.challenge,
            },
        )?;
        let url = authorize_url(&metadata, &self.config.client_id, &par.request_uri)?;

        info!(
            "event=identity_begin module=identity status=ok did={} issuer={}",
            identity.did, metadata.issuer
        );
        Ok(AuthorizationSession {
            authorize_url: url.to_string(),
            state,
            code_verifier: pkce.verifier,
            did: identity.did,
            handle: identity.handle,
            pds: identity.pds.to_string(),
            issuer: metadata.issuer,
            token_endpoint: metadata.token_endpoint,
            expires_in: par.expires_in,
        })
    }

    /// Exchanges the callback `code` after checking `state`, then checks
    /// that the token subject is the resolved DID.
    pub fn complete_login(
        &self,
        session: &AuthorizationSession,
        callback_state: &str,
        code: &str,
    ) -> IdentityResult<LoginResult> {
        if callback_state != session.state {
            warn!("event=identity_complete module=identity status=error reason=state_mismatch");
            return Err(IdentityError::StateMismatch);
        }

        let tokens = exchange_code(
            &self.http,
            &session.token_endpoint,
            &self.config.client_id,
            &self.config.redirect_uri,
            code,
            &session.code_verifier,
        )?;
        if tokens.sub != session.did {
            warn!("event=identity_complete module=identity status=error reason=subject_mismatch");
            return Err(IdentityError::SubjectMismatch {
                expected: session.did.clone(),
                actual: tokens.sub,
            });
        }

        info!(
            "event=identity_complete module=identity status=ok did={}",
            session.did
        );
        Ok(LoginResult {
            did: session.did.clone(),
            handle: session.handle.clone(),
            pds: session.pds.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            scope: tokens.scope,
        })
    }

    /// Parses the full redirect URL (`code`, `state`, optional `iss` or
    /// `error`) and completes the login.
    pub fn complete_from_redirect(
        &self,
        session: &AuthorizationSession,
        redirect_url: &str,
    ) -> IdentityResult<LoginResult> {
        let url = Url::parse(redirect_url)
            .map_err(|_| IdentityError::Authorization("malformed redirect URL".to_string()))?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        if let Some(error) = param("error") {
            let description = param("error_description").unwrap_or_default();
            return Err(IdentityError::Authorization(
                format!("{error} {description}").trim().to_string(),
            ));
        }
        if let Some(iss) = param("iss") {
            if iss.trim_end_matches('/') != session.issuer.trim_end_matches('/') {
                return Err(IdentityError::IssuerMismatch {
                    expected: session.issuer.clone(),
                    actual: iss,
                });
            }
        }
        let state = param("state").ok_or(IdentityError::StateMismatch)?;
        let code = param("code")
            .ok_or_else(|| IdentityError::Authorization("redirect has no code".to_string()))?;
        self.complete_login(session, &state, &code)
    }
}

/// `state` query parameter of a redirect URL, if present.
pub fn redirect_state(redirect_url: &str) -> Option<String> {
    let url = Url::parse(redirect_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
}
