//! OAuth discovery, pushed authorization requests and code exchange.

use crate::identity::error::{IdentityError, IdentityResult};
use crate::identity::http::{get_json, post_form_json, HttpTransport};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtectedResourceMetadata {
    #[serde(default)]
    pub authorization_servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub pushed_authorization_request_endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParResponse {
    pub request_uri: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Token endpoint response.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    pub sub: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("sub", &self.sub)
            .finish()
    }
}

/// Parameters of one pushed authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParRequest<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub scope: &'a str,
    pub state: &'a str,
    pub login_hint: &'a str,
    pub code_challenge: &'a str,
}

/// First authorization server advertised by the PDS.
pub fn discover_authorization_server<H: HttpTransport + ?Sized>(
    http: &H,
    pds: &Url,
) -> IdentityResult<String> {
    let url = well_known(pds.as_str(), "oauth-protected-resource");
    let metadata: ProtectedResourceMetadata = get_json(http, &url)?;
    metadata
        .authorization_servers
        .into_iter()
        .next()
        .ok_or_else(|| IdentityError::MissingService("authorization_servers entry".to_string()))
}

/// Fetches server metadata and checks that it names `issuer`.
pub fn fetch_server_metadata<H: HttpTransport + ?Sized>(
    http: &H,
    issuer: &str,
) -> IdentityResult<AuthorizationServerMetadata> {
    let url = well_known(issuer, "oauth-authorization-server");
    let metadata: AuthorizationServerMetadata = get_json(http, &url)?;
    if metadata.issuer.trim_end_matches('/') != issuer.trim_end_matches('/') {
        return Err(IdentityError::IssuerMismatch {
            expected: issuer.to_string(),
            actual: metadata.issuer,
        });
    }
    Ok(metadata)
}

/// Sends the PAR and returns the `request_uri`.
pub fn push_authorization_request<H: HttpTransport + ?Sized>(
    http: &H,
    metadata: &AuthorizationServerMetadata,
    request: &ParRequest<'_>,
) -> IdentityResult<ParResponse> {
    let form = [
        ("response_type", "code"),
        ("client_id", request.client_id),
        ("redirect_uri", request.redirect_uri),
        ("scope", request.scope),
        ("state", request.state),
        ("login_hint", request.login_hint),
        ("code_challenge", request.code_challenge),
        ("code_challenge_method", crate::identity::pkce::CHALLENGE_METHOD),
    ];
    post_form_json(http, &metadata.pushed_authorization_request_endpoint, &form)
}

/// Browser URL for the pushed request.
pub fn authorize_url(
    metadata: &AuthorizationServerMetadata,
    client_id: &str,
    request_uri: &str,
) -> IdentityResult<Url> {
    Url::parse_with_params(
        &metadata.authorization_endpoint,
        &[("client_id", client_id), ("request_uri", request_uri)],
    )
    .map_err(|_| IdentityError::MissingService("authorization_endpoint".to_string()))
}

/// Exchanges an authorization code for tokens.
pub fn exchange_code<H: HttpTransport + ?Sized>(
    http: &H,
    token_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    code: &str,
    code_verifier: &str,
) -> IdentityResult<TokenResponse> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", client_id),
        ("code_verifier", code_verifier),
    ];
    post_form_json(http, token_endpoint, &form)
}

fn well_known(base: &str, name: &str) -> String {
    format!("{}/.well-known/{name}", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::{authorize_url, well_known, AuthorizationServerMetadata};

    fn metadata() -> AuthorizationServerMetadata {
        AuthorizationServerMetadata {
            issuer: "https://auth.example.com".to_string(),
            authorization_endpoint: "https://auth.example.com/oauth/authorize".to_string(),
            token_endpoint: "https://auth.example.com/oauth/token".to_string(),
            pushed_authorization_request_endpoint: "https://auth.example.com/oauth/par"
                .to_string(),
        }
    }

    #[test]
    fn well_known_joins_without_double_slash() {
        assert_eq!(
            well_known("https://pds.example.com/", "oauth-protected-resource"),
            "https://pds.example.com/.well-known/oauth-protected-resource"
        );
    }

    #[test]
    fn authorize_url_encodes_query() {
        let url = authorize_url(&metadata(), "https://app.example/client.json", "urn:req:1").unwrap();
        let pairs = url.query_pairs().into_owned().collect::<Vec<_>>();
        assert_eq!(
            pairs,
            vec![
                ("client_id".to_string(), "https://app.example/client.json".to_string()),
                ("request_uri".to_string(), "urn:req:1".to_string()),
            ]
        );
    }
}
