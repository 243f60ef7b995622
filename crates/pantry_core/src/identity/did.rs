//! Handle and DID resolution.
//!
//! # Invariants
//! - Only `did:plc` and `did:web` are accepted.
//! - The resolved document's `id` must equal the requested DID.

use crate::identity::error::{IdentityError, IdentityResult};
use crate::identity::http::{get_json, get_text, HttpTransport};
use serde::Deserialize;
use url::Url;

const PDS_SERVICE_FRAGMENT: &str = "#atproto_pds";
const PDS_SERVICE_TYPE: &str = "AtprotoPersonalDataServer";

/// Subset of a DID document needed for login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub id: String,
    #[serde(default)]
    pub also_known_as: Vec<String>,
    #[serde(default)]
    pub service: Vec<DidService>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidService {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub service_endpoint: String,
}

/// Resolved account identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub did: String,
    /// Handle the user typed, when login started from a handle.
    pub handle: Option<String>,
    pub pds: Url,
}

/// Lowercases a handle, strips a leading `@` and checks DNS label syntax.
pub fn normalize_handle(input: &str) -> IdentityResult<String> {
    let handle = input.trim().trim_start_matches('@').to_ascii_lowercase();
    let labels = handle.split('.').collect::<Vec<_>>();
    let valid = labels.len() >= 2
        && handle.len() <= 253
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if !valid {
        return Err(IdentityError::InvalidHandle(input.trim().to_string()));
    }
    Ok(handle)
}

/// Checks that `did` is a well-formed `did:plc` or `did:web` identifier.
pub fn validate_did(did: &str) -> IdentityResult<()> {
    let invalid = || IdentityError::InvalidDid(did.to_string());
    if let Some(id) = did.strip_prefix("did:plc:") {
        let ok = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c));
        return if ok { Ok(()) } else { Err(invalid()) };
    }
    if let Some(host) = did.strip_prefix("did:web:") {
        return normalize_handle(host).map(|_| ()).map_err(|_| invalid());
    }
    Err(invalid())
}

/// Resolves `handle` via `https://<handle>/.well-known/atproto-did`.
pub fn resolve_handle<H: HttpTransport + ?Sized>(http: &H, handle: &str) -> IdentityResult<String> {
    let handle = normalize_handle(handle)?;
    let did = get_text(http, &format!("https://{handle}/.well-known/atproto-did"))?;
    validate_did(&did)?;
    Ok(did)
}

/// Fetches the DID document from the PLC directory or the `did:web` host.
pub fn resolve_did_document<H: HttpTransport + ?Sized>(
    http: &H,
    plc_directory: &str,
    did: &str,
) -> IdentityResult<DidDocument> {
    validate_did(did)?;
    let url = match did.strip_prefix("did:web:") {
        Some(host) => format!("https://{host}/.well-known/did.json"),
        None => format!("{}/{did}", plc_directory.trim_end_matches('/')),
    };
    let document: DidDocument = get_json(http, &url)?;
    if document.id != did {
        return Err(IdentityError::InvalidDid(format!(
            "document for {did} has id {}",
            document.id
        )));
    }
    Ok(document)
}

/// Personal data server endpoint named by the `#atproto_pds` service.
pub fn pds_endpoint(document: &DidDocument) -> IdentityResult<Url> {
    let service = document
        .service
        .iter()
        .find(|service| {
            service.id.ends_with(PDS_SERVICE_FRAGMENT) && service.service_type == PDS_SERVICE_TYPE
        })
        .ok_or_else(|| IdentityError::MissingService("#atproto_pds service".to_string()))?;
    let url = Url::parse(&service.service_endpoint)
        .map_err(|_| IdentityError::MissingService("#atproto_pds endpoint".to_string()))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(IdentityError::MissingService(
            "#atproto_pds endpoint".to_string(),
        ));
    }
    Ok(url)
}

/// Handle or DID to [`ResolvedIdentity`].
pub fn resolve_identity<H: HttpTransport + ?Sized>(
    http: &H,
    plc_directory: &str,
    handle_or_did: &str,
) -> IdentityResult<ResolvedIdentity> {
    let input = handle_or_did.trim();
    let (did, handle) = if input.starts_with("did:") {
        (input.to_string(), None)
    } else {
        let handle = normalize_handle(input)?;
        (resolve_handle(http, &handle)?, Some(handle))
    };
    let document = resolve_did_document(http, plc_directory, &did)?;
    Ok(ResolvedIdentity {
        pds: pds_endpoint(&document)?,
        did,
        handle,
    })
}
