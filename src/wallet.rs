//! The holder's network-facing entry points.
//!
//! [Holder] ties the pure core together with an [AsyncHttpClient]: fetching
//! raw requests (contracts, offers, issuer metadata), exchanging
//! pre-authorized codes for tokens, and submitting signed responses. The
//! core never retries; non-success statuses surface as [NetworkError] with
//! a `retryable` classification for the caller's own retry policy.

use anyhow::{Context, Result};
use async_trait::async_trait;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::core::http::{base_request, AsyncHttpClient, NetworkError};
use crate::core::manifest::IssuanceContract;
use crate::core::openid4vci::{
    CredentialIssuerMetadata, CredentialOffer, CredentialRequest, CredentialResponse,
    PreAuthorizedTokenRequest, Proof, TokenResponse,
};
use crate::response::PresentationResponse;

/// Form body of a presentation response, posted to the verifier's
/// `response_uri`.
#[derive(Debug, Serialize)]
struct PresentationForm {
    id_token: String,
    vp_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

#[async_trait]
pub trait Holder: Sync {
    type HttpClient: AsyncHttpClient + Send + Sync;

    fn http_client(&self) -> &Self::HttpClient;

    /// Fetch an issuance contract from its URL.
    async fn fetch_contract(&self, url: &Url) -> Result<IssuanceContract> {
        get_json(self.http_client(), url.as_str())
            .await
            .context("unable to fetch issuance contract")
    }

    /// Fetch a credential offer from its `credential_offer_uri`.
    async fn fetch_credential_offer(&self, url: &Url) -> Result<CredentialOffer> {
        get_json(self.http_client(), url.as_str())
            .await
            .context("unable to fetch credential offer")
    }

    /// Fetch the offering issuer's metadata from its well-known endpoint.
    async fn fetch_issuer_metadata(
        &self,
        offer: &CredentialOffer,
    ) -> Result<CredentialIssuerMetadata> {
        let url = format!(
            "{}/.well-known/openid-credential-issuer",
            offer.credential_issuer.trim_end_matches('/')
        );
        get_json(self.http_client(), &url)
            .await
            .context("unable to fetch credential issuer metadata")
    }

    /// Exchange a pre-authorized code (and transaction code, if required)
    /// for an access token.
    async fn request_token(
        &self,
        metadata: &CredentialIssuerMetadata,
        request: &PreAuthorizedTokenRequest,
    ) -> Result<TokenResponse> {
        let body = serde_urlencoded::to_string(request)
            .context("unable to encode token request")?
            .into_bytes();

        let url = metadata.token_endpoint();
        let http_request = base_request()
            .method("POST")
            .uri(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .context("unable to construct token request")?;

        let response = self
            .http_client()
            .execute(http_request)
            .await
            .map_err(|e| NetworkError::transport(&url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::from_status(&url, status, response.body()).into());
        }
        serde_json::from_slice(response.body()).context("unable to parse token response")
    }

    /// Request the credential itself, presenting the access token and a JWT
    /// proof of possession.
    async fn request_credential(
        &self,
        metadata: &CredentialIssuerMetadata,
        configuration_id: &str,
        access_token: &str,
        proof: Proof,
    ) -> Result<CredentialResponse> {
        let request = CredentialRequest {
            credential_configuration_id: configuration_id.to_string(),
            proof,
        };
        let url = &metadata.credential_endpoint;

        let http_request = base_request()
            .method("POST")
            .uri(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .body(serde_json::to_vec(&request).context("unable to encode credential request")?)
            .context("unable to construct credential request")?;

        let response = self
            .http_client()
            .execute(http_request)
            .await
            .map_err(|e| NetworkError::transport(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::from_status(url, status, response.body()).into());
        }
        serde_json::from_slice(response.body()).context("unable to parse credential response")
    }

    /// Post a signed issuance response to the contract's credential issuance
    /// endpoint and return the raw issued credential token.
    async fn submit_issuance_response(
        &self,
        contract: &IssuanceContract,
        response_token: String,
    ) -> Result<String> {
        let url = contract.input.credential_issuer.as_str();
        let http_request = base_request()
            .method("POST")
            .uri(url)
            .header(CONTENT_TYPE, "text/plain")
            .header(ACCEPT, "application/json")
            .body(response_token.into_bytes())
            .context("unable to construct issuance response request")?;

        let response = self
            .http_client()
            .execute(http_request)
            .await
            .map_err(|e| NetworkError::transport(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::from_status(url, status, response.body()).into());
        }

        let body: serde_json::Value =
            serde_json::from_slice(response.body()).context("unable to parse issuance result")?;
        body.get("vc")
            .and_then(|vc| vc.as_str())
            .map(str::to_string)
            .context("issuance result carries no credential")
    }

    /// Form-post a presentation response to the verifier's response URI.
    ///
    /// A single presentation travels as a bare token in `vp_token`; several
    /// travel as a JSON array, matching the submission's `$[i]` paths.
    async fn submit_presentation_response(
        &self,
        response_uri: &Url,
        response: PresentationResponse,
        state: Option<String>,
    ) -> Result<()> {
        let vp_token = match response.vp_tokens.len() {
            1 => response.vp_tokens.into_iter().next().unwrap_or_default(),
            _ => serde_json::to_string(&response.vp_tokens)
                .context("unable to encode vp_token array")?,
        };

        let form = PresentationForm {
            id_token: response.id_token,
            vp_token,
            state,
        };
        let body = serde_urlencoded::to_string(&form)
            .context("unable to encode presentation response")?
            .into_bytes();

        let url = response_uri.as_str();
        let http_request = base_request()
            .method("POST")
            .uri(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .context("unable to construct presentation response request")?;

        let http_response = self
            .http_client()
            .execute(http_request)
            .await
            .map_err(|e| NetworkError::transport(url, e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(NetworkError::from_status(url, status, http_response.body()).into());
        }
        Ok(())
    }
}

async fn get_json<T: DeserializeOwned, C: AsyncHttpClient + Send + Sync>(
    client: &C,
    url: &str,
) -> Result<T> {
    let request = base_request()
        .method("GET")
        .uri(url)
        .header(ACCEPT, "application/json")
        .body(Vec::new())
        .context("unable to construct request")?;

    let response = client
        .execute(request)
        .await
        .map_err(|e| NetworkError::transport(url, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::from_status(url, status, response.body()).into());
    }
    serde_json::from_slice(response.body()).context("unable to parse response body")
}

#[cfg(test)]
mod test {
    use super::*;
    use http::{Request, Response, StatusCode};
    use std::sync::Mutex;

    struct StubClient {
        status: StatusCode,
        body: Vec<u8>,
        requests: Mutex<Vec<Request<Vec<u8>>>>,
    }

    impl StubClient {
        fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
            Self {
                status,
                body: body.into(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AsyncHttpClient for StubClient {
        async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
            self.requests.lock().unwrap().push(request);
            Ok(Response::builder()
                .status(self.status)
                .body(self.body.clone())?)
        }
    }

    struct StubHolder(StubClient);

    impl Holder for StubHolder {
        type HttpClient = StubClient;

        fn http_client(&self) -> &Self::HttpClient {
            &self.0
        }
    }

    fn metadata() -> CredentialIssuerMetadata {
        serde_json::from_value(serde_json::json!({
            "credential_issuer": "https://issuer.example.com",
            "credential_endpoint": "https://issuer.example.com/credential",
            "credential_configurations_supported": {}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn token_request_is_form_encoded() {
        let holder = StubHolder(StubClient::new(
            StatusCode::OK,
            br#"{"access_token":"token-1","c_nonce":"n-1"}"#.to_vec(),
        ));

        let token = holder
            .request_token(
                &metadata(),
                &PreAuthorizedTokenRequest::new("code-1", Some("1234".into())),
            )
            .await
            .unwrap();
        assert_eq!(token.access_token, "token-1");
        assert_eq!(token.c_nonce.as_deref(), Some("n-1"));

        let requests = holder.0.requests.lock().unwrap();
        assert_eq!(requests[0].uri(), "https://issuer.example.com/token");
        assert_eq!(
            requests[0].headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        let body = String::from_utf8(requests[0].body().clone()).unwrap();
        assert!(body.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Apre-authorized_code"));
        assert!(body.contains("pre-authorized_code=code-1"));
        assert!(body.contains("tx_code=1234"));
    }

    #[tokio::test]
    async fn server_errors_are_classified_retryable() {
        let holder = StubHolder(StubClient::new(StatusCode::BAD_GATEWAY, b"down".to_vec()));

        let err = holder
            .fetch_credential_offer(&"https://issuer.example.com/offer".parse().unwrap())
            .await
            .unwrap_err();
        let network = err.downcast_ref::<NetworkError>().unwrap();
        assert!(network.retryable);
        assert_eq!(network.status, Some(StatusCode::BAD_GATEWAY));
    }

    #[tokio::test]
    async fn client_errors_are_not_retryable() {
        let holder = StubHolder(StubClient::new(StatusCode::FORBIDDEN, b"nope".to_vec()));

        let err = holder
            .request_credential(&metadata(), "EmployeeBadge", "token-1", Proof::jwt("jwt"))
            .await
            .unwrap_err();
        let network = err.downcast_ref::<NetworkError>().unwrap();
        assert!(!network.retryable);
    }

    #[tokio::test]
    async fn presentation_response_posts_single_token_bare() {
        let holder = StubHolder(StubClient::new(StatusCode::OK, b"{}".to_vec()));

        holder
            .submit_presentation_response(
                &"https://verifier.example.com/response".parse().unwrap(),
                PresentationResponse {
                    id_token: "id.token.sig".into(),
                    vp_tokens: vec!["vp.token.sig".into()],
                },
                Some("state-1".into()),
            )
            .await
            .unwrap();

        let requests = holder.0.requests.lock().unwrap();
        let body = String::from_utf8(requests[0].body().clone()).unwrap();
        assert!(body.contains("id_token=id.token.sig"));
        assert!(body.contains("vp_token=vp.token.sig"));
        assert!(body.contains("state=state-1"));
    }

    #[tokio::test]
    async fn issuance_submission_returns_the_issued_credential() {
        let holder = StubHolder(StubClient::new(
            StatusCode::OK,
            br#"{"vc":"issued.credential.token"}"#.to_vec(),
        ));
        let contract: IssuanceContract = serde_json::from_value(serde_json::json!({
            "display": {
                "card": { "title": "Badge" },
                "consent": { "instructions": "..." }
            },
            "input": {
                "credential_issuer": "https://issuer.example.com/issue",
                "issuer": "did:example:issuer",
                "attestations": {}
            }
        }))
        .unwrap();

        let raw = holder
            .submit_issuance_response(&contract, "response.token.sig".into())
            .await
            .unwrap();
        assert_eq!(raw, "issued.credential.token");
    }
}
