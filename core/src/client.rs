//! HTTP request builder and response parser for the ssh.cx API.
//!
//! # Design
//! `SshcxClient` holds the `base_url` and the credential and performs no I/O.
//! Each operation is a `build_*` method that produces an `HttpRequest`;
//! `parse_reply` turns any `HttpResponse` into a typed `Reply`. The token is a
//! request parameter (query for GET, form body for POST/DELETE), never a
//! header.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::{self, Upload};
use crate::types::{Reference, Reply, Resource};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// What the client currently authenticates with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Missing,
    /// A demo token has been requested but not yet received.
    DemoPending,
    Token(String),
}

impl Credential {
    fn from_token(token: &str) -> Self {
        if token.is_empty() {
            Credential::Missing
        } else {
            Credential::Token(token.to_string())
        }
    }
}

/// Request builder and response parser for the ssh.cx API.
#[derive(Debug, Clone)]
pub struct SshcxClient {
    base_url: String,
    credential: Credential,
}

impl SshcxClient {
    /// `base_url` is normalized to end with a single `/`. An empty `token`
    /// leaves the client without credentials.
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: format!("{}/", base_url.trim_end_matches('/')),
            credential: Credential::from_token(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The token sent with resource requests, if one is held.
    pub fn token(&self) -> Option<&str> {
        match &self.credential {
            Credential::Token(token) => Some(token),
            Credential::Missing | Credential::DemoPending => None,
        }
    }

    /// Replace the held token. An empty token clears the credential.
    pub fn set_token(&mut self, token: &str) {
        self.credential = Credential::from_token(token);
    }

    fn require_token(&self) -> Result<&str, ApiError> {
        self.token().ok_or(ApiError::MissingCredential)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn form_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpRequest, ApiError> {
        let body = encode_params(params)?;
        Ok(HttpRequest {
            method,
            url: self.endpoint(path),
            headers: vec![("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: Some(body.into_bytes()),
        })
    }

    fn query_request(&self, path: &str, params: &[(&str, &str)]) -> Result<HttpRequest, ApiError> {
        let query = encode_params(params)?;
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}?{query}", self.endpoint(path)),
            headers: Vec::new(),
            body: None,
        })
    }

    /// POST `url` with `{token, url}`.
    pub fn build_create_url(&self, target: &str) -> Result<HttpRequest, ApiError> {
        let token = self.require_token()?;
        self.form_request(
            HttpMethod::Post,
            Resource::Url.path(),
            &[("token", token), ("url", target)],
        )
    }

    /// GET `<resource>` with `{token}`.
    pub fn build_list(&self, resource: Resource) -> Result<HttpRequest, ApiError> {
        let token = self.require_token()?;
        self.query_request(resource.path(), &[("token", token)])
    }

    /// GET `<resource>` with `{token, id}` or `{token, short}`.
    pub fn build_get(
        &self,
        resource: Resource,
        reference: &Reference,
    ) -> Result<HttpRequest, ApiError> {
        let token = self.require_token()?;
        let (key, value) = reference.param();
        self.query_request(resource.path(), &[("token", token), (key, value.as_str())])
    }

    /// DELETE `<resource>` with `{token, id}` or `{token, short}`.
    pub fn build_delete(
        &self,
        resource: Resource,
        reference: &Reference,
    ) -> Result<HttpRequest, ApiError> {
        let token = self.require_token()?;
        let (key, value) = reference.param();
        self.form_request(
            HttpMethod::Delete,
            resource.path(),
            &[("token", token), (key, value.as_str())],
        )
    }

    /// DELETE `<resource>` with `{token, all=1}`.
    pub fn build_delete_all(&self, resource: Resource) -> Result<HttpRequest, ApiError> {
        let token = self.require_token()?;
        self.form_request(
            HttpMethod::Delete,
            resource.path(),
            &[("token", token), ("all", "1")],
        )
    }

    /// POST `file` with the token in the query string and `upload` as the
    /// only multipart part.
    pub fn build_upload(&self, upload: &Upload) -> Result<HttpRequest, ApiError> {
        let token = self.require_token()?;
        let query = encode_params(&[("token", token)])?;
        let boundary = multipart::boundary();
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}?{query}", self.endpoint(Resource::File.path())),
            headers: vec![(
                "Content-Type".to_string(),
                multipart::content_type_header(&boundary),
            )],
            body: Some(multipart::encode(&boundary, upload)),
        })
    }

    /// POST `demo/new` with `{url}`. Needs no token; a client without one
    /// moves to `DemoPending`.
    pub fn build_issue_demo_token(&mut self, target: &str) -> Result<HttpRequest, ApiError> {
        if self.credential == Credential::Missing {
            self.credential = Credential::DemoPending;
        }
        self.form_request(HttpMethod::Post, "demo/new", &[("url", target)])
    }

    /// Adopt the demo token returned by `demo/new`.
    pub fn adopt_demo_token(&mut self, token: &str) {
        if !token.is_empty() {
            self.credential = Credential::Token(token.to_string());
        }
    }

    /// POST `demo/reassign` with `{token: prod, demo_token: demo}`. The
    /// client switches to `prod_token` before the request is sent.
    pub fn build_exchange_demo_token(
        &mut self,
        demo_token: &str,
        prod_token: &str,
    ) -> Result<HttpRequest, ApiError> {
        if prod_token.is_empty() {
            return Err(ApiError::MissingCredential);
        }
        self.credential = Credential::Token(prod_token.to_string());
        self.form_request(
            HttpMethod::Post,
            "demo/reassign",
            &[("token", prod_token), ("demo_token", demo_token)],
        )
    }

    /// Normalize a response into a typed reply.
    ///
    /// Empty 2xx bodies become `Reply::NoContent`. Non-2xx statuses and JSON
    /// objects whose `error` key is set to anything but `null` or `false`
    /// become `ApiError::Remote` with the payload passed through.
    pub fn parse_reply<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<Reply<T>, ApiError> {
        let body = response.body.trim();

        if !response.is_success() {
            let payload = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
            };
            return Err(ApiError::Remote {
                status: response.status,
                payload,
            });
        }

        if body.is_empty() {
            return Ok(Reply::NoContent);
        }

        let value: Value = serde_json::from_str(body)
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))?;

        // A 2xx body reports an error only through an `error` key that is
        // neither `null` nor `false`.
        if !matches!(value.get("error"), None | Some(Value::Null) | Some(Value::Bool(false))) {
            return Err(ApiError::Remote {
                status: response.status,
                payload: value,
            });
        }

        let reply = match value {
            Value::Array(_) => match serde_json::from_value::<Vec<T>>(value.clone()) {
                Ok(records) => Reply::Many(records),
                Err(_) => Reply::Unknown(value),
            },
            Value::Object(_) => match serde_json::from_value::<T>(value.clone()) {
                Ok(record) => Reply::One(record),
                Err(_) => Reply::Unknown(value),
            },
            other => Reply::Unknown(other),
        };
        Ok(reply)
    }
}

/// Extract the short code from a short link: its path with every `/`
/// removed. Input that is not an absolute URL is treated as a bare path.
pub fn short_code_from_url(link: &str) -> String {
    let path = match url::Url::parse(link) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => link
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.replace('/', "")
}

fn encode_params(params: &[(&str, &str)]) -> Result<String, ApiError> {
    serde_urlencoded::to_string(params).map_err(|e| ApiError::Serialization(e.to_string()))
}
