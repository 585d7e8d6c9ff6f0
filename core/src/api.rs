//! High-level client: one method per remote operation.
//!
//! Every method builds a request with `SshcxClient`, sends it through the
//! `Transport` exactly once and normalizes the answer. A missing token fails
//! with `ApiError::MissingCredential` before the transport is touched.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::client::{self, Credential, SshcxClient};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::multipart::Upload;
use crate::transport::{Transport, UreqTransport};
use crate::types::{DemoGrant, FileRecord, Reference, Reply, Resource, UrlRecord};

pub struct ApiClient<T: Transport = UreqTransport> {
    core: SshcxClient,
    transport: T,
}

impl ApiClient<UreqTransport> {
    /// Client for the production endpoint with default settings.
    pub fn new(token: &str) -> Self {
        Self::with_config(token, &ClientConfig::default())
    }

    pub fn with_config(token: &str, config: &ClientConfig) -> Self {
        Self::with_transport(token, &config.base_url, UreqTransport::new(config))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(token: &str, base_url: &str, transport: T) -> Self {
        Self {
            core: SshcxClient::new(base_url, token),
            transport,
        }
    }

    /// Short code of a short link, e.g. `https://ssh.cx/3r4G` gives `3r4G`.
    pub fn short_code_from_url(link: &str) -> String {
        client::short_code_from_url(link)
    }

    pub fn token(&self) -> Option<&str> {
        self.core.token()
    }

    pub fn credential(&self) -> &Credential {
        self.core.credential()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn send<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<Reply<R>, ApiError> {
        tracing::debug!(
            method = %request.method,
            url = request.url_without_query(),
            "sending request"
        );
        let response = self.transport.execute(&request)?;
        tracing::debug!(
            status = response.status,
            body_len = response.body.len(),
            "received response"
        );
        self.core.parse_reply(response)
    }

    // --- urls ---

    pub fn create_short_url(&self, target: &str) -> Result<Reply<UrlRecord>, ApiError> {
        let request = self.core.build_create_url(target)?;
        self.send(request)
    }

    pub fn list_urls(&self) -> Result<Reply<UrlRecord>, ApiError> {
        let request = self.core.build_list(Resource::Url)?;
        self.send(request)
    }

    pub fn get_url_by_id(&self, id: u64) -> Result<Reply<UrlRecord>, ApiError> {
        self.get(Resource::Url, &Reference::Id(id))
    }

    pub fn get_url_by_short(&self, code: &str) -> Result<Reply<UrlRecord>, ApiError> {
        self.get(Resource::Url, &Reference::Short(code.to_string()))
    }

    pub fn delete_url_by_id(&self, id: u64) -> Result<Reply<UrlRecord>, ApiError> {
        self.delete(Resource::Url, &Reference::Id(id))
    }

    pub fn delete_url_by_short(&self, code: &str) -> Result<Reply<UrlRecord>, ApiError> {
        self.delete(Resource::Url, &Reference::Short(code.to_string()))
    }

    pub fn delete_all_urls(&self) -> Result<Reply<UrlRecord>, ApiError> {
        let request = self.core.build_delete_all(Resource::Url)?;
        self.send(request)
    }

    // --- files ---

    /// Upload the file at `path`. The token is checked before the file is read.
    pub fn upload_file(&self, path: impl AsRef<Path>) -> Result<Reply<FileRecord>, ApiError> {
        if self.core.token().is_none() {
            return Err(ApiError::MissingCredential);
        }
        let upload = Upload::from_path(path)?;
        self.upload(&upload)
    }

    /// Upload in-memory content.
    pub fn upload(&self, upload: &Upload) -> Result<Reply<FileRecord>, ApiError> {
        let request = self.core.build_upload(upload)?;
        self.send(request)
    }

    pub fn list_files(&self) -> Result<Reply<FileRecord>, ApiError> {
        let request = self.core.build_list(Resource::File)?;
        self.send(request)
    }

    pub fn get_file_by_id(&self, id: u64) -> Result<Reply<FileRecord>, ApiError> {
        self.get(Resource::File, &Reference::Id(id))
    }

    pub fn get_file_by_short(&self, code: &str) -> Result<Reply<FileRecord>, ApiError> {
        self.get(Resource::File, &Reference::Short(code.to_string()))
    }

    pub fn delete_file_by_id(&self, id: u64) -> Result<Reply<FileRecord>, ApiError> {
        self.delete(Resource::File, &Reference::Id(id))
    }

    pub fn delete_file_by_short(&self, code: &str) -> Result<Reply<FileRecord>, ApiError> {
        self.delete(Resource::File, &Reference::Short(code.to_string()))
    }

    pub fn delete_all_files(&self) -> Result<Reply<FileRecord>, ApiError> {
        let request = self.core.build_delete_all(Resource::File)?;
        self.send(request)
    }

    // --- generic ---

    pub fn get<R: DeserializeOwned>(
        &self,
        resource: Resource,
        reference: &Reference,
    ) -> Result<Reply<R>, ApiError> {
        let request = self.core.build_get(resource, reference)?;
        self.send(request)
    }

    pub fn delete<R: DeserializeOwned>(
        &self,
        resource: Resource,
        reference: &Reference,
    ) -> Result<Reply<R>, ApiError> {
        let request = self.core.build_delete(resource, reference)?;
        self.send(request)
    }

    // --- demo ---

    /// Request a demo token for `target`. When the service returns one, the
    /// client uses it for subsequent calls.
    pub fn issue_demo_token(&mut self, target: &str) -> Result<Reply<DemoGrant>, ApiError> {
        let request = self.core.build_issue_demo_token(target)?;
        let reply = self.send::<DemoGrant>(request)?;
        if let Reply::One(DemoGrant {
            token: Some(token), ..
        }) = &reply
        {
            tracing::info!("adopting demo token");
            self.core.adopt_demo_token(token);
        }
        Ok(reply)
    }

    /// Move the records of `demo_token` to `prod_token`. The client uses
    /// `prod_token` from now on, whatever the service answers.
    pub fn exchange_demo_token(
        &mut self,
        demo_token: &str,
        prod_token: &str,
    ) -> Result<Reply<DemoGrant>, ApiError> {
        let request = self.core.build_exchange_demo_token(demo_token, prod_token)?;
        self.send(request)
    }
}
