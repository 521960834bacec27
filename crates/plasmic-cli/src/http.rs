//! HTTP implementation of [`PlasmicApi`]
//!
//! Every call is a JSON POST to the codegen host, authenticated with the
//! `x-plasmic-api-user` and `x-plasmic-api-token` headers. Transport errors
//! and 5xx answers are retried with exponential backoff; anything else is
//! returned as is.

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use plasmic_core::api::{
    ProjectBundle, ProjectComponentsRequest, ProjectSyncMetadata, RequiredPackages, ResolveSyncRequest,
    StyleConfigResponse, VersionResolution,
};
use plasmic_core::config::{AuthConfig, StyleConfig};
use plasmic_core::{Error, PlasmicApi, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

const CODEGEN_HOST: &str = "https://codegen.plasmic.app";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RETRY_TIME: Duration = Duration::from_secs(30);

/// Client for the Plasmic codegen server.
pub struct HttpApi {
    agent: ureq::Agent,
    auth: AuthConfig,
    codegen_host: String,
}

impl HttpApi {
    pub fn new(auth: AuthConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("plasmic-cli/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            codegen_host: codegen_host(&auth.host),
            auth,
        }
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<T> {
        let url = format!("{}{path}", self.codegen_host);
        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(MAX_RETRY_TIME))
            .build();

        let attempt = || {
            debug!(url = %url, "POST");
            let mut request = self
                .agent
                .post(&url)
                .set("x-plasmic-api-user", &self.auth.user)
                .set("x-plasmic-api-token", &self.auth.token);
            for (key, value) in query {
                request = request.query(key, value);
            }
            match request.send_json(body) {
                Ok(response) => response.into_json::<T>().map_err(|e| {
                    backoff::Error::permanent(Error::InvalidBundle {
                        message: format!("{path}: {e}"),
                    })
                }),
                Err(ureq::Error::Status(status, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    let error = Error::app_server(status, error_message(status, &body));
                    if status >= 500 {
                        Err(backoff::Error::transient(error))
                    } else {
                        Err(backoff::Error::permanent(error))
                    }
                }
                Err(ureq::Error::Transport(transport)) => Err(backoff::Error::transient(Error::Network {
                    message: transport.to_string(),
                })),
            }
        };

        backoff::retry(policy, attempt).map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

impl PlasmicApi for HttpApi {
    fn resolve_sync(&self, request: &ResolveSyncRequest) -> Result<VersionResolution> {
        self.post("/api/v1/code/resolve-sync", &[], request)
    }

    fn project_components(&self, request: &ProjectComponentsRequest) -> Result<ProjectBundle> {
        let path = format!("/api/v1/projects/{}/code/components", request.project_id);
        self.post(&path, &[("branchName", request.branch_name.as_str())], request)
    }

    fn project_sync_metadata(
        &self,
        project_id: &str,
        branch_name: &str,
        revision: u64,
    ) -> Result<ProjectSyncMetadata> {
        let path = format!("/api/v1/projects/{project_id}/code/project-sync-metadata");
        let revision = revision.to_string();
        self.post(&path, &[("branchName", branch_name), ("revision", revision.as_str())], &json!({}))
    }

    fn gen_style_config(&self, style: &StyleConfig) -> Result<StyleConfigResponse> {
        self.post("/api/v1/code/style-config", &[], style)
    }

    fn required_packages(&self) -> Result<RequiredPackages> {
        self.post("/api/v1/code/required-packages", &[], &json!({}))
    }
}

/// The studio host doubles as the codegen host, except for the public
/// studio, whose codegen runs elsewhere.
fn codegen_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.is_empty() || host == plasmic_core::config::auth::DEFAULT_HOST {
        CODEGEN_HOST.to_string()
    } else {
        host.to_string()
    }
}

/// Message for a failed request: the server's own message when it sent
/// one, otherwise the status and raw body.
fn error_message(status: u16, body: &str) -> String {
    if status == 403 {
        return "Incorrect Plasmic credentials; please check your .plasmic.auth file or your project API tokens."
            .to_string();
    }
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    if let Some(message) = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(Value::as_str)
    {
        return message.to_string();
    }
    format!("Error: request failed with status code {status}. The response is\n  {body}")
}
