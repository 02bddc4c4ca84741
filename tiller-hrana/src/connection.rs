use crate::{HranaConfig, PipelineRequest, parse_response};
use reqwest::{Client, header::AUTHORIZATION};
use std::future::Future;
use tiller_core::{Context, Envelope, Error, Result, Transport, truncate_long};

/// Runs every statement as its own Hrana pipeline over HTTP.
#[derive(Debug, Clone)]
pub struct HranaTransport {
    client: Client,
    config: HranaConfig,
}

impl HranaTransport {
    pub fn new(config: HranaConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Could not build the HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn connect(url: &str) -> Result<Self> {
        Self::new(HranaConfig::parse(url)?)
    }

    pub fn from_env() -> Result<Self> {
        Self::new(HranaConfig::from_env()?)
    }

    pub fn config(&self) -> &HranaConfig {
        &self.config
    }
}

impl Transport for HranaTransport {
    fn execute(&mut self, sql: String) -> impl Future<Output = Result<Envelope>> + Send {
        let url = self.config.pipeline_url();
        let mut request = self.client.post(&url);
        if let Some(authorization) = self.config.authorization() {
            request = request.header(AUTHORIZATION, authorization);
        }
        async move {
            let context = || format!("While sending the statement to `{}`", url);
            let response = request
                .json(&PipelineRequest::execute(&sql))
                .send()
                .await
                .with_context(context)?;
            let status = response.status();
            let body = response.text().await.with_context(context)?;
            if !status.is_success() {
                let error = Error::msg(format!(
                    "The endpoint answered {}: {}",
                    status,
                    truncate_long!(body)
                ))
                .context(context());
                log::error!("{:#}", error);
                return Err(error);
            }
            log::trace!("Pipeline response: {}", truncate_long!(body));
            parse_response(&body).with_context(context)
        }
    }
}
