use std::env;
use tiller_core::{Context, Error, Result};
use url::Url;

/// Where the endpoint lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HranaConfig {
    pub url: Url,
    pub token: Option<String>,
}

impl HranaConfig {
    /// Accepts `libsql://`, `https://` and `http://` urls. A `libsql` url is reached over https,
    /// the `authToken` query parameter (if any) becomes the token.
    pub fn parse(url: &str) -> Result<Self> {
        let context = || format!("While parsing the endpoint url `{}`", url);
        let normalized = match url.strip_prefix("libsql://") {
            Some(rest) => format!("https://{rest}"),
            None => url.to_string(),
        };
        let mut parsed = Url::parse(&normalized).with_context(context)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            let error = Error::msg(format!(
                "Unsupported scheme `{}`, expected one of libsql, https, http",
                parsed.scheme()
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let mut pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let token = pairs
            .iter()
            .position(|(k, _)| k == "authToken")
            .map(|pos| pairs.remove(pos).1);
        if pairs.is_empty() {
            parsed.set_query(None);
        } else {
            parsed
                .query_pairs_mut()
                .clear()
                .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(Self { url: parsed, token })
    }

    /// Reads `TILLER_URL`, falling back to `TILLER_TOKEN` when the url carries no token.
    pub fn from_env() -> Result<Self> {
        let url = env::var("TILLER_URL").context("Environment variable `TILLER_URL` is not set")?;
        let mut config = Self::parse(&url)?;
        if config.token.is_none() {
            config.token = env::var("TILLER_TOKEN").ok().filter(|v| !v.is_empty());
        }
        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn pipeline_url(&self) -> String {
        let mut url = self.url.clone();
        let path = format!("{}/v2/pipeline", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.into()
    }

    /// Value of the `Authorization` header. Tokens already carrying a scheme (`Basic abc`) are
    /// sent as they are, bare tokens are bearer tokens.
    pub fn authorization(&self) -> Option<String> {
        let token = self.token.as_deref()?.trim();
        if token.is_empty() {
            return None;
        }
        Some(if token.contains(' ') {
            token.to_string()
        } else {
            format!("Bearer {token}")
        })
    }
}
