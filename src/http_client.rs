//! Shared HTTP client construction policy.
//!
//! One client per pipeline: connect and request timeouts, gzip, the project
//! User-Agent, and a fallback for environments where system proxy discovery
//! panics.

use std::panic::{AssertUnwindSafe, catch_unwind};

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::config::HttpTimeouts;
use crate::error::PipelineError;

/// Builds the pipeline HTTP client.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] when the client cannot be constructed.
pub fn build_http_client(
    timeouts: HttpTimeouts,
    user_agent: &str,
) -> Result<Client, PipelineError> {
    match try_build_client(timeouts, user_agent, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some restricted sandboxes panic when querying system proxy
            // settings; env proxies still apply on the fallback path.
            warn!("HTTP client hit system proxy panic; using env-proxy fallback builder");
            match try_build_client(timeouts, user_agent, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(PipelineError::config(
                    "HTTP client construction panicked while initializing networking",
                )),
                Err(BuildClientFailure::Build(error)) => Err(PipelineError::config(format!(
                    "HTTP client construction failed: {error}"
                ))),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(PipelineError::config(format!(
            "HTTP client construction failed: {error}"
        ))),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    timeouts: HttpTimeouts,
    user_agent: &str,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(timeouts, user_agent);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(timeouts: HttpTimeouts, user_agent: String) -> ClientBuilder {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .user_agent(user_agent)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_with_defaults() {
        let client = build_http_client(HttpTimeouts::default(), "paperfetch-test/0");
        assert!(client.is_ok());
    }

    #[test]
    fn test_env_proxy_for_unknown_scheme_is_none() {
        assert_eq!(env_proxy_for_scheme("ftp"), None);
    }
}
