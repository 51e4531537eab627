//! Endpoint resolution and the save rule for user-edited endpoints.

use crate::config::Config;
use crate::storage::{API_BASE_KEY, StorageManager};
use anyhow::{Context, Result};
use std::fmt;
use url::Url;

/// Where the client was launched from: the explicit `--api` flag and/or a
/// launch URL whose `api` query parameter and origin are both honoured.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    api_flag: Option<String>,
    launch_url: Option<Url>,
}

impl LaunchContext {
    pub fn new(api_flag: Option<String>, launch_url: Option<&str>) -> Result<Self> {
        let launch_url = launch_url
            .map(|raw| Url::parse(raw).with_context(|| format!("Invalid launch URL: {raw}")))
            .transpose()?;

        Ok(Self {
            api_flag,
            launch_url,
        })
    }

    /// One-time endpoint override. The flag wins over the launch URL's
    /// `api` parameter; empty values count as absent.
    pub fn api_param(&self) -> Option<String> {
        let from_flag = self
            .api_flag
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        from_flag.or_else(|| {
            self.launch_url.as_ref().and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "api")
                    .map(|(_, value)| value.into_owned())
                    .filter(|value| !value.is_empty())
            })
        })
    }

    /// Origin of the launch URL when its path sits under `mount_prefix`
    pub fn same_origin(&self, mount_prefix: &str) -> Option<String> {
        let url = self.launch_url.as_ref()?;
        if !url.path().starts_with(mount_prefix) {
            return None;
        }

        let origin = url.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    }
}

/// Which resolution step produced the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    Preset,
    QueryParam,
    Stored,
    SameOrigin,
    Default,
}

impl EndpointSource {
    pub fn display_name(&self) -> &'static str {
        match self {
            EndpointSource::Preset => "config preset",
            EndpointSource::QueryParam => "launch parameter",
            EndpointSource::Stored => "saved value",
            EndpointSource::SameOrigin => "same origin",
            EndpointSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub url: String,
    pub source: EndpointSource,
}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.source.display_name())
    }
}

/// Resolve the backend base URL. First match wins; never fails and never
/// touches the network. Only the launch-parameter step writes to storage.
pub fn resolve_endpoint(
    config: &Config,
    launch: &LaunchContext,
    storage: &StorageManager,
) -> ResolvedEndpoint {
    let resolved = if let Some(preset) = config.preset_endpoint() {
        ResolvedEndpoint {
            url: preset.to_string(),
            source: EndpointSource::Preset,
        }
    } else if let Some(param) = launch.api_param() {
        if let Err(e) = storage.set_item(API_BASE_KEY, &param) {
            tracing::debug!(error = %e, "could not persist launch endpoint");
        }
        ResolvedEndpoint {
            url: param,
            source: EndpointSource::QueryParam,
        }
    } else if let Some(stored) = stored_endpoint(storage) {
        ResolvedEndpoint {
            url: stored,
            source: EndpointSource::Stored,
        }
    } else if let Some(origin) = launch.same_origin(&config.mount_prefix) {
        ResolvedEndpoint {
            url: origin,
            source: EndpointSource::SameOrigin,
        }
    } else {
        ResolvedEndpoint {
            url: config.default_endpoint.clone(),
            source: EndpointSource::Default,
        }
    };

    tracing::info!(endpoint = %resolved.url, source = resolved.source.display_name(), "resolved endpoint");
    resolved
}

fn stored_endpoint(storage: &StorageManager) -> Option<String> {
    match storage.get_item(API_BASE_KEY) {
        Ok(value) => value.filter(|value| !value.is_empty()),
        Err(e) => {
            tracing::debug!(error = %e, "could not read saved endpoint");
            None
        }
    }
}

/// Result of saving an edited endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Value was non-empty: it was persisted (best effort) and the client
    /// must reload so the resolver runs again.
    Reload(String),
    /// Blank input: nothing saved, nothing reloaded.
    Ignored,
}

/// Apply the endpoint editor's save rule to the raw field contents.
pub fn save_endpoint(storage: &StorageManager, raw: &str) -> SaveOutcome {
    let value = raw.trim();
    if value.is_empty() {
        return SaveOutcome::Ignored;
    }

    if let Err(e) = storage.set_item(API_BASE_KEY, value) {
        tracing::debug!(error = %e, "could not persist edited endpoint");
    }
    SaveOutcome::Reload(value.to_string())
}
