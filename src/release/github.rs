//! Looking up the latest release of an upstream GitHub project.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::Release;

const USER_AGENT: &str = concat!("dragonite/", env!("CARGO_PKG_VERSION"));

fn repository_url_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+)").expect("invalid repository regex")
  })
}

/// Owner and name of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepo {
  /// Account or organisation owning the repository.
  pub owner: String,
  /// Repository name.
  pub name: String,
}

impl GitHubRepo {
  /// Extract the repository from a project URL such as `https://github.com/owner/name/...`.
  ///
  /// Returns `None` for other hosts or when the owner or name segment is missing.
  pub fn from_url(url: &str) -> Option<Self> {
    let captures = repository_url_pattern().captures(url)?;
    Some(Self {
      owner: captures.get(1)?.as_str().to_string(),
      name: captures.get(2)?.as_str().to_string(),
    })
  }

  /// Endpoint describing the latest published release.
  pub fn latest_release_url(&self, api_base: &str) -> String {
    format!(
      "{}/repos/{}/{}/releases/latest",
      api_base.trim_end_matches('/'),
      self.owner,
      self.name
    )
  }
}

impl std::fmt::Display for GitHubRepo {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.owner, self.name)
  }
}

/// Errors raised while talking to a remote JSON endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The request could not be sent or the response could not be read.
  #[error("request to {url} failed: {source}")]
  Transport {
    /// Requested URL.
    url: String,
    /// Underlying client error.
    #[source]
    source: reqwest::Error,
  },
  /// The server answered with a non-success status.
  #[error("{url} returned {status}: {body}")]
  Status {
    /// Requested URL.
    url: String,
    /// HTTP status code.
    status: u16,
    /// Response body, kept for diagnostics.
    body: String,
  },
  /// The response body was not the expected JSON document.
  #[error("failed to decode response from {url}: {source}")]
  Decode {
    /// Requested URL.
    url: String,
    /// Underlying decode error.
    #[source]
    source: reqwest::Error,
  },
}

/// Anything able to report the latest release of a repository.
pub trait ReleaseSource {
  /// Fetch the most recent published release of `repo`.
  fn latest_release(&self, repo: &GitHubRepo) -> Result<Release, FetchError>;
}

/// Blocking HTTP client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
  http: Client,
  api_base: String,
  token: Option<String>,
}

impl GitHubClient {
  /// Create a client for `api_base`, authenticating API calls with `token` when given.
  pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self, FetchError> {
    let api_base = api_base.into();
    let http = Client::builder()
      .user_agent(USER_AGENT)
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|source| FetchError::Transport {
        url: api_base.clone(),
        source,
      })?;
    Ok(Self::with_http(http, api_base, token))
  }

  /// Wrap an already configured HTTP client. Blank tokens are treated as absent.
  pub fn with_http(http: Client, api_base: impl Into<String>, token: Option<String>) -> Self {
    Self {
      http,
      api_base: api_base.into(),
      token: token.filter(|token| !token.is_empty()),
    }
  }

  /// Fetch and decode an unauthenticated JSON document.
  ///
  /// Used for resources outside the API (the ignore list), so the token is never sent along.
  pub fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
    self.get_json(url, false)
  }

  fn get_json<T: DeserializeOwned>(&self, url: &str, authorize: bool) -> Result<T, FetchError> {
    let mut request = self.http.get(url).header(ACCEPT, "application/json");
    if authorize {
      if let Some(token) = &self.token {
        request = request.header(AUTHORIZATION, format!("token {token}"));
      }
    }

    let response = request.send().map_err(|source| FetchError::Transport {
      url: url.to_string(),
      source,
    })?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body: response.text().unwrap_or_default(),
      });
    }

    response.json().map_err(|source| FetchError::Decode {
      url: url.to_string(),
      source,
    })
  }
}

impl ReleaseSource for GitHubClient {
  fn latest_release(&self, repo: &GitHubRepo) -> Result<Release, FetchError> {
    let url = repo.latest_release_url(&self.api_base);
    log::debug!("fetching {url}");
    self.get_json(&url, true)
  }
}
