// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge configuration.
//!
//! Configuration is read from a TOML file with kebab-case keys:
//!
//! ```toml
//! endpoint = "https://reports.example.com/api/v1"
//! token = "00000000-0000-0000-0000-000000000000"
//! project = "checkout"
//! launch-name = "nightly"
//! call-timeout = "30s"
//!
//! [[attributes]]
//! key = "browser"
//! value = "firefox"
//! ```
//!
//! Unknown keys are reported as warnings and otherwise ignored.

use crate::errors::ConfigError;
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset};
use rp_bridge_metadata::{Attribute, LaunchDescriptor};
use serde::Deserialize;
use std::{collections::BTreeSet, io, time::Duration};
use tracing::{debug, warn};

/// The launch name used if none is configured.
pub const DEFAULT_LAUNCH_NAME: &str = "test run";

/// Configuration for a reporting session.
#[derive_where::derive_where(Debug)]
#[derive(Clone, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct BridgeConfig {
    /// If false, the session accepts events and does nothing with them.
    pub enabled: bool,

    /// The API token used to authenticate with the backend.
    #[derive_where(skip)]
    pub token: String,

    /// The backend endpoint.
    pub endpoint: String,

    /// The backend project that launches are reported to.
    pub project: String,

    /// The launch name. Defaults to [`DEFAULT_LAUNCH_NAME`].
    pub launch_name: Option<String>,

    /// The launch description.
    pub launch_description: String,

    /// Tags attached to the launch.
    pub attributes: Vec<Attribute>,

    /// Whether this launch reruns an earlier one.
    pub rerun: bool,

    /// The identifier of the launch being rerun.
    pub rerun_of: Option<String>,

    /// Log every backend call at info level rather than debug.
    pub debug: bool,

    /// How long to wait for a single backend call before giving up on reporting for the rest of
    /// the run. No limit if unset.
    #[serde(with = "humantime_serde")]
    pub call_timeout: Option<Duration>,

    /// Attach a log line naming each finished step to its innermost open item.
    pub log_steps: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: String::new(),
            endpoint: String::new(),
            project: String::new(),
            launch_name: None,
            launch_description: String::new(),
            attributes: Vec::new(),
            rerun: false,
            rerun_of: None,
            debug: false,
            call_timeout: None,
            log_steps: true,
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from a TOML file, logging unknown keys as warnings.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn from_path(path: &Utf8Path) -> Result<Option<Self>, ConfigError> {
        Self::from_path_with_warnings(path, &mut DefaultConfigWarnings)
    }

    /// Parses configuration from a TOML string, returning it along with any unknown keys.
    pub fn from_toml_str(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: BridgeConfig = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((config, unknown))
    }

    fn from_path_with_warnings(
        path: &Utf8Path,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, ConfigError> {
        debug!("bridge config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("bridge config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (config, unknown) =
            Self::from_toml_str(&contents).map_err(|error| ConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;
        if !unknown.is_empty() {
            warnings.unknown_config_keys(path, &unknown);
        }

        debug!("bridge config: loaded successfully from {path}");
        Ok(Some(config))
    }

    /// Returns the launch name, falling back to [`DEFAULT_LAUNCH_NAME`].
    pub fn launch_name(&self) -> &str {
        self.launch_name.as_deref().unwrap_or(DEFAULT_LAUNCH_NAME)
    }

    /// Builds the descriptor for the launch started at `start_time`.
    pub fn launch_descriptor(&self, start_time: DateTime<FixedOffset>) -> LaunchDescriptor {
        LaunchDescriptor {
            name: self.launch_name().to_owned(),
            description: self.launch_description.clone(),
            attributes: self.attributes.clone(),
            rerun: self.rerun,
            rerun_of: self.rerun_of.clone(),
            start_time,
        }
    }

    /// Returns the settings a transport-level client needs to connect to the backend.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            project: self.project.clone(),
            debug: self.debug,
        }
    }
}

/// Connection settings for a [`ReportingClient`](crate::client::ReportingClient) implementation.
#[derive_where::derive_where(Debug)]
#[derive(Clone, Eq, PartialEq)]
pub struct ClientSettings {
    /// The backend endpoint.
    pub endpoint: String,

    /// The API token.
    #[derive_where(skip)]
    pub token: String,

    /// The backend project.
    pub project: String,

    /// Whether the client should log its requests.
    pub debug: bool,
}

trait ConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if let [single] = unknown.iter().collect::<Vec<_>>().as_slice() {
            unknown_str.push_str("key: ");
            unknown_str.push_str(single);
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in bridge config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}
