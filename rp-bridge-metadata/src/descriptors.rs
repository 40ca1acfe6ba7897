// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{ItemKindParseError, ItemStatusParseError};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The kind of item started under a launch.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    /// A test suite.
    Suite,

    /// A single test case.
    Test,

    /// A step inside a test, typically a meta-step grouping lower-level actions.
    Step,
}

impl ItemKind {
    /// String representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["SUITE", "TEST", "STEP"]
    }

    /// Returns true if the backend should count items of this kind in its statistics.
    ///
    /// Steps are nested below tests and would otherwise be double-counted.
    pub fn has_stats(self) -> bool {
        match self {
            ItemKind::Suite | ItemKind::Test => true,
            ItemKind::Step => false,
        }
    }
}

impl FromStr for ItemKind {
    type Err = ItemKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "SUITE" => ItemKind::Suite,
            "TEST" => ItemKind::Test,
            "STEP" => ItemKind::Step,
            other => return Err(ItemKindParseError::new(other)),
        };
        Ok(val)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Suite => write!(f, "SUITE"),
            ItemKind::Test => write!(f, "TEST"),
            ItemKind::Step => write!(f, "STEP"),
        }
    }
}

/// The final status of an item or launch, in the backend's vocabulary.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// The item passed.
    Passed,

    /// The item failed.
    Failed,
}

impl ItemStatus {
    /// String representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["PASSED", "FAILED"]
    }
}

impl FromStr for ItemStatus {
    type Err = ItemStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "PASSED" => ItemStatus::Passed,
            "FAILED" => ItemStatus::Failed,
            other => return Err(ItemStatusParseError::new(other)),
        };
        Ok(val)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Passed => write!(f, "PASSED"),
            ItemStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A key/value tag attached to a launch.
///
/// The key is optional: a bare value is displayed by the backend as a plain tag.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The attribute key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// The attribute value.
    pub value: String,
}

/// Describes a launch to start.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchDescriptor {
    /// The display name of the launch.
    pub name: String,

    /// A free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Tags attached to the launch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    /// Whether this launch reruns an earlier one.
    #[serde(default)]
    pub rerun: bool,

    /// The identifier of the launch being rerun, if `rerun` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerun_of: Option<String>,

    /// When the launch started.
    pub start_time: DateTime<FixedOffset>,
}

/// Describes a suite, test or step item to start.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    /// The display name of the item.
    pub name: String,

    /// The kind of item.
    #[serde(rename = "type")]
    pub kind: ItemKind,

    /// Whether the backend counts this item in its statistics.
    pub has_stats: bool,

    /// When the item started.
    pub start_time: DateTime<FixedOffset>,
}

impl ItemDescriptor {
    /// Creates a new descriptor, deriving `has_stats` from the kind.
    pub fn new(name: impl Into<String>, kind: ItemKind, start_time: DateTime<FixedOffset>) -> Self {
        Self {
            name: name.into(),
            kind,
            has_stats: kind.has_stats(),
            start_time,
        }
    }
}

/// Finishes an item.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishItem {
    /// When the item finished.
    pub end_time: DateTime<FixedOffset>,

    /// The final status of the item.
    pub status: ItemStatus,
}

/// Finishes a launch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishLaunch {
    /// When the launch finished.
    pub end_time: DateTime<FixedOffset>,

    /// The aggregate status of the launch.
    pub status: ItemStatus,
}

/// The severity of a log entry.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// An error.
    Error,

    /// A warning.
    Warn,

    /// Informational output.
    Info,

    /// Debug output.
    Debug,

    /// Very verbose output, such as captured browser logs.
    Trace,
}

/// A log line attached to an item.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The severity.
    pub level: LogLevel,

    /// The message text.
    pub message: String,

    /// When the message was produced.
    pub time: DateTime<FixedOffset>,
}

/// A file attached to a log entry, such as a screenshot.
///
/// The content is transferred separately from the JSON body, so it is not serialized.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// The file name shown by the backend.
    pub name: String,

    /// The MIME type, e.g. `image/png`.
    #[serde(rename = "type")]
    pub mime_type: String,

    /// The raw file content.
    #[serde(skip)]
    pub content: Vec<u8>,
}
