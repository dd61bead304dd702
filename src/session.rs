//! Browser session contract.
//!
//! The core consumes, but never implements, the browser driver. A real
//! implementation wraps CDP/WebDriver; tests and the demo use the
//! scripted session in [`crate::testkit`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use webrover_core_types::{InteractiveElement, RoverError};

/// How long navigation waits before the page counts as arrived.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    #[default]
    Load,
    NetworkIdle,
    None,
}

#[async_trait]
pub trait Session: Send + Sync {
    /// Open the session at `url`. Returns false when the target refused.
    async fn start(&self, url: &str) -> Result<bool, RoverError>;

    /// URL the browser currently shows, which after an action may differ
    /// from the nominal link target.
    async fn current_url(&self) -> Result<String, RoverError>;

    async fn navigate(&self, url: &str, wait: WaitPolicy) -> Result<(), RoverError>;

    /// Capture a screenshot into `dir`; `None` when the driver cannot
    /// produce one (vision is an optimization, not a requirement).
    async fn take_screenshot(&self, dir: &Path, name: &str)
        -> Result<Option<PathBuf>, RoverError>;

    async fn extract_interactive_elements(&self) -> Result<Vec<InteractiveElement>, RoverError>;

    async fn close(&self) -> Result<(), RoverError>;
}
