//! Prompt scripts
//!
//! The ordered prompt/answer pairs a driven program is expected to go
//! through. The order encodes the program's prompt sequence and is fixed
//! when the script is written; the orchestrator replays it front to back.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use super::matcher::PatternMatcher;
use crate::error::{Error, Result};

/// One prompt to wait for and the line to answer it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptStep {
    pub matcher: PatternMatcher,
    /// Line sent after the prompt, without terminator
    pub response: String,
    /// Overrides the orchestrator's default wait for this prompt
    pub timeout: Option<Duration>,
    /// Keep the response out of logs
    pub secret: bool,
}

impl PromptStep {
    pub fn new(matcher: PatternMatcher, response: impl Into<String>) -> Self {
        Self {
            matcher,
            response: response.into(),
            timeout: None,
            secret: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Response as it may appear in logs
    pub fn loggable_response(&self) -> &str {
        if self.secret {
            "<redacted>"
        } else {
            &self.response
        }
    }
}

/// Ordered prompt/answer sequence for one interactive program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptScript {
    name: String,
    steps: Vec<PromptStep>,
}

impl PromptScript {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step waiting for literal `prompt`
    pub fn expect(mut self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.steps
            .push(PromptStep::new(PatternMatcher::literal(prompt), response));
        self
    }

    /// Append a step whose response is kept out of logs
    pub fn expect_secret(
        mut self,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.steps
            .push(PromptStep::new(PatternMatcher::literal(prompt), response).secret());
        self
    }

    /// Append a fully specified step
    pub fn step(mut self, step: PromptStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[PromptStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Responses in the order they will be sent
    pub fn responses(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.response.as_str()).collect()
    }

    /// Parse a script from TOML
    ///
    /// ```toml
    /// name = "setup"
    ///
    /// [[step]]
    /// expect = "server name"
    /// send = "my-seafile"
    ///
    /// [[step]]
    /// expect = '\[ENTER\]'
    /// regex = true
    /// send = ""
    /// timeout_secs = 300
    /// ```
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self> {
        let file: ScriptFile = toml::from_str(content).map_err(|e| Error::ScriptParseFailed {
            source: origin.to_string(),
            reason: e.to_string(),
        })?;

        let mut script = PromptScript::new(file.name.unwrap_or_else(|| origin.to_string()));
        for (index, entry) in file.step.into_iter().enumerate() {
            let matcher = if entry.regex {
                PatternMatcher::regex(&entry.expect).map_err(|e| Error::ScriptParseFailed {
                    source: origin.to_string(),
                    reason: format!("step {}: {}", index + 1, e),
                })?
            } else {
                PatternMatcher::literal(entry.expect)
            };

            let mut step = PromptStep::new(matcher, entry.send);
            if let Some(secs) = entry.timeout_secs {
                step = step.with_timeout(Duration::from_secs(secs));
            }
            if entry.secret {
                step = step.secret();
            }
            script = script.step(step);
        }
        Ok(script)
    }

    /// Load a script from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, &path.display().to_string())
    }
}

impl fmt::Display for PromptScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} steps)", self.name, self.steps.len())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptFile {
    name: Option<String>,
    #[serde(default)]
    step: Vec<StepEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepEntry {
    expect: String,
    #[serde(default)]
    send: String,
    #[serde(default)]
    regex: bool,
    timeout_secs: Option<u64>,
    #[serde(default)]
    secret: bool,
}
