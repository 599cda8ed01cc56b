use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of classifying one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_allowed: bool,
    pub is_flagged: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            is_allowed: true,
            is_flagged: false,
            reason: None,
        }
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    content: &'a str,
}

/// Content classifier consulted for moderated conversations.
pub enum ModerationGate {
    /// Everything is allowed.
    Disabled,
    /// Local word lists, matched case-insensitively against whole words.
    Keywords {
        blocked: Vec<String>,
        flagged: Vec<String>,
    },
    /// Remote classifier: POST `{"content"}` and read back a `Verdict`.
    Remote { client: reqwest::Client, url: String },
}

impl ModerationGate {
    pub fn keywords<I, J, S, T>(blocked: I, flagged: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let normalize = |w: &str| w.trim().to_lowercase();
        Self::Keywords {
            blocked: blocked
                .into_iter()
                .map(|w| normalize(w.as_ref()))
                .filter(|w| !w.is_empty())
                .collect(),
            flagged: flagged
                .into_iter()
                .map(|w| normalize(w.as_ref()))
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn remote(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create moderation HTTP client")?;
        Ok(Self::Remote { client, url })
    }

    /// Classify `content`. A failing remote classifier is an error, never an
    /// implicit allow.
    pub async fn moderate(&self, content: &str) -> Result<Verdict> {
        match self {
            Self::Disabled => Ok(Verdict::allow()),
            Self::Keywords { blocked, flagged } => Ok(classify_keywords(content, blocked, flagged)),
            Self::Remote { client, url } => {
                let response = client
                    .post(url)
                    .json(&ClassifyRequest { content })
                    .send()
                    .await
                    .context("Failed to reach moderation service")?;

                if !response.status().is_success() {
                    anyhow::bail!("Moderation service returned {}", response.status());
                }

                let verdict: Verdict = response
                    .json()
                    .await
                    .context("Failed to parse moderation verdict")?;
                debug!("Remote moderation verdict: {:?}", verdict);
                Ok(verdict)
            }
        }
    }
}

fn classify_keywords(content: &str, blocked: &[String], flagged: &[String]) -> Verdict {
    let lowered = content.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    let hit = |list: &[String]| list.iter().find(|term| words.contains(&term.as_str())).cloned();

    if let Some(term) = hit(blocked) {
        return Verdict {
            is_allowed: false,
            is_flagged: true,
            reason: Some(format!("Contains blocked term \"{}\"", term)),
        };
    }
    if let Some(term) = hit(flagged) {
        return Verdict {
            is_allowed: true,
            is_flagged: true,
            reason: Some(format!("Contains flagged term \"{}\"", term)),
        };
    }
    Verdict::allow()
}
