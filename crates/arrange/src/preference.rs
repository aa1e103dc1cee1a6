use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;
use timeline::{ClipId, TrackKind, Units};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Per-user answer to "this drop covers another clip".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPreference {
    #[default]
    Ask,
    AlwaysReplace,
    NeverReplace,
}

impl fmt::Display for OverlapPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ask => "ask",
            Self::AlwaysReplace => "always_replace",
            Self::NeverReplace => "never_replace",
        })
    }
}

impl FromStr for OverlapPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "ask" => Ok(Self::Ask),
            "always_replace" | "always" => Ok(Self::AlwaysReplace),
            "never_replace" | "never" => Ok(Self::NeverReplace),
            other => Err(format!("unknown overlap preference: {}", other)),
        }
    }
}

/// What the commit does with a drop that crossed the replace threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceDecision {
    Replace,
    Reposition,
    /// Nothing is committed
    Abandon,
}

/// Details handed to the confirmation UI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplaceRequest {
    pub dragged: ClipId,
    pub target: ClipId,
    pub kind: TrackKind,
    pub lane: usize,
    pub position: Units,
    pub overlap_ratio: f64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    /// The prompt went away without an answer
    #[error("confirmation dismissed")]
    Dismissed,
    #[error("confirmation failed: {0}")]
    Failed(String),
}

/// Asks the user whether a drop may replace the clip underneath.
pub trait ReplaceConfirmer {
    fn confirm_replace(&self, request: ReplaceRequest) -> BoxFuture<'static, Result<bool, ConfirmError>>;
}

/// Always answers the same way; `None` behaves like a dismissed prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedConfirmer(pub Option<bool>);

impl ReplaceConfirmer for FixedConfirmer {
    fn confirm_replace(&self, _request: ReplaceRequest) -> BoxFuture<'static, Result<bool, ConfirmError>> {
        let answer = self.0;
        Box::pin(async move { answer.ok_or(ConfirmError::Dismissed) })
    }
}

/// A pending question for whoever drains the prompt channel.
#[derive(Debug)]
pub struct ReplacePrompt {
    pub request: ReplaceRequest,
    pub respond: oneshot::Sender<bool>,
}

/// Forwards each question over a channel; dropping the responder counts as dismissal.
#[derive(Clone, Debug)]
pub struct ChannelConfirmer {
    prompts: mpsc::UnboundedSender<ReplacePrompt>,
}

impl ChannelConfirmer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReplacePrompt>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { prompts: tx }, rx)
    }
}

impl ReplaceConfirmer for ChannelConfirmer {
    fn confirm_replace(&self, request: ReplaceRequest) -> BoxFuture<'static, Result<bool, ConfirmError>> {
        let (respond, answer) = oneshot::channel();
        let closed = self.prompts.send(ReplacePrompt { request, respond }).is_err();
        Box::pin(async move {
            if closed {
                return Err(ConfirmError::Failed("prompt receiver closed".to_string()));
            }
            answer.await.map_err(|_| ConfirmError::Dismissed)
        })
    }
}

/// Turn the user's preference (and, for `Ask`, their answer) into a decision.
/// Only called at commit time.
pub async fn resolve_replace(
    preference: OverlapPreference,
    confirmer: &dyn ReplaceConfirmer,
    request: ReplaceRequest,
    timeout: Option<Duration>,
) -> ReplaceDecision {
    match preference {
        OverlapPreference::AlwaysReplace => ReplaceDecision::Replace,
        OverlapPreference::NeverReplace => ReplaceDecision::Reposition,
        OverlapPreference::Ask => {
            let target = request.target;
            let pending = confirmer.confirm_replace(request);
            let answer = match timeout {
                Some(limit) => match tokio::time::timeout(limit, pending).await {
                    Ok(answer) => answer,
                    Err(_) => {
                        warn!(%target, ?limit, "replace confirmation timed out; repositioning");
                        return ReplaceDecision::Reposition;
                    }
                },
                None => pending.await,
            };
            match answer {
                Ok(true) => ReplaceDecision::Replace,
                Ok(false) => ReplaceDecision::Reposition,
                Err(ConfirmError::Dismissed) => {
                    debug!(%target, "replace prompt dismissed; abandoning drop");
                    ReplaceDecision::Abandon
                }
                Err(err) => {
                    warn!(%target, error = %err, "replace confirmation failed; repositioning");
                    ReplaceDecision::Reposition
                }
            }
        }
    }
}
