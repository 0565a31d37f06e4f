use crate::error::Error;
use crate::media::MediaKind;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::info;

/// Two files whose fingerprints fell under the threshold, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatePair {
    pub first: PathBuf,
    pub first_kind: MediaKind,
    pub second: PathBuf,
    pub second_kind: MediaKind,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Delete the second file.
    KeepFirst,
    /// Delete the first file.
    KeepSecond,
    KeepBoth,
    /// Move the second file into the relocation directory.
    Relocate,
    /// Stop the run; remaining pairs are not looked at.
    Abort,
}

/// Supplies a decision for each duplicate pair: an operator, a fixed policy, or a script.
pub trait DecisionSource {
    fn decide(&mut self, pair: &DuplicatePair) -> Result<Decision, Error>;
}

/// Same decision for every pair (batch and move modes).
pub struct FixedPolicy {
    decision: Decision,
}

impl FixedPolicy {
    pub fn new(decision: Decision) -> Self {
        Self { decision }
    }
}

impl DecisionSource for FixedPolicy {
    fn decide(&mut self, pair: &DuplicatePair) -> Result<Decision, Error> {
        info!(
            "Automatic {:?} for {} / {}",
            self.decision,
            pair.first.display(),
            pair.second.display()
        );
        Ok(self.decision)
    }
}

/// Replays a prepared list, then falls back to a default once it runs out.
pub struct ScriptedDecisions {
    script: VecDeque<Decision>,
    fallback: Decision,
    seen: Vec<DuplicatePair>,
}

impl ScriptedDecisions {
    pub fn new(script: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: Decision::KeepBoth,
            seen: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Decision) -> Self {
        self.fallback = fallback;
        self
    }

    /// Every pair this source was asked about, in order.
    pub fn seen(&self) -> &[DuplicatePair] {
        &self.seen
    }
}

impl Default for ScriptedDecisions {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DecisionSource for ScriptedDecisions {
    fn decide(&mut self, pair: &DuplicatePair) -> Result<Decision, Error> {
        self.seen.push(pair.clone());
        Ok(self.script.pop_front().unwrap_or(self.fallback))
    }
}
