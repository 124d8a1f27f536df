use crate::{diagnostics::Diagnostics, BackendDescriptor};
use std::fmt;

/// Why the resolver decided as it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionReason {
    /// A pre-configured simple binding is installed; it brings its own setup.
    PreconfiguredBinding,
    /// Exactly one backend is present.
    SingleCandidate,
    /// Several backends are present; the one with the highest priority was chosen.
    HighestPriority,
    /// No backend is present; the environment's own defaults apply.
    NoneFound,
}

/// The result of resolving the detected backends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionOutcome {
    /// The backend to configure, if any.
    pub winner: Option<&'static BackendDescriptor>,
    /// The present backends that lost against the winner.
    pub conflicts: Vec<&'static BackendDescriptor>,
    /// Why.
    pub reason: ResolutionReason,
}

/// Signals beyond the detected backends that the resolver considers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Signals {
    /// The pre-configured simple binding is installed.
    pub simple_binding: bool,
    /// The formatting variant of the simple binding is installed.
    pub fmt_simple: bool,
}

// Picks exactly one backend by fixed priority.
pub(crate) struct Resolver<'a> {
    pub(crate) diagnostics: &'a Diagnostics,
}

impl Resolver<'_> {
    pub(crate) fn resolve(
        &self,
        signals: Signals,
        detected: &[&'static BackendDescriptor],
    ) -> ResolutionOutcome {
        let outcome = resolve(signals, detected);
        match outcome.reason {
            ResolutionReason::PreconfiguredBinding => {
                self.diagnostics
                    .log_logging(format_args!("simple logger binding found"));
            }
            ResolutionReason::NoneFound => {
                self.diagnostics
                    .log_logging(format_args!("None of tracing, logspec nor stderr found"));
            }
            ResolutionReason::HighestPriority => {
                if let Some(winner) = outcome.winner {
                    self.diagnostics.log_always(format_args!(
                        "Found {} setups; using {}",
                        Names(detected),
                        winner.display_name
                    ));
                }
            }
            ResolutionReason::SingleCandidate => {}
        }
        if signals.fmt_simple && outcome.reason != ResolutionReason::PreconfiguredBinding {
            self.diagnostics
                .log_logging(format_args!("fmt-simple binding found, not acted upon"));
        }
        outcome
    }
}

/// Picks the winner among the detected backends.
///
/// A pure function of its input: the pre-configured simple binding
/// short-circuits, otherwise the real backend that comes first in
/// [`REGISTRY`](crate::REGISTRY) wins.
#[must_use]
pub fn resolve(signals: Signals, detected: &[&'static BackendDescriptor]) -> ResolutionOutcome {
    if signals.simple_binding {
        return ResolutionOutcome {
            winner: None,
            conflicts: Vec::new(),
            reason: ResolutionReason::PreconfiguredBinding,
        };
    }

    let mut candidates: Vec<&'static BackendDescriptor> = detected
        .iter()
        .copied()
        .filter(|descriptor| descriptor.is_real())
        .collect();
    candidates.sort_by_key(|descriptor| descriptor.priority());
    candidates.dedup();

    let mut candidates = candidates.into_iter();
    match candidates.next() {
        None => ResolutionOutcome {
            winner: None,
            conflicts: Vec::new(),
            reason: ResolutionReason::NoneFound,
        },
        Some(winner) => {
            let conflicts: Vec<_> = candidates.collect();
            let reason = if conflicts.is_empty() {
                ResolutionReason::SingleCandidate
            } else {
                ResolutionReason::HighestPriority
            };
            ResolutionOutcome {
                winner: Some(winner),
                conflicts,
                reason,
            }
        }
    }
}

// "a, b and c"
struct Names<'a>(&'a [&'static BackendDescriptor]);

impl fmt::Display for Names<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|d| d.display_name).collect();
        match names.split_last() {
            None => Ok(()),
            Some((last, [])) => f.write_str(last),
            Some((last, init)) => write!(f, "{} and {last}", init.join(", ")),
        }
    }
}
