// ABOUTME: Diagnostics accumulator for non-fatal problems during deploy and teardown.
// ABOUTME: Collects warnings that should be shown to users without failing the command.

/// Collects non-fatal warnings during kiln operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Move every warning out of `other` into this accumulator.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn watch_dropped(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::WatchDropped,
            message: message.into(),
        }
    }

    pub fn scale_down_timeout(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ScaleDownTimeout,
            message: message.into(),
        }
    }

    pub fn scale_down_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ScaleDownFailed,
            message: message.into(),
        }
    }

    pub fn rollout_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RolloutFailed,
            message: message.into(),
        }
    }

    pub fn build_unresolved(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::BuildUnresolved,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Build watch connection ended before the build finished.
    WatchDropped,
    /// Scale-down did not finish in time; teardown went ahead.
    ScaleDownTimeout,
    ScaleDownFailed,
    /// Build finished but triggering the rollout failed.
    RolloutFailed,
    /// Rebuild was forbidden and no earlier build image was found.
    BuildUnresolved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn absorb_keeps_order() {
        let mut first = Diagnostics::default();
        first.warn(Warning::scale_down_timeout("ticker-0 still scaling"));

        let mut second = Diagnostics::default();
        second.warn(Warning::watch_dropped("connection reset"));

        first.absorb(second);
        let kinds: Vec<_> = first.warnings().iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::ScaleDownTimeout, WarningKind::WatchDropped]
        );
    }
}
