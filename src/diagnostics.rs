// ABOUTME: Diagnostics accumulator for non-fatal warnings during operations.
// ABOUTME: Collects cleanup problems that must not fail or mask an operation's outcome.

/// Collects non-fatal warnings during orchestration.
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

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// A non-fatal warning.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A compensation step of a failed deploy could not be undone.
    pub fn compensation(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CompensationFailed,
            message: message.into(),
        }
    }

    /// A DNS record could not be removed and is left behind.
    pub fn dns_orphan(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DnsOrphan,
            message: message.into(),
        }
    }

    /// A deployment's source directory or image could not be cleaned up.
    pub fn cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Cleanup,
            message: message.into(),
        }
    }

    /// The reverse-proxy configuration could not be refreshed.
    pub fn proxy(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ProxyRefresh,
            message: message.into(),
        }
    }
}

/// Categories of non-fatal warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A saga compensation step failed.
    CompensationFailed,
    /// A DNS record was left at the provider.
    DnsOrphan,
    /// Leftover files or images.
    Cleanup,
    /// Failed to rewrite proxy configuration.
    ProxyRefresh,
}
