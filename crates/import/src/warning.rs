use std::fmt;

/// Non-fatal findings collected while importing or tagging. Each is also
/// emitted as a `tracing` warning when it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// A refund whose original transaction is absent from the batch, or was
    /// already consumed by an earlier refund.
    OrphanRefund {
        refund_id: String,
        original_id: String,
    },
    /// A regex pattern that failed to compile and never matches.
    InvalidPattern { selector: String, pattern: String },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::OrphanRefund {
                refund_id,
                original_id,
            } => write!(
                f,
                "refund {refund_id} has no original transaction {original_id}"
            ),
            ImportWarning::InvalidPattern { selector, pattern } => {
                write!(f, "invalid regex for {selector}: {pattern}")
            }
        }
    }
}

/// Sink for warnings; the vector is handed back to the caller with the result.
#[derive(Debug, Default)]
pub struct Warnings(Vec<ImportWarning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: ImportWarning) {
        tracing::warn!("{warning}");
        self.0.push(warning);
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = ImportWarning>) {
        for w in warnings {
            self.push(w);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<ImportWarning> {
        self.0
    }
}
