use std::fmt;

/// Whether a lifecycle read may see pending records.
///
/// Every read through `PendingLifecycle` takes one of these, so a call site
/// always states its intent. The default hides pending records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    ExcludePending,
    IncludePending,
}

impl Visibility {
    pub fn includes_pending(self) -> bool {
        matches!(self, Self::IncludePending)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcludePending => f.write_str("excluding pending"),
            Self::IncludePending => f.write_str("including pending"),
        }
    }
}
