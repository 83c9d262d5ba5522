use std::fmt;

/// Which backend strategy a store implements
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process store, private to one running instance
    Local,
    /// Networked store shared by every instance
    Redis,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Redis => "redis",
        }
    }

    pub fn is_distributed(&self) -> bool {
        matches!(self, BackendKind::Redis)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
