use std::time::Duration;

/// TTL tiers by volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Pipeline listings change with every stage move
    Pipeline,
    Search,
    Profile,
    Session,
    Config,
}

impl CacheTtl {
    pub fn duration(self) -> Duration {
        match self {
            CacheTtl::Pipeline => Duration::from_secs(60),
            CacheTtl::Search => Duration::from_secs(5 * 60),
            CacheTtl::Profile => Duration::from_secs(5 * 60),
            CacheTtl::Session => Duration::from_secs(60 * 60),
            CacheTtl::Config => Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl From<CacheTtl> for Duration {
    fn from(ttl: CacheTtl) -> Self {
        ttl.duration()
    }
}
