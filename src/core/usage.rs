use serde::{Deserialize, Serialize};

/// Free-tier allowance of premium-model calls per session.
pub const DEFAULT_PREMIUM_BUDGET: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    #[default]
    Free,
    Premium,
}

impl AccessTier {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessTier::Free => "free",
            AccessTier::Premium => "premium",
        }
    }
}

/// Client-side premium usage counter. Trivially bypassable; it only gates
/// which requests the session is willing to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageMeter {
    tier: AccessTier,
    remaining: i32,
}

impl Default for UsageMeter {
    fn default() -> Self {
        Self::new(AccessTier::Free, DEFAULT_PREMIUM_BUDGET)
    }
}

impl UsageMeter {
    pub fn new(tier: AccessTier, remaining: i32) -> Self {
        Self { tier, remaining }
    }

    pub fn tier(&self) -> AccessTier {
        self.tier
    }

    pub fn remaining(&self) -> i32 {
        self.remaining
    }

    /// Whether a call to a model of `model_tier` may be sent right now
    pub fn allows(&self, model_tier: AccessTier) -> bool {
        !(self.charges(model_tier) && self.remaining <= 0)
    }

    fn charges(&self, model_tier: AccessTier) -> bool {
        self.tier == AccessTier::Free && model_tier == AccessTier::Premium
    }

    /// Account for a call the provider accepted. Returns true when the
    /// budget was charged.
    pub fn record_call(&mut self, model_tier: AccessTier) -> bool {
        if self.charges(model_tier) {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }

    pub fn upgrade(&mut self) {
        self.tier = AccessTier::Premium;
    }

    pub fn status_line(&self) -> String {
        match self.tier {
            AccessTier::Premium => "Premium".to_string(),
            AccessTier::Free => format!("Free ({} premium uses left)", self.remaining),
        }
    }
}
