use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Fault types the framework ships policies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    /// Node goes dark: no messages in or out.
    InDark,
    /// Node pollutes the data it sends.
    Pollution,
    /// Primary delays its proposals.
    SlowProposal,
    /// Induced timeouts.
    Timeout,
}

impl FaultKind {
    pub const ALL: [FaultKind; 4] = [
        FaultKind::InDark,
        FaultKind::Pollution,
        FaultKind::SlowProposal,
        FaultKind::Timeout,
    ];

    /// Policy name used in `protocol.fault-override` and `fault.<name>.*` keys.
    pub fn policy_name(self) -> &'static str {
        match self {
            FaultKind::InDark => "in-dark",
            FaultKind::Pollution => "pollution",
            FaultKind::SlowProposal => "slow-proposal",
            FaultKind::Timeout => "timeout",
        }
    }

    pub fn from_policy_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.policy_name() == name)
    }
}

impl Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.policy_name())
    }
}
