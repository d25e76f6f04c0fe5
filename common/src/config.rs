use serde::{Deserialize, Serialize};

/// Who fills in ICMPv6 checksums (echo, NS and RS).
///
/// ICMPv6 checksums cover a pseudo-header made of the source and destination
/// IPv6 addresses, so they can only be computed once both are known.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// Builders leave the field at zero and the transmitter completes it.
    #[default]
    Transmitter,
    /// Builders compute the checksum from the interface address and the destination.
    Builder,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub checksum_mode: ChecksumMode,
    /// Rejects unknown step types while the graph is prepared.
    ///
    /// When disabled an unknown node only fails once it is scheduled.
    pub strict_step_types: bool,
}
