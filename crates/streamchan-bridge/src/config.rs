use streamchan_codec::{PacketConfig, DEFAULT_MAX_PAYLOAD};

use crate::retry::RetryPolicy;

/// Configuration shared by readers and writers.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Capacity of channels the bridge creates itself. Default: 1, the
    /// tightest handoff a Tokio channel supports. Zero is treated as 1.
    pub channel_capacity: usize,
    /// Maximum packet body size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Fault handling policy.
    pub retry: RetryPolicy,
    /// Writers only: shut down the write half of the stream when the loop
    /// exits, so the peer reader sees end of stream. Default: true.
    pub shutdown_stream_on_exit: bool,
}

impl BridgeConfig {
    pub(crate) fn capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }

    pub(crate) fn packet_config(&self) -> PacketConfig {
        PacketConfig {
            max_payload_size: self.max_payload_size,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            retry: RetryPolicy::default(),
            shutdown_stream_on_exit: true,
        }
    }
}
