//! Types for the endpoint module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// Reads packets from an existing file.
    Input,
    /// Writes packets to a new file.
    Output,
}

impl EndpointRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Packets returned by one read.
///
/// `data` borrows the endpoint's reusable buffer and is valid until the next
/// read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketBatch<'a> {
    /// Concatenated packet payload.
    pub data: &'a [u8],
    /// Number of packets in `data`.
    pub packets: u32,
    /// Audio frames those packets carry.
    pub frames: u32,
}

impl PacketBatch<'_> {
    /// Whether the read hit the end of the stream.
    pub fn is_end_of_stream(&self) -> bool {
        self.packets == 0
    }
}
