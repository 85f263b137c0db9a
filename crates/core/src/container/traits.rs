//! Trait definitions for the container module.

use std::fs::File;

use crate::format::FormatDescriptor;

use super::error::ContainerError;
use super::types::{ContainerType, PacketRead};

/// Packet-level access to the stream stored in an existing container.
pub trait ContainerReader: Send {
    /// Stream format parsed from the container metadata.
    fn format(&self) -> &FormatDescriptor;

    /// Number of packets in the stream.
    fn total_packets(&self) -> u64;

    /// Number of frames in the stream, from the container metadata.
    fn total_frames(&self) -> u64;

    /// Reads up to `max_packets` packets starting at packet `start_packet`.
    ///
    /// `buf` is cleared and filled with the packet payload. Returns zero packets
    /// at the end of the stream.
    fn read_packets(
        &mut self,
        start_packet: u64,
        max_packets: u32,
        buf: &mut Vec<u8>,
    ) -> Result<PacketRead, ContainerError>;
}

/// Packet-level appends to a container being written.
pub trait ContainerWriter: Send {
    /// Appends `packets` packets carrying `frames` frames.
    fn write_packets(&mut self, data: &[u8], packets: u32, frames: u32)
        -> Result<(), ContainerError>;

    /// Patches header sizes and frame counts and flushes the file.
    fn finalize(&mut self) -> Result<(), ContainerError>;
}

/// A container type that can be parsed and written.
pub trait ContainerBackend: Send + Sync {
    /// The container type handled by this backend.
    fn container_type(&self) -> ContainerType;

    /// Whether `header` (the first bytes of a file) belongs to this container.
    fn sniff(&self, header: &[u8]) -> bool;

    /// Checks that the container can carry a stream of `format`.
    fn check_format(&self, format: &FormatDescriptor) -> Result<(), ContainerError>;

    /// Parses the container metadata of an open file.
    fn open_reader(&self, file: File) -> Result<Box<dyn ContainerReader>, ContainerError>;

    /// Writes provisional headers for a stream of `format`.
    fn create_writer(
        &self,
        file: File,
        format: &FormatDescriptor,
    ) -> Result<Box<dyn ContainerWriter>, ContainerError>;
}
