//! Packet-level access to one open media file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::container::{
    self, ContainerReader, ContainerType, ContainerWriter, SNIFF_LEN,
};
use crate::format::FormatDescriptor;

use super::error::EndpointError;
use super::types::{EndpointRole, PacketBatch};

enum Backing {
    Reader(Box<dyn ContainerReader>),
    Writer(Box<dyn ContainerWriter>),
}

/// One input or output media file.
///
/// Input endpoints expose the source-native format detected from the container;
/// output endpoints carry the format declared at creation. The packet cursor
/// starts at zero and only moves forward. Closing finalizes container headers
/// and is idempotent; dropping an open endpoint closes it.
pub struct StreamEndpoint {
    path: Option<PathBuf>,
    container_type: Option<ContainerType>,
    role: EndpointRole,
    format: FormatDescriptor,
    backing: Option<Backing>,
    cursor: u64,
    frames: u64,
    total_packets: u64,
    total_frames: u64,
    buffer: Vec<u8>,
}

impl StreamEndpoint {
    /// Opens an existing file for reading, detecting its container from magic bytes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EndpointError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => EndpointError::NotFound {
                path: path.to_path_buf(),
            },
            _ => e.into(),
        })?;

        let mut header = Vec::with_capacity(SNIFF_LEN);
        file.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut header)?;
        file.seek(SeekFrom::Start(0))?;

        let backend = container::detect(&header).ok_or_else(|| {
            EndpointError::unsupported_format(format!(
                "{} is not a recognised audio container",
                path.display()
            ))
        })?;
        let container_type = backend.container_type();
        let reader = backend.open_reader(file)?;

        let mut endpoint = Self::from_reader(reader)?;
        endpoint.path = Some(path.to_path_buf());
        endpoint.container_type = Some(container_type);

        info!(
            path = %path.display(),
            container = %container_type,
            format = %endpoint.format,
            frames = endpoint.total_frames,
            "Opened input"
        );
        Ok(endpoint)
    }

    /// Creates (or truncates) a file for writing packets of `format`.
    ///
    /// The format is checked against the container before the file is touched.
    pub fn create(
        path: impl AsRef<Path>,
        container_type: ContainerType,
        format: FormatDescriptor,
    ) -> Result<Self, EndpointError> {
        let path = path.as_ref();
        format.validate()?;
        let backend = container::backend_for(container_type);
        backend.check_format(&format)?;

        let file = File::create(path)?;
        let writer = backend.create_writer(file, &format)?;

        let mut endpoint = Self::from_writer(writer, format)?;
        endpoint.path = Some(path.to_path_buf());
        endpoint.container_type = Some(container_type);

        info!(
            path = %path.display(),
            container = %container_type,
            format = %endpoint.format,
            "Created output"
        );
        Ok(endpoint)
    }

    /// Wraps an already parsed container reader.
    pub fn from_reader(reader: Box<dyn ContainerReader>) -> Result<Self, EndpointError> {
        let format = reader.format().clone();
        format.validate()?;
        Ok(Self {
            path: None,
            container_type: None,
            role: EndpointRole::Input,
            total_packets: reader.total_packets(),
            total_frames: reader.total_frames(),
            format,
            backing: Some(Backing::Reader(reader)),
            cursor: 0,
            frames: 0,
            buffer: Vec::new(),
        })
    }

    /// Wraps a container writer producing packets of `format`.
    pub fn from_writer(
        writer: Box<dyn ContainerWriter>,
        format: FormatDescriptor,
    ) -> Result<Self, EndpointError> {
        format.validate()?;
        Ok(Self {
            path: None,
            container_type: None,
            role: EndpointRole::Output,
            format,
            backing: Some(Backing::Writer(writer)),
            cursor: 0,
            frames: 0,
            total_packets: 0,
            total_frames: 0,
            buffer: Vec::new(),
        })
    }

    /// Reads up to `max_packets` packets at the cursor.
    ///
    /// Returns an empty batch at the end of the stream. The cursor does not move
    /// when the read fails.
    pub fn read_packets(&mut self, max_packets: u32) -> Result<PacketBatch<'_>, EndpointError> {
        let reader = match self.backing.as_mut() {
            None => return Err(EndpointError::Closed),
            Some(Backing::Writer(_)) => {
                return Err(EndpointError::WrongRole {
                    operation: "read packets",
                    role: self.role.as_str(),
                })
            }
            Some(Backing::Reader(reader)) => reader,
        };

        let read = reader.read_packets(self.cursor, max_packets, &mut self.buffer)?;
        self.cursor += u64::from(read.packets);
        self.frames += u64::from(read.frames);

        Ok(PacketBatch {
            data: &self.buffer,
            packets: read.packets,
            frames: read.frames,
        })
    }

    /// Appends `packets` packets carrying `frames` frames at the cursor.
    pub fn write_packets(
        &mut self,
        data: &[u8],
        packets: u32,
        frames: u32,
    ) -> Result<(), EndpointError> {
        let writer = match self.backing.as_mut() {
            None => return Err(EndpointError::Closed),
            Some(Backing::Reader(_)) => {
                return Err(EndpointError::WrongRole {
                    operation: "write packets",
                    role: self.role.as_str(),
                })
            }
            Some(Backing::Writer(writer)) => writer,
        };

        let expected = u64::from(packets) * u64::from(self.format.bytes_per_packet);
        if data.len() as u64 != expected {
            return Err(EndpointError::invalid_packet(format!(
                "{} packets of {} bytes need {} bytes, got {}",
                packets,
                self.format.bytes_per_packet,
                expected,
                data.len()
            )));
        }
        if u64::from(frames) > u64::from(packets) * u64::from(self.format.frames_per_packet) {
            return Err(EndpointError::invalid_packet(format!(
                "{} packets cannot carry {} frames",
                packets, frames
            )));
        }

        writer.write_packets(data, packets, frames)?;
        self.cursor += u64::from(packets);
        self.frames += u64::from(frames);
        Ok(())
    }

    /// Finalizes the container and releases the file.
    ///
    /// Finalization failures are logged, never returned. Calling this again is
    /// a no-op.
    pub fn close(&mut self) {
        let Some(backing) = self.backing.take() else {
            return;
        };
        if let Backing::Writer(mut writer) = backing {
            if let Err(e) = writer.finalize() {
                warn!(
                    path = ?self.path,
                    error = %e,
                    "Failed to finalize output container"
                );
            }
        }
        self.buffer = Vec::new();
        debug!(
            path = ?self.path,
            role = %self.role,
            packets = self.cursor,
            frames = self.frames,
            "Closed endpoint"
        );
    }

    /// Stream format of this endpoint.
    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    /// Container type, when the endpoint was opened from a path.
    pub fn container_type(&self) -> Option<ContainerType> {
        self.container_type
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }

    /// Packets read or written so far.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Frames read or written so far.
    pub fn frames_transferred(&self) -> u64 {
        self.frames
    }

    /// Packets in the source stream (zero for outputs).
    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }

    /// Frames in the source stream from container metadata (zero for outputs).
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn is_open(&self) -> bool {
        self.backing.is_some()
    }
}

impl Drop for StreamEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StreamEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEndpoint")
            .field("path", &self.path)
            .field("container_type", &self.container_type)
            .field("role", &self.role)
            .field("format", &self.format)
            .field("open", &self.is_open())
            .field("cursor", &self.cursor)
            .field("frames", &self.frames)
            .finish()
    }
}
