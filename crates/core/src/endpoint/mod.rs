//! Stream endpoints.
//!
//! A [`StreamEndpoint`] wraps one media file in either the input or the output
//! role and moves whole packets between the file and the caller. Containers are
//! reached through the [`container`](crate::container) backends; substitute
//! backends plug in through [`StreamEndpoint::from_reader`] and
//! [`StreamEndpoint::from_writer`].
//!
//! # Example
//!
//! ```ignore
//! use audioconv_core::endpoint::StreamEndpoint;
//!
//! let mut input = StreamEndpoint::open("take1.wav")?;
//! loop {
//!     let batch = input.read_packets(256)?;
//!     if batch.is_end_of_stream() {
//!         break;
//!     }
//!     println!("{} frames", batch.frames);
//! }
//! input.close();
//! ```

mod error;
mod stream;
mod types;

pub use error::{EndpointError, ErrorKind};
pub use stream::StreamEndpoint;
pub use types::{EndpointRole, PacketBatch};
