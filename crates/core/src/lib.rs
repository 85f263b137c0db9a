pub mod codec;
pub mod config;
pub mod container;
pub mod endpoint;
pub mod engine;
pub mod format;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, JobConfig,
    TargetCodec, TargetFormat,
};
pub use container::ContainerType;
pub use endpoint::{EndpointError, EndpointRole, ErrorKind, PacketBatch, StreamEndpoint};
pub use engine::{
    run_job, run_job_with_progress, CancellationFlag, ConversionEngine, ConversionError,
    ConversionProgress, ConversionReport, ConverterConfig, EngineState,
};
pub use format::{ChannelLayoutTag, CodecId, FormatDescriptor, FormatError};
