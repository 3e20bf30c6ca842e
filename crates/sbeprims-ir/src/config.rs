/// Default maximum size of a persisted IR stream: 16 MiB.
pub const DEFAULT_MAX_IR_SIZE: usize = 16 * 1024 * 1024;

/// Default limit on composite/group nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Controls schema resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Maximum nesting of composites within composites and groups within groups.
    pub max_depth: usize,
    /// When true, fields whose deprecated version is at or below the schema
    /// version are rejected instead of kept.
    pub reject_deprecated: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            reject_deprecated: false,
        }
    }
}

/// Controls decoding of persisted IR streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrCodecConfig {
    /// Maximum accepted stream size in bytes. Default: 16 MiB.
    pub max_ir_size: usize,
    /// Maximum nesting accepted while decoding.
    pub max_depth: usize,
}

impl Default for IrCodecConfig {
    fn default() -> Self {
        Self {
            max_ir_size: DEFAULT_MAX_IR_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Controls IR registry loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum number of IR files loaded from a directory.
    pub max_irs_from_directory: usize,
    /// Maximum bytes allowed per IR file loaded from a directory.
    pub max_ir_file_size: usize,
    /// When true, registering a schema id that is already present fails
    /// unless the new IR has a strictly higher version.
    pub reject_downgrades: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_irs_from_directory: 256,
            max_ir_file_size: 4 * 1024 * 1024,
            reject_downgrades: true,
        }
    }
}
