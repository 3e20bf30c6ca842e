use sbeprims_codec::DecoderConfig;

/// On-the-fly decoder settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OtfConfig {
    /// Limits applied to counts, lengths and nesting.
    pub decoder: DecoderConfig,
}

impl OtfConfig {
    pub fn with_decoder(decoder: DecoderConfig) -> Self {
        Self { decoder }
    }
}
