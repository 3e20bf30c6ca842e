/// Hard limits applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum element count accepted from a group dimension header.
    pub max_group_count: usize,
    /// Maximum var-data payload length accepted from a length prefix.
    pub max_var_data_length: usize,
    /// Maximum group nesting walked.
    pub max_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_group_count: 65_535,
            max_var_data_length: 16 * 1024 * 1024,
            max_depth: 32,
        }
    }
}
