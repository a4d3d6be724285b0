use crate::error::JitError;

/// Default code cache size: 16 MiB.
pub const DEFAULT_CODE_CACHE_BYTES: usize = 16 * 1024 * 1024;

/// Default translation-table size (must stay a power of two).
pub const DEFAULT_TRANSLATION_TABLE_SIZE: usize = 4096;

/// Default per-block guest instruction budget.
pub const DEFAULT_MAX_BLOCK_INSTRUCTIONS: usize = 64;

/// Tunables for a [`crate::JitContext`][jit-context]-equivalent embedder.
///
/// [jit-context]: ../../jitaarch64_exec/struct.JitContext.html
#[derive(Debug, Clone, Copy)]
pub struct JitConfig {
    /// Total byte size of the code cache. Zero means "use the default".
    pub code_cache_bytes: usize,
    /// Number of slots in the direct-mapped translation table. Must be a power of two.
    pub translation_table_size: usize,
    /// Maximum number of guest instructions translated into a single block.
    pub max_block_instructions: usize,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            code_cache_bytes: DEFAULT_CODE_CACHE_BYTES,
            translation_table_size: DEFAULT_TRANSLATION_TABLE_SIZE,
            max_block_instructions: DEFAULT_MAX_BLOCK_INSTRUCTIONS,
        }
    }
}

impl JitConfig {
    /// Build a config, substituting defaults for zero fields and validating the rest.
    pub fn new(
        code_cache_bytes: usize,
        translation_table_size: usize,
        max_block_instructions: usize,
    ) -> Result<Self, JitError> {
        let code_cache_bytes = if code_cache_bytes == 0 {
            DEFAULT_CODE_CACHE_BYTES
        } else {
            code_cache_bytes
        };
        let translation_table_size = if translation_table_size == 0 {
            DEFAULT_TRANSLATION_TABLE_SIZE
        } else {
            translation_table_size
        };
        let max_block_instructions = if max_block_instructions == 0 {
            DEFAULT_MAX_BLOCK_INSTRUCTIONS
        } else {
            max_block_instructions
        };

        if !translation_table_size.is_power_of_two() {
            return Err(JitError::InvalidArgument(format!(
                "translation_table_size {translation_table_size} is not a power of two"
            )));
        }

        Ok(Self {
            code_cache_bytes,
            translation_table_size,
            max_block_instructions,
        })
    }

    pub fn validate(&self) -> Result<(), JitError> {
        if !self.translation_table_size.is_power_of_two() {
            return Err(JitError::InvalidArgument(format!(
                "translation_table_size {} is not a power of two",
                self.translation_table_size
            )));
        }
        if self.code_cache_bytes == 0 {
            return Err(JitError::InvalidArgument(
                "code_cache_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_values() {
        let cfg = JitConfig::default();
        assert_eq!(cfg.code_cache_bytes, 16 * 1024 * 1024);
        assert_eq!(cfg.translation_table_size, 4096);
        assert_eq!(cfg.max_block_instructions, 64);
    }

    #[test]
    fn zero_fields_substitute_defaults() {
        let cfg = JitConfig::new(0, 0, 0).unwrap();
        assert_eq!(cfg.code_cache_bytes, DEFAULT_CODE_CACHE_BYTES);
        assert_eq!(cfg.translation_table_size, DEFAULT_TRANSLATION_TABLE_SIZE);
        assert_eq!(cfg.max_block_instructions, DEFAULT_MAX_BLOCK_INSTRUCTIONS);
    }

    #[test]
    fn non_power_of_two_table_size_rejected() {
        let err = JitConfig::new(1024, 4000, 64).unwrap_err();
        assert!(matches!(err, JitError::InvalidArgument(_)));
    }
}
