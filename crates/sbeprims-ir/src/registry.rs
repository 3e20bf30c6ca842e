use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::decode_ir_with_config;
use crate::config::{IrCodecConfig, RegistryConfig};
use crate::error::{IrError, Result};
use crate::ir::{Ir, Message};

/// File extension of persisted IR streams.
pub const IR_FILE_EXTENSION: &str = "sbeir";

/// Schema-id keyed collection of frozen IRs.
///
/// IRs are shared as `Arc<Ir>` so decoders on other threads can hold one
/// while the registry is updated.
pub struct IrRegistry {
    irs: HashMap<u16, Arc<Ir>>,
    config: RegistryConfig,
}

impl IrRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            irs: HashMap::new(),
            config,
        }
    }

    /// Register an IR under its schema id.
    ///
    /// With `reject_downgrades` set, replacing an IR requires a strictly
    /// higher schema version.
    pub fn register(&mut self, ir: impl Into<Arc<Ir>>) -> Result<Arc<Ir>> {
        let ir = ir.into();
        let schema_id = ir.schema_id();
        if let Some(existing) = self.irs.get(&schema_id) {
            if self.config.reject_downgrades && ir.version() <= existing.version() {
                return Err(IrError::LoadFailed(format!(
                    "schema {schema_id} version {} does not supersede registered version {}",
                    ir.version(),
                    existing.version()
                )));
            }
            warn!(
                schema_id,
                old_version = existing.version(),
                new_version = ir.version(),
                "replacing registered schema IR"
            );
        } else {
            debug!(
                schema_id,
                version = ir.version(),
                package = %ir.package(),
                "registered schema IR"
            );
        }
        self.irs.insert(schema_id, Arc::clone(&ir));
        Ok(ir)
    }

    /// Decode a persisted IR stream and register it.
    pub fn register_bytes(&mut self, bytes: &[u8]) -> Result<Arc<Ir>> {
        let config = IrCodecConfig {
            max_ir_size: self.config.max_ir_file_size,
            ..IrCodecConfig::default()
        };
        let ir = decode_ir_with_config(bytes, &config)?;
        self.register(ir)
    }

    /// Load every `*.sbeir` file in a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load every `*.sbeir` file in a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        let mut loaded_ir_count = 0usize;

        let mut entries = std::fs::read_dir(path)
            .map_err(|err| IrError::LoadFailed(format!("{}: {err}", path.display())))?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|err| IrError::LoadFailed(err.to_string()))?;
        // Directory order is unspecified; sort so replacement order is stable.
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let entry_path = entry.path();
            let is_ir_file = entry_path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(IR_FILE_EXTENSION));
            let path_metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| IrError::LoadFailed(err.to_string()))?;
            let file_type = path_metadata.file_type();

            if file_type.is_symlink() {
                if is_ir_file {
                    return Err(IrError::LoadFailed(format!(
                        "refusing to load IR symlink: {file_name}"
                    )));
                }
                continue;
            }
            if !file_type.is_file() || !is_ir_file {
                continue;
            }

            loaded_ir_count = loaded_ir_count.saturating_add(1);
            if loaded_ir_count > registry.config.max_irs_from_directory {
                return Err(IrError::LoadFailed(format!(
                    "IR count exceeds configured max ({}): {}",
                    registry.config.max_irs_from_directory, loaded_ir_count
                )));
            }

            let file = std::fs::File::open(&entry_path).map_err(|err| {
                IrError::LoadFailed(format!("failed opening IR {}: {err}", entry_path.display()))
            })?;
            let opened_metadata = file
                .metadata()
                .map_err(|err| IrError::LoadFailed(err.to_string()))?;

            #[cfg(unix)]
            {
                if !same_file_identity(&path_metadata, &opened_metadata) {
                    return Err(IrError::LoadFailed(format!(
                        "IR file changed during load: {file_name}"
                    )));
                }
            }

            if opened_metadata.len() > registry.config.max_ir_file_size as u64 {
                return Err(IrError::LoadFailed(format!(
                    "IR file too large ({} bytes): {file_name}",
                    opened_metadata.len()
                )));
            }

            let max_bytes = registry.config.max_ir_file_size;
            let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
            let mut content = Vec::new();
            file.take(read_limit)
                .read_to_end(&mut content)
                .map_err(|err| {
                    IrError::LoadFailed(format!(
                        "failed reading IR {}: {err}",
                        entry_path.display()
                    ))
                })?;
            if content.len() > max_bytes {
                return Err(IrError::LoadFailed(format!(
                    "IR file too large while reading: {file_name}"
                )));
            }

            registry.register_bytes(&content).map_err(|err| match err {
                IrError::Format(reason) => IrError::Format(format!("{file_name}: {reason}")),
                other => other,
            })?;
        }

        debug!(path = %path.display(), schemas = registry.irs.len(), "loaded IR directory");
        Ok(registry)
    }

    /// The IR registered for `schema_id`.
    pub fn get(&self, schema_id: u16) -> Result<Arc<Ir>> {
        self.irs
            .get(&schema_id)
            .cloned()
            .ok_or(IrError::UnknownSchema(schema_id))
    }

    /// Look up a message template in a registered schema.
    pub fn message(&self, schema_id: u16, template_id: u16) -> Result<(Arc<Ir>, &Message)> {
        let ir = self
            .irs
            .get(&schema_id)
            .ok_or(IrError::UnknownSchema(schema_id))?;
        let message = ir
            .message_by_id(template_id)
            .ok_or(IrError::UnknownTemplate {
                schema_id,
                template_id,
            })?;
        Ok((Arc::clone(ir), message))
    }

    /// Remove and return the IR for `schema_id`.
    pub fn remove(&mut self, schema_id: u16) -> Option<Arc<Ir>> {
        self.irs.remove(&schema_id)
    }

    pub fn has_schema(&self, schema_id: u16) -> bool {
        self.irs.contains_key(&schema_id)
    }

    /// Registered schema ids, ascending.
    pub fn schema_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.irs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.irs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.irs.is_empty()
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for IrRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn same_file_identity(
    path_metadata: &std::fs::Metadata,
    opened_metadata: &std::fs::Metadata,
) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::codec::encode_ir_to_vec;
    use crate::{SchemaBuilder, SchemaDef};

    fn schema(id: u16, version: u16) -> Ir {
        let json = format!(
            r#"{{ "package": "p{id}", "id": {id}, "version": {version}, "messages": [
                {{ "name": "Ping", "id": 1, "fields": [{{ "name": "seq", "type": "uint32" }}] }}
            ]}}"#
        );
        SchemaBuilder::default()
            .build(&SchemaDef::from_json(&json).unwrap())
            .unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = IrRegistry::new();
        registry.register(schema(7, 0)).unwrap();

        assert!(registry.has_schema(7));
        assert_eq!(registry.get(7).unwrap().package(), "p7");
        let (_, message) = registry.message(7, 1).unwrap();
        assert_eq!(message.name, "Ping");
    }

    #[test]
    fn unknown_schema_and_template_are_lookup_errors() {
        let mut registry = IrRegistry::new();
        registry.register(schema(7, 0)).unwrap();

        let err = registry.get(8).unwrap_err();
        assert!(matches!(err, IrError::UnknownSchema(8)));
        assert_eq!(err.kind(), sbeprims_primitive::ErrorKind::Lookup);
        assert!(matches!(
            registry.message(7, 99),
            Err(IrError::UnknownTemplate {
                schema_id: 7,
                template_id: 99
            })
        ));
    }

    #[test]
    fn downgrades_are_rejected_by_default() {
        let mut registry = IrRegistry::new();
        registry.register(schema(1, 2)).unwrap();

        assert!(matches!(
            registry.register(schema(1, 2)),
            Err(IrError::LoadFailed(_))
        ));
        registry.register(schema(1, 3)).unwrap();
        assert_eq!(registry.get(1).unwrap().version(), 3);

        let mut permissive = IrRegistry::with_config(RegistryConfig {
            reject_downgrades: false,
            ..RegistryConfig::default()
        });
        permissive.register(schema(1, 3)).unwrap();
        permissive.register(schema(1, 1)).unwrap();
        assert_eq!(permissive.get(1).unwrap().version(), 1);
    }

    #[test]
    fn register_bytes_decodes_streams() {
        let mut registry = IrRegistry::new();
        let bytes = encode_ir_to_vec(&schema(3, 0)).unwrap();
        registry.register_bytes(&bytes).unwrap();
        assert_eq!(registry.schema_ids(), vec![3]);

        assert!(matches!(
            registry.register_bytes(b"not an IR"),
            Err(IrError::Format(_))
        ));
    }

    #[test]
    fn from_directory_loads_ir_files() {
        let dir = make_temp_ir_dir("from-directory");
        write_ir(&dir, "a.sbeir", &schema(2, 0));
        write_ir(&dir, "b.sbeir", &schema(1, 0));
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let registry = IrRegistry::from_directory(&dir).unwrap();
        assert_eq!(registry.schema_ids(), vec![1, 2]);
        assert_eq!(registry.len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn from_directory_enforces_limits() {
        let dir = make_temp_ir_dir("limits");
        write_ir(&dir, "a.sbeir", &schema(1, 0));
        write_ir(&dir, "b.sbeir", &schema(2, 0));

        let too_many = IrRegistry::from_directory_with_config(
            &dir,
            RegistryConfig {
                max_irs_from_directory: 1,
                ..RegistryConfig::default()
            },
        );
        assert!(matches!(too_many, Err(IrError::LoadFailed(_))));

        let too_big = IrRegistry::from_directory_with_config(
            &dir,
            RegistryConfig {
                max_ir_file_size: 8,
                ..RegistryConfig::default()
            },
        );
        assert!(matches!(too_big, Err(IrError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn from_directory_reports_corrupt_files() {
        let dir = make_temp_ir_dir("corrupt");
        std::fs::write(dir.join("bad.sbeir"), b"SBIR garbage").unwrap();

        let err = IrRegistry::from_directory(&dir).err().unwrap();
        assert!(matches!(err, IrError::Format(ref reason) if reason.starts_with("bad.sbeir")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn from_directory_refuses_symlinks() {
        let dir = make_temp_ir_dir("symlink");
        let target = make_temp_ir_dir("symlink-target");
        write_ir(&target, "real.sbeir", &schema(1, 0));
        std::os::unix::fs::symlink(target.join("real.sbeir"), dir.join("link.sbeir")).unwrap();

        assert!(matches!(
            IrRegistry::from_directory(&dir),
            Err(IrError::LoadFailed(_))
        ));

        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::remove_dir_all(&target);
    }

    #[test]
    fn missing_directory_fails() {
        let dir = std::env::temp_dir().join("sbeprims-ir-registry-does-not-exist");
        assert!(matches!(
            IrRegistry::from_directory(&dir),
            Err(IrError::LoadFailed(_))
        ));
    }

    fn make_temp_ir_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sbeprims-ir-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_ir(dir: &Path, file_name: &str, ir: &Ir) {
        std::fs::write(dir.join(file_name), encode_ir_to_vec(ir).unwrap()).unwrap();
    }
}
