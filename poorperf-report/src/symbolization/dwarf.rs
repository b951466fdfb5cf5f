//! In-process DWARF resolver
//!
//! Reads each binary's debug sections once per run and looks every address
//! up directly, without spawning a helper process. Output mirrors the
//! external tool: `??` for an address with no known function.

use super::resolver::{expect_one_name_per_address, SymbolResolver};
use crate::domain::{Address, ResolverError, SymbolName};
use addr2line::Context;
use gimli::{EndianArcSlice, RunTimeEndian};
use object::{Object, ObjectSection};
use rustc_demangle::demangle;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Name reported for an address without debug info, as `addr2line` does.
pub const UNKNOWN_FUNCTION: &str = "??";

/// Address lookup over one binary's DWARF sections.
pub struct DwarfSymbolizer {
    ctx: Context<EndianArcSlice<RunTimeEndian>>,
    demangle: bool,
    /// Cache of resolved names by address
    cache: HashMap<u64, SymbolName>,
}

impl DwarfSymbolizer {
    /// Load debug info for `binary_path`.
    ///
    /// # Errors
    /// Returns an error if the binary cannot be read or parsed, or its DWARF is invalid.
    pub fn new(binary_path: &Path, demangle: bool) -> Result<Self, ResolverError> {
        let debug_info = |reason: String| ResolverError::DebugInfo {
            binary: binary_path.to_path_buf(),
            reason,
        };

        let binary_data = fs::read(binary_path)?;
        let obj_file =
            object::File::parse(&*binary_data).map_err(|e| debug_info(e.to_string()))?;

        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section =
            |id: gimli::SectionId| -> Result<EndianArcSlice<RunTimeEndian>, gimli::Error> {
                let data = obj_file
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
                Ok(EndianArcSlice::new(Arc::from(&*data), endian))
            };

        let dwarf = gimli::Dwarf::load(&load_section).map_err(|e| debug_info(e.to_string()))?;
        let ctx = Context::from_dwarf(dwarf).map_err(|e| debug_info(e.to_string()))?;

        Ok(Self { ctx, demangle, cache: HashMap::new() })
    }

    /// Innermost function containing `addr`, or `??`.
    pub fn function_name(&mut self, addr: u64) -> SymbolName {
        if let Some(cached) = self.cache.get(&addr) {
            return cached.clone();
        }

        let mut name = None;
        if let Ok(mut frames) = self.ctx.find_frames(addr).skip_all_loads() {
            while let Ok(Some(frame)) = frames.next() {
                let Some(function) = frame.function else { continue };
                if let Ok(raw) = function.raw_name() {
                    name = Some(if self.demangle {
                        format!("{:#}", demangle(&raw))
                    } else {
                        raw.into_owned()
                    });
                    break;
                }
            }
        }

        let resolved = SymbolName(name.unwrap_or_else(|| UNKNOWN_FUNCTION.to_string()));
        self.cache.insert(addr, resolved.clone());
        resolved
    }

    /// Resolve textual addresses; anything that is not hex resolves to `??`.
    pub fn resolve_all(&mut self, addrs: &[Address]) -> Vec<SymbolName> {
        addrs
            .iter()
            .map(|addr| match addr.to_u64() {
                Some(value) => self.function_name(value),
                None => SymbolName::from(UNKNOWN_FUNCTION),
            })
            .collect()
    }
}

type SharedSymbolizer = Arc<Mutex<DwarfSymbolizer>>;

/// `SymbolResolver` backed by [`DwarfSymbolizer`] on the blocking pool.
///
/// Each binary is loaded on its first batch and kept for the rest of the
/// run, so later batches reuse both the parsed DWARF and the name cache.
/// A binary that fails to load is not remembered.
#[derive(Default)]
pub struct DwarfResolver {
    demangle: bool,
    loaded: Arc<Mutex<HashMap<PathBuf, SharedSymbolizer>>>,
}

impl DwarfResolver {
    #[must_use]
    pub fn new(demangle: bool) -> Self {
        Self { demangle, loaded: Arc::default() }
    }

    /// Number of binaries whose debug info is currently loaded.
    #[must_use]
    pub fn loaded_binaries(&self) -> usize {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Loaded symbolizer for `binary`, reading its debug info on first use.
fn symbolizer_for(
    loaded: &Mutex<HashMap<PathBuf, SharedSymbolizer>>,
    binary: &Path,
    demangle: bool,
) -> Result<SharedSymbolizer, ResolverError> {
    if let Some(existing) = loaded.lock().unwrap_or_else(PoisonError::into_inner).get(binary) {
        return Ok(Arc::clone(existing));
    }

    // Loaded without holding the map lock so other binaries are not blocked
    let symbolizer = Arc::new(Mutex::new(DwarfSymbolizer::new(binary, demangle)?));
    let mut loaded = loaded.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(loaded.entry(binary.to_path_buf()).or_insert(symbolizer)))
}

impl SymbolResolver for DwarfResolver {
    fn label(&self) -> &str {
        "dwarf"
    }

    async fn resolve(
        &self,
        binary: &Path,
        addrs: &[Address],
    ) -> Result<Vec<SymbolName>, ResolverError> {
        if addrs.is_empty() {
            return Ok(Vec::new());
        }

        let path: PathBuf = binary.to_path_buf();
        let owned = addrs.to_vec();
        let demangle = self.demangle;
        let loaded = Arc::clone(&self.loaded);
        let names = tokio::task::spawn_blocking(move || {
            let symbolizer = symbolizer_for(&loaded, &path, demangle)?;
            let mut symbolizer = symbolizer.lock().unwrap_or_else(PoisonError::into_inner);
            Ok::<_, ResolverError>(symbolizer.resolve_all(&owned))
        })
        .await
        .map_err(|e| ResolverError::Aborted { binary: binary.to_path_buf(), reason: e.to_string() })??;

        expect_one_name_per_address(binary, addrs, names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_object_file_is_debug_info_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not an elf").unwrap();

        let err = DwarfSymbolizer::new(file.path(), false).err().unwrap();
        assert!(matches!(err, ResolverError::DebugInfo { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DwarfSymbolizer::new(Path::new("/nonexistent/binary"), false).err().unwrap();
        assert!(matches!(err, ResolverError::Io(_)));
    }

    #[tokio::test]
    async fn test_resolver_reports_debug_info_failure() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not an elf").unwrap();

        let err = DwarfResolver::new(false)
            .resolve(file.path(), &[Address::from("0x1")])
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::DebugInfo { .. }));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_kept() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not an elf").unwrap();

        let resolver = DwarfResolver::new(false);
        for _ in 0..2 {
            assert!(resolver.resolve(file.path(), &[Address::from("0x1")]).await.is_err());
        }
        assert_eq!(resolver.loaded_binaries(), 0);
    }
}
