//! Batched symbol resolution over a whole capture
//!
//! Spawning the resolver once per address is far too slow, so records are
//! grouped by binary first and each binary's distinct addresses are sent in
//! fixed-size batches:
//!
//! ```text
//! records ──► group by pathname ──► distinct addrs (encounter order)
//!                                         │
//!                         chunks of batch_size, one resolver call each
//!                                         │
//!              zip(chunk, names) ──► mapping[binary][addr] = name
//!                                         │
//! records ◄── overwrite sentinel names ◄──┘
//! ```
//!
//! Binaries resolve concurrently, one task each, but every result is merged
//! into a single mapping before the first record is touched.

use super::resolver::{expect_one_name_per_address, SymbolResolver};
use crate::domain::{Address, FormatError, ResolverError, SymbolName, UNRESOLVED};
use crate::parser::Record;
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Addresses per resolver call. Large enough to amortize process start-up,
/// small enough to stay well under command-line length limits.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Distinct unresolved addresses per binary, both in first-encounter order.
pub type AddressGroups = IndexMap<PathBuf, Vec<Address>>;

/// Resolved names per binary.
pub type SymbolMapping = BTreeMap<PathBuf, HashMap<Address, SymbolName>>;

/// A binary whose resolution failed. Its records keep the sentinel name.
#[derive(Debug)]
pub struct BinaryFailure {
    pub binary: PathBuf,
    pub error: ResolverError,
}

/// Outcome of resolving one capture.
#[derive(Debug, Default)]
pub struct ResolutionSummary {
    /// Binaries that had at least one unresolved address.
    pub binaries: usize,
    /// Resolver invocations, across all binaries.
    pub resolver_calls: usize,
    /// Records whose name was overwritten.
    pub resolved_records: usize,
    pub failures: Vec<BinaryFailure>,
}

impl ResolutionSummary {
    /// True if resolution was attempted and no binary succeeded.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.binaries > 0 && self.failures.len() == self.binaries
    }
}

pub struct BatchResolver<R> {
    resolver: Arc<R>,
    batch_size: usize,
    max_concurrent: usize,
}

impl<R: SymbolResolver> BatchResolver<R> {
    pub fn new(resolver: R) -> Self {
        Self::from_shared(Arc::new(resolver))
    }

    pub fn from_shared(resolver: Arc<R>) -> Self {
        let max_concurrent = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self { resolver, batch_size: DEFAULT_BATCH_SIZE, max_concurrent }
    }

    /// Addresses per resolver call (at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Binaries resolved at the same time (at least 1).
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resolve every unresolved record in place.
    ///
    /// Resolver failures are collected per binary in the summary; only a
    /// record missing a required column aborts.
    ///
    /// # Errors
    /// Returns a `FormatError` if a record lacks `pathname`, `addr` or `name`.
    pub async fn resolve_records(&self, records: &mut [Record]) -> Result<ResolutionSummary, FormatError> {
        let groups = group_by_binary(records)?;
        let mut summary = ResolutionSummary { binaries: groups.len(), ..ResolutionSummary::default() };
        if groups.is_empty() {
            info!("no resolvable binaries in capture");
            return Ok(summary);
        }

        let (mapping, calls, failures) = self.build_mapping(groups).await;
        summary.resolver_calls = calls;
        summary.failures = failures;
        summary.resolved_records = apply_mapping(records, &mapping)?;

        info!(
            "resolved {} records across {} binaries with {} {} calls ({} failed)",
            summary.resolved_records,
            summary.binaries,
            summary.resolver_calls,
            self.resolver.label(),
            summary.failures.len()
        );
        Ok(summary)
    }

    /// Resolve each binary's addresses, one task per binary.
    ///
    /// Returns the merged mapping, the number of resolver calls made, and
    /// the binaries that failed. Failed binaries are absent from the mapping.
    pub async fn build_mapping(
        &self,
        groups: AddressGroups,
    ) -> (SymbolMapping, usize, Vec<BinaryFailure>) {
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = Vec::with_capacity(groups.len());

        for (binary, addrs) in groups {
            let resolver = Arc::clone(&self.resolver);
            let permits = Arc::clone(&permits);
            let batch_size = self.batch_size;
            let task_binary = binary.clone();
            let handle = tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                resolve_binary(resolver.as_ref(), &task_binary, &addrs, batch_size).await
            });
            tasks.push((binary, handle));
        }

        // Await in spawn order so the outcome does not depend on scheduling
        let mut mapping = SymbolMapping::new();
        let mut calls = 0;
        let mut failures = Vec::new();
        for (binary, handle) in tasks {
            let (result, made) = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => (
                    Err(ResolverError::Aborted { binary: binary.clone(), reason: e.to_string() }),
                    0,
                ),
            };
            calls += made;
            match result {
                Ok(names) => {
                    mapping.insert(binary, names);
                }
                Err(error) => {
                    warn!("symbol resolution failed for {}: {error}", binary.display());
                    failures.push(BinaryFailure { binary, error });
                }
            }
        }

        (mapping, calls, failures)
    }
}

/// Resolve one binary in batches. Returns the mapping (or the first batch
/// error) together with the number of resolver calls made.
async fn resolve_binary<R: SymbolResolver>(
    resolver: &R,
    binary: &Path,
    addrs: &[Address],
    batch_size: usize,
) -> (Result<HashMap<Address, SymbolName>, ResolverError>, usize) {
    let batches = addrs.len().div_ceil(batch_size);
    info!("resolving {} addresses in {} ({batches} batches)", addrs.len(), binary.display());

    let mut names = HashMap::with_capacity(addrs.len());
    let mut calls = 0;
    for (idx, chunk) in addrs.chunks(batch_size).enumerate() {
        debug!("{}: batch {}/{batches} ({} addresses)", binary.display(), idx + 1, chunk.len());
        calls += 1;
        let resolved = match resolver.resolve(binary, chunk).await {
            Ok(resolved) => expect_one_name_per_address(binary, chunk, resolved),
            Err(e) => Err(e),
        };
        match resolved {
            Ok(resolved) => names.extend(chunk.iter().cloned().zip(resolved)),
            Err(e) => return (Err(e), calls),
        }
    }
    (Ok(names), calls)
}

/// Collect the distinct unresolved addresses of every existing binary.
///
/// A record is a candidate if its name is still the sentinel and its
/// pathname is a regular file on this machine. Kernel samples (`-`) and binaries that
/// are not present locally are skipped; that is expected, not an error.
///
/// # Errors
/// Returns a `FormatError` if a record lacks `pathname`, `addr` or `name`.
pub fn group_by_binary(records: &[Record]) -> Result<AddressGroups, FormatError> {
    let mut exists: HashMap<&str, bool> = HashMap::new();
    let mut groups: IndexMap<PathBuf, IndexSet<Address>> = IndexMap::new();

    for record in records {
        if !record.name()?.is_unresolved() {
            continue;
        }
        let pathname = record.pathname()?;
        if pathname == UNRESOLVED {
            continue;
        }
        let present = *exists.entry(pathname).or_insert_with(|| {
            let present = Path::new(pathname).is_file();
            if !present {
                debug!("skipping {pathname}: not a file present locally");
            }
            present
        });
        if present {
            groups.entry(PathBuf::from(pathname)).or_default().insert(record.addr()?);
        }
    }

    Ok(groups.into_iter().map(|(binary, addrs)| (binary, addrs.into_iter().collect())).collect())
}

/// Overwrite sentinel names from `mapping`. Returns how many records changed.
///
/// An address missing from its binary's mapping keeps the sentinel.
///
/// # Errors
/// Returns a `FormatError` if a record lacks `pathname`, `addr` or `name`.
pub fn apply_mapping(records: &mut [Record], mapping: &SymbolMapping) -> Result<usize, FormatError> {
    let mut updated = 0;
    for record in records.iter_mut() {
        if !record.name()?.is_unresolved() {
            continue;
        }
        let Some(names) = mapping.get(Path::new(record.pathname()?)) else {
            continue;
        };
        if let Some(name) = names.get(&record.addr()?) {
            record.set_name(name.clone())?;
            updated += 1;
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    /// Deterministic resolver: `0xN` in any binary resolves to `sym_N`.
    #[derive(Default)]
    struct FakeResolver {
        calls: AtomicUsize,
        requests: Mutex<Vec<(PathBuf, Vec<Address>)>>,
        failing: HashSet<PathBuf>,
        short_by_one: bool,
    }

    impl SymbolResolver for FakeResolver {
        fn label(&self) -> &str {
            "fake"
        }

        async fn resolve(
            &self,
            binary: &Path,
            addrs: &[Address],
        ) -> Result<Vec<SymbolName>, ResolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push((binary.to_path_buf(), addrs.to_vec()));
            if self.failing.contains(binary) {
                return Err(ResolverError::Decode { binary: binary.to_path_buf() });
            }
            let mut names: Vec<SymbolName> = addrs
                .iter()
                .map(|a| SymbolName(format!("sym_{}", a.as_str().trim_start_matches("0x"))))
                .collect();
            if self.short_by_one {
                names.pop();
            }
            Ok(names)
        }
    }

    fn capture(lines: &[String]) -> Vec<Record> {
        let mut text = String::from("$ time;cpu;pid;comm;pathname;addr;name\n");
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        parse_str(&text).unwrap()
    }

    fn sample(time: u32, pid: u32, binary: &Path, addr: &str) -> String {
        format!("{time};0;{pid};app;{};{addr};-", binary.display())
    }

    #[test]
    fn test_group_keeps_distinct_addresses_in_encounter_order() {
        let bin = NamedTempFile::new().unwrap();
        let records = capture(&[
            sample(1, 5, bin.path(), "0x3"),
            sample(2, 5, bin.path(), "0x1"),
            sample(3, 5, bin.path(), "0x3"),
            sample(4, 5, bin.path(), "0x2"),
        ]);

        let groups = group_by_binary(&records).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], vec![Address::from("0x3"), "0x1".into(), "0x2".into()]);
    }

    #[test]
    fn test_group_skips_kernel_missing_and_named_records() {
        let bin = NamedTempFile::new().unwrap();
        let records = capture(&[
            "1;0;0;<swapper>;-;0xffffffffbe3dd34a;-".to_string(),
            "2;0;7;gone;/nonexistent/path/to/binary;0x10;-".to_string(),
            format!("3;0;5;app;{};0x20;already_named", bin.path().display()),
        ]);

        assert!(group_by_binary(&records).unwrap().is_empty());
    }

    #[test]
    fn test_group_skips_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let records = capture(&[sample(1, 5, dir.path(), "0x1")]);

        assert!(group_by_binary(&records).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_overwrites_only_candidates() {
        let bin = NamedTempFile::new().unwrap();
        let mut records = capture(&[
            sample(1, 5, bin.path(), "0x10"),
            "2;0;0;<swapper>;-;0xffff;-".to_string(),
            sample(3, 5, bin.path(), "0x10"),
        ]);

        let resolver = BatchResolver::new(FakeResolver::default());
        let summary = resolver.resolve_records(&mut records).await.unwrap();

        assert_eq!(summary.binaries, 1);
        assert_eq!(summary.resolver_calls, 1);
        assert_eq!(summary.resolved_records, 2);
        assert!(summary.failures.is_empty());
        assert_eq!(records[0].name().unwrap().as_str(), "sym_10");
        assert!(records[1].name().unwrap().is_unresolved());
        assert_eq!(records[2].name().unwrap().as_str(), "sym_10");
    }

    #[tokio::test]
    async fn test_batches_are_bounded_and_ordered() {
        let bin = NamedTempFile::new().unwrap();
        let lines: Vec<String> =
            (0..450).map(|i| sample(i, 5, bin.path(), &format!("0x{i:x}"))).collect();
        let mut records = capture(&lines);

        let fake = Arc::new(FakeResolver::default());
        let summary =
            BatchResolver::from_shared(Arc::clone(&fake)).resolve_records(&mut records).await.unwrap();

        assert_eq!(summary.resolver_calls, 3);
        let requests = fake.requests.lock().unwrap();
        let sizes: Vec<usize> = requests.iter().map(|(_, a)| a.len()).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
        assert_eq!(requests[0].1[0], Address::from("0x0"));
        assert_eq!(requests[2].1[49], Address::from("0x1c1"));
    }

    #[tokio::test]
    async fn test_batch_size_never_changes_mapping() {
        let bin = NamedTempFile::new().unwrap();
        let lines: Vec<String> =
            (0..37).map(|i| sample(i, 5, bin.path(), &format!("0x{:x}", i % 23))).collect();
        let records = capture(&lines);
        let groups = group_by_binary(&records).unwrap();

        let wide = BatchResolver::new(FakeResolver::default()).with_batch_size(200);
        let narrow = BatchResolver::new(FakeResolver::default()).with_batch_size(1);
        let (wide_map, wide_calls, _) = wide.build_mapping(groups.clone()).await;
        let (narrow_map, narrow_calls, _) = narrow.build_mapping(groups).await;

        assert_eq!(wide_map, narrow_map);
        assert_eq!(wide_calls, 1);
        assert_eq!(narrow_calls, 23);
    }

    #[tokio::test]
    async fn test_failed_binary_degrades_alone() {
        let good = NamedTempFile::new().unwrap();
        let bad = NamedTempFile::new().unwrap();
        let mut records = capture(&[
            sample(1, 5, good.path(), "0x1"),
            sample(2, 6, bad.path(), "0x2"),
        ]);

        let fake = FakeResolver { failing: HashSet::from([bad.path().to_path_buf()]), ..FakeResolver::default() };
        let summary = BatchResolver::new(fake).resolve_records(&mut records).await.unwrap();

        assert_eq!(summary.binaries, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].binary, bad.path());
        assert!(!summary.all_failed());
        assert_eq!(records[0].name().unwrap().as_str(), "sym_1");
        assert!(records[1].name().unwrap().is_unresolved());
    }

    #[tokio::test]
    async fn test_short_answer_fails_the_binary() {
        let bin = NamedTempFile::new().unwrap();
        let mut records = capture(&[sample(1, 5, bin.path(), "0x1"), sample(2, 5, bin.path(), "0x2")]);

        let fake = FakeResolver { short_by_one: true, ..FakeResolver::default() };
        let summary = BatchResolver::new(fake).resolve_records(&mut records).await.unwrap();

        assert!(summary.all_failed());
        assert!(matches!(summary.failures[0].error, ResolverError::Malformed { expected: 2, found: 1, .. }));
        assert_eq!(summary.resolved_records, 0);
        assert!(records.iter().all(|r| r.name().unwrap().is_unresolved()));
    }

    #[test]
    fn test_apply_leaves_unmapped_address_untouched() {
        let bin = NamedTempFile::new().unwrap();
        let mut records = capture(&[sample(1, 5, bin.path(), "0x1"), sample(2, 5, bin.path(), "0x2")]);

        let mut mapping = SymbolMapping::new();
        mapping.insert(bin.path().to_path_buf(), HashMap::from([(Address::from("0x1"), SymbolName::from("main"))]));

        assert_eq!(apply_mapping(&mut records, &mapping).unwrap(), 1);
        assert_eq!(records[0].name().unwrap().as_str(), "main");
        assert!(records[1].name().unwrap().is_unresolved());
    }

    #[tokio::test]
    async fn test_no_candidates_makes_no_calls() {
        let mut records = capture(&["1;0;5;app;-;0x1;-".to_string()]);
        let fake = Arc::new(FakeResolver::default());
        let summary =
            BatchResolver::from_shared(Arc::clone(&fake)).resolve_records(&mut records).await.unwrap();

        assert_eq!(summary.binaries, 0);
        assert!(!summary.all_failed());
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }
}
