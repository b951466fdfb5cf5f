//! Resolver seam: one call turns an ordered address list into an ordered
//! name list for a single binary.

use crate::domain::{Address, ResolverError, SymbolName};
use std::future::Future;
use std::path::Path;

/// Batch symbol lookup for one binary.
///
/// Implementations must return exactly one name per input address, in the
/// same order. The batch layer checks the count and treats a mismatch as a
/// failure of that binary.
pub trait SymbolResolver: Send + Sync + 'static {
    /// Short label used in logs and warnings.
    fn label(&self) -> &str;

    fn resolve(
        &self,
        binary: &Path,
        addrs: &[Address],
    ) -> impl Future<Output = Result<Vec<SymbolName>, ResolverError>> + Send;
}

/// Check a resolver's answer against the request.
///
/// # Errors
/// Returns `Malformed` if the name count differs from the address count.
pub fn expect_one_name_per_address(
    binary: &Path,
    addrs: &[Address],
    names: Vec<SymbolName>,
) -> Result<Vec<SymbolName>, ResolverError> {
    if names.len() == addrs.len() {
        Ok(names)
    } else {
        Err(ResolverError::Malformed {
            binary: binary.to_path_buf(),
            expected: addrs.len(),
            found: names.len(),
        })
    }
}
