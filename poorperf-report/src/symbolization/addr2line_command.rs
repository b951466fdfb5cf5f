//! External `addr2line` resolver
//!
//! Runs `addr2line -f -e <binary> <addr>...` once per batch. With `-f` the
//! tool prints two lines per address (function name, then `file:line`), so
//! the name is every other line of its output.

use super::resolver::{expect_one_name_per_address, SymbolResolver};
use crate::domain::{Address, ResolverError, SymbolName};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub const DEFAULT_PROGRAM: &str = "addr2line";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Addr2lineCommand {
    program: PathBuf,
    demangle: bool,
    timeout: Duration,
}

impl Default for Addr2lineCommand {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Addr2lineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), demangle: false, timeout: DEFAULT_TIMEOUT }
    }

    /// Pass `-C` so the tool demangles names itself.
    #[must_use]
    pub fn with_demangle(mut self, demangle: bool) -> Self {
        self.demangle = demangle;
        self
    }

    /// Upper bound on a single invocation. The child is killed when it expires.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, binary: &Path, addrs: &[Address]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-f");
        if self.demangle {
            cmd.arg("-C");
        }
        cmd.arg("-e")
            .arg(binary)
            .args(addrs.iter().map(Address::as_str))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl SymbolResolver for Addr2lineCommand {
    fn label(&self) -> &str {
        "addr2line"
    }

    async fn resolve(
        &self,
        binary: &Path,
        addrs: &[Address],
    ) -> Result<Vec<SymbolName>, ResolverError> {
        if addrs.is_empty() {
            return Ok(Vec::new());
        }

        let program = self.program.display().to_string();
        let child = self
            .command(binary, addrs)
            .spawn()
            .map_err(|source| ResolverError::Spawn { program: program.clone(), source })?;

        // Dropping the pending future on timeout drops the child, which kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ResolverError::Timeout { binary: binary.to_path_buf(), timeout: self.timeout })??;

        if !output.status.success() {
            debug!("{program} stderr: {}", String::from_utf8_lossy(&output.stderr).trim());
            return Err(ResolverError::ExitStatus {
                program,
                binary: binary.to_path_buf(),
                status: output.status,
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| ResolverError::Decode { binary: binary.to_path_buf() })?;

        expect_one_name_per_address(binary, addrs, parse_function_lines(&stdout))
    }
}

/// Keep the function-name line of each (name, location) pair.
#[must_use]
pub fn parse_function_lines(output: &str) -> Vec<SymbolName> {
    output.lines().step_by(2).map(|line| SymbolName::from(line.trim_end())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable shell script standing in for addr2line.
    fn fake_tool(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fake-addr2line");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn addrs(list: &[&str]) -> Vec<Address> {
        list.iter().copied().map(Address::from).collect()
    }

    #[test]
    fn test_parse_function_lines() {
        let out = "main\n/src/main.c:10\n??\n??:0\nfoo\n/src/foo.c:3\n";
        let names = parse_function_lines(out);
        assert_eq!(names, vec!["main".into(), "??".into(), SymbolName::from("foo")]);
    }

    #[tokio::test]
    async fn test_empty_batch_does_not_spawn() {
        let resolver = Addr2lineCommand::new("/nonexistent/addr2line");
        let names = resolver.resolve(Path::new("/bin/true"), &[]).await.unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_names_follow_argument_order() {
        let dir = TempDir::new().unwrap();
        // Skip "-f -e <binary>", then echo a name and a location per address
        let tool = fake_tool(
            &dir,
            "shift 3\nfor a in \"$@\"; do echo \"fn_$a\"; echo \"src.c:1\"; done",
        );

        let resolver = Addr2lineCommand::new(tool);
        let names = resolver.resolve(Path::new("/bin/app"), &addrs(&["0x2", "0x1"])).await.unwrap();
        assert_eq!(names, vec![SymbolName::from("fn_0x2"), SymbolName::from("fn_0x1")]);
    }

    #[tokio::test]
    async fn test_demangle_flag_is_forwarded() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "echo \"$2\"\necho loc");

        let resolver = Addr2lineCommand::new(tool).with_demangle(true);
        let names = resolver.resolve(Path::new("/bin/app"), &addrs(&["0x1"])).await.unwrap();
        assert_eq!(names, vec![SymbolName::from("-C")]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "echo 'addr2line: bad file' >&2\nexit 1");

        let resolver = Addr2lineCommand::new(tool);
        let err = resolver.resolve(Path::new("/bin/app"), &addrs(&["0x1"])).await.unwrap_err();
        assert!(matches!(err, ResolverError::ExitStatus { .. }));
    }

    #[tokio::test]
    async fn test_short_output_is_malformed() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "echo only_one\necho loc");

        let resolver = Addr2lineCommand::new(tool);
        let err = resolver.resolve(Path::new("/bin/app"), &addrs(&["0x1", "0x2"])).await.unwrap_err();
        assert!(matches!(err, ResolverError::Malformed { expected: 2, found: 1, .. }));
    }

    #[tokio::test]
    async fn test_non_utf8_output_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "printf '\\377\\n\\377\\n'");

        let resolver = Addr2lineCommand::new(tool);
        let err = resolver.resolve(Path::new("/bin/app"), &addrs(&["0x1"])).await.unwrap_err();
        assert!(matches!(err, ResolverError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_hung_resolver_times_out() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "sleep 10");

        let resolver = Addr2lineCommand::new(tool).with_timeout(Duration::from_millis(200));
        let err = resolver.resolve(Path::new("/bin/app"), &addrs(&["0x1"])).await.unwrap_err();
        assert!(matches!(err, ResolverError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let resolver = Addr2lineCommand::new("/nonexistent/addr2line");
        let err = resolver.resolve(Path::new("/bin/app"), &addrs(&["0x1"])).await.unwrap_err();
        assert!(matches!(err, ResolverError::Spawn { .. }));
    }
}
