//! Autocurator invocation.
use crate::collaborators::Curator;
use crate::mapfile::MapfileRecord;
use crate::tool::{launch_status, run_inherited, split_command, ToolStatus};
use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const AUTOCURATOR_BIN_REL: &str = "bin/autocurator";

pub struct Autocurator {
    binary: PathBuf,
    wrapper: Option<String>,
}

impl Autocurator {
    /// `install_root` is the autocurator repository folder given on the CLI.
    pub fn new(install_root: &Path, wrapper: Option<String>) -> Self {
        Self {
            binary: install_root.join(AUTOCURATOR_BIN_REL),
            wrapper,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Program and arguments for one scan: `<binary> <mapfile> <scan file>`,
    /// prefixed by the wrapper command when one is configured.
    pub fn command_line(
        &self,
        mapfile: &Path,
        scan_file: &Path,
    ) -> Result<(OsString, Vec<OsString>)> {
        let mut args = Vec::new();
        let program = match &self.wrapper {
            Some(wrapper) => {
                let (program, wrapper_args) = split_command(wrapper)?;
                args.extend(wrapper_args.into_iter().map(OsString::from));
                args.push(self.binary.clone().into_os_string());
                program.into_os_string()
            }
            None => self.binary.clone().into_os_string(),
        };
        args.push(mapfile.as_os_str().to_owned());
        args.push(scan_file.as_os_str().to_owned());
        Ok((program, args))
    }
}

impl Curator for Autocurator {
    fn curate(
        &self,
        mapfile: &Path,
        _records: &[MapfileRecord],
        scan_file: &Path,
    ) -> Result<ToolStatus> {
        let status = launch_status("autocurator", || {
            let (program, args) = self.command_line(mapfile, scan_file)?;
            run_inherited(&program, &args)
        });
        let scan_bytes = std::fs::metadata(scan_file).map(|meta| meta.len()).unwrap_or(0);
        tracing::info!(
            binary = %self.binary().display(),
            scan_bytes,
            code = status.code,
            "autocurator finished"
        );
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolFailurePolicy;
    use crate::tool::{enforce, LAUNCH_FAILED};

    #[test]
    fn direct_invocation_passes_mapfile_and_scan_path() {
        let curator = Autocurator::new(Path::new("/opt/autocurator"), None);
        assert_eq!(curator.binary(), Path::new("/opt/autocurator/bin/autocurator"));
        let (program, args) = curator
            .command_line(Path::new("/m/CMIP6.a.map"), Path::new("/tmp/scan"))
            .expect("command line");
        assert_eq!(program, OsString::from("/opt/autocurator/bin/autocurator"));
        assert_eq!(args, ["/m/CMIP6.a.map", "/tmp/scan"].map(OsString::from).to_vec());
    }

    #[test]
    fn missing_autocurator_is_a_failed_status() {
        let curator = Autocurator::new(Path::new("/nonexistent/ac"), None);
        let scan = tempfile::NamedTempFile::new().expect("scan file");
        let status = curator
            .curate(Path::new("/m/a.map"), &[], scan.path())
            .expect("curate");
        assert_eq!(status, LAUNCH_FAILED);
        assert!(enforce(ToolFailurePolicy::Warn, "autocurator", status).is_ok());
        assert!(enforce(ToolFailurePolicy::Fail, "autocurator", status).is_err());
    }

    #[test]
    fn wrapper_receives_binary_mapfile_and_scan_path() {
        let curator = Autocurator::new(
            Path::new("/opt/ac"),
            Some("/bin/bash /opt/scripts/autocurator.sh".to_string()),
        );
        let (program, args) = curator
            .command_line(Path::new("/m/a.map"), Path::new("/tmp/scan"))
            .expect("command line");
        assert_eq!(program, OsString::from("/bin/bash"));
        assert_eq!(
            args,
            [
                "/opt/scripts/autocurator.sh",
                "/opt/ac/bin/autocurator",
                "/m/a.map",
                "/tmp/scan"
            ]
            .map(OsString::from)
            .to_vec()
        );
    }

    #[test]
    fn curate_reports_non_zero_exit_without_failing() {
        let curator = Autocurator::new(
            Path::new("/opt/ac"),
            Some("/bin/sh -c 'echo scanned > \"$3\"; exit 5' curate".to_string()),
        );
        let scan = tempfile::NamedTempFile::new().expect("scan file");
        let status = curator
            .curate(Path::new("/m/a.map"), &[], scan.path())
            .expect("curate");
        assert_eq!(status.code, Some(5));
        let written = std::fs::read_to_string(scan.path()).expect("read scan");
        assert_eq!(written.trim(), "scanned");
    }
}
