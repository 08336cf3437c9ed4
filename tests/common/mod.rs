//! Shared fixture for CLI integration tests.
//!
//! Every collaborator is a small shell script that appends its name to a call
//! log. Collaborator scripts are run through `/bin/sh`, so they never need an
//! exec bit; only the autocurator stub is also executable for direct runs.

use serde_json::json;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const CMIP6_FILE: &str = "/data/run1/tas_Amon_E3SM-1-0_historical_r1i1p1f1_gr_185001-201412.nc";

pub struct PublishFixture {
    pub root: TempDir,
}

fn quote(path: &Path) -> String {
    shell_words::quote(&path.display().to_string()).into_owned()
}

impl PublishFixture {
    pub fn create() -> Self {
        let root = TempDir::new().expect("create fixture dir");
        let fixture = Self { root };
        fs::create_dir_all(fixture.stubs_dir()).expect("create stubs dir");
        fs::create_dir_all(fixture.autocurator_root().join("bin")).expect("create autocurator");
        fs::create_dir_all(fixture.tables_dir()).expect("create tables dir");
        fixture.write_tables();
        fixture.set_records(json!([["CMIP6.CMIP.E3SM#v1", CMIP6_FILE]]));
        fixture.install_default_stubs();
        fixture.write_config(&[]);
        fixture
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    fn stubs_dir(&self) -> PathBuf {
        self.path().join("stubs")
    }

    fn autocurator_root(&self) -> PathBuf {
        self.path().join("autocurator")
    }

    fn tables_dir(&self) -> PathBuf {
        self.path().join("tables")
    }

    fn log_path(&self) -> PathBuf {
        self.path().join("calls.log")
    }

    fn scan_log_path(&self) -> PathBuf {
        self.path().join("scan_paths.log")
    }

    fn curator_args_path(&self) -> PathBuf {
        self.path().join("curator_args.log")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.json")
    }

    fn records_path(&self) -> PathBuf {
        self.path().join("records.json")
    }

    fn write_tables(&self) {
        let amon = json!({"variable_entry": {"tas": {"frequency": "mon"}}});
        fs::write(self.tables_dir().join("CMIP6_Amon.json"), amon.to_string())
            .expect("write Amon table");
    }

    /// Records the convert stub prints for every mapfile.
    pub fn set_records(&self, records: serde_json::Value) {
        fs::write(self.records_path(), records.to_string()).expect("write records");
    }

    fn install_default_stubs(&self) {
        let log = quote(&self.log_path());
        let records = quote(&self.records_path());
        self.write_stub(
            "convert",
            &format!("cat >/dev/null\necho convert >> {log}\ncat {records}\n"),
        );
        self.write_stub(
            "assemble",
            &format!(
                "request=$(cat)\n\
                 case \"$request\" in\n\
                   *json_override*) echo assemble:3 >> {log} ;;\n\
                   *) echo assemble:2 >> {log} ;;\n\
                 esac\n\
                 echo '{{\"id\": \"ds\"}}'\n"
            ),
        );
        self.write_stub(
            "pid_cite",
            &format!(
                "cat >/dev/null\necho pid_cite >> {log}\necho '{{\"id\": \"ds\", \"pid\": \"hdl:21.14100/test\"}}'\n"
            ),
        );
        self.write_stub("update", &format!("cat >/dev/null\necho update >> {log}\n"));
        self.write_stub("pub_test", &format!("cat >/dev/null\necho pub_test >> {log}\n"));

        self.write_autocurator("echo '{}' > \"$2\"\n");
    }

    /// Autocurator stub taking `<mapfile> <scan file>`, whether run through
    /// the `/bin/sh` wrapper or executed directly.
    fn write_autocurator(&self, tail: &str) {
        let log = quote(&self.log_path());
        let scan_log = quote(&self.scan_log_path());
        let args_log = quote(&self.curator_args_path());
        let path = self.autocurator_root().join("bin/autocurator");
        fs::write(
            &path,
            format!(
                "#!/bin/sh\necho curate >> {log}\necho \"$1\" >> {args_log}\necho \"$2\" >> {scan_log}\n{tail}"
            ),
        )
        .expect("write autocurator stub");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod autocurator");
    }

    pub fn write_stub(&self, name: &str, body: &str) {
        fs::write(self.stubs_dir().join(format!("{name}.sh")), body).expect("write stub");
    }

    /// Replace a collaborator with one that fails.
    pub fn fail_stub(&self, name: &str) {
        let log = quote(&self.log_path());
        self.write_stub(
            name,
            &format!("cat >/dev/null\necho {name} >> {log}\necho '{name} broke' >&2\nexit 1\n"),
        );
    }

    pub fn fail_autocurator(&self) {
        self.write_autocurator("exit 3\n");
    }

    /// Write config.json; `extra` fields are merged over the defaults.
    pub fn write_config(&self, extra: &[(&str, serde_json::Value)]) {
        let stub = |name: &str| format!("/bin/sh {}", quote(&self.stubs_dir().join(format!("{name}.sh"))));
        let mut config = json!({
            "schema_version": 1,
            "commands": {
                "convert": stub("convert"),
                "assemble": stub("assemble"),
                "pid_cite": stub("pid_cite"),
                "update": stub("update"),
                "pub_test": stub("pub_test"),
            },
            "curator_wrapper": "/bin/sh",
        });
        for (key, value) in extra {
            config[*key] = value.clone();
        }
        fs::write(self.config_path(), config.to_string()).expect("write config");
    }

    pub fn mapfile(&self, name: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, format!("CMIP6.CMIP.E3SM#v1 | {CMIP6_FILE} | 1024\n")).expect("write mapfile");
        path
    }

    /// `esgpublish` wired to this fixture; `--map` and extra flags are added by the caller.
    pub fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_esgpublish"));
        command
            .arg("--config")
            .arg(self.config_path())
            .arg("--autocurator")
            .arg(self.autocurator_root())
            .arg("--cmor-tables")
            .arg(self.tables_dir())
            .env_remove("ESGPUB_CONFIG");
        command
    }

    pub fn publish(&self, map: &Path, extra: &[&str]) -> Output {
        self.command()
            .arg("--map")
            .arg(map)
            .args(extra)
            .output()
            .expect("run esgpublish")
    }

    pub fn calls(&self) -> Vec<String> {
        read_lines(&self.log_path())
    }

    /// Mapfile argument of every autocurator run.
    pub fn curator_mapfiles(&self) -> Vec<PathBuf> {
        read_lines(&self.curator_args_path())
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    pub fn scan_paths(&self) -> Vec<PathBuf> {
        read_lines(&self.scan_log_path())
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
