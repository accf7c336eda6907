#[cfg(test)]
pub mod test {
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use tempfile::TempDir;

    use crate::error::CappError;
    use crate::option::ConfigOption;
    use crate::option_type::{CanonicalFilePath, TypedList};
    use crate::process::{CommandRunner, ProcessOutput};
    use crate::setup::ConfigSetup;

    pub const TEST_CONFIG: &str = "[Test]\ntestconfigkey = testconfigvalue\n";

    fn test_option() -> ConfigOption {
        ConfigOption::new("test")
            .arg("--test")
            .short('t')
            .config_key("testconfigkey")
            .default_value("testdefaultvalue")
            .category("Test")
    }

    pub fn test_setup() -> ConfigSetup {
        ConfigSetup::new().option(test_option())
    }

    pub fn test_options() -> BTreeMap<String, ConfigOption> {
        BTreeMap::from([("test".to_string(), test_option())])
    }

    /// A merging list of canonical paths, reachable from files and arguments.
    pub fn list_options() -> BTreeMap<String, ConfigOption> {
        let option = ConfigOption::new("dirs")
            .arg("--dir")
            .config_key("dirs")
            .option_type(TypedList::new().merge(true))
            .option_type(CanonicalFilePath::new());
        BTreeMap::from([("dirs".to_string(), option)])
    }

    pub fn write_test_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("test.conf");
        std::fs::write(&path, TEST_CONFIG).unwrap();
        path
    }

    pub fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Plays back canned outputs in order and records every invocation.
    #[derive(Default)]
    pub struct ScriptedRunner {
        outputs: Mutex<Vec<ProcessOutput>>,
        pub calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
    }

    impl ScriptedRunner {
        pub fn new(outputs: Vec<ProcessOutput>) -> Self {
            let mut outputs = outputs;
            outputs.reverse();
            Self {
                outputs: Mutex::new(outputs),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &Path, args: &[String]) -> Result<ProcessOutput, CappError> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_path_buf(), args.to_vec()));
            Ok(self
                .outputs
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| ProcessOutput::ok("")))
        }
    }

    pub fn output(stdout: &str, stderr: &str, code: i32) -> ProcessOutput {
        ProcessOutput {
            status: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}
