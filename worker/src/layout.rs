//! Where every file of a configuration lives.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::DriverConfig;

/// The paths a single configuration reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub config: PathBuf,
    pub model: PathBuf,
    pub target_base: PathBuf,
    pub prediction: PathBuf,
    pub lock: PathBuf,
    pub report: PathBuf,
}

impl JobPaths {
    /// Lays out the files of configuration `name`.
    pub fn new(cfg: &DriverConfig, name: &str) -> Self {
        let target_base = cfg.target().join(name);
        let prediction = target_base.join(format!("{name}.npy"));

        Self {
            config: cfg.src().join(format!("{name}.json")),
            model: cfg
                .models()
                .join(name)
                .join(format!("{name}_model.safetensors")),
            lock: lock_path(&prediction),
            report: target_base.join(format!("{name}.txt")),
            prediction,
            target_base,
        }
    }
}

/// The claim marker guarding `target`.
pub fn lock_path(target: &Path) -> PathBuf {
    let mut lock = target.as_os_str().to_owned();
    lock.push(".lock");
    PathBuf::from(lock)
}

/// Lists the configuration names in `src`, sorted.
///
/// # Returns
/// The stems of every `*.json` file in `src`, or an io error if it can't be read.
pub fn discover<P: AsRef<Path>>(src: P) -> io::Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(src)? {
        let path = entry?.path();

        if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }

        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use irradiance::Phase;

    use super::*;
    use crate::Mode;

    #[test]
    fn paths_follow_the_configuration_name() {
        let cfg = DriverConfig::new("cfgs", "models", "out", "data", Phase::Test, Mode::Inference);
        let paths = JobPaths::new(&cfg, "run_a");

        assert_eq!(paths.config, Path::new("cfgs/run_a.json"));
        assert_eq!(paths.model, Path::new("models/run_a/run_a_model.safetensors"));
        assert_eq!(paths.target_base, Path::new("out/run_a"));
        assert_eq!(paths.prediction, Path::new("out/run_a/run_a.npy"));
        assert_eq!(paths.lock, Path::new("out/run_a/run_a.npy.lock"));
        assert_eq!(paths.report, Path::new("out/run_a/run_a.txt"));
    }

    #[test]
    fn discover_sorts_json_stems() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["b.json", "a.json", "notes.txt", "c.json.bak"] {
            fs::write(dir.path().join(file), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("d.json")).unwrap();

        assert_eq!(discover(dir.path()).unwrap(), ["a", "b"]);
    }
}
