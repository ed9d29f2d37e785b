use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::Result;
use crate::example::{CanonicalExample, Partition};

/// Where finished partitions go.
pub trait ExampleSink {
    /// Persist one partition and return where it ended up (for the summary).
    fn write_partition(&mut self, partition: &Partition, split: bool) -> Result<String>;

    /// Called once after the last partition of a run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// `<dir>/<stem>.jsonl` for unsplit output, `<dir>/<stem>_<partition>.jsonl` otherwise.
///
/// The files of each run are listed in `<dir>/<stem>.manifest.json`; on
/// `finish`, files listed by the previous run but not written by this one
/// are removed.
#[derive(Debug, Clone)]
pub struct JsonlDirSink {
    dir: PathBuf,
    stem: String,
    written: Vec<String>,
}

impl JsonlDirSink {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
            written: Vec::new(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(format!("{}.manifest.json", self.stem))
    }

    fn previous_outputs(&self) -> Vec<String> {
        let path = self.manifest_path();
        let Ok(raw) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(names) => names,
            Err(e) => {
                warn!("ignoring unreadable manifest {:?}: {e}", path);
                Vec::new()
            }
        }
    }

    // only plain `<stem>.jsonl` / `<stem>_*.jsonl` names are ever removed
    fn owned_name(&self, name: &str) -> bool {
        !name.contains(['/', '\\'])
            && name.ends_with(".jsonl")
            && (name == format!("{}.jsonl", self.stem) || name.starts_with(&format!("{}_", self.stem)))
    }

    pub fn path_for(&self, partition: &str, split: bool) -> PathBuf {
        if split {
            self.dir.join(format!("{}_{}.jsonl", self.stem, partition))
        } else {
            self.dir.join(format!("{}.jsonl", self.stem))
        }
    }
}

impl ExampleSink for JsonlDirSink {
    fn write_partition(&mut self, partition: &Partition, split: bool) -> Result<String> {
        let path = self.path_for(&partition.name, split);
        write_jsonl(&path, &partition.examples)?;
        info!("wrote {} examples -> {:?}", partition.examples.len(), path);
        if let Some(name) = path.file_name() {
            self.written.push(name.to_string_lossy().into_owned());
        }
        Ok(path.display().to_string())
    }

    fn finish(&mut self) -> Result<()> {
        for stale in self.previous_outputs() {
            if self.written.contains(&stale) || !self.owned_name(&stale) {
                continue;
            }
            let path = self.dir.join(&stale);
            match fs::remove_file(&path) {
                Ok(()) => info!("removed stale output {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        fs::create_dir_all(&self.dir)?;
        let mut names = std::mem::take(&mut self.written);
        names.sort();
        fs::write(self.manifest_path(), serde_json::to_string_pretty(&names)?)?;
        Ok(())
    }
}

/// Keeps every written partition; handy for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub partitions: Vec<Partition>,
}

impl MemorySink {
    pub fn get(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }
}

impl ExampleSink for MemorySink {
    fn write_partition(&mut self, partition: &Partition, _split: bool) -> Result<String> {
        self.partitions.push(partition.clone());
        Ok(format!("memory:{}", partition.name))
    }
}

/// Write one compact JSON object per line, overwriting `path`. Goes through a
/// sibling temp file and a rename so a failed run never leaves half a file.
pub fn write_jsonl(path: &Path, examples: &[CanonicalExample]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let written = (|| -> Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for ex in examples {
            serde_json::to_writer(&mut writer, ex)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read canonical examples back from a JSONL file.
pub fn read_jsonl(path: &Path) -> Result<Vec<CanonicalExample>> {
    let raw = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        out.push(serde_json::from_str(line)?);
    }
    Ok(out)
}
