use std::fs;
use std::path::{Path, PathBuf};

use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use log::info;
use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Where a source's raw file lives before it is read.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLocation {
    Path(PathBuf),
    /// A file inside a Hugging Face dataset repo.
    HuggingFace {
        repo: String,
        filename: String,
        #[serde(default)]
        revision: Option<String>,
    },
    Url(String),
}

#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub cache_dir: PathBuf,
    pub token: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/raw"),
            token: None,
        }
    }
}

/// Turn a location into a readable local path. One shot, no retries: any
/// failure aborts the run.
pub async fn resolve(tag: &str, location: &SourceLocation, opts: &FetchOptions) -> Result<PathBuf> {
    let fail = |reason: String| PipelineError::SourceFetch {
        source_tag: tag.to_string(),
        reason,
    };

    match location {
        SourceLocation::Path(path) => {
            if path.exists() {
                Ok(path.clone())
            } else {
                Err(fail(format!("{} does not exist", path.display())))
            }
        }
        SourceLocation::HuggingFace {
            repo,
            filename,
            revision,
        } => {
            let api = ApiBuilder::new()
                .with_token(opts.token.clone())
                .with_cache_dir(opts.cache_dir.join("hf"))
                .with_progress(false)
                .build()
                .map_err(|e| fail(e.to_string()))?;
            let rev = revision.clone().unwrap_or_else(|| "main".to_string());
            info!("fetching {repo}@{rev}/{filename}");
            let handle = api.repo(Repo::with_revision(repo.clone(), RepoType::Dataset, rev));
            handle
                .get(filename)
                .await
                .map_err(|e| fail(format!("{repo}/{filename}: {e}")))
        }
        SourceLocation::Url(url) => {
            let target = opts.cache_dir.join(url_file_name(url));
            if target.exists() {
                info!("{url} already cached at {:?}, skipping download", target);
                return Ok(target);
            }
            info!("downloading {url}");
            let body = reqwest::get(url)
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| fail(e.to_string()))?
                .bytes()
                .await
                .map_err(|e| fail(e.to_string()))?;
            store(&target, &body).map_err(|e| fail(e.to_string()))?;
            Ok(target)
        }
    }
}

fn store(target: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".part");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, target)
}

fn url_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("download")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_names_come_from_last_segment() {
        assert_eq!(
            url_file_name("https://example.org/data/sentences_50agree/train.jsonl?download=1"),
            "train.jsonl"
        );
        assert_eq!(url_file_name("https://example.org/files/"), "files");
        assert_eq!(url_file_name("https://"), "download");
    }

    #[test]
    fn location_parses_from_descriptor_json() {
        let p: SourceLocation = serde_json::from_str(r#"{"path": "data/raw/x.csv"}"#).unwrap();
        assert_eq!(p, SourceLocation::Path("data/raw/x.csv".into()));
        let h: SourceLocation = serde_json::from_str(
            r#"{"hugging_face": {"repo": "org/ds", "filename": "train.jsonl"}}"#,
        )
        .unwrap();
        assert!(matches!(h, SourceLocation::HuggingFace { revision: None, .. }));
    }

    #[tokio::test]
    async fn local_paths_must_exist() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let ok = resolve("t", &SourceLocation::Path(f.path().to_path_buf()), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(ok, f.path());

        let missing = SourceLocation::Path("definitely/not/here.jsonl".into());
        let err = resolve("t", &missing, &FetchOptions::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceFetch { .. }));
    }

    #[tokio::test]
    async fn cached_url_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cached.jsonl"), "{}\n").unwrap();
        let opts = FetchOptions {
            cache_dir: dir.path().to_path_buf(),
            token: None,
        };
        let got = resolve("t", &SourceLocation::Url("http://127.0.0.1:9/cached.jsonl".into()), &opts)
            .await
            .unwrap();
        assert_eq!(got, dir.path().join("cached.jsonl"));
    }
}
