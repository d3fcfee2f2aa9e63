//! Temporary encode artifacts and output file naming.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use hudclip_common::error::{HudclipError, HudclipResult};

/// Suffixes the encoder appends to a two-pass log prefix.
const PASSLOG_SUFFIXES: [&str; 7] = [
    "",
    "-0.log",
    "-1.log",
    ".log",
    ".log-0.log",
    ".log-1.log",
    ".log.mbtree",
];

/// Output file stem; outputs are `Highlight-<n>.mp4`.
const OUTPUT_STEM: &str = "Highlight";

/// Jobs created by this process so far.
static JOB_SEQ: AtomicU64 = AtomicU64::new(0);

/// Per-job temporary files. Every file is removed when the guard drops,
/// whichever way the job ends.
#[derive(Debug)]
pub struct JobArtifacts {
    core: PathBuf,
    intro: PathBuf,
    concat_list: PathBuf,
    passlog_prefix: PathBuf,
}

impl JobArtifacts {
    /// Artifact names are tagged `<pid>-<unix_stamp>-<seq>` inside `temp_dir`,
    /// so jobs started in the same second never share files.
    pub fn new(temp_dir: &Path, unix_stamp: i64) -> Self {
        let seq = JOB_SEQ.fetch_add(1, Ordering::Relaxed);
        let tag = format!("{}-{}-{}", std::process::id(), unix_stamp, seq);
        Self {
            core: temp_dir.join(format!("core-{tag}.mp4")),
            intro: temp_dir.join(format!("intro-{tag}.mp4")),
            concat_list: temp_dir.join(format!("concat-{tag}.txt")),
            passlog_prefix: temp_dir.join(format!("passlog-{tag}")),
        }
    }

    pub fn core(&self) -> &Path {
        &self.core
    }

    pub fn intro(&self) -> &Path {
        &self.intro
    }

    pub fn concat_list(&self) -> &Path {
        &self.concat_list
    }

    pub fn passlog_prefix(&self) -> &Path {
        &self.passlog_prefix
    }

    /// Every path the guard removes on drop.
    pub fn all_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.core.clone(),
            self.intro.clone(),
            self.concat_list.clone(),
        ];
        let prefix = self.passlog_prefix.to_string_lossy();
        paths.extend(
            PASSLOG_SUFFIXES
                .iter()
                .map(|suffix| PathBuf::from(format!("{prefix}{suffix}"))),
        );
        paths
    }
}

impl Drop for JobArtifacts {
    fn drop(&mut self) {
        for path in self.all_paths() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed temp artifact"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove temp artifact")
                }
            }
        }
    }
}

/// Reserve the first unused `Highlight-<n>.mp4` in `dir` (n ≥ 1) by creating
/// it empty. Creates `dir` if needed. The caller owns the placeholder and must
/// remove it if the job fails.
pub fn next_output_path(dir: &Path) -> HudclipResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut n: u32 = 1;
    loop {
        let candidate = dir.join(format!("{OUTPUT_STEM}-{n}.mp4"));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
        n = n
            .checked_add(1)
            .ok_or_else(|| HudclipError::render("No free output file name"))?;
    }
}

/// Move `src` to `dst`, copying then deleting when a rename is not possible
/// (for example across filesystems).
pub fn move_file(src: &Path, dst: &Path) -> HudclipResult<()> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let finalize_err = |e: std::io::Error| HudclipError::FinalizeMove {
        path: dst.to_path_buf(),
        message: e.to_string(),
    };
    std::fs::copy(src, dst).map_err(finalize_err)?;
    if let Err(e) = std::fs::remove_file(src) {
        tracing::warn!(path = %src.display(), error = %e, "Copied output but could not remove source");
    }
    Ok(())
}
