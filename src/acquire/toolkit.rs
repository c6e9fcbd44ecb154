//! Export through the Ultralytics toolkit, driven as a Python subprocess.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{require_dir, Artifact, MIN_EXPORT_BYTES};
use crate::config::{Config, DEFAULT_EXPORT_FORMAT, DEFAULT_IMGSZ, DEFAULT_OPSET};
use crate::error::AcquireError;
use crate::report;
use crate::stage::{stage_artifact, Staged};
use crate::Result;

/// Checked when the requested format produced nothing.
const FALLBACK_FORMAT: &str = "tflite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub model: String,
    pub format: String,
    pub imgsz: u32,
    pub simplify: bool,
    pub opset: u32,
}

impl ExportRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            format: DEFAULT_EXPORT_FORMAT.to_string(),
            imgsz: DEFAULT_IMGSZ,
            simplify: true,
            opset: DEFAULT_OPSET,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let mut req = Self::new(cfg.model());
        if let Some(f) = &cfg.export_format { req.format = f.clone(); }
        if let Some(s) = cfg.imgsz { req.imgsz = s; }
        if let Some(s) = cfg.simplify { req.simplify = s; }
        if let Some(o) = cfg.opset { req.opset = o; }
        req
    }

    /// Checkpoint the toolkit downloads on first use.
    pub fn weights(&self) -> String {
        format!("{}.pt", self.model)
    }
}

pub trait Toolkit {
    /// Makes sure the toolkit can be used, installing it if necessary.
    fn ensure_available(&self) -> Result<()>;

    /// Fetches the pretrained checkpoint and writes the export into `workdir`.
    fn export(&self, request: &ExportRequest, workdir: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct PythonToolkit {
    python: String,
    package: String,
}

impl PythonToolkit {
    pub fn new(python: impl Into<String>) -> Self {
        Self { python: python.into(), package: "ultralytics".to_string() }
    }

    fn importable(&self) -> bool {
        let status = Command::new(&self.python)
            .arg("-c")
            .arg(format!("import {}", self.package))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        matches!(status, Ok(s) if s.success())
    }

    fn install(&self) -> bool {
        report::step(&format!("installing {}...", self.package));
        let status = Command::new(&self.python)
            .args(["-m", "pip", "install", self.package.as_str(), "--quiet"])
            .status();
        match status {
            Ok(s) => s.success(),
            Err(e) => {
                warn!(python = %self.python, error = %e, "could not run pip");
                false
            }
        }
    }
}

/// Python run with `-c`; the checkpoint and format arrive as `sys.argv[1..]`
/// so names never need quoting.
pub fn export_script(request: &ExportRequest) -> String {
    let py_bool = if request.simplify { "True" } else { "False" };
    format!(
        "import sys\n\
         from ultralytics import YOLO\n\
         model = YOLO(sys.argv[1])\n\
         out = model.export(format=sys.argv[2], imgsz={imgsz}, simplify={py_bool}, opset={opset})\n\
         sys.exit(0 if out else 1)\n",
        imgsz = request.imgsz,
        opset = request.opset,
    )
}

/// Interpreter arguments for one export run.
pub fn export_args(request: &ExportRequest) -> Vec<String> {
    vec!["-c".to_string(), export_script(request), request.weights(), request.format.clone()]
}

impl Toolkit for PythonToolkit {
    fn ensure_available(&self) -> Result<()> {
        if self.importable() {
            debug!(package = %self.package, "toolkit already installed");
            return Ok(());
        }
        report::warn(&format!("{} is not installed", self.package));
        if self.install() && self.importable() {
            report::ok(&format!("{} installed", self.package));
            Ok(())
        } else {
            Err(AcquireError::DependencyMissing { package: self.package.clone() })
        }
    }

    fn export(&self, request: &ExportRequest, workdir: &Path) -> Result<()> {
        info!(?request, workdir = %workdir.display(), "running toolkit export");
        let status = Command::new(&self.python)
            .args(export_args(request))
            .current_dir(workdir)
            .status()
            .map_err(|e| AcquireError::ExportFailed(format!("could not run {}: {e}", self.python)))?;
        if status.success() {
            Ok(())
        } else {
            Err(AcquireError::ExportFailed(format!("toolkit exited with {status}")))
        }
    }
}

/// Finds the exported file in the top level of `dir`.
///
/// Prefers a file with the requested extension whose name contains the model
/// name, then falls back to a TFLite file with the same name pattern.
pub fn locate_export(dir: &Path, model: &str, format: &str) -> Result<Artifact> {
    let files: Vec<_> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    let find = |ext: &str| {
        files.iter().find(|p| {
            let name_ok = p
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(model));
            let ext_ok = p
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
            name_ok && ext_ok
        })
    };

    let found = find(format).or_else(|| find(FALLBACK_FORMAT));
    match found {
        Some(path) => Artifact::from_path(path.clone()),
        None => Err(AcquireError::OutputNotFound {
            dir: dir.to_path_buf(),
            pattern: format!("*{model}*.{format}"),
        }),
    }
}

/// Runs the toolkit export and stages the result into `assets_dir`.
pub fn acquire_via_toolkit<T: Toolkit>(
    toolkit: &T,
    request: &ExportRequest,
    workdir: &Path,
    assets_dir: &Path,
) -> Result<Staged> {
    toolkit.ensure_available()?;

    report::step(&format!("fetching {} and exporting to {}...", request.weights(), request.format));
    toolkit.export(request, workdir)?;

    let artifact = locate_export(workdir, &request.model, &request.format)?;
    if artifact.size < MIN_EXPORT_BYTES {
        report::warn(&format!(
            "export {} is too small ({}), conversion probably failed",
            artifact.path.display(),
            report::megabytes(artifact.size)
        ));
        return Err(AcquireError::Undersized {
            path: artifact.path,
            size: artifact.size,
            min: MIN_EXPORT_BYTES,
        });
    }

    report::ok(&format!(
        "exported {} ({})",
        artifact.path.display(),
        report::megabytes(artifact.size)
    ));

    require_dir(assets_dir)?;
    let ext = artifact
        .path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(request.format.as_str())
        .to_ascii_lowercase();
    let dest = assets_dir.join(format!("{}.{}", request.model, ext));
    report::step(&format!("copying to {}", dest.display()));
    stage_artifact(&artifact.path, &dest)
}
