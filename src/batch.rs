//! Folder-tree driver: finds plate images, analyses them, writes QC images
//! next to them and one report for the whole run.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use image::ImageReader;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::detection::preprocessing;
use crate::pipeline::ColonyPipeline;
use crate::report::{FileStats, ReportWriter};

/// Directories whose name ends with this are QC output and never analysed.
pub const QC_SUFFIX: &str = "QC";
pub const QC_DIR_NAME: &str = "QC";
pub const QC_PREFIX: &str = "QC_";
pub const DEFAULT_REPORT_NAME: &str = "output.csv";

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub root: PathBuf,
    /// Defaults to `<root>/output.csv`.
    pub report_path: Option<PathBuf>,
    /// Accepted file extensions, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Worker threads; `None` uses every core.
    pub jobs: Option<usize>,
}

impl BatchOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            report_path: None,
            extensions: vec!["jpg".to_string()],
            jobs: None,
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| self.root.join(DEFAULT_REPORT_NAME))
    }

    pub fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderSummary {
    pub dir: PathBuf,
    pub images: usize,
    pub colonies: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub folders: Vec<FolderSummary>,
    pub total_colonies: usize,
    pub failures: usize,
    pub report_path: PathBuf,
}

fn is_qc_dir(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(QC_SUFFIX))
}

/// Directories (pre-order, sorted by name) that directly hold accepted images,
/// each with its sorted image list.
pub fn discover(options: &BatchOptions) -> anyhow::Result<Vec<(PathBuf, Vec<PathBuf>)>> {
    let mut found = Vec::new();
    collect_image_dirs(&options.root, options, &mut found)?;
    Ok(found)
}

fn collect_image_dirs(
    dir: &Path,
    options: &BatchOptions,
    found: &mut Vec<(PathBuf, Vec<PathBuf>)>,
) -> anyhow::Result<()> {
    if is_qc_dir(dir) {
        debug!("Skipping QC directory {}", dir.display());
        return Ok(());
    }

    let mut subdirs = Vec::new();
    let mut images = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            subdirs.push(path);
        } else if file_type.is_file() && options.accepts(&path) {
            images.push(path);
        }
    }
    subdirs.sort();
    images.sort();

    if !images.is_empty() {
        found.push((dir.to_path_buf(), images));
    }
    for sub in subdirs {
        collect_image_dirs(&sub, options, found)?;
    }
    Ok(())
}

/// Debug label for an image: its path below the root, extension kept, so two
/// inputs never share debug files.
fn debug_label(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => file_name(path),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn build_pool(jobs: Option<usize>) -> anyhow::Result<ThreadPool> {
    let mut builder = ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
        if jobs == 0 {
            bail!("--jobs must be at least 1");
        }
        builder = builder.num_threads(jobs);
    }
    builder.build().context("Failed to start worker pool")
}

/// Load, analyse, and write the QC image for one file.
fn analyze_file(pipeline: &ColonyPipeline, root: &Path, path: &Path, qc_dir: &Path) -> anyhow::Result<FileStats> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .decode()
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let gray = preprocessing::to_grayscale(&img);

    let result = pipeline.analyze_labeled(&gray, &debug_label(root, path))?;

    let qc_path = qc_dir.join(format!("{}{}", QC_PREFIX, file_name(path)));
    result
        .qc_image
        .save(&qc_path)
        .with_context(|| format!("Failed to write QC image {}", qc_path.display()))?;

    Ok(FileStats::from(&result))
}

/// Analyse every image folder below `options.root` and write the report.
///
/// A file that fails is logged, reported, and counted; the run goes on.
pub fn run(pipeline: &ColonyPipeline, options: &BatchOptions) -> anyhow::Result<RunSummary> {
    if !options.root.is_dir() {
        bail!("Input directory does not exist: {}", options.root.display());
    }

    let folders = discover(options)?;
    if folders.is_empty() {
        warn!(
            "No images with extensions {:?} found under {}",
            options.extensions,
            options.root.display()
        );
    }

    let report_path = options.report_path();
    let file = File::create(&report_path)
        .with_context(|| format!("Failed to create report {}", report_path.display()))?;
    let mut report = ReportWriter::new(BufWriter::new(file));
    report.write_header(pipeline.config())?;

    let pool = build_pool(options.jobs)?;
    let mut summary = RunSummary {
        folders: Vec::with_capacity(folders.len()),
        total_colonies: 0,
        failures: 0,
        report_path: report_path.clone(),
    };

    for (dir, images) in folders {
        info!("Analyzing {} files in directory: {}", images.len(), dir.display());
        let qc_dir = dir.join(QC_DIR_NAME);
        fs::create_dir_all(&qc_dir).with_context(|| format!("Failed to create {}", qc_dir.display()))?;

        let outcomes: Vec<anyhow::Result<FileStats>> = pool.install(|| {
            images
                .par_iter()
                .map(|path| analyze_file(pipeline, &options.root, path, &qc_dir))
                .collect()
        });

        report.begin_folder(&dir)?;
        let mut folder = FolderSummary {
            dir: dir.clone(),
            images: images.len(),
            colonies: 0,
            failures: 0,
        };
        for (path, outcome) in images.iter().zip(outcomes) {
            let name = file_name(path);
            match outcome {
                Ok(stats) => {
                    folder.colonies += stats.count;
                    report.write_file(&name, &stats)?;
                }
                Err(e) => {
                    warn!("Could not analyze {}: {:#}", path.display(), e);
                    folder.failures += 1;
                    report.write_failure(&name, &format!("{:#}", e))?;
                }
            }
        }
        report.end_folder(folder.colonies)?;

        info!(
            folder = %dir.display(),
            colonies = folder.colonies,
            failures = folder.failures,
            "Folder done"
        );
        summary.total_colonies += folder.colonies;
        summary.failures += folder.failures;
        summary.folders.push(folder);
    }

    report
        .finish(summary.total_colonies)
        .with_context(|| format!("Failed to write report {}", report_path.display()))?;
    Ok(summary)
}
