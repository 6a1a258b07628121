//! Per-run report in the comma-separated layout lab spreadsheets import.

use std::io::{self, Write};
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::models::{AnalysisResult, population_std_dev};

/// Numbers reported for one analysed file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStats {
    pub count: usize,
    pub avg_area: f64,
    pub std_dev: f64,
    pub areas: Vec<f64>,
}

impl FileStats {
    pub fn from_areas(areas: Vec<f64>) -> Self {
        let count = areas.len();
        let avg_area = if count > 0 {
            areas.iter().sum::<f64>() / count as f64
        } else {
            0.0
        };
        Self {
            count,
            avg_area,
            std_dev: population_std_dev(&areas),
            areas,
        }
    }
}

impl From<&AnalysisResult> for FileStats {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            count: result.count,
            avg_area: result.avg_area,
            std_dev: result.std_dev(),
            areas: result.areas.clone(),
        }
    }
}

/// Float formatting that keeps a trailing `.0` and hides binary noise.
fn fmt_param(value: f64) -> String {
    format!("{:?}", (value * 1e6).round() / 1e6)
}

pub struct ReportWriter<W: Write> {
    out: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Parameters used for the run.
    pub fn write_header(&mut self, config: &AnalysisConfig) -> io::Result<()> {
        let (map_w, map_h) = config.gradient_map_size();
        writeln!(
            self.out,
            "The threshold for significance (percentage darker a colony has to be to be distinct from background) is: {}",
            fmt_param(config.significance_multiplier * 100.0)
        )?;
        writeln!(
            self.out,
            "The gradient map resolution multiplier is: {}",
            fmt_param(config.gradient_resolution)
        )?;
        writeln!(
            self.out,
            "This will produce a {} by {} pixel gradient map.",
            fmt_param(map_w),
            fmt_param(map_h)
        )?;
        writeln!(
            self.out,
            "Colonies smaller than {} um^2 are rejected as unviable or erroneous",
            fmt_param(config.min_colony_size_um2)
        )?;
        writeln!(
            self.out,
            "Pipeline variant: {}, pixel scale: {} um/px",
            config.variant,
            fmt_param(config.pixel_scale_um)
        )?;
        writeln!(self.out, "------------------------------------------------------------------")
    }

    pub fn begin_folder(&mut self, dir: &Path) -> io::Result<()> {
        writeln!(self.out, "{}: ", dir.display())
    }

    pub fn write_file(&mut self, name: &str, stats: &FileStats) -> io::Result<()> {
        writeln!(self.out, "{} colonies:,{}", name, stats.count)?;
        writeln!(
            self.out,
            "{} average colony size and standard deviation (um^2):,{:.2},{:.2}",
            name, stats.avg_area, stats.std_dev
        )?;
        let areas: Vec<String> = stats.areas.iter().map(|a| format!("{:?}", a)).collect();
        writeln!(
            self.out,
            "{} individual colony size (in no particular order):,{}",
            name,
            areas.join(",")
        )
    }

    pub fn write_failure(&mut self, name: &str, error: &str) -> io::Result<()> {
        writeln!(self.out, "{} could not be analyzed:,{}", name, error.replace('\n', " "))
    }

    pub fn end_folder(&mut self, folder_count: usize) -> io::Result<()> {
        write!(self.out, "Total folder count:{}\n\n", folder_count)
    }

    /// Write the run total and hand back the underlying writer.
    pub fn finish(mut self, total: usize) -> io::Result<W> {
        write!(self.out, "\nTotal colony count: {}", total)?;
        self.out.flush()?;
        Ok(self.out)
    }
}
