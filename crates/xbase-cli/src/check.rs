//! `xbase check`: walk source trees and report diagnostics

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use xbase_core::lexer::LineIndex;
use xbase_core::{analyze, Analysis, Diagnostic, FrontendConfig};

/// Totals over one `check` run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub errors: usize,
}

/// Expand directories into the source files they contain (by configured
/// extension, sorted). Files named explicitly are kept whatever their
/// extension.
pub fn collect_sources(paths: &[PathBuf], config: &FrontendConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, config, &mut files)?;
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("No such file or directory: '{}'", path.display());
        }
    }
    Ok(files)
}

fn walk(dir: &Path, config: &FrontendConfig, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory '{}'", dir.display()))?;
    let mut paths = entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to list '{}'", dir.display()))?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            walk(&path, config, files)?;
        } else if config.is_source_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Analyze every file, printing its diagnostics to stderr
pub fn check_files(files: &[PathBuf], config: &FrontendConfig) -> Result<Summary> {
    let mut summary = Summary::default();
    for file in files {
        let source = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read '{}'", file.display()))?;
        let analysis = analyze(&source, config);
        let errors = print_diagnostics(file, &source, &analysis, config);
        log::debug!("{}: {errors} error(s)", file.display());
        summary.files += 1;
        summary.errors += errors;
    }
    Ok(summary)
}

/// Print up to `report.max-diagnostics` diagnostics as
/// `path:line:col: message`; returns the total number found
pub fn print_diagnostics(
    file: &Path,
    source: &str,
    analysis: &Analysis,
    config: &FrontendConfig,
) -> usize {
    let diagnostics = analysis.diagnostics();
    for line in format_diagnostics(file, source, &diagnostics, config.report.max_diagnostics) {
        eprintln!("{line}");
    }
    diagnostics.len()
}

fn format_diagnostics(
    file: &Path,
    source: &str,
    diagnostics: &[Diagnostic],
    limit: usize,
) -> Vec<String> {
    let index = LineIndex::new(source);
    let shown = if limit == 0 {
        diagnostics.len()
    } else {
        limit.min(diagnostics.len())
    };

    let mut lines: Vec<String> = diagnostics[..shown]
        .iter()
        .map(|d| {
            let location = index.location(d.span.start);
            format!("{}:{location}: {}", file.display(), d.message)
        })
        .collect();
    if shown < diagnostics.len() {
        lines.push(format!(
            "{}: {} more diagnostic(s) not shown",
            file.display(),
            diagnostics.len() - shown
        ));
    }
    lines
}
