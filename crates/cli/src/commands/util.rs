use anyhow::{anyhow, Result};
use flashpack_core::services::publisher::{PublishOutcome, PublishReport};

/// Print one line per published artifact.
pub fn print_publish_report(report: &PublishReport) {
    if report.skipped_output_dir {
        println!("Output dir {} does not exist; publish skipped", report.output_dir.display());
        return;
    }

    println!("Published to {}:", report.output_dir.display());
    if report.artifacts.is_empty() {
        println!("  (none)");
        return;
    }
    for artifact in &report.artifacts {
        match &artifact.outcome {
            PublishOutcome::Copied { bytes, sha256, .. } => {
                println!("  - {} [{} bytes] sha256={}", artifact.name, bytes, sha256);
            }
            PublishOutcome::SkippedMissingSource => {
                println!("  - {} [skipped: {} not found]", artifact.name, artifact.source.display());
            }
            PublishOutcome::Failed { error } => {
                println!("  - {} [FAILED: {}]", artifact.name, error);
            }
        }
    }
}

/// Turn per-file publish failures into one error, after every copy was attempted.
pub fn ensure_published(report: &PublishReport) -> Result<()> {
    let failed: Vec<String> = report
        .failures()
        .map(|a| format!("{} ({})", a.name, a.source.display()))
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Failed to publish {} artifact(s): {}", failed.len(), failed.join(", ")))
    }
}
