use knowledge_indexer::RunOutcome;
use std::fmt::Write as _;

/// Human-readable closing summary of a run
pub(crate) fn render_summary(outcome: &RunOutcome) -> String {
    let overview = &outcome.graph.overview;
    let stats = &outcome.stats;
    let mut out = String::new();

    if outcome.cancelled {
        out.push_str("Extraction interrupted; partial results were saved.\n");
    } else {
        out.push_str("Extraction complete.\n");
    }
    let _ = writeln!(out, "Results saved to: {}", outcome.output_file.display());
    let _ = writeln!(
        out,
        "Processed types: {} classes, {} interfaces, {} enums",
        overview.class_count, overview.interface_count, overview.enum_count
    );
    let _ = writeln!(out, "Total methods: {}", overview.method_count);
    let _ = writeln!(out, "Unique packages: {}", overview.packages.len());
    let _ = writeln!(out, "Average complexity: {:.2}", overview.average_complexity);
    let _ = writeln!(
        out,
        "Summaries: {} summarized, {} partial, {} unavailable",
        stats.summarized, stats.partial, stats.unavailable
    );
    if stats.parse_failures > 0 {
        let _ = writeln!(out, "Skipped files: {}", stats.parse_failures);
    }
    if !outcome.serialization_errors.is_empty() {
        let _ = writeln!(
            out,
            "Values written as null: {}",
            outcome.serialization_errors.len()
        );
    }
    if let Some(changed) = outcome.documents_changed {
        let _ = writeln!(out, "Vector documents updated: {changed}");
    }
    out.trim_end().to_string()
}
