//! Human readable sync summaries.

use std::fmt::Write;

use marquee_core::sync::{RunMode, SourceReport, SyncReport};

/// Render a report as printed at the end of `marquee sync`.
pub fn render(report: &SyncReport) -> String {
    let mut out = String::new();

    let mode = match report.mode {
        RunMode::Incremental => "incremental",
        RunMode::FullResync => "full resync",
    };
    let _ = writeln!(out, "Sync finished ({})", mode);
    if report.mode.is_full_resync() {
        let _ = writeln!(out, "  cleared {} existing launchers", report.cleared);
    }

    for source in &report.sources {
        render_source(&mut out, source);
    }

    for (source_type, count) in &report.untouched_foreign {
        let _ = writeln!(
            out,
            "  {}: {} launchers kept (source not configured)",
            source_type, count
        );
    }

    if let Some(d) = &report.disambiguation {
        let _ = writeln!(
            out,
            "  disambiguation: {} renamed, {} unresolved",
            d.rewritten,
            d.unresolved.len()
        );
        for group in &d.unresolved {
            let _ = writeln!(out, "    still shared: {} ({} launchers)", group.name, group.members.len());
        }
        for failure in &d.write_failures {
            let _ = writeln!(out, "    failed {}: {}", failure.unique_id, failure.reason);
        }
    }

    let _ = writeln!(
        out,
        "Total: {} added, {} removed, {} failed",
        report.total_added(),
        report.total_removed(),
        report.total_failed()
    );
    out
}

fn render_source(out: &mut String, source: &SourceReport) {
    let _ = writeln!(
        out,
        "  {}: {} candidates, {} added, {} present, {} skipped, {} removed",
        source.source_type,
        source.candidates,
        source.added,
        source.already_present,
        source.skipped,
        source.removed
    );
    if !source.has_problems() {
        return;
    }
    if let Some(error) = &source.source_error {
        let _ = writeln!(out, "    enumeration failed, removal sweep skipped: {}", error);
    }
    for failure in source.failed.iter().chain(&source.remove_failures) {
        let _ = writeln!(out, "    failed {}: {}", failure.unique_id, failure.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::sync::ItemFailure;

    #[test]
    fn test_render_incremental() {
        let mut report = SyncReport::new(RunMode::Incremental);
        let mut arcade = SourceReport::new("arcade");
        arcade.candidates = 3;
        arcade.added = 2;
        arcade.already_present = 1;
        arcade.failed.push(ItemFailure {
            unique_id: "sf2".to_string(),
            reason: "boom".to_string(),
        });
        report.sources.push(arcade);
        report.untouched_foreign.insert("old".to_string(), 4);

        let text = render(&report);
        assert!(text.starts_with("Sync finished (incremental)\n"));
        assert!(!text.contains("cleared"));
        assert!(text.contains("  arcade: 3 candidates, 2 added, 1 present, 0 skipped, 0 removed\n"));
        assert!(text.contains("    failed sf2: boom\n"));
        assert!(text.contains("  old: 4 launchers kept (source not configured)\n"));
        assert!(text.ends_with("Total: 2 added, 0 removed, 1 failed\n"));
    }

    #[test]
    fn test_clean_source_renders_one_line() {
        let mut report = SyncReport::new(RunMode::Incremental);
        let mut pc = SourceReport::new("pc");
        pc.candidates = 1;
        pc.already_present = 1;
        report.sources.push(pc);

        let text = render(&report);
        let lines: Vec<&str> = text.lines().filter(|l| l.contains("pc")).collect();
        assert_eq!(lines, vec!["  pc: 1 candidates, 0 added, 1 present, 0 skipped, 0 removed"]);
        assert!(!text.contains("    failed "));
    }

    #[test]
    fn test_render_source_error() {
        let mut report = SyncReport::new(RunMode::FullResync);
        report.cleared = 7;
        let mut snes = SourceReport::new("snes");
        snes.source_error = Some("no such directory".to_string());
        report.sources.push(snes);

        let text = render(&report);
        assert!(text.contains("cleared 7 existing launchers"));
        assert!(text.contains("enumeration failed, removal sweep skipped: no such directory"));
    }
}
