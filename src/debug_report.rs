use drugkb::{DrugRecord, InteractionEdge, RegimenReport, SearchFilter, Severity, Snapshot};

pub use ansi::Palette;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Severe => ansi::RED,
        Severity::Moderate => ansi::YELLOW,
        Severity::Mild => ansi::GREEN,
    }
}

fn header(title: &str, palette: &Palette) {
    println!("\n{}", palette.paint(format!("━━━ {title} ━━━"), ansi::GRAY));
}

pub fn print_regimen(report: &RegimenReport, palette: &Palette) {
    let names: Vec<&str> = report.drugs.iter().map(|d| d.name.as_str()).collect();
    println!("\n{}", palette.bold(palette.paint(format!("⚕  Regimen: {}", names.join(" + ")), ansi::CYAN)));

    let highest = match report.highest_severity {
        Some(severity) => palette.bold(palette.paint(severity.as_str(), severity_color(severity))),
        None => palette.dim(report.highest_severity_label()),
    };
    println!("  Highest interaction severity: {highest}");

    header("Interactions", palette);
    if report.interactions.is_empty() {
        println!("{}", palette.dim("  No recorded interactions between these drugs"));
    }
    for finding in &report.interactions {
        println!(
            "  {} {} {} {}{}",
            palette.paint(format!("[{}]", finding.severity), severity_color(finding.severity)),
            palette.bold(&finding.drug_a.name),
            palette.dim("↔"),
            palette.bold(&finding.drug_b.name),
            if finding.reciprocated { String::new() } else { palette.dim("  (one-sided)") },
        );
        for effect in &finding.effects {
            println!("      {} {}", palette.dim("•"), effect);
        }
    }

    if !report.pairs_without_record.is_empty() {
        header("No interaction data", palette);
        for pair in &report.pairs_without_record {
            println!("  {} {} {}", pair.drug_a.name, palette.dim("↔"), pair.drug_b.name);
        }
        println!("{}", palette.dim("  Absence of a record is not evidence that a combination is safe."));
    }

    if !report.contraindications.is_empty() {
        header("Contraindications", palette);
        for finding in &report.contraindications {
            println!(
                "  {} {} {} {}",
                palette.paint(&finding.drug.name, ansi::BLUE),
                palette.dim("│"),
                palette.paint(&finding.condition, ansi::YELLOW),
                palette.dim(format!("matched \"{}\"", finding.matched_text)),
            );
        }
    }

    if !report.substance_advisories.is_empty() {
        header("Food & substance advisories", palette);
        for advisory in &report.substance_advisories {
            println!(
                "  {} {} {} {} {}",
                palette.paint(format!("[{}]", advisory.severity), severity_color(advisory.severity)),
                advisory.drug.name,
                palette.dim("+"),
                palette.paint(advisory.substance.as_str(), ansi::CYAN),
                palette.dim(advisory.effects.join("; ")),
            );
        }
    }
    println!();
}

pub fn print_search(filter: &SearchFilter, hits: &[&DrugRecord], palette: &Palette) {
    header(&format!("Search ({} match{})", hits.len(), if hits.len() == 1 { "" } else { "es" }), palette);
    if let Some(text) = &filter.text {
        println!("  {} {}", palette.dim("text:"), text);
    }
    if hits.is_empty() {
        println!("{}", palette.dim("  No matching records"));
    }
    for record in hits {
        println!(
            "  {} {} {} {}{}",
            palette.bold(palette.paint(&record.name, ansi::GREEN)),
            palette.dim(format!("({})", record.id)),
            palette.dim("│"),
            palette.paint(&record.drug_class, ansi::BLUE),
            if record.is_dangerous { palette.paint("  ⚠ dangerous", ansi::RED) } else { String::new() },
        );
    }
    println!();
}

pub fn print_unreciprocated(edges: &[&InteractionEdge], palette: &Palette) {
    header(&format!("One-sided interactions ({})", edges.len()), palette);
    for edge in edges {
        let (a, b) = edge.key.endpoints();
        let authors: Vec<&str> = edge.authors().into_iter().collect();
        println!(
            "  {} {} {} {} {}",
            palette.paint(format!("[{}]", edge.severity), severity_color(edge.severity)),
            a.label(),
            palette.dim("↔"),
            b.label(),
            palette.dim(format!("only in {}", authors.join(", "))),
        );
    }
    println!();
}

pub fn print_summary(snapshot: &Snapshot, palette: &Palette) {
    let catalog = snapshot.catalog();
    let title = format!("⚙  Catalog: {} records (generation {})", catalog.len(), snapshot.generation());
    println!("\n{}", palette.bold(palette.paint(title, ansi::CYAN)));

    header("Classes", palette);
    for (class, summary) in catalog.class_summary() {
        println!(
            "  {} {} {}",
            palette.paint(format!("{:>3}", summary.count), ansi::YELLOW),
            palette.paint(&class, ansi::BLUE),
            palette.dim(format!("({})", summary.category)),
        );
    }

    let metrics = snapshot.metrics();
    header("Build", palette);
    println!(
        "  Total: {}  │  Index: {}  │  Resolve: {}  │  Graph: {}",
        palette.paint(format!("{:?}", metrics.total), ansi::GREEN),
        palette.dim(format!("{:?}", metrics.index)),
        palette.dim(format!("{:?}", metrics.resolve)),
        palette.dim(format!("{:?}", metrics.graph)),
    );
    println!("  {}", palette.dim(metrics.summary()));
    println!();
}
