use super::{Diagnostic, Severity};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn yellow(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;33m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[BS-R001]: message"
        let mut severity_label = match d.severity {
            Severity::Error => "error".to_string(),
            Severity::Warning => "warning".to_string(),
        };
        if let Some(code) = d.code {
            severity_label.push_str(&format!("[{code}]"));
        }
        let severity_label = match d.severity {
            Severity::Error => self.bold_red(&severity_label),
            Severity::Warning => self.yellow(&severity_label),
        };
        out.push_str(&format!("{}: {}\n", severity_label, self.bold(&d.message)));

        let primary = d.primary_label();
        if let Some(label) = primary {
            out.push_str(&format!("  {} block {}\n", self.cyan("-->"), label.block));
        }

        // Listing snippet: the labelled block with one block of context above.
        if let (Some(label), Some(listing)) = (primary, &d.listing) {
            if let Some(line_text) = listing.get(label.block) {
                let first = label.block.saturating_sub(1);
                let gutter = label.block.to_string().len();
                let pipe = self.cyan("|");
                let pad = " ".repeat(gutter);

                out.push_str(&format!("{pad} {pipe}\n"));
                for (i, text) in listing.iter().enumerate().take(label.block).skip(first) {
                    let num = self.cyan(&format!("{i:>gutter$}"));
                    out.push_str(&format!("{num} {pipe} {}\n", self.dim(text)));
                }
                let num = self.cyan(&format!("{:>gutter$}", label.block));
                out.push_str(&format!("{num} {pipe} {line_text}\n"));

                let body = line_text.trim_start();
                let indent = " ".repeat(line_text.len() - body.len());
                let carets = self.bold_red(&"^".repeat(body.len().max(1)));
                if label.message.is_empty() {
                    out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
                } else {
                    out.push_str(&format!("{pad} {pipe} {indent}{carets} {}\n", self.bold_red(&label.message)));
                }
                out.push_str(&format!("{pad} {pipe}\n"));
            }
        } else if let Some(label) = primary {
            if !label.message.is_empty() {
                out.push_str(&format!("  {} {}\n", self.dim("="), label.message));
            }
        }

        for label in d.labels.iter().filter(|l| !l.is_primary) {
            out.push_str(&format!("  {} block {}: {}\n", self.dim("="), label.block, label.message));
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }

        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }

        out
    }
}
