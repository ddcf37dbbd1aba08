use crate::{models::Quote, Error, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
        }
    }
}

/// Exporter for the quote collection
pub struct Exporter;

impl Exporter {
    /// Export quotes to a file with automatic format detection
    pub fn export_to_file<P: AsRef<Path>>(quotes: &[Quote], path: P) -> Result<ExportFormat> {
        let path = path.as_ref();

        // Detect format from extension
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ExportFormat::from_extension)
            .ok_or_else(|| {
                Error::ConfigError(
                    "Could not determine export format from extension. Use .json, .csv, or .md"
                        .to_string(),
                )
            })?;

        Self::export_to_file_with_format(quotes, path, format)?;
        Ok(format)
    }

    /// Export quotes to a file with explicit format
    pub fn export_to_file_with_format<P: AsRef<Path>>(
        quotes: &[Quote],
        path: P,
        format: ExportFormat,
    ) -> Result<()> {
        let content = match format {
            ExportFormat::Json => Self::to_json(quotes)?,
            ExportFormat::Csv => Self::to_csv(quotes),
            ExportFormat::Markdown => Self::to_markdown(quotes),
        };

        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;

        Ok(())
    }

    /// Export quotes to JSON - the format `import` reads back
    pub fn to_json(quotes: &[Quote]) -> Result<String> {
        Ok(serde_json::to_string_pretty(quotes)?)
    }

    /// Export quotes to CSV format
    pub fn to_csv(quotes: &[Quote]) -> String {
        let mut output = String::from("Text,Category,Id\n");

        for quote in quotes {
            output.push_str(&format!(
                "{},{},{}\n",
                Self::escape_csv(&quote.text),
                Self::escape_csv(&quote.category),
                quote.id.map(|id| id.to_string()).unwrap_or_default(),
            ));
        }

        output
    }

    /// Export quotes to Markdown, one section per category
    pub fn to_markdown(quotes: &[Quote]) -> String {
        let mut output = String::new();

        output.push_str("# Quotes\n\n");
        output.push_str(&format!("Total quotes: {}\n\n", quotes.len()));

        let mut by_category: BTreeMap<&str, Vec<&Quote>> = BTreeMap::new();
        for quote in quotes {
            by_category.entry(quote.category.as_str()).or_default().push(quote);
        }

        for (category, quotes) in by_category {
            output.push_str(&format!("## {} ({})\n\n", category, quotes.len()));
            for quote in quotes {
                for line in quote.text.lines() {
                    output.push_str(&format!("> {}\n", line));
                }
                if let Some(id) = quote.id {
                    output.push_str(&format!(">\n> _server #{}_\n", id));
                }
                output.push('\n');
            }
        }

        output
    }

    /// Escape CSV special characters
    fn escape_csv(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Quote> {
        vec![
            Quote::new("Simplicity, always.", "Wisdom"),
            Quote::remote(3, "From the server", "Server"),
        ]
    }

    #[test]
    fn test_export_format_detection() {
        assert_eq!(
            ExportFormat::from_extension("json"),
            Some(ExportFormat::Json)
        );
        assert_eq!(
            ExportFormat::from_extension("JSON"),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_extension("csv"), Some(ExportFormat::Csv));
        assert_eq!(
            ExportFormat::from_extension("markdown"),
            Some(ExportFormat::Markdown)
        );
        assert_eq!(ExportFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_json_export() {
        let json = Exporter::to_json(&sample()).unwrap();
        let parsed: Vec<Quote> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_csv_export() {
        let csv = Exporter::to_csv(&sample());
        assert!(csv.starts_with("Text,Category,Id\n"));
        assert!(csv.contains("\"Simplicity, always.\",Wisdom,\n"));
        assert!(csv.contains("From the server,Server,3\n"));
    }

    #[test]
    fn test_markdown_export() {
        let md = Exporter::to_markdown(&sample());
        assert!(md.contains("# Quotes"));
        assert!(md.contains("## Server (1)"));
        assert!(md.contains("> Simplicity, always."));
        assert!(md.contains("_server #3_"));
    }

    #[test]
    fn test_markdown_multiline_stays_quoted() {
        let md = Exporter::to_markdown(&[Quote::new("First line\nSecond line", "Poetry")]);
        assert!(md.contains("> First line\n> Second line\n"));
        assert!(!md.contains("\nSecond line"));
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(Exporter::escape_csv("simple"), "simple");
        assert_eq!(Exporter::escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(Exporter::escape_csv("with\"quote"), "\"with\"\"quote\"");
    }

    #[test]
    fn test_export_to_file_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.csv");

        let format = Exporter::export_to_file(&sample(), &path).unwrap();
        assert_eq!(format, ExportFormat::Csv);
        assert!(std::fs::read_to_string(&path).unwrap().contains("Wisdom"));

        let bad = dir.path().join("quotes.txt");
        assert!(Exporter::export_to_file(&sample(), &bad).is_err());
    }
}
