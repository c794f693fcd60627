use clap::{Parser, ValueEnum};

/// Dashboard gateway serving cached spreadsheet data and single-cell edits.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::default())]
    pub tracing: TracingFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable, for local development
    Pretty,
    /// One JSON object per line, for log collectors
    Json,
}

impl Default for TracingFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tracing_format() {
        let args = Args::parse_from(["central", "--tracing", "json"]);
        assert_eq!(args.tracing, TracingFormat::Json);
        assert!(Args::try_parse_from(["central", "--tracing", "xml"]).is_err());
    }
}
