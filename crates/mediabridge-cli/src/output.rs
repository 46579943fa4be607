use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tables and prose for a terminal
    Human,
    /// Machine-readable JSON on stdout
    Json,
}
