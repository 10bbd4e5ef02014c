use clap::Parser;

/// Interactive console for POSIX shared memory segments.
#[derive(Debug, Clone, Parser)]
#[command(name = "shmcon", version)]
pub struct Config {
    /// Prompt printed before every line
    #[arg(long, default_value = "> ")]
    pub prompt: String,

    /// Do not print a prompt (useful when piping commands in)
    #[arg(short, long)]
    pub quiet: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, value_name = "FILTER", default_value = "warn")]
    pub log_level: String,

    /// Run a command line before reading standard input (repeatable)
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    pub commands: Vec<String>,
}

impl Config {
    pub fn prompt(&self) -> Option<&str> {
        if self.quiet {
            None
        } else {
            Some(self.prompt.as_str())
        }
    }
}
