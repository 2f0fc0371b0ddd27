//! CLI (command line interface) options of a test binary embedding the
//! engine.

use std::path::PathBuf;

pub use clap::{Args, Parser};

/// Root CLI of a test binary built on [`Cardamom`].
///
/// Embedders parse it themselves (possibly flattened into their own
/// [`clap::Parser`]) and hand it over via [`Cardamom::with_cli`].
///
/// [`Cardamom`]: crate::Cardamom
/// [`Cardamom::with_cli`]: crate::Cardamom::with_cli
#[derive(Args, Clone, Debug)]
pub struct Opts {
    /// Path of a `.feature` file, or a directory searched for them
    /// recursively.
    #[arg(
        id = "input",
        long = "input",
        short = 'i',
        value_name = "glob",
        global = true
    )]
    pub features: Option<PathBuf>,

    /// Directory the JSON report and failure evidence are written into.
    #[arg(
        long = "output",
        short = 'o',
        value_name = "dir",
        global = true
    )]
    pub output: Option<PathBuf>,

    /// Number of scenarios to run concurrently.
    #[arg(
        long = "concurrency",
        short = 'c',
        value_name = "int",
        global = true
    )]
    pub concurrency: Option<usize>,

    /// Stop scheduling scenarios after the first failed one.
    #[arg(long = "fail-fast", visible_alias = "ff", global = true)]
    pub fail_fast: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        opts: Opts,
    }

    #[test]
    fn parses_all_options() {
        let cli = Cli::parse_from([
            "prog",
            "--input",
            "tests/features",
            "--output",
            "target/executions",
            "--concurrency",
            "2",
            "--fail-fast",
        ]);
        assert_eq!(
            cli.opts.features.as_deref(),
            Some(std::path::Path::new("tests/features")),
        );
        assert_eq!(cli.opts.concurrency, Some(2));
        assert!(cli.opts.fail_fast);
    }

    #[test]
    fn everything_is_optional() {
        let cli = Cli::parse_from(["prog"]);
        assert_eq!(cli.opts.features, None);
        assert_eq!(cli.opts.output, None);
        assert_eq!(cli.opts.concurrency, None);
        assert!(!cli.opts.fail_fast);
    }
}
