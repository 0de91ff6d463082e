pub use clap::Parser;

use std::path::PathBuf;

use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "tinyhost")]
#[command(about = "Host static pages and notebooks on S3, each with its own tiny JSON datastore")]
#[command(version)]
pub struct Args {
    /// Path to the tinyhost config directory (defaults to ~/.tinyhost)
    #[arg(long, global = true, env = "TINYHOST_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    /// Log level for messages on stderr; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: crate::Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    #[test]
    fn test_publish_args() {
        let args = Args::try_parse_from([
            "tinyhost",
            "publish",
            "a.html",
            "https://b.s3.amazonaws.com/a-0123456789ab.html",
            "--prefix",
            "site",
            "--duration",
            "3600",
            "--reset",
        ])
        .unwrap();

        match args.command {
            Command::Publish(publish) => {
                assert_eq!(publish.inputs.len(), 2);
                assert_eq!(publish.prefix.as_deref(), Some("site"));
                assert_eq!(publish.duration, Some(3600));
                assert!(publish.reset);
                assert!(!publish.no_write_back);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(args.log_level, Level::INFO);
    }

    #[test]
    fn test_publish_requires_input() {
        assert!(Args::try_parse_from(["tinyhost", "publish"]).is_err());
    }

    #[test]
    fn test_duration_is_bounded() {
        for duration in ["0", "604801"] {
            assert!(Args::try_parse_from(["tinyhost", "publish", "a.html", "--duration", duration])
                .is_err());
        }
        assert!(
            Args::try_parse_from(["tinyhost", "publish", "a.html", "--duration", "604800"]).is_ok()
        );
    }
}
