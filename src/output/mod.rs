mod styling;

use styling::{dim, magenta_bold};

/// Prints the `cinotify` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔔 cinotify"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitLab pipelines to Telegram")
    );
}
