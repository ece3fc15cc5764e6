// ABOUTME: Caddyfile rendering for deployments exposed on host ports.
// ABOUTME: One site block per routing rule, written atomically.

use super::RoutingRule;
use std::fmt::Write as _;
use std::io;
use std::path::Path;

pub fn render(preamble: Option<&str>, rules: &[RoutingRule]) -> String {
    let mut out = String::new();
    if let Some(preamble) = preamble.map(str::trim).filter(|p| !p.is_empty()) {
        out.push_str(preamble);
        out.push_str("\n\n");
    }
    for rule in rules {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{} {{\n    reverse_proxy localhost:{}\n}}\n",
            rule.host, rule.port
        );
    }
    out
}

/// Replace `path` with `content` via a sibling temp file.
pub async fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("voyager.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await
}
