//! Display surface: a local HTML page that embeds the composed URL in a sandboxed iframe.
//!
//! The page is written to the cache directory and handed to the system browser.
//! Nothing here talks to the parsing service; the browser's frame navigation does.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

use crate::constants::constants;
use crate::session::PlayTarget;

pub struct Surface {
  dir: PathBuf,
}

impl Surface {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Surface writing into the platform cache directory.
  pub fn open_default() -> Result<Self> {
    let proj_dirs = ProjectDirs::from("", "", "vp").context("Could not determine a home directory")?;
    Ok(Self::new(proj_dirs.cache_dir()))
  }

  /// Write the player page for `target` and return its path.
  pub fn present(&self, target: &PlayTarget) -> Result<PathBuf> {
    std::fs::create_dir_all(&self.dir).with_context(|| format!("Failed to create {}", self.dir.display()))?;
    let path = self.dir.join(&constants().player_page_name);
    std::fs::write(&path, render_page(target)).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "surface: player page written");
    Ok(path)
  }
}

/// Launch the platform opener without waiting on it.
pub fn open_in_browser(path: &Path) -> Result<()> {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  let mut child = Command::new(cmd)
    .arg(path)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .with_context(|| format!("Failed to launch {}", cmd))?;
  // Reap in the background to avoid zombies.
  std::thread::spawn(move || {
    let _ = child.wait();
  });
  Ok(())
}

pub fn render_page(target: &PlayTarget) -> String {
  let c = constants();
  format!(
    r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
html, body {{ margin: 0; height: 100%; background: #000; }}
iframe {{ border: 0; width: 100%; height: 100%; display: block; }}
</style>
</head>
<body>
<iframe src="{src}" title="Video player" allowfullscreen allow="{allow}" sandbox="{sandbox}"></iframe>
</body>
</html>
"#,
    title = escape_html(&format!("{} · {}", target.endpoint_name, target.video_url)),
    src = escape_html(&target.composed),
    allow = escape_html(&c.iframe_allow),
    sandbox = escape_html(&c.iframe_sandbox),
  )
}

fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn target(composed: &str) -> PlayTarget {
    PlayTarget {
      video_url: "https://v.youku.com/x".to_string(),
      endpoint_name: "Primary".to_string(),
      composed: composed.to_string(),
    }
  }

  #[test]
  fn page_embeds_sandboxed_iframe() {
    let page = render_page(&target("https://jx.example/?url=https%3A%2F%2Fv.youku.com%2Fx"));
    assert!(page.contains(r#"src="https://jx.example/?url=https%3A%2F%2Fv.youku.com%2Fx""#));
    assert!(page.contains(r#"sandbox="allow-same-origin allow-scripts allow-forms allow-presentation""#));
    assert!(!page.contains("allow-top-navigation"));
    assert!(page.contains("allowfullscreen"));
  }

  #[test]
  fn page_escapes_src() {
    let page = render_page(&target(r#"https://jx.example/?a=1&b="x""#));
    assert!(page.contains(r#"src="https://jx.example/?a=1&amp;b=&quot;x&quot;""#));
  }

  #[test]
  fn present_writes_page() {
    let dir = tempfile::tempdir().unwrap();
    let surface = Surface::new(dir.path().join("cache"));
    let path = surface.present(&target("https://jx.example/?url=v")).unwrap();
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("player.html"));
    let written = std::fs::read_to_string(path).unwrap();
    assert!(written.contains("https://jx.example/?url=v"));
  }
}
