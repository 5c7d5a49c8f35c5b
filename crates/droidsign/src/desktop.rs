//! Best-effort desktop integration: revealing output and the clipboard

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use tracing::debug;

/// A helper program and the arguments it needs before ours
type Launcher = (&'static str, &'static [&'static str]);

#[cfg(target_os = "macos")]
const OPENERS: &[Launcher] = &[("open", &[])];
#[cfg(target_os = "windows")]
const OPENERS: &[Launcher] = &[("explorer", &[])];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENERS: &[Launcher] = &[("xdg-open", &[]), ("gio", &["open"])];

#[cfg(target_os = "macos")]
const CLIPBOARD_TOOLS: &[Launcher] = &[("pbcopy", &[])];
#[cfg(target_os = "windows")]
const CLIPBOARD_TOOLS: &[Launcher] = &[("clip", &[])];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CLIPBOARD_TOOLS: &[Launcher] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// First launcher in `candidates` that is on PATH
fn find_tool(candidates: &[Launcher]) -> Option<(PathBuf, &'static [&'static str])> {
    candidates
        .iter()
        .find_map(|(name, args)| which::which(name).ok().map(|path| (path, *args)))
}

fn names(candidates: &[Launcher]) -> String {
    candidates
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Open `dir` in the platform file manager
pub fn open_directory(dir: &Path) -> anyhow::Result<()> {
    let Some((program, args)) = find_tool(OPENERS) else {
        bail!("no file manager launcher found (tried {})", names(OPENERS));
    };

    debug!(program = %program.display(), dir = %dir.display(), "opening output directory");
    Command::new(&program)
        .args(args)
        .arg(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to launch {}", program.display()))?;

    Ok(())
}

/// Put `text` on the system clipboard
pub fn copy_to_clipboard(text: &str) -> anyhow::Result<()> {
    let Some((program, args)) = find_tool(CLIPBOARD_TOOLS) else {
        bail!("no clipboard tool found (tried {})", names(CLIPBOARD_TOOLS));
    };

    debug!(program = %program.display(), "copying to clipboard");
    let mut child = Command::new(&program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to launch {}", program.display()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }

    let status = child.wait()?;
    if !status.success() {
        bail!("{} exited with {}", program.display(), status);
    }
    Ok(())
}
