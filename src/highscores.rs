//! Persist the best score to disk (XDG config or ~/.config/clusterdrop).

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

const FILENAME: &str = "highscore";

/// Returns the path to the best score file (config dir / clusterdrop / highscore).
fn config_path() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("clusterdrop").join(FILENAME)
}

/// Load the best score. 0 on missing file or parse error.
pub fn load_high_score() -> u32 {
    read_score(&config_path())
}

/// Save the best score. Creates the config directory if needed.
pub fn save_high_score(score: u32) -> Result<()> {
    write_score(&config_path(), score)
}

fn read_score(path: &Path) -> u32 {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.lines().next().and_then(|l| l.trim().parse().ok()))
        .unwrap_or(0)
}

fn write_score(path: &Path, score: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{score}\n"))?;
    log::debug!("saved best score {score} to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clusterdrop-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_score_survives_write_and_read() {
        let dir = scratch_dir("roundtrip");
        let path = dir.join("nested").join(FILENAME);
        write_score(&path, 4200).unwrap();
        assert_eq!(read_score(&path), 4200);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_or_garbage_reads_zero() {
        let dir = scratch_dir("garbage");
        let path = dir.join(FILENAME);
        assert_eq!(read_score(&path), 0);
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, "not a number").unwrap();
        assert_eq!(read_score(&path), 0);
        let _ = fs::remove_dir_all(&dir);
    }
}
