use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(anyhow!("unknown theme: {other} (expected light or dark)")),
        }
    }
}

/// The theme preference, one word in `<data dir>/theme`.
#[derive(Debug)]
pub struct ThemeFile {
    path: PathBuf,
}

impl ThemeFile {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        Ok(Self {
            path: data_dir.join("theme"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable preferences fall back to light.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Theme> {
        if !self.path.exists() {
            debug!(file = %self.path.display(), "no stored theme; using default");
            return Ok(Theme::default());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        match raw.parse::<Theme>() {
            Ok(theme) => Ok(theme),
            Err(err) => {
                warn!(file = %self.path.display(), error = %err, "ignoring invalid stored theme");
                Ok(Theme::default())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn save(&self, theme: Theme) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        writeln!(temp, "{theme}")?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        info!(%theme, "saved theme preference");
        Ok(())
    }
}
