//! JSONL file-backed route ledger.

use std::path::PathBuf;

use {
    anyhow::{Context, Result},
    backchannel_common::Tool,
    serde::{Deserialize, Serialize},
    tokio::{fs, io::AsyncWriteExt},
    tracing::debug,
};

/// Prune trigger: rewrite the ledger once it grows past this many bytes.
const MAX_ROUTES_BYTES: u64 = 1024 * 1024;
/// Number of most-recent records kept by a prune rewrite.
const MAX_ROUTES_LINES: usize = 2000;

/// One ledger record, serialized as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// RFC 3339 creation timestamp.
    pub ts: String,
    pub channel: String,
    pub thread_ts: String,
    pub tool: Tool,
    pub session_id: String,
    #[serde(default)]
    pub turn_id: String,
    #[serde(default)]
    pub cwd: String,
}

impl RouteEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        channel: impl Into<String>,
        thread_ts: impl Into<String>,
        tool: Tool,
        session_id: impl Into<String>,
        turn_id: Option<String>,
        cwd: impl Into<String>,
    ) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            channel: channel.into(),
            thread_ts: thread_ts.into(),
            tool,
            session_id: session_id.into(),
            turn_id: turn_id.unwrap_or_default(),
            cwd: cwd.into(),
        }
    }
}

/// File-backed ledger. One JSON record per line, newest last.
pub struct RouteStore {
    path: PathBuf,
}

impl RouteStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create a store at the default `~/.config/backchannel/routes.jsonl`.
    pub fn default_path() -> Result<Self> {
        let home = dirs_next::home_dir().context("cannot determine home directory")?;
        Ok(Self::new(
            home.join(".config").join("backchannel").join("routes.jsonl"),
        ))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Append one record, then prune if the file has grown past the size
    /// bound.
    ///
    /// The prune rewrite is not atomic: an append racing a concurrent prune
    /// from another process can be lost. Accepted for a single-host tool;
    /// readers already tolerate torn trailing lines.
    pub async fn append(&self, entry: &RouteEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open {}", self.path.display()))?
            .write_all(line.as_bytes())
            .await?;

        if let Err(e) = self.prune_if_needed().await {
            debug!(path = %self.path.display(), error = %e, "route ledger prune failed");
        }
        Ok(())
    }

    /// Most recently appended entry matching `(channel, thread_ts)`.
    ///
    /// Scans from the newest record backward; malformed lines are skipped.
    /// Always rereads the file, so a find immediately after an append on the
    /// same process observes the appended entry.
    pub async fn find(&self, channel: &str, thread_ts: &str) -> Result<Option<RouteEntry>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        for line in data.lines().rev() {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(entry) = serde_json::from_str::<RouteEntry>(line) else {
                continue;
            };
            if entry.channel == channel && entry.thread_ts == thread_ts {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    async fn prune_if_needed(&self) -> Result<()> {
        let meta = fs::metadata(&self.path).await?;
        if meta.len() <= MAX_ROUTES_BYTES {
            return Ok(());
        }
        let data = fs::read_to_string(&self.path).await?;
        let lines: Vec<&str> = data.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(MAX_ROUTES_LINES);
        let mut kept = lines[start..].join("\n");
        kept.push('\n');
        fs::write(&self.path, kept.as_bytes()).await?;
        debug!(
            path = %self.path.display(),
            dropped = start,
            kept = lines.len() - start,
            "route ledger pruned"
        );
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::path::Path, tempfile::TempDir};

    fn make_store(dir: &Path) -> RouteStore {
        RouteStore::new(dir.join("routes.jsonl"))
    }

    fn make_entry(channel: &str, thread_ts: &str, session_id: &str) -> RouteEntry {
        RouteEntry::new(
            channel,
            thread_ts,
            Tool::Codex,
            session_id,
            None,
            "/tmp/project",
        )
    }

    #[tokio::test]
    async fn find_after_append_returns_entry() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());

        store
            .append(&make_entry("D123", "1700000000.000100", "sess-a"))
            .await
            .unwrap();

        let found = store.find("D123", "1700000000.000100").await.unwrap();
        let found = found.unwrap();
        assert_eq!(found.session_id, "sess-a");
        assert_eq!(found.tool, Tool::Codex);
    }

    #[tokio::test]
    async fn last_write_wins_for_same_key() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());

        store
            .append(&make_entry("D123", "1.000", "sess-old"))
            .await
            .unwrap();
        store
            .append(&make_entry("D123", "1.000", "sess-new"))
            .await
            .unwrap();

        let found = store.find("D123", "1.000").await.unwrap().unwrap();
        assert_eq!(found.session_id, "sess-new");
    }

    #[tokio::test]
    async fn find_on_missing_file_returns_none() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());
        assert!(store.find("D123", "1.000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_misses_unknown_key() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());
        store
            .append(&make_entry("D123", "1.000", "sess-a"))
            .await
            .unwrap();
        assert!(store.find("D123", "2.000").await.unwrap().is_none());
        assert!(store.find("D999", "1.000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());
        store
            .append(&make_entry("D123", "1.000", "sess-a"))
            .await
            .unwrap();

        // Simulate a torn trailing write from a concurrent process.
        let mut data = std::fs::read_to_string(store.path()).unwrap();
        data.push_str("{\"ts\":\"2026-01-01T00:00:0");
        std::fs::write(store.path(), data).unwrap();

        let found = store.find("D123", "1.000").await.unwrap().unwrap();
        assert_eq!(found.session_id, "sess-a");
    }

    #[tokio::test]
    async fn prune_keeps_most_recent_records() {
        let tmp = TempDir::new().unwrap();
        let store = make_store(tmp.path());

        // ~700-byte records: 2000 of them stay above the 1 MiB trigger, so
        // once the threshold is crossed every later append re-prunes and the
        // ledger settles at the keep-last bound.
        let padding = "x".repeat(550);
        for i in 0..2500 {
            let mut entry = make_entry("D123", &format!("{i}.000"), &format!("sess-{i}"));
            entry.cwd = format!("/tmp/{padding}/{i:06}");
            store.append(&entry).await.unwrap();
        }

        let data = std::fs::read_to_string(store.path()).unwrap();
        let count = data.lines().filter(|l| !l.trim().is_empty()).count();
        assert!(count <= 2000, "ledger holds {count} records after prune");

        // The newest record survives.
        let found = store.find("D123", "2499.000").await.unwrap();
        assert_eq!(found.unwrap().session_id, "sess-2499");
    }
}
