//! 对话历史钩子
//!
//! 响应组装完成后在后台调用 `record(request, response)`；钩子自身失败只记日志，不影响已生成的响应。
//! FileHistory 用 tokio::fs 把条目写入单个 JSON 数组文件（超出上限时丢弃最旧条目），不阻塞 async 上下文。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::fs;
use tokio::sync::Mutex;

/// 历史钩子 trait
#[async_trait]
pub trait HistoryHook: Send + Sync {
    async fn record(&self, request: &Value, response: &Value) -> anyhow::Result<()>;
}

/// 不记录任何内容（history.enabled = false 时使用）
#[derive(Debug, Default)]
pub struct NoopHistory;

#[async_trait]
impl HistoryHook for NoopHistory {
    async fn record(&self, _request: &Value, _response: &Value) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 单文件 JSON 历史
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    max_entries: usize,
    write_lock: Mutex<()>,
}

impl FileHistory {
    pub fn new(path: impl AsRef<Path>, max_entries: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_entries: max_entries.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// 读取全部条目；文件不存在时返回空 Vec
    pub async fn load(&self) -> anyhow::Result<Vec<Value>> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    async fn save(&self, entries: &[Value]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?).await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryHook for FileHistory {
    async fn record(&self, request: &Value, response: &Value) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.push(json!({
            "recorded_at": chrono::Utc::now().to_rfc3339(),
            "request": request,
            "response": response,
        }));
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }
        self.save(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_appends_entries() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistory::new(dir.path().join("nested/history.json"), 10);
        history
            .record(&json!({"query": "first"}), &json!({"status": "success"}))
            .await
            .unwrap();
        history
            .record(&json!({"query": "second"}), &json!({"status": "success"}))
            .await
            .unwrap();

        let entries = history.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["request"]["query"], "first");
        assert_eq!(entries[1]["response"]["status"], "success");
        assert!(entries[1]["recorded_at"].is_string());
    }

    #[tokio::test]
    async fn test_max_entries_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistory::new(dir.path().join("history.json"), 2);
        for i in 0..4 {
            history.record(&json!({"n": i}), &json!({})).await.unwrap();
        }
        let entries = history.load().await.unwrap();
        let ns: Vec<i64> = entries
            .iter()
            .map(|e| e["request"]["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ns, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_concurrent_records_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let history = std::sync::Arc::new(FileHistory::new(dir.path().join("history.json"), 50));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let history = history.clone();
                tokio::spawn(async move { history.record(&json!({"n": i}), &json!({})).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(history.load().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();
        let history = FileHistory::new(&path, 5);
        assert!(history.record(&json!({}), &json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = FileHistory::new(dir.path().join("none.json"), 5);
        assert!(history.load().await.unwrap().is_empty());
        assert!(NoopHistory.record(&json!({}), &json!({})).await.is_ok());
    }
}
