// ==========================================
// DMC 发票系统 - 进度/告警事件发布
// ==========================================
// 职责: 定义单向进度回调 trait,引擎只依赖 trait
// 约束: 回调在工作线程同步调用,实现方不得阻塞
// ==========================================

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

// ==========================================
// 进度回调 Trait
// ==========================================

/// 进度/告警接收者
///
/// # 实现说明
/// - 命令行前台通过 `ChannelProgressSink` 接收并打印
/// - 测试使用 `CollectingProgressSink` 收集消息
pub trait ProgressSink: Send + Sync {
    /// 报告一条人类可读消息
    fn report(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// 收集型接收者（测试/汇总用）
#[derive(Debug, Clone, Default)]
pub struct CollectingProgressSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收集消息的快照
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl ProgressSink for CollectingProgressSink {
    fn report(&self, message: &str) {
        match self.messages.lock() {
            Ok(mut guard) => guard.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}

/// 通道型接收者: 无界通道发送,永不阻塞工作线程
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    sender: UnboundedSender<String>,
}

impl ChannelProgressSink {
    pub fn new(sender: UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn report(&self, message: &str) {
        if self.sender.send(message.to_string()).is_err() {
            tracing::debug!("ChannelProgressSink: 接收端已关闭,丢弃消息 - {}", message);
        }
    }
}

// ==========================================
// ProgressReporter - 引擎内部使用的包装
// ==========================================
// 每条消息同时写入 tracing（info）
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Option<Arc<dyn ProgressSink>>,
}

impl ProgressReporter {
    /// 创建带接收者的实例
    pub fn with_sink(sink: Arc<dyn ProgressSink>) -> Self {
        Self { inner: Some(sink) }
    }

    /// 创建空实例（仅写日志）
    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn report(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!(target: "dmc_invoicing::progress", "{}", message);
        if let Some(sink) = &self.inner {
            sink.report(message);
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("configured", &self.is_configured())
            .finish()
    }
}
