// ==========================================
// DMC 发票系统 - 配置层
// ==========================================
// 职责: 应用配置加载（JSON 文件 + 内置默认值）
// 说明: 别名表/忽略表以值的形式注入规范化器与查重器
// ==========================================

pub mod app_config;

// 重导出核心配置类型
pub use app_config::{AppConfig, ConfigError, PipelineConfig, RestaurantConfig};
