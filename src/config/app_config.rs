// ==========================================
// DMC 发票系统 - 应用配置
// ==========================================
// 职责: 餐厅清单、供应商别名表、重复忽略表、管道开关
// 存储: <config_dir>/dmc-invoicing/config.json（缺失时使用内置默认值）
// ==========================================

use crate::domain::types::MissingColumnPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// 配置目录名
pub const CONFIG_DIR_NAME: &str = "dmc-invoicing";

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件格式错误 ({path}): {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// ==========================================
// RestaurantConfig - 餐厅（开票方）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantConfig {
    /// 餐厅名（同时是排期工作簿中的期望工作表名）
    pub name: String,

    /// 发票抬头地址块（多行）
    pub address: String,

    /// 工作表名拼写容错前缀（小写）
    #[serde(default)]
    pub sheet_prefixes: Vec<String>,
}

// ==========================================
// PipelineConfig - 校验管道开关
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 是否启用服务类型校验阶段
    #[serde(default)]
    pub strict_service_types: bool,

    /// 缺少 Remarks / Delivery 列时的作废口径
    #[serde(default)]
    pub missing_cancellation_column: MissingColumnPolicy,
}

// ==========================================
// AppConfig - 应用配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_restaurants")]
    pub restaurants: Vec<RestaurantConfig>,

    /// 原始拼写 → 规范展示名
    #[serde(default = "default_vendor_aliases")]
    pub vendor_aliases: BTreeMap<String, String>,

    /// 已知不同但文本相近的名称对（无序）
    #[serde(default = "default_ignored_duplicates")]
    pub ignored_duplicates: Vec<(String, String)>,

    /// 疑似重复的最大编辑距离
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: usize,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default = "default_rates_file_name")]
    pub rates_file_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            restaurants: default_restaurants(),
            vendor_aliases: default_vendor_aliases(),
            ignored_duplicates: default_ignored_duplicates(),
            duplicate_threshold: default_duplicate_threshold(),
            pipeline: PipelineConfig::default(),
            rates_file_name: default_rates_file_name(),
        }
    }
}

impl AppConfig {
    /// 默认配置文件路径
    ///
    /// # 返回
    /// - Some(PathBuf): <config_dir>/dmc-invoicing/config.json
    /// - None: 系统无配置目录
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// 从指定文件加载（文件不存在时返回默认配置）
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "配置文件不存在,使用默认配置");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })?;

        info!(
            path = %path.display(),
            restaurants = config.restaurants.len(),
            aliases = config.vendor_aliases.len(),
            "配置加载完成"
        );
        Ok(config)
    }

    /// 加载配置: 显式路径优先,否则默认路径,都没有则内置默认值
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from(path),
                None => Ok(Self::default()),
            },
        }
    }

    /// 按名称查找餐厅
    pub fn restaurant(&self, name: &str) -> Option<&RestaurantConfig> {
        self.restaurants.iter().find(|r| r.name == name)
    }
}

// ==========================================
// 内置默认值
// ==========================================

fn default_restaurants() -> Vec<RestaurantConfig> {
    vec![
        RestaurantConfig {
            name: "Dawat".to_string(),
            address: "Dawat\n58 Avenue du 8 mai 1945\n93150 Le Blanc Mesnil Paris, France."
                .to_string(),
            sheet_prefixes: vec!["d".to_string()],
        },
        RestaurantConfig {
            name: "WelcomeIndia".to_string(),
            address: "WelcomeIndia\nParis, France.".to_string(),
            sheet_prefixes: vec!["wel".to_string()],
        },
    ]
}

fn default_vendor_aliases() -> BTreeMap<String, String> {
    [
        ("Neemholidays", "Neem Holidays"),
        ("Star Our", "Star Tour"),
        ("Star", "Star Tour"),
        ("Ezxa", "Exza"),
        ("Tc", "TC"),
        ("Gtt", "GTT"),
        ("Chr", "CHR"),
        ("Gb Dmc", "GB DMC"),
        ("Gb Dmc Ltd.", "GB DMC"),
        ("Youngedsplorer", "Young Edsplorer"),
        ("Truvaiglobal", "Truvai"),
        ("Truvai Dmc", "Truvai"),
        ("Truvai Global", "Truvai"),
        ("Europe Incomign", "Europe Incoming"),
        ("Europeincoming", "Europe Incoming"),
        ("Afc Holidyays", "AFC Holidays"),
        ("Afc Holidays", "AFC Holidays"),
        ("G2 Travel", "G2 Travels"),
        ("G2Travel", "G2 Travels"),
        ("G2-Travel", "G2 Travels"),
        ("Holiday Carnival", "Holidays Carnival"),
        ("Europe Goodlife", "Europe Good Life"),
        ("Europegoodlife", "Europe Good Life"),
        ("Gateways Group Of Dmcs", "Gateways Group Of Dmc'S"),
        ("Gateways Dmc", "Gateways Group Of Dmc'S"),
        ("Gateways Group Of Dmc’S", "Gateways Group Of Dmc'S"),
        ("Deewan Holidays", "Dewan Holidays"),
        ("Dewan Travels", "Dewan Holidays"),
        ("Switru", "Switrus"),
        ("European Gatewyas", "European Gateways"),
        ("Lamour Voyage", "Lamour Voyages"),
        ("Lamondialetour", "La Mondiale"),
        ("Lamondiale Tour", "La Mondiale"),
        ("Lamondiale Tours", "La Mondiale"),
        ("Mahadevan Group", "Mahadevan"),
        ("Whats App", "WhatsApp"),
        ("Whatassp", "WhatsApp"),
        ("Whatsapp", "WhatsApp"),
    ]
    .into_iter()
    .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
    .collect()
}

fn default_ignored_duplicates() -> Vec<(String, String)> {
    vec![
        ("TC".to_string(), "Tcf".to_string()),
        ("Magi Holidays".to_string(), "Mango Holidays".to_string()),
        ("GTT".to_string(), "TC".to_string()),
    ]
}

fn default_duplicate_threshold() -> usize {
    2
}

fn default_rates_file_name() -> String {
    "Rates.xlsx".to_string()
}
