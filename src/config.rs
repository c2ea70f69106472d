//! 编辑器配置
//!
//! 从YAML文件加载，缺少的字段使用默认值。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{EditorError, Result};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "epubedit.yaml";

/// 打开书籍时默认显示的视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    /// 单章视图
    #[default]
    Chapter,
    /// 整书视图，章节之间用 `=== 标题 ===` 分隔
    FullBook,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 日志级别，可以是 `info`、`debug` 或完整的过滤表达式
    pub log_level: String,
    /// `show` 命令未指定章节时使用的视图
    pub default_view: ViewMode,
    /// 章节没有 `<title>` 时合成标题的前缀，生成 "{前缀} {序号}"
    pub fallback_title_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            default_view: ViewMode::Chapter,
            fallback_title_prefix: "Chapter".to_string(),
        }
    }
}

impl EditorConfig {
    /// 从指定文件加载配置
    ///
    /// # 返回值
    ///
    /// * `Result<Self>` - 文件无法读取或格式错误时返回 `EditorError::Config`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EditorError::Config(format!("无法读取配置文件: {}", e)))?;

        serde_yml::from_str(&content)
            .map_err(|e| EditorError::Config(format!("配置文件格式错误: {}", e)))
    }

    /// 加载配置；文件不存在或无法解析时使用默认配置
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), "{err}，使用默认配置");
                Self::default()
            }
        }
    }

    /// 把默认配置写入指定文件
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yml::to_string(&Self::default())
            .map_err(|e| EditorError::Config(format!("序列化配置失败: {}", e)))?;

        let content_with_header = format!(
            "# epubedit 配置文件\n# log_level: 日志级别（可被 RUST_LOG 覆盖）\n# default_view: chapter 或 full-book\n# fallback_title_prefix: 章节缺少标题时的前缀\n\n{}",
            yaml_content
        );

        fs::write(path.as_ref(), content_with_header)
            .map_err(|e| EditorError::Config(format!("写入配置文件失败: {}", e)))
    }

    /// 合成章节标题，`position` 从1开始
    pub fn synthesized_title(&self, position: usize) -> String {
        format!("{} {}", self.fallback_title_prefix, position)
    }
}
