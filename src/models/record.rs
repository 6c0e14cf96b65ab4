//! 记录与批次数据结构

use serde::{Deserialize, Serialize};
use std::fmt;

/// 标识字段名
pub const ID_FIELD: &str = "id";

/// 字段值：字符串或数字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// 从原始单元格文本推断类型
    ///
    /// 只有能无损还原的数字才按数字处理：`12.5`、`99`、`-3` 是数字，
    /// `007`、`1.50`、`1e3` 或超出精度的长整数保持原文，避免上传时被改写
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && n.to_string() == trimmed => FieldValue::Number(n),
            _ => FieldValue::Text(raw.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }

    /// 转为 JSON 值，整数值输出为 JSON 整数
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER => {
                serde_json::json!(*n as i64)
            }
            FieldValue::Number(n) => serde_json::json!(n),
            FieldValue::Text(s) => serde_json::json!(s),
        }
    }
}

/// f64 能精确表示的最大整数 (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// 单条记录
///
/// 字段按表头顺序保存，构造完成后不可修改
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// 创建记录
    ///
    /// 如果 `fields` 中没有非空的 `id` 字段，则使用 `position`（从 1 开始）生成标识，
    /// 并把 `id` 字段补到最前面
    pub fn new(fields: Vec<(String, FieldValue)>, position: usize) -> Self {
        Self::with_fallback_id(fields, position.to_string())
    }

    /// 创建记录，缺少 `id` 时使用 `fallback_id`
    pub fn with_fallback_id(fields: Vec<(String, FieldValue)>, fallback_id: String) -> Self {
        match explicit_id(&fields) {
            Some(id) => Self { id, fields },
            None => {
                let mut with_id = Vec::with_capacity(fields.len() + 1);
                with_id.push((ID_FIELD.to_string(), FieldValue::infer(&fallback_id)));
                with_id.extend(fields.into_iter().filter(|(name, _)| name != ID_FIELD));
                Self {
                    id: fallback_id,
                    fields: with_id,
                }
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 转为 JSON 对象
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// 字段中非空的 `id` 原文
pub fn explicit_id(fields: &[(String, FieldValue)]) -> Option<String> {
    fields
        .iter()
        .find(|(name, value)| name == ID_FIELD && !value.is_blank())
        .map(|(_, value)| value.to_string().trim().to_string())
}

/// 批次：一次上传提交的连续记录
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// 批次编号（从 1 开始）
    pub id: usize,
    pub records: Vec<Record>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 日志中使用的阶段标签
    pub fn phase_tag(&self) -> String {
        format!("BATCH-{}", self.id)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.records.iter().map(Record::to_json).collect())
    }
}
