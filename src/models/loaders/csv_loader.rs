use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::record::{explicit_id, FieldValue, Record};

/// 把粘贴的表格文本解析为记录列表
///
/// - 第一行为表头，支持逗号或制表符分隔（从表格软件直接复制时为制表符）
/// - 字段数与表头不一致的行直接丢弃，不报错
/// - 全空行忽略
/// - 记录没有 `id` 时按行号（从 1 开始）生成，与其他行的 `id` 冲突时改用 `row-N`
/// - `id` 重复的行只保留第一行
pub fn parse(raw_text: &str) -> Vec<Record> {
    let text = raw_text.trim_start_matches('\u{feff}');
    let Some(first_line) = text.lines().find(|line| !line.trim().is_empty()) else {
        return Vec::new();
    };
    let delimiter = if first_line.contains('\t') { b'\t' } else { b',' };

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(str::to_string).collect(),
        Err(e) => {
            debug!("表头解析失败: {}", e);
            return Vec::new();
        }
    };

    let mut rows: Vec<Vec<(String, FieldValue)>> = Vec::new();
    let mut taken_ids: HashSet<String> = HashSet::new();
    let mut dropped = 0usize;

    for row in reader.records() {
        let row: StringRecord = match row {
            Ok(row) => row,
            Err(e) => {
                debug!("跳过无法解析的行: {}", e);
                dropped += 1;
                continue;
            }
        };
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if row.len() != headers.len() {
            dropped += 1;
            continue;
        }

        let fields: Vec<(String, FieldValue)> = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.clone(), FieldValue::infer(cell)))
            .collect();
        if let Some(id) = explicit_id(&fields) {
            if !taken_ids.insert(id.clone()) {
                warn!("⚠️ 丢弃重复 id 的行: {}", id);
                continue;
            }
        }
        rows.push(fields);
    }

    if dropped > 0 {
        debug!("丢弃 {} 行字段数不匹配的数据", dropped);
    }

    rows.into_iter()
        .enumerate()
        .map(|(index, fields)| {
            let fallback = if explicit_id(&fields).is_some() {
                String::new()
            } else {
                synthesize_id(index + 1, &mut taken_ids)
            };
            Record::with_fallback_id(fields, fallback)
        })
        .collect()
}

/// 按行号生成标识，与已有标识冲突时改用 `row-N`
fn synthesize_id(position: usize, taken_ids: &mut HashSet<String>) -> String {
    let mut candidate = position.to_string();
    let mut suffix = 1;
    while taken_ids.contains(&candidate) {
        candidate = if suffix == 1 {
            format!("row-{}", position)
        } else {
            format!("row-{}-{}", position, suffix)
        };
        suffix += 1;
    }
    taken_ids.insert(candidate.clone());
    candidate
}
