//! 分批器：把记录序列切成固定大小、保持顺序的批次

use crate::error::JobError;
use crate::models::{Batch, Record};

/// 计算批次数量
pub fn batch_count(record_count: usize, size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    record_count.div_ceil(size)
}

/// 切分记录
///
/// - `size == 0` 返回 `InvalidConfiguration`
/// - 空输入返回空列表
/// - 批次编号从 1 开始，最后一批可以不足 `size`
pub fn split(records: &[Record], size: usize) -> Result<Vec<Batch>, JobError> {
    if size == 0 {
        return Err(JobError::InvalidConfiguration(
            "批次大小必须为正整数".to_string(),
        ));
    }

    Ok(records
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            id: index + 1,
            records: chunk.to_vec(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    fn records(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| Record::new(vec![("sku".into(), FieldValue::Text(format!("SKU-{}", i)))], i))
            .collect()
    }

    #[test]
    fn test_zero_size_is_invalid() {
        assert!(matches!(
            split(&records(3), 0),
            Err(JobError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(split(&[], 10).unwrap().is_empty());
        assert_eq!(batch_count(0, 10), 0);
    }

    #[test]
    fn test_1200_by_500() {
        let batches = split(&records(1200), 500).unwrap();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![500, 500, 200]);
        assert_eq!(batches.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_partition_preserves_order() {
        let input = records(97);
        for size in [1, 2, 7, 10, 96, 97, 98, 500] {
            let batches = split(&input, size).unwrap();
            assert_eq!(batches.len(), batch_count(input.len(), size));
            assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));

            let flattened: Vec<Record> = batches.into_iter().flat_map(|b| b.records).collect();
            assert_eq!(flattened, input);
        }
    }
}
