use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Result, ensure};

/// 邻居图：图片索引到其邻居索引列表的有序映射
///
/// 图片索引为 [0, n_images) 内的连续整数，邻居列表的顺序决定了
/// 匹配结果的顺序
pub type NeighborMap = Vec<Vec<usize>>;

/// 从 JSON 文件读取邻居图并校验索引范围
pub fn read_neighbors<P: AsRef<Path>>(path: P) -> Result<NeighborMap> {
    let file = File::open(path.as_ref())?;
    let neighbors: NeighborMap = serde_json::from_reader(BufReader::new(file))?;
    validate_neighbors(&neighbors)?;
    Ok(neighbors)
}

/// 将邻居图保存为 JSON 文件
pub fn save_neighbors<P: AsRef<Path>>(path: P, neighbors: &NeighborMap) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer(BufWriter::new(file), neighbors)?;
    Ok(())
}

/// 校验所有邻居索引都落在 [0, n_images) 范围内
pub fn validate_neighbors(neighbors: &NeighborMap) -> Result<()> {
    let n_images = neighbors.len();
    for (idx, ng_idx_list) in neighbors.iter().enumerate() {
        for &ng_idx in ng_idx_list {
            ensure!(
                ng_idx < n_images,
                "图片 {} 的邻居 {} 超出范围 [0, {})",
                idx,
                ng_idx,
                n_images
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_neighbors_ok() {
        let neighbors = vec![vec![1, 2], vec![0], vec![1, 0]];
        assert!(validate_neighbors(&neighbors).is_ok());
    }

    #[test]
    fn test_validate_neighbors_out_of_range() {
        let neighbors = vec![vec![1], vec![2]];
        assert!(validate_neighbors(&neighbors).is_err());
    }

    #[test]
    fn test_neighbors_json_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("neighbors.json");
        let neighbors = vec![vec![1, 2], vec![0, 2], vec![1, 0]];
        save_neighbors(&path, &neighbors).unwrap();
        assert_eq!(read_neighbors(&path).unwrap(), neighbors);
    }
}
