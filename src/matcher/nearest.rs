use anyhow::{Result, ensure};
use ndarray::Array2;

use super::{LineMatcher, PairMatches};
use crate::extractor::DescInfo;

/// 基于描述子 L2 距离的最近邻匹配器
///
/// 对第一张图的每条线段，在第二张图中寻找最近和次近的描述子，
/// 通过比例测试过滤歧义匹配，最后按距离保留前 topk 对
pub struct NearestNeighborMatcher {
    topk: usize,
    ratio: f32,
}

impl NearestNeighborMatcher {
    pub fn new(topk: usize, ratio: f32) -> Self {
        Self { topk, ratio }
    }
}

impl Default for NearestNeighborMatcher {
    fn default() -> Self {
        Self::new(10, 0.7)
    }
}

impl LineMatcher for NearestNeighborMatcher {
    fn module_name(&self) -> String {
        format!("nn_l2_r{:.2}", self.ratio)
    }

    fn match_pair(&self, descinfo1: &DescInfo, descinfo2: &DescInfo) -> Result<PairMatches> {
        ensure!(
            descinfo1.ncols() == descinfo2.ncols(),
            "描述子维度不匹配: {} != {}",
            descinfo1.ncols(),
            descinfo2.ncols()
        );

        let mut candidates = vec![];
        for (i, d1) in descinfo1.rows().into_iter().enumerate() {
            let (mut best, mut second) = (f32::MAX, f32::MAX);
            let mut best_j = 0;
            for (j, d2) in descinfo2.rows().into_iter().enumerate() {
                let dist = d1.iter().zip(d2.iter()).map(|(a, b)| (a - b) * (a - b)).sum::<f32>();
                if dist < best {
                    second = best;
                    best = dist;
                    best_j = j;
                } else if dist < second {
                    second = dist;
                }
            }
            // 次近邻不存在时无法做比例测试，按歧义匹配丢弃
            if second != f32::MAX && best < self.ratio * self.ratio * second {
                candidates.push((best, i as u32, best_j as u32));
            }
        }

        candidates.sort_unstable_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        candidates.truncate(self.topk);

        let mut data = Vec::with_capacity(candidates.len() * 2);
        for (_, i, j) in &candidates {
            data.push(*i);
            data.push(*j);
        }
        Ok(Array2::from_shape_vec((candidates.len(), 2), data)?)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_module_name_encodes_ratio() {
        assert_eq!(NearestNeighborMatcher::new(10, 0.7).module_name(), "nn_l2_r0.70");
        assert_eq!(NearestNeighborMatcher::new(10, 0.9).module_name(), "nn_l2_r0.90");
    }

    #[test]
    fn test_match_pair_dimension_mismatch() {
        let matcher = NearestNeighborMatcher::default();
        let d1 = Array2::zeros((2, 4));
        let d2 = Array2::zeros((2, 8));
        assert!(matcher.match_pair(&d1, &d2).is_err());
    }

    #[test]
    fn test_match_pair_finds_nearest() {
        let matcher = NearestNeighborMatcher::default();
        let d1 = array![[0.0, 0.0], [10.0, 10.0]];
        // 每条线段都有一个明显的最近邻，次近邻距离很远
        let d2 = array![[10.0, 10.1], [0.1, 0.0], [100.0, 100.0]];
        let matches = matcher.match_pair(&d1, &d2).unwrap();
        assert_eq!(matches.nrows(), 2);
        // 结果按距离升序排列
        assert_eq!(matches.row(0).to_vec(), vec![0, 1]);
        assert_eq!(matches.row(1).to_vec(), vec![1, 0]);
    }

    #[test]
    fn test_match_pair_ratio_test_rejects_ambiguous() {
        let matcher = NearestNeighborMatcher::default();
        let d1 = array![[0.0, 0.0]];
        // 最近和次近的距离几乎相同，比例测试不通过
        let d2 = array![[1.0, 0.0], [0.0, 1.0]];
        let matches = matcher.match_pair(&d1, &d2).unwrap();
        assert_eq!(matches.nrows(), 0);
    }

    #[test]
    fn test_match_pair_single_candidate_rejected() {
        let matcher = NearestNeighborMatcher::default();
        let d1 = array![[0.0, 0.0]];
        let d2 = array![[0.0, 0.0]];
        // 只有一个候选，无法做比例测试
        let matches = matcher.match_pair(&d1, &d2).unwrap();
        assert_eq!(matches.nrows(), 0);
    }

    #[test]
    fn test_match_pair_topk_truncation() {
        let matcher = NearestNeighborMatcher::new(2, 0.7);
        let d1 = array![[0.0, 0.0], [10.0, 10.0], [20.0, 20.0]];
        let d2 = array![[0.0, 0.1], [10.0, 10.1], [20.0, 20.1], [500.0, 500.0]];
        let matches = matcher.match_pair(&d1, &d2).unwrap();
        assert_eq!(matches.nrows(), 2);
    }

    #[test]
    fn test_match_pair_empty_inputs() {
        let matcher = NearestNeighborMatcher::default();
        let d1 = Array2::zeros((0, 4));
        let d2 = Array2::zeros((3, 4));
        let matches = matcher.match_pair(&d1, &d2).unwrap();
        assert_eq!(matches.shape(), &[0, 2]);

        let d1 = Array2::zeros((3, 4));
        let d2 = Array2::zeros((0, 4));
        let matches = matcher.match_pair(&d1, &d2).unwrap();
        assert_eq!(matches.shape(), &[0, 2]);
    }
}
