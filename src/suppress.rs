// 该文件是 ds-yolo 项目的一部分。
// src/suppress.rs - 按类别的非极大值抑制
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::collections::BTreeMap;

use tracing::debug;

use crate::tensor::Detection;

/// 按类别分组，类别内保持原有顺序
pub fn group_by_class<I>(detections: I) -> BTreeMap<u32, Vec<Detection>>
where
  I: IntoIterator<Item = Detection>,
{
  let mut groups: BTreeMap<u32, Vec<Detection>> = BTreeMap::new();
  for detection in detections {
    groups.entry(detection.class_id).or_default().push(detection);
  }
  groups
}

/// 置信度过滤后逐类别做 NMS，返回所有类别保留结果的拼接
pub fn suppress<I>(detections: I, conf_threshold: f32, nms_threshold: f32) -> Vec<Detection>
where
  I: IntoIterator<Item = Detection>,
{
  let mut survivors = Vec::new();

  for (class_id, members) in group_by_class(detections) {
    let total = members.len();
    let candidates: Vec<Detection> = members
      .into_iter()
      .filter(|det| det.confidence >= conf_threshold)
      .collect();
    let passed = candidates.len();

    let kept = nms(candidates, nms_threshold);
    debug!(
      "类别 {}: 共 {} 个检测，{} 个通过置信度阈值，NMS 后保留 {} 个",
      class_id,
      total,
      passed,
      kept.len()
    );
    survivors.extend(kept);
  }

  survivors
}

/// 贪心非极大值抑制
///
/// 每轮取出置信度最高的检测并保留，丢弃与其 IoU 超过 `nms_threshold` 的候选。
/// 不区分类别，调用方负责先按类别分组。
pub fn nms(mut candidates: Vec<Detection>, nms_threshold: f32) -> Vec<Detection> {
  // 按置信度降序排序
  candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut keep = Vec::with_capacity(candidates.len());
  while !candidates.is_empty() {
    let best = candidates.remove(0);
    // NaN 的 IoU 不满足 <=，候选同样被抑制
    candidates.retain(|det| iou(&best, det) <= nms_threshold);
    keep.push(best);
  }

  keep
}

/// 计算两个检测的 IoU
///
/// 几何量直接取存储的 `(x, y, width, height)`，不做中心点换算。
/// 交集宽高按像素网格包含计算（`+ 1`），面积则不加 1，
/// 因此极小的框可能得到负值或大于 1 的 IoU。
pub fn iou(a: &Detection, b: &Detection) -> f32 {
  let xx1 = a.center_x.max(b.center_x);
  let yy1 = a.center_y.max(b.center_y);
  let xx2 = (a.center_x + a.width).min(b.center_x + b.width);
  let yy2 = (a.center_y + a.height).min(b.center_y + b.height);

  let inter_w = (xx2 - xx1 + 1.0).max(0.0);
  let inter_h = (yy2 - yy1 + 1.0).max(0.0);
  let intersection = inter_w * inter_h;
  let union = a.width * a.height + b.width * b.height - intersection;

  intersection / union
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(cx: f32, cy: f32, w: f32, h: f32, confidence: f32, class_id: u32) -> Detection {
    Detection {
      center_x: cx,
      center_y: cy,
      width: w,
      height: h,
      confidence,
      class_id,
    }
  }

  #[test]
  fn test_iou_inclusive_pixel_convention() {
    let a = det(100.0, 100.0, 50.0, 50.0, 0.9, 0);
    let b = det(105.0, 105.0, 50.0, 50.0, 0.8, 0);
    // 交集 46 x 46 = 2116，并集 2500 + 2500 - 2116 = 2884
    let expected = 2116.0 / 2884.0;
    assert!((iou(&a, &b) - expected).abs() < 1e-6);
    assert!((iou(&b, &a) - expected).abs() < 1e-6);
  }

  #[test]
  fn test_iou_touching_boxes_overlap_by_one_pixel() {
    let a = det(0.0, 0.0, 10.0, 10.0, 0.9, 0);
    let b = det(10.0, 0.0, 10.0, 10.0, 0.9, 0);
    // 严格公式下为 0，包含像素约定下交集为 1 x 11
    let expected = 11.0 / (100.0 + 100.0 - 11.0);
    assert!((iou(&a, &b) - expected).abs() < 1e-6);
  }

  #[test]
  fn test_iou_disjoint_boxes_is_zero() {
    let a = det(0.0, 0.0, 10.0, 10.0, 0.9, 0);
    let b = det(50.0, 50.0, 10.0, 10.0, 0.9, 0);
    assert_eq!(iou(&a, &b), 0.0);
  }

  #[test]
  fn test_nms_keeps_highest_confidence_of_overlapping_pair() {
    let kept = nms(
      vec![
        det(105.0, 105.0, 50.0, 50.0, 0.8, 0),
        det(100.0, 100.0, 50.0, 50.0, 0.9, 0),
      ],
      0.45,
    );
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].confidence, 0.9);
  }

  #[test]
  fn test_nms_orders_by_descending_confidence() {
    let kept = nms(
      vec![
        det(0.0, 0.0, 10.0, 10.0, 0.3, 0),
        det(100.0, 100.0, 10.0, 10.0, 0.9, 0),
        det(200.0, 200.0, 10.0, 10.0, 0.6, 0),
      ],
      0.45,
    );
    let scores: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
    assert_eq!(scores, vec![0.9, 0.6, 0.3]);
  }

  #[test]
  fn test_nms_threshold_is_exclusive() {
    let a = det(100.0, 100.0, 50.0, 50.0, 0.9, 0);
    let b = det(105.0, 105.0, 50.0, 50.0, 0.8, 0);
    let overlap = iou(&a, &b);

    // IoU 恰好等于阈值时保留
    assert_eq!(nms(vec![a, b], overlap).len(), 2);
    assert_eq!(nms(vec![a, b], overlap - 1e-3).len(), 1);
  }

  #[test]
  fn test_nms_chain_is_greedy() {
    // a 抑制 b，b 与 c 重叠但 b 已被移除，因此 c 保留
    let a = det(0.0, 0.0, 50.0, 50.0, 0.9, 0);
    let b = det(20.0, 0.0, 50.0, 50.0, 0.8, 0);
    let c = det(40.0, 0.0, 50.0, 50.0, 0.7, 0);
    assert!(iou(&a, &b) > 0.45);
    assert!(iou(&b, &c) > 0.45);
    assert!(iou(&a, &c) <= 0.45);

    let kept = nms(vec![c, b, a], 0.45);
    let scores: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
    assert_eq!(scores, vec![0.9, 0.7]);
  }

  #[test]
  fn test_nms_empty() {
    assert!(nms(Vec::new(), 0.45).is_empty());
  }

  #[test]
  fn test_suppress_is_class_scoped() {
    let detections = vec![
      det(100.0, 100.0, 50.0, 50.0, 0.9, 0),
      det(105.0, 105.0, 50.0, 50.0, 0.8, 1),
    ];
    assert_eq!(suppress(detections, 0.5, 0.45).len(), 2);
  }

  #[test]
  fn test_suppress_applies_confidence_threshold() {
    let detections = vec![
      det(0.0, 0.0, 10.0, 10.0, 0.49, 0),
      det(100.0, 100.0, 10.0, 10.0, 0.5, 0),
      det(200.0, 200.0, 10.0, 10.0, f32::NAN, 2),
    ];
    let kept = suppress(detections, 0.5, 0.45);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].confidence, 0.5);
  }

  #[test]
  fn test_suppress_out_of_range_thresholds() {
    let detections = vec![
      det(100.0, 100.0, 50.0, 50.0, 0.9, 0),
      det(105.0, 105.0, 50.0, 50.0, 0.8, 0),
    ];
    assert!(suppress(detections.clone(), 1.5, 0.45).is_empty());
    assert_eq!(suppress(detections, -1.0, 2.0).len(), 2);
  }

  #[test]
  fn test_same_class_survivors_are_well_separated() {
    let mut detections = Vec::new();
    for i in 0..40u32 {
      let offset = (i % 8) as f32 * 7.0;
      detections.push(det(
        50.0 + offset,
        60.0 + offset * 0.5,
        40.0 + (i % 3) as f32 * 5.0,
        30.0,
        0.5 + (i as f32) * 0.01,
        i % 3,
      ));
    }

    let kept = suppress(detections.clone(), 0.6, 0.45);
    let passed = detections.iter().filter(|d| d.confidence >= 0.6).count();
    assert!(kept.len() <= passed);

    for (i, a) in kept.iter().enumerate() {
      for b in kept.iter().skip(i + 1) {
        if a.class_id == b.class_id {
          assert!(iou(a, b) <= 0.45);
        }
      }
    }
  }

  #[test]
  fn test_group_by_class_preserves_member_order() {
    let groups = group_by_class(vec![
      det(1.0, 0.0, 1.0, 1.0, 0.1, 2),
      det(2.0, 0.0, 1.0, 1.0, 0.2, 0),
      det(3.0, 0.0, 1.0, 1.0, 0.3, 2),
    ]);
    assert_eq!(groups.len(), 2);
    let xs: Vec<f32> = groups[&2].iter().map(|d| d.center_x).collect();
    assert_eq!(xs, vec![1.0, 3.0]);
  }
}
