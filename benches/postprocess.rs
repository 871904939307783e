// 该文件是 ds-yolo 项目的一部分。
// benches/postprocess.rs - 后处理性能测试
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

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ds_yolo::{OutputResolution, PostprocessConfig, Postprocessor};

/// 构造含 N 个检测的张量，检测成簇分布以触发 NMS
fn create_tensor(num_detections: usize) -> Vec<f32> {
  let mut data = vec![num_detections as f32];
  for i in 0..num_detections {
    let cluster = (i / 10) as f32;
    let jitter = (i % 10) as f32 * 2.0;
    data.extend_from_slice(&[
      (40.0 + cluster * 37.0) % 600.0 + jitter,
      (60.0 + cluster * 53.0) % 600.0 + jitter,
      48.0,
      64.0,
      0.3 + (i % 7) as f32 * 0.1,
      (i % 3) as f32,
    ]);
  }
  data
}

fn benchmark_postprocess(c: &mut Criterion) {
  let mut group = c.benchmark_group("postprocess");
  let postprocessor = Postprocessor::new(PostprocessConfig::default()).unwrap();
  let output = OutputResolution::new(1920, 1080);

  // 1000 为原始 6001 元素输出层的容量
  for num_detections in [10usize, 100, 1000] {
    let data = create_tensor(num_detections);
    group.bench_with_input(
      BenchmarkId::new("decode_nms_scale", num_detections),
      &data,
      |b, data| {
        b.iter(|| {
          postprocessor
            .postprocess(black_box(data), black_box(&output))
            .unwrap()
        })
      },
    );
  }

  group.finish();
}

criterion_group!(benches, benchmark_postprocess);
criterion_main!(benches);
