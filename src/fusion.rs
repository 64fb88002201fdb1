//! Reconciles the three detectors' independent box proposals via
//! mutual-best IoU matching.

use crate::geometry::{iou, Box3, PointCluster};

/// A post-fusion detection: a [`Box3`] plus whichever DBSCAN cluster (if
/// any) it carries forward. Yolo-sourced and Yolo-overwritten entries carry
/// an empty cluster.
#[derive(Debug, Clone, Default)]
pub struct FusedDetection {
    pub bbox: Box3,
    pub cluster: PointCluster,
}

/// For every element of `a`, finds its best (highest-IoU) match in `b`
/// subject to `threshold`, then checks that match's own best match in `a`
/// is the original element and also clears `threshold`. Returns the
/// resulting `(a_index, b_index)` mutual-best pairs.
fn mutual_best_matches(a: &[Box3], b: &[Box3], threshold: f32) -> Vec<(usize, usize)> {
    let best_in = |from: &[Box3], to: &[Box3], i: usize| -> Option<(usize, f32)> {
        to.iter()
            .enumerate()
            .map(|(j, bb)| (j, iou(&from[i], bb)))
            .filter(|(_, v)| *v > 0.0)
            .max_by(|x, y| x.1.partial_cmp(&y.1).unwrap())
    };

    let mut pairs = Vec::new();
    for (i, _) in a.iter().enumerate() {
        let Some((j, iou_ab)) = best_in(a, b, i) else {
            continue;
        };
        if iou_ab <= threshold {
            continue;
        }
        let Some((back_i, iou_ba)) = best_in(b, a, j) else {
            continue;
        };
        if back_i == i && iou_ba > threshold {
            pairs.push((i, j));
        }
    }
    pairs
}

/// Pass 1: mutual-best fusion of UV boxes against DBSCAN boxes (with their
/// clusters). Emits one [`FusedDetection`] per mutual-best pair; unmatched
/// boxes from either source produce no output.
pub fn fuse_uv_dbscan(uv: &[Box3], dbscan: &[(Box3, PointCluster)], threshold: f32) -> Vec<FusedDetection> {
    let dbscan_boxes: Vec<Box3> = dbscan.iter().map(|(b, _)| *b).collect();
    let pairs = mutual_best_matches(uv, &dbscan_boxes, threshold);

    pairs
        .into_iter()
        .map(|(u_idx, d_idx)| {
            let (d_box, cluster) = &dbscan[d_idx];
            let union = uv[u_idx].conservative_union(d_box);
            FusedDetection {
                bbox: union.with_velocity(0.0, 0.0).with_dynamic(false),
                cluster: cluster.clone(),
            }
        })
        .collect()
}

/// Pass 2: overlays Yolo boxes (already `is_dynamic = true`) on top of the
/// pass-1 `filtered` list.
pub fn overlay_yolo(
    filtered: &mut Vec<FusedDetection>,
    yolo: &[Box3],
    threshold: f32,
    yolo_overwrite_distance: f32,
    ego: (f32, f32, f32),
) {
    let filtered_boxes: Vec<Box3> = filtered.iter().map(|f| f.bbox).collect();
    let pairs = mutual_best_matches(yolo, &filtered_boxes, threshold);
    let matched_yolo: std::collections::HashSet<usize> = pairs.iter().map(|(y, _)| *y).collect();

    for (y_idx, f_idx) in &pairs {
        let union = yolo[*y_idx].conservative_union(&filtered[*f_idx].bbox);
        filtered[*f_idx] = FusedDetection {
            bbox: union.with_dynamic(true),
            cluster: PointCluster::default(),
        };
    }

    for (y_idx, y_box) in yolo.iter().enumerate() {
        if matched_yolo.contains(&y_idx) {
            continue;
        }
        let dist = y_box.distance_to(ego.0, ego.1, ego.2);
        if dist > yolo_overwrite_distance {
            filtered.push(FusedDetection {
                bbox: *y_box,
                cluster: PointCluster::default(),
            });
        }
        // else: near-field, unmatched Yolo box is discarded as a likely
        // false positive.
    }
}
