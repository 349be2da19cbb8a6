//! YOLO object detection
//!
//! Runs a YOLOv8-family ONNX model over device frames and returns the game
//! elements it finds. Preprocessing letterboxes the frame to the model's
//! square input; postprocessing filters by confidence, applies per-class
//! greedy NMS and maps boxes back to frame pixel coordinates.

use std::path::PathBuf;

use image::RgbImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::VisionError;
use crate::config::settings::ModelSettings;

/// One recognized game element. Produced fresh each frame, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box `(x1, y1, x2, y2)` in frame pixels, `x1 <= x2`, `y1 <= y2`.
    pub bbox: (i32, i32, i32, i32),
    /// Box center, derived from `bbox`.
    pub center: (i32, i32),
}

impl Detection {
    pub fn new(
        class_id: usize,
        class_name: impl Into<String>,
        confidence: f32,
        bbox: (i32, i32, i32, i32),
    ) -> Self {
        let (x1, y1, x2, y2) = bbox;
        Self {
            class_id,
            class_name: class_name.into(),
            confidence,
            bbox,
            center: ((x1 + x2) / 2, (y1 + y2) / 2),
        }
    }
}

/// First detection with the given class name, in model output order.
pub fn first_of_class<'a>(detections: &'a [Detection], class_name: &str) -> Option<&'a Detection> {
    detections.iter().find(|det| det.class_name == class_name)
}

/// Whether any detection carries the given class name.
pub fn has_class(detections: &[Detection], class_name: &str) -> bool {
    detections.iter().any(|det| det.class_name == class_name)
}

/// Detection whose center is closest to `point`.
pub fn nearest_to<'a>(detections: &'a [Detection], point: (i32, i32)) -> Option<&'a Detection> {
    detections.iter().min_by_key(|det| {
        let dx = (det.center.0 - point.0) as i64;
        let dy = (det.center.1 - point.1) as i64;
        dx * dx + dy * dy
    })
}

/// Candidate box before NMS, in letterboxed model space.
#[derive(Debug, Clone)]
struct RawDetection {
    bbox: [f32; 4],
    confidence: f32,
    class_id: usize,
}

/// YOLO detector over an ONNX Runtime session.
pub struct YoloDetector {
    model_path: PathBuf,
    conf_threshold: f32,
    iou_threshold: f32,
    input_size: u32,
    class_names: Vec<String>,
    session: Option<Session>,
}

impl YoloDetector {
    /// Build an unloaded detector; call [`load`](Self::load) before detecting.
    pub fn new(
        model_path: impl Into<PathBuf>,
        conf_threshold: f32,
        iou_threshold: f32,
        input_size: u32,
        class_names: Vec<String>,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            conf_threshold,
            iou_threshold,
            input_size,
            class_names,
            session: None,
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self::new(
            settings.path.clone(),
            settings.conf_threshold,
            settings.iou_threshold,
            settings.input_size,
            settings.class_names.clone(),
        )
    }

    /// Load the model artifact. Fails if the file is missing or is not an
    /// ONNX export.
    pub fn load(&mut self) -> Result<(), VisionError> {
        match self.model_path.extension().and_then(|e| e.to_str()) {
            Some("onnx") => {}
            other => {
                return Err(VisionError::UnsupportedModel(format!(
                    "{} (expected .onnx, got {:?})",
                    self.model_path.display(),
                    other.unwrap_or("<none>")
                )));
            }
        }
        if !self.model_path.exists() {
            return Err(VisionError::ModelLoad(format!(
                "model file not found: {}",
                self.model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| VisionError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::ModelLoad(e.to_string()))?
            .commit_from_file(&self.model_path)
            .map_err(|e| VisionError::ModelLoad(e.to_string()))?;

        self.session = Some(session);
        log::info!(
            "model loaded: {} ({} classes)",
            self.model_path.display(),
            self.class_names.len()
        );
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn class_name_for(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    /// Detect game elements in a frame.
    ///
    /// Results are filtered to confidence >= the configured threshold and,
    /// when `class_filter` is given, to class names in that set.
    pub fn detect(
        &mut self,
        frame: &RgbImage,
        class_filter: Option<&[String]>,
    ) -> Result<Vec<Detection>, VisionError> {
        if self.session.is_none() {
            return Err(VisionError::ModelNotLoaded);
        }

        let (orig_w, orig_h) = frame.dimensions();
        let (tensor, pad_x, pad_y, scale) = self.preprocess(frame);

        let input = Tensor::from_array(tensor).map_err(|e| VisionError::Inference(e.to_string()))?;
        let output = {
            let session = self.session.as_mut().ok_or(VisionError::ModelNotLoaded)?;
            let outputs = session
                .run(ort::inputs![input])
                .map_err(|e| VisionError::Inference(e.to_string()))?;
            outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e| VisionError::Inference(e.to_string()))?
                .to_owned()
        };

        let mut detections =
            self.postprocess(&output.view(), orig_w, orig_h, pad_x, pad_y, scale)?;

        if let Some(filter) = class_filter {
            detections.retain(|det| filter.iter().any(|name| *name == det.class_name));
        }

        Ok(detections)
    }

    /// Resize + letterbox + normalize to an NCHW tensor.
    fn preprocess(&self, frame: &RgbImage) -> (Array4<f32>, f32, f32, f32) {
        let sz = self.input_size;
        let (ow, oh) = (frame.width() as f32, frame.height() as f32);
        let scale = (sz as f32 / ow).min(sz as f32 / oh);
        let nw = (ow * scale).round().max(1.0) as u32;
        let nh = (oh * scale).round().max(1.0) as u32;
        let pad_x = (sz - nw) as f32 / 2.0;
        let pad_y = (sz - nh) as f32 / 2.0;

        let resized =
            image::imageops::resize(frame, nw, nh, image::imageops::FilterType::Triangle);

        let mut canvas = RgbImage::from_pixel(sz, sz, image::Rgb([114, 114, 114]));
        image::imageops::overlay(&mut canvas, &resized, pad_x.round() as i64, pad_y.round() as i64);

        let mut tensor = Array4::<f32>::zeros((1, 3, sz as usize, sz as usize));
        for (x, y, pixel) in canvas.enumerate_pixels() {
            tensor[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        (tensor, pad_x, pad_y, scale)
    }

    /// Decode `[1, 4 + classes, proposals]` output into pixel-space
    /// detections: confidence filter, per-class NMS, letterbox undo.
    fn postprocess(
        &self,
        output: &ndarray::ArrayViewD<f32>,
        orig_w: u32,
        orig_h: u32,
        pad_x: f32,
        pad_y: f32,
        scale: f32,
    ) -> Result<Vec<Detection>, VisionError> {
        let shape = output.shape();
        if shape.len() != 3 || shape[1] < 5 {
            return Err(VisionError::BadOutput(format!(
                "unexpected output shape {shape:?}"
            )));
        }
        let num_classes = shape[1] - 4;
        let num_preds = shape[2];

        let mut raw = Vec::new();
        for i in 0..num_preds {
            let cx = output[[0, 0, i]];
            let cy = output[[0, 1, i]];
            let w = output[[0, 2, i]];
            let h = output[[0, 3, i]];

            let mut best_score = 0.0f32;
            let mut best_class = 0usize;
            for c in 0..num_classes {
                let score = output[[0, 4 + c, i]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < self.conf_threshold {
                continue;
            }

            raw.push(RawDetection {
                bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
                confidence: best_score,
                class_id: best_class,
            });
        }

        let kept = nms(&raw, self.iou_threshold);

        Ok(kept
            .into_iter()
            .map(|i| {
                let det = &raw[i];
                let bbox = undo_letterbox(det.bbox, pad_x, pad_y, scale, orig_w, orig_h);
                Detection::new(det.class_id, self.class_name_for(det.class_id), det.confidence, bbox)
            })
            .collect())
    }
}

/// Map a letterboxed-space box back to frame pixels, clamped to the frame.
fn undo_letterbox(
    bbox: [f32; 4],
    pad_x: f32,
    pad_y: f32,
    scale: f32,
    orig_w: u32,
    orig_h: u32,
) -> (i32, i32, i32, i32) {
    let max_x = orig_w.saturating_sub(1) as f32;
    let max_y = orig_h.saturating_sub(1) as f32;
    let x1 = ((bbox[0] - pad_x) / scale).clamp(0.0, max_x);
    let y1 = ((bbox[1] - pad_y) / scale).clamp(0.0, max_y);
    let x2 = ((bbox[2] - pad_x) / scale).clamp(0.0, max_x);
    let y2 = ((bbox[3] - pad_y) / scale).clamp(0.0, max_y);
    (x1 as i32, y1 as i32, x2 as i32, y2 as i32)
}

/// Greedy per-class non-maximum suppression; returns indices to keep,
/// highest confidence first.
fn nms(detections: &[RawDetection], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| {
        detections[b]
            .confidence
            .partial_cmp(&detections[a].confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for &i in &order {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for &j in &order {
            if suppressed[j] || i == j {
                continue;
            }
            if detections[i].class_id == detections[j].class_id
                && iou(&detections[i].bbox, &detections[j].bbox) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
    }
    keep
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - inter;

    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    fn detector(conf: f32, iou_thr: f32, names: &[&str]) -> YoloDetector {
        YoloDetector::new(
            "models/test.onnx",
            conf,
            iou_thr,
            640,
            names.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Output tensor `[1, 4+classes, n]` from (cx, cy, w, h, scores...) rows.
    fn output_tensor(classes: usize, rows: &[Vec<f32>]) -> ArrayD<f32> {
        let mut arr = ArrayD::zeros(vec![1, 4 + classes, rows.len()]);
        for (i, row) in rows.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                arr[[0, c, i]] = v;
            }
        }
        arr
    }

    #[test]
    fn test_detection_center() {
        let det = Detection::new(0, "start_button", 0.95, (100, 200, 300, 400));
        assert_eq!(det.center, (200, 300));
    }

    #[test]
    fn test_iou_values() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(iou(&a, &a), 1.0);

        let disjoint = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(iou(&a, &disjoint), 0.0);

        // Half-overlapping boxes: inter 50, union 150
        let b = [0.0, 5.0, 10.0, 15.0];
        let value = iou(&a, &b);
        assert!((value - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class_only() {
        let dets = vec![
            RawDetection {
                bbox: [0.0, 0.0, 10.0, 10.0],
                confidence: 0.9,
                class_id: 0,
            },
            RawDetection {
                bbox: [1.0, 1.0, 11.0, 11.0],
                confidence: 0.8,
                class_id: 0,
            },
            RawDetection {
                bbox: [1.0, 1.0, 11.0, 11.0],
                confidence: 0.7,
                class_id: 1,
            },
        ];
        let kept = nms(&dets, 0.45);
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn test_undo_letterbox_identity() {
        let bbox = undo_letterbox([10.0, 20.0, 50.0, 60.0], 0.0, 0.0, 1.0, 640, 640);
        assert_eq!(bbox, (10, 20, 50, 60));
    }

    #[test]
    fn test_undo_letterbox_scaled_and_clamped() {
        // Half-scale with a 40px horizontal pad
        let bbox = undo_letterbox([60.0, 10.0, 1000.0, 50.0], 40.0, 0.0, 0.5, 200, 100);
        assert_eq!(bbox, (40, 20, 199, 99));
    }

    #[test]
    fn test_detect_requires_load() {
        let mut det = detector(0.25, 0.45, &["enemy"]);
        assert!(!det.is_loaded());
        let frame = RgbImage::new(64, 64);
        assert!(matches!(
            det.detect(&frame, None),
            Err(VisionError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_load_missing_model() {
        let mut det = detector(0.25, 0.45, &[]);
        assert!(matches!(det.load(), Err(VisionError::ModelLoad(_))));
    }

    #[test]
    fn test_load_rejects_non_onnx() {
        let mut det = YoloDetector::new("models/best.pt", 0.25, 0.45, 640, Vec::new());
        assert!(matches!(
            det.load(),
            Err(VisionError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_postprocess_confidence_filter_and_names() {
        let det = detector(0.5, 0.45, &["enemy", "start_button"]);
        let output = output_tensor(
            2,
            &[
                // cx, cy, w, h, score(enemy), score(start_button)
                vec![100.0, 100.0, 40.0, 40.0, 0.9, 0.1],
                vec![300.0, 300.0, 40.0, 40.0, 0.3, 0.2],
            ],
        );
        let dets = det
            .postprocess(&output.view(), 640, 640, 0.0, 0.0, 1.0)
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_name, "enemy");
        assert_eq!(dets[0].bbox, (80, 80, 120, 120));
        assert_eq!(dets[0].center, (100, 100));
    }

    #[test]
    fn test_postprocess_class_name_fallback() {
        let det = detector(0.5, 0.45, &[]);
        let output = output_tensor(1, &[vec![50.0, 50.0, 20.0, 20.0, 0.8]]);
        let dets = det
            .postprocess(&output.view(), 640, 640, 0.0, 0.0, 1.0)
            .unwrap();
        assert_eq!(dets[0].class_name, "class_0");
    }

    #[test]
    fn test_postprocess_rejects_bad_shape() {
        let det = detector(0.5, 0.45, &[]);
        let output: ArrayD<f32> = ArrayD::zeros(vec![1, 3]);
        assert!(matches!(
            det.postprocess(&output.view(), 640, 640, 0.0, 0.0, 1.0),
            Err(VisionError::BadOutput(_))
        ));
    }

    #[test]
    fn test_detection_queries() {
        let dets = vec![
            Detection::new(0, "enemy", 0.9, (0, 0, 10, 10)),
            Detection::new(1, "skill_button", 0.8, (100, 100, 120, 120)),
            Detection::new(0, "enemy", 0.7, (200, 200, 210, 210)),
        ];

        assert!(has_class(&dets, "enemy"));
        assert!(!has_class(&dets, "claim_button"));
        assert_eq!(first_of_class(&dets, "enemy").unwrap().confidence, 0.9);
        assert_eq!(
            nearest_to(&dets, (110, 110)).unwrap().class_name,
            "skill_button"
        );
        assert!(nearest_to(&[], (0, 0)).is_none());
    }
}
