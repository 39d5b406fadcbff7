use std::path::Path;
use std::time::Instant;

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::detector::Detector;
use crate::overlay::annotations::Overlay;
use crate::shared::frame::Frame;
use crate::source::infrastructure::still_image_source::StillImageSource;
use crate::video::domain::image_reader::ImageReader;
use crate::video::domain::image_writer::ImageWriter;

use super::pipeline_logger::PipelineLogger;

/// Outcome of annotating one still image.
#[derive(Clone, Debug)]
pub struct ImageAnnotation {
    /// Raw results, one per detector, in detector order.
    pub results: Vec<DetectionResult>,
    pub overlay: Overlay,
    pub rendered: Frame,
}

/// Still-image pipeline: read → detect (each detector) → render → write.
///
/// With a hand and a face detector this is the classic annotation pass;
/// with a segmentation detector it produces a background-replaced image.
pub struct AnnotateImageUseCase {
    reader: Box<dyn ImageReader>,
    writer: Option<Box<dyn ImageWriter>>,
    detectors: Vec<(String, Box<dyn Detector>)>,
    logger: Box<dyn PipelineLogger>,
}

impl AnnotateImageUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Option<Box<dyn ImageWriter>>,
        detectors: Vec<(String, Box<dyn Detector>)>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            writer,
            detectors,
            logger,
        }
    }

    /// Annotates `input_path`; the rendered frame is also written to
    /// `output_path` when both a path and a writer are given.
    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: Option<&Path>,
    ) -> Result<ImageAnnotation, Box<dyn std::error::Error>> {
        let source = StillImageSource::open(input_path, self.reader.as_ref())?;
        let annotation = annotate_source(&source, &mut self.detectors, self.logger.as_mut())?;

        if let (Some(path), Some(writer)) = (output_path, self.writer.as_ref()) {
            writer.write(path, &annotation.rendered)?;
            self.logger.info(&format!("Wrote {}", path.display()));
        }
        self.logger.summary();
        Ok(annotation)
    }
}

/// Runs every named detector on the source's frame and renders the result.
pub(crate) fn annotate_source(
    source: &StillImageSource,
    detectors: &mut [(String, Box<dyn Detector>)],
    logger: &mut dyn PipelineLogger,
) -> Result<ImageAnnotation, Box<dyn std::error::Error>> {
    let mut results = Vec::with_capacity(detectors.len());
    for (name, detector) in detectors.iter_mut() {
        let start = Instant::now();
        let result = detector.detect_source(source)?;
        logger.timing(name, start.elapsed().as_secs_f64() * 1000.0);
        logger.metric(name, result.len() as f64);
        log::debug!("{name}: {} results", result.len());
        results.push(result);
    }
    logger.progress(1, 1);

    let overlay = Overlay::from_results(results.iter().cloned());
    let rendered = source.render(&overlay);
    Ok(ImageAnnotation {
        results,
        overlay,
        rendered,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StatsPipelineLogger};
    use crate::shared::geometry::{BoundingBox, Point};

    fn white() -> Frame {
        Frame::filled(40, 30, [255, 255, 255])
    }

    fn hands_and_faces() -> Vec<(String, Box<dyn Detector>)> {
        vec![
            named(
                "hands",
                FixedDetector::new(DetectionResult::Points(vec![Point::new(10.0, 10.0)])),
            ),
            named(
                "faces",
                FixedDetector::new(DetectionResult::Boxes(vec![BoundingBox::new(
                    20.0, 5.0, 10.0, 10.0,
                )])),
            ),
        ]
    }

    #[test]
    fn test_execute_collects_results_and_renders() {
        let mut use_case = AnnotateImageUseCase::new(
            Box::new(StubReader { frame: white() }),
            None,
            hands_and_faces(),
            Box::new(NullPipelineLogger),
        );
        let annotation = use_case.execute(Path::new("in.png"), None).unwrap();

        assert_eq!(annotation.results.len(), 2);
        assert_eq!(annotation.overlay.points, vec![Point::new(10.0, 10.0)]);
        assert_eq!(annotation.overlay.boxes.len(), 1);
        assert_eq!(annotation.rendered.dimensions(), (40, 30));
        // Point drawn green, box edge drawn blue
        assert_eq!(annotation.rendered.pixel(10, 10), [0, 255, 0]);
        assert_eq!(annotation.rendered.pixel(25, 5), [0, 0, 255]);
    }

    #[test]
    fn test_output_written_when_requested() {
        let writer = StubWriter::new();
        let written = writer.written.clone();
        let mut use_case = AnnotateImageUseCase::new(
            Box::new(StubReader { frame: white() }),
            Some(Box::new(writer)),
            hands_and_faces(),
            Box::new(NullPipelineLogger),
        );
        let annotation = use_case
            .execute(Path::new("in.png"), Some(Path::new("out.png")))
            .unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, Path::new("out.png"));
        assert_eq!(written[0].1, annotation.rendered);
    }

    #[test]
    fn test_no_detections_leaves_image_untouched() {
        let detectors = vec![
            named("hands", FixedDetector::new(DetectionResult::Points(Vec::new()))),
            named("faces", FixedDetector::new(DetectionResult::Boxes(Vec::new()))),
        ];
        let mut use_case = AnnotateImageUseCase::new(
            Box::new(StubReader { frame: white() }),
            None,
            detectors,
            Box::new(NullPipelineLogger),
        );
        let annotation = use_case.execute(Path::new("in.png"), None).unwrap();

        assert!(annotation.results.iter().all(DetectionResult::is_empty));
        assert_eq!(annotation.results[0].columns(), 2);
        assert_eq!(annotation.results[1].columns(), 4);
        assert_eq!(annotation.rendered, white());
    }

    #[test]
    fn test_composite_replaces_rendered_frame() {
        let replacement = Frame::filled(40, 30, [1, 2, 3]);
        let detectors = vec![named(
            "segmentation",
            FixedDetector::new(DetectionResult::Composite(Some(replacement.clone()))),
        )];
        let mut use_case = AnnotateImageUseCase::new(
            Box::new(StubReader { frame: white() }),
            None,
            detectors,
            Box::new(NullPipelineLogger),
        );
        let annotation = use_case.execute(Path::new("in.png"), None).unwrap();
        assert_eq!(annotation.rendered, replacement);
    }

    #[test]
    fn test_timings_recorded_per_detector() {
        let mut detectors = hands_and_faces();
        let mut logger = StatsPipelineLogger::new(1);
        let source = StillImageSource::from_frame(Path::new("in.png"), white());
        annotate_source(&source, &mut detectors, &mut logger).unwrap();

        assert_eq!(logger.timings_for("hands").map(<[f64]>::len), Some(1));
        assert_eq!(logger.timings_for("faces").map(<[f64]>::len), Some(1));
        assert_eq!(logger.metrics_for("faces").unwrap(), &[1.0]);
    }
}
