use std::path::Path;

use crate::detection::domain::detector::Detector;
use crate::detection::domain::pose_detector::PoseDetector;
use crate::source::infrastructure::still_image_source::StillImageSource;
use crate::video::domain::image_reader::ImageReader;
use crate::video::domain::image_writer::ImageWriter;

use super::annotate_image_use_case::{annotate_source, ImageAnnotation};
use super::pipeline_logger::PipelineLogger;

const STAGE: &str = "pose";

/// Pose-on-image pipeline: read → body keypoints → render → write.
pub struct PoseImageUseCase {
    reader: Box<dyn ImageReader>,
    writer: Option<Box<dyn ImageWriter>>,
    detectors: [(String, Box<dyn Detector>); 1],
    logger: Box<dyn PipelineLogger>,
}

impl PoseImageUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Option<Box<dyn ImageWriter>>,
        detector: PoseDetector,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            writer,
            detectors: [(STAGE.to_string(), Box::new(detector) as Box<dyn Detector>)],
            logger,
        }
    }

    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: Option<&Path>,
    ) -> Result<ImageAnnotation, Box<dyn std::error::Error>> {
        let source = StillImageSource::open(input_path, self.reader.as_ref())?;
        let annotation = annotate_source(&source, &mut self.detectors, self.logger.as_mut())?;
        self.logger.info(&format!(
            "Found {} visible keypoints",
            annotation.overlay.points.len()
        ));

        if let (Some(path), Some(writer)) = (output_path, self.writer.as_ref()) {
            writer.write(path, &annotation.rendered)?;
            self.logger.info(&format!("Wrote {}", path.display()));
        }
        self.logger.summary();
        Ok(annotation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::detection::domain::detection_result::DetectionResult;
    use crate::detection::domain::models::PoseLandmarkModel;
    use crate::pipeline::annotate_image_use_case::test_support::{StubReader, StubWriter};
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use crate::shared::geometry::{NormalizedPoint, Point};

    struct StubPoseModel {
        people: Vec<Vec<NormalizedPoint>>,
        calls: Arc<Mutex<usize>>,
    }

    impl PoseLandmarkModel for StubPoseModel {
        fn process(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<Vec<NormalizedPoint>>, Box<dyn std::error::Error>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.people.clone())
        }
    }

    fn use_case(
        people: Vec<Vec<NormalizedPoint>>,
        writer: Option<Box<dyn ImageWriter>>,
    ) -> (PoseImageUseCase, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        let model = StubPoseModel {
            people,
            calls: calls.clone(),
        };
        let use_case = PoseImageUseCase::new(
            Box::new(StubReader {
                frame: Frame::filled(100, 50, [0, 0, 0]),
            }),
            writer,
            PoseDetector::new(Box::new(model)),
            Box::new(NullPipelineLogger),
        );
        (use_case, calls)
    }

    #[test]
    fn test_keypoints_of_all_people_flattened() {
        let people = vec![
            vec![NormalizedPoint::new(0.5, 0.5), NormalizedPoint::new(0.1, 0.2)],
            vec![NormalizedPoint::new(0.9, 0.9)],
        ];
        let (mut use_case, calls) = use_case(people, None);
        let annotation = use_case.execute(Path::new("person.jpg"), None).unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(
            annotation.results,
            vec![DetectionResult::Points(vec![
                Point::new(50.0, 25.0),
                Point::new(10.0, 10.0),
                Point::new(90.0, 45.0),
            ])]
        );
        assert_eq!(annotation.rendered.pixel(50, 25), [0, 255, 0]);
    }

    #[test]
    fn test_no_people_renders_original() {
        let writer = StubWriter::new();
        let written = writer.written.clone();
        let (mut use_case, _) = use_case(Vec::new(), Some(Box::new(writer)));
        let annotation = use_case
            .execute(Path::new("empty.jpg"), Some(Path::new("out.jpg")))
            .unwrap();

        assert!(annotation.overlay.is_empty());
        assert_eq!(annotation.rendered, Frame::filled(100, 50, [0, 0, 0]));
        assert_eq!(written.lock().unwrap().len(), 1);
    }
}
