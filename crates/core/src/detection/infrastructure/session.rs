use std::path::Path;

/// Channel ordering of a model's image input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[N, C, H, W]`, typical for PyTorch exports.
    Nchw,
    /// `[N, H, W, C]`, typical for TFLite conversions.
    Nhwc,
}

/// Owned copy of one model output.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl OutputTensor {
    /// Size of the last dimension (1 for scalars).
    pub fn last_dim(&self) -> usize {
        self.shape.last().copied().unwrap_or(1)
    }
}

/// An ONNX Runtime session plus the image input geometry it expects.
pub struct ModelSession {
    session: ort::session::Session,
    name: String,
    layout: TensorLayout,
    input_width: u32,
    input_height: u32,
}

impl ModelSession {
    /// Loads a model, preferring the platform's accelerated execution
    /// provider.
    ///
    /// Layout and resolution are read from the first input's shape; dynamic
    /// or unreadable dimensions fall back to `default_layout` and
    /// `default_size`.
    pub fn open(
        model_path: &Path,
        default_layout: TensorLayout,
        default_size: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let shape: Option<Vec<i64>> = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                Some(shape.iter().copied().collect())
            } else {
                None
            }
        });
        let (layout, input_width, input_height) = shape
            .as_deref()
            .and_then(input_geometry)
            .unwrap_or((default_layout, default_size, default_size));

        let name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_path.display().to_string());
        log::info!("Loaded {name}: {input_width}x{input_height} {layout:?}");

        Ok(Self {
            session,
            name,
            layout,
            input_width,
            input_height,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    pub fn input_width(&self) -> u32 {
        self.input_width
    }

    pub fn input_height(&self) -> u32 {
        self.input_height
    }

    /// Runs inference on a single image tensor and copies every output out.
    pub fn run(
        &mut self,
        input: ndarray::Array4<f32>,
    ) -> Result<Vec<OutputTensor>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let mut tensors = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            let array = outputs[i].try_extract_array::<f32>()?;
            tensors.push(OutputTensor {
                shape: array.shape().to_vec(),
                data: array.iter().copied().collect(),
            });
        }
        if tensors.is_empty() {
            return Err(format!("{} produced no outputs", self.name).into());
        }
        Ok(tensors)
    }
}

/// Return the preferred ONNX execution providers for the current platform.
///
/// ort falls back to CPU if the platform-specific provider is unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// `(layout, width, height)` of a 4-D image input with 3 channels.
fn input_geometry(shape: &[i64]) -> Option<(TensorLayout, u32, u32)> {
    if shape.len() != 4 {
        return None;
    }
    let (layout, h, w) = if shape[1] == 3 {
        (TensorLayout::Nchw, shape[2], shape[3])
    } else if shape[3] == 3 {
        (TensorLayout::Nhwc, shape[1], shape[2])
    } else {
        return None;
    };
    if h <= 0 || w <= 0 {
        return None;
    }
    Some((layout, w as u32, h as u32))
}
