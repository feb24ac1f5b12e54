//! ONNX Runtime session construction.

use eyre::Result;
#[allow(unused_imports)]
use ort::execution_providers::*;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use std::path::Path;

/// Build a session builder with execution providers configured by Cargo features.
///
/// Providers are tried in priority order. The first available provider is
/// used; CPU is always registered last as fallback.
///
/// # Execution Providers
///
/// Enabled via Cargo features:
/// - `cuda` - NVIDIA CUDA
/// - `tensorrt` - NVIDIA TensorRT
/// - `openvino` - Intel OpenVINO
/// - `directml` - DirectML (Windows)
/// - `coreml` - CoreML (macOS)
pub fn session_builder() -> Result<SessionBuilder> {
    let builder = Session::builder()?.with_execution_providers([
        #[cfg(feature = "cuda")]
        CUDAExecutionProvider::default().build(),
        #[cfg(feature = "tensorrt")]
        TensorRTExecutionProvider::default().build(),
        #[cfg(feature = "openvino")]
        OpenVINOExecutionProvider::default()
            .with_device_type("HETERO:GPU,CPU")
            .with_cache_dir(".cache/ort")
            .build(),
        #[cfg(feature = "directml")]
        DirectMLExecutionProvider::default().build(),
        #[cfg(feature = "coreml")]
        CoreMLExecutionProvider::default().build(),
        CPUExecutionProvider::default().build(),
    ])?;

    Ok(builder)
}

/// Load a single ONNX graph.
pub fn load_session(path: &Path) -> Result<Session> {
    tracing::info!(path = ?path.display(), "loading session");

    Ok(session_builder()?.commit_from_file(path)?)
}
