//! Backend aliases and accelerator detection.
//!
//! The backend is selected at compile time through cargo features, in order
//! of preference: a specialized accelerator backend if built (`rocm`,
//! `cuda`), then the general GPU backend (`wgpu`), then the CPU fallback.

#[cfg(feature = "rocm")]
pub type GpuBackend<F = DType> = burn::backend::Rocm<F>;

#[cfg(feature = "cuda")]
pub type GpuBackend<F = DType> = burn::backend::Cuda<F>;

#[cfg(feature = "wgpu")]
pub type GpuBackend<F = DType> = burn::backend::Wgpu<F>;

#[cfg(feature = "cpu")]
pub type GpuBackend<F = DType> = burn::backend::Cpu<F>;

#[cfg(not(any(feature = "rocm", feature = "cuda", feature = "wgpu", feature = "cpu")))]
pub type GpuBackend<F = DType> =
    compile_error!("One of the features 'rocm', 'cuda', 'wgpu' or 'cpu' must be enabled");

#[cfg(feature = "bf16")]
pub type DType = half::bf16;

#[cfg(feature = "f16")]
pub type DType = half::f16;

#[cfg(not(any(feature = "bf16", feature = "f16")))]
pub type DType = f32;

/// Autodiff-enabled backend for fine-tuning.
pub type TrainingBackend<F = DType> = burn::backend::Autodiff<GpuBackend<F>>;

/// Accelerator the active backend runs on. Resolved automatically at facade
/// construction time and exposed as a read-only attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accelerator {
    Rocm,
    Cuda,
    Wgpu,
    Cpu,
}

impl Accelerator {
    /// Detect the accelerator the enabled backend feature targets,
    /// preferring specialized accelerators over the general GPU backend over
    /// the CPU fallback.
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(feature = "rocm") {
            Self::Rocm
        } else if cfg!(feature = "cuda") {
            Self::Cuda
        } else if cfg!(feature = "wgpu") {
            Self::Wgpu
        } else {
            Self::Cpu
        }
    }

    /// Whether half-precision training is available on this accelerator.
    #[must_use]
    pub fn supports_fp16(self) -> bool {
        !matches!(self, Self::Cpu)
    }
}

impl std::fmt::Display for Accelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rocm => write!(f, "rocm"),
            Self::Cuda => write!(f, "cuda"),
            Self::Wgpu => write!(f, "wgpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_does_not_support_fp16() {
        assert!(!Accelerator::Cpu.supports_fp16());
        assert!(Accelerator::Cuda.supports_fp16());
        assert!(Accelerator::Wgpu.supports_fp16());
    }
}
