use candle_core::Device;
use storyqa_core::{Error, Result};

/// Resolve `embedding.device`. `auto` prefers Metal and falls back to the
/// CPU; an explicit `metal` fails when no Metal device can be opened.
pub fn select_device(preference: &str) -> Result<Device> {
    let device = match preference {
        "cpu" => Device::Cpu,
        "metal" => Device::new_metal(0)
            .map_err(|e| Error::InvalidConfig(format!("embedding.device = metal but no Metal device: {e}")))?,
        _ => Device::new_metal(0).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Metal unavailable, falling back to CPU");
            Device::Cpu
        }),
    };
    tracing::info!(device = if device.is_metal() { "metal" } else { "cpu" }, "embedding device selected");
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_is_always_available() {
        assert!(select_device("cpu").unwrap().is_cpu());
    }

    #[cfg(not(feature = "metal"))]
    #[test]
    fn metal_request_without_support_is_rejected() {
        assert!(select_device("auto").unwrap().is_cpu());
        assert!(matches!(select_device("metal"), Err(Error::InvalidConfig(_))));
    }
}
