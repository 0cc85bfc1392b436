use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::MmapOptions;
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use tch::{nn, Device, Kind, Tensor};

pub fn load_safetensors<P: AsRef<Path>>(vs: &mut nn::VarStore, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open checkpoint {:?}", path))?;
    let buffer = unsafe { MmapOptions::new().map(&file)? };
    let tensors = SafeTensors::deserialize(&buffer)?;

    let mut variables = vs.variables();
    let device = vs.device();

    for (name, view) in tensors.tensors() {
        if let Some(var) = variables.get_mut(&name) {
            let shape: Vec<i64> = view.shape().iter().map(|&x| x as i64).collect();
            let kind = match view.dtype() {
                Dtype::F32 => Kind::Float,
                Dtype::F16 => Kind::Half,
                Dtype::BF16 => Kind::BFloat16,
                _ => return Err(anyhow::anyhow!("Unsupported dtype: {:?}", view.dtype())),
            };

            let data = view.data();
            let tch_tensor = Tensor::from_data_size(data, &shape, kind).to_device(device);

            tch::no_grad(|| {
                var.copy_(&tch_tensor);
            });
            log::debug!("Loaded tensor: {}", name);
        } else {
            log::warn!("Tensor {} found in checkpoint but not in model", name);
        }
    }

    Ok(())
}

/// Writes every variable of the store as little-endian F32.
pub fn save_safetensors<P: AsRef<Path>>(vs: &nn::VarStore, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut entries: Vec<(String, Vec<usize>, Vec<u8>)> = Vec::new();
    for (name, var) in vs.variables() {
        let t = var
            .detach()
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .contiguous();
        let shape: Vec<usize> = t.size().iter().map(|&d| d as usize).collect();
        let numel = t.numel();
        let mut values = vec![0f32; numel];
        t.copy_data(&mut values, numel);
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        entries.push((name, shape, bytes));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let views = entries
        .iter()
        .map(|(name, shape, bytes)| -> Result<(String, TensorView<'_>)> {
            let view = TensorView::new(Dtype::F32, shape.clone(), bytes)?;
            Ok((name.clone(), view))
        })
        .collect::<Result<Vec<_>>>()?;

    safetensors::serialize_to_file(views, &None, path)
        .with_context(|| format!("Failed to write checkpoint {:?}", path))?;
    Ok(())
}
