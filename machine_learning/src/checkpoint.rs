//! Loading and saving trained `Sequential` models as safetensors files.
//!
//! Layer `i` is stored as the tensors `layers.<i>.weight` (`[n, m]`) and `layers.<i>.bias`
//! (`[m]`), both `F32`. Activated layers carry a `layers.<i>.act` entry in the header metadata.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use ndarray::{Array1, Array2};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::{
    MlErr, Result,
    arch::{Sequential, activations::ActFn, layers::Dense},
};

fn weight_key(i: usize) -> String {
    format!("layers.{i}.weight")
}

fn bias_key(i: usize) -> String {
    format!("layers.{i}.bias")
}

fn act_key(i: usize) -> String {
    format!("layers.{i}.act")
}

/// Loads a model from a safetensors file.
///
/// # Arguments
/// * `path` - The checkpoint's path.
///
/// # Returns
/// The trained model or an error if the file can't be read or doesn't describe a valid model.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Sequential> {
    let bytes = fs::read(path.as_ref())?;
    let model = from_bytes(&bytes)?;
    log::debug!(
        "loaded {} layer(s), {} parameter(s) from {}",
        model.layers().len(),
        model.size(),
        path.as_ref().display()
    );
    Ok(model)
}

/// Decodes a model from an in-memory safetensors buffer.
pub fn from_bytes(bytes: &[u8]) -> Result<Sequential> {
    let (_, metadata) = SafeTensors::read_metadata(bytes)?;
    let acts = metadata.metadata().clone().unwrap_or_default();
    let tensors = SafeTensors::deserialize(bytes)?;
    let names: Vec<&str> = tensors.names().into_iter().map(String::as_str).collect();

    let mut layers = Vec::new();
    for i in 0.. {
        let w_name = weight_key(i);
        if !names.contains(&w_name.as_str()) {
            break;
        }

        let b_name = bias_key(i);
        if !names.contains(&b_name.as_str()) {
            return Err(MlErr::MissingTensor { name: b_name });
        }

        let weights = read_matrix(&tensors, &w_name)?;
        let biases = read_vector(&tensors, &b_name)?;

        let act_fn = match acts.get(&act_key(i)) {
            Some(value) => Some(ActFn::decode(value).ok_or_else(|| {
                MlErr::InvalidActivation {
                    layer: i,
                    value: value.clone(),
                }
            })?),
            None => None,
        };

        layers.push(Dense::new(weights, biases, act_fn)?);
    }

    Sequential::new(layers)
}

/// Saves a model so that [`load`] gives it back.
pub fn save<P: AsRef<Path>>(model: &Sequential, path: P) -> Result<()> {
    let mut buffers = Vec::with_capacity(model.layers().len() * 2);
    let mut acts = HashMap::new();

    for (i, layer) in model.layers().iter().enumerate() {
        let (n, m) = layer.dim();
        let weights: Vec<f32> = layer.weights().iter().copied().collect();
        let biases: Vec<f32> = layer.biases().iter().copied().collect();

        let weights = bytemuck::cast_slice::<f32, u8>(&weights).to_vec();
        let biases = bytemuck::cast_slice::<f32, u8>(&biases).to_vec();

        buffers.push((weight_key(i), vec![n, m], weights));
        buffers.push((bias_key(i), vec![m], biases));

        if let Some(act_fn) = layer.act_fn() {
            acts.insert(act_key(i), act_fn.encode());
        }
    }

    let mut views = BTreeMap::new();
    for (name, shape, data) in &buffers {
        views.insert(name.clone(), TensorView::new(Dtype::F32, shape.clone(), data)?);
    }

    let metadata = (!acts.is_empty()).then_some(acts);
    safetensors::serialize_to_file(&views, &metadata, path.as_ref())?;
    Ok(())
}

fn read_f32s(tensors: &SafeTensors<'_>, name: &str) -> Result<(Vec<usize>, Vec<f32>)> {
    let view = tensors.tensor(name)?;

    if view.dtype() != Dtype::F32 {
        return Err(MlErr::InvalidDtype {
            name: name.to_string(),
            got: format!("{:?}", view.dtype()),
        });
    }

    let values = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((view.shape().to_vec(), values))
}

fn read_matrix(tensors: &SafeTensors<'_>, name: &str) -> Result<Array2<f32>> {
    let (shape, values) = read_f32s(tensors, name)?;

    let &[n, m] = shape.as_slice() else {
        return Err(MlErr::InvalidShape {
            name: name.to_string(),
            got: shape,
        });
    };

    Array2::from_shape_vec((n, m), values).map_err(|_| MlErr::InvalidShape {
        name: name.to_string(),
        got: vec![n, m],
    })
}

fn read_vector(tensors: &SafeTensors<'_>, name: &str) -> Result<Array1<f32>> {
    let (shape, values) = read_f32s(tensors, name)?;

    if shape.len() != 1 {
        return Err(MlErr::InvalidShape {
            name: name.to_string(),
            got: shape,
        });
    }

    Ok(Array1::from(values))
}
