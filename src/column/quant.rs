//! Column quantization to normalized 8-bit values.

/// Quantizes one voxel's column values against their maximum.
///
/// Returns the quantized bytes and the maximum itself, which the caller keeps
/// as the voxel's scale factor. The maximum always quantizes to 255. An empty
/// column yields no bytes and a scale of `0.0`.
pub fn quantize_column(values: &[f32]) -> (Vec<u8>, f32) {
    let Some(&first) = values.first() else {
        return (Vec::new(), 0.0);
    };

    let mut max = first;
    for &value in &values[1..] {
        if value > max {
            max = value;
        }
    }

    let quantized = values
        .iter()
        .map(|&value| (value / max * 255.0 + 0.5) as u8)
        .collect();

    (quantized, max)
}
