use gltf::image::{Data, Format};

use crate::assets::mesh::TextureImage;

/// Convert a decoded glTF image into straight-alpha RGBA8.
///
/// Returns `None` for high bit-depth or float formats, which the rasterizer does not sample.
pub fn texture_from_gltf(data: &Data) -> Option<TextureImage> {
    let channels = match data.format {
        Format::R8 => 1,
        Format::R8G8 => 2,
        Format::R8G8B8 => 3,
        Format::R8G8B8A8 => 4,
        other => {
            tracing::warn!(format = ?other, "unsupported texture format; ignoring texture");
            return None;
        }
    };
    let rgba8 = expand_to_rgba8(&data.pixels, channels)?;
    if rgba8.len() != (data.width as usize) * (data.height as usize) * 4 {
        tracing::warn!(
            width = data.width,
            height = data.height,
            "texture pixel buffer size mismatch; ignoring texture"
        );
        return None;
    }
    Some(TextureImage {
        width: data.width,
        height: data.height,
        rgba8,
    })
}

fn expand_to_rgba8(pixels: &[u8], channels: usize) -> Option<Vec<u8>> {
    if channels == 0 || pixels.len() % channels != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(pixels.len() / channels * 4);
    for px in pixels.chunks_exact(channels) {
        match *px {
            [l] => out.extend_from_slice(&[l, l, l, 255]),
            [l, a] => out.extend_from_slice(&[l, l, l, a]),
            [r, g, b] => out.extend_from_slice(&[r, g, b, 255]),
            [r, g, b, a] => out.extend_from_slice(&[r, g, b, a]),
            _ => return None,
        }
    }
    Some(out)
}
