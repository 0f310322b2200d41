//! UV-space raster bake engine.
//!
//! The engine walks every triangle of the mesh's UV layer, evaluates the
//! material graph at jittered sample positions inside each covered texel,
//! and writes the averaged capture into the graph's designated bake target.
//! Texels outside every island are then padded by the configured margin.

use tracing::{debug, warn};

use flatbake_scene::{
    BakeEngine, BakeError, BakeRequest, BakeStats, ComputeDevice, MarginType, RenderConfig,
};

use crate::eval::Evaluator;
use crate::margin;
use crate::rng::TexelRng;

/// Opaque black written over the target before a bake.
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Barycentric tolerance for samples lying on a shared edge.
const EDGE_EPSILON: f32 = 1e-6;

/// Deterministic CPU bake engine.
#[derive(Debug, Clone, Default)]
pub struct RasterEngine {
    config: RenderConfig,
    bakes: u64,
}

impl RasterEngine {
    /// Creates an engine with the default render configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active render configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Number of bakes performed so far.
    pub fn bake_count(&self) -> u64 {
        self.bakes
    }
}

impl BakeEngine for RasterEngine {
    fn configure(&mut self, config: &RenderConfig) {
        if config.device == ComputeDevice::Gpu {
            warn!("GPU compute requested; the raster engine always runs on the CPU");
        }
        if config.denoise {
            warn!("Denoising requested; raster captures are noise-free and are not denoised");
        }
        debug!(
            samples = config.samples,
            margin = config.margin,
            clear = config.clear_before_bake,
            "Configured raster engine"
        );
        self.config = config.clone();
    }

    fn bake(&mut self, request: BakeRequest<'_>) -> Result<BakeStats, BakeError> {
        let BakeRequest {
            mode,
            mesh,
            material,
            images,
        } = request;

        let (_, target) = material.bake_target()?;
        let uv = mesh.uv.as_ref().ok_or_else(|| BakeError::MissingUvLayer {
            object: mesh.name.clone(),
        })?;
        let (width, height) = images
            .get(target)
            .map(|img| (img.width, img.height))
            .ok_or(BakeError::UnknownImage(target))?;

        let texels = width as usize * height as usize;
        let mut sums = vec![[0.0f32; 4]; texels];
        let mut counts = vec![0u32; texels];
        {
            let evaluator = Evaluator::new(material, images)?;
            let samples = self.config.samples.max(1);
            for corners in &uv.corners {
                rasterize(corners, width, height, samples, |x, y, uv| {
                    let idx = y as usize * width as usize + x as usize;
                    let c = evaluator.capture(mode, uv);
                    for i in 0..4 {
                        sums[idx][i] += c[i];
                    }
                    counts[idx] += 1;
                });
            }
        }

        let image = images
            .get_mut(target)
            .ok_or(BakeError::UnknownImage(target))?;
        if self.config.clear_before_bake {
            image.fill(CLEAR_COLOR);
        }
        let mut covered = vec![false; texels];
        for (idx, (sum, count)) in sums.iter().zip(&counts).enumerate() {
            if *count > 0 {
                let n = *count as f32;
                image.pixels[idx] = [sum[0] / n, sum[1] / n, sum[2] / n, sum[3] / n];
                covered[idx] = true;
            }
        }
        let covered_texels = covered.iter().filter(|c| **c).count() as u64;

        match self.config.margin_type {
            MarginType::Extend => margin::extend(image, &mut covered, self.config.margin),
        }

        self.bakes += 1;
        debug!(
            object = %mesh.name,
            image = %image.name,
            ?mode,
            covered_texels,
            "Bake finished"
        );

        Ok(BakeStats {
            target,
            covered_texels,
        })
    }
}

/// Calls `visit(x, y, uv)` for every sample of every texel inside the
/// triangle.
fn rasterize(
    corners: &[[f32; 2]; 3],
    width: u32,
    height: u32,
    samples: u32,
    mut visit: impl FnMut(u32, u32, [f32; 2]),
) {
    if width == 0 || height == 0 {
        return;
    }
    let (w, h) = (width as f32, height as f32);
    let p = corners.map(|[u, v]| [u * w, (1.0 - v) * h]);

    let area = edge(p[0], p[1], p[2]);
    if area.abs() <= f32::EPSILON {
        return;
    }

    let min_x = p.iter().map(|c| c[0]).fold(f32::INFINITY, f32::min);
    let max_x = p.iter().map(|c| c[0]).fold(f32::NEG_INFINITY, f32::max);
    let min_y = p.iter().map(|c| c[1]).fold(f32::INFINITY, f32::min);
    let max_y = p.iter().map(|c| c[1]).fold(f32::NEG_INFINITY, f32::max);

    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().max(0.0) as u32).min(width);
    let y1 = (max_y.ceil().max(0.0) as u32).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            for [ox, oy] in TexelRng::offsets(x, y, samples) {
                let s = [x as f32 + ox, y as f32 + oy];
                let b0 = edge(p[1], p[2], s) / area;
                let b1 = edge(p[2], p[0], s) / area;
                let b2 = 1.0 - b0 - b1;
                if b0 < -EDGE_EPSILON || b1 < -EDGE_EPSILON || b2 < -EDGE_EPSILON {
                    continue;
                }
                visit(x, y, [s[0] / w, 1.0 - s[1] / h]);
            }
        }
    }
}

fn edge(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}
