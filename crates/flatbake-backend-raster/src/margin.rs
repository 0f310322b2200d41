//! Edge padding around baked UV islands.

use flatbake_scene::Image;

/// Grows covered texels into uncovered neighbours, one ring per pass.
///
/// `covered` is parallel to `image.pixels` and is updated in place. Each
/// newly filled texel takes the average of its covered 8-neighbours.
pub(crate) fn extend(image: &mut Image, covered: &mut [bool], passes: u32) {
    let (w, h) = (image.width as i64, image.height as i64);
    if w == 0 || h == 0 {
        return;
    }

    for _ in 0..passes {
        let mut grown = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) as usize;
                if covered[idx] {
                    continue;
                }
                let mut sum = [0.0f32; 4];
                let mut n = 0u32;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let nidx = (ny * w + nx) as usize;
                        if covered[nidx] {
                            let p = image.pixels[nidx];
                            for i in 0..4 {
                                sum[i] += p[i];
                            }
                            n += 1;
                        }
                    }
                }
                if n > 0 {
                    grown.push((idx, sum.map(|c| c / n as f32)));
                }
            }
        }
        if grown.is_empty() {
            break;
        }
        for (idx, value) in grown {
            image.pixels[idx] = value;
            covered[idx] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbake_scene::ColorSpace;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_pass_grows_one_ring() {
        let mut image = Image::new("m", 5, 5, ColorSpace::NonColor, [0.0, 0.0, 0.0, 1.0]);
        let mut covered = vec![false; 25];
        image.set(2, 2, [1.0, 1.0, 1.0, 1.0]);
        covered[12] = true;

        extend(&mut image, &mut covered, 1);

        assert_eq!(image.get(1, 1), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(image.get(3, 2), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(image.get(0, 0), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(covered.iter().filter(|c| **c).count(), 9);
    }

    #[test]
    fn test_zero_passes_is_noop() {
        let mut image = Image::new("m", 3, 3, ColorSpace::NonColor, [0.0, 0.0, 0.0, 1.0]);
        let mut covered = vec![false; 9];
        covered[4] = true;
        image.set(1, 1, [1.0, 0.0, 0.0, 1.0]);
        let before = image.clone();

        extend(&mut image, &mut covered, 0);

        assert_eq!(image, before);
    }

    #[test]
    fn test_stops_when_nothing_covered() {
        let mut image = Image::new("m", 4, 4, ColorSpace::Srgb, [0.2, 0.2, 0.2, 1.0]);
        let mut covered = vec![false; 16];
        extend(&mut image, &mut covered, 8);
        assert!(image.is_uniform([0.2, 0.2, 0.2, 1.0]));
    }
}
