//! Angle-based automatic UV projection.
//!
//! Triangles are grouped by facing direction: any triangle whose normal is
//! within the angle limit of a cluster direction joins that cluster. Each
//! cluster is split into edge-connected islands, every island is projected
//! onto the plane of its cluster direction, and the islands are shelf-packed
//! into the unit square with a margin between them.

use std::collections::HashMap;

use tracing::debug;

use flatbake_scene::{MeshObject, UnwrapError, Unwrapper, UvLayer};

/// Name of the layer written by the unwrapper.
pub const UV_LAYER_NAME: &str = "UVMap";

/// Smart UV projection.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartProject {
    /// Maximum angle between a triangle normal and its cluster direction.
    pub angle_limit_deg: f32,
    /// Gap between packed islands, as a fraction of the unit square.
    pub island_margin: f32,
}

impl Default for SmartProject {
    fn default() -> Self {
        Self {
            angle_limit_deg: 66.0,
            island_margin: 0.02,
        }
    }
}

type Vec3 = [f32; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn length(a: Vec3) -> f32 {
    dot(a, a).sqrt()
}

fn normalize(a: Vec3) -> Option<Vec3> {
    let len = length(a);
    (len > f32::EPSILON).then(|| [a[0] / len, a[1] / len, a[2] / len])
}

/// Orthonormal tangent basis for a projection direction.
fn basis(n: Vec3) -> (Vec3, Vec3) {
    let helper = if n[2].abs() < 0.9 {
        [0.0, 0.0, 1.0]
    } else {
        [0.0, 1.0, 0.0]
    };
    let t = normalize(cross(helper, n)).unwrap_or([1.0, 0.0, 0.0]);
    let b = cross(n, t);
    (t, b)
}

struct Face {
    positions: [Vec3; 3],
    /// Unit normal; `None` for zero-area triangles.
    normal: Option<Vec3>,
    area: f32,
}

struct Island {
    faces: Vec<usize>,
    /// Projected corners, parallel to `faces`.
    uvs: Vec<[[f32; 2]; 3]>,
    width: f32,
    height: f32,
}

/// Disjoint-set forest over triangle indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

impl SmartProject {
    fn faces(&self, mesh: &MeshObject) -> Result<Vec<Face>, UnwrapError> {
        let vertex_count = mesh.positions.len();
        mesh.triangles
            .iter()
            .enumerate()
            .map(|(triangle, tri)| {
                let mut positions = [[0.0; 3]; 3];
                for (slot, &vertex) in positions.iter_mut().zip(tri) {
                    *slot = *mesh.positions.get(vertex as usize).ok_or(
                        UnwrapError::IndexOutOfRange {
                            triangle,
                            vertex,
                            vertex_count,
                        },
                    )?;
                }
                let n = cross(
                    sub(positions[1], positions[0]),
                    sub(positions[2], positions[0]),
                );
                Ok(Face {
                    positions,
                    normal: normalize(n),
                    area: length(n) * 0.5,
                })
            })
            .collect()
    }

    /// Assigns every face to a cluster and returns the cluster directions.
    fn cluster(&self, faces: &[Face]) -> (Vec<Vec3>, Vec<usize>) {
        let cos_limit = self.angle_limit_deg.to_radians().cos();
        let mut order: Vec<usize> = (0..faces.len()).collect();
        order.sort_by(|&a, &b| faces[b].area.total_cmp(&faces[a].area).then(a.cmp(&b)));

        let mut directions: Vec<Vec3> = Vec::new();
        let mut assignment = vec![0usize; faces.len()];
        for &f in &order {
            let Some(n) = faces[f].normal else {
                continue;
            };
            let best = directions
                .iter()
                .enumerate()
                .map(|(i, d)| (i, dot(*d, n)))
                .filter(|(_, c)| *c >= cos_limit)
                .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)));
            assignment[f] = match best {
                Some((i, _)) => i,
                None => {
                    directions.push(n);
                    directions.len() - 1
                }
            };
        }

        // Refine directions to the area-weighted mean of their members.
        let mut sums = vec![[0.0f32; 3]; directions.len()];
        for (f, face) in faces.iter().enumerate() {
            if let Some(n) = face.normal {
                let s = &mut sums[assignment[f]];
                for i in 0..3 {
                    s[i] += n[i] * face.area;
                }
            }
        }
        for (d, s) in directions.iter_mut().zip(sums) {
            if let Some(n) = normalize(s) {
                *d = n;
            }
        }
        (directions, assignment)
    }

    fn islands(
        &self,
        mesh: &MeshObject,
        faces: &[Face],
        directions: &[Vec3],
        assignment: &[usize],
    ) -> Vec<Island> {
        let mut uf = UnionFind::new(faces.len());
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for (f, tri) in mesh.triangles.iter().enumerate() {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                let key = (a.min(b), a.max(b));
                match edges.get(&key) {
                    Some(&other) if assignment[other] == assignment[f] => uf.union(f, other),
                    Some(_) => {}
                    None => {
                        edges.insert(key, f);
                    }
                }
            }
        }

        let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
        let mut root_index: HashMap<usize, usize> = HashMap::new();
        for f in 0..faces.len() {
            let root = uf.find(f);
            let idx = *root_index.entry(root).or_insert_with(|| {
                groups.push((root, Vec::new()));
                groups.len() - 1
            });
            groups[idx].1.push(f);
        }

        groups
            .into_iter()
            .map(|(_, members)| {
                let direction = directions
                    .get(assignment[members[0]])
                    .copied()
                    .unwrap_or([0.0, 0.0, 1.0]);
                let (t, b) = basis(direction);
                let projected: Vec<[[f32; 2]; 3]> = members
                    .iter()
                    .map(|&f| faces[f].positions.map(|p| [dot(p, t), dot(p, b)]))
                    .collect();

                let mut min = [f32::INFINITY; 2];
                let mut max = [f32::NEG_INFINITY; 2];
                for corner in projected.iter().flatten() {
                    for i in 0..2 {
                        min[i] = min[i].min(corner[i]);
                        max[i] = max[i].max(corner[i]);
                    }
                }
                let uvs = projected
                    .into_iter()
                    .map(|tri| tri.map(|c| [c[0] - min[0], c[1] - min[1]]))
                    .collect();
                Island {
                    faces: members,
                    uvs,
                    width: max[0] - min[0],
                    height: max[1] - min[1],
                }
            })
            .collect()
    }

    /// Shelf-packs islands and returns per-island offsets and the scale that
    /// maps the packed layout into the unit square.
    fn pack(&self, islands: &[Island]) -> (Vec<[f32; 2]>, f32) {
        let total_area: f32 = islands.iter().map(|i| i.width * i.height).sum();
        let widest = islands.iter().map(|i| i.width).fold(0.0f32, f32::max);

        let mut order: Vec<usize> = (0..islands.len()).collect();
        order.sort_by(|&a, &b| {
            islands[b]
                .height
                .total_cmp(&islands[a].height)
                .then(a.cmp(&b))
        });

        let mut shelf_width = total_area.sqrt().max(widest).max(f32::EPSILON);
        let mut offsets = vec![[0.0f32; 2]; islands.len()];
        let mut scale = 1.0;

        // The margin is relative to the final square, which depends on the
        // packed extent; iterate to converge.
        for _ in 0..3 {
            let pad = self.island_margin * shelf_width;
            let (mut x, mut y, mut shelf_h, mut extent_x) = (pad, pad, 0.0f32, 0.0f32);
            for &i in &order {
                let island = &islands[i];
                if x + island.width + pad > shelf_width + pad && x > pad {
                    y += shelf_h + pad;
                    x = pad;
                    shelf_h = 0.0;
                }
                offsets[i] = [x, y];
                x += island.width + pad;
                extent_x = extent_x.max(x);
                shelf_h = shelf_h.max(island.height);
            }
            let extent_y = y + shelf_h + pad;
            let extent = extent_x.max(extent_y).max(f32::EPSILON);
            scale = 1.0 / extent;
            shelf_width = shelf_width.max(extent_y - 2.0 * pad).min(extent);
        }
        (offsets, scale)
    }
}

impl Unwrapper for SmartProject {
    fn unwrap(&self, mesh: &mut MeshObject) -> Result<(), UnwrapError> {
        if mesh.triangles.is_empty() {
            return Err(UnwrapError::NoFaces);
        }
        let faces = self.faces(mesh)?;
        if faces.iter().all(|f| f.normal.is_none()) {
            return Err(UnwrapError::Degenerate);
        }

        let (directions, assignment) = self.cluster(&faces);
        let islands = self.islands(mesh, &faces, &directions, &assignment);
        let (offsets, scale) = self.pack(&islands);

        let mut corners = vec![[[0.0f32; 2]; 3]; mesh.triangles.len()];
        for (island, offset) in islands.iter().zip(&offsets) {
            for (&f, tri) in island.faces.iter().zip(&island.uvs) {
                corners[f] = tri.map(|c| {
                    [
                        ((c[0] + offset[0]) * scale).clamp(0.0, 1.0),
                        ((c[1] + offset[1]) * scale).clamp(0.0, 1.0),
                    ]
                });
            }
        }

        debug!(
            object = %mesh.name,
            clusters = directions.len(),
            islands = islands.len(),
            "Generated UV layer"
        );
        mesh.uv = Some(UvLayer::new(UV_LAYER_NAME, corners));
        Ok(())
    }
}
