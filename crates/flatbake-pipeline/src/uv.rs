//! UV resolution.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use flatbake_scene::{MeshObject, UnwrapError, Unwrapper};

/// How a mesh came to have its parametrization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UvResolution {
    /// The mesh already had one; nothing changed.
    Existing,
    /// One was generated by automatic projection.
    Synthesized,
}

/// Makes sure `mesh` has a UV parametrization.
///
/// Failure is not fatal: the caller skips the object.
pub fn ensure_parametrization(
    mesh: &mut MeshObject,
    unwrapper: &dyn Unwrapper,
) -> Result<UvResolution, UnwrapError> {
    if mesh.has_uv() {
        debug!(object = %mesh.name, "UV layer present");
        return Ok(UvResolution::Existing);
    }
    unwrapper.unwrap(mesh)?;
    info!("Created UV map: {}", mesh.name);
    Ok(UvResolution::Synthesized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbake_backend_raster::SmartProject;
    use flatbake_scene::UvLayer;
    use std::cell::Cell;

    struct CountingUnwrapper(Cell<u32>);

    impl Unwrapper for CountingUnwrapper {
        fn unwrap(&self, mesh: &mut MeshObject) -> Result<(), UnwrapError> {
            self.0.set(self.0.get() + 1);
            mesh.uv = Some(UvLayer::new("UVMap", vec![[[0.0; 2]; 3]; mesh.triangles.len()]));
            Ok(())
        }
    }

    fn triangle() -> MeshObject {
        MeshObject::new(
            "Tri",
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_existing_layer_is_kept() {
        let layer = UvLayer::new("Custom", vec![[[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]]]);
        let mut mesh = triangle().with_uv(layer.clone());
        let unwrapper = CountingUnwrapper(Cell::new(0));

        let resolution = ensure_parametrization(&mut mesh, &unwrapper).unwrap();

        assert_eq!(resolution, UvResolution::Existing);
        assert_eq!(unwrapper.0.get(), 0);
        assert_eq!(mesh.uv, Some(layer));
    }

    #[test]
    fn test_missing_layer_is_synthesized() {
        let mut mesh = triangle();
        let resolution = ensure_parametrization(&mut mesh, &SmartProject::default()).unwrap();
        assert_eq!(resolution, UvResolution::Synthesized);
        assert_eq!(mesh.uv.unwrap().corners.len(), 1);
    }

    #[test]
    fn test_unwrap_failure_is_reported() {
        let mut mesh = MeshObject::new("Empty", vec![], vec![]);
        assert_eq!(
            ensure_parametrization(&mut mesh, &SmartProject::default()),
            Err(UnwrapError::NoFaces)
        );
    }
}
