//! Small procedural vehicle used by the QA driver and the tests.
//!
//! Four logo slots share one `Logo` material: two body sides (multi-material
//! meshes with geometry groups), the rear (single material, no groups) and
//! the front (nested under a group created before the others, so scene
//! traversal visits it first).

use super::{Geometry, Material, MaterialId, ModelRoot};
use crate::fit::UvRect;

pub const DRIVER_SIDE_LOGO: UvRect = UvRect {
    min_u: 0.55,
    min_v: 0.10,
    max_u: 0.95,
    max_v: 0.30,
};
pub const PASSENGER_SIDE_LOGO: UvRect = UvRect {
    min_u: 0.55,
    min_v: 0.40,
    max_u: 0.95,
    max_v: 0.60,
};
pub const REAR_LOGO: UvRect = UvRect {
    min_u: 0.10,
    min_v: 0.70,
    max_u: 0.40,
    max_v: 0.90,
};
pub const FRONT_LOGO: UvRect = UvRect {
    min_u: 0.60,
    min_v: 0.70,
    max_u: 0.90,
    max_v: 0.95,
};

const BODY_PANEL: UvRect = UvRect {
    min_u: 0.0,
    min_v: 0.0,
    max_u: 0.5,
    max_v: 0.6,
};

pub struct DemoMaterials {
    pub logo: MaterialId,
    pub capa: MaterialId,
    pub rubber: MaterialId,
}

pub fn vehicle_demo() -> ModelRoot {
    vehicle_demo_with_materials().0
}

pub fn vehicle_demo_with_materials() -> (ModelRoot, DemoMaterials) {
    let mut root = ModelRoot::new("demo_vehicle");
    let logo = root.add_material(Material::new("Logo", [0.8, 0.1, 0.1]));
    let capa = root.add_material(Material::new("Capa", [0.4, 0.4, 0.4]));
    let rubber = root.add_material(Material::new("Rubber", [0.05, 0.05, 0.05]));

    let chassis = root.add_group(None, "Chassis");
    let body = root.add_group(None, "Body");

    root.add_mesh(
        Some(body),
        "Body_Driver",
        Some(Geometry::from_quads(&[(BODY_PANEL, 0), (DRIVER_SIDE_LOGO, 1)])),
        vec![capa, logo],
    );
    root.add_mesh(
        Some(body),
        "Body_Passenger",
        Some(Geometry::from_quads(&[(BODY_PANEL, 0), (PASSENGER_SIDE_LOGO, 1)])),
        vec![capa, logo],
    );
    let mut rear = Geometry::quad(REAR_LOGO);
    rear.groups.clear();
    rear.index = None;
    root.add_mesh(Some(body), "Rear", Some(rear), vec![logo]);
    root.add_mesh(
        Some(chassis),
        "Front",
        Some(Geometry::quad(FRONT_LOGO)),
        vec![logo],
    );
    root.add_mesh(
        Some(chassis),
        "Wheels",
        Some(Geometry::quad(BODY_PANEL)),
        vec![rubber],
    );

    (root, DemoMaterials { logo, capa, rubber })
}
