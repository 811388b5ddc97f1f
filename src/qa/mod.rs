//! Verification harness for the logo slots: enumerate, force preferences,
//! re-apply and check what actually ended up in the texture matrices.

use crate::engine::{apply_rotation_to_instance, instance_texture, LiveryEngine};
use crate::fit::instance_footprint;
use crate::instances::signature;
use crate::rotation::{normalize_degrees, quarter_turn_index, read_rotation_degrees};
use crate::scene::ModelRoot;
use glam::Vec2;
use std::collections::BTreeMap;

pub const DEFAULT_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMapping {
    pub index: usize,
    pub signature: String,
    pub mesh_name: String,
    pub material_slot_index: usize,
    pub material_name: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDetail {
    pub idx: usize,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub q_now: Option<u8>,
    pub q_exp: u8,
    pub center_dx: Option<f32>,
    pub center_dy: Option<f32>,
    pub sig: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VerifyReport {
    pub pass: usize,
    pub fail: usize,
    pub total: usize,
    pub details: Vec<VerifyDetail>,
}

impl VerifyReport {
    pub fn all_passed(&self) -> bool {
        self.fail == 0
    }
}

pub struct LogosQa<'a> {
    engine: &'a mut LiveryEngine,
    root: &'a mut ModelRoot,
}

impl<'a> LogosQa<'a> {
    pub(crate) fn new(engine: &'a mut LiveryEngine, root: &'a mut ModelRoot) -> Self {
        Self { engine, root }
    }

    /// Lists every logo instance and persists the listing as a snapshot.
    pub fn map(&mut self) -> Vec<InstanceMapping> {
        let mapping: Vec<InstanceMapping> = self
            .engine
            .logo_instances(self.root)
            .iter()
            .enumerate()
            .map(|(index, instance)| InstanceMapping {
                index,
                signature: signature(self.root, instance),
                mesh_name: self
                    .root
                    .mesh(instance.mesh)
                    .map(|mesh| mesh.name.clone())
                    .unwrap_or_default(),
                material_slot_index: instance.slot,
                material_name: self
                    .root
                    .material(instance.material)
                    .map(|material| material.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        self.engine.save_snapshot(&mapping);
        log::info!("Mapped {} logo instance(s)", mapping.len());
        mapping
    }

    /// Records `quarter_turns * 90` for each listed index. Returns `false`
    /// if any index is out of range or any write did not reach the store;
    /// the remaining entries are still applied.
    pub fn set_prefs_by_idx(&mut self, prefs: &BTreeMap<usize, i32>) -> bool {
        let list = self.engine.logo_instances(self.root);
        let mut ok = true;
        for (&index, &quarter_turns) in prefs {
            let Some(instance) = list.get(index) else {
                log::warn!("No logo instance at index {}", index);
                ok = false;
                continue;
            };
            let degrees = normalize_degrees(quarter_turns as f32 * 90.0);
            let sig = signature(self.root, instance);
            ok &= self.engine.record_rotation(&sig, degrees);
        }
        ok
    }

    /// Re-fits every assigned image and re-applies the effective rotation.
    pub fn reapply(&mut self) -> bool {
        let list = self.engine.logo_instances(self.root);
        let mut ok = true;
        for (index, instance) in list.iter().enumerate() {
            if let Some(assignment) = self.engine.assignment(&instance.key()).cloned() {
                if self
                    .engine
                    .fit_and_rotate(self.root, index, instance, &assignment.texture, assignment.options)
                    .is_err()
                {
                    ok = false;
                }
                continue;
            }
            let sig = signature(self.root, instance);
            let degrees = self.engine.effective_rotation_for(&sig, index);
            if let Err(err) = apply_rotation_to_instance(self.root, instance, degrees) {
                log::warn!("Could not rotate logo instance {}: {}", index, err);
                ok = false;
            }
        }
        ok
    }

    /// Compares each slot's live texture with its expected state.
    pub fn verify(&self, tolerance: f32) -> VerifyReport {
        let tolerance = if tolerance.is_finite() && tolerance > 0.0 {
            tolerance
        } else {
            DEFAULT_TOLERANCE
        };
        let list = self.engine.logo_instances(self.root);
        let mut details = Vec::with_capacity(list.len());
        for (index, instance) in list.iter().enumerate() {
            let sig = signature(self.root, instance);
            let q_exp = quarter_turn_index(self.engine.effective_rotation_for(&sig, index));
            let mut detail = VerifyDetail {
                idx: index,
                ok: false,
                reason: None,
                q_now: None,
                q_exp,
                center_dx: None,
                center_dy: None,
                sig,
            };

            let Some(texture) = instance_texture(self.root, instance) else {
                detail.reason = Some("no texture".to_string());
                details.push(detail);
                continue;
            };
            let Some(bounds) = texture.fit else {
                detail.reason = Some("texture is not fitted".to_string());
                details.push(detail);
                continue;
            };
            let q_now = quarter_turn_index(read_rotation_degrees(texture));
            detail.q_now = Some(q_now);

            let mut problems = Vec::new();
            if q_now != q_exp {
                problems.push(format!("quarter turn {} but expected {}", q_now, q_exp));
            }
            match instance_footprint(self.root, instance) {
                Ok(footprint) => {
                    let expected = footprint.center();
                    let dx = (bounds.center_u - expected.x).abs();
                    let dy = (bounds.center_v - expected.y).abs();
                    detail.center_dx = Some(dx);
                    detail.center_dy = Some(dy);
                    if dx > tolerance || dy > tolerance {
                        problems.push(format!("fit center off by ({:.5}, {:.5})", dx, dy));
                    }
                }
                Err(err) => problems.push(err.to_string()),
            }
            let pivot = texture.uv_matrix().transform_point2(bounds.center());
            let drift = (pivot - Vec2::splat(0.5)).abs().max_element();
            if drift > tolerance {
                problems.push(format!("footprint center maps {:.5} away from the pivot", drift));
            }

            detail.ok = problems.is_empty();
            if !detail.ok {
                detail.reason = Some(problems.join("; "));
            }
            details.push(detail);
        }

        let pass = details.iter().filter(|detail| detail.ok).count();
        let report = VerifyReport {
            pass,
            fail: details.len() - pass,
            total: details.len(),
            details,
        };
        log::info!(
            "Verified {} logo instance(s): {} pass, {} fail",
            report.total,
            report.pass,
            report.fail
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::DEFAULT_TOLERANCE;
    use crate::assets::RawTexture;
    use crate::config::LiveryConfig;
    use crate::engine::LiveryEngine;
    use crate::fit::FitOptions;
    use crate::prefs::MemoryStore;
    use crate::scene::demo::vehicle_demo;
    use crate::scene::ModelRoot;
    use std::collections::BTreeMap;

    fn fitted_demo(engine: &mut LiveryEngine) -> ModelRoot {
        let mut root = vehicle_demo();
        let raw = RawTexture::solid("logo.png", 16, 8, [255, 255, 255, 255]);
        for index in 0..4 {
            engine
                .fit_image_to_instance(&mut root, index, &raw, FitOptions::default())
                .unwrap();
        }
        root
    }

    fn prefs() -> BTreeMap<usize, i32> {
        BTreeMap::from([(0, 1), (1, 2), (2, 0), (3, 3)])
    }

    #[test]
    fn full_sequence_passes() {
        let mut engine = LiveryEngine::in_memory(LiveryConfig::default());
        let mut root = fitted_demo(&mut engine);
        let mut qa = engine.qa(&mut root);

        let mapping = qa.map();
        assert_eq!(mapping.len(), 4);
        assert_eq!(mapping[0].mesh_name, "Body_Driver");
        assert_eq!(mapping[0].material_slot_index, 1);
        assert_eq!(mapping[2].mesh_name, "Rear");

        assert!(qa.set_prefs_by_idx(&prefs()));
        assert!(qa.reapply());
        let report = qa.verify(DEFAULT_TOLERANCE);
        assert_eq!((report.pass, report.fail, report.total), (4, 0, 4));
        let expected = [1u8, 2, 0, 3];
        for detail in &report.details {
            assert_eq!(detail.q_now, Some(expected[detail.idx]));
            assert_eq!(detail.q_exp, expected[detail.idx]);
            assert!(detail.center_dx.unwrap() <= DEFAULT_TOLERANCE);
        }
    }

    #[test]
    fn map_snapshot_is_persisted() {
        let mut engine = LiveryEngine::in_memory(LiveryConfig::default());
        let mut root = vehicle_demo();
        engine.qa(&mut root).map();
        let raw = engine.preferences().load_raw("logos:map").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 4);
        assert_eq!(value[3]["meshName"], "Front");
        assert_eq!(value[3]["materialSlotIndex"], 0);
    }

    #[test]
    fn stale_matrix_is_reported_before_reapply() {
        let mut engine = LiveryEngine::in_memory(LiveryConfig::default());
        let mut root = fitted_demo(&mut engine);
        let mut qa = engine.qa(&mut root);
        assert!(qa.set_prefs_by_idx(&prefs()));
        let report = qa.verify(DEFAULT_TOLERANCE);
        // Only the driver side already sits at its new angle.
        assert!(report.details[0].ok);
        assert!(!report.details[1].ok);
        assert_eq!(report.fail, 3);
        assert!(report.details[1]
            .reason
            .as_deref()
            .unwrap()
            .contains("quarter turn 1 but expected 2"));
        assert!(qa.reapply());
        assert_eq!(qa.verify(DEFAULT_TOLERANCE).fail, 0);
    }

    #[test]
    fn slots_without_texture_fail_with_a_reason() {
        let mut engine = LiveryEngine::in_memory(LiveryConfig::default());
        let mut root = vehicle_demo();
        let qa = engine.qa(&mut root);
        let report = qa.verify(DEFAULT_TOLERANCE);
        assert_eq!(report.fail, 4);
        assert_eq!(report.details[0].reason.as_deref(), Some("no texture"));
        assert_eq!(report.details[0].q_now, None);
        assert_eq!(report.details[0].q_exp, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["details"][0]["qNow"], serde_json::Value::Null);
        assert_eq!(json["details"][0]["qExp"], 1);
    }

    #[test]
    fn out_of_range_index_reports_false_but_applies_the_rest() {
        let mut engine = LiveryEngine::in_memory(LiveryConfig::default());
        let mut root = fitted_demo(&mut engine);
        let mut qa = engine.qa(&mut root);
        assert!(!qa.set_prefs_by_idx(&BTreeMap::from([(0, 2), (9, 1)])));
        assert!(qa.reapply());
        assert_eq!(qa.verify(DEFAULT_TOLERANCE).details[0].q_now, Some(2));
    }

    #[test]
    fn quota_failure_is_reported_but_session_holds() {
        let mut engine =
            LiveryEngine::new(LiveryConfig::default(), Box::new(MemoryStore::with_quota(0)));
        let mut root = fitted_demo(&mut engine);
        let mut qa = engine.qa(&mut root);
        assert!(!qa.set_prefs_by_idx(&prefs()));
        assert!(qa.reapply());
        assert_eq!(qa.verify(DEFAULT_TOLERANCE).pass, 4);
    }

    #[test]
    fn preferences_win_over_defaults_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        {
            let mut engine = LiveryEngine::new(
                LiveryConfig::default(),
                Box::new(crate::prefs::FileStore::open(&path).unwrap()),
            );
            let mut root = fitted_demo(&mut engine);
            assert!(engine.qa(&mut root).set_prefs_by_idx(&prefs()));
        }
        let mut engine = LiveryEngine::new(
            LiveryConfig::default(),
            Box::new(crate::prefs::FileStore::open(&path).unwrap()),
        );
        let mut root = fitted_demo(&mut engine);
        let report = engine.qa(&mut root).verify(DEFAULT_TOLERANCE);
        assert_eq!(report.pass, 4);
        let quarters: Vec<Option<u8>> = report.details.iter().map(|d| d.q_now).collect();
        assert_eq!(quarters, vec![Some(1), Some(2), Some(0), Some(3)]);
    }
}
