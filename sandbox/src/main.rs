// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Strata Sandbox
// Syncs a handful of meshes through several frames on the host backend.

mod scene;

use anyhow::{Context, Result};
use scene::{cube, quad, translation, MeshPrim, SceneResources, Stage};
use std::sync::Arc;
use strata_agents::{ResourceRegistry, SyncAgent};
use strata_core::{DirtyBits, PrimPath, RprimCollection, StrataConfig};
use strata_data::ChangeTracker;
use strata_infra::HostBackend;
use strata_telemetry::TelemetryService;

fn load_config() -> Result<StrataConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading configuration from {path}"))?;
            Ok(StrataConfig::from_ron_str(&text)?)
        }
        None => Ok(StrataConfig::default()),
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = load_config()?;

    let telemetry = Arc::new(TelemetryService::new());
    let backend = Arc::new(HostBackend::new());
    let registry = Arc::new(ResourceRegistry::new(
        backend.clone(),
        &config.resources,
        telemetry.clone(),
    ));
    let mut tracker = ChangeTracker::new(telemetry.clone());
    let mut stage = Stage::default();
    let mut resources = SceneResources::new(registry.clone());

    // --- Scene: four cubes sharing one topology and a ground quad ---
    let mut cubes = Vec::new();
    for i in 0..4 {
        let id = PrimPath::new(format!("/world/cube{i}"));
        let (topology, points) = cube();
        stage.insert(
            id.clone(),
            MeshPrim {
                topology,
                points,
                transform: translation(i as f32 * 2.0, 0.0, 0.0),
                color: [0.8, 0.2, 0.2, 1.0],
                opacity: None,
            },
        );
        tracker.rprim_inserted(id.clone(), DirtyBits::ALL_DIRTY);
        cubes.push(id);
    }
    let ground = PrimPath::new("/world/ground");
    let (topology, points) = quad();
    stage.insert(
        ground.clone(),
        MeshPrim {
            topology,
            points,
            transform: translation(0.0, -1.0, 0.0),
            color: [0.3, 0.3, 0.3, 1.0],
            opacity: None,
        },
    );
    tracker.rprim_inserted(ground.clone(), DirtyBits::ALL_DIRTY);

    let mut agent = SyncAgent::new(
        RprimCollection::new("geometry", "refined"),
        &mut tracker,
        config.sync.clone(),
        telemetry.clone(),
    )
    .with_resource_registry(registry.clone());

    for frame in 0..6 {
        match frame {
            1 | 2 => {
                // Two cubes bob up and down.
                for id in &cubes[..2] {
                    if let Some(prim) = stage.prim_mut(id) {
                        prim.transform[13] = frame as f32 * 0.5;
                    }
                    tracker.mark_rprim_dirty(id, DirtyBits::DIRTY_TRANSFORM)?;
                }
            }
            3 => {
                // The ground gains an opacity primvar.
                if let Some(prim) = stage.prim_mut(&ground) {
                    prim.opacity = Some(0.5);
                }
                tracker.mark_rprim_dirty(&ground, DirtyBits::DIRTY_PRIMVAR)?;
            }
            4 => {
                stage.remove(&cubes[3]);
                resources.remove(&cubes[3]);
                tracker.rprim_removed(&cubes[3]);
            }
            _ => {}
        }

        let mut delegate = resources.delegate(&stage);
        let report = agent.run(&mut tracker, &stage, &mut delegate)?;
        log::info!(
            "frame {frame}: {} dirty, {} synced, {} skipped, gc = {}",
            report.dirty_list_size,
            report.synced,
            report.skipped,
            report.garbage_collected
        );
    }

    for id in &cubes[..3] {
        log::info!(
            "{id}: transform {:?}, {} triangles",
            resources.device_transform(id).map(|m| [m[12], m[13], m[14]]),
            resources.device_triangle_count(id).unwrap_or_default()
        );
    }
    let allocation = registry.resource_allocation();
    log::info!("resource allocation: {allocation:?}");
    log::info!("backend: {:?}", backend.stats());
    Ok(())
}
