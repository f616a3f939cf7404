use std::collections::HashMap;
use std::path::PathBuf;

use crate::foundation::core::Quat;
use crate::foundation::error::{ReplayError, ReplayResult};
use crate::replay::keyframe::{AssetInfo, CreationInfo};
use crate::replay::manager::{ReplayConfig, ReplayManager};
use crate::replay::recorder::FlushStats;
use crate::scene::graph::SceneGraph;
use crate::scene::host::{NodeId, SceneHost};
use crate::script::model::{ReplayScript, ScriptStep};

/// What a script run produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Steps executed.
    pub steps: usize,
    /// Instances registered with the recorder.
    pub instances_created: usize,
    /// Keyframes saved.
    pub keyframes_saved: usize,
    /// Documents from `flush` steps without a path, in order.
    pub documents: Vec<String>,
    /// Files written by `flush` steps with a path.
    pub files: Vec<(PathBuf, FlushStats)>,
}

/// Drives a [`SceneGraph`] and a [`ReplayManager`] from a [`ReplayScript`].
pub struct ScriptRunner {
    graph: SceneGraph,
    manager: ReplayManager,
    nodes: HashMap<String, NodeId>,
    base_dir: PathBuf,
}

impl ScriptRunner {
    /// Create a runner; relative flush paths resolve against `base_dir`.
    pub fn new(config: ReplayConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            graph: SceneGraph::new(),
            manager: ReplayManager::new(config),
            nodes: HashMap::new(),
            base_dir: base_dir.into(),
        }
    }

    /// Create a runner configured by `script.config`, or by defaults when it has none.
    pub fn from_script(script: &ReplayScript, base_dir: impl Into<PathBuf>) -> Self {
        Self::new(script.config.clone().unwrap_or_default(), base_dir)
    }

    /// The scene being driven.
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The replay manager being driven.
    pub fn manager(&self) -> &ReplayManager {
        &self.manager
    }

    /// Mutable access to the replay manager, e.g. for a final flush.
    pub fn manager_mut(&mut self) -> &mut ReplayManager {
        &mut self.manager
    }

    /// Run every step of `script`, stopping at the first error.
    pub fn run(&mut self, script: &ReplayScript) -> ReplayResult<RunSummary> {
        let mut summary = RunSummary::default();
        for (i, step) in script.steps.iter().enumerate() {
            self.run_step(step, &mut summary).map_err(|e| match e {
                ReplayError::Validation(msg) => {
                    ReplayError::validation(format!("step {i}: {msg}"))
                }
                ReplayError::Scene(msg) => ReplayError::scene(format!("step {i}: {msg}")),
                other => other,
            })?;
            summary.steps += 1;
        }
        tracing::info!(
            steps = summary.steps,
            instances = summary.instances_created,
            keyframes = summary.keyframes_saved,
            "script finished"
        );
        Ok(summary)
    }

    /// Run a single step.
    pub fn run_step(&mut self, step: &ScriptStep, summary: &mut RunSummary) -> ReplayResult<()> {
        match step {
            ScriptStep::LoadAsset { asset_info } => {
                self.manager
                    .on_load_render_asset(AssetInfo::from_value(asset_info.clone()));
            }
            ScriptStep::CreateNode {
                name,
                parent,
                translation,
                rotation,
                scale,
                semantic_id,
            } => {
                if self
                    .nodes
                    .get(name)
                    .is_some_and(|id| self.graph.is_alive(*id))
                {
                    return Err(ReplayError::validation(format!(
                        "node name '{name}' is already in use"
                    )));
                }
                let parent = parent.as_deref().map(|p| self.node(p)).transpose()?;
                let id = self.graph.create_node(parent)?;
                if let Some(t) = translation {
                    self.graph.set_translation(id, *t)?;
                }
                if let Some(r) = rotation {
                    self.graph.set_rotation(id, r.0)?;
                }
                if let Some(s) = scale {
                    self.graph.set_scale(id, *s)?;
                }
                if let Some(sid) = semantic_id {
                    self.graph.set_semantic_id(id, *sid)?;
                }
                self.nodes.insert(name.clone(), id);
            }
            ScriptStep::CreateInstance { node, creation } => {
                let id = self.node(node)?;
                if self.manager.recorder().is_some_and(|r| r.find_instance(id).is_some()) {
                    return Err(ReplayError::validation(format!(
                        "node '{node}' is already an instance"
                    )));
                }
                let key = self.manager.on_create_render_asset_instance(
                    &mut self.graph,
                    id,
                    CreationInfo::from_value(creation.clone()),
                );
                if key.is_some() {
                    summary.instances_created += 1;
                }
            }
            ScriptStep::SetTransform {
                node,
                translation,
                rotation,
            } => {
                let id = self.node(node)?;
                if let Some(t) = translation {
                    self.graph.set_translation(id, *t)?;
                }
                if let Some(r) = rotation {
                    self.graph.set_rotation(id, r.0)?;
                }
            }
            ScriptStep::Translate { node, delta } => {
                let id = self.node(node)?;
                self.graph.translate(id, *delta)?;
            }
            ScriptStep::SetSemanticId { node, semantic_id } => {
                let id = self.node(node)?;
                self.graph.set_semantic_id(id, *semantic_id)?;
            }
            ScriptStep::DestroyNode { node } => {
                let id = self.node(node)?;
                self.graph.destroy_node(id)?;
                self.nodes.remove(node);
            }
            ScriptStep::UserTransform {
                name,
                translation,
                rotation,
            } => {
                let rotation = rotation.map_or(Quat::IDENTITY, |r| r.0);
                self.manager
                    .add_user_transform_to_keyframe(name.clone(), *translation, rotation);
            }
            ScriptStep::Save => {
                self.manager.save_keyframe(&self.graph);
                if self.manager.recorder().is_some() {
                    summary.keyframes_saved += 1;
                }
            }
            ScriptStep::Flush { path: Some(path) } => {
                let path = self.base_dir.join(path);
                let stats = self.manager.write_saved_keyframes_to_file(&path)?;
                summary.files.push((path, stats));
            }
            ScriptStep::Flush { path: None } => {
                let doc = self.manager.write_saved_keyframes_to_string()?;
                summary.documents.push(doc);
            }
        }
        Ok(())
    }

    fn node(&self, name: &str) -> ReplayResult<NodeId> {
        let id = self
            .nodes
            .get(name)
            .copied()
            .ok_or_else(|| ReplayError::validation(format!("unknown node '{name}'")))?;
        if !self.graph.is_alive(id) {
            return Err(ReplayError::scene(format!(
                "node '{name}' was destroyed with its parent"
            )));
        }
        Ok(id)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/runner.rs"]
mod tests;
