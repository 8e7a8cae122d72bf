//! Builds playback SLAM components from a recorded session.

use std::sync::Arc;

use anyhow::{Result, ensure};
use tracing::debug;

use crate::config::DynamicOptions;
use crate::io::ReplayDataset;
use crate::keyframes::{KeyframeManagerOptions, KeyframeStore};
use crate::mapping::VolumeSpec;
use crate::system::{SlamComponents, SlamFactory};

use super::mapper::{PlaybackScene, PointCloudMapper, SharedScene};
use super::tracker::{PlaybackInitializer, PlaybackTracker};

pub struct PlaybackFactory {
    dataset: Arc<ReplayDataset>,
}

impl PlaybackFactory {
    pub fn new(dataset: Arc<ReplayDataset>) -> Self {
        Self { dataset }
    }
}

impl SlamFactory for PlaybackFactory {
    fn build(
        &mut self,
        dynamic: &DynamicOptions,
        volume: &VolumeSpec,
        keyframes: &KeyframeManagerOptions,
    ) -> Result<SlamComponents> {
        ensure!(!self.dataset.is_empty(), "replay has no frames");
        debug!(
            "building playback SLAM (new tracker: {}, new mapper: {})",
            dynamic.new_tracker_is_on, dynamic.new_mapper_is_on
        );
        let scene = SharedScene::new();
        Ok(SlamComponents {
            tracker: Box::new(PlaybackTracker::new(Arc::clone(&self.dataset))),
            initializer: Box::new(PlaybackInitializer::new(Arc::clone(&self.dataset), *volume)),
            mapper: Box::new(PointCloudMapper::new(scene.clone())),
            scene: Box::new(PlaybackScene::new(scene)),
            keyframes: Box::new(KeyframeStore::new(*keyframes)),
        })
    }
}
