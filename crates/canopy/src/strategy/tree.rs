use super::PositioningStrategy;
use crate::config::LayoutConfig;
use crate::coordinator::TreeCoordinator;
use crate::model::{PositioningContext, PositioningResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeMode {
    Full,
    #[default]
    Incremental,
}

/// Tidy-tree strategy backed by one persistent [`TreeCoordinator`].
#[derive(Debug)]
pub struct TidyTreeStrategy {
    coordinator: TreeCoordinator,
    mode: TreeMode,
}

impl TidyTreeStrategy {
    pub fn new(config: LayoutConfig, mode: TreeMode) -> Self {
        Self {
            coordinator: TreeCoordinator::new(config),
            mode,
        }
    }

    pub fn mode(&self) -> TreeMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TreeMode) {
        self.mode = mode;
    }

    pub fn coordinator(&self) -> &TreeCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut TreeCoordinator {
        &mut self.coordinator
    }
}

impl PositioningStrategy for TidyTreeStrategy {
    fn name(&self) -> &'static str {
        match self.mode {
            TreeMode::Full => "tidy-tree",
            TreeMode::Incremental => "tidy-tree-incremental",
        }
    }

    fn position(&mut self, context: &PositioningContext) -> PositioningResult {
        if context.new_nodes.is_empty() {
            return PositioningResult::default();
        }
        match self.mode {
            TreeMode::Full => self.coordinator.full_build(context),
            TreeMode::Incremental => self.coordinator.incremental_add(context),
        }
    }
}
