use crate::pose::{TransformComponents, WorldTransform};

/// A scene node whose world matrix is derived from its local components.
///
/// Renderers own the real node hierarchy; the pipeline only writes the root's
/// components and asks the node to refresh its world matrix.
pub trait TransformNode {
    fn components(&self) -> TransformComponents;

    fn set_components(&mut self, components: TransformComponents);

    /// Recompute the world matrix from the local components and the parent.
    fn update_transform(&mut self);

    /// World matrix as of the last [`TransformNode::update_transform`].
    fn world_transform(&self) -> WorldTransform;
}

/// Minimal node: `world = parent_world * T * R * S`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneNode {
    local: TransformComponents,
    parent_world: Option<WorldTransform>,
    world: WorldTransform,
}

impl SceneNode {
    pub fn new(local: TransformComponents) -> Self {
        let mut node = Self {
            local,
            parent_world: None,
            world: WorldTransform::identity(),
        };
        node.update_transform();
        node
    }

    /// Attach under a parent whose world matrix is `parent_world`.
    ///
    /// Takes effect on the next `update_transform`.
    pub fn set_parent_world(&mut self, parent_world: Option<WorldTransform>) {
        self.parent_world = parent_world;
    }
}

impl TransformNode for SceneNode {
    fn components(&self) -> TransformComponents {
        self.local
    }

    fn set_components(&mut self, components: TransformComponents) {
        self.local = components;
    }

    fn update_transform(&mut self) {
        let local = self.local.to_matrix();
        self.world = match &self.parent_world {
            Some(parent) => WorldTransform::new(parent.matrix * local),
            None => WorldTransform::new(local),
        };
    }

    fn world_transform(&self) -> WorldTransform {
        self.world
    }
}
