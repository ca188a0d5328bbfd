//! Scene graph and hierarchical scene organization.
//!
//! Nodes are shared through [`ModelRef`] (an `Arc<Node>`). A template model handed
//! out by a resolver may be referenced by any number of parents at once, so it is
//! never mutated in place: callers that need to change a template first call
//! [`Node::deep_clone`], which duplicates the full subtree including every vertex
//! and primitive array. Mutating traversals ([`Node::visit_geodes_mut`]) go through
//! `Arc::make_mut`, so even a subtree that is still shared gets copied before it is
//! written to.

use std::sync::{Arc, OnceLock};

use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::model::{BoundingBox, Drawable};

/// Shared handle to a scene node.
pub type ModelRef = Arc<Node>;

/// Whether a node's contents are expected to change after construction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DataVariance {
    #[default]
    Unspecified,
    Static,
    Dynamic,
}

#[derive(Clone, Debug)]
pub enum Node {
    Container(ContainerNode),
    Transform(TransformNode),
    Geode(Geode),
}

/// Plain grouping node.
#[derive(Clone, Debug, Default)]
pub struct ContainerNode {
    pub name: Option<String>,
    pub children: Vec<ModelRef>,
}

impl ContainerNode {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Grouping node that places its children with a local matrix.
#[derive(Clone, Debug)]
pub struct TransformNode {
    pub name: Option<String>,
    pub matrix: Matrix4<f64>,
    pub data_variance: DataVariance,
    pub children: Vec<ModelRef>,
}

impl TransformNode {
    pub fn new(matrix: Matrix4<f64>) -> Self {
        Self {
            name: None,
            matrix,
            data_variance: DataVariance::Unspecified,
            children: Vec::new(),
        }
    }
}

/// Leaf node holding drawables.
#[derive(Clone, Debug, Default)]
pub struct Geode {
    pub name: Option<String>,
    drawables: Vec<Drawable>,
    bound: OnceLock<Option<BoundingBox>>,
}

impl Geode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drawable(mut self, drawable: impl Into<Drawable>) -> Self {
        self.add_drawable(drawable.into());
        self
    }

    pub fn add_drawable(&mut self, drawable: Drawable) {
        self.drawables.push(drawable);
        self.dirty_bound();
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    /// Mutable access to the drawables. The cached bound is invalidated.
    pub fn drawables_mut(&mut self) -> &mut Vec<Drawable> {
        self.dirty_bound();
        &mut self.drawables
    }

    /// Removes and returns every drawable, leaving the geode empty.
    pub fn take_drawables(&mut self) -> Vec<Drawable> {
        self.dirty_bound();
        std::mem::take(&mut self.drawables)
    }

    pub fn num_drawables(&self) -> usize {
        self.drawables.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.drawables
            .iter()
            .filter_map(Drawable::as_mesh)
            .map(|mesh| mesh.vertex_count())
            .sum()
    }

    /// Marks the cached bounding volume as stale.
    pub fn dirty_bound(&mut self) {
        self.bound = OnceLock::new();
    }

    /// Bounding box of all drawables, computed on first use after a change.
    pub fn bound(&self) -> Option<BoundingBox> {
        *self.bound.get_or_init(|| {
            self.drawables
                .iter()
                .filter_map(Drawable::bound)
                .reduce(|a, b| a.union(&b))
        })
    }
}

impl From<ContainerNode> for Node {
    fn from(node: ContainerNode) -> Self {
        Node::Container(node)
    }
}

impl From<TransformNode> for Node {
    fn from(node: TransformNode) -> Self {
        Node::Transform(node)
    }
}

impl From<Geode> for Node {
    fn from(geode: Geode) -> Self {
        Node::Geode(geode)
    }
}

impl Node {
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Container(n) => n.name.as_deref(),
            Node::Transform(n) => n.name.as_deref(),
            Node::Geode(n) => n.name.as_deref(),
        }
    }

    pub fn set_name(&mut self, name: &str) {
        let name = Some(name.to_string());
        match self {
            Node::Container(n) => n.name = name,
            Node::Transform(n) => n.name = name,
            Node::Geode(n) => n.name = name,
        }
    }

    pub fn children(&self) -> &[ModelRef] {
        match self {
            Node::Container(n) => &n.children,
            Node::Transform(n) => &n.children,
            Node::Geode(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<ModelRef>> {
        match self {
            Node::Container(n) => Some(&mut n.children),
            Node::Transform(n) => Some(&mut n.children),
            Node::Geode(_) => None,
        }
    }

    /// Appends `child`. Geodes cannot hold children; in that case the child is
    /// dropped and `false` is returned.
    pub fn add_child(&mut self, child: ModelRef) -> bool {
        match self.children_mut() {
            Some(children) => {
                children.push(child);
                true
            }
            None => {
                log::warn!(
                    "Tried to add a child to geode {:?}, which cannot hold children.",
                    self.name()
                );
                false
            }
        }
    }

    pub fn as_geode(&self) -> Option<&Geode> {
        match self {
            Node::Geode(geode) => Some(geode),
            _ => None,
        }
    }

    pub fn as_transform(&self) -> Option<&TransformNode> {
        match self {
            Node::Transform(transform) => Some(transform),
            _ => None,
        }
    }

    /// Local matrix this node applies to its children.
    pub fn local_matrix(&self) -> Matrix4<f64> {
        match self {
            Node::Transform(n) => n.matrix,
            _ => Matrix4::identity(),
        }
    }

    /// Duplicates the whole subtree. The copy shares no node, vertex array or
    /// primitive array with `self`; materials stay shared as they are immutable.
    pub fn deep_clone(&self) -> Node {
        let clone_children = |children: &[ModelRef]| {
            children
                .iter()
                .map(|child| Arc::new(child.deep_clone()))
                .collect::<Vec<_>>()
        };
        match self {
            Node::Container(n) => Node::Container(ContainerNode {
                name: n.name.clone(),
                children: clone_children(&n.children),
            }),
            Node::Transform(n) => Node::Transform(TransformNode {
                name: n.name.clone(),
                matrix: n.matrix,
                data_variance: n.data_variance,
                children: clone_children(&n.children),
            }),
            Node::Geode(geode) => Node::Geode(geode.clone()),
        }
    }

    /// Calls `f` on every geode in the subtree, depth first.
    ///
    /// Shared children are copied on write.
    pub fn visit_geodes_mut(&mut self, f: &mut dyn FnMut(&mut Geode)) {
        match self {
            Node::Geode(geode) => f(geode),
            Node::Container(ContainerNode { children, .. })
            | Node::Transform(TransformNode { children, .. }) => {
                for child in children.iter_mut() {
                    Arc::make_mut(child).visit_geodes_mut(f);
                }
            }
        }
    }

    /// Every geode in the subtree paired with its accumulated matrix relative to
    /// this node (this node's own matrix included).
    pub fn collect_geodes(&self) -> Vec<(Matrix4<f64>, &Geode)> {
        let mut geodes = Vec::new();
        self.collect_geodes_into(Matrix4::identity(), &mut geodes);
        geodes
    }

    fn collect_geodes_into<'a>(
        &'a self,
        parent: Matrix4<f64>,
        out: &mut Vec<(Matrix4<f64>, &'a Geode)>,
    ) {
        let world = parent * self.local_matrix();
        match self {
            Node::Geode(geode) => out.push((world, geode)),
            _ => self
                .children()
                .iter()
                .for_each(|child| child.collect_geodes_into(world, out)),
        }
    }

    /// Number of transform nodes in the subtree, this node included.
    pub fn count_transforms(&self) -> usize {
        let own = usize::from(matches!(self, Node::Transform(_)));
        own + self
            .children()
            .iter()
            .map(|child| child.count_transforms())
            .sum::<usize>()
    }

    /// Bounding box of the subtree in this node's parent frame.
    pub fn bound(&self) -> Option<BoundingBox> {
        match self {
            Node::Geode(geode) => geode.bound(),
            Node::Container(n) => n
                .children
                .iter()
                .filter_map(|child| child.bound())
                .reduce(|a, b| a.union(&b)),
            Node::Transform(n) => n
                .children
                .iter()
                .filter_map(|child| child.bound())
                .reduce(|a, b| a.union(&b))
                .map(|bb| bb.transformed(&n.matrix)),
        }
    }
}
