pub mod accessor;
pub mod builder;
pub mod import;

pub use builder::DocumentBuilder;

use thiserror::Error;

/// Scalar type of each component of an accessor element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    pub fn is_float(self) -> bool {
        self == Self::F32
    }

    /// 8 and 16 bit integers, which get widened to u32 on load.
    pub fn is_narrow_integer(self) -> bool {
        matches!(self, Self::I8 | Self::U8 | Self::I16 | Self::U16)
    }
}

/// Shape of one accessor element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    /// Number of components in one element.
    pub fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

/// A typed view into a buffer view.
#[derive(Clone, Debug, PartialEq)]
pub struct Accessor {
    /// `None` for sparse-only accessors, which aren't supported.
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub count: usize,
    pub component_type: ComponentType,
    pub element_type: ElementType,
}

impl Accessor {
    /// Size of one tightly packed element in bytes.
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.element_type.components()
    }
}

/// A byte range of one backing buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    /// Distance between elements for interleaved data.
    pub byte_stride: Option<usize>,
}

/// How a node's local transform is given.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeTransform {
    /// Column-major matrix.
    Matrix([[f32; 4]; 4]),
    /// Applied as `translation * rotation * scale`. Rotation is `[x, y, z, w]`.
    Decomposed {
        translation: [f32; 3],
        rotation: [f32; 4],
        scale: [f32; 3],
    },
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Decomposed {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub transform: NodeTransform,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
}

impl Node {
    /// A node with the given transform and no children or mesh.
    pub fn with_transform(transform: NodeTransform) -> Self {
        Self {
            transform,
            ..Default::default()
        }
    }

    /// A node only offset by `translation`.
    pub fn with_translation(translation: [f32; 3]) -> Self {
        Self::with_transform(NodeTransform::Decomposed {
            translation,
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        })
    }
}

/// Accessor indices of one drawable unit of a mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshPrimitive {
    pub position: Option<usize>,
    pub normal: Option<usize>,
    pub tangent: Option<usize>,
    pub tex_coord: Option<usize>,
    pub color: Option<usize>,
    /// Non-indexed geometry gets sequential indices generated on load.
    pub indices: Option<usize>,
    pub material: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub primitives: Vec<MeshPrimitive>,
}

/// Only the material fields this crate reads.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub emissive_strength: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            emissive_strength: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationChannel {
    pub sampler: usize,
    pub target_node: Option<usize>,
    /// `translation`, `rotation`, `scale` or `weights`.
    pub target_path: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationSampler {
    /// Keyframe times accessor.
    pub input: usize,
    /// Keyframe values accessor.
    pub output: usize,
    /// `LINEAR`, `STEP` or `CUBICSPLINE`.
    pub interpolation: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Animation {
    pub channels: Vec<AnimationChannel>,
    pub samplers: Vec<AnimationSampler>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

/// An already parsed 3D asset.
#[derive(Clone, Debug, Default)]
pub struct AssetDocument {
    /// Used for buffer and BLAS labels.
    pub name: String,
    pub buffers: Vec<Vec<u8>>,
    pub buffer_views: Vec<BufferView>,
    pub accessors: Vec<Accessor>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub animations: Vec<Animation>,
    pub scenes: Vec<Scene>,
    pub default_scene: Option<usize>,
}

impl AssetDocument {
    /// The root nodes of the default scene, or of the first scene if none is marked default.
    pub fn root_nodes(&self) -> Result<&[usize], AssetError> {
        let index = self.default_scene.unwrap_or(0);
        self.scenes
            .get(index)
            .map(|scene| scene.nodes.as_slice())
            .ok_or(AssetError::SceneNotFound(index))
    }

    /// Get an accessor.
    pub fn accessor(&self, index: usize) -> Result<&Accessor, AssetError> {
        self.accessors
            .get(index)
            .ok_or(AssetError::AccessorNotFound(index))
    }
}

/// The asset is malformed or inconsistent with itself.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Couldn't find accessor of index {0}")]
    AccessorNotFound(usize),
    #[error("Accessor {0} has no buffer view (sparse accessors aren't supported)")]
    MissingBufferView(usize),
    #[error("Couldn't find buffer view {view} of accessor {accessor}")]
    BufferViewNotFound { accessor: usize, view: usize },
    #[error("Couldn't find buffer {buffer} of buffer view {view}")]
    BufferNotFound { view: usize, buffer: usize },
    #[error("Accessor {accessor} reads up to byte {end} but only {available} are available")]
    AccessorOutOfBounds {
        accessor: usize,
        end: usize,
        available: usize,
    },
    #[error("Accessor {accessor} has stride {stride}, smaller than its {element_size} byte elements")]
    InvalidStride {
        accessor: usize,
        stride: usize,
        element_size: usize,
    },
    #[error("Accessor {accessor} has {actual} byte elements, expected {expected}")]
    ElementSizeMismatch {
        accessor: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Accessor {0} isn't a scalar integer accessor")]
    NotAnIndexAccessor(usize),
    #[error("Couldn't find scene of index {0}")]
    SceneNotFound(usize),
    #[error("Couldn't find node of index {0}")]
    NodeNotFound(usize),
    #[error("Node {0} is reached more than once while walking the hierarchy")]
    NodeReachedTwice(usize),
    #[error("Couldn't find mesh {mesh} of node {node}")]
    MeshNotFound { node: usize, mesh: usize },
    #[error("Mesh {0} has no primitives")]
    EmptyMesh(usize),
    #[error("Primitive {primitive} of mesh {mesh} has no positions")]
    MissingPositions { mesh: usize, primitive: usize },
    #[error("Couldn't find material {material} of primitive {primitive} of mesh {mesh}")]
    MaterialNotFound {
        mesh: usize,
        primitive: usize,
        material: usize,
    },
    #[error("Index {index} in accessor {accessor} is out of range of {vertex_count} vertices")]
    VertexIndexOutOfRange {
        accessor: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("Couldn't find sampler {sampler} of animation {animation}")]
    SamplerNotFound { animation: usize, sampler: usize },
    #[error("Sampler {sampler} of animation {animation} has no keyframes")]
    EmptySampler { animation: usize, sampler: usize },
    #[error("Sampler {sampler} of animation {animation} has {values} values for {times} keyframes")]
    KeyframeCountMismatch {
        animation: usize,
        sampler: usize,
        times: usize,
        values: usize,
    },
    #[error("Channel {channel} of animation {animation} targets node {node} but there are only {node_count}")]
    ChannelTargetOutOfRange {
        animation: usize,
        channel: usize,
        node: usize,
        node_count: usize,
    },
}
