use std::path::Path;

use anyhow::Context;
use gltf::{
    accessor::{DataType, Dimensions},
    animation::{Interpolation, Property},
    mesh::Semantic,
    scene::Transform,
};

use crate::graphics::asset::{
    Accessor, Animation, AnimationChannel, AnimationSampler, AssetDocument, BufferView,
    ComponentType, ElementType, Material, Mesh, MeshPrimitive, Node, NodeTransform, Scene,
};

/// Load a glTF/GLB file (and its external buffers) into an `AssetDocument`.
pub fn import_gltf(path: impl AsRef<Path>) -> anyhow::Result<AssetDocument> {
    let path = path.as_ref();
    let (document, buffers, _images) =
        gltf::import(path).with_context(|| format!("Couldn't import {}", path.display()))?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gltf".to_string());

    let buffer_views = document
        .views()
        .map(|view| BufferView {
            buffer: view.buffer().index(),
            byte_offset: view.offset(),
            byte_length: view.length(),
            byte_stride: view.stride(),
        })
        .collect();

    let accessors = document
        .accessors()
        .map(|accessor| Accessor {
            buffer_view: accessor.view().map(|view| view.index()),
            byte_offset: accessor.offset(),
            count: accessor.count(),
            component_type: match accessor.data_type() {
                DataType::I8 => ComponentType::I8,
                DataType::U8 => ComponentType::U8,
                DataType::I16 => ComponentType::I16,
                DataType::U16 => ComponentType::U16,
                DataType::U32 => ComponentType::U32,
                DataType::F32 => ComponentType::F32,
            },
            element_type: match accessor.dimensions() {
                Dimensions::Scalar => ElementType::Scalar,
                Dimensions::Vec2 => ElementType::Vec2,
                Dimensions::Vec3 => ElementType::Vec3,
                Dimensions::Vec4 => ElementType::Vec4,
                Dimensions::Mat2 => ElementType::Mat2,
                Dimensions::Mat3 => ElementType::Mat3,
                Dimensions::Mat4 => ElementType::Mat4,
            },
        })
        .collect();

    let nodes = document
        .nodes()
        .map(|node| Node {
            transform: match node.transform() {
                Transform::Matrix { matrix } => NodeTransform::Matrix(matrix),
                Transform::Decomposed {
                    translation,
                    rotation,
                    scale,
                } => NodeTransform::Decomposed {
                    translation,
                    rotation,
                    scale,
                },
            },
            children: node.children().map(|child| child.index()).collect(),
            mesh: node.mesh().map(|mesh| mesh.index()),
        })
        .collect();

    let meshes = document
        .meshes()
        .map(|mesh| Mesh {
            primitives: mesh
                .primitives()
                .map(|primitive| MeshPrimitive {
                    position: primitive.get(&Semantic::Positions).map(|a| a.index()),
                    normal: primitive.get(&Semantic::Normals).map(|a| a.index()),
                    tangent: primitive.get(&Semantic::Tangents).map(|a| a.index()),
                    tex_coord: primitive.get(&Semantic::TexCoords(0)).map(|a| a.index()),
                    color: primitive.get(&Semantic::Colors(0)).map(|a| a.index()),
                    indices: primitive.indices().map(|a| a.index()),
                    material: primitive.material().index(),
                })
                .collect(),
        })
        .collect();

    let materials = document
        .materials()
        .map(|material| Material {
            emissive_strength: material.emissive_strength().unwrap_or(1.0),
        })
        .collect();

    let animations = document
        .animations()
        .map(|animation| Animation {
            channels: animation
                .channels()
                .map(|channel| AnimationChannel {
                    sampler: channel.sampler().index(),
                    target_node: Some(channel.target().node().index()),
                    target_path: match channel.target().property() {
                        Property::Translation => "translation",
                        Property::Rotation => "rotation",
                        Property::Scale => "scale",
                        Property::MorphTargetWeights => "weights",
                    }
                    .to_string(),
                })
                .collect(),
            samplers: animation
                .samplers()
                .map(|sampler| AnimationSampler {
                    input: sampler.input().index(),
                    output: sampler.output().index(),
                    interpolation: match sampler.interpolation() {
                        Interpolation::Linear => "LINEAR",
                        Interpolation::Step => "STEP",
                        Interpolation::CubicSpline => "CUBICSPLINE",
                    }
                    .to_string(),
                })
                .collect(),
        })
        .collect();

    let scenes = document
        .scenes()
        .map(|scene| Scene {
            nodes: scene.nodes().map(|node| node.index()).collect(),
        })
        .collect();

    Ok(AssetDocument {
        name,
        buffers: buffers.into_iter().map(|data| data.0).collect(),
        buffer_views,
        accessors,
        nodes,
        meshes,
        materials,
        animations,
        scenes,
        default_scene: document.default_scene().map(|scene| scene.index()),
    })
}
