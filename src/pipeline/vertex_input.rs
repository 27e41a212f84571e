//! Vertex input state as plain data.
//!
//! Bindings and attributes are described by an ordered list of structs instead of
//! per-type description methods, so a vertex layout can be assembled, inspected and
//! tested without touching Vulkan. By convention, per-vertex data lives in binding
//! 0 and per-instance data in binding 1, matching [`Model::draw`](crate::Model::draw).

use ash::vk;

/// One vertex attribute inside a [`VertexBinding`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// Attribute format, e.g. `R32G32B32_SFLOAT` for a `vec3`.
    pub format: vk::Format,
    /// Byte offset inside one element of the binding.
    pub offset: u32,
}

/// One vertex buffer binding with its attributes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexBinding {
    /// Binding number the buffer is bound to at draw time.
    pub binding: u32,
    /// Byte stride between consecutive elements.
    pub stride: u32,
    /// True to advance per instance instead of per vertex.
    pub per_instance: bool,
    /// Attributes sourced from this binding, in declaration order.
    pub attributes: Vec<VertexAttribute>,
}

/// Complete vertex input state: an ordered list of bindings.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VertexInput {
    bindings: Vec<VertexBinding>,
}

impl VertexInput {
    /// Describe a vertex layout from an ordered list of bindings.
    pub fn new(bindings: Vec<VertexBinding>) -> Self {
        VertexInput {
            bindings,
        }
    }

    /// Flatten into Vulkan binding descriptions.
    pub fn binding_descriptions(&self) -> Vec<vk::VertexInputBindingDescription> {
        self.bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: if binding.per_instance {
                    vk::VertexInputRate::INSTANCE
                } else {
                    vk::VertexInputRate::VERTEX
                },
            })
            .collect()
    }

    /// Flatten into Vulkan attribute descriptions.
    pub fn attribute_descriptions(&self) -> Vec<vk::VertexInputAttributeDescription> {
        self.bindings
            .iter()
            .flat_map(|binding| {
                binding
                    .attributes
                    .iter()
                    .map(|attribute| vk::VertexInputAttributeDescription {
                        location: attribute.location,
                        binding: binding.binding,
                        format: attribute.format,
                        offset: attribute.offset,
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_layout() -> VertexInput {
        VertexInput::new(vec![
            VertexBinding {
                binding: 0,
                stride: 32,
                per_instance: false,
                attributes: vec![
                    VertexAttribute {
                        location: 0,
                        format: vk::Format::R32G32B32_SFLOAT,
                        offset: 0,
                    },
                    VertexAttribute {
                        location: 1,
                        format: vk::Format::R32G32B32_SFLOAT,
                        offset: 12,
                    },
                    VertexAttribute {
                        location: 2,
                        format: vk::Format::R32G32_SFLOAT,
                        offset: 24,
                    },
                ],
            },
            VertexBinding {
                binding: 1,
                stride: 12,
                per_instance: true,
                attributes: vec![VertexAttribute {
                    location: 3,
                    format: vk::Format::R32G32B32_SFLOAT,
                    offset: 0,
                }],
            },
        ])
    }

    #[test]
    fn bindings_flatten_in_order() {
        let layout = cube_layout();
        let bindings = layout.binding_descriptions();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].input_rate, vk::VertexInputRate::VERTEX);
        assert_eq!(bindings[1].input_rate, vk::VertexInputRate::INSTANCE);
        assert_eq!(bindings[1].stride, 12);
    }

    #[test]
    fn attributes_keep_their_binding_and_offsets() {
        let layout = cube_layout();
        let attributes = layout.attribute_descriptions();
        assert_eq!(attributes.len(), 4);
        assert_eq!(attributes[2].offset, 24);
        assert_eq!(attributes[2].binding, 0);
        // The instance attribute belongs to binding 1 at its own location.
        assert_eq!(attributes[3].binding, 1);
        assert_eq!(attributes[3].location, 3);
    }
}
