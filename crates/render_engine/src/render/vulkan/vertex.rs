//! Vertex format description
//!
//! A [`VertexFormat`] is an ordered list of attributes; element byte offsets
//! are computed by a running sum over the declaration order, and the total
//! stride is the sum of all attribute sizes. The format produces the Vulkan
//! binding and attribute descriptions consumed by pipeline creation and
//! defines the per-vertex float count the staging buffer expects.

use ash::vk;

/// A single vertex attribute with its format and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAttribute {
    /// One 32-bit float
    R32Sfloat,
    /// Two 32-bit floats
    R32g32Sfloat,
    /// Three 32-bit floats
    R32g32b32Sfloat,
    /// Four 32-bit floats
    R32g32b32a32Sfloat,
    /// One 32-bit signed integer
    R32Sint,
    /// Two 32-bit signed integers
    R32g32Sint,
    /// Three 32-bit signed integers
    R32g32b32Sint,
    /// Four 32-bit signed integers
    R32g32b32a32Sint,
    /// One 32-bit unsigned integer
    R32Uint,
    /// Two 32-bit unsigned integers
    R32g32Uint,
    /// Three 32-bit unsigned integers
    R32g32b32Uint,
    /// Four 32-bit unsigned integers
    R32g32b32a32Uint,
}

impl VertexAttribute {
    /// The Vulkan format of this attribute
    pub fn format(self) -> vk::Format {
        match self {
            Self::R32Sfloat => vk::Format::R32_SFLOAT,
            Self::R32g32Sfloat => vk::Format::R32G32_SFLOAT,
            Self::R32g32b32Sfloat => vk::Format::R32G32B32_SFLOAT,
            Self::R32g32b32a32Sfloat => vk::Format::R32G32B32A32_SFLOAT,
            Self::R32Sint => vk::Format::R32_SINT,
            Self::R32g32Sint => vk::Format::R32G32_SINT,
            Self::R32g32b32Sint => vk::Format::R32G32B32_SINT,
            Self::R32g32b32a32Sint => vk::Format::R32G32B32A32_SINT,
            Self::R32Uint => vk::Format::R32_UINT,
            Self::R32g32Uint => vk::Format::R32G32_UINT,
            Self::R32g32b32Uint => vk::Format::R32G32B32_UINT,
            Self::R32g32b32a32Uint => vk::Format::R32G32B32A32_UINT,
        }
    }

    /// Number of 32-bit components
    pub fn component_count(self) -> u32 {
        match self {
            Self::R32Sfloat | Self::R32Sint | Self::R32Uint => 1,
            Self::R32g32Sfloat | Self::R32g32Sint | Self::R32g32Uint => 2,
            Self::R32g32b32Sfloat | Self::R32g32b32Sint | Self::R32g32b32Uint => 3,
            Self::R32g32b32a32Sfloat | Self::R32g32b32a32Sint | Self::R32g32b32a32Uint => 4,
        }
    }

    /// Size in bytes
    pub fn size(self) -> u32 {
        self.component_count() * 4
    }
}

/// An attribute placed at its computed location and offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexElement {
    /// Shader input location (= index in the declaration order)
    pub location: u32,
    /// The attribute at this location
    pub attribute: VertexAttribute,
    /// Byte offset from the start of the vertex
    pub offset: u32,
}

/// An ordered, interleaved vertex layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFormat {
    elements: Vec<VertexElement>,
    stride: u32,
}

impl VertexFormat {
    /// Lay out the attributes in declaration order
    pub fn new(attributes: &[VertexAttribute]) -> Self {
        let mut offset = 0;
        let elements = attributes
            .iter()
            .enumerate()
            .map(|(index, &attribute)| {
                let element = VertexElement {
                    location: index as u32,
                    attribute,
                    offset,
                };
                offset += attribute.size();
                element
            })
            .collect();

        Self {
            elements,
            stride: offset,
        }
    }

    /// The placed elements, in location order
    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Bytes per vertex
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Total number of 32-bit components per vertex
    pub fn component_count(&self) -> u32 {
        self.elements
            .iter()
            .map(|e| e.attribute.component_count())
            .sum()
    }

    /// The Vulkan vertex input binding description for binding zero
    pub fn binding_description(&self) -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: self.stride,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// The Vulkan attribute descriptions for binding zero
    pub fn attribute_descriptions(&self) -> Vec<vk::VertexInputAttributeDescription> {
        self.elements
            .iter()
            .map(|element| vk::VertexInputAttributeDescription {
                binding: 0,
                location: element.location,
                format: element.attribute.format(),
                offset: element.offset,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_running_sums_of_sizes() {
        let format = VertexFormat::new(&[
            VertexAttribute::R32g32b32Sfloat,    // 12 bytes at offset 0
            VertexAttribute::R32g32b32a32Sfloat, // 16 bytes at offset 12
            VertexAttribute::R32g32Sfloat,       // 8 bytes at offset 28
        ]);

        let offsets: Vec<u32> = format.elements().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 28]);
        assert_eq!(format.stride(), 36);
    }

    #[test]
    fn test_offset_of_element_i_is_sum_of_preceding_sizes() {
        let attributes = [
            VertexAttribute::R32Sfloat,
            VertexAttribute::R32g32Uint,
            VertexAttribute::R32g32b32Sint,
            VertexAttribute::R32g32b32a32Sfloat,
        ];
        let format = VertexFormat::new(&attributes);

        for (i, element) in format.elements().iter().enumerate() {
            let expected: u32 = attributes[..i].iter().map(|a| a.size()).sum();
            assert_eq!(element.offset, expected);
        }
        let total: u32 = attributes.iter().map(|a| a.size()).sum();
        assert_eq!(format.stride(), total);
    }

    #[test]
    fn test_locations_follow_declaration_order() {
        let format = VertexFormat::new(&[
            VertexAttribute::R32g32b32Sfloat,
            VertexAttribute::R32g32b32a32Sfloat,
        ]);
        let descriptions = format.attribute_descriptions();
        assert_eq!(descriptions[0].location, 0);
        assert_eq!(descriptions[1].location, 1);
        assert_eq!(descriptions[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(descriptions[1].format, vk::Format::R32G32B32A32_SFLOAT);
    }

    #[test]
    fn test_component_count_totals_components() {
        let format = VertexFormat::new(&[
            VertexAttribute::R32g32b32Sfloat,
            VertexAttribute::R32g32b32a32Sfloat,
        ]);
        assert_eq!(format.component_count(), 7);
        assert_eq!(format.binding_description().stride, 28);
    }
}
