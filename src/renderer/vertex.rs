//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

use crate::sim::palette::Rgb;

/// 2D vertex in arena pixels with a straight-alpha color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Convert an 8-bit color and a 0-255 alpha to a vertex color
#[inline]
pub fn rgba(color: Rgb, alpha: f32) -> [f32; 4] {
    [
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
        (alpha / 255.0).clamp(0.0, 1.0),
    ]
}

/// Opaque vertex color
#[inline]
pub fn opaque(color: Rgb) -> [f32; 4] {
    rgba(color, 255.0)
}

/// Colors that only the renderer uses
pub mod colors {
    use crate::sim::palette::Rgb;

    pub const SNAKE_BODY: Rgb = [0, 100, 0];
    pub const PIPE_BORDER: Rgb = [0, 100, 0];
    pub const SUPERTANK_GLOW: Rgb = [255, 50, 50];
    pub const HYPER_TANK_GLOW: Rgb = [150, 200, 255];
    pub const TANK_GLOW: Rgb = [100, 150, 255];
    pub const GRAB_GLOW: Rgb = [255, 100, 100];
    pub const GRAB_ARM: Rgb = [255, 150, 150];
    pub const BOOST_GLOW: Rgb = [255, 255, 100];
    pub const COIL_GLOW: Rgb = [100, 255, 100];
    pub const HEALTH_BACK: Rgb = [255, 0, 0];
}
