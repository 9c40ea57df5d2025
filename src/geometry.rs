use std::f32::consts::{PI, TAU};

/// Vertex format shared by every mesh in the scene.
///
/// 44 bytes: position (12) + normal (12) + tangent (12) + uv (8). Tangents
/// point along the direction of increasing `u` so the fragment shader can
/// build a tangent basis for normal mapping.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 36,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], tangent: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tangent,
            uv,
        }
    }
}

/// Vertex format for helper line geometry (grid, light helper).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl LineVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LineVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };
}

/// Indexed triangle mesh data, CPU side. Immutable once built.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Line-list data for helper visualizations. Every pair of vertices is one
/// segment.
#[derive(Debug, Clone)]
pub struct LineData {
    pub vertices: Vec<LineVertex>,
}

impl LineData {
    pub fn segment_count(&self) -> usize {
        self.vertices.len() / 2
    }
}

/// Torus around the Z axis: `radius` from the center to the tube center,
/// `tube` is the tube radius.
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> MeshData {
    let mut vertices =
        Vec::with_capacity(((radial_segments + 1) * (tubular_segments + 1)) as usize);
    let mut indices = Vec::with_capacity((radial_segments * tubular_segments * 6) as usize);

    for j in 0..=radial_segments {
        let v = j as f32 / radial_segments as f32 * TAU;
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * TAU;

            let position = [
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            ];
            let center = [radius * u.cos(), radius * u.sin(), 0.0];
            let normal = normalize([
                position[0] - center[0],
                position[1] - center[1],
                position[2] - center[2],
            ]);
            let tangent = [-u.sin(), u.cos(), 0.0];
            let uv = [
                i as f32 / tubular_segments as f32,
                j as f32 / radial_segments as f32,
            ];

            vertices.push(Vertex::new(position, normal, tangent, uv));
        }
    }

    let stride = tubular_segments + 1;
    for j in 1..=radial_segments {
        for i in 1..=tubular_segments {
            let a = stride * j + i - 1;
            let b = stride * (j - 1) + i - 1;
            let c = stride * (j - 1) + i;
            let d = stride * j + i;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    MeshData { vertices, indices }
}

/// UV sphere centered at the origin. `width_segments` around the equator,
/// `height_segments` from pole to pole.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let mut vertices =
        Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * TAU;

            let position = [
                radius * theta.sin() * phi.cos(),
                radius * theta.cos(),
                radius * theta.sin() * phi.sin(),
            ];
            let normal = [
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            ];
            // Direction of increasing phi; well defined at the poles too.
            let tangent = [-phi.sin(), 0.0, phi.cos()];

            vertices.push(Vertex::new(position, normal, tangent, [u, v]));
        }
    }

    let stride = width_segments + 1;
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * stride + ix;
            let b = (iy + 1) * stride + ix;
            let c = (iy + 1) * stride + ix + 1;
            let d = iy * stride + ix + 1;
            // Collapse the degenerate quads touching the poles.
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    MeshData { vertices, indices }
}

/// Axis-aligned box centered at the origin. Each face has its own vertices so
/// normals stay flat.
pub fn cuboid(width: f32, height: f32, depth: f32) -> MeshData {
    let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);

    // (normal, tangent, four corners in CCW order)
    let faces: [([f32; 3], [f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [
                [-hx, -hy, hz],
                [hx, -hy, hz],
                [hx, hy, hz],
                [-hx, hy, hz],
            ],
        ),
        (
            [0.0, 0.0, -1.0],
            [-1.0, 0.0, 0.0],
            [
                [hx, -hy, -hz],
                [-hx, -hy, -hz],
                [-hx, hy, -hz],
                [hx, hy, -hz],
            ],
        ),
        (
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [
                [-hx, hy, hz],
                [hx, hy, hz],
                [hx, hy, -hz],
                [-hx, hy, -hz],
            ],
        ),
        (
            [0.0, -1.0, 0.0],
            [1.0, 0.0, 0.0],
            [
                [-hx, -hy, -hz],
                [hx, -hy, -hz],
                [hx, -hy, hz],
                [-hx, -hy, hz],
            ],
        ),
        (
            [1.0, 0.0, 0.0],
            [0.0, 0.0, -1.0],
            [
                [hx, -hy, hz],
                [hx, -hy, -hz],
                [hx, hy, -hz],
                [hx, hy, hz],
            ],
        ),
        (
            [-1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [
                [-hx, -hy, -hz],
                [-hx, -hy, hz],
                [-hx, hy, hz],
                [-hx, hy, -hz],
            ],
        ),
    ];

    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, tangent, corners)) in faces.iter().enumerate() {
        let base = (face * 4) as u32;
        for (corner, uv) in corners.iter().zip(uvs.iter()) {
            vertices.push(Vertex::new(*corner, *normal, *tangent, *uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData { vertices, indices }
}

/// Ground-plane grid on XZ, `size` units across with `divisions` cells per
/// side. The two center lines get `center_color`, the rest `grid_color`.
pub fn grid(size: f32, divisions: u32, center_color: [f32; 3], grid_color: [f32; 3]) -> LineData {
    let half = size * 0.5;
    let step = size / divisions as f32;
    let mut vertices = Vec::with_capacity(((divisions + 1) * 4) as usize);

    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let color = if i * 2 == divisions {
            center_color
        } else {
            grid_color
        };

        vertices.push(LineVertex {
            position: [-half, 0.0, k],
            color,
        });
        vertices.push(LineVertex {
            position: [half, 0.0, k],
            color,
        });
        vertices.push(LineVertex {
            position: [k, 0.0, -half],
            color,
        });
        vertices.push(LineVertex {
            position: [k, 0.0, half],
            color,
        });
    }

    LineData { vertices }
}

/// Wireframe sphere used as the point-light helper: three orthogonal circles.
pub fn wire_sphere(radius: f32, segments: u32, color: [f32; 3]) -> LineData {
    let mut vertices = Vec::with_capacity((segments * 6) as usize);

    let push_circle = |vertices: &mut Vec<LineVertex>, map: fn(f32, f32) -> [f32; 3]| {
        for i in 0..segments {
            let a0 = i as f32 / segments as f32 * TAU;
            let a1 = (i + 1) as f32 / segments as f32 * TAU;
            vertices.push(LineVertex {
                position: map(radius * a0.cos(), radius * a0.sin()),
                color,
            });
            vertices.push(LineVertex {
                position: map(radius * a1.cos(), radius * a1.sin()),
                color,
            });
        }
    };

    push_circle(&mut vertices, |a, b| [a, b, 0.0]);
    push_circle(&mut vertices, |a, b| [a, 0.0, b]);
    push_circle(&mut vertices, |a, b| [0.0, a, b]);

    LineData { vertices }
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 1e-6 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        [0.0, 0.0, 0.0]
    }
}
