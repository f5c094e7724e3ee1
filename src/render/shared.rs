use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use super::common::{CameraParams, LightParams};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    /// `w` carries the ambient term.
    light_position: [f32; 4],
    /// `w` carries the light intensity.
    light_color: [f32; 4],
}

impl GlobalUniform {
    pub(crate) fn new(camera: &CameraParams, light: &LightParams) -> Self {
        Self {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            light_position: light.position.extend(light.ambient).into(),
            light_color: light.color.extend(light.intensity).into(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ObjectConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    color: [f32; 4],
}

impl ObjectConstants {
    pub(crate) fn new(model: Mat4, color: [f32; 4]) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        let cols = normal.to_cols_array();
        Self {
            model: model.to_cols_array_2d(),
            normal: [
                [cols[0], cols[1], cols[2], 0.0],
                [cols[3], cols[4], cols[5], 0.0],
                [cols[6], cols[7], cols[8], 0.0],
            ],
            color,
        }
    }
}

pub(crate) const SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    light_position: vec4<f32>,
    light_color: vec4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_position;
    out.world_pos = world_position.xyz;
    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;
    out.normal = normalize(world_normal);
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let light_dir = normalize(globals.light_position.xyz - input.world_pos);
    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);
    let normal = normalize(input.normal);
    let diffuse = max(dot(normal, light_dir), 0.0);
    let half_dir = normalize(light_dir + view_dir);
    let specular = pow(max(dot(normal, half_dir), 0.0), 32.0) * 0.3;
    let ambient = globals.light_position.w;
    let intensity = globals.light_color.w;
    let lit = (ambient + diffuse * intensity) * object.color.rgb * globals.light_color.xyz
        + specular * globals.light_color.xyz;
    return vec4<f32>(lit, object.color.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 112);
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 128);
    }

    #[test]
    fn normal_matrix_inverts_uniform_scale() {
        let constants = ObjectConstants::new(Mat4::from_scale(glam::Vec3::splat(2.0)), [1.0; 4]);
        assert!((constants.normal[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(constants.normal[0][3], 0.0);
    }
}
