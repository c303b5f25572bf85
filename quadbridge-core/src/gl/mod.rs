//! Graphics bridge.
//!
//! The guest speaks a GLES-shaped vocabulary with integer names. This module keeps
//! the integer-name tables (`tables`), the per-program uniform cache (`program`),
//! and the dispatch surface (`bridge::GlBridge`) that resolves names and guest
//! pointers before calling the native context behind [`GraphicsContext`].
//!
//! `headless::HeadlessContext` is a recording implementation of the context used by
//! tests and by embedders that run guests without a GPU.

pub mod bridge;
pub mod headless;
pub mod params;
pub mod program;
pub mod shader;
pub mod tables;

use core::num::NonZeroU32;

pub use bridge::{GlBridge, GlError};
pub use headless::{CallLog, HeadlessContext};
pub use tables::{ObjectTables, ResourceKind};

/// Opaque native object reference handed out by a [`GraphicsContext`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeObject(NonZeroU32);

impl NativeObject {
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

/// Result of a native parameter query.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Object(NativeObject),
    Array(Vec<f64>),
}

impl ParameterValue {
    /// Scalar view as a GL integer; strings, objects and arrays yield `None`.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ParameterValue::Bool(b) => Some(i32::from(*b)),
            ParameterValue::Int(v) => Some(*v as i32),
            ParameterValue::Float(v) => Some(*v as i32),
            _ => None,
        }
    }
}

/// Name, array size and type of an active uniform or attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveInfo {
    pub name: String,
    pub size: i32,
    pub ty: u32,
}

/// Payload for `buffer_data`: either a size to allocate or bytes to upload.
#[derive(Copy, Clone, Debug)]
pub enum BufferData<'a> {
    Size(i64),
    Bytes(&'a [u8]),
}

/// Parameters of a full texture upload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TexImage2d {
    pub target: u32,
    pub level: i32,
    pub internal_format: i32,
    pub width: i32,
    pub height: i32,
    pub border: i32,
    pub format: u32,
    pub ty: u32,
}

/// Parameters of a sub-rectangle texture upload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TexSubImage2d {
    pub target: u32,
    pub level: i32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub format: u32,
    pub ty: u32,
}

/// Native graphics context the bridge replays calls against.
///
/// Object arguments are already resolved from guest names; `None` is the native
/// "no object" value. Methods mirror the WebGL2 entry points one-to-one.
pub trait GraphicsContext {
    /// Create an object of `kind`; `None` signals a native failure (e.g. context lost).
    fn create(&mut self, kind: ResourceKind) -> Option<NativeObject>;
    fn create_shader(&mut self, shader_type: u32) -> Option<NativeObject>;
    fn delete(&mut self, kind: ResourceKind, object: NativeObject);

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, s: i32);
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    fn clear(&mut self, mask: u32);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn enable(&mut self, cap: u32);
    fn disable(&mut self, cap: u32);
    fn blend_func(&mut self, sfactor: u32, dfactor: u32);
    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32);
    fn depth_func(&mut self, func: u32);
    fn front_face(&mut self, mode: u32);
    fn cull_face(&mut self, mode: u32);
    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32);
    fn stencil_mask_separate(&mut self, face: u32, mask: u32);
    fn stencil_op_separate(&mut self, face: u32, fail: u32, zfail: u32, zpass: u32);
    fn pixel_store_i(&mut self, pname: u32, param: i32);
    fn flush(&mut self);
    fn finish(&mut self);

    fn active_texture(&mut self, texture: u32);
    fn bind_texture(&mut self, target: u32, texture: Option<NativeObject>);
    fn tex_image_2d(&mut self, desc: &TexImage2d, pixels: Option<&[u8]>);
    fn tex_sub_image_2d(&mut self, desc: &TexSubImage2d, pixels: Option<&[u8]>);
    fn tex_parameter_i(&mut self, target: u32, pname: u32, param: i32);
    #[allow(clippy::too_many_arguments)]
    fn copy_tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        border: i32,
    );
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        out: &mut [u8],
    );

    fn bind_buffer(&mut self, target: u32, buffer: Option<NativeObject>);
    fn buffer_data(&mut self, target: u32, data: BufferData<'_>, usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: i64, data: &[u8]);

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<NativeObject>);
    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<NativeObject>,
        level: i32,
    );
    fn bind_renderbuffer(&mut self, target: u32, renderbuffer: Option<NativeObject>);
    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32);
    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<NativeObject>,
    );
    fn bind_vertex_array(&mut self, vao: Option<NativeObject>);

    fn shader_source(&mut self, shader: Option<NativeObject>, source: &str);
    fn compile_shader(&mut self, shader: Option<NativeObject>);
    fn shader_parameter(&mut self, shader: Option<NativeObject>, pname: u32) -> ParameterValue;
    fn shader_info_log(&mut self, shader: Option<NativeObject>) -> Option<String>;
    fn shader_source_text(&mut self, shader: Option<NativeObject>) -> Option<String>;
    fn attach_shader(&mut self, program: Option<NativeObject>, shader: Option<NativeObject>);
    fn link_program(&mut self, program: Option<NativeObject>);
    fn use_program(&mut self, program: Option<NativeObject>);
    fn program_parameter(&mut self, program: Option<NativeObject>, pname: u32) -> ParameterValue;
    fn program_info_log(&mut self, program: Option<NativeObject>) -> Option<String>;
    fn active_uniform(&mut self, program: NativeObject, index: u32) -> Option<ActiveInfo>;
    fn active_attrib(&mut self, program: NativeObject, index: u32) -> Option<ActiveInfo>;
    fn active_uniform_block_name(&mut self, program: NativeObject, index: u32) -> Option<String>;
    fn attrib_location(&mut self, program: Option<NativeObject>, name: &str) -> i32;
    fn uniform_location(&mut self, program: NativeObject, name: &str) -> Option<NativeObject>;

    fn uniform_1f(&mut self, location: Option<NativeObject>, v: f32);
    fn uniform_1i(&mut self, location: Option<NativeObject>, v: i32);
    /// `components` is 1..=4; `data.len()` is a multiple of it.
    fn uniform_fv(&mut self, location: Option<NativeObject>, components: u8, data: &[f32]);
    fn uniform_iv(&mut self, location: Option<NativeObject>, components: u8, data: &[i32]);
    fn uniform_matrix4fv(&mut self, location: Option<NativeObject>, transpose: bool, data: &[f32]);

    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn disable_vertex_attrib_array(&mut self, index: u32);
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i64,
    );
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);
    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);
    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i64);
    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32);
    fn draw_elements_instanced(&mut self, mode: u32, count: i32, ty: u32, offset: i64, instances: i32);

    fn begin_query(&mut self, target: u32, query: Option<NativeObject>);
    fn end_query(&mut self, target: u32);
    fn query_parameter(&mut self, query: Option<NativeObject>, pname: u32) -> ParameterValue;

    /// Generic state query (`getParameter`).
    fn parameter(&mut self, pname: u32) -> ParameterValue;
}
