//! Recording graphics context without a GPU.
//!
//! Tracks enough state to answer the queries the bridge makes (bindings, shader
//! sources, link-time reflection, buffer/texture contents) and records every call
//! by name so callers can inspect what a guest did. Uniform reflection parses the
//! `uniform` declarations of the attached shader sources.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::program::split_array_index;
use super::{
    ActiveInfo, BufferData, GraphicsContext, NativeObject, ParameterValue, ResourceKind,
    TexImage2d, TexSubImage2d,
};
use crate::abi::gl::GlEnum;

const CAP_QUERIES: [u32; 5] = [
    0x0BE2, // BLEND
    0x0B71, // DEPTH_TEST
    0x0B44, // CULL_FACE
    0x0C11, // SCISSOR_TEST
    0x0B90, // STENCIL_TEST
];

/// Simulated elapsed time reported by query objects, in nanoseconds.
pub const QUERY_ELAPSED_NS: i64 = 5_000_000_123;

/// One recorded native call.
#[derive(Clone, Debug, PartialEq)]
pub struct CallRecord {
    pub name: &'static str,
    pub args: String,
}

/// Shared view of a context's call log. Clones observe the same log, so a probe
/// kept by the embedder stays readable after the context is boxed into a session.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Rc<RefCell<Vec<CallRecord>>>);

impl CallLog {
    pub fn records(&self) -> Vec<CallRecord> {
        self.0.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.borrow().iter().filter(|c| c.name == name).count()
    }

    pub fn last(&self, name: &str) -> Option<CallRecord> {
        self.0.borrow().iter().rev().find(|c| c.name == name).cloned()
    }

    fn push(&self, record: CallRecord) {
        self.0.borrow_mut().push(record);
    }
}

#[derive(Clone, Debug)]
enum Object {
    Plain(ResourceKind),
    Buffer(Vec<u8>),
    Texture(Vec<u8>),
    Shader {
        ty: u32,
        source: Option<String>,
        compiled: bool,
    },
    Program {
        shaders: Vec<NativeObject>,
        linked: bool,
        log: String,
        uniforms: Vec<ActiveInfo>,
        attribs: Vec<ActiveInfo>,
    },
    Location,
}

#[derive(Debug)]
pub struct HeadlessContext {
    next_object: u32,
    lost: bool,
    objects: HashMap<NativeObject, Object>,
    locations: HashMap<(NativeObject, String, u32), NativeObject>,
    uniform_values: HashMap<NativeObject, Vec<f32>>,
    bindings: HashMap<u32, NativeObject>,
    enabled: HashSet<u32>,
    clear_color: [f32; 4],
    viewport: [i32; 4],
    calls: CallLog,
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self {
            next_object: 1,
            lost: false,
            objects: HashMap::new(),
            locations: HashMap::new(),
            uniform_values: HashMap::new(),
            bindings: HashMap::new(),
            enabled: HashSet::new(),
            clear_color: [0.0; 4],
            viewport: [0; 4],
            calls: CallLog::default(),
        }
    }
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost context: every later `create*` returns `None`.
    pub fn set_context_lost(&mut self, lost: bool) {
        self.lost = lost;
    }

    pub fn call_log(&self) -> CallLog {
        self.calls.clone()
    }

    pub fn is_live(&self, object: NativeObject) -> bool {
        self.objects.contains_key(&object)
    }

    /// Live objects, excluding uniform locations.
    pub fn live_objects(&self) -> usize {
        self.objects
            .values()
            .filter(|o| !matches!(o, Object::Location))
            .count()
    }

    pub fn buffer_contents(&self, buffer: NativeObject) -> Option<&[u8]> {
        match self.objects.get(&buffer) {
            Some(Object::Buffer(data)) => Some(data),
            _ => None,
        }
    }

    pub fn texture_pixels(&self, texture: NativeObject) -> Option<&[u8]> {
        match self.objects.get(&texture) {
            Some(Object::Texture(data)) => Some(data),
            _ => None,
        }
    }

    /// Last values uploaded to a uniform location (ints widened to f32).
    pub fn uniform_value(&self, location: NativeObject) -> Option<&[f32]> {
        self.uniform_values.get(&location).map(Vec::as_slice)
    }

    pub fn bound(&self, binding: GlEnum) -> Option<NativeObject> {
        self.bindings.get(&binding.value()).copied()
    }

    fn record(&mut self, name: &'static str, args: String) {
        tracing::trace!(name, %args, "headless call");
        self.calls.push(CallRecord { name, args });
    }

    fn mint(&mut self, object: Object) -> Option<NativeObject> {
        if self.lost {
            return None;
        }
        let handle = NativeObject::new(self.next_object)?;
        self.next_object += 1;
        self.objects.insert(handle, object);
        Some(handle)
    }

    fn bind(&mut self, binding: Option<GlEnum>, object: Option<NativeObject>) {
        let Some(binding) = binding else {
            return;
        };
        match object {
            Some(object) => {
                self.bindings.insert(binding.value(), object);
            }
            None => {
                self.bindings.remove(&binding.value());
            }
        }
    }

    fn bound_buffer_mut(&mut self, target: u32) -> Option<&mut Vec<u8>> {
        let binding = match GlEnum::from_u32(target) {
            Some(GlEnum::ArrayBuffer) => GlEnum::ArrayBufferBinding,
            Some(GlEnum::ElementArrayBuffer) => GlEnum::ElementArrayBufferBinding,
            _ => return None,
        };
        let buffer = self.bindings.get(&binding.value())?;
        match self.objects.get_mut(buffer) {
            Some(Object::Buffer(data)) => Some(data),
            _ => None,
        }
    }

    fn bound_texture_mut(&mut self, target: u32) -> Option<&mut Vec<u8>> {
        let binding = match GlEnum::from_u32(target) {
            Some(GlEnum::Texture2d) => GlEnum::TextureBinding2d,
            Some(GlEnum::TextureCubeMap) => GlEnum::TextureBindingCubeMap,
            _ => return None,
        };
        let texture = self.bindings.get(&binding.value())?;
        match self.objects.get_mut(texture) {
            Some(Object::Texture(data)) => Some(data),
            _ => None,
        }
    }

    fn store_uniform(&mut self, location: Option<NativeObject>, values: Vec<f32>) {
        if let Some(location) = location {
            self.uniform_values.insert(location, values);
        }
    }
}

fn glsl_type(name: &str) -> u32 {
    match name {
        "float" => 0x1406,
        "int" => 0x1404,
        "bool" => 0x8B56,
        "vec2" => 0x8B50,
        "vec3" => 0x8B51,
        "vec4" => 0x8B52,
        "mat2" => 0x8B5A,
        "mat3" => 0x8B5B,
        "mat4" => 0x8B5C,
        "sampler2D" => 0x8B5E,
        "samplerCube" => 0x8B60,
        _ => 0,
    }
}

/// Collect `<qualifier> [precision] <type> name[, name[N]];` declarations.
fn reflect(source: &str, qualifiers: &[&str], out: &mut Vec<ActiveInfo>) {
    for statement in source.split(';') {
        let mut tokens = statement.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        if !qualifiers.contains(&first) {
            continue;
        }
        let mut ty = tokens.next().unwrap_or_default();
        if matches!(ty, "lowp" | "mediump" | "highp") {
            ty = tokens.next().unwrap_or_default();
        }
        let rest: String = tokens.collect::<Vec<_>>().join("");
        for decl in rest.split(',').filter(|d| !d.is_empty()) {
            let (name, size) = match decl.find('[') {
                Some(open) => {
                    let size = decl[open + 1..].trim_end_matches(']').parse().unwrap_or(1);
                    (format!("{}[0]", &decl[..open]), size)
                }
                None => (decl.to_owned(), 1),
            };
            let base = super::program::base_name(&name).to_owned();
            if out.iter().any(|u| super::program::base_name(&u.name) == base) {
                continue;
            }
            out.push(ActiveInfo {
                name,
                size,
                ty: glsl_type(ty),
            });
        }
    }
}

impl GraphicsContext for HeadlessContext {
    fn create(&mut self, kind: ResourceKind) -> Option<NativeObject> {
        let object = match kind {
            ResourceKind::Buffer => Object::Buffer(Vec::new()),
            ResourceKind::Texture => Object::Texture(Vec::new()),
            ResourceKind::Program => Object::Program {
                shaders: Vec::new(),
                linked: false,
                log: String::new(),
                uniforms: Vec::new(),
                attribs: Vec::new(),
            },
            other => Object::Plain(other),
        };
        let handle = self.mint(object);
        self.record("create", format!("{kind:?} -> {handle:?}"));
        handle
    }

    fn create_shader(&mut self, shader_type: u32) -> Option<NativeObject> {
        let handle = self.mint(Object::Shader {
            ty: shader_type,
            source: None,
            compiled: false,
        });
        self.record("createShader", format!("{shader_type:#x} -> {handle:?}"));
        handle
    }

    fn delete(&mut self, kind: ResourceKind, object: NativeObject) {
        self.objects.remove(&object);
        self.bindings.retain(|_, bound| *bound != object);
        self.record("delete", format!("{kind:?} {}", object.get()));
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.clear_color = [r, g, b, a];
        self.record("clearColor", format!("{r} {g} {b} {a}"));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.record("clearDepth", format!("{depth}"));
    }

    fn clear_stencil(&mut self, s: i32) {
        self.record("clearStencil", format!("{s}"));
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.record("colorMask", format!("{r} {g} {b} {a}"));
    }

    fn clear(&mut self, mask: u32) {
        self.record("clear", format!("{mask:#x}"));
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record("scissor", format!("{x} {y} {width} {height}"));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.viewport = [x, y, width, height];
        self.record("viewport", format!("{x} {y} {width} {height}"));
    }

    fn enable(&mut self, cap: u32) {
        self.enabled.insert(cap);
        self.record("enable", format!("{cap:#x}"));
    }

    fn disable(&mut self, cap: u32) {
        self.enabled.remove(&cap);
        self.record("disable", format!("{cap:#x}"));
    }

    fn blend_func(&mut self, sfactor: u32, dfactor: u32) {
        self.record("blendFunc", format!("{sfactor:#x} {dfactor:#x}"));
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.record(
            "blendFuncSeparate",
            format!("{src_rgb:#x} {dst_rgb:#x} {src_alpha:#x} {dst_alpha:#x}"),
        );
    }

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        self.record("blendEquationSeparate", format!("{mode_rgb:#x} {mode_alpha:#x}"));
    }

    fn depth_func(&mut self, func: u32) {
        self.record("depthFunc", format!("{func:#x}"));
    }

    fn front_face(&mut self, mode: u32) {
        self.record("frontFace", format!("{mode:#x}"));
    }

    fn cull_face(&mut self, mode: u32) {
        self.record("cullFace", format!("{mode:#x}"));
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        self.record(
            "stencilFuncSeparate",
            format!("{face:#x} {func:#x} {reference} {mask:#x}"),
        );
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        self.record("stencilMaskSeparate", format!("{face:#x} {mask:#x}"));
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, zfail: u32, zpass: u32) {
        self.record(
            "stencilOpSeparate",
            format!("{face:#x} {fail:#x} {zfail:#x} {zpass:#x}"),
        );
    }

    fn pixel_store_i(&mut self, pname: u32, param: i32) {
        self.record("pixelStorei", format!("{pname:#x} {param}"));
    }

    fn flush(&mut self) {
        self.record("flush", String::new());
    }

    fn finish(&mut self) {
        self.record("finish", String::new());
    }

    fn active_texture(&mut self, texture: u32) {
        self.record("activeTexture", format!("{texture:#x}"));
    }

    fn bind_texture(&mut self, target: u32, texture: Option<NativeObject>) {
        let binding = match GlEnum::from_u32(target) {
            Some(GlEnum::Texture2d) => Some(GlEnum::TextureBinding2d),
            Some(GlEnum::TextureCubeMap) => Some(GlEnum::TextureBindingCubeMap),
            _ => None,
        };
        self.bind(binding, texture);
        self.record("bindTexture", format!("{target:#x} {texture:?}"));
    }

    fn tex_image_2d(&mut self, desc: &TexImage2d, pixels: Option<&[u8]>) {
        let len = pixels.map_or(0, <[u8]>::len);
        if let Some(data) = self.bound_texture_mut(desc.target) {
            *data = pixels.map(<[u8]>::to_vec).unwrap_or_default();
        }
        self.record(
            "texImage2D",
            format!("{}x{} fmt={:#x} bytes={len}", desc.width, desc.height, desc.format),
        );
    }

    fn tex_sub_image_2d(&mut self, desc: &TexSubImage2d, pixels: Option<&[u8]>) {
        let len = pixels.map_or(0, <[u8]>::len);
        self.record(
            "texSubImage2D",
            format!(
                "{},{} {}x{} fmt={:#x} bytes={len}",
                desc.x, desc.y, desc.width, desc.height, desc.format
            ),
        );
    }

    fn tex_parameter_i(&mut self, target: u32, pname: u32, param: i32) {
        self.record("texParameteri", format!("{target:#x} {pname:#x} {param:#x}"));
    }

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
    ) {
        self.record(
            "copyTexImage2D",
            format!("{target:#x} {level} {internal_format:#x} {x} {y} {width} {height} {border}"),
        );
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        _ty: u32,
        out: &mut [u8],
    ) {
        let channels = if format == GlEnum::Rgb.value() { 3 } else { 4 };
        let color = self.clear_color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        for px in out.chunks_mut(channels) {
            let n = px.len();
            px.copy_from_slice(&color[..n]);
        }
        self.record(
            "readPixels",
            format!("{x} {y} {width}x{height} bytes={}", out.len()),
        );
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<NativeObject>) {
        let binding = match GlEnum::from_u32(target) {
            Some(GlEnum::ArrayBuffer) => Some(GlEnum::ArrayBufferBinding),
            Some(GlEnum::ElementArrayBuffer) => Some(GlEnum::ElementArrayBufferBinding),
            _ => None,
        };
        self.bind(binding, buffer);
        self.record("bindBuffer", format!("{target:#x} {buffer:?}"));
    }

    fn buffer_data(&mut self, target: u32, data: BufferData<'_>, usage: u32) {
        let contents = match data {
            BufferData::Size(size) => vec![0u8; usize::try_from(size).unwrap_or(0)],
            BufferData::Bytes(bytes) => bytes.to_vec(),
        };
        let len = contents.len();
        if let Some(buffer) = self.bound_buffer_mut(target) {
            *buffer = contents;
        }
        self.record("bufferData", format!("{target:#x} bytes={len} {usage:#x}"));
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i64, data: &[u8]) {
        if let Some(buffer) = self.bound_buffer_mut(target) {
            let start = usize::try_from(offset).unwrap_or(usize::MAX);
            if let Some(dst) = start
                .checked_add(data.len())
                .and_then(|end| buffer.get_mut(start..end))
            {
                dst.copy_from_slice(data);
            }
        }
        self.record(
            "bufferSubData",
            format!("{target:#x} {offset} bytes={}", data.len()),
        );
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<NativeObject>) {
        self.bind(Some(GlEnum::FramebufferBinding), framebuffer);
        self.record("bindFramebuffer", format!("{target:#x} {framebuffer:?}"));
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: Option<NativeObject>,
        level: i32,
    ) {
        self.record(
            "framebufferTexture2D",
            format!("{target:#x} {attachment:#x} {textarget:#x} {texture:?} {level}"),
        );
    }

    fn bind_renderbuffer(&mut self, target: u32, renderbuffer: Option<NativeObject>) {
        self.bind(Some(GlEnum::RenderbufferBinding), renderbuffer);
        self.record("bindRenderbuffer", format!("{target:#x} {renderbuffer:?}"));
    }

    fn renderbuffer_storage(&mut self, target: u32, internal_format: u32, width: i32, height: i32) {
        self.record(
            "renderbufferStorage",
            format!("{target:#x} {internal_format:#x} {width}x{height}"),
        );
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<NativeObject>,
    ) {
        self.record(
            "framebufferRenderbuffer",
            format!("{target:#x} {attachment:#x} {renderbuffer_target:#x} {renderbuffer:?}"),
        );
    }

    fn bind_vertex_array(&mut self, vao: Option<NativeObject>) {
        self.bind(Some(GlEnum::VertexArrayBinding), vao);
        self.record("bindVertexArray", format!("{vao:?}"));
    }

    fn shader_source(&mut self, shader: Option<NativeObject>, source: &str) {
        if let Some(Object::Shader { source: slot, .. }) =
            shader.and_then(|s| self.objects.get_mut(&s))
        {
            *slot = Some(source.to_owned());
        }
        self.record("shaderSource", source.to_owned());
    }

    fn compile_shader(&mut self, shader: Option<NativeObject>) {
        if let Some(Object::Shader {
            source, compiled, ..
        }) = shader.and_then(|s| self.objects.get_mut(&s))
        {
            *compiled = source.as_deref().is_some_and(|s| s.contains("main"));
        }
        self.record("compileShader", format!("{shader:?}"));
    }

    fn shader_parameter(&mut self, shader: Option<NativeObject>, pname: u32) -> ParameterValue {
        let Some(Object::Shader { ty, compiled, .. }) = shader.and_then(|s| self.objects.get(&s))
        else {
            return ParameterValue::Null;
        };
        match GlEnum::from_u32(pname) {
            Some(GlEnum::CompileStatus) => ParameterValue::Bool(*compiled),
            Some(GlEnum::ShaderType) => ParameterValue::Int(i64::from(*ty)),
            Some(GlEnum::DeleteStatus) => ParameterValue::Bool(false),
            _ => ParameterValue::Null,
        }
    }

    fn shader_info_log(&mut self, shader: Option<NativeObject>) -> Option<String> {
        match shader.and_then(|s| self.objects.get(&s)) {
            Some(Object::Shader { compiled: true, .. }) => Some(String::new()),
            Some(Object::Shader { .. }) => Some("ERROR: 0:1: 'main' : function not defined".into()),
            _ => None,
        }
    }

    fn shader_source_text(&mut self, shader: Option<NativeObject>) -> Option<String> {
        match shader.and_then(|s| self.objects.get(&s)) {
            Some(Object::Shader { source, .. }) => source.clone(),
            _ => None,
        }
    }

    fn attach_shader(&mut self, program: Option<NativeObject>, shader: Option<NativeObject>) {
        if let (Some(Object::Program { shaders, .. }), Some(shader)) =
            (program.and_then(|p| self.objects.get_mut(&p)), shader)
        {
            shaders.push(shader);
        }
        self.record("attachShader", format!("{program:?} {shader:?}"));
    }

    fn link_program(&mut self, program: Option<NativeObject>) {
        self.record("linkProgram", format!("{program:?}"));
        let Some(program) = program else {
            return;
        };
        let attached = match self.objects.get(&program) {
            Some(Object::Program { shaders, .. }) => shaders.clone(),
            _ => return,
        };

        let mut uniforms = Vec::new();
        let mut attribs = Vec::new();
        let mut all_compiled = !attached.is_empty();
        for shader in &attached {
            if let Some(Object::Shader {
                ty,
                source,
                compiled,
            }) = self.objects.get(shader)
            {
                all_compiled &= *compiled;
                let src = source.as_deref().unwrap_or_default();
                reflect(src, &["uniform"], &mut uniforms);
                if *ty == GlEnum::VertexShader.value() {
                    reflect(src, &["attribute", "in"], &mut attribs);
                }
            }
        }

        if let Some(Object::Program {
            linked,
            log,
            uniforms: u,
            attribs: a,
            ..
        }) = self.objects.get_mut(&program)
        {
            *linked = all_compiled;
            *log = if all_compiled {
                String::new()
            } else {
                "link failed: missing or uncompiled shaders".into()
            };
            *u = if all_compiled { uniforms } else { Vec::new() };
            *a = if all_compiled { attribs } else { Vec::new() };
        }
    }

    fn use_program(&mut self, program: Option<NativeObject>) {
        self.bind(Some(GlEnum::CurrentProgram), program);
        self.record("useProgram", format!("{program:?}"));
    }

    fn program_parameter(&mut self, program: Option<NativeObject>, pname: u32) -> ParameterValue {
        let Some(Object::Program {
            shaders,
            linked,
            uniforms,
            attribs,
            ..
        }) = program.and_then(|p| self.objects.get(&p))
        else {
            return ParameterValue::Null;
        };
        match GlEnum::from_u32(pname) {
            Some(GlEnum::LinkStatus) => ParameterValue::Bool(*linked),
            Some(GlEnum::DeleteStatus) => ParameterValue::Bool(false),
            Some(GlEnum::AttachedShaders) => ParameterValue::Int(shaders.len() as i64),
            Some(GlEnum::ActiveUniforms) => ParameterValue::Int(uniforms.len() as i64),
            Some(GlEnum::ActiveAttributes) => ParameterValue::Int(attribs.len() as i64),
            Some(GlEnum::ActiveUniformBlocks) => ParameterValue::Int(0),
            _ => ParameterValue::Null,
        }
    }

    fn program_info_log(&mut self, program: Option<NativeObject>) -> Option<String> {
        match program.and_then(|p| self.objects.get(&p)) {
            Some(Object::Program { log, .. }) => Some(log.clone()),
            _ => None,
        }
    }

    fn active_uniform(&mut self, program: NativeObject, index: u32) -> Option<ActiveInfo> {
        match self.objects.get(&program) {
            Some(Object::Program { uniforms, .. }) => uniforms.get(index as usize).cloned(),
            _ => None,
        }
    }

    fn active_attrib(&mut self, program: NativeObject, index: u32) -> Option<ActiveInfo> {
        match self.objects.get(&program) {
            Some(Object::Program { attribs, .. }) => attribs.get(index as usize).cloned(),
            _ => None,
        }
    }

    fn active_uniform_block_name(&mut self, _program: NativeObject, _index: u32) -> Option<String> {
        None
    }

    fn attrib_location(&mut self, program: Option<NativeObject>, name: &str) -> i32 {
        match program.and_then(|p| self.objects.get(&p)) {
            Some(Object::Program { attribs, .. }) => attribs
                .iter()
                .position(|a| a.name == name)
                .map_or(-1, |i| i as i32),
            _ => -1,
        }
    }

    fn uniform_location(&mut self, program: NativeObject, name: &str) -> Option<NativeObject> {
        let (base, index) = split_array_index(name);
        let index = index?;
        let size = match self.objects.get(&program) {
            Some(Object::Program {
                linked: true,
                uniforms,
                ..
            }) => uniforms
                .iter()
                .find(|u| super::program::base_name(&u.name) == base)?
                .size,
            _ => return None,
        };
        if index >= u32::try_from(size).unwrap_or(0) {
            return None;
        }

        let key = (program, base.to_owned(), index);
        if let Some(existing) = self.locations.get(&key) {
            return Some(*existing);
        }
        let location = self.mint(Object::Location)?;
        self.locations.insert(key, location);
        Some(location)
    }

    fn uniform_1f(&mut self, location: Option<NativeObject>, v: f32) {
        self.store_uniform(location, vec![v]);
        self.record("uniform1f", format!("{location:?} {v}"));
    }

    fn uniform_1i(&mut self, location: Option<NativeObject>, v: i32) {
        self.store_uniform(location, vec![v as f32]);
        self.record("uniform1i", format!("{location:?} {v}"));
    }

    fn uniform_fv(&mut self, location: Option<NativeObject>, components: u8, data: &[f32]) {
        self.store_uniform(location, data.to_vec());
        self.record("uniformfv", format!("{location:?} {components} {data:?}"));
    }

    fn uniform_iv(&mut self, location: Option<NativeObject>, components: u8, data: &[i32]) {
        self.store_uniform(location, data.iter().map(|&v| v as f32).collect());
        self.record("uniformiv", format!("{location:?} {components} {data:?}"));
    }

    fn uniform_matrix4fv(&mut self, location: Option<NativeObject>, transpose: bool, data: &[f32]) {
        self.store_uniform(location, data.to_vec());
        self.record(
            "uniformMatrix4fv",
            format!("{location:?} {transpose} floats={}", data.len()),
        );
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record("enableVertexAttribArray", format!("{index}"));
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.record("disableVertexAttribArray", format!("{index}"));
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i64,
    ) {
        self.record(
            "vertexAttribPointer",
            format!("{index} {size} {ty:#x} {normalized} {stride} {offset}"),
        );
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.record("vertexAttribDivisor", format!("{index} {divisor}"));
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.record("drawArrays", format!("{mode:#x} {first} {count}"));
    }

    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i64) {
        self.record("drawElements", format!("{mode:#x} {count} {ty:#x} {offset}"));
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        self.record(
            "drawArraysInstanced",
            format!("{mode:#x} {first} {count} {instances}"),
        );
    }

    fn draw_elements_instanced(&mut self, mode: u32, count: i32, ty: u32, offset: i64, instances: i32) {
        self.record(
            "drawElementsInstanced",
            format!("{mode:#x} {count} {ty:#x} {offset} {instances}"),
        );
    }

    fn begin_query(&mut self, target: u32, query: Option<NativeObject>) {
        self.record("beginQuery", format!("{target:#x} {query:?}"));
    }

    fn end_query(&mut self, target: u32) {
        self.record("endQuery", format!("{target:#x}"));
    }

    fn query_parameter(&mut self, query: Option<NativeObject>, pname: u32) -> ParameterValue {
        if !query.is_some_and(|q| self.objects.contains_key(&q)) {
            return ParameterValue::Null;
        }
        match GlEnum::from_u32(pname) {
            Some(GlEnum::QueryResultAvailable) => ParameterValue::Bool(true),
            Some(GlEnum::QueryResult) => ParameterValue::Int(QUERY_ELAPSED_NS),
            _ => ParameterValue::Null,
        }
    }

    fn parameter(&mut self, pname: u32) -> ParameterValue {
        if CAP_QUERIES.contains(&pname) {
            return ParameterValue::Bool(self.enabled.contains(&pname));
        }
        let Some(name) = GlEnum::from_u32(pname) else {
            return ParameterValue::Null;
        };
        if name.is_binding_query() {
            return self
                .bindings
                .get(&pname)
                .map_or(ParameterValue::Null, |o| ParameterValue::Object(*o));
        }
        match name {
            GlEnum::Viewport => {
                ParameterValue::Array(self.viewport.iter().map(|&v| f64::from(v)).collect())
            }
            GlEnum::ColorClearValue => {
                ParameterValue::Array(self.clear_color.iter().map(|&v| f64::from(v)).collect())
            }
            GlEnum::MaxTextureSize => ParameterValue::Int(4096),
            GlEnum::Version => ParameterValue::Text("WebGL 2.0 (headless)".into()),
            GlEnum::CompressedTextureFormats => ParameterValue::Array(Vec::new()),
            _ => ParameterValue::Null,
        }
    }
}
