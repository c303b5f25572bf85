//! Graphics call dispatch.
//!
//! `GlBridge` owns the native context, the name tables and the per-program uniform
//! cache. Every method takes guest names and guest pointers, resolves them, and
//! replays the call on the context. Guest memory is passed in per call and never
//! retained.
//!
//! Misuse (bad names, bad enums, payloads past the end of memory) is logged and the
//! call degrades to a no-op or a sentinel. Only a native creation failure is an
//! `Err`, so the caller can alert the operator.

use std::collections::HashMap;

use thiserror::Error;

use super::params::{IntegerQuery, query_integer};
use super::program::{ProgramInfo, UniformEntry, base_name};
use super::shader::translate_es100;
use super::tables::Validity;
use super::{
    BufferData, GraphicsContext, NativeObject, ObjectTables, ParameterValue, ResourceKind,
    TexImage2d, TexSubImage2d,
};
use crate::abi::gl::GlEnum;
use crate::memory::{GuestMemory, MemoryError, utf8_prefix_len};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GlError {
    #[error("{entry}: failed to create a {kind}, the graphics context was probably lost")]
    CreationFailed {
        entry: &'static str,
        kind: &'static str,
    },
}

/// Bytes of one `width x height` image in `format`.
///
/// Alpha is one byte per pixel, RGB three and RGBA four; every other format
/// (including the packed 16-bit ones) is budgeted as three.
pub fn texture_size(format: u32, width: i32, height: i32) -> usize {
    let channels: u64 = match GlEnum::from_u32(format) {
        Some(GlEnum::Alpha) => 1,
        Some(GlEnum::Rgb) => 3,
        Some(GlEnum::Rgba) => 4,
        _ => 3,
    };
    let pixels = u64::from(width.max(0) as u32).saturating_mul(u64::from(height.max(0) as u32));
    usize::try_from(channels.saturating_mul(pixels)).unwrap_or(usize::MAX)
}

pub struct GlBridge {
    ctx: Box<dyn GraphicsContext>,
    tables: ObjectTables,
    programs: HashMap<u32, ProgramInfo>,
    last_error: u32,
    shader_compat: bool,
}

impl GlBridge {
    pub fn new(ctx: Box<dyn GraphicsContext>, shader_compat: bool) -> Self {
        Self {
            ctx,
            tables: ObjectTables::new(),
            programs: HashMap::new(),
            last_error: GlEnum::NoError.value(),
            shader_compat,
        }
    }

    /// Native context for pass-through state and draw calls.
    pub fn context(&mut self) -> &mut dyn GraphicsContext {
        self.ctx.as_mut()
    }

    pub fn tables(&self) -> &ObjectTables {
        &self.tables
    }

    pub fn program_info(&self, program: u32) -> Option<&ProgramInfo> {
        self.programs.get(&program)
    }

    pub fn shader_compat(&self) -> bool {
        self.shader_compat
    }

    pub fn set_shader_compat(&mut self, enabled: bool) {
        self.shader_compat = enabled;
    }

    /// Give the native context back, deleting every live object first.
    pub fn into_context(mut self) -> Box<dyn GraphicsContext> {
        self.release_all();
        self.ctx
    }

    /// Keep the first unread error, like a native implementation does.
    pub fn record_error(&mut self, error: GlEnum) {
        if self.last_error == GlEnum::NoError.value() {
            self.last_error = error.value();
        }
    }

    /// `glGetError`: return and clear the pending error.
    pub fn get_error(&mut self) -> u32 {
        std::mem::replace(&mut self.last_error, GlEnum::NoError.value())
    }

    fn resolve(&self, kind: ResourceKind, id: u32, caller: &str) -> Option<NativeObject> {
        self.tables.resolve(kind, id, caller)
    }

    fn bad_payload(&mut self, caller: &str, err: MemoryError) {
        tracing::warn!("{caller}: {err}");
        self.record_error(GlEnum::InvalidValue);
    }

    fn creation_failed(&mut self, entry: &'static str, kind: ResourceKind) -> GlError {
        tracing::error!("{entry}: native {} creation returned null", kind.label());
        self.record_error(GlEnum::InvalidOperation);
        GlError::CreationFailed {
            entry,
            kind: kind.label(),
        }
    }

    // --- object lifecycle ---

    /// `glGen*`: create `n` objects and write their names to `ids`.
    ///
    /// A failed creation writes 0 for that slot and keeps going; the first failure
    /// is returned once the whole array has been filled.
    pub fn gen_objects(
        &mut self,
        mem: &mut GuestMemory<'_>,
        kind: ResourceKind,
        entry: &'static str,
        n: i32,
        ids: u32,
    ) -> Result<(), GlError> {
        let count = n.max(0) as usize;
        if let Err(err) = mem.view::<u32>(ids, count) {
            self.bad_payload(entry, err);
            return Ok(());
        }

        let mut failure = None;
        for i in 0..count {
            let name = match self.ctx.create(kind) {
                Some(object) => self.tables.insert_new(kind, object),
                None => {
                    let err = self.creation_failed(entry, kind);
                    failure.get_or_insert(err);
                    0
                }
            };
            if let Ok(mut out) = mem.view_mut::<u32>(ids, count) {
                out.set(i, name);
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// `glDelete*`: delete every live name in `ids`. Zero and stale names are skipped.
    pub fn delete_objects(
        &mut self,
        mem: &GuestMemory<'_>,
        kind: ResourceKind,
        entry: &'static str,
        n: i32,
        ids: u32,
    ) {
        let names = match mem.view::<u32>(ids, n.max(0) as usize) {
            Ok(view) => view.to_vec(),
            Err(err) => {
                self.bad_payload(entry, err);
                return;
            }
        };
        for name in names {
            self.delete_one(kind, name);
        }
    }

    fn delete_one(&mut self, kind: ResourceKind, name: u32) {
        let Some(object) = self.tables.remove(kind, name) else {
            return;
        };
        if kind == ResourceKind::Program {
            self.retire_program(name);
        }
        self.ctx.delete(kind, object);
    }

    fn retire_program(&mut self, program: u32) {
        if let Some(info) = self.programs.remove(&program) {
            for location in info.location_names {
                self.tables.remove(ResourceKind::UniformLocation, location);
            }
        }
    }

    pub fn create_program(&mut self) -> Result<u32, GlError> {
        match self.ctx.create(ResourceKind::Program) {
            Some(object) => Ok(self.tables.insert_new(ResourceKind::Program, object)),
            None => Err(self.creation_failed("glCreateProgram", ResourceKind::Program)),
        }
    }

    pub fn create_shader(&mut self, shader_type: u32) -> Result<u32, GlError> {
        match self.ctx.create_shader(shader_type) {
            Some(object) => Ok(self.tables.insert_new(ResourceKind::Shader, object)),
            None => Err(self.creation_failed("glCreateShader", ResourceKind::Shader)),
        }
    }

    pub fn delete_program(&mut self, program: u32) {
        self.tables
            .validate(ResourceKind::Program, program, "glDeleteProgram");
        self.delete_one(ResourceKind::Program, program);
    }

    pub fn delete_shader(&mut self, shader: u32) {
        self.tables
            .validate(ResourceKind::Shader, shader, "glDeleteShader");
        self.delete_one(ResourceKind::Shader, shader);
    }

    /// Delete every live native object and forget all names. Used on teardown.
    pub fn release_all(&mut self) {
        for kind in ResourceKind::ALL {
            if kind == ResourceKind::UniformLocation {
                continue;
            }
            let live: Vec<_> = self.tables.live(kind).map(|(_, object)| object).collect();
            for object in live {
                self.ctx.delete(kind, object);
            }
        }
        self.tables.clear();
        self.programs.clear();
    }

    // --- bindings ---

    pub fn bind_buffer(&mut self, target: u32, buffer: u32) {
        let object = self.resolve(ResourceKind::Buffer, buffer, "glBindBuffer");
        self.ctx.bind_buffer(target, object);
    }

    pub fn bind_texture(&mut self, target: u32, texture: u32) {
        let object = self.resolve(ResourceKind::Texture, texture, "glBindTexture");
        self.ctx.bind_texture(target, object);
    }

    pub fn bind_framebuffer(&mut self, target: u32, framebuffer: u32) {
        let object = self.resolve(ResourceKind::Framebuffer, framebuffer, "glBindFramebuffer");
        self.ctx.bind_framebuffer(target, object);
    }

    pub fn bind_renderbuffer(&mut self, target: u32, renderbuffer: u32) {
        let object = self.resolve(ResourceKind::Renderbuffer, renderbuffer, "glBindRenderbuffer");
        self.ctx.bind_renderbuffer(target, object);
    }

    pub fn bind_vertex_array(&mut self, vao: u32) {
        let object = self.resolve(ResourceKind::VertexArray, vao, "glBindVertexArray");
        self.ctx.bind_vertex_array(object);
    }

    pub fn framebuffer_texture_2d(
        &mut self,
        target: u32,
        attachment: u32,
        textarget: u32,
        texture: u32,
        level: i32,
    ) {
        let object = self.resolve(ResourceKind::Texture, texture, "glFramebufferTexture2D");
        self.ctx
            .framebuffer_texture_2d(target, attachment, textarget, object, level);
    }

    pub fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: u32,
    ) {
        let object = self.resolve(
            ResourceKind::Renderbuffer,
            renderbuffer,
            "glFramebufferRenderbuffer",
        );
        self.ctx
            .framebuffer_renderbuffer(target, attachment, renderbuffer_target, object);
    }

    // --- textures ---

    pub fn tex_image_2d(&mut self, mem: &GuestMemory<'_>, desc: &TexImage2d, pixels: u32) {
        if pixels == 0 {
            self.ctx.tex_image_2d(desc, None);
            return;
        }
        let len = texture_size(desc.internal_format as u32, desc.width, desc.height);
        match mem.bytes(pixels, len) {
            Ok(data) => self.ctx.tex_image_2d(desc, Some(data)),
            Err(err) => self.bad_payload("glTexImage2D", err),
        }
    }

    pub fn tex_sub_image_2d(&mut self, mem: &GuestMemory<'_>, desc: &TexSubImage2d, pixels: u32) {
        if pixels == 0 {
            self.ctx.tex_sub_image_2d(desc, None);
            return;
        }
        let len = texture_size(desc.format, desc.width, desc.height);
        match mem.bytes(pixels, len) {
            Ok(data) => self.ctx.tex_sub_image_2d(desc, Some(data)),
            Err(err) => self.bad_payload("glTexSubImage2D", err),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn read_pixels(
        &mut self,
        mem: &mut GuestMemory<'_>,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: u32,
    ) {
        let len = texture_size(format, width, height);
        match mem.bytes_mut(pixels, len) {
            Ok(out) => self.ctx.read_pixels(x, y, width, height, format, ty, out),
            Err(err) => self.bad_payload("glReadPixels", err),
        }
    }

    // --- buffers ---

    pub fn buffer_data(&mut self, mem: &GuestMemory<'_>, target: u32, size: i64, data: u32, usage: u32) {
        if data == 0 {
            self.ctx.buffer_data(target, BufferData::Size(size), usage);
            return;
        }
        match mem.bytes(data, size.max(0) as usize) {
            Ok(bytes) => self.ctx.buffer_data(target, BufferData::Bytes(bytes), usage),
            Err(err) => self.bad_payload("glBufferData", err),
        }
    }

    pub fn buffer_sub_data(&mut self, mem: &GuestMemory<'_>, target: u32, offset: i64, size: i64, data: u32) {
        match mem.bytes(data, size.max(0) as usize) {
            Ok(bytes) => self.ctx.buffer_sub_data(target, offset, bytes),
            Err(err) => self.bad_payload("glBufferSubData", err),
        }
    }

    // --- shaders and programs ---

    /// `glShaderSource`: `lengths == 0` means every string is NUL-terminated.
    pub fn shader_source(&mut self, mem: &GuestMemory<'_>, shader: u32, count: i32, strings: u32, lengths: u32) {
        let object = self.resolve(ResourceKind::Shader, shader, "glShaderSource");
        let mut source = String::new();
        for i in 0..count.max(0) as u32 {
            let at = i.saturating_mul(4);
            let text_ptr = match mem.read::<u32>(strings.saturating_add(at)) {
                Ok(ptr) => ptr,
                Err(err) => return self.bad_payload("glShaderSource", err),
            };
            let max = if lengths == 0 {
                None
            } else {
                match mem.read::<i32>(lengths.saturating_add(at)) {
                    Ok(len) if len >= 0 => Some(len as usize),
                    Ok(_) => None,
                    Err(err) => return self.bad_payload("glShaderSource", err),
                }
            };
            source.push_str(&mem.read_utf8(text_ptr, max));
        }

        if self.shader_compat {
            source = translate_es100(&source);
        }
        self.ctx.shader_source(object, &source);
    }

    pub fn compile_shader(&mut self, shader: u32) {
        let object = self.resolve(ResourceKind::Shader, shader, "glCompileShader");
        self.ctx.compile_shader(object);
    }

    pub fn attach_shader(&mut self, program: u32, shader: u32) {
        let program = self.resolve(ResourceKind::Program, program, "glAttachShader");
        let shader = self.resolve(ResourceKind::Shader, shader, "glAttachShader");
        self.ctx.attach_shader(program, shader);
    }

    pub fn use_program(&mut self, program: u32) {
        let object = self.resolve(ResourceKind::Program, program, "glUseProgram");
        self.ctx.use_program(object);
    }

    /// `glLinkProgram`, then rebuild the program's uniform cache.
    pub fn link_program(&mut self, program: u32) {
        let object = self.resolve(ResourceKind::Program, program, "glLinkProgram");
        self.ctx.link_program(object);
        self.retire_program(program);
        if let Some(object) = object {
            let info = self.populate_uniforms(object);
            self.programs.insert(program, info);
        }
    }

    fn populate_uniforms(&mut self, program: NativeObject) -> ProgramInfo {
        let mut info = ProgramInfo::default();
        let active = self
            .ctx
            .program_parameter(Some(program), GlEnum::ActiveUniforms.value())
            .as_i32()
            .unwrap_or(0);

        for index in 0..active.max(0) as u32 {
            let Some(uniform) = self.ctx.active_uniform(program, index) else {
                continue;
            };
            info.max_uniform_length = info.max_uniform_length.max(uniform.name.len() as i32 + 1);
            let base = base_name(&uniform.name).to_owned();

            let Some(location) = self.ctx.uniform_location(program, &base) else {
                continue;
            };
            let base_id = self.tables.insert_new(ResourceKind::UniformLocation, location);
            info.location_names.push(base_id);
            let size = uniform.size.max(1) as u32;

            // Element names follow the base name consecutively.
            for element in 1..size {
                let id = self.tables.allocate(ResourceKind::UniformLocation);
                if let Some(location) = self.ctx.uniform_location(program, &format!("{base}[{element}]")) {
                    self.tables.insert(ResourceKind::UniformLocation, id, location);
                }
                info.location_names.push(id);
            }
            info.uniforms.insert(base, UniformEntry { size, base: base_id });
        }
        info
    }

    pub fn get_uniform_location(&mut self, mem: &GuestMemory<'_>, program: u32, name: u32) -> i32 {
        self.tables
            .validate(ResourceKind::Program, program, "glGetUniformLocation");
        let name = mem.read_utf8(name, None);
        match self.programs.get(&program) {
            Some(info) => info.location(&name),
            None => -1,
        }
    }

    pub fn get_attrib_location(&mut self, mem: &GuestMemory<'_>, program: u32, name: u32) -> i32 {
        let object = self.resolve(ResourceKind::Program, program, "glGetAttribLocation");
        let name = mem.read_utf8(name, None);
        self.ctx.attrib_location(object, &name)
    }

    fn write_i32(&mut self, mem: &mut GuestMemory<'_>, caller: &str, ptr: u32, value: i32) {
        if let Err(err) = mem.write::<i32>(ptr, value) {
            self.bad_payload(caller, err);
        }
    }

    pub fn get_shader_iv(&mut self, mem: &mut GuestMemory<'_>, shader: u32, pname: u32, out: u32) {
        if out == 0 {
            tracing::error!("GL_INVALID_VALUE in glGetShaderiv: null out pointer");
            self.record_error(GlEnum::InvalidValue);
            return;
        }
        let object = self.resolve(ResourceKind::Shader, shader, "glGetShaderiv");
        let value = match GlEnum::from_u32(pname) {
            Some(GlEnum::InfoLogLength) => {
                let log = self
                    .ctx
                    .shader_info_log(object)
                    .unwrap_or_else(|| "(unknown error)".into());
                log.len() as i32 + 1
            }
            Some(GlEnum::ShaderSourceLength) => match self.ctx.shader_source_text(object) {
                Some(source) if !source.is_empty() => source.len() as i32 + 1,
                _ => 0,
            },
            _ => self.ctx.shader_parameter(object, pname).as_i32().unwrap_or(0),
        };
        self.write_i32(mem, "glGetShaderiv", out, value);
    }

    pub fn get_program_iv(&mut self, mem: &mut GuestMemory<'_>, program: u32, pname: u32, out: u32) {
        if out == 0 {
            tracing::error!("GL_INVALID_VALUE in glGetProgramiv: null out pointer");
            self.record_error(GlEnum::InvalidValue);
            return;
        }
        let object = self.resolve(ResourceKind::Program, program, "glGetProgramiv");
        if program >= self.tables.counter() {
            tracing::error!("GL_INVALID_VALUE in glGetProgramiv(program={program})");
            self.record_error(GlEnum::InvalidValue);
            return;
        }
        let (Some(object), true) = (object, self.programs.contains_key(&program)) else {
            tracing::error!(
                "GL_INVALID_OPERATION in glGetProgramiv(program={program}, pname={pname:#x}): not a linked program object"
            );
            self.record_error(GlEnum::InvalidOperation);
            return;
        };

        let value = match GlEnum::from_u32(pname) {
            Some(GlEnum::InfoLogLength) => {
                let log = self
                    .ctx
                    .program_info_log(Some(object))
                    .unwrap_or_else(|| "(unknown error)".into());
                log.len() as i32 + 1
            }
            Some(GlEnum::ActiveUniformMaxLength) => self
                .programs
                .get(&program)
                .map_or(0, |info| info.max_uniform_length),
            Some(GlEnum::ActiveAttributeMaxLength) => self.max_attribute_length(program, object),
            Some(GlEnum::ActiveUniformBlockMaxNameLength) => {
                self.max_uniform_block_name_length(program, object)
            }
            _ => self
                .ctx
                .program_parameter(Some(object), pname)
                .as_i32()
                .unwrap_or(0),
        };
        self.write_i32(mem, "glGetProgramiv", out, value);
    }

    fn max_attribute_length(&mut self, program: u32, object: NativeObject) -> i32 {
        if let Some(cached) = self.programs.get(&program).and_then(|i| i.max_attribute_length) {
            return cached;
        }
        let count = self
            .ctx
            .program_parameter(Some(object), GlEnum::ActiveAttributes.value())
            .as_i32()
            .unwrap_or(0);
        let mut longest = 0;
        for index in 0..count.max(0) as u32 {
            if let Some(attrib) = self.ctx.active_attrib(object, index) {
                longest = longest.max(attrib.name.len() as i32 + 1);
            }
        }
        if let Some(info) = self.programs.get_mut(&program) {
            info.max_attribute_length = Some(longest);
        }
        longest
    }

    fn max_uniform_block_name_length(&mut self, program: u32, object: NativeObject) -> i32 {
        if let Some(cached) = self
            .programs
            .get(&program)
            .and_then(|i| i.max_uniform_block_name_length)
        {
            return cached;
        }
        let count = self
            .ctx
            .program_parameter(Some(object), GlEnum::ActiveUniformBlocks.value())
            .as_i32()
            .unwrap_or(0);
        let mut longest = 0;
        for index in 0..count.max(0) as u32 {
            if let Some(name) = self.ctx.active_uniform_block_name(object, index) {
                longest = longest.max(name.len() as i32 + 1);
            }
        }
        if let Some(info) = self.programs.get_mut(&program) {
            info.max_uniform_block_name_length = Some(longest);
        }
        longest
    }

    /// Write `log` NUL-terminated into `[info_log, info_log + max_length)`.
    fn write_info_log(
        &mut self,
        mem: &mut GuestMemory<'_>,
        caller: &str,
        log: &str,
        max_length: i32,
        length: u32,
        info_log: u32,
    ) {
        let mut written = 0;
        if max_length > 0 && info_log != 0 {
            written = utf8_prefix_len(log, max_length as usize - 1);
            let result = mem
                .write_bytes(info_log, &log.as_bytes()[..written])
                .and_then(|()| mem.write::<u8>(info_log.saturating_add(written as u32), 0));
            if let Err(err) = result {
                self.bad_payload(caller, err);
                return;
            }
        }
        if length != 0 {
            self.write_i32(mem, caller, length, written as i32);
        }
    }

    pub fn get_program_info_log(
        &mut self,
        mem: &mut GuestMemory<'_>,
        program: u32,
        max_length: i32,
        length: u32,
        info_log: u32,
    ) {
        let object = self.resolve(ResourceKind::Program, program, "glGetProgramInfoLog");
        let log = self
            .ctx
            .program_info_log(object)
            .unwrap_or_else(|| "(unknown error)".into());
        self.write_info_log(mem, "glGetProgramInfoLog", &log, max_length, length, info_log);
    }

    pub fn get_shader_info_log(
        &mut self,
        mem: &mut GuestMemory<'_>,
        shader: u32,
        max_length: i32,
        length: u32,
        info_log: u32,
    ) {
        let object = self.resolve(ResourceKind::Shader, shader, "glGetShaderInfoLog");
        let log = self
            .ctx
            .shader_info_log(object)
            .unwrap_or_else(|| "(unknown error)".into());
        self.write_info_log(mem, "glGetShaderInfoLog", &log, max_length, length, info_log);
    }

    // --- uniforms ---

    fn location(&self, location: i32, caller: &str) -> Option<NativeObject> {
        // -1 is "not found" and silently ignored, as natively.
        if location < 0 {
            return None;
        }
        self.resolve(ResourceKind::UniformLocation, location as u32, caller)
    }

    pub fn uniform_1f(&mut self, location: i32, v: f32) {
        let loc = self.location(location, "glUniform1f");
        self.ctx.uniform_1f(loc, v);
    }

    pub fn uniform_1i(&mut self, location: i32, v: i32) {
        let loc = self.location(location, "glUniform1i");
        self.ctx.uniform_1i(loc, v);
    }

    /// `glUniform{1,2,3,4}fv`: `count` vectors of `components` floats.
    pub fn uniform_fv(
        &mut self,
        mem: &GuestMemory<'_>,
        entry: &'static str,
        location: i32,
        components: u8,
        count: i32,
        value: u32,
    ) {
        let loc = self.location(location, entry);
        let len = (count.max(0) as usize).saturating_mul(components as usize);
        match mem.view::<f32>(value, len) {
            Ok(data) => self.ctx.uniform_fv(loc, components, &data.to_vec()),
            Err(err) => self.bad_payload(entry, err),
        }
    }

    pub fn uniform_iv(
        &mut self,
        mem: &GuestMemory<'_>,
        entry: &'static str,
        location: i32,
        components: u8,
        count: i32,
        value: u32,
    ) {
        let loc = self.location(location, entry);
        let len = (count.max(0) as usize).saturating_mul(components as usize);
        match mem.view::<i32>(value, len) {
            Ok(data) => self.ctx.uniform_iv(loc, components, &data.to_vec()),
            Err(err) => self.bad_payload(entry, err),
        }
    }

    pub fn uniform_matrix4fv(&mut self, mem: &GuestMemory<'_>, location: i32, count: i32, transpose: bool, value: u32) {
        let loc = self.location(location, "glUniformMatrix4fv");
        let len = (count.max(0) as usize).saturating_mul(16);
        match mem.view::<f32>(value, len) {
            Ok(data) => self.ctx.uniform_matrix4fv(loc, transpose, &data.to_vec()),
            Err(err) => self.bad_payload("glUniformMatrix4fv", err),
        }
    }

    // --- queries ---

    pub fn begin_query(&mut self, target: u32, query: u32) {
        let object = self.resolve(ResourceKind::Query, query, "glBeginQuery");
        self.ctx.begin_query(target, object);
    }

    fn query_value(&mut self, query: u32, pname: u32, caller: &str) -> i64 {
        let object = self.resolve(ResourceKind::Query, query, caller);
        match self.ctx.query_parameter(object, pname) {
            ParameterValue::Bool(b) => i64::from(b),
            ParameterValue::Int(v) => v,
            ParameterValue::Float(v) => v as i64,
            _ => 0,
        }
    }

    pub fn get_query_object_iv(&mut self, mem: &mut GuestMemory<'_>, query: u32, pname: u32, out: u32) {
        let value = self.query_value(query, pname, "glGetQueryObjectiv");
        if let Err(err) = mem.write::<u32>(out, value as u32) {
            self.bad_payload("glGetQueryObjectiv", err);
        }
    }

    /// 64-bit result written as two little-endian `u32` halves, low first.
    pub fn get_query_object_ui64v(&mut self, mem: &mut GuestMemory<'_>, query: u32, pname: u32, out: u32) {
        let value = self.query_value(query, pname, "glGetQueryObjectui64v");
        if let Err(err) = mem.write::<u64>(out, value as u64) {
            self.bad_payload("glGetQueryObjectui64v", err);
        }
    }

    /// `glGetIntegerv`.
    pub fn get_integerv(&mut self, mem: &mut GuestMemory<'_>, pname: u32, out: u32) {
        if out == 0 {
            tracing::error!("GL_INVALID_VALUE in glGetIntegerv({pname:#x}): null out pointer");
            self.record_error(GlEnum::InvalidValue);
            return;
        }
        match query_integer(self.ctx.as_mut(), &self.tables, pname) {
            IntegerQuery::Value(v) => self.write_i32(mem, "glGetIntegerv", out, v),
            IntegerQuery::Unwritten => {}
            IntegerQuery::Error(error) => self.record_error(error),
        }
    }

    /// Whether `id` currently names a live object of `kind`.
    pub fn is_live(&self, kind: ResourceKind, id: u32) -> bool {
        matches!(self.tables.check(kind, id), Validity::Live(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessContext;

    const VS: &str = "attribute vec2 pos; uniform mat4 mvp; void main() {}";
    const FS: &str = "uniform vec3 colors[3]; uniform float t; void main() {}";

    fn bridge() -> GlBridge {
        GlBridge::new(Box::new(HeadlessContext::new()), false)
    }

    fn put_str(buf: &mut [u8], at: usize, s: &str) -> u32 {
        buf[at..at + s.len()].copy_from_slice(s.as_bytes());
        buf[at + s.len()] = 0;
        at as u32
    }

    fn linked_program(gl: &mut GlBridge, buf: &mut Vec<u8>) -> u32 {
        let vs = gl.create_shader(GlEnum::VertexShader.value()).unwrap();
        let fs = gl.create_shader(GlEnum::FragmentShader.value()).unwrap();
        for (shader, src) in [(vs, VS), (fs, FS)] {
            let p = put_str(buf, 512, src);
            buf[0..4].copy_from_slice(&p.to_le_bytes());
            let mem = GuestMemory::new(buf);
            gl.shader_source(&mem, shader, 1, 0, 0);
            gl.compile_shader(shader);
        }
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);
        program
    }

    #[test]
    fn texture_size_budgets_by_format() {
        assert_eq!(texture_size(GlEnum::Alpha.value(), 4, 2), 8);
        assert_eq!(texture_size(GlEnum::Rgb.value(), 4, 2), 24);
        assert_eq!(texture_size(GlEnum::Rgba.value(), 4, 2), 32);
        assert_eq!(texture_size(0x8363, 4, 2), 24);
        assert_eq!(texture_size(GlEnum::Rgba.value(), -1, 2), 0);
    }

    #[test]
    fn gen_writes_shared_monotonic_names() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 64];
        let mut mem = GuestMemory::new(&mut buf);
        gl.gen_objects(&mut mem, ResourceKind::Buffer, "glGenBuffers", 1, 0).unwrap();
        gl.gen_objects(&mut mem, ResourceKind::Texture, "glGenTextures", 1, 4).unwrap();
        assert_eq!(mem.read::<u32>(0).unwrap(), 1);
        assert_eq!(mem.read::<u32>(4).unwrap(), 2);

        gl.delete_objects(&mem, ResourceKind::Buffer, "glDeleteBuffers", 1, 0);
        gl.gen_objects(&mut mem, ResourceKind::Buffer, "glGenBuffers", 1, 8).unwrap();
        assert_eq!(mem.read::<u32>(8).unwrap(), 3);
        assert!(!gl.is_live(ResourceKind::Buffer, 1));
    }

    #[test]
    fn lost_context_writes_zero_and_reports() {
        let mut ctx = HeadlessContext::new();
        ctx.set_context_lost(true);
        let mut gl = GlBridge::new(Box::new(ctx), false);
        let mut buf = vec![0xFFu8; 8];
        let mut mem = GuestMemory::new(&mut buf);
        let err = gl
            .gen_objects(&mut mem, ResourceKind::Texture, "glGenTextures", 2, 0)
            .unwrap_err();
        assert!(matches!(err, GlError::CreationFailed { entry: "glGenTextures", .. }));
        assert_eq!(mem.view::<u32>(0, 2).unwrap().to_vec(), vec![0, 0]);
        assert_eq!(gl.get_error(), GlEnum::InvalidOperation.value());
        assert_eq!(gl.get_error(), GlEnum::NoError.value());
    }

    #[test]
    fn array_uniform_locations_are_consecutive() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 1024];
        let program = linked_program(&mut gl, &mut buf);

        let base = {
            let p = put_str(&mut buf, 900, "colors");
            gl.get_uniform_location(&GuestMemory::new(&mut buf), program, p)
        };
        let second = {
            let p = put_str(&mut buf, 900, "colors[1]");
            gl.get_uniform_location(&GuestMemory::new(&mut buf), program, p)
        };
        let past_end = {
            let p = put_str(&mut buf, 900, "colors[5]");
            gl.get_uniform_location(&GuestMemory::new(&mut buf), program, p)
        };
        assert!(base > 0);
        assert_eq!(second, base + 1);
        assert_eq!(past_end, -1);
    }

    #[test]
    fn relink_retires_old_locations() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 1024];
        let program = linked_program(&mut gl, &mut buf);
        let old: Vec<u32> = gl.program_info(program).unwrap().location_names.clone();
        assert!(!old.is_empty());
        gl.link_program(program);
        for name in old {
            assert!(!gl.is_live(ResourceKind::UniformLocation, name));
        }
        let info = gl.program_info(program).unwrap();
        assert!(info.uniforms.contains_key("colors"));
    }

    #[test]
    fn program_iv_reports_cached_lengths() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 1024];
        let program = linked_program(&mut gl, &mut buf);
        let mut mem = GuestMemory::new(&mut buf);

        gl.get_program_iv(&mut mem, program, GlEnum::ActiveUniformMaxLength.value(), 16);
        // "colors[0]" plus terminator.
        assert_eq!(mem.read::<i32>(16).unwrap(), 10);
        gl.get_program_iv(&mut mem, program, GlEnum::ActiveAttributeMaxLength.value(), 16);
        assert_eq!(mem.read::<i32>(16).unwrap(), 4);
        gl.get_program_iv(&mut mem, program, GlEnum::LinkStatus.value(), 16);
        assert_eq!(mem.read::<i32>(16).unwrap(), 1);
    }

    #[test]
    fn program_iv_errors_for_unknown_and_unlinked() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 64];
        let mut mem = GuestMemory::new(&mut buf);
        gl.get_program_iv(&mut mem, 99, GlEnum::LinkStatus.value(), 16);
        assert_eq!(gl.get_error(), GlEnum::InvalidValue.value());

        let program = gl.create_program().unwrap();
        gl.get_program_iv(&mut mem, program, GlEnum::LinkStatus.value(), 16);
        assert_eq!(gl.get_error(), GlEnum::InvalidOperation.value());
    }

    #[test]
    fn info_log_is_nul_terminated_and_bounded() {
        let mut gl = bridge();
        let mut buf = vec![0xAAu8; 64];
        let mut mem = GuestMemory::new(&mut buf);
        let shader = gl.create_shader(GlEnum::VertexShader.value()).unwrap();
        gl.compile_shader(shader);
        gl.get_shader_info_log(&mut mem, shader, 6, 40, 0);
        assert_eq!(mem.bytes(0, 6).unwrap(), b"ERROR\0");
        assert_eq!(mem.read::<i32>(40).unwrap(), 5);
    }

    #[test]
    fn shader_source_concatenates_with_lengths() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 256];
        put_str(&mut buf, 100, "void ");
        put_str(&mut buf, 120, "main() {}XXXX");
        buf[0..4].copy_from_slice(&100u32.to_le_bytes());
        buf[4..8].copy_from_slice(&120u32.to_le_bytes());
        buf[8..12].copy_from_slice(&(-1i32).to_le_bytes());
        buf[12..16].copy_from_slice(&9i32.to_le_bytes());
        let shader = gl.create_shader(GlEnum::VertexShader.value()).unwrap();
        let mut mem = GuestMemory::new(&mut buf);
        gl.shader_source(&mem, shader, 2, 0, 8);
        gl.get_shader_iv(&mut mem, shader, GlEnum::ShaderSourceLength.value(), 32);
        assert_eq!(mem.read::<i32>(32).unwrap(), "void main() {}".len() as i32 + 1);
    }

    #[test]
    fn stale_names_degrade_to_no_object() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 16];
        let mut mem = GuestMemory::new(&mut buf);
        gl.gen_objects(&mut mem, ResourceKind::Buffer, "glGenBuffers", 1, 0).unwrap();
        gl.delete_objects(&mem, ResourceKind::Buffer, "glDeleteBuffers", 1, 0);
        gl.bind_buffer(GlEnum::ArrayBuffer.value(), 1);
        gl.bind_buffer(GlEnum::ArrayBuffer.value(), 42);
        assert_eq!(gl.get_error(), GlEnum::NoError.value());
    }

    #[test]
    fn get_integerv_null_pointer_is_invalid_value() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 16];
        let mut mem = GuestMemory::new(&mut buf);
        gl.get_integerv(&mut mem, GlEnum::MaxTextureSize.value(), 0);
        assert_eq!(gl.get_error(), GlEnum::InvalidValue.value());
        gl.get_integerv(&mut mem, GlEnum::MaxTextureSize.value(), 4);
        assert_eq!(mem.read::<i32>(4).unwrap(), 4096);
    }

    #[test]
    fn query_results_split_into_halves() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 32];
        let mut mem = GuestMemory::new(&mut buf);
        gl.gen_objects(&mut mem, ResourceKind::Query, "glGenQueries", 1, 0).unwrap();
        let query = mem.read::<u32>(0).unwrap();
        gl.get_query_object_ui64v(&mut mem, query, GlEnum::QueryResult.value(), 8);
        let low = mem.read::<u32>(8).unwrap();
        let high = mem.read::<u32>(12).unwrap();
        assert_eq!(
            (u64::from(high) << 32) | u64::from(low),
            crate::gl::headless::QUERY_ELAPSED_NS as u64
        );
    }

    #[test]
    fn release_all_deletes_natives() {
        let mut gl = bridge();
        let mut buf = vec![0u8; 1024];
        let program = linked_program(&mut gl, &mut buf);
        gl.release_all();
        assert!(!gl.is_live(ResourceKind::Program, program));
        assert!(gl.program_info(program).is_none());
    }
}
