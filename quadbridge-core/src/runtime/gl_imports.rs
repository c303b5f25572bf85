//! `gl*` host imports.
//!
//! Argument types follow the wasm32 lowering of the GLES C types: enums, bitfields
//! and names are `u32`; ints, sizes and pointer-sized offsets are `i32`; booleans
//! arrive as `i32`.

use wasmtime::{Caller, Linker};

use super::imports::with_memory;
use crate::abi::IMPORT_MODULE;
use crate::gl::{GlError, ResourceKind};
use crate::gl::{TexImage2d, TexSubImage2d};
use crate::state::HostState;

/// Native creation failures are unrecoverable for the guest; tell the operator.
fn report(state: &mut HostState, err: GlError) {
    tracing::error!("{err}");
    state.surface.alert(&err.to_string());
}

fn r#gen(caller: &mut Caller<'_, HostState>, kind: ResourceKind, entry: &'static str, n: i32, ids: u32) {
    with_memory(caller, entry, (), |mem, state| {
        if let Err(err) = state.gl.gen_objects(mem, kind, entry, n, ids) {
            report(state, err);
        }
    });
}

fn delete(caller: &mut Caller<'_, HostState>, kind: ResourceKind, entry: &'static str, n: i32, ids: u32) {
    with_memory(caller, entry, (), |mem, state| {
        state.gl.delete_objects(mem, kind, entry, n, ids);
    });
}

pub fn define_gl_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    define_state_imports(linker)?;
    define_object_imports(linker)?;
    define_texture_imports(linker)?;
    define_buffer_imports(linker)?;
    define_program_imports(linker)?;
    define_uniform_imports(linker)?;
    define_draw_imports(linker)?;
    define_query_imports(linker)?;
    Ok(())
}

fn define_state_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(IMPORT_MODULE, "glClearDepthf", |mut caller: Caller<'_, HostState>, depth: f32| {
        caller.data_mut().gl.context().clear_depth(depth);
    })?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glClearColor",
        |mut caller: Caller<'_, HostState>, r: f32, g: f32, b: f32, a: f32| {
            caller.data_mut().gl.context().clear_color(r, g, b, a);
        },
    )?;
    linker.func_wrap(IMPORT_MODULE, "glClearStencil", |mut caller: Caller<'_, HostState>, s: i32| {
        caller.data_mut().gl.context().clear_stencil(s);
    })?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glColorMask",
        |mut caller: Caller<'_, HostState>, r: i32, g: i32, b: i32, a: i32| {
            caller
                .data_mut()
                .gl
                .context()
                .color_mask(r != 0, g != 0, b != 0, a != 0);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glScissor",
        |mut caller: Caller<'_, HostState>, x: i32, y: i32, w: i32, h: i32| {
            caller.data_mut().gl.context().scissor(x, y, w, h);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glViewport",
        |mut caller: Caller<'_, HostState>, x: i32, y: i32, w: i32, h: i32| {
            caller.data_mut().gl.context().viewport(x, y, w, h);
        },
    )?;
    linker.func_wrap(IMPORT_MODULE, "glClear", |mut caller: Caller<'_, HostState>, mask: u32| {
        caller.data_mut().gl.context().clear(mask);
    })?;
    linker.func_wrap(IMPORT_MODULE, "glEnable", |mut caller: Caller<'_, HostState>, cap: u32| {
        caller.data_mut().gl.context().enable(cap);
    })?;
    linker.func_wrap(IMPORT_MODULE, "glDisable", |mut caller: Caller<'_, HostState>, cap: u32| {
        caller.data_mut().gl.context().disable(cap);
    })?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glBlendFunc",
        |mut caller: Caller<'_, HostState>, sfactor: u32, dfactor: u32| {
            caller.data_mut().gl.context().blend_func(sfactor, dfactor);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glBlendFuncSeparate",
        |mut caller: Caller<'_, HostState>, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32| {
            caller
                .data_mut()
                .gl
                .context()
                .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glBlendEquationSeparate",
        |mut caller: Caller<'_, HostState>, mode_rgb: u32, mode_alpha: u32| {
            caller
                .data_mut()
                .gl
                .context()
                .blend_equation_separate(mode_rgb, mode_alpha);
        },
    )?;
    linker.func_wrap(IMPORT_MODULE, "glDepthFunc", |mut caller: Caller<'_, HostState>, func: u32| {
        caller.data_mut().gl.context().depth_func(func);
    })?;
    linker.func_wrap(IMPORT_MODULE, "glFrontFace", |mut caller: Caller<'_, HostState>, mode: u32| {
        caller.data_mut().gl.context().front_face(mode);
    })?;
    linker.func_wrap(IMPORT_MODULE, "glCullFace", |mut caller: Caller<'_, HostState>, mode: u32| {
        caller.data_mut().gl.context().cull_face(mode);
    })?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glStencilFuncSeparate",
        |mut caller: Caller<'_, HostState>, face: u32, func: u32, reference: i32, mask: u32| {
            caller
                .data_mut()
                .gl
                .context()
                .stencil_func_separate(face, func, reference, mask);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glStencilMaskSeparate",
        |mut caller: Caller<'_, HostState>, face: u32, mask: u32| {
            caller.data_mut().gl.context().stencil_mask_separate(face, mask);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glStencilOpSeparate",
        |mut caller: Caller<'_, HostState>, face: u32, fail: u32, zfail: u32, zpass: u32| {
            caller
                .data_mut()
                .gl
                .context()
                .stencil_op_separate(face, fail, zfail, zpass);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glPixelStorei",
        |mut caller: Caller<'_, HostState>, pname: u32, param: i32| {
            caller.data_mut().gl.context().pixel_store_i(pname, param);
        },
    )?;
    linker.func_wrap(IMPORT_MODULE, "glFlush", |mut caller: Caller<'_, HostState>| {
        caller.data_mut().gl.context().flush();
    })?;
    linker.func_wrap(IMPORT_MODULE, "glFinish", |mut caller: Caller<'_, HostState>| {
        caller.data_mut().gl.context().finish();
    })?;
    linker.func_wrap(IMPORT_MODULE, "glGetError", |mut caller: Caller<'_, HostState>| -> u32 {
        caller.data_mut().gl.get_error()
    })?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetIntegerv",
        |mut caller: Caller<'_, HostState>, pname: u32, out: u32| {
            with_memory(&mut caller, "glGetIntegerv", (), |mem, state| {
                state.gl.get_integerv(mem, pname, out);
            })
        },
    )?;
    Ok(())
}

fn define_object_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        "glGenTextures",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            r#gen(&mut caller, ResourceKind::Texture, "glGenTextures", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDeleteTextures",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            delete(&mut caller, ResourceKind::Texture, "glDeleteTextures", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGenBuffers",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            r#gen(&mut caller, ResourceKind::Buffer, "glGenBuffers", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDeleteBuffers",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            delete(&mut caller, ResourceKind::Buffer, "glDeleteBuffers", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGenFramebuffers",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            r#gen(&mut caller, ResourceKind::Framebuffer, "glGenFramebuffers", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDeleteFramebuffers",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            delete(&mut caller, ResourceKind::Framebuffer, "glDeleteFramebuffers", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGenRenderbuffers",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            r#gen(&mut caller, ResourceKind::Renderbuffer, "glGenRenderbuffers", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDeleteRenderbuffers",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            delete(&mut caller, ResourceKind::Renderbuffer, "glDeleteRenderbuffers", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGenVertexArrays",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            r#gen(&mut caller, ResourceKind::VertexArray, "glGenVertexArrays", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDeleteVertexArrays",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            delete(&mut caller, ResourceKind::VertexArray, "glDeleteVertexArrays", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGenQueries",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            r#gen(&mut caller, ResourceKind::Query, "glGenQueries", n, ids);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDeleteQueries",
        |mut caller: Caller<'_, HostState>, n: i32, ids: u32| {
            delete(&mut caller, ResourceKind::Query, "glDeleteQueries", n, ids);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "glBindTexture",
        |mut caller: Caller<'_, HostState>, target: u32, texture: u32| {
            caller.data_mut().gl.bind_texture(target, texture);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glBindBuffer",
        |mut caller: Caller<'_, HostState>, target: u32, buffer: u32| {
            caller.data_mut().gl.bind_buffer(target, buffer);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glBindFramebuffer",
        |mut caller: Caller<'_, HostState>, target: u32, framebuffer: u32| {
            caller.data_mut().gl.bind_framebuffer(target, framebuffer);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glBindRenderbuffer",
        |mut caller: Caller<'_, HostState>, target: u32, renderbuffer: u32| {
            caller.data_mut().gl.bind_renderbuffer(target, renderbuffer);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glBindVertexArray",
        |mut caller: Caller<'_, HostState>, vao: u32| {
            caller.data_mut().gl.bind_vertex_array(vao);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glFramebufferTexture2D",
        |mut caller: Caller<'_, HostState>,
         target: u32,
         attachment: u32,
         textarget: u32,
         texture: u32,
         level: i32| {
            caller
                .data_mut()
                .gl
                .framebuffer_texture_2d(target, attachment, textarget, texture, level);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glFramebufferRenderbuffer",
        |mut caller: Caller<'_, HostState>,
         target: u32,
         attachment: u32,
         renderbuffer_target: u32,
         renderbuffer: u32| {
            caller.data_mut().gl.framebuffer_renderbuffer(
                target,
                attachment,
                renderbuffer_target,
                renderbuffer,
            );
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glRenderbufferStorage",
        |mut caller: Caller<'_, HostState>, target: u32, internal_format: u32, width: i32, height: i32| {
            caller
                .data_mut()
                .gl
                .context()
                .renderbuffer_storage(target, internal_format, width, height);
        },
    )?;
    Ok(())
}

fn define_texture_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        "glActiveTexture",
        |mut caller: Caller<'_, HostState>, texture: u32| {
            caller.data_mut().gl.context().active_texture(texture);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glTexImage2D",
        |mut caller: Caller<'_, HostState>,
         target: u32,
         level: i32,
         internal_format: i32,
         width: i32,
         height: i32,
         border: i32,
         format: u32,
         ty: u32,
         pixels: u32| {
            let desc = TexImage2d {
                target,
                level,
                internal_format,
                width,
                height,
                border,
                format,
                ty,
            };
            with_memory(&mut caller, "glTexImage2D", (), |mem, state| {
                state.gl.tex_image_2d(mem, &desc, pixels);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glTexSubImage2D",
        |mut caller: Caller<'_, HostState>,
         target: u32,
         level: i32,
         x: i32,
         y: i32,
         width: i32,
         height: i32,
         format: u32,
         ty: u32,
         pixels: u32| {
            let desc = TexSubImage2d {
                target,
                level,
                x,
                y,
                width,
                height,
                format,
                ty,
            };
            with_memory(&mut caller, "glTexSubImage2D", (), |mem, state| {
                state.gl.tex_sub_image_2d(mem, &desc, pixels);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glReadPixels",
        |mut caller: Caller<'_, HostState>,
         x: i32,
         y: i32,
         width: i32,
         height: i32,
         format: u32,
         ty: u32,
         pixels: u32| {
            with_memory(&mut caller, "glReadPixels", (), |mem, state| {
                state
                    .gl
                    .read_pixels(mem, x, y, width, height, format, ty, pixels);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glTexParameteri",
        |mut caller: Caller<'_, HostState>, target: u32, pname: u32, param: i32| {
            caller.data_mut().gl.context().tex_parameter_i(target, pname, param);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glCopyTexImage2D",
        |mut caller: Caller<'_, HostState>,
         target: u32,
         level: i32,
         internal_format: u32,
         x: i32,
         y: i32,
         width: i32,
         height: i32,
         border: i32| {
            caller.data_mut().gl.context().copy_tex_image_2d(
                target,
                level,
                internal_format,
                x,
                y,
                width,
                height,
                border,
            );
        },
    )?;
    Ok(())
}

fn define_buffer_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        "glBufferData",
        |mut caller: Caller<'_, HostState>, target: u32, size: i32, data: u32, usage: u32| {
            with_memory(&mut caller, "glBufferData", (), |mem, state| {
                state
                    .gl
                    .buffer_data(mem, target, i64::from(size), data, usage);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glBufferSubData",
        |mut caller: Caller<'_, HostState>, target: u32, offset: i32, size: i32, data: u32| {
            with_memory(&mut caller, "glBufferSubData", (), |mem, state| {
                state.gl.buffer_sub_data(
                    mem,
                    target,
                    i64::from(offset),
                    i64::from(size),
                    data,
                );
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glEnableVertexAttribArray",
        |mut caller: Caller<'_, HostState>, index: u32| {
            caller.data_mut().gl.context().enable_vertex_attrib_array(index);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDisableVertexAttribArray",
        |mut caller: Caller<'_, HostState>, index: u32| {
            caller.data_mut().gl.context().disable_vertex_attrib_array(index);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glVertexAttribPointer",
        |mut caller: Caller<'_, HostState>,
         index: u32,
         size: i32,
         ty: u32,
         normalized: i32,
         stride: i32,
         offset: u32| {
            caller.data_mut().gl.context().vertex_attrib_pointer(
                index,
                size,
                ty,
                normalized != 0,
                stride,
                i64::from(offset),
            );
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glVertexAttribDivisor",
        |mut caller: Caller<'_, HostState>, index: u32, divisor: u32| {
            caller.data_mut().gl.context().vertex_attrib_divisor(index, divisor);
        },
    )?;
    Ok(())
}

fn define_program_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(IMPORT_MODULE, "glCreateProgram", |mut caller: Caller<'_, HostState>| -> u32 {
        let state = caller.data_mut();
        state.gl.create_program().unwrap_or_else(|err| {
            report(state, err);
            0
        })
    })?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glCreateShader",
        |mut caller: Caller<'_, HostState>, shader_type: u32| -> u32 {
            let state = caller.data_mut();
            state.gl.create_shader(shader_type).unwrap_or_else(|err| {
                report(state, err);
                0
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDeleteProgram",
        |mut caller: Caller<'_, HostState>, program: u32| {
            caller.data_mut().gl.delete_program(program);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDeleteShader",
        |mut caller: Caller<'_, HostState>, shader: u32| {
            caller.data_mut().gl.delete_shader(shader);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glShaderSource",
        |mut caller: Caller<'_, HostState>, shader: u32, count: i32, strings: u32, lengths: u32| {
            with_memory(&mut caller, "glShaderSource", (), |mem, state| {
                state.gl.shader_source(mem, shader, count, strings, lengths);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glCompileShader",
        |mut caller: Caller<'_, HostState>, shader: u32| {
            caller.data_mut().gl.compile_shader(shader);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glAttachShader",
        |mut caller: Caller<'_, HostState>, program: u32, shader: u32| {
            caller.data_mut().gl.attach_shader(program, shader);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glLinkProgram",
        |mut caller: Caller<'_, HostState>, program: u32| {
            caller.data_mut().gl.link_program(program);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUseProgram",
        |mut caller: Caller<'_, HostState>, program: u32| {
            caller.data_mut().gl.use_program(program);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetShaderiv",
        |mut caller: Caller<'_, HostState>, shader: u32, pname: u32, out: u32| {
            with_memory(&mut caller, "glGetShaderiv", (), |mem, state| {
                state.gl.get_shader_iv(mem, shader, pname, out);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetProgramiv",
        |mut caller: Caller<'_, HostState>, program: u32, pname: u32, out: u32| {
            with_memory(&mut caller, "glGetProgramiv", (), |mem, state| {
                state.gl.get_program_iv(mem, program, pname, out);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetShaderInfoLog",
        |mut caller: Caller<'_, HostState>, shader: u32, max_length: i32, length: u32, info_log: u32| {
            with_memory(&mut caller, "glGetShaderInfoLog", (), |mem, state| {
                state
                    .gl
                    .get_shader_info_log(mem, shader, max_length, length, info_log);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetProgramInfoLog",
        |mut caller: Caller<'_, HostState>, program: u32, max_length: i32, length: u32, info_log: u32| {
            with_memory(&mut caller, "glGetProgramInfoLog", (), |mem, state| {
                state
                    .gl
                    .get_program_info_log(mem, program, max_length, length, info_log);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetAttribLocation",
        |mut caller: Caller<'_, HostState>, program: u32, name: u32| -> i32 {
            with_memory(&mut caller, "glGetAttribLocation", -1, |mem, state| {
                state.gl.get_attrib_location(mem, program, name)
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetUniformLocation",
        |mut caller: Caller<'_, HostState>, program: u32, name: u32| -> i32 {
            with_memory(&mut caller, "glGetUniformLocation", -1, |mem, state| {
                state.gl.get_uniform_location(mem, program, name)
            })
        },
    )?;
    Ok(())
}

fn uniform_fv(
    caller: &mut Caller<'_, HostState>,
    entry: &'static str,
    components: u8,
    location: i32,
    count: i32,
    value: u32,
) {
    with_memory(caller, entry, (), |mem, state| {
        state.gl.uniform_fv(mem, entry, location, components, count, value);
    });
}

fn uniform_iv(
    caller: &mut Caller<'_, HostState>,
    entry: &'static str,
    components: u8,
    location: i32,
    count: i32,
    value: u32,
) {
    with_memory(caller, entry, (), |mem, state| {
        state.gl.uniform_iv(mem, entry, location, components, count, value);
    });
}

fn define_uniform_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform1f",
        |mut caller: Caller<'_, HostState>, location: i32, v: f32| {
            caller.data_mut().gl.uniform_1f(location, v);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform1i",
        |mut caller: Caller<'_, HostState>, location: i32, v: i32| {
            caller.data_mut().gl.uniform_1i(location, v);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform1fv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, value: u32| {
            uniform_fv(&mut caller, "glUniform1fv", 1, location, count, value);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform2fv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, value: u32| {
            uniform_fv(&mut caller, "glUniform2fv", 2, location, count, value);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform3fv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, value: u32| {
            uniform_fv(&mut caller, "glUniform3fv", 3, location, count, value);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform4fv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, value: u32| {
            uniform_fv(&mut caller, "glUniform4fv", 4, location, count, value);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform1iv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, value: u32| {
            uniform_iv(&mut caller, "glUniform1iv", 1, location, count, value);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform2iv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, value: u32| {
            uniform_iv(&mut caller, "glUniform2iv", 2, location, count, value);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform3iv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, value: u32| {
            uniform_iv(&mut caller, "glUniform3iv", 3, location, count, value);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniform4iv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, value: u32| {
            uniform_iv(&mut caller, "glUniform4iv", 4, location, count, value);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glUniformMatrix4fv",
        |mut caller: Caller<'_, HostState>, location: i32, count: i32, transpose: i32, value: u32| {
            with_memory(&mut caller, "glUniformMatrix4fv", (), |mem, state| {
                state
                    .gl
                    .uniform_matrix4fv(mem, location, count, transpose != 0, value);
            })
        },
    )?;
    Ok(())
}

fn define_draw_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        "glDrawArrays",
        |mut caller: Caller<'_, HostState>, mode: u32, first: i32, count: i32| {
            caller.data_mut().gl.context().draw_arrays(mode, first, count);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDrawElements",
        |mut caller: Caller<'_, HostState>, mode: u32, count: i32, ty: u32, offset: u32| {
            caller
                .data_mut()
                .gl
                .context()
                .draw_elements(mode, count, ty, i64::from(offset));
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDrawArraysInstanced",
        |mut caller: Caller<'_, HostState>, mode: u32, first: i32, count: i32, instances: i32| {
            caller
                .data_mut()
                .gl
                .context()
                .draw_arrays_instanced(mode, first, count, instances);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glDrawElementsInstanced",
        |mut caller: Caller<'_, HostState>,
         mode: u32,
         count: i32,
         ty: u32,
         offset: u32,
         instances: i32| {
            caller.data_mut().gl.context().draw_elements_instanced(
                mode,
                count,
                ty,
                i64::from(offset),
                instances,
            );
        },
    )?;
    Ok(())
}

fn define_query_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    linker.func_wrap(
        IMPORT_MODULE,
        "glBeginQuery",
        |mut caller: Caller<'_, HostState>, target: u32, query: u32| {
            caller.data_mut().gl.begin_query(target, query);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glEndQuery",
        |mut caller: Caller<'_, HostState>, target: u32| {
            caller.data_mut().gl.context().end_query(target);
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetQueryObjectiv",
        |mut caller: Caller<'_, HostState>, query: u32, pname: u32, out: u32| {
            with_memory(&mut caller, "glGetQueryObjectiv", (), |mem, state| {
                state.gl.get_query_object_iv(mem, query, pname, out);
            })
        },
    )?;
    linker.func_wrap(
        IMPORT_MODULE,
        "glGetQueryObjectui64v",
        |mut caller: Caller<'_, HostState>, query: u32, pname: u32, out: u32| {
            with_memory(&mut caller, "glGetQueryObjectui64v", (), |mem, state| {
                state.gl.get_query_object_ui64v(mem, query, pname, out);
            })
        },
    )?;
    Ok(())
}
