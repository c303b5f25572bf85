//! GLSL ES 1.00 to 3.00 source rewriting.
//!
//! Guests built against GLES2 ship `#version 100` shaders; the native context only
//! accepts ES 3.00. When the compat flag is on, sources are rewritten with plain
//! substring replacements before reaching `shader_source`.

const STRIPPED_EXTENSIONS: [&str; 2] = [
    "#extension GL_OES_standard_derivatives : enable",
    "#extension GL_EXT_shader_texture_lod : enable",
];

const FRAG_COLOR_PRELUDE: &str = "out mediump vec4 GL_FragColor;\n";

// Order matters: suffixed names first, then the generic sampler functions.
const RENAMES: [(&str, &str); 10] = [
    ("textureCubeLodEXT", "textureCubeLod"),
    ("texture2DLodEXT", "texture2DLod"),
    ("texture2DProjLodEXT", "texture2DProjLod"),
    ("texture2DGradEXT", "texture2DGrad"),
    ("texture2DProjGradEXT", "texture2DProjGrad"),
    ("textureCubeGradEXT", "textureCubeGrad"),
    ("textureCube", "texture"),
    ("texture1D", "texture"),
    ("texture2D", "texture"),
    ("texture3D", "texture"),
];

/// Rewrite an ES 1.00 shader so an ES 3.00 compiler accepts it.
pub fn translate_es100(source: &str) -> String {
    let mut out = source.to_owned();
    for ext in STRIPPED_EXTENSIONS {
        out = out.replace(ext, "");
    }

    let mut prelude = String::new();
    if out.contains("gl_FragColor") {
        prelude.push_str(FRAG_COLOR_PRELUDE);
        out = out.replace("gl_FragColor", "GL_FragColor");
    }

    if out.contains("attribute") {
        out = out.replace("attribute", "in").replace("varying", "out");
    } else {
        out = out.replace("varying", "in");
    }

    for (from, to) in RENAMES {
        out = out.replace(from, to);
    }

    out.replace("#version 100", &format!("#version 300 es\n{prelude}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_shader_gets_in_out_qualifiers() {
        let src = "#version 100\nattribute vec2 pos;\nvarying vec2 uv;\nvoid main() {}";
        let out = translate_es100(src);
        assert_eq!(
            out,
            "#version 300 es\n\nin vec2 pos;\nout vec2 uv;\nvoid main() {}"
        );
    }

    #[test]
    fn fragment_shader_gets_frag_color_prelude() {
        let src = "#version 100\n#extension GL_OES_standard_derivatives : enable\nvarying vec2 uv;\nuniform sampler2D tex;\nvoid main() { gl_FragColor = texture2D(tex, uv); }";
        let out = translate_es100(src);
        assert!(out.starts_with("#version 300 es\nout mediump vec4 GL_FragColor;\n"));
        assert!(out.contains("in vec2 uv;"));
        assert!(out.contains("GL_FragColor = texture(tex, uv);"));
        assert!(!out.contains("#extension"));
    }

    #[test]
    fn lod_ext_suffix_is_dropped_before_generic_rename() {
        let out = translate_es100("texture2DLodEXT(s, uv, 0.0)");
        assert_eq!(out, "textureLod(s, uv, 0.0)");
    }
}
