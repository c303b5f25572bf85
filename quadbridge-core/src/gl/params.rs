//! Integer state queries (`glGetIntegerv`).
//!
//! A handful of GLES values the native context does not know are answered here;
//! everything else goes through `GraphicsContext::parameter` and is coerced to a
//! single integer. Multi-value results and the version/extension counts are left
//! unimplemented: nothing is written for them.

use super::{GraphicsContext, ObjectTables, ParameterValue};
use crate::abi::gl::GlEnum;

/// Outcome of an integer query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntegerQuery {
    /// Write this value to the out pointer.
    Value(i32),
    /// Leave the out pointer untouched; no error.
    Unwritten,
    /// Record this error; leave the out pointer untouched.
    Error(GlEnum),
}

pub fn query_integer(
    ctx: &mut dyn GraphicsContext,
    tables: &ObjectTables,
    pname: u32,
) -> IntegerQuery {
    let named = GlEnum::from_u32(pname);
    match named {
        Some(GlEnum::ShaderCompiler) => return IntegerQuery::Value(1),
        // No binary formats are supported.
        Some(GlEnum::ShaderBinaryFormats) => return IntegerQuery::Unwritten,
        Some(GlEnum::NumProgramBinaryFormats | GlEnum::NumShaderBinaryFormats) => {
            return IntegerQuery::Value(0);
        }
        Some(GlEnum::NumCompressedTextureFormats) => {
            let count = match ctx.parameter(GlEnum::CompressedTextureFormats.value()) {
                ParameterValue::Array(formats) => formats.len() as i32,
                _ => 0,
            };
            return IntegerQuery::Value(count);
        }
        Some(GlEnum::NumExtensions | GlEnum::MajorVersion | GlEnum::MinorVersion) => {
            tracing::warn!("glGetIntegerv({pname:#x}): unimplemented");
            return IntegerQuery::Error(GlEnum::InvalidEnum);
        }
        _ => {}
    }

    match ctx.parameter(pname) {
        ParameterValue::Bool(b) => IntegerQuery::Value(i32::from(b)),
        ParameterValue::Int(v) => IntegerQuery::Value(v as i32),
        ParameterValue::Float(v) => IntegerQuery::Value(v as i32),
        ParameterValue::Text(_) => {
            tracing::error!("GL_INVALID_ENUM in glGetIntegerv({pname:#x}) on a name which returns a string");
            IntegerQuery::Error(GlEnum::InvalidEnum)
        }
        ParameterValue::Null if named.is_some_and(GlEnum::is_binding_query) => {
            IntegerQuery::Value(0)
        }
        ParameterValue::Null => {
            tracing::error!("GL_INVALID_ENUM in glGetIntegerv({pname:#x}) and it returns null");
            IntegerQuery::Error(GlEnum::InvalidEnum)
        }
        ParameterValue::Array(values) => {
            if !values.is_empty() {
                tracing::warn!(
                    len = values.len(),
                    "glGetIntegerv({pname:#x}): array results unimplemented"
                );
            }
            IntegerQuery::Unwritten
        }
        ParameterValue::Object(object) => {
            IntegerQuery::Value(tables.name_of(object).unwrap_or(0) as i32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ResourceKind};

    #[test]
    fn trivial_values_skip_the_context() {
        let mut ctx = HeadlessContext::new();
        let tables = ObjectTables::new();
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::ShaderCompiler.value()),
            IntegerQuery::Value(1)
        );
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::NumShaderBinaryFormats.value()),
            IntegerQuery::Value(0)
        );
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::ShaderBinaryFormats.value()),
            IntegerQuery::Unwritten
        );
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::NumCompressedTextureFormats.value()),
            IntegerQuery::Value(0)
        );
        assert!(ctx.call_log().is_empty());
    }

    #[test]
    fn version_counts_are_invalid_enum() {
        let mut ctx = HeadlessContext::new();
        let tables = ObjectTables::new();
        for pname in [GlEnum::NumExtensions, GlEnum::MajorVersion, GlEnum::MinorVersion] {
            assert_eq!(
                query_integer(&mut ctx, &tables, pname.value()),
                IntegerQuery::Error(GlEnum::InvalidEnum)
            );
        }
    }

    #[test]
    fn null_binding_is_zero_but_unknown_null_is_an_error() {
        let mut ctx = HeadlessContext::new();
        let tables = ObjectTables::new();
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::CurrentProgram.value()),
            IntegerQuery::Value(0)
        );
        assert_eq!(
            query_integer(&mut ctx, &tables, 0x1234),
            IntegerQuery::Error(GlEnum::InvalidEnum)
        );
    }

    #[test]
    fn bound_object_reports_its_guest_name() {
        let mut ctx = HeadlessContext::new();
        let mut tables = ObjectTables::new();
        tables.allocate(ResourceKind::Texture);
        let native = ctx.create(ResourceKind::Buffer).unwrap();
        let name = tables.insert_new(ResourceKind::Buffer, native);
        ctx.bind_buffer(GlEnum::ArrayBuffer.value(), Some(native));
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::ArrayBufferBinding.value()),
            IntegerQuery::Value(name as i32)
        );
    }

    #[test]
    fn strings_and_arrays_are_not_written() {
        let mut ctx = HeadlessContext::new();
        let tables = ObjectTables::new();
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::Version.value()),
            IntegerQuery::Error(GlEnum::InvalidEnum)
        );
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::Viewport.value()),
            IntegerQuery::Unwritten
        );
        assert_eq!(
            query_integer(&mut ctx, &tables, GlEnum::MaxTextureSize.value()),
            IntegerQuery::Value(4096)
        );
    }
}
